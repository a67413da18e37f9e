//! Enemy cube
//!
//! A stationary obstacle placed by the stage. Players cannot roll into its
//! cell, and it drops off the stage with the rows under it.

use std::cell::RefCell;
use std::rc::Rc;

use cube_engine::ecs::{Activate, Entity};
use cube_engine::events::Params;
use cube_engine::foundation::math::{block_to_world, Color, Vec3, Vec3i};

use super::{drop_off_stage, stage_height};
use crate::messages::{keys, Bus, CubeInfo, Msg, Payload, Value};
use crate::params::GameParams;

/// Stationary obstacle cube
pub struct CubeEnemy {
    serial: u32,
    active: bool,
    color: Color,
    block: Vec3i,
    pos: Vec3,
}

impl CubeEnemy {
    /// Create an enemy standing on `entry`
    pub fn new(serial: u32, entry: Vec3i, params: &GameParams) -> Self {
        Self {
            serial,
            active: true,
            color: params.enemy.color,
            block: entry,
            pos: block_to_world(&entry, params.cube.size),
        }
    }

    /// Cell the enemy stands on
    pub fn block(&self) -> Vec3i {
        self.block
    }

    fn on_update(&mut self, bus: &Bus, _: &mut Params<Value>) {
        if stage_height(bus, self.block).is_none() {
            log::debug!("enemy {} fell at {:?}", self.serial, self.block);
            drop_off_stage(bus, self.block, self.color);
            self.active = false;
        }
    }

    fn on_gather(&mut self, _: &Bus, params: &mut Params<Value>) {
        params.cube_infos_mut(keys::PLAYER_INFO).push(CubeInfo {
            id: self.serial,
            is_player: false,
            block_pos: self.block,
            pos: self.pos,
            rotating: false,
        });
    }

    fn on_reset(&mut self, _: &Bus, _: &mut Params<Value>) {
        self.active = false;
    }
}

impl Entity for CubeEnemy {
    fn is_active(&self) -> bool {
        self.active
    }
}

impl Activate<Bus> for CubeEnemy {
    fn activate(this: &Rc<RefCell<Self>>, bus: &Bus) {
        bus.subscribe(Msg::Update, this, Self::on_update);
        bus.subscribe(Msg::GatherInformation, this, Self::on_gather);
        bus.subscribe(Msg::ResetStage, this, Self::on_reset);
    }
}
