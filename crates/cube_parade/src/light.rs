//! Stage light
//!
//! Follows the collapse edge so the lit area moves with the parade.

use std::cell::RefCell;
use std::rc::Rc;

use cube_engine::events::{ConnectionHolder, Params};
use cube_engine::foundation::math::{lerp, Vec3};

use crate::messages::{keys, Bus, Msg, Payload, Value};
use crate::params::LightParams;

/// Directional light anchored above the collapse edge
pub struct Light {
    tuning: LightParams,
    pos: Vec3,
    target: Vec3,
    connections: ConnectionHolder,
}

impl Light {
    /// Create a light at its offset from the origin
    pub fn new(tuning: LightParams) -> Self {
        Self {
            pos: tuning.pos,
            target: tuning.pos,
            tuning,
            connections: ConnectionHolder::new(),
        }
    }

    /// Subscribe the light to `bus`
    pub fn connect(this: &Rc<RefCell<Self>>, bus: &Bus) {
        let mut light = this.borrow_mut();
        light.connections.add(bus.subscribe(Msg::StagePos, this, Self::on_stage_pos));
        light.connections.add(bus.subscribe(Msg::Update, this, Self::on_update));
    }

    /// Current position
    pub fn pos(&self) -> Vec3 {
        self.pos
    }

    fn on_stage_pos(&mut self, _: &Bus, params: &mut Params<Value>) {
        self.target = params.position(keys::STAGE_POS) + self.tuning.pos;
    }

    fn on_update(&mut self, _: &Bus, _: &mut Params<Value>) {
        let ease = self.tuning.ease;
        self.pos.x = lerp(self.pos.x, self.target.x, ease);
        self.pos.y = self.target.y;
        self.pos.z = lerp(self.pos.z, self.target.z, ease);
    }
}
