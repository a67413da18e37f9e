//! Entity factory
//!
//! Serves the creation topics. Every entity it builds is handed to the
//! entity manager, which owns it from then on.

use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use cube_engine::ecs::{Activate, Entity, EntityManager};
use cube_engine::events::{ConnectionHolder, Params};

use crate::entities::{CubeEnemy, CubePlayer, EntryCube, FallCube, StageWatcher, TouchPreview};
use crate::messages::{keys, Bus, Msg, Payload, Value};
use crate::params::GameParams;
use crate::stage::Stage;

/// Builds entities in response to `SetupGame` and the `Create*` topics
pub struct EntityFactory {
    manager: Rc<EntityManager>,
    params: Rc<GameParams>,
    rng: StdRng,
    connections: ConnectionHolder,
}

impl EntityFactory {
    /// Create a factory feeding `manager`
    pub fn new(manager: Rc<EntityManager>, params: Rc<GameParams>, rng: StdRng) -> Self {
        Self {
            manager,
            params,
            rng,
            connections: ConnectionHolder::new(),
        }
    }

    /// Subscribe the factory to `bus`
    pub fn connect(this: &Rc<RefCell<Self>>, bus: &Bus) {
        let connections = [
            bus.subscribe(Msg::SetupGame, this, Self::on_setup_game),
            bus.subscribe(Msg::CreateCubePlayer, this, Self::on_create_player),
            bus.subscribe(Msg::CreateCubeEnemy, this, Self::on_create_enemy),
            bus.subscribe(Msg::CreateFallCube, this, Self::on_create_fall_cube),
            bus.subscribe(Msg::CreateEntryCube, this, Self::on_create_entry_cube),
        ];
        let mut factory = this.borrow_mut();
        for connection in connections {
            factory.connections.add(connection);
        }
    }

    fn spawn<E>(&self, entity: E, bus: &Bus)
    where
        E: Entity + Activate<Bus> + 'static,
    {
        let (id, _) = self.manager.spawn(entity, bus);
        log::trace!("spawned {} as {id:?}", std::any::type_name::<E>());
    }

    fn on_setup_game(&mut self, bus: &Bus, _: &mut Params<Value>) {
        let stage_rng = StdRng::seed_from_u64(self.rng.gen());
        self.spawn(Stage::new(Rc::clone(&self.params), stage_rng), bus);
        self.spawn(StageWatcher::new(), bus);
        self.spawn(TouchPreview::new(), bus);
        log::debug!("game entities created");
    }

    fn on_create_player(&mut self, bus: &Bus, params: &mut Params<Value>) {
        let entry = params.block(keys::ENTRY_POS);
        let serial = self.manager.next_serial();
        log::debug!("player {serial} enters at {entry:?}");
        self.spawn(CubePlayer::new(serial, entry, &self.params), bus);
    }

    fn on_create_enemy(&mut self, bus: &Bus, params: &mut Params<Value>) {
        let entry = params.block(keys::ENTRY_POS);
        let serial = self.manager.next_serial();
        log::debug!("enemy {serial} enters at {entry:?}");
        self.spawn(CubeEnemy::new(serial, entry, &self.params), bus);
    }

    fn on_create_fall_cube(&mut self, bus: &Bus, params: &mut Params<Value>) {
        let cube = FallCube::new(
            params.block(keys::ENTRY_POS),
            params.color(keys::COLOR),
            params.float(keys::SPEED),
            &self.params,
        );
        self.spawn(cube, bus);
    }

    fn on_create_entry_cube(&mut self, bus: &Bus, params: &mut Params<Value>) {
        let cube = EntryCube::new(
            params.block(keys::ENTRY_POS),
            params.float(keys::OFFSET_Y),
            params.double(keys::ACTIVE_TIME),
            params.color(keys::COLOR),
            self.params.cube.size,
        );
        self.spawn(cube, bus);
    }
}
