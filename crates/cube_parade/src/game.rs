//! Game driver
//!
//! Owns the bus, the entity manager and the long-lived followers, and runs
//! the three-phase tick:
//!
//! 1. `GatherInformation` collects cube states into a fresh payload
//! 2. `Update` advances every entity with that payload
//! 3. `PostUpdate` lets followers react to the settled state
//!
//! Inactive entities are reaped after the last phase. A death or a full
//! clear schedules a restart.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use cube_engine::ecs::{EntityManager, TimerTasks};
use cube_engine::events::{ConnectionHolder, Params};

use crate::camera::Camera;
use crate::error::GameError;
use crate::factory::EntityFactory;
use crate::light::Light;
use crate::messages::{keys, Bus, CubeInfo, KeyCode, Msg, Touch, Value};
use crate::params::GameParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlowEvent {
    Restart,
}

/// Game-over bookkeeping shared with the bus
struct Flow {
    restart_delay: f64,
    timers: TimerTasks<FlowEvent>,
    restart_pending: bool,
    connections: ConnectionHolder,
}

impl Flow {
    fn schedule_restart(&mut self, _: &Bus, _: &mut Params<Value>) {
        if self.restart_pending {
            return;
        }
        self.restart_pending = true;
        self.timers.add(self.restart_delay, FlowEvent::Restart);
        log::info!("restart in {:.1}s", self.restart_delay);
    }
}

/// A running parade
pub struct Game {
    bus: Bus,
    params: Rc<GameParams>,
    manager: Rc<EntityManager>,
    // Held for its subscriptions
    _factory: Rc<RefCell<EntityFactory>>,
    camera: Rc<RefCell<Camera>>,
    light: Rc<RefCell<Light>>,
    flow: Rc<RefCell<Flow>>,
    paused: bool,
    elapsed: f64,
    restarts: u32,
}

impl Game {
    /// Validate `params` and set up the first stage with a random seed
    pub fn new(params: GameParams) -> Result<Self, GameError> {
        Self::build(params, StdRng::from_entropy())
    }

    /// Like [`Game::new`], with deterministic randomness
    pub fn with_seed(params: GameParams, seed: u64) -> Result<Self, GameError> {
        Self::build(params, StdRng::seed_from_u64(seed))
    }

    fn build(params: GameParams, rng: StdRng) -> Result<Self, GameError> {
        params.validate()?;
        let params = Rc::new(params);
        let bus = Bus::new();
        let manager = Rc::new(EntityManager::new());

        let factory = Rc::new(RefCell::new(EntityFactory::new(
            Rc::clone(&manager),
            Rc::clone(&params),
            rng,
        )));
        EntityFactory::connect(&factory, &bus);

        let camera = Rc::new(RefCell::new(Camera::new(params.camera.clone())));
        Camera::connect(&camera, &bus);
        let light = Rc::new(RefCell::new(Light::new(params.light.clone())));
        Light::connect(&light, &bus);

        let flow = Rc::new(RefCell::new(Flow {
            restart_delay: params.game.restart_delay,
            timers: TimerTasks::new(),
            restart_pending: false,
            connections: ConnectionHolder::new(),
        }));
        {
            let death = bus.subscribe(Msg::CubePlayerDead, &flow, Flow::schedule_restart);
            let clear = bus.subscribe(Msg::AllStageClear, &flow, Flow::schedule_restart);
            let mut flow = flow.borrow_mut();
            flow.connections.add(death);
            flow.connections.add(clear);
        }

        let game = Self {
            bus,
            params,
            manager,
            _factory: factory,
            camera,
            light,
            flow,
            paused: false,
            elapsed: 0.0,
            restarts: 0,
        };
        game.setup();
        log::info!("game ready with {} entities", game.manager.len());
        Ok(game)
    }

    fn setup(&self) {
        self.bus.notify(Msg::SetupGame);
        self.bus.notify(Msg::SetupStage);
        for &entry in &self.params.game.entry {
            self.bus
                .signal_with(Msg::CreateCubePlayer, Params::new().with(keys::ENTRY_POS, entry));
        }
    }

    fn restart(&mut self) {
        self.restarts += 1;
        log::info!("restarting (restart {})", self.restarts);
        self.bus.notify(Msg::ResetStage);
        let reaped = self.manager.reap_inactive();
        log::debug!("reset reaped {reaped} entities");
        self.flow.borrow_mut().restart_pending = false;
        self.setup();
    }

    /// Advance the simulation by `delta_time` seconds
    pub fn tick(&mut self, delta_time: f64) {
        if self.paused {
            return;
        }

        let due = self.flow.borrow_mut().timers.advance(delta_time);
        for event in due {
            match event {
                FlowEvent::Restart => self.restart(),
            }
        }

        let mut params = Params::new()
            .with(keys::DELTA_TIME, delta_time)
            .with(keys::PLAYER_INFO, Vec::<CubeInfo>::new())
            .with(keys::STAGE_WIDTH, 0.0_f32)
            .with(keys::STAGE_LENGTH, 0.0_f32)
            .with(keys::STAGE_BOTTOM_Z, 0.0_f32);
        self.bus.signal(Msg::GatherInformation, &mut params);
        self.bus.signal(Msg::Update, &mut params);
        self.bus.signal(Msg::PostUpdate, &mut params);

        let reaped = self.manager.reap_inactive();
        if reaped > 0 {
            log::trace!("reaped {reaped} entities");
        }
        self.elapsed += delta_time;
    }

    /// Deliver a key press
    ///
    /// `T` toggles the touch preview and `Escape` toggles pause.
    pub fn key_down(&mut self, key: KeyCode) {
        match key {
            KeyCode::Escape => self.set_paused(!self.paused),
            KeyCode::Char('t' | 'T') => self.bus.notify(Msg::TouchPreviewToggle),
            key if !self.paused => {
                self.bus
                    .signal_with(Msg::KeyDown, Params::new().with(keys::KEYCODE, key));
            }
            _ => {}
        }
    }

    /// Deliver touches that went down
    pub fn touch_began(&self, touches: Vec<Touch>) {
        self.touch(Msg::TouchBegan, touches);
    }

    /// Deliver touches that moved
    pub fn touch_moved(&self, touches: Vec<Touch>) {
        self.touch(Msg::TouchMoved, touches);
    }

    /// Deliver touches that lifted
    pub fn touch_ended(&self, touches: Vec<Touch>) {
        self.touch(Msg::TouchEnded, touches);
    }

    fn touch(&self, topic: Msg, touches: Vec<Touch>) {
        if !self.paused {
            self.bus
                .signal_with(topic, Params::new().with(keys::TOUCHES, touches));
        }
    }

    /// Freeze or unfreeze the simulation
    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            log::info!("{}", if paused { "paused" } else { "resumed" });
        }
        self.paused = paused;
    }

    /// Whether ticks are currently ignored
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether a restart is scheduled
    pub fn is_restart_pending(&self) -> bool {
        self.flow.borrow().restart_pending
    }

    /// Restarts performed so far
    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    /// Simulated seconds, excluding paused time
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// The game's message bus
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// The entity manager
    pub fn manager(&self) -> &EntityManager {
        &self.manager
    }

    /// Parameters the game runs with
    pub fn params(&self) -> &GameParams {
        &self.params
    }

    /// The follow camera
    pub fn camera(&self) -> Ref<'_, Camera> {
        self.camera.borrow()
    }

    /// The stage light
    pub fn light(&self) -> Ref<'_, Light> {
        self.light.borrow()
    }
}
