//! Falling cube
//!
//! Pure visual debris: a cube dropped off the stage accelerates downward
//! until its lifetime runs out.

use std::cell::RefCell;
use std::rc::Rc;

use cube_engine::ecs::{Activate, Entity};
use cube_engine::events::Params;
use cube_engine::foundation::math::{block_to_world, Color, Vec3, Vec3i};
use cube_engine::foundation::time::LapTimer;

use crate::messages::{keys, Bus, Msg, Payload, Value};
use crate::params::GameParams;

/// Cube falling off the stage
pub struct FallCube {
    active: bool,
    color: Color,
    pos: Vec3,
    velocity: Vec3,
    acceleration: Vec3,
    lifetime: LapTimer,
}

impl FallCube {
    /// Create a cube falling from `entry`
    ///
    /// `speed` scales the vertical acceleration.
    pub fn new(entry: Vec3i, color: Color, speed: f32, params: &GameParams) -> Self {
        let mut acceleration = params.fall_cube.acc;
        acceleration.y *= speed;
        Self {
            active: true,
            color,
            pos: block_to_world(&entry, params.cube.size),
            velocity: Vec3::zeros(),
            acceleration,
            lifetime: LapTimer::new(params.fall_cube.active_time),
        }
    }

    /// World position
    pub fn pos(&self) -> Vec3 {
        self.pos
    }

    /// Body color
    pub fn color(&self) -> Color {
        self.color
    }

    fn on_update(&mut self, _: &Bus, params: &mut Params<Value>) {
        let delta_time = params.double(keys::DELTA_TIME);
        let dt = delta_time as f32;
        self.pos += self.velocity * dt + self.acceleration * (0.5 * dt * dt);
        self.velocity += self.acceleration * dt;
        if self.lifetime.tick(delta_time) {
            self.active = false;
        }
    }
}

impl Entity for FallCube {
    fn is_active(&self) -> bool {
        self.active
    }
}

impl Activate<Bus> for FallCube {
    fn activate(this: &Rc<RefCell<Self>>, bus: &Bus) {
        bus.subscribe(Msg::Update, this, Self::on_update);
    }
}
