//! Follow camera
//!
//! Frames the players against the stage after every update. The camera is
//! not an entity; the game owns it and its subscriptions end when it is
//! dropped.

use std::cell::RefCell;
use std::rc::Rc;

use cube_engine::events::{ConnectionHolder, Params};
use cube_engine::foundation::math::{ease_toward, Vec3};

use crate::messages::{keys, Bus, Msg, Payload, Value};
use crate::params::CameraParams;

/// Eye and interest point easing toward the players
pub struct Camera {
    tuning: CameraParams,
    eye: Vec3,
    interest: Vec3,
    connections: ConnectionHolder,
}

impl Camera {
    /// Create a camera framing the origin
    pub fn new(tuning: CameraParams) -> Self {
        Self {
            eye: tuning.eye_pos,
            interest: tuning.interest_pos,
            tuning,
            connections: ConnectionHolder::new(),
        }
    }

    /// Subscribe the camera to `bus`
    pub fn connect(this: &Rc<RefCell<Self>>, bus: &Bus) {
        let connection = bus.subscribe(Msg::PostUpdate, this, Self::on_post_update);
        this.borrow_mut().connections.add(connection);
    }

    /// Eye position
    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    /// Point looked at
    pub fn interest(&self) -> Vec3 {
        self.interest
    }

    fn on_post_update(&mut self, _: &Bus, params: &mut Params<Value>) {
        let players: Vec<_> = params
            .cube_infos(keys::PLAYER_INFO)
            .iter()
            .filter(|info| info.is_player)
            .collect();
        if players.is_empty() {
            return;
        }

        let count = players.len() as f32;
        let tracked = players.iter().map(|info| info.pos).sum::<Vec3>() / count;
        let rolling = players.iter().any(|info| info.rotating);

        let center = params.float(keys::STAGE_WIDTH) / 2.0;
        let bottom = params.float(keys::STAGE_BOTTOM_Z);
        let framed = Vec3::new(
            center + (tracked.x - center) * self.tuning.center_rate,
            0.0,
            bottom + (tracked.z - bottom) * self.tuning.bottom_rate,
        );

        let rate = if rolling {
            self.tuning.ease_cube_move
        } else {
            self.tuning.ease_cube_stop
        };
        self.eye = ease_toward(&self.eye, &(framed + self.tuning.eye_pos), rate);
        self.interest = ease_toward(&self.interest, &(framed + self.tuning.interest_pos), rate);
    }
}
