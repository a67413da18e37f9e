//! Entry cube
//!
//! Reveal animation for a stage block: drops from above onto its cell over
//! the reveal time, then disappears as the real block takes its place.

use std::cell::RefCell;
use std::rc::Rc;

use cube_engine::ecs::{Activate, Entity};
use cube_engine::events::Params;
use cube_engine::foundation::math::{block_to_world, lerp, Color, Vec3, Vec3i};
use cube_engine::foundation::time::LapTimer;

use crate::messages::{keys, Bus, Msg, Payload, Value};

/// Block dropping into place
pub struct EntryCube {
    active: bool,
    color: Color,
    target: Vec3,
    offset_y: f32,
    pos: Vec3,
    timer: LapTimer,
}

impl EntryCube {
    /// Create a cube dropping `offset_y` world units onto `entry`
    pub fn new(
        entry: Vec3i,
        offset_y: f32,
        active_time: f64,
        color: Color,
        cube_size: f32,
    ) -> Self {
        let target = block_to_world(&entry, cube_size);
        Self {
            active: true,
            color,
            target,
            offset_y,
            pos: target + Vec3::new(0.0, offset_y, 0.0),
            timer: LapTimer::new(active_time),
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
        if self.timer.tick(params.double(keys::DELTA_TIME)) {
            self.pos = self.target;
            self.active = false;
            return;
        }
        let t = self.timer.progress_fraction() as f32;
        self.pos.y = lerp(self.target.y + self.offset_y, self.target.y, t);
    }
}

impl Entity for EntryCube {
    fn is_active(&self) -> bool {
        self.active
    }
}

impl Activate<Bus> for EntryCube {
    fn activate(this: &Rc<RefCell<Self>>, bus: &Bus) {
        bus.subscribe(Msg::Update, this, Self::on_update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cube_engine::ecs::share;

    fn update(bus: &Bus, delta_time: f64) {
        bus.signal_with(Msg::Update, Params::new().with(keys::DELTA_TIME, delta_time));
    }

    #[test]
    fn test_drops_onto_cell_then_expires() {
        let bus = Bus::new();
        let cube = share(EntryCube::new(Vec3i::new(2, 0, 5), 4.0, 1.0, Color::WHITE, 1.0));
        EntryCube::activate(&cube, &bus);
        assert_relative_eq!(cube.borrow().pos().y, 4.0);

        update(&bus, 0.25);
        assert_relative_eq!(cube.borrow().pos().y, 3.0);
        update(&bus, 0.5);
        assert_relative_eq!(cube.borrow().pos().y, 1.0);
        assert!(cube.borrow().is_active());

        update(&bus, 0.25);
        assert_eq!(cube.borrow().pos(), Vec3::new(2.0, 0.0, 5.0));
        assert!(!cube.borrow().is_active());
    }
}
