//! Touch preview
//!
//! Keeps the live touch points so a front end can draw them. Hidden until
//! toggled.

use std::cell::RefCell;
use std::rc::Rc;

use cube_engine::ecs::{Activate, Entity};
use cube_engine::events::Params;

use crate::messages::{keys, Bus, Msg, Payload, Touch, Value};

/// Live touch point overlay
#[derive(Debug)]
pub struct TouchPreview {
    active: bool,
    visible: bool,
    touches: Vec<Touch>,
}

impl TouchPreview {
    /// Create a hidden preview
    pub fn new() -> Self {
        Self {
            active: true,
            visible: false,
            touches: Vec::new(),
        }
    }

    /// Whether the overlay is shown
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Touches currently down
    pub fn touches(&self) -> &[Touch] {
        &self.touches
    }

    fn on_began(&mut self, _: &Bus, params: &mut Params<Value>) {
        for touch in params.touches(keys::TOUCHES) {
            match self.touches.iter_mut().find(|t| t.id == touch.id) {
                Some(known) => *known = *touch,
                None => self.touches.push(*touch),
            }
        }
    }

    fn on_moved(&mut self, _: &Bus, params: &mut Params<Value>) {
        for touch in params.touches(keys::TOUCHES) {
            if let Some(known) = self.touches.iter_mut().find(|t| t.id == touch.id) {
                *known = *touch;
            }
        }
    }

    fn on_ended(&mut self, _: &Bus, params: &mut Params<Value>) {
        for touch in params.touches(keys::TOUCHES) {
            let before = self.touches.len();
            self.touches.retain(|t| t.id != touch.id);
            if self.touches.len() == before {
                log::warn!("touch {} ended without beginning", touch.id);
            }
        }
    }

    fn on_toggle(&mut self, _: &Bus, _: &mut Params<Value>) {
        self.visible = !self.visible;
        log::debug!("touch preview {}", if self.visible { "shown" } else { "hidden" });
    }

    fn on_reset(&mut self, _: &Bus, _: &mut Params<Value>) {
        self.active = false;
    }
}

impl Default for TouchPreview {
    fn default() -> Self {
        Self::new()
    }
}

impl Entity for TouchPreview {
    fn is_active(&self) -> bool {
        self.active
    }
}

impl Activate<Bus> for TouchPreview {
    fn activate(this: &Rc<RefCell<Self>>, bus: &Bus) {
        bus.subscribe(Msg::TouchBegan, this, Self::on_began);
        bus.subscribe(Msg::TouchMoved, this, Self::on_moved);
        bus.subscribe(Msg::TouchEnded, this, Self::on_ended);
        bus.subscribe(Msg::TouchPreviewToggle, this, Self::on_toggle);
        bus.subscribe(Msg::ResetStage, this, Self::on_reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cube_engine::ecs::share;
    use cube_engine::foundation::math::Vec3;

    fn send(bus: &Bus, topic: Msg, id: u32, x: f32) {
        let touches = vec![Touch {
            id,
            timestamp: 0.0,
            pos: Vec3::new(x, 0.0, 0.0),
        }];
        bus.signal_with(topic, Params::new().with(keys::TOUCHES, touches));
    }

    #[test]
    fn test_tracks_touch_lifecycle() {
        let bus = Bus::new();
        let preview = share(TouchPreview::new());
        TouchPreview::activate(&preview, &bus);

        send(&bus, Msg::TouchBegan, 1, 0.0);
        send(&bus, Msg::TouchBegan, 2, 5.0);
        send(&bus, Msg::TouchMoved, 1, 3.0);
        assert_eq!(preview.borrow().touches().len(), 2);
        assert_eq!(preview.borrow().touches()[0].pos.x, 3.0);

        send(&bus, Msg::TouchEnded, 1, 3.0);
        send(&bus, Msg::TouchEnded, 7, 0.0);
        assert_eq!(preview.borrow().touches().len(), 1);
        assert_eq!(preview.borrow().touches()[0].id, 2);
    }

    #[test]
    fn test_toggle_and_reset() {
        let bus = Bus::new();
        let preview = share(TouchPreview::new());
        TouchPreview::activate(&preview, &bus);
        assert!(!preview.borrow().is_visible());

        bus.notify(Msg::TouchPreviewToggle);
        assert!(preview.borrow().is_visible());
        bus.notify(Msg::ResetStage);
        assert!(!preview.borrow().is_active());
    }
}
