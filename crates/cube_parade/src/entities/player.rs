//! Player cube
//!
//! Rolls one cell at a time in response to keys or swipes. A fast swipe
//! chains several rolls in the same direction. When the cell under an idle
//! player disappears the player drops off the stage and dies.

use std::cell::RefCell;
use std::f32::consts::FRAC_PI_2;
use std::rc::Rc;

use cube_engine::ecs::{Activate, Entity};
use cube_engine::events::Params;
use cube_engine::foundation::math::{block_to_world, Color, Quat, Vec3, Vec3i, Vector3};

use super::{drop_off_stage, stage_height};
use crate::messages::{keys, Bus, CubeInfo, KeyCode, Msg, Payload, Touch, Value};
use crate::params::{GameParams, PlayerParams};

/// Shortest swipe duration considered, one frame at 60 Hz
const MIN_SWIPE_TIME: f64 = 1.0 / 60.0;

/// Roll direction on the stage grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Toward the goal (+z)
    Up,
    /// Toward the collapse edge (-z)
    Down,
    /// +x
    Left,
    /// -x
    Right,
}

impl Direction {
    /// Grid step of one roll
    pub fn offset(self) -> Vec3i {
        match self {
            Self::Up => Vec3i::new(0, 0, 1),
            Self::Down => Vec3i::new(0, 0, -1),
            Self::Left => Vec3i::new(1, 0, 0),
            Self::Right => Vec3i::new(-1, 0, 0),
        }
    }

    /// Rotation applied by one full roll
    pub fn rotation(self) -> Quat {
        match self {
            Self::Up => Quat::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2),
            Self::Down => Quat::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2),
            Self::Left => Quat::from_axis_angle(&Vector3::z_axis(), -FRAC_PI_2),
            Self::Right => Quat::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2),
        }
    }

    fn from_key(key: KeyCode) -> Option<Self> {
        match key {
            KeyCode::Up => Some(Self::Up),
            KeyCode::Down => Some(Self::Down),
            KeyCode::Left => Some(Self::Left),
            KeyCode::Right => Some(Self::Right),
            _ => None,
        }
    }
}

/// Classify a swipe by its dominant axis
///
/// Returns the direction and how far the swipe went past `threshold`, or
/// `None` when the swipe stayed inside the threshold.
pub fn swipe(offset: &Vec3, threshold: f32) -> Option<(Direction, f32)> {
    let (along, positive, negative) = if offset.z.abs() >= offset.x.abs() {
        (offset.z, Direction::Up, Direction::Down)
    } else {
        (offset.x, Direction::Left, Direction::Right)
    };
    let distance = along.abs() - threshold;
    if distance <= 0.0 {
        return None;
    }
    Some((if along > 0.0 { positive } else { negative }, distance))
}

#[derive(Debug, Clone, Copy)]
struct Roll {
    direction: Direction,
    /// Direction of the chained roll
    next: Direction,
    /// Rolls still chained after this one
    speed: u32,
    elapsed: f64,
    duration: f64,
    from: Vec3,
}

#[derive(Debug, Clone, Copy)]
struct Pick {
    touch: u32,
    origin: Vec3,
    timestamp: f64,
    moving: bool,
}

/// Player-controlled rolling cube
pub struct CubePlayer {
    serial: u32,
    active: bool,
    size: f32,
    color: Color,
    tuning: PlayerParams,
    block: Vec3i,
    pos: Vec3,
    rotation: Quat,
    tilt: Quat,
    requested: Option<(Direction, u32)>,
    roll: Option<Roll>,
    pick: Option<Pick>,
}

impl CubePlayer {
    /// Create a player standing on `entry`
    pub fn new(serial: u32, entry: Vec3i, params: &GameParams) -> Self {
        Self {
            serial,
            active: true,
            size: params.cube.size,
            color: params.player.color,
            tuning: params.player.clone(),
            block: entry,
            pos: block_to_world(&entry, params.cube.size),
            rotation: Quat::identity(),
            tilt: Quat::identity(),
            requested: None,
            roll: None,
            pick: None,
        }
    }

    /// Stable identity carried in messages
    pub fn serial(&self) -> u32 {
        self.serial
    }

    /// Cell the player stands on, or rolls into
    pub fn block(&self) -> Vec3i {
        self.block
    }

    /// World position
    pub fn pos(&self) -> Vec3 {
        self.pos
    }

    /// Orientation including the partial roll in progress
    pub fn rotation(&self) -> Quat {
        self.tilt * self.rotation
    }

    /// Whether a roll is in progress
    pub fn is_rolling(&self) -> bool {
        self.roll.is_some()
    }

    fn info(&self) -> CubeInfo {
        CubeInfo {
            id: self.serial,
            is_player: true,
            block_pos: self.block,
            pos: self.pos,
            rotating: self.is_rolling(),
        }
    }

    fn roll_duration(&self, speed: u32) -> f64 {
        let rates = &self.tuning.move_speed;
        let rate = rates
            .get(speed as usize)
            .or_else(|| rates.last())
            .copied()
            .unwrap_or(1.0);
        self.tuning.move_rotate_time * rate
    }

    fn start_roll(
        &mut self,
        bus: &Bus,
        params: &mut Params<Value>,
        direction: Direction,
        speed: u32,
    ) -> bool {
        let target = self.block + direction.offset();
        let Some(height) = stage_height(bus, target) else {
            return false;
        };
        if height.y > self.block.y {
            return false;
        }

        if let Some(Value::CubeInfos(infos)) = params.get_mut(keys::PLAYER_INFO) {
            let taken = infos.iter().any(|info| {
                info.id != self.serial
                    && info.block_pos.x == target.x
                    && info.block_pos.z == target.z
            });
            if taken {
                return false;
            }
            if let Some(own) = infos.iter_mut().find(|info| info.id == self.serial) {
                own.block_pos = height;
                own.rotating = true;
            }
        }

        self.roll = Some(Roll {
            direction,
            next: direction,
            speed,
            elapsed: 0.0,
            duration: self.roll_duration(speed),
            from: self.pos,
        });
        self.block = height;
        true
    }

    fn advance_roll(&mut self, bus: &Bus, params: &mut Params<Value>, delta_time: f64) {
        let Some(roll) = self.roll.as_mut() else {
            return;
        };
        roll.elapsed += delta_time;
        let target = block_to_world(&self.block, self.size);

        if roll.elapsed < roll.duration {
            let t = (roll.elapsed / roll.duration) as f32;
            self.tilt = Quat::identity().slerp(&roll.direction.rotation(), t);
            self.pos = roll.from.lerp(&target, t);
            return;
        }

        let Roll { direction, next, speed, .. } = *roll;
        self.roll = None;
        self.rotation = direction.rotation() * self.rotation;
        self.tilt = Quat::identity();
        self.pos = target;
        bus.signal_with(Msg::CubePlayerPos, Params::new().with(keys::BLOCK_POS, self.block));

        if speed > 0 {
            self.start_roll(bus, params, next, speed - 1);
        }
    }

    fn fall(&mut self, bus: &Bus) {
        log::info!("player {} fell at {:?}", self.serial, self.block);
        let params = drop_off_stage(bus, self.block, self.color);
        bus.signal_with(Msg::CubePlayerDead, params);
        self.active = false;
    }

    fn is_picked(&self, touch: &Touch) -> bool {
        let half = self.size / 2.0;
        (touch.pos.x - self.pos.x).abs() <= half && (touch.pos.z - self.pos.z).abs() <= half
    }

    fn on_update(&mut self, bus: &Bus, params: &mut Params<Value>) {
        let delta_time = params.double(keys::DELTA_TIME);
        if self.roll.is_some() {
            self.advance_roll(bus, params, delta_time);
            return;
        }
        if stage_height(bus, self.block).is_none() {
            self.fall(bus);
            return;
        }
        if let Some((direction, speed)) = self.requested.take() {
            self.start_roll(bus, params, direction, speed);
        }
    }

    fn on_gather(&mut self, _: &Bus, params: &mut Params<Value>) {
        params.cube_infos_mut(keys::PLAYER_INFO).push(self.info());
    }

    fn on_key(&mut self, _: &Bus, params: &mut Params<Value>) {
        if self.roll.is_some() {
            return;
        }
        if let Some(direction) = Direction::from_key(params.key(keys::KEYCODE)) {
            self.requested = Some((direction, 0));
        }
    }

    fn on_touch_began(&mut self, _: &Bus, params: &mut Params<Value>) {
        let touches = params.touches(keys::TOUCHES);
        if self.pick.is_some() || touches.len() != 1 {
            return;
        }
        let touch = touches[0];
        if self.is_picked(&touch) {
            self.pick = Some(Pick {
                touch: touch.id,
                origin: touch.pos,
                timestamp: touch.timestamp,
                moving: false,
            });
        }
    }

    fn on_touch_moved(&mut self, _: &Bus, params: &mut Params<Value>) {
        let Some(pick) = self.pick.as_mut() else {
            return;
        };
        if pick.moving {
            return;
        }
        if let Some(touch) = params.touches(keys::TOUCHES).iter().find(|t| t.id == pick.touch) {
            pick.moving = true;
            pick.timestamp = touch.timestamp;
        }
    }

    fn on_touch_ended(&mut self, _: &Bus, params: &mut Params<Value>) {
        let Some(pick) = self.pick else {
            return;
        };
        let touches = params.touches(keys::TOUCHES);
        let Some(touch) = touches.iter().find(|t| t.id == pick.touch).copied() else {
            return;
        };
        self.pick = None;

        let threshold = self.size * self.tuning.move_threshold;
        match swipe(&(touch.pos - pick.origin), threshold) {
            None => {
                if let Some(roll) = self.roll.as_mut() {
                    roll.speed = 0;
                }
            }
            Some((direction, distance)) => {
                let touch_time = (touch.timestamp - pick.timestamp).max(MIN_SWIPE_TIME);
                let speed = distance / touch_time as f32 * self.tuning.speed_rate;
                let speed = (speed.max(0.0) as u32).min(self.tuning.max_move_speed);
                match self.roll.as_mut() {
                    Some(roll) => {
                        roll.next = direction;
                        roll.speed = speed + 1;
                    }
                    None => self.requested = Some((direction, speed)),
                }
            }
        }
    }

    fn on_reset(&mut self, _: &Bus, _: &mut Params<Value>) {
        self.active = false;
    }
}

impl Entity for CubePlayer {
    fn is_active(&self) -> bool {
        self.active
    }
}

impl Activate<Bus> for CubePlayer {
    fn activate(this: &Rc<RefCell<Self>>, bus: &Bus) {
        bus.subscribe(Msg::Update, this, Self::on_update);
        bus.subscribe(Msg::GatherInformation, this, Self::on_gather);
        bus.subscribe(Msg::KeyDown, this, Self::on_key);
        bus.subscribe(Msg::TouchBegan, this, Self::on_touch_began);
        bus.subscribe(Msg::TouchMoved, this, Self::on_touch_moved);
        bus.subscribe(Msg::TouchEnded, this, Self::on_touch_ended);
        bus.subscribe(Msg::ResetStage, this, Self::on_reset);
    }
}
