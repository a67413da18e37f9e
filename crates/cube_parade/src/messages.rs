//! Message contracts between the stage, the entities and the game driver
//!
//! Every topic carries a [`Params<Value>`] payload. The key constants in
//! [`keys`] name the fields, and [`Payload`] gives typed, fail-fast access to
//! them.

use cube_engine::events::{MessageBus, Params};
use cube_engine::foundation::math::{Color, Vec3, Vec3i};

/// Topics understood by the parade simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Msg {
    /// Per-tick simulation step `{delta_time}`
    Update,
    /// Runs after every entity updated; shares the `Update` payload
    PostUpdate,
    /// Entities contribute read-only state before `Update`
    GatherInformation,
    /// Create the per-game entities (stage, watcher, touch preview)
    SetupGame,
    /// Build the stage for the current stage index
    SetupStage,
    /// Tear down the stage and everything standing on it
    ResetStage,
    /// A player reached the start line
    ParadeStart,
    /// A player reached the finish line
    ParadeFinish,
    /// The last authored stage was finished
    AllStageClear,
    /// `{start_line, finish_line, final_stage}` after each (re)build
    PostStageInfo,
    /// Height query `{block_pos}` -> `{is_cube, height}`
    CubeStageHeight,
    /// A player settled on `{block_pos}`
    CubePlayerPos,
    /// A player fell off the stage
    CubePlayerDead,
    /// `{entry_pos, color, speed}`
    CreateFallCube,
    /// `{entry_pos, offset_y, active_time, color}`
    CreateEntryCube,
    /// `{entry_pos}`
    CreateCubePlayer,
    /// `{entry_pos}`
    CreateCubeEnemy,
    /// Collapse edge of the stage `{stage_pos}`
    StagePos,
    /// `{touches}`
    TouchBegan,
    /// `{touches}`
    TouchMoved,
    /// `{touches}`
    TouchEnded,
    /// `{keycode}`
    KeyDown,
    /// Show or hide the touch preview
    TouchPreviewToggle,
}

/// The message bus used throughout the game
pub type Bus = MessageBus<Msg, Params<Value>>;

/// Payload key names
pub mod keys {
    /// Elapsed seconds for this tick (`Double`)
    pub const DELTA_TIME: &str = "delta_time";
    /// Gathered cube states (`CubeInfos`)
    pub const PLAYER_INFO: &str = "player_info";
    /// Grid cell an entity is created at (`Block`)
    pub const ENTRY_POS: &str = "entry_pos";
    /// Cube color (`Color`)
    pub const COLOR: &str = "color";
    /// Fall speed factor (`Float`)
    pub const SPEED: &str = "speed";
    /// Drop height above the target cell, world units (`Float`)
    pub const OFFSET_Y: &str = "offset_y";
    /// Reveal duration in seconds (`Double`)
    pub const ACTIVE_TIME: &str = "active_time";
    /// Queried or reported grid cell (`Block`)
    pub const BLOCK_POS: &str = "block_pos";
    /// Query result: the cell holds an active block (`Bool`)
    pub const IS_CUBE: &str = "is_cube";
    /// Query result: grid coordinate of the block (`Block`)
    pub const HEIGHT: &str = "height";
    /// Grid z of the start line (`Int`)
    pub const START_LINE: &str = "start_line";
    /// Grid z of the finish line (`Int`)
    pub const FINISH_LINE: &str = "finish_line";
    /// Whether the current stage is the last one (`Bool`)
    pub const FINAL_STAGE: &str = "final_stage";
    /// Collapse edge in world space (`Position`)
    pub const STAGE_POS: &str = "stage_pos";
    /// Stage width, world units (`Float`)
    pub const STAGE_WIDTH: &str = "stage_width";
    /// Active window depth, world units (`Float`)
    pub const STAGE_LENGTH: &str = "stage_length";
    /// World z of the collapse edge (`Float`)
    pub const STAGE_BOTTOM_Z: &str = "stage_bottom_z";
    /// Touch points (`Touches`)
    pub const TOUCHES: &str = "touches";
    /// Pressed key (`Key`)
    pub const KEYCODE: &str = "keycode";
}

/// Snapshot of one cube gathered during `GatherInformation`
#[derive(Debug, Clone, PartialEq)]
pub struct CubeInfo {
    /// Serial number of the reporting entity
    pub id: u32,
    /// Player-controlled (as opposed to an obstacle)
    pub is_player: bool,
    /// Grid cell the cube occupies or is rolling into
    pub block_pos: Vec3i,
    /// World position
    pub pos: Vec3,
    /// Whether a roll is in progress
    pub rotating: bool,
}

/// One touch point, already projected onto the ground plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Touch {
    /// Identifier stable for the lifetime of the touch
    pub id: u32,
    /// Seconds since start of the program
    pub timestamp: f64,
    /// World position on the ground plane
    pub pos: Vec3,
}

/// Keys the game reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    /// Arrow up
    Up,
    /// Arrow down
    Down,
    /// Arrow left
    Left,
    /// Arrow right
    Right,
    /// Escape
    Escape,
    /// Printable character
    Char(char),
}

/// Dynamically typed payload value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Flag
    Bool(bool),
    /// Integer (grid lines)
    Int(i32),
    /// Single precision scalar
    Float(f32),
    /// Double precision scalar (time)
    Double(f64),
    /// Grid coordinate
    Block(Vec3i),
    /// World position
    Position(Vec3),
    /// RGB color
    Color(Color),
    /// Gathered cube states
    CubeInfos(Vec<CubeInfo>),
    /// Touch points
    Touches(Vec<Touch>),
    /// Key
    Key(KeyCode),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "Bool",
            Self::Int(_) => "Int",
            Self::Float(_) => "Float",
            Self::Double(_) => "Double",
            Self::Block(_) => "Block",
            Self::Position(_) => "Position",
            Self::Color(_) => "Color",
            Self::CubeInfos(_) => "CubeInfos",
            Self::Touches(_) => "Touches",
            Self::Key(_) => "Key",
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i32 => Int,
    f32 => Float,
    f64 => Double,
    Vec3i => Block,
    Vec3 => Position,
    Color => Color,
    Vec<CubeInfo> => CubeInfos,
    Vec<Touch> => Touches,
    KeyCode => Key,
}

#[cold]
fn wrong_type(key: &str, expected: &str, found: &Value) -> ! {
    panic!(
        "payload key `{key}` holds {}, expected {expected}",
        found.type_name()
    )
}

/// Typed access to payload fields
///
/// Every accessor panics when the key is missing or holds another type; both
/// are broken publisher contracts.
pub trait Payload {
    /// Read a `Bool`
    fn bool(&self, key: &str) -> bool;
    /// Read an `Int`
    fn int(&self, key: &str) -> i32;
    /// Read a `Float`
    fn float(&self, key: &str) -> f32;
    /// Read a `Double`
    fn double(&self, key: &str) -> f64;
    /// Read a `Block`
    fn block(&self, key: &str) -> Vec3i;
    /// Read a `Position`
    fn position(&self, key: &str) -> Vec3;
    /// Read a `Color`
    fn color(&self, key: &str) -> Color;
    /// Read a `CubeInfos` list
    fn cube_infos(&self, key: &str) -> &[CubeInfo];
    /// Mutable `CubeInfos` list, for contributors
    fn cube_infos_mut(&mut self, key: &str) -> &mut Vec<CubeInfo>;
    /// Read a `Touches` list
    fn touches(&self, key: &str) -> &[Touch];
    /// Read a `Key`
    fn key(&self, key: &str) -> KeyCode;
}

impl Payload for Params<Value> {
    fn bool(&self, key: &str) -> bool {
        match self.require(key) {
            Value::Bool(v) => *v,
            other => wrong_type(key, "Bool", other),
        }
    }

    fn int(&self, key: &str) -> i32 {
        match self.require(key) {
            Value::Int(v) => *v,
            other => wrong_type(key, "Int", other),
        }
    }

    fn float(&self, key: &str) -> f32 {
        match self.require(key) {
            Value::Float(v) => *v,
            other => wrong_type(key, "Float", other),
        }
    }

    fn double(&self, key: &str) -> f64 {
        match self.require(key) {
            Value::Double(v) => *v,
            other => wrong_type(key, "Double", other),
        }
    }

    fn block(&self, key: &str) -> Vec3i {
        match self.require(key) {
            Value::Block(v) => *v,
            other => wrong_type(key, "Block", other),
        }
    }

    fn position(&self, key: &str) -> Vec3 {
        match self.require(key) {
            Value::Position(v) => *v,
            other => wrong_type(key, "Position", other),
        }
    }

    fn color(&self, key: &str) -> Color {
        match self.require(key) {
            Value::Color(v) => *v,
            other => wrong_type(key, "Color", other),
        }
    }

    fn cube_infos(&self, key: &str) -> &[CubeInfo] {
        match self.require(key) {
            Value::CubeInfos(v) => v,
            other => wrong_type(key, "CubeInfos", other),
        }
    }

    fn cube_infos_mut(&mut self, key: &str) -> &mut Vec<CubeInfo> {
        match self.require_mut(key) {
            Value::CubeInfos(v) => v,
            other => wrong_type(key, "CubeInfos", other),
        }
    }

    fn touches(&self, key: &str) -> &[Touch] {
        match self.require(key) {
            Value::Touches(v) => v,
            other => wrong_type(key, "Touches", other),
        }
    }

    fn key(&self, key: &str) -> KeyCode {
        match self.require(key) {
            Value::Key(v) => *v,
            other => wrong_type(key, "Key", other),
        }
    }
}
