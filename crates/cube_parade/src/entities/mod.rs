//! Simulation entities
//!
//! Each entity is an independent type behind the engine's liveness trait and
//! reacts only to bus topics.

pub mod enemy;
pub mod entry_cube;
pub mod fall_cube;
pub mod player;
pub mod touch_preview;
pub mod watcher;

pub use enemy::CubeEnemy;
pub use entry_cube::EntryCube;
pub use fall_cube::FallCube;
pub use player::{CubePlayer, Direction};
pub use touch_preview::TouchPreview;
pub use watcher::StageWatcher;

use cube_engine::events::Params;
use cube_engine::foundation::math::{Color, Vec3i};

use crate::messages::{keys, Bus, Msg, Payload, Value};

/// Ask the stage for the block under `block`
///
/// Returns the block's grid coordinate, or `None` for a void cell. With no
/// stage listening every cell is void.
pub(crate) fn stage_height(bus: &Bus, block: Vec3i) -> Option<Vec3i> {
    let params = bus.signal_with(
        Msg::CubeStageHeight,
        Params::new()
            .with(keys::BLOCK_POS, block)
            .with(keys::IS_CUBE, false),
    );
    params
        .bool(keys::IS_CUBE)
        .then(|| params.block(keys::HEIGHT))
}

/// Drop a cube standing on `block` off the stage
pub(crate) fn drop_off_stage(bus: &Bus, block: Vec3i, color: Color) -> Params<Value> {
    bus.signal_with(
        Msg::CreateFallCube,
        Params::new()
            .with(keys::ENTRY_POS, block + Vec3i::new(0, 1, 0))
            .with(keys::COLOR, color)
            .with(keys::SPEED, 1.0_f32),
    )
}
