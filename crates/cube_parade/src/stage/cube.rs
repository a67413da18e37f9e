//! Stage block

use cube_engine::foundation::math::{block_to_world, Color, Vec3, Vec3i};

/// Kind of entity waiting on a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupant {
    /// A player cube appears once the block is built
    Player,
    /// An enemy cube appears once the block is built
    Enemy,
}

/// One cell of the stage grid
///
/// Inactive blocks still occupy their cell but are neither collidable nor
/// drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct StageCube {
    block: Vec3i,
    pos: Vec3,
    color: Color,
    active: bool,
    occupant: Option<Occupant>,
}

impl StageCube {
    /// Create a block at a grid coordinate
    pub fn new(block: Vec3i, size: f32, active: bool, color: Color) -> Self {
        Self {
            block,
            pos: block_to_world(&block, size),
            color,
            active,
            occupant: None,
        }
    }

    /// Grid coordinate; `y` is the block height
    pub fn block(&self) -> Vec3i {
        self.block
    }

    /// World position
    pub fn pos(&self) -> Vec3 {
        self.pos
    }

    /// Color
    pub fn color(&self) -> Color {
        self.color
    }

    /// Whether the block exists
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Entity waiting on this block, if any
    pub fn occupant(&self) -> Option<Occupant> {
        self.occupant
    }

    /// Mark the block as carrying an entity
    pub fn set_occupant(&mut self, occupant: Occupant) {
        self.occupant = Some(occupant);
    }

    /// Raise or lower the block by `dy` grid units
    pub fn shift_height(&mut self, dy: i32, size: f32) {
        self.block.y += dy;
        self.pos = block_to_world(&self.block, size);
    }
}

/// Blocks sharing one grid depth
pub type StageRow = Vec<StageCube>;
