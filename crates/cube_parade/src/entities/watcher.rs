//! Stage watcher
//!
//! Turns player positions into parade events: the first player reaching the
//! start line starts the parade, the first one reaching the finish line ends
//! it.

use std::cell::RefCell;
use std::rc::Rc;

use cube_engine::ecs::{Activate, Entity};
use cube_engine::events::Params;

use crate::messages::{keys, Bus, Msg, Payload, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Watch {
    /// Waiting for a player on the start line
    Start,
    /// Tracking progress toward the finish line
    Finish,
    /// Finished; waiting for the next stage's lines
    Idle,
}

/// Watches players on behalf of the stage
pub struct StageWatcher {
    active: bool,
    watch: Watch,
    start_line: i32,
    finish_line: i32,
    final_stage: bool,
    progress: i32,
    players: u32,
}

impl StageWatcher {
    /// Create a watcher; it is idle until the stage posts its lines
    pub fn new() -> Self {
        Self {
            active: true,
            watch: Watch::Idle,
            start_line: 0,
            finish_line: 0,
            final_stage: false,
            progress: 0,
            players: 0,
        }
    }

    /// Furthest row reached by any player since the parade started
    pub fn progress(&self) -> i32 {
        self.progress
    }

    /// Players created since setup
    pub fn player_count(&self) -> u32 {
        self.players
    }

    /// Whether the parade is under way
    pub fn is_running(&self) -> bool {
        self.watch == Watch::Finish
    }

    fn on_stage_info(&mut self, _: &Bus, params: &mut Params<Value>) {
        self.start_line = params.int(keys::START_LINE);
        self.finish_line = params.int(keys::FINISH_LINE);
        self.final_stage = params.bool(keys::FINAL_STAGE);
        self.watch = Watch::Start;
    }

    fn on_player_pos(&mut self, bus: &Bus, params: &mut Params<Value>) {
        let z = params.block(keys::BLOCK_POS).z;
        match self.watch {
            Watch::Start if z >= self.start_line => {
                self.watch = Watch::Finish;
                self.progress = z;
                bus.notify(Msg::ParadeStart);
            }
            Watch::Finish => {
                self.progress = self.progress.max(z);
                if self.progress >= self.finish_line {
                    self.watch = Watch::Idle;
                    bus.notify(Msg::ParadeFinish);
                    if self.final_stage {
                        self.active = false;
                    }
                }
            }
            _ => {}
        }
    }

    fn on_player_created(&mut self, _: &Bus, _: &mut Params<Value>) {
        self.players += 1;
    }

    fn on_player_dead(&mut self, _: &Bus, _: &mut Params<Value>) {
        self.active = false;
    }
}

impl Default for StageWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Entity for StageWatcher {
    fn is_active(&self) -> bool {
        self.active
    }
}

impl Activate<Bus> for StageWatcher {
    fn activate(this: &Rc<RefCell<Self>>, bus: &Bus) {
        bus.subscribe(Msg::PostStageInfo, this, Self::on_stage_info);
        bus.subscribe(Msg::CubePlayerPos, this, Self::on_player_pos);
        bus.subscribe(Msg::CreateCubePlayer, this, Self::on_player_created);
        bus.subscribe(Msg::CubePlayerDead, this, Self::on_player_dead);
        bus.subscribe(Msg::ResetStage, this, Self::on_player_dead);
    }
}
