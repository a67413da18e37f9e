//! Stage streaming
//!
//! The stage is authored as start, field and goal segments. Rows wait in a
//! pending queue and join the active window once their entry animation is
//! over. Both timers only run while the parade is started: the build timer
//! reveals pending rows one by one and the collapse timer drops rows off
//! the front of the window. Opening the gate to the next stage stops the
//! parade again.
//!
//! ```text
//! Unbuilt -> Streaming -> Active -> CollapsingToGoal -> NextStagePreroll
//!               ^                                          |
//!               +------------------------------------------+
//! ```
//!
//! After the last authored stage the stage reports `Cleared`.

pub mod builder;
pub mod cube;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::Rng;

use cube_engine::ecs::{run_tasks, run_timer_tasks, Activate, Entity, Tasks, TimerTasks};
use cube_engine::events::Params;
use cube_engine::foundation::math::{Color, Vec3, Vec3i};
use cube_engine::foundation::time::LapTimer;

use crate::error::GameError;
use crate::messages::{keys, Bus, Msg, Payload, Value};
use crate::params::{GameParams, StageData};

pub use builder::build_segment;
pub use cube::{Occupant, StageCube, StageRow};

/// Timer goal used to fast-forward remaining build/collapse work
const FAST_FORWARD: f64 = 0.05;

/// Seconds between a finish and the wait for both timers to go idle
const FINISH_WAIT: f64 = 2.5;

/// Base speed of cubes dropped by the collapse; a random extra is added
const FALL_SPEED_BASE: f32 = 1.0;

type StageTask = Box<dyn FnMut(&mut Stage, &Bus) -> bool>;
type StageTimerTask = Box<dyn FnOnce(&mut Stage, &Bus)>;

/// Streaming state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagePhase {
    /// Nothing built yet
    Unbuilt,
    /// Waiting for the parade to start
    Streaming,
    /// The parade is running and the stage collapses behind it
    Active,
    /// Finished; remaining collapse and build are fast-forwarded
    CollapsingToGoal,
    /// Next stage is being revealed behind the closed gate
    NextStagePreroll,
    /// Every authored stage was finished
    Cleared,
}

/// The stage streaming engine
pub struct Stage {
    params: Rc<GameParams>,
    rng: StdRng,
    active: bool,
    phase: StagePhase,

    tasks: Tasks<StageTask>,
    timer_tasks: TimerTasks<StageTimerTask>,

    current_stage: usize,
    cube_size: f32,
    width: f32,

    collapse_speed: f64,
    build_speed: f64,
    collapse_timer: LapTimer,
    collapse_index: i32,
    build_timer: LapTimer,

    pending: VecDeque<StageRow>,
    window: VecDeque<StageRow>,
    authored_rows: usize,

    field_length: usize,
    goal_length: usize,

    start_line: i32,
    finish_line: i32,
    next_start_line: i32,

    started: bool,
}

impl Stage {
    /// Create an unbuilt stage; it builds on `SetupStage`
    pub fn new(params: Rc<GameParams>, rng: StdRng) -> Self {
        let cube_size = params.cube.size;
        Self {
            params,
            rng,
            active: true,
            phase: StagePhase::Unbuilt,
            tasks: Tasks::new(),
            timer_tasks: TimerTasks::new(),
            current_stage: 0,
            cube_size,
            width: 0.0,
            collapse_speed: 0.0,
            build_speed: 0.0,
            collapse_timer: LapTimer::new(0.0),
            collapse_index: 0,
            build_timer: LapTimer::new(0.0),
            pending: VecDeque::new(),
            window: VecDeque::new(),
            authored_rows: 0,
            field_length: 0,
            goal_length: 0,
            start_line: 0,
            finish_line: 0,
            next_start_line: 0,
            started: false,
        }
    }

    /// Current streaming state
    pub fn phase(&self) -> StagePhase {
        self.phase
    }

    /// Index of the authored stage being played
    pub fn current_stage(&self) -> usize {
        self.current_stage
    }

    /// Whether the parade has started on the current stage
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Number of rows dropped off the front of the window so far
    pub fn collapse_index(&self) -> i32 {
        self.collapse_index
    }

    /// Grid z of the start line
    pub fn start_line(&self) -> i32 {
        self.start_line
    }

    /// Grid z of the finish line
    pub fn finish_line(&self) -> i32 {
        self.finish_line
    }

    /// Rows in the active window
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Rows still waiting to be built
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Rows authored since setup, across every stage
    pub fn authored_rows(&self) -> usize {
        self.authored_rows
    }

    /// Active block at grid `(x, z)`, if the cell is inside the window
    ///
    /// Cells behind the collapse edge, ahead of the window or without a block
    /// all report `None`.
    pub fn cube_at(&self, x: i32, z: i32) -> Option<&StageCube> {
        let row = usize::try_from(z.checked_sub(self.collapse_index)?).ok()?;
        let x = usize::try_from(x).ok()?;
        self.window
            .get(row)?
            .get(x)
            .filter(|cube| cube.is_active())
    }

    fn is_final_stage(&self) -> bool {
        self.current_stage + 1 == self.params.stage.data.len()
    }

    fn collapse_progress(&self) -> f32 {
        (f64::from(self.collapse_index) + self.collapse_timer.progress_fraction()) as f32
    }

    fn stage_data<'a>(&self, params: &'a GameParams) -> Result<&'a StageData, GameError> {
        params.stage.data.get(self.current_stage).ok_or_else(|| {
            GameError::Stage(format!("no authored stage at index {}", self.current_stage))
        })
    }

    fn append_segment(&mut self, body: &[Vec<i32>], start_z: i32, marker_line: bool) -> usize {
        let rows = build_segment(body, start_z, self.cube_size, marker_line);
        let count = rows.len();
        self.pending.extend(rows);
        self.authored_rows += count;
        count
    }

    fn mark_entries(
        &mut self,
        data: &StageData,
        field_index: usize,
        goal_index: usize,
    ) -> Result<(), GameError> {
        let finish = data.finish_entry.iter().map(|e| (e, goal_index, Occupant::Player));
        let enemies = data.enemy_entry.iter().map(|e| (e, field_index, Occupant::Enemy));
        for (&[x, row], base, occupant) in finish.chain(enemies) {
            let cube = self
                .pending
                .get_mut(base + row)
                .and_then(|cells| cells.get_mut(x))
                .ok_or_else(|| {
                    GameError::Stage(format!(
                        "{occupant:?} entry [{x}, {row}] is outside its segment"
                    ))
                })?;
            cube.set_occupant(occupant);
        }
        Ok(())
    }

    fn apply_speeds(&mut self, data: &StageData) {
        self.collapse_speed = data.collapse_speed;
        self.build_speed = data.build_speed;
    }

    fn post_stage_info(&self, bus: &Bus) {
        bus.signal_with(
            Msg::PostStageInfo,
            Params::new()
                .with(keys::START_LINE, self.start_line)
                .with(keys::FINISH_LINE, self.finish_line)
                .with(keys::FINAL_STAGE, self.is_final_stage()),
        );
    }

    fn setup(&mut self, bus: &Bus) -> Result<(), GameError> {
        let params = Rc::clone(&self.params);
        let data = self.stage_data(&params)?;
        let stage = &params.stage;
        self.width = stage.width as f32 * self.cube_size;

        let start_length = self.append_segment(&stage.start.body, 0, true);
        let mut offset_z = start_length as i32;
        self.start_line = offset_z - 1;

        let field_index = self.pending.len();
        self.field_length = self.append_segment(&data.body, offset_z, true);
        offset_z += self.field_length as i32;
        self.finish_line = offset_z - 1;

        self.apply_speeds(data);
        self.collapse_timer = LapTimer::new(self.collapse_speed);
        self.build_timer = LapTimer::new(self.build_speed);

        let goal_index = self.pending.len();
        let marker_line = !self.is_final_stage();
        self.goal_length =
            self.append_segment(&stage.goal_for(self.current_stage).body, offset_z, marker_line);
        offset_z += self.goal_length as i32;
        self.next_start_line = offset_z - 1;

        self.mark_entries(data, field_index, goal_index)?;

        for _ in 0..stage.start_length {
            let Some(row) = self.pending.pop_front() else {
                break;
            };
            self.window.push_back(row);
        }

        self.phase = StagePhase::Streaming;
        log::info!(
            "stage {} set up: start line {}, finish line {}, {} rows pending",
            self.current_stage,
            self.start_line,
            self.finish_line,
            self.pending.len()
        );
        self.post_stage_info(bus);
        Ok(())
    }

    fn collapse_row(&mut self, bus: &Bus) {
        let Some(row) = self.window.pop_front() else {
            log::debug!("collapse caught up with the build at row {}", self.collapse_index);
            return;
        };

        for cube in row.iter().filter(|cube| cube.is_active()) {
            let speed = FALL_SPEED_BASE + self.rng.gen::<f32>();
            bus.signal_with(
                Msg::CreateFallCube,
                Params::new()
                    .with(keys::ENTRY_POS, cube.block())
                    .with(keys::COLOR, cube.color())
                    .with(keys::SPEED, speed),
            );
        }

        self.collapse_index += 1;
        log::debug!("collapsed row {}", self.collapse_index - 1);
        if self.collapse_index >= self.finish_line {
            self.collapse_timer.stop();
        }
    }

    fn build_row(&mut self, bus: &Bus) {
        let Some(row) = self.pending.pop_front() else {
            self.build_timer.stop();
            return;
        };

        let reveal = self.build_speed;
        let size = self.cube_size;
        let drop_height = self.params.entry_cube.drop_height;
        for cube in row.iter().filter(|cube| cube.is_active()) {
            let block = cube.block();
            let offset_y = (drop_height + self.rng.gen::<f32>()) * size;
            bus.signal_with(
                Msg::CreateEntryCube,
                entry_cube_params(block, offset_y, reveal, cube.color()),
            );

            let Some(occupant) = cube.occupant() else {
                continue;
            };
            let (color, topic) = match occupant {
                Occupant::Player => (self.params.player.color, Msg::CreateCubePlayer),
                Occupant::Enemy => (self.params.enemy.color, Msg::CreateCubeEnemy),
            };
            bus.signal_with(
                Msg::CreateEntryCube,
                entry_cube_params(block + Vec3i::new(0, 1, 0), offset_y + size, reveal, color),
            );
            self.timer_tasks.add(
                reveal,
                Box::new(move |_: &mut Stage, bus: &Bus| {
                    bus.signal_with(topic, Params::new().with(keys::ENTRY_POS, block));
                }),
            );
        }

        if let Some(z) = row.first().map(|cube| cube.block().z) {
            log::debug!("building row {z}");
        }
        // Joins the window once the entry animation is over
        self.timer_tasks.add(
            reveal,
            Box::new(move |stage: &mut Stage, _: &Bus| stage.window.push_back(row)),
        );

        if self.pending.is_empty() {
            self.build_timer.stop();
        }
    }

    fn begin_finish(&mut self) {
        if self.collapse_timer.is_active() {
            self.collapse_timer.set_goal(FAST_FORWARD);
        }
        if self.build_timer.is_active() {
            self.build_timer.set_goal(FAST_FORWARD);
        }
        self.phase = StagePhase::CollapsingToGoal;

        self.timer_tasks.add(
            FINISH_WAIT,
            Box::new(|stage: &mut Stage, _: &Bus| {
                stage
                    .tasks
                    .add(Box::new(|stage: &mut Stage, bus: &Bus| stage.try_advance(bus)));
            }),
        );
    }

    fn try_advance(&mut self, bus: &Bus) -> bool {
        if self.collapse_timer.is_active() || self.build_timer.is_active() {
            return false;
        }

        self.current_stage += 1;
        if self.current_stage >= self.params.stage.data.len() {
            log::info!("all stages clear");
            self.phase = StagePhase::Cleared;
            bus.notify(Msg::AllStageClear);
            return true;
        }

        if let Err(error) = self.build_next(bus) {
            log::error!("stage {} aborted: {error}", self.current_stage);
            self.active = false;
        }
        true
    }

    fn build_next(&mut self, bus: &Bus) -> Result<(), GameError> {
        let params = Rc::clone(&self.params);
        let data = self.stage_data(&params)?;
        let final_stage = self.is_final_stage();

        // Reveal the head of the next stage quickly
        self.build_timer.set_goal(self.build_speed / 3.0);
        self.build_timer.start();

        self.start_line = self.next_start_line;
        let mut offset_z = self.next_start_line + 1;

        let field_index = self.pending.len();
        self.field_length = self.append_segment(&data.body, offset_z, true);
        offset_z += self.field_length as i32;
        self.finish_line = offset_z - 1;

        self.apply_speeds(data);

        let goal_index = self.pending.len();
        let goal = params.stage.goal_for(self.current_stage);
        self.goal_length = self.append_segment(&goal.body, offset_z, !final_stage);
        offset_z += self.goal_length as i32;
        self.next_start_line = offset_z - 1;

        self.mark_entries(data, field_index, goal_index)?;

        self.phase = StagePhase::NextStagePreroll;
        log::info!(
            "advanced to stage {}: start line {}, finish line {}",
            self.current_stage,
            self.start_line,
            self.finish_line
        );
        self.post_stage_info(bus);

        let new_rows = self.field_length + self.goal_length;
        let target = (new_rows + self.goal_length).saturating_sub(params.stage.start_length);
        self.tasks.add(Box::new(move |stage: &mut Stage, _: &Bus| {
            stage.try_open_gate(target)
        }));
        Ok(())
    }

    fn try_open_gate(&mut self, target: usize) -> bool {
        if self.pending.len() > target {
            return false;
        }

        self.collapse_timer.set_goal(self.collapse_speed);
        self.collapse_timer.start();
        self.build_timer.set_goal(self.build_speed);
        self.open_gate();
        // Nothing moves again until the next parade start
        self.started = false;
        self.phase = StagePhase::Streaming;
        true
    }

    /// Lower the start line by one block so players can step onto it
    fn open_gate(&mut self) {
        let start_line = self.start_line;
        let size = self.cube_size;
        let row = self
            .window
            .iter_mut()
            .chain(self.pending.iter_mut())
            .find(|row| row.first().is_some_and(|cube| cube.block().z == start_line));
        match row {
            Some(row) => {
                for cube in row.iter_mut() {
                    cube.shift_height(-1, size);
                }
                log::debug!("gate opened at row {start_line}");
            }
            None => log::warn!("gate row {start_line} is not on the stage"),
        }
    }

    fn on_setup(&mut self, bus: &Bus, _: &mut Params<Value>) {
        if let Err(error) = self.setup(bus) {
            log::error!("stage setup aborted: {error}");
            self.active = false;
        }
    }

    fn on_reset(&mut self, _: &Bus, _: &mut Params<Value>) {
        self.active = false;
    }

    fn on_update(&mut self, bus: &Bus, params: &mut Params<Value>) {
        let delta_time = params.double(keys::DELTA_TIME);

        let edge = Vec3::new(self.width / 2.0, 0.0, self.collapse_progress() * self.cube_size);
        bus.signal_with(Msg::StagePos, Params::new().with(keys::STAGE_POS, edge));

        run_timer_tasks(self, |stage| &mut stage.timer_tasks, delta_time, |task, stage| {
            task(stage, bus);
        });
        run_tasks(self, |stage| &mut stage.tasks, |task, stage| task(stage, bus));

        if !self.started {
            return;
        }
        if self.collapse_timer.tick(delta_time) {
            self.collapse_row(bus);
        }
        if self.build_timer.tick(delta_time) {
            self.build_row(bus);
        }
    }

    fn on_height_query(&mut self, _: &Bus, params: &mut Params<Value>) {
        params.set(keys::IS_CUBE, false);
        let block = params.block(keys::BLOCK_POS);
        if let Some(cube) = self.cube_at(block.x, block.z) {
            let height = cube.block();
            params.set(keys::IS_CUBE, true);
            params.set(keys::HEIGHT, height);
        }
    }

    fn on_gather(&mut self, _: &Bus, params: &mut Params<Value>) {
        params.set(keys::STAGE_WIDTH, self.width);
        params.set(keys::STAGE_LENGTH, self.window.len() as f32 * self.cube_size);
        params.set(keys::STAGE_BOTTOM_Z, self.collapse_progress() * self.cube_size);
    }

    fn on_parade_start(&mut self, _: &Bus, _: &mut Params<Value>) {
        self.started = true;
        self.phase = StagePhase::Active;
        log::info!("parade started on stage {}", self.current_stage);
    }

    fn on_parade_finish(&mut self, _: &Bus, _: &mut Params<Value>) {
        log::info!("parade finished on stage {}", self.current_stage);
        self.begin_finish();
    }
}

fn entry_cube_params(
    block: Vec3i,
    offset_y: f32,
    active_time: f64,
    color: Color,
) -> Params<Value> {
    Params::new()
        .with(keys::ENTRY_POS, block)
        .with(keys::OFFSET_Y, offset_y)
        .with(keys::ACTIVE_TIME, active_time)
        .with(keys::COLOR, color)
}

impl Entity for Stage {
    fn is_active(&self) -> bool {
        self.active
    }
}

impl Activate<Bus> for Stage {
    fn activate(this: &Rc<RefCell<Self>>, bus: &Bus) {
        bus.subscribe(Msg::Update, this, Self::on_update);
        bus.subscribe(Msg::SetupStage, this, Self::on_setup);
        bus.subscribe(Msg::ResetStage, this, Self::on_reset);
        bus.subscribe(Msg::CubeStageHeight, this, Self::on_height_query);
        bus.subscribe(Msg::GatherInformation, this, Self::on_gather);
        bus.subscribe(Msg::ParadeStart, this, Self::on_parade_start);
        bus.subscribe(Msg::ParadeFinish, this, Self::on_parade_finish);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Segment;
    use cube_engine::ecs::share;
    use rand::SeedableRng;

    const STEP: f64 = 0.1;

    fn spawn(params: GameParams, bus: &Bus) -> Rc<RefCell<Stage>> {
        let stage = share(Stage::new(Rc::new(params), StdRng::seed_from_u64(7)));
        Stage::activate(&stage, bus);
        bus.notify(Msg::SetupStage);
        stage
    }

    fn tick(bus: &Bus) {
        bus.signal_with(Msg::Update, Params::new().with(keys::DELTA_TIME, STEP));
    }

    /// Tick for `seconds`, checking the window bound after every tick
    fn run(bus: &Bus, stage: &Rc<RefCell<Stage>>, seconds: f64) {
        let ticks = (seconds / STEP).round() as usize;
        for _ in 0..ticks {
            tick(bus);
            let stage = stage.borrow();
            assert!(stage.window_len() <= stage.authored_rows());
        }
    }

    fn query(bus: &Bus, x: i32, z: i32) -> Option<Vec3i> {
        let params = bus.signal_with(
            Msg::CubeStageHeight,
            Params::new().with(keys::BLOCK_POS, Vec3i::new(x, 0, z)),
        );
        params.bool(keys::IS_CUBE).then(|| params.block(keys::HEIGHT))
    }

    fn record(bus: &Bus, topic: Msg) -> Rc<RefCell<Vec<Params<Value>>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        bus.subscribe_fn(topic, move |_, params| sink.borrow_mut().push(params.clone()));
        log
    }

    /// One start row, a 3x3 field, one goal row
    fn small_params(start_length: usize, collapse_speed: f64, build_speed: f64) -> GameParams {
        let mut params = GameParams::default();
        params.stage.width = 3;
        params.stage.start_length = start_length;
        params.stage.start = Segment::flat(3, 1, 0);
        params.stage.goal = Segment::flat(3, 1, 0);
        params.stage.final_goal = Segment::flat(3, 1, 0);
        params.stage.data.truncate(1);
        params.stage.data[0].body = vec![vec![0; 3]; 3];
        params.stage.data[0].collapse_speed = collapse_speed;
        params.stage.data[0].build_speed = build_speed;
        params.stage.data[0].finish_entry.clear();
        params.stage.data[0].enemy_entry.clear();
        params
    }

    /// Two stages of two field rows, with a gate in the goal
    fn two_stage_params() -> GameParams {
        let mut params = GameParams::default();
        params.stage.width = 2;
        params.stage.start_length = 3;
        params.stage.start = Segment::flat(2, 2, 0);
        params.stage.goal = Segment {
            body: vec![vec![0, 0], vec![1, 1]],
        };
        params.stage.final_goal = Segment::flat(2, 1, 0);
        params.stage.data.truncate(2);
        for data in &mut params.stage.data {
            data.body = vec![vec![0, 0]; 2];
            data.collapse_speed = 0.5;
            data.build_speed = 0.2;
            data.finish_entry.clear();
            data.enemy_entry.clear();
        }
        params
    }

    #[test]
    fn test_setup_posts_stage_info() {
        let bus = Bus::new();
        let info = record(&bus, Msg::PostStageInfo);
        let stage = spawn(small_params(2, 1.0, 1.0), &bus);

        let info = info.borrow();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].int(keys::START_LINE), 0);
        assert_eq!(info[0].int(keys::FINISH_LINE), 3);
        assert!(info[0].bool(keys::FINAL_STAGE));

        let stage = stage.borrow();
        assert_eq!(stage.phase(), StagePhase::Streaming);
        assert_eq!(stage.window_len(), 2);
        assert_eq!(stage.pending_len(), 3);
        assert_eq!(stage.authored_rows(), 5);
    }

    #[test]
    fn test_collapse_publishes_one_batch_per_row() {
        let bus = Bus::new();
        let falls = record(&bus, Msg::CreateFallCube);
        let stage = spawn(small_params(5, 1.0, 1.0), &bus);
        bus.notify(Msg::ParadeStart);

        run(&bus, &stage, 0.9);
        assert!(falls.borrow().is_empty());

        run(&bus, &stage, 2.1);
        let rows: Vec<i32> = falls
            .borrow()
            .iter()
            .map(|params| params.block(keys::ENTRY_POS).z)
            .collect();
        assert_eq!(rows, vec![0, 0, 0, 1, 1, 1, 2, 2, 2]);
        for params in falls.borrow().iter() {
            let speed = params.float(keys::SPEED);
            assert!((1.0..2.0).contains(&speed));
        }

        // Collapse halts on the finish line
        run(&bus, &stage, 5.0);
        assert_eq!(falls.borrow().len(), 9);
        assert_eq!(stage.borrow().collapse_index(), 3);
    }

    #[test]
    fn test_no_collapse_before_parade_start() {
        let bus = Bus::new();
        let falls = record(&bus, Msg::CreateFallCube);
        let stage = spawn(small_params(5, 1.0, 1.0), &bus);
        run(&bus, &stage, 5.0);
        assert!(falls.borrow().is_empty());
        assert_eq!(stage.borrow().collapse_index(), 0);
    }

    #[test]
    fn test_build_waits_for_parade_start() {
        let bus = Bus::new();
        let entries = record(&bus, Msg::CreateEntryCube);
        let stage = spawn(small_params(2, 1.0, 1.0), &bus);

        run(&bus, &stage, 5.0);
        assert!(entries.borrow().is_empty());
        assert_eq!(query(&bus, 1, 2), None);
        {
            let stage = stage.borrow();
            assert_eq!(stage.phase(), StagePhase::Streaming);
            assert_eq!(stage.window_len(), 2);
            assert_eq!(stage.pending_len(), 3);
        }

        bus.notify(Msg::ParadeStart);
        run(&bus, &stage, 1.0);
        assert_eq!(entries.borrow().len(), 3);
        assert_eq!(stage.borrow().pending_len(), 2);
    }

    #[test]
    fn test_height_query_follows_build_and_collapse() {
        let bus = Bus::new();
        let entries = record(&bus, Msg::CreateEntryCube);
        let stage = spawn(small_params(2, 1.0, 1.0), &bus);

        assert_eq!(query(&bus, 1, 1), Some(Vec3i::new(1, 0, 1)));
        assert_eq!(query(&bus, 1, 2), None);

        // Built after one second, revealed one second later
        bus.notify(Msg::ParadeStart);
        run(&bus, &stage, 1.0);
        assert_eq!(entries.borrow().len(), 3);
        assert_eq!(query(&bus, 1, 0), None);
        assert_eq!(query(&bus, 1, 2), None);
        run(&bus, &stage, 1.0);
        assert_eq!(query(&bus, 1, 1), None);
        assert_eq!(query(&bus, 1, 2), Some(Vec3i::new(1, 0, 2)));

        run(&bus, &stage, 1.0);
        assert_eq!(stage.borrow().collapse_index(), 3);
        assert_eq!(query(&bus, 1, 2), None);
        assert_eq!(query(&bus, 1, 3), Some(Vec3i::new(1, 0, 3)));
    }

    #[test]
    fn test_out_of_window_queries_report_no_block() {
        let bus = Bus::new();
        spawn(small_params(2, 1.0, 1.0), &bus);
        assert_eq!(query(&bus, -1, 0), None);
        assert_eq!(query(&bus, 3, 0), None);
        assert_eq!(query(&bus, 0, -4), None);
        assert_eq!(query(&bus, 0, 40), None);
    }

    #[test]
    fn test_holes_are_not_cubes() {
        let bus = Bus::new();
        let mut params = small_params(5, 1.0, 1.0);
        params.stage.data[0].body[0][2] = -1;
        spawn(params, &bus);
        assert_eq!(query(&bus, 2, 1), None);
        assert_eq!(query(&bus, 1, 1), Some(Vec3i::new(1, 0, 1)));
    }

    #[test]
    fn test_empty_rows_still_consume_a_cycle() {
        let bus = Bus::new();
        let falls = record(&bus, Msg::CreateFallCube);
        let mut params = small_params(5, 1.0, 1.0);
        params.stage.data[0].body[0] = vec![-1; 3];
        let stage = spawn(params, &bus);
        bus.notify(Msg::ParadeStart);

        run(&bus, &stage, 3.0);
        let rows: Vec<i32> = falls
            .borrow()
            .iter()
            .map(|params| params.block(keys::ENTRY_POS).z)
            .collect();
        assert_eq!(rows, vec![0, 0, 0, 2, 2, 2]);
        assert_eq!(stage.borrow().collapse_index(), 3);
    }

    #[test]
    fn test_finish_entry_spawns_player_after_reveal() {
        let bus = Bus::new();
        let players = record(&bus, Msg::CreateCubePlayer);
        let entries = record(&bus, Msg::CreateEntryCube);
        let mut params = small_params(4, 1.0, 1.0);
        params.stage.data[0].finish_entry.push([1, 0]);
        let stage = spawn(params, &bus);
        bus.notify(Msg::ParadeStart);

        run(&bus, &stage, 1.0);
        // Goal row built: three blocks plus the player's own entry cube
        assert_eq!(entries.borrow().len(), 4);
        assert!(players.borrow().is_empty());

        run(&bus, &stage, 1.0);
        let players = players.borrow();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].block(keys::ENTRY_POS), Vec3i::new(1, 0, 4));
    }

    #[test]
    fn test_enemy_entry_spawns_enemy() {
        let bus = Bus::new();
        let enemies = record(&bus, Msg::CreateCubeEnemy);
        let mut params = small_params(2, 1.0, 0.5);
        params.stage.data[0].enemy_entry.push([2, 1]);
        let stage = spawn(params, &bus);
        bus.notify(Msg::ParadeStart);

        run(&bus, &stage, 2.0);
        let enemies = enemies.borrow();
        assert_eq!(enemies.len(), 1);
        assert_eq!(enemies[0].block(keys::ENTRY_POS), Vec3i::new(2, 0, 2));
    }

    #[test]
    fn test_finish_advances_and_opens_gate() {
        let bus = Bus::new();
        let info = record(&bus, Msg::PostStageInfo);
        let clear = record(&bus, Msg::AllStageClear);
        let entries = record(&bus, Msg::CreateEntryCube);
        let stage = spawn(two_stage_params(), &bus);
        assert_eq!(stage.borrow().finish_line(), 3);

        bus.notify(Msg::ParadeStart);
        run(&bus, &stage, 5.0);
        assert_eq!(stage.borrow().collapse_index(), 3);

        bus.notify(Msg::ParadeFinish);
        assert_eq!(stage.borrow().phase(), StagePhase::CollapsingToGoal);
        run(&bus, &stage, 2.0);
        assert_eq!(stage.borrow().current_stage(), 0);

        run(&bus, &stage, 8.0);
        {
            let stage = stage.borrow();
            assert_eq!(stage.current_stage(), 1);
            assert_eq!(stage.phase(), StagePhase::Streaming);
            assert!(!stage.is_started());
            assert_eq!(stage.start_line(), 5);
            assert_eq!(stage.finish_line(), 7);
        }
        {
            let info = info.borrow();
            assert_eq!(info.len(), 2);
            assert_eq!(info[1].int(keys::START_LINE), 5);
            assert!(info[1].bool(keys::FINAL_STAGE));
        }
        // Gate row lowered from height 1 to 0
        assert_eq!(query(&bus, 0, 5), Some(Vec3i::new(0, 0, 5)));
        assert!(clear.borrow().is_empty());

        // The open gate holds the rest of the stage until the next start
        let built = entries.borrow().len();
        run(&bus, &stage, 3.0);
        assert_eq!(entries.borrow().len(), built);
        assert_eq!(stage.borrow().pending_len(), 1);
        assert_eq!(stage.borrow().collapse_index(), 3);

        bus.notify(Msg::ParadeStart);
        run(&bus, &stage, 5.0);
        assert_eq!(stage.borrow().collapse_index(), 7);
        bus.notify(Msg::ParadeFinish);
        run(&bus, &stage, 4.0);
        assert_eq!(clear.borrow().len(), 1);
        assert_eq!(stage.borrow().phase(), StagePhase::Cleared);
    }

    #[test]
    fn test_invalid_entry_aborts_setup() {
        let bus = Bus::new();
        let mut params = small_params(2, 1.0, 1.0);
        params.stage.data[0].finish_entry.push([0, 9]);
        let stage = spawn(params, &bus);
        assert!(!stage.borrow().is_active());
    }

    #[test]
    fn test_reset_deactivates() {
        let bus = Bus::new();
        let stage = spawn(small_params(2, 1.0, 1.0), &bus);
        bus.notify(Msg::ResetStage);
        assert!(!stage.borrow().is_active());
    }

    #[test]
    fn test_gather_reports_stage_extent() {
        let bus = Bus::new();
        spawn(small_params(2, 1.0, 1.0), &bus);
        let params = bus.signal_with(Msg::GatherInformation, Params::new());
        assert_eq!(params.float(keys::STAGE_WIDTH), 3.0);
        assert_eq!(params.float(keys::STAGE_LENGTH), 2.0);
        assert_eq!(params.float(keys::STAGE_BOTTOM_Z), 0.0);
    }
}
