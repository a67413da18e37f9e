//! Game parameters
//!
//! The whole authored parameter tree: cube geometry, stage layouts, entity
//! tuning, camera and light. Loaded from RON or TOML through the engine
//! [`Config`] trait; [`GameParams::default`] carries a built-in level set.

use serde::{Deserialize, Serialize};

use cube_engine::config::{Config, ConfigError};
use cube_engine::foundation::math::{Color, Vec3, Vec3i};

/// Root of the parameter tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GameParams {
    /// Cube geometry
    pub cube: CubeParams,
    /// Stage layouts
    pub stage: StageParams,
    /// Player cube tuning
    pub player: PlayerParams,
    /// Enemy cube tuning
    pub enemy: EnemyParams,
    /// Falling cube tuning
    pub fall_cube: FallCubeParams,
    /// Entry cube tuning
    pub entry_cube: EntryCubeParams,
    /// Camera framing
    pub camera: CameraParams,
    /// Light tracking
    pub light: LightParams,
    /// Game driver settings
    pub game: GameEntryParams,
}

impl Config for GameParams {}

/// Cube geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CubeParams {
    /// Edge length of one block in world units
    pub size: f32,
}

impl Default for CubeParams {
    fn default() -> Self {
        Self { size: 1.0 }
    }
}

/// A rectangular grid of per-cell heights; negative means no block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Segment {
    /// Rows in increasing z, cells in increasing x
    pub body: Vec<Vec<i32>>,
}

impl Segment {
    /// Segment with `rows` rows of `width` cells at height `height`
    pub fn flat(width: usize, rows: usize, height: i32) -> Self {
        Self {
            body: vec![vec![height; width]; rows],
        }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Whether the segment has no rows
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// One authored stage: the field between start and goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageData {
    /// Field layout
    pub body: Vec<Vec<i32>>,
    /// Seconds between two collapsed rows
    pub collapse_speed: f64,
    /// Seconds between two built rows
    pub build_speed: f64,
    /// Players waiting in the goal, as `[x, row within the goal]`
    #[serde(default)]
    pub finish_entry: Vec<[usize; 2]>,
    /// Obstacles in the field, as `[x, row within the field]`
    #[serde(default)]
    pub enemy_entry: Vec<[usize; 2]>,
}

/// Stage layouts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageParams {
    /// Number of cells per row
    pub width: u32,
    /// Rows placed in the active window right away
    pub start_length: usize,
    /// Leading segment of the first stage
    pub start: Segment,
    /// Goal segment of every stage but the last
    pub goal: Segment,
    /// Goal segment of the last stage
    pub final_goal: Segment,
    /// Authored stages in play order
    pub data: Vec<StageData>,
}

impl StageParams {
    /// Goal segment used by stage `index`
    pub fn goal_for(&self, index: usize) -> &Segment {
        if index + 1 == self.data.len() {
            &self.final_goal
        } else {
            &self.goal
        }
    }
}

impl Default for StageParams {
    fn default() -> Self {
        let width = 5;
        let mut goal = Segment::flat(width, 4, 0);
        // Gate row: raised until the next stage opens it
        if let Some(last) = goal.body.last_mut() {
            last.fill(1);
        }

        Self {
            width: width as u32,
            start_length: 6,
            start: Segment::flat(width, 3, 0),
            goal,
            final_goal: Segment::flat(width, 3, 0),
            data: vec![
                StageData {
                    body: vec![
                        vec![0, 0, 0, 0, 0],
                        vec![0, 0, 0, 0, 0],
                        vec![0, -1, 0, 0, 0],
                        vec![0, 0, 0, -1, 0],
                        vec![0, 0, 0, 0, 0],
                        vec![0, 0, 0, 0, 0],
                    ],
                    collapse_speed: 3.0,
                    build_speed: 0.5,
                    finish_entry: vec![[1, 1]],
                    enemy_entry: vec![],
                },
                StageData {
                    body: vec![
                        vec![0, 0, 0, 0, 0],
                        vec![0, -1, 0, -1, 0],
                        vec![0, 0, 0, 0, 0],
                        vec![0, 0, 1, 0, 0],
                        vec![-1, 0, 0, 0, -1],
                        vec![0, 0, 0, 0, 0],
                        vec![0, 0, 0, 0, 0],
                    ],
                    collapse_speed: 2.5,
                    build_speed: 0.4,
                    finish_entry: vec![[3, 1]],
                    enemy_entry: vec![[2, 2]],
                },
                StageData {
                    body: vec![
                        vec![0, 0, 0, 0, 0],
                        vec![0, -1, -1, 0, 0],
                        vec![0, 0, 0, 0, -1],
                        vec![-1, 0, 1, 0, 0],
                        vec![0, 0, 0, -1, 0],
                        vec![0, 0, 0, 0, 0],
                        vec![0, 0, 0, 0, 0],
                        vec![0, 0, 0, 0, 0],
                    ],
                    collapse_speed: 2.0,
                    build_speed: 0.3,
                    finish_entry: vec![],
                    enemy_entry: vec![[1, 5], [4, 6]],
                },
            ],
        }
    }
}

/// Player cube tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerParams {
    /// Body color
    pub color: Color,
    /// Seconds for one roll at the slowest speed
    pub move_rotate_time: f64,
    /// Swipe distance, in cubes, below which a swipe is ignored
    pub move_threshold: f32,
    /// Swipe speed to chained-move count factor
    pub speed_rate: f32,
    /// Most moves one swipe may chain
    pub max_move_speed: u32,
    /// Roll time multiplier per chain speed; the last entry repeats
    pub move_speed: Vec<f64>,
}

impl Default for PlayerParams {
    fn default() -> Self {
        Self {
            color: Color::new(0.2, 0.4, 1.0),
            move_rotate_time: 0.25,
            move_threshold: 0.3,
            speed_rate: 0.2,
            max_move_speed: 4,
            move_speed: vec![1.0, 0.8, 0.6, 0.5, 0.4],
        }
    }
}

/// Enemy cube tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyParams {
    /// Body color
    pub color: Color,
}

impl Default for EnemyParams {
    fn default() -> Self {
        Self {
            color: Color::new(1.0, 0.5, 0.1),
        }
    }
}

/// Falling cube tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallCubeParams {
    /// Seconds before a falling cube is removed
    pub active_time: f64,
    /// Base acceleration; `y` is scaled by the cube's speed
    pub acc: Vec3,
}

impl Default for FallCubeParams {
    fn default() -> Self {
        Self {
            active_time: 2.0,
            acc: Vec3::new(0.0, -9.8, 0.0),
        }
    }
}

/// Entry cube tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryCubeParams {
    /// Base drop height in blocks; a random extra block is added
    pub drop_height: f32,
}

impl Default for EntryCubeParams {
    fn default() -> Self {
        Self { drop_height: 5.0 }
    }
}

/// Camera framing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraParams {
    /// Eye offset from the framed point
    pub eye_pos: Vec3,
    /// Interest offset from the framed point
    pub interest_pos: Vec3,
    /// How far sideways player movement pulls the camera (0 = fixed center)
    pub center_rate: f32,
    /// How far forward player movement pulls the camera from the collapse edge
    pub bottom_rate: f32,
    /// Easing rate while no cube rolls
    pub ease_cube_stop: f32,
    /// Easing rate while a cube rolls
    pub ease_cube_move: f32,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            eye_pos: Vec3::new(0.0, 8.0, -6.0),
            interest_pos: Vec3::new(0.0, 0.0, 2.0),
            center_rate: 0.5,
            bottom_rate: 0.6,
            ease_cube_stop: 0.05,
            ease_cube_move: 0.1,
        }
    }
}

/// Light tracking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightParams {
    /// Offset from the collapse edge
    pub pos: Vec3,
    /// Easing rate per update
    pub ease: f32,
}

impl Default for LightParams {
    fn default() -> Self {
        Self {
            pos: Vec3::new(0.0, 10.0, 4.0),
            ease: 0.1,
        }
    }
}

/// Game driver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameEntryParams {
    /// Cells players start on
    pub entry: Vec<Vec3i>,
    /// Seconds between game over and the restart
    pub restart_delay: f64,
}

impl Default for GameEntryParams {
    fn default() -> Self {
        Self {
            entry: vec![Vec3i::new(2, 0, 1)],
            restart_delay: 3.0,
        }
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

fn check_segment(name: &str, body: &[Vec<i32>], width: usize) -> Result<(), ConfigError> {
    if body.is_empty() {
        return Err(invalid(format!("{name} has no rows")));
    }
    if let Some(z) = body.iter().position(|row| row.len() > width) {
        return Err(invalid(format!("{name} row {z} is wider than the stage ({width})")));
    }
    Ok(())
}

fn check_entries(
    name: &str,
    entries: &[[usize; 2]],
    body: &[Vec<i32>],
) -> Result<(), ConfigError> {
    for &[x, row] in entries {
        let inside = body.get(row).is_some_and(|cells| x < cells.len());
        if !inside {
            return Err(invalid(format!("{name} entry [{x}, {row}] is outside its segment")));
        }
    }
    Ok(())
}

impl GameParams {
    /// Load parameters from a RON or TOML file and validate them
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let params = Self::load_from_file(path)?;
        params.validate()?;
        Ok(params)
    }

    /// Reject parameter trees the simulation cannot run
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cube.size <= 0.0 {
            return Err(invalid("cube.size must be positive"));
        }

        let stage = &self.stage;
        let width = stage.width as usize;
        if width == 0 {
            return Err(invalid("stage.width must be positive"));
        }
        if stage.data.is_empty() {
            return Err(invalid("stage.data has no stages"));
        }
        check_segment("stage.start", &stage.start.body, width)?;
        check_segment("stage.goal", &stage.goal.body, width)?;
        check_segment("stage.final_goal", &stage.final_goal.body, width)?;

        for (index, data) in stage.data.iter().enumerate() {
            let name = format!("stage.data[{index}]");
            check_segment(&name, &data.body, width)?;
            if data.collapse_speed <= 0.0 || data.build_speed <= 0.0 {
                return Err(invalid(format!("{name} speeds must be positive")));
            }
            check_entries(&name, &data.finish_entry, &stage.goal_for(index).body)?;
            check_entries(&name, &data.enemy_entry, &data.body)?;
        }

        let first_rows = stage.start.len() + stage.data[0].body.len() + stage.goal_for(0).len();
        if stage.start_length > first_rows {
            return Err(invalid(format!(
                "stage.start_length {} exceeds the {first_rows} rows of the first stage",
                stage.start_length
            )));
        }

        if self.player.move_speed.is_empty() {
            return Err(invalid("player.move_speed is empty"));
        }
        if self.player.move_rotate_time <= 0.0 {
            return Err(invalid("player.move_rotate_time must be positive"));
        }
        for entry in &self.game.entry {
            let inside = entry.x >= 0
                && (entry.x as usize) < width
                && entry.z >= 0
                && (entry.z as usize) < stage.start_length;
            if !inside {
                return Err(invalid(format!(
                    "game.entry ({}, {}) is outside the starting window",
                    entry.x, entry.z
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cube_engine::config::Format;

    #[test]
    fn test_default_params_are_valid() {
        GameParams::default().validate().expect("defaults validate");
    }

    #[test]
    fn test_round_trip_through_ron() {
        let params = GameParams::default();
        let text = params.render(Format::Ron).expect("render");
        let parsed = GameParams::parse(&text, Format::Ron).expect("parse");
        assert_eq!(parsed, params);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let text = "[cube]\nsize = 2.0\n\n[game]\nrestart_delay = 1.5\n";
        let params = GameParams::parse(text, Format::Toml).expect("parse");
        assert_eq!(params.cube.size, 2.0);
        assert_eq!(params.game.restart_delay, 1.5);
        assert_eq!(params.stage, StageParams::default());
    }

    #[test]
    fn test_rejects_wide_rows() {
        let mut params = GameParams::default();
        params.stage.data[0].body[2].push(0);
        let error = params.validate().unwrap_err();
        assert!(error.to_string().contains("wider than the stage"));
    }

    #[test]
    fn test_rejects_finish_entry_outside_goal() {
        let mut params = GameParams::default();
        params.stage.data[0].finish_entry.push([0, 40]);
        assert!(matches!(params.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_empty_stage_list() {
        let mut params = GameParams::default();
        params.stage.data.clear();
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_rejects_non_positive_speed() {
        let mut params = GameParams::default();
        params.stage.data[1].build_speed = 0.0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_final_stage_uses_final_goal() {
        let stage = StageParams::default();
        assert_eq!(stage.goal_for(0), &stage.goal);
        assert_eq!(stage.goal_for(stage.data.len() - 1), &stage.final_goal);
    }
}
