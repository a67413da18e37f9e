//! Game error types

use cube_engine::config::ConfigError;

/// Errors raised while building or running a game
#[derive(thiserror::Error, Debug)]
pub enum GameError {
    /// Parameters could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Authored stage data could not be turned into a stage
    #[error("Stage error: {0}")]
    Stage(String),
}
