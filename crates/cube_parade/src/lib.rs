//! # Cube Parade
//!
//! A parade of rolling cubes crossing a stage that streams in ahead of them
//! and collapses behind them.
//!
//! Everything talks over one message bus: the stage answers height queries
//! and streams rows, entities roll, fall and drop into place, and the
//! [`Game`] driver ticks it all and restarts after a death or a full clear.
//!
//! ```no_run
//! use cube_parade::{Game, GameParams, KeyCode};
//!
//! let mut game = Game::new(GameParams::default()).expect("default parameters are valid");
//! game.key_down(KeyCode::Up);
//! for _ in 0..60 {
//!     game.tick(1.0 / 60.0);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod camera;
pub mod entities;
pub mod error;
pub mod factory;
pub mod game;
pub mod light;
pub mod messages;
pub mod params;
pub mod stage;

pub use error::GameError;
pub use game::Game;
pub use messages::{KeyCode, Msg, Touch};
pub use params::GameParams;
