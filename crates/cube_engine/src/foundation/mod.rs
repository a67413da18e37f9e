//! Foundation utilities shared by the engine and its games
//!
//! Grid and world math over `nalgebra`, lap timing with a floating
//! tolerance, and `env_logger` setup for binaries.

pub mod logging;
pub mod math;
pub mod time;
