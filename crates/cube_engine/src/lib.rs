//! # Cube Engine
//!
//! A single-threaded, frame-stepped simulation core.
//!
//! ## Features
//!
//! - **Message Bus**: topic-keyed, ordered, re-entrant publish/subscribe
//! - **Entity Lifecycle**: slot arena with end-of-tick reaping
//! - **Task Scheduling**: recurring predicates and delayed one-shots
//! - **Lap Timing**: repeating interval detection with carry-over
//! - **Configuration**: RON/TOML parameter trees via `serde`
//!
//! ## Quick Start
//!
//! ```rust
//! use cube_engine::prelude::*;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
//! enum Topic {
//!     Update,
//! }
//!
//! let bus: MessageBus<Topic, Params<f64>> = MessageBus::new();
//! bus.subscribe_fn(Topic::Update, |_, params| {
//!     let dt = *params.require("delta_time");
//!     params.set("seen", dt);
//! });
//! let params = bus.signal_with(Topic::Update, Params::new().with("delta_time", 0.1));
//! assert_eq!(params.get("seen"), Some(&0.1));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod ecs;
pub mod events;
pub mod foundation;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, Format},
        ecs::{
            run_tasks, run_timer_tasks, share, Activate, Entity, EntityId, EntityManager, Tasks,
            TimerTasks,
        },
        events::{Connection, ConnectionHolder, MessageBus, Params},
        foundation::{
            math::{block_to_world, ease_toward, lerp, Color, Quat, Vec3, Vec3i},
            time::{LapTimer, Stopwatch, TIME_EPSILON},
        },
    };
}
