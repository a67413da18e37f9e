//! Entity lifecycle and task scheduling
//!
//! Entities are independent objects behind a single liveness capability.
//! They are owned by the [`EntityManager`] arena and react to bus topics; the
//! manager only reaps those that report inactive. Deferred work is expressed
//! through the [`scheduler`] queues.

pub mod entity;
pub mod manager;
pub mod scheduler;

pub use entity::{share, Activate, Entity, EntityId, SerialAllocator};
pub use manager::{EntityManager, EntityRef};
pub use scheduler::{run_tasks, run_timer_tasks, Tasks, TimerTasks};
