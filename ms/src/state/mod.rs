//! State management with actor pattern
//!
//! TaskController owns the task collection and view state; StateManager
//! wraps it in an actor so async callers share it through channels.

mod controller;
mod manager;
mod messages;

pub use controller::{Notice, Snapshot, TaskController, View};
pub use manager::{StateEvent, StateManager};
pub use messages::{StateCommand, StateError, StateResponse};
