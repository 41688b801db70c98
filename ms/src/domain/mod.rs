//! Domain types for MicroStep
//!
//! Core domain types: Task, Step, PlanResult.
//! A Task is built only from a successful plan and mutated only through step
//! toggles and the one-time illustration attachment.

mod id;
mod plan;
mod task;

pub use id::{IdResolver, StepId, TaskId, generate_id, now_ms};
pub use plan::{PlanResult, PlannedStep};
pub use task::{DomainError, Step, Task};
