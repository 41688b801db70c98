//! State manager messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::{PlanResult, TaskId};
use crate::planner::GenerationError;

use super::controller::{Snapshot, View};

/// Errors from state operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Goal is empty")]
    EmptyGoal,

    #[error("A plan is already being generated")]
    SubmissionPending,

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Step not found: {0}")]
    StepNotFound(String),

    #[error("No active task")]
    NoActiveTask,

    #[error("Cannot switch from {from:?} to {to:?}")]
    IllegalTransition { from: View, to: View },

    #[error("'{reference}' matches more than one task")]
    AmbiguousTask { reference: String, candidates: Vec<String> },

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Channel error")]
    ChannelError,
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StateError>;

/// Commands sent to the StateManager actor
#[derive(Debug)]
pub enum StateCommand {
    // Submission (plan generation runs between the two)
    BeginSubmission {
        goal: String,
        reply: oneshot::Sender<StateResponse<String>>,
    },
    CompleteSubmission {
        goal: String,
        result: Result<PlanResult, GenerationError>,
        reply: oneshot::Sender<StateResponse<TaskId>>,
    },

    // Task mutations
    ToggleStep {
        task_id: String,
        step_id: String,
        reply: oneshot::Sender<StateResponse<bool>>,
    },
    AttachImage {
        task_id: String,
        image_url: String,
        reply: oneshot::Sender<StateResponse<bool>>,
    },

    // View state
    SelectTask {
        task_id: String,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    Navigate {
        view: View,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    DismissNotice {
        reply: oneshot::Sender<StateResponse<()>>,
    },

    // Illustration in-flight guard
    ClaimIllustration {
        task_id: String,
        reply: oneshot::Sender<StateResponse<Option<String>>>,
    },
    ReleaseIllustration {
        task_id: String,
    },

    // Queries
    GetSnapshot {
        reply: oneshot::Sender<StateResponse<Snapshot>>,
    },
    ResolveTask {
        reference: String,
        reply: oneshot::Sender<StateResponse<TaskId>>,
    },

    // Shutdown
    Shutdown,
}
