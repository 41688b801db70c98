//! MicroStep - tiny, encouraging steps for the task you are putting off
//!
//! Describe what you're procrastinating on; a generative model breaks it
//! into small steps, you check them off, and progress persists locally.
//!
//! # Modules
//!
//! - [`domain`] - Tasks, steps and plan results
//! - [`storage`] - Key-value persistence of the task collection
//! - [`llm`] - Generative client trait and Gemini implementation
//! - [`prompts`] - Prompt templates with user overrides
//! - [`planner`] - Goal to plan
//! - [`illustrator`] - Best-effort motivational illustrations
//! - [`state`] - Task controller and its actor handle
//! - [`tui`] - Terminal interface
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod illustrator;
pub mod llm;
pub mod planner;
pub mod prompts;
pub mod state;
pub mod storage;
pub mod tui;

// Re-export commonly used types
pub use config::{Config, LlmConfig};
pub use domain::{PlanResult, PlannedStep, Step, Task};
pub use illustrator::Illustrator;
pub use llm::{GeminiClient, GenerativeClient, LlmError, create_client};
pub use planner::{GenerationError, PlanGenerator};
pub use state::{Snapshot, StateError, StateEvent, StateManager, TaskController, View};
pub use storage::{FileKvStore, KvStore, MemoryKvStore, TaskStorage};
