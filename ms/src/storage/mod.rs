//! Local persistence for the task collection
//!
//! The whole collection lives as one JSON blob under a fixed key in a
//! key-value store. Load and save are best-effort: failures are logged and
//! never reach the caller as errors.

mod error;
mod kv;
mod tasks;

pub use error::StorageError;
pub use kv::{FileKvStore, KvStore, MemoryKvStore};
pub use tasks::{TASKS_KEY, TaskStorage};
