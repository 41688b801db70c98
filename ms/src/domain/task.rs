//! Task and Step domain types
//!
//! Completion is derived: `is_completed` is true iff every step is completed,
//! and `completed_at` is set iff `is_completed` is true. Both are recomputed
//! inside this module on every toggle and never set from outside.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::id::{StepId, TaskId, generate_id, now_ms};
use super::plan::PlanResult;

/// Errors from task construction and mutation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Plan has no steps")]
    EmptyPlan,

    #[error("Step not found: {0}")]
    StepNotFound(String),
}

/// One micro-action within a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    id: StepId,
    text: String,
    encouragement: String,
    #[serde(default)]
    is_completed: bool,
}

impl Step {
    fn new(text: String, encouragement: String) -> Self {
        Self {
            id: generate_id(),
            text,
            encouragement,
            is_completed: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn encouragement(&self) -> &str {
        &self.encouragement
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }
}

/// A user goal decomposed into steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    id: TaskId,
    original_input: String,
    title: String,
    steps: Vec<Step>,
    overall_encouragement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_url: Option<String>,
    created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed_at: Option<i64>,
    #[serde(default)]
    is_completed: bool,
}

impl Task {
    /// Build a new task from a generated plan, stamped with the current time
    pub fn from_plan(original_input: impl Into<String>, plan: PlanResult) -> Result<Self, DomainError> {
        Self::from_plan_at(original_input, plan, now_ms())
    }

    /// Build a new task with an explicit creation timestamp
    pub fn from_plan_at(
        original_input: impl Into<String>,
        plan: PlanResult,
        created_at: i64,
    ) -> Result<Self, DomainError> {
        debug!(title = %plan.title, step_count = plan.steps.len(), "Task::from_plan_at: called");
        if plan.steps.is_empty() {
            return Err(DomainError::EmptyPlan);
        }

        let steps = plan
            .steps
            .into_iter()
            .map(|s| Step::new(s.text, s.encouragement))
            .collect();

        Ok(Self {
            id: generate_id(),
            original_input: original_input.into(),
            title: plan.title,
            steps,
            overall_encouragement: plan.overall_encouragement,
            image_url: None,
            created_at,
            completed_at: None,
            is_completed: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn original_input(&self) -> &str {
        &self.original_input
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    pub fn overall_encouragement(&self) -> &str {
        &self.overall_encouragement
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<i64> {
        self.completed_at
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    /// Number of completed steps
    pub fn completed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.is_completed).count()
    }

    /// Progress as a rounded percentage (0-100)
    pub fn progress_percent(&self) -> u8 {
        if self.steps.is_empty() {
            return 0;
        }
        let pct = (self.completed_count() as f64 / self.steps.len() as f64) * 100.0;
        pct.round() as u8
    }

    /// Flip one step and recompute completion
    ///
    /// Returns the step's new completion state.
    pub fn toggle_step(&mut self, step_id: &str) -> Result<bool, DomainError> {
        self.toggle_step_at(step_id, now_ms())
    }

    /// Flip one step using `now` as the completion timestamp if the task becomes complete
    pub fn toggle_step_at(&mut self, step_id: &str, now: i64) -> Result<bool, DomainError> {
        debug!(task_id = %self.id, %step_id, "Task::toggle_step_at: called");
        let step = self
            .steps
            .iter_mut()
            .find(|s| s.id == step_id)
            .ok_or_else(|| DomainError::StepNotFound(step_id.to_string()))?;

        step.is_completed = !step.is_completed;
        let new_state = step.is_completed;

        self.recompute_completion(now);
        Ok(new_state)
    }

    /// Attach an illustration if none is present yet
    ///
    /// First write wins: returns false and leaves the task untouched when an
    /// image is already attached.
    pub fn attach_image(&mut self, image_url: impl Into<String>) -> bool {
        if self.image_url.is_some() {
            debug!(task_id = %self.id, "Task::attach_image: image already present");
            return false;
        }
        self.image_url = Some(image_url.into());
        true
    }

    /// Repair completion fields that disagree with the steps
    ///
    /// Used on load, since stored data may have been written by another
    /// version. Returns true if anything changed.
    pub fn normalize(&mut self) -> bool {
        let before = (self.is_completed, self.completed_at);
        self.recompute_completion(now_ms());
        before != (self.is_completed, self.completed_at)
    }

    fn recompute_completion(&mut self, now: i64) {
        let all_done = !self.steps.is_empty() && self.steps.iter().all(|s| s.is_completed);
        self.is_completed = all_done;
        if all_done {
            if self.completed_at.is_none() {
                self.completed_at = Some(now);
            }
        } else {
            self.completed_at = None;
        }
    }
}
