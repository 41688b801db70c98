//! TaskController - owner of the task collection and view state
//!
//! All mutation of tasks goes through here. The controller is synchronous;
//! the [`StateManager`](super::StateManager) actor wraps it for async callers.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{DomainError, IdResolver, PlanResult, Task, TaskId};
use crate::illustrator::illustration_context;
use crate::planner::GenerationError;
use crate::storage::TaskStorage;

use super::messages::StateError;

/// Which screen is showing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Input,
    Active,
    History,
}

/// A message the user must acknowledge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
}

/// Read model handed to views
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Newest first
    pub tasks: Vec<Task>,
    pub active_task_id: Option<TaskId>,
    pub view: View,
    pub plan_pending: bool,
    pub notice: Option<Notice>,
}

impl Snapshot {
    pub fn active_task(&self) -> Option<&Task> {
        let id = self.active_task_id.as_deref()?;
        self.task(id)
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id() == task_id)
    }
}

/// Task store and view state machine
pub struct TaskController {
    storage: TaskStorage,
    tasks: Vec<Task>,
    active_task_id: Option<TaskId>,
    view: View,
    plan_pending: bool,
    illustrations_in_flight: HashSet<TaskId>,
    notice: Option<Notice>,
}

impl TaskController {
    /// Create a controller, loading the stored collection
    pub fn new(storage: TaskStorage) -> Self {
        debug!("TaskController::new: called");
        let tasks = storage.load();
        info!(count = tasks.len(), "TaskController ready");
        Self {
            storage,
            tasks,
            active_task_id: None,
            view: View::Input,
            plan_pending: false,
            illustrations_in_flight: HashSet::new(),
            notice: None,
        }
    }

    fn persist(&self) {
        if !self.storage.save(&self.tasks) {
            warn!(count = self.tasks.len(), "Task collection not persisted");
        }
    }

    fn task_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id() == task_id)
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id() == task_id)
    }

    /// All tasks in display order, newest first
    pub fn history(&self) -> &[Task] {
        &self.tasks
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn active_task_id(&self) -> Option<&str> {
        self.active_task_id.as_deref()
    }

    pub fn plan_pending(&self) -> bool {
        self.plan_pending
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Start a submission; returns the goal to send to the planner
    ///
    /// The goal is kept verbatim. Whitespace only matters for the empty check.
    pub fn begin_submission(&mut self, goal: &str) -> Result<String, StateError> {
        debug!(goal_len = goal.len(), plan_pending = self.plan_pending, "begin_submission: called");
        if goal.trim().is_empty() {
            return Err(StateError::EmptyGoal);
        }
        if self.plan_pending {
            return Err(StateError::SubmissionPending);
        }
        self.plan_pending = true;
        self.notice = None;
        Ok(goal.to_string())
    }

    /// Finish a submission with the planner's result
    ///
    /// On failure the collection and view are left as they were and a notice
    /// is recorded for the user.
    pub fn complete_submission(
        &mut self,
        goal: &str,
        result: Result<PlanResult, GenerationError>,
    ) -> Result<TaskId, StateError> {
        debug!(ok = result.is_ok(), "complete_submission: called");
        self.plan_pending = false;

        let built = result.and_then(|plan| {
            Task::from_plan(goal, plan).map_err(|e| match e {
                DomainError::EmptyPlan => GenerationError::NoSteps,
                other => GenerationError::Malformed(other.to_string()),
            })
        });

        let task = match built {
            Ok(task) => task,
            Err(e) => {
                warn!(error = %e, transient = e.is_transient(), "Plan generation failed");
                self.notice = Some(Notice {
                    message: format!("抱歉，拆解任务时遇到了一点小问题，请重试。({})", e),
                });
                return Err(StateError::Generation(e));
            }
        };

        let id = task.id().to_string();
        info!(task_id = %id, title = %task.title(), steps = task.steps().len(), "Created task");
        self.tasks.insert(0, task);
        self.active_task_id = Some(id.clone());
        self.view = View::Active;
        self.persist();
        Ok(id)
    }

    /// Flip one step; returns the step's new state
    pub fn toggle_step(&mut self, task_id: &str, step_id: &str) -> Result<bool, StateError> {
        debug!(%task_id, %step_id, "toggle_step: called");
        let task = self
            .task_mut(task_id)
            .ok_or_else(|| StateError::TaskNotFound(task_id.to_string()))?;

        let done = task.toggle_step(step_id).map_err(|e| match e {
            DomainError::StepNotFound(id) => StateError::StepNotFound(id),
            DomainError::EmptyPlan => StateError::StepNotFound(step_id.to_string()),
        })?;

        if task.is_completed() {
            info!(%task_id, "Task completed");
        }
        self.persist();
        Ok(done)
    }

    /// Attach an illustration; the first one wins
    ///
    /// A task that no longer exists is not an error: late results are dropped.
    pub fn attach_image(&mut self, task_id: &str, image_url: String) -> bool {
        debug!(%task_id, url_len = image_url.len(), "attach_image: called");
        let Some(task) = self.task_mut(task_id) else {
            debug!(%task_id, "attach_image: task is gone, dropping image");
            return false;
        };

        if !task.attach_image(image_url) {
            return false;
        }
        self.persist();
        true
    }

    /// Show an existing task
    pub fn select_task(&mut self, task_id: &str) -> Result<(), StateError> {
        debug!(%task_id, "select_task: called");
        if self.task(task_id).is_none() {
            return Err(StateError::TaskNotFound(task_id.to_string()));
        }
        self.active_task_id = Some(task_id.to_string());
        self.view = View::Active;
        Ok(())
    }

    /// Switch views along the view graph
    ///
    /// Legal edges are Input to History and back, Input to Active (when a
    /// task is active) and Active to Input. History reaches Active only
    /// through [`select_task`](Self::select_task). Staying on the current
    /// view is a no-op.
    pub fn navigate(&mut self, view: View) -> Result<(), StateError> {
        debug!(from = ?self.view, to = ?view, "navigate: called");
        match (self.view, view) {
            (from, to) if from == to => return Ok(()),
            (View::Input, View::History) | (View::History, View::Input) | (View::Active, View::Input) => {}
            (View::Input, View::Active) => {
                if self.active_task_id.as_deref().and_then(|id| self.task(id)).is_none() {
                    return Err(StateError::NoActiveTask);
                }
            }
            (from, to) => {
                debug!(?from, ?to, "navigate: rejected");
                return Err(StateError::IllegalTransition { from, to });
            }
        }
        self.view = view;
        Ok(())
    }

    pub fn dismiss_notice(&mut self) {
        debug!("dismiss_notice: called");
        self.notice = None;
    }

    /// Mark a task's illustration as in flight
    ///
    /// Returns the prompt context if the caller should generate one: the task
    /// exists, has no image, and nobody else is already generating it.
    pub fn claim_illustration(&mut self, task_id: &str) -> Option<String> {
        debug!(%task_id, "claim_illustration: called");
        let task = self.tasks.iter().find(|t| t.id() == task_id)?;
        if task.image_url().is_some() {
            return None;
        }
        let context = illustration_context(task);
        if !self.illustrations_in_flight.insert(task_id.to_string()) {
            debug!(%task_id, "claim_illustration: already in flight");
            return None;
        }
        Some(context)
    }

    pub fn release_illustration(&mut self, task_id: &str) {
        debug!(%task_id, "release_illustration: called");
        self.illustrations_in_flight.remove(task_id);
    }

    /// Resolve a full id, id prefix or title fragment to a task id
    pub fn resolve_task(&self, reference: &str) -> Result<TaskId, StateError> {
        debug!(%reference, "resolve_task: called");
        let ids: HashMap<String, String> = self
            .tasks
            .iter()
            .map(|t| (t.id().to_string(), t.title().to_string()))
            .collect();

        match IdResolver::new(&ids).resolve(reference) {
            Ok(Some(id)) => Ok(id),
            Ok(None) => Err(StateError::TaskNotFound(reference.to_string())),
            Err(candidates) => Err(StateError::AmbiguousTask {
                reference: reference.to_string(),
                candidates,
            }),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tasks: self.tasks.clone(),
            active_task_id: self.active_task_id.clone(),
            view: self.view,
            plan_pending: self.plan_pending,
            notice: self.notice.clone(),
        }
    }
}
