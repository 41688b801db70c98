//! TUI application state
//!
//! Pure data for the TUI. The task data itself is the latest controller
//! snapshot; everything else here is local UI state (input buffer, cursors,
//! spinner) plus the queue of intents waiting to be sent to the StateManager.

use std::collections::VecDeque;

use tracing::debug;

use crate::domain::Task;
use crate::state::{Snapshot, View};

/// Spinner frames shown while a plan is being generated
pub const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Something the user asked for, to be carried out by the runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Submit(String),
    ToggleStep { task_id: String, step_id: String },
    SelectTask(String),
    Navigate(View),
    DismissNotice,
}

/// Complete TUI state
#[derive(Debug, Default)]
pub struct AppState {
    /// Latest read model from the controller
    pub snapshot: Snapshot,

    /// Goal being typed in the Input view
    pub input: String,

    /// Cursor in the Active view's checklist
    pub step_selected: usize,

    /// Cursor in the History list
    pub history_selected: usize,

    /// Current spinner frame
    pub spinner_frame: usize,

    /// Transient error shown in the footer until the next key
    pub error_message: Option<String>,

    /// Set when the app should exit
    pub should_quit: bool,

    intents: VecDeque<Intent>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot, keeping cursors in range
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        debug!(
            tasks = snapshot.tasks.len(),
            view = ?snapshot.view,
            plan_pending = snapshot.plan_pending,
            "AppState::apply_snapshot: called"
        );
        let active_changed = snapshot.active_task_id != self.snapshot.active_task_id;
        self.snapshot = snapshot;

        if active_changed {
            self.step_selected = 0;
        }
        let steps = self.active_task().map(|t| t.steps().len()).unwrap_or(0);
        self.step_selected = self.step_selected.min(steps.saturating_sub(1));
        self.history_selected = self
            .history_selected
            .min(self.snapshot.tasks.len().saturating_sub(1));
    }

    pub fn view(&self) -> View {
        self.snapshot.view
    }

    pub fn active_task(&self) -> Option<&Task> {
        self.snapshot.active_task()
    }

    pub fn selected_history_task(&self) -> Option<&Task> {
        self.snapshot.tasks.get(self.history_selected)
    }

    /// Queue an intent for the runner
    pub fn push_intent(&mut self, intent: Intent) {
        debug!(?intent, "AppState::push_intent: called");
        self.intents.push_back(intent);
    }

    /// Take all queued intents in order
    pub fn drain_intents(&mut self) -> Vec<Intent> {
        self.intents.drain(..).collect()
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        debug!(%msg, "AppState::set_error: called");
        self.error_message = Some(msg);
    }

    pub fn clear_error(&mut self) {
        self.error_message = None;
    }

    /// Advance the spinner while a plan is pending
    pub fn tick(&mut self) {
        if self.snapshot.plan_pending {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
        }
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER_FRAMES[self.spinner_frame % SPINNER_FRAMES.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PlanResult, PlannedStep};

    fn task(steps: usize) -> Task {
        let plan = PlanResult::new(
            "t",
            (0..steps).map(|i| PlannedStep::new(format!("s{}", i), "e")).collect(),
            "o",
        );
        Task::from_plan("goal", plan).unwrap()
    }

    #[test]
    fn test_apply_snapshot_clamps_cursors() {
        let mut state = AppState::new();
        let t = task(3);
        state.apply_snapshot(Snapshot {
            active_task_id: Some(t.id().to_string()),
            tasks: vec![t.clone(), task(1)],
            view: View::Active,
            ..Default::default()
        });
        state.step_selected = 2;
        state.history_selected = 1;

        state.apply_snapshot(Snapshot {
            active_task_id: Some(t.id().to_string()),
            tasks: vec![t],
            view: View::Active,
            ..Default::default()
        });
        assert_eq!(state.step_selected, 2);
        assert_eq!(state.history_selected, 0);
    }

    #[test]
    fn test_new_active_task_resets_step_cursor() {
        let mut state = AppState::new();
        let first = task(3);
        let second = task(3);
        state.apply_snapshot(Snapshot {
            active_task_id: Some(first.id().to_string()),
            tasks: vec![first],
            ..Default::default()
        });
        state.step_selected = 2;

        state.apply_snapshot(Snapshot {
            active_task_id: Some(second.id().to_string()),
            tasks: vec![second],
            ..Default::default()
        });
        assert_eq!(state.step_selected, 0);
    }

    #[test]
    fn test_intents_drain_in_order() {
        let mut state = AppState::new();
        state.push_intent(Intent::Navigate(View::History));
        state.push_intent(Intent::DismissNotice);
        assert_eq!(
            state.drain_intents(),
            vec![Intent::Navigate(View::History), Intent::DismissNotice]
        );
        assert!(state.drain_intents().is_empty());
    }

    #[test]
    fn test_spinner_only_moves_while_pending() {
        let mut state = AppState::new();
        state.tick();
        assert_eq!(state.spinner_frame, 0);

        state.snapshot.plan_pending = true;
        state.tick();
        state.tick();
        assert_eq!(state.spinner_frame, 2);
        assert_eq!(state.spinner(), SPINNER_FRAMES[2]);
    }
}
