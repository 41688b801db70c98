//! TUI application - keyboard handling
//!
//! The App owns the AppState and turns key presses into local state changes
//! and queued intents. It never talks to the StateManager and never renders.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;

use super::state::{AppState, Intent};
use crate::state::View;

/// TUI application
#[derive(Debug, Default)]
pub struct App {
    state: AppState,
}

impl App {
    pub fn new() -> Self {
        debug!("App::new: called");
        Self { state: AppState::new() }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    /// Handle a key event
    ///
    /// Returns true if the application should exit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        debug!(?key, view = ?self.state.view(), "App::handle_key: called");
        self.state.clear_error();

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.state.should_quit = true;
            return true;
        }

        // A notice blocks everything else until acknowledged
        if self.state.snapshot.notice.is_some() {
            self.state.snapshot.notice = None;
            self.state.push_intent(Intent::DismissNotice);
            return false;
        }

        match self.state.view() {
            View::Input => self.handle_input_key(key),
            View::Active => self.handle_active_key(key),
            View::History => self.handle_history_key(key),
        }

        self.state.should_quit
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Tab => self.state.push_intent(Intent::Navigate(View::History)),
            KeyCode::Esc if self.state.input.is_empty() => self.state.should_quit = true,
            KeyCode::Esc => self.state.input.clear(),
            _ if self.state.snapshot.plan_pending => {
                debug!("App::handle_input_key: plan pending, input disabled");
            }
            KeyCode::Enter => {
                if self.state.input.trim().is_empty() {
                    self.state.set_error("先写下你想做的事吧");
                    return;
                }
                // Show the spinner right away; the next snapshot confirms it
                self.state.snapshot.plan_pending = true;
                let goal = self.state.input.clone();
                self.state.push_intent(Intent::Submit(goal));
            }
            KeyCode::Backspace => {
                self.state.input.pop();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => self.state.input.push(c),
            _ => {}
        }
    }

    fn handle_active_key(&mut self, key: KeyEvent) {
        let Some(task) = self.state.active_task() else {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('b')) {
                self.state.push_intent(Intent::Navigate(View::Input));
            }
            return;
        };
        let step_count = task.steps().len();
        let task_id = task.id().to_string();
        let step_id = task.steps().get(self.state.step_selected).map(|s| s.id().to_string());

        match key.code {
            KeyCode::Char('q') => self.state.should_quit = true,
            KeyCode::Esc | KeyCode::Char('b') => self.state.push_intent(Intent::Navigate(View::Input)),
            KeyCode::Up | KeyCode::Char('k') => {
                self.state.step_selected = self.state.step_selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.state.step_selected + 1 < step_count {
                    self.state.step_selected += 1;
                }
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                if let Some(step_id) = step_id {
                    self.state.push_intent(Intent::ToggleStep { task_id, step_id });
                }
            }
            _ => {}
        }
    }

    fn handle_history_key(&mut self, key: KeyEvent) {
        let count = self.state.snapshot.tasks.len();
        match key.code {
            KeyCode::Char('q') => self.state.should_quit = true,
            KeyCode::Esc | KeyCode::Tab | KeyCode::Char('b') => self.state.push_intent(Intent::Navigate(View::Input)),
            KeyCode::Up | KeyCode::Char('k') => {
                self.state.history_selected = self.state.history_selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.state.history_selected + 1 < count {
                    self.state.history_selected += 1;
                }
            }
            KeyCode::Char('g') => self.state.history_selected = 0,
            KeyCode::Char('G') => self.state.history_selected = count.saturating_sub(1),
            KeyCode::Enter => {
                if let Some(task) = self.state.selected_history_task() {
                    let id = task.id().to_string();
                    self.state.push_intent(Intent::SelectTask(id));
                }
            }
            _ => {}
        }
    }
}
