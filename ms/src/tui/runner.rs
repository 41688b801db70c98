//! TUI Runner - main loop that owns the terminal and talks to the StateManager
//!
//! The TuiRunner is responsible for:
//! - Dispatching terminal events to App
//! - Forwarding queued intents to the StateManager
//! - Refreshing the snapshot when state events arrive
//! - Kicking off one illustration request per task shown

use std::collections::HashSet;
use std::time::Duration;

use eyre::Result;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::state::{StateError, StateEvent, StateManager, View};

use super::Tui;
use super::app::App;
use super::events::{Event, EventHandler};
use super::state::Intent;
use super::views;

/// Spinner animation rate
const TICK_RATE: Duration = Duration::from_millis(120);

/// TUI Runner that manages the terminal and event loop
pub struct TuiRunner {
    app: App,
    terminal: Tui,
    state_manager: StateManager,
    event_handler: EventHandler,
    state_event_rx: broadcast::Receiver<StateEvent>,
    /// Tasks whose illustration was already requested this session
    illustrations_requested: HashSet<String>,
}

impl TuiRunner {
    pub fn new(terminal: Tui, state_manager: StateManager) -> Self {
        debug!("TuiRunner::new: called");
        let state_event_rx = state_manager.subscribe_events();
        Self {
            app: App::new(),
            terminal,
            state_manager,
            event_handler: EventHandler::new(TICK_RATE),
            state_event_rx,
            illustrations_requested: HashSet::new(),
        }
    }

    /// Run the TUI main loop
    pub async fn run(&mut self) -> Result<()> {
        debug!("TuiRunner::run: called");
        self.refresh().await?;

        loop {
            self.request_illustration_if_needed().await;

            let state = self.app.state();
            self.terminal.draw(|frame| views::render(state, frame))?;

            tokio::select! {
                event = self.event_handler.next() => {
                    match event? {
                        Event::Tick => self.app.state_mut().tick(),
                        Event::Key(key) => {
                            if self.app.handle_key(key) {
                                break;
                            }
                        }
                        Event::Resize(width, height) => {
                            debug!(width, height, "TuiRunner::run: resize");
                        }
                    }
                }
                result = self.state_event_rx.recv() => {
                    self.handle_state_event(result).await?;
                }
            }

            self.process_intents().await?;

            if self.app.state().should_quit {
                break;
            }
        }

        info!("TUI exiting");
        Ok(())
    }

    /// Pull a fresh snapshot from the StateManager
    async fn refresh(&mut self) -> Result<()> {
        let snapshot = self.state_manager.snapshot().await?;
        self.app.state_mut().apply_snapshot(snapshot);
        Ok(())
    }

    async fn handle_state_event(&mut self, result: Result<StateEvent, RecvError>) -> Result<()> {
        match result {
            Ok(StateEvent::TaskCreated { id }) => {
                debug!(%id, "TuiRunner::handle_state_event: task created");
                self.app.state_mut().input.clear();
            }
            Ok(event) => debug!(?event, "TuiRunner::handle_state_event: called"),
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "TuiRunner::handle_state_event: lagged");
            }
            Err(RecvError::Closed) => return Err(eyre::eyre!("State event channel closed")),
        }
        self.refresh().await
    }

    /// Send queued intents to the StateManager
    async fn process_intents(&mut self) -> Result<()> {
        let intents = self.app.state_mut().drain_intents();
        // Submissions refresh on their StateEvent
        let needs_refresh = intents.iter().any(|i| !matches!(i, Intent::Submit(_)));

        for intent in intents {
            debug!(?intent, "TuiRunner::process_intents: dispatching");
            let result = match intent {
                Intent::Submit(goal) => {
                    self.start_submission(goal);
                    Ok(())
                }
                Intent::ToggleStep { task_id, step_id } => {
                    self.state_manager.toggle_step(&task_id, &step_id).await.map(|_| ())
                }
                Intent::SelectTask(task_id) => self.state_manager.select_task(&task_id).await,
                Intent::Navigate(view) => self.state_manager.navigate(view).await,
                Intent::DismissNotice => self.state_manager.dismiss_notice().await,
            };

            match result {
                Ok(()) => {}
                Err(StateError::ChannelError) => return Err(eyre::eyre!("StateManager is gone")),
                Err(e) => {
                    warn!(error = %e, "TUI action failed");
                    self.app.state_mut().set_error(e.to_string());
                }
            }
        }

        if needs_refresh {
            self.refresh().await?;
        }
        Ok(())
    }

    /// Run plan generation in the background so the UI keeps drawing
    fn start_submission(&self, goal: String) {
        info!(goal_len = goal.len(), "Submitting goal");
        let manager = self.state_manager.clone();
        tokio::spawn(async move {
            // The outcome arrives as a StateEvent; failures also leave a notice
            if let Err(e) = manager.create_task(&goal).await {
                debug!(error = %e, "start_submission: create_task failed");
            }
        });
    }

    /// Ask for an illustration the first time a task without one is shown
    async fn request_illustration_if_needed(&mut self) {
        if self.app.state().view() != View::Active {
            return;
        }
        let Some(task) = self.app.state().active_task() else {
            return;
        };
        if task.image_url().is_some() || self.illustrations_requested.contains(task.id()) {
            return;
        }

        let task_id = task.id().to_string();
        self.illustrations_requested.insert(task_id.clone());
        match self.state_manager.request_illustration(&task_id).await {
            Ok(Some(_)) => debug!(%task_id, "request_illustration_if_needed: started"),
            Ok(None) => debug!(%task_id, "request_illustration_if_needed: nothing to do"),
            Err(e) => warn!(%task_id, error = %e, "Failed to request illustration"),
        }
    }
}
