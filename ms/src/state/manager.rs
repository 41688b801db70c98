//! StateManager - actor that owns the TaskController
//!
//! Processes commands via channels so the TUI, the CLI and background
//! illustration tasks can share one task collection.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::illustrator::Illustrator;
use crate::planner::PlanGenerator;

use super::controller::{Snapshot, TaskController, View};
use super::messages::{StateCommand, StateError, StateResponse};

/// Event broadcast when state changes that the TUI should react to
#[derive(Debug, Clone)]
pub enum StateEvent {
    /// A task was created from a generated plan
    TaskCreated { id: String },
    /// A step was toggled
    TaskUpdated { id: String },
    /// An illustration landed on a task
    ImageAttached { id: String },
    /// Plan generation failed; a notice is waiting
    SubmissionFailed { message: String },
}

/// Handle to send commands to the StateManager
#[derive(Clone)]
pub struct StateManager {
    tx: mpsc::Sender<StateCommand>,
    /// Broadcast sender for state change notifications
    event_tx: broadcast::Sender<StateEvent>,
    planner: Arc<PlanGenerator>,
    illustrator: Arc<Illustrator>,
}

impl StateManager {
    /// Spawn a new StateManager actor
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(controller: TaskController, planner: Arc<PlanGenerator>, illustrator: Arc<Illustrator>) -> Self {
        debug!("spawn: called");
        let (tx, rx) = mpsc::channel(64);
        let (event_tx, _) = broadcast::channel(64);

        tokio::spawn(actor_loop(controller, rx));

        info!("StateManager spawned");
        Self {
            tx,
            event_tx,
            planner,
            illustrator,
        }
    }

    /// Subscribe to state change events
    pub fn subscribe_events(&self) -> broadcast::Receiver<StateEvent> {
        self.event_tx.subscribe()
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<StateResponse<T>>) -> StateCommand) -> StateResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    fn emit(&self, event: StateEvent) {
        // No subscribers is fine (CLI use)
        let _ = self.event_tx.send(event);
    }

    // === Submission ===

    /// Turn a goal into a new active task
    ///
    /// The plan call runs outside the actor, so other commands are served
    /// while it is outstanding. A second submission in the meantime is
    /// rejected with `SubmissionPending`. The submission runs on its own
    /// tokio task and finishes even if the returned future is dropped.
    pub async fn create_task(&self, goal: &str) -> StateResponse<String> {
        debug!(goal_len = goal.len(), "create_task: called");
        let manager = self.clone();
        let goal = goal.to_string();
        tokio::spawn(async move { manager.run_submission(goal).await })
            .await
            .map_err(|_| StateError::ChannelError)?
    }

    async fn run_submission(&self, goal: String) -> StateResponse<String> {
        let goal = self
            .request(|reply| StateCommand::BeginSubmission { goal, reply })
            .await?;

        let result = self.planner.generate_plan(&goal).await;

        let outcome = self
            .request(|reply| StateCommand::CompleteSubmission { goal, result, reply })
            .await;

        match &outcome {
            Ok(id) => self.emit(StateEvent::TaskCreated { id: id.clone() }),
            Err(e) => self.emit(StateEvent::SubmissionFailed { message: e.to_string() }),
        }
        outcome
    }

    // === Task mutations ===

    /// Toggle one step, returning its new state
    pub async fn toggle_step(&self, task_id: &str, step_id: &str) -> StateResponse<bool> {
        debug!(%task_id, %step_id, "toggle_step: called");
        let done = self
            .request(|reply| StateCommand::ToggleStep {
                task_id: task_id.to_string(),
                step_id: step_id.to_string(),
                reply,
            })
            .await?;
        self.emit(StateEvent::TaskUpdated {
            id: task_id.to_string(),
        });
        Ok(done)
    }

    /// Attach an illustration (first write wins)
    pub async fn attach_image(&self, task_id: &str, image_url: String) -> StateResponse<bool> {
        debug!(%task_id, "attach_image: called");
        let attached = self
            .request(|reply| StateCommand::AttachImage {
                task_id: task_id.to_string(),
                image_url,
                reply,
            })
            .await?;
        if attached {
            self.emit(StateEvent::ImageAttached {
                id: task_id.to_string(),
            });
        }
        Ok(attached)
    }

    /// Generate an illustration for a task in the background
    ///
    /// Returns `None` when nothing was started: the task already has an
    /// image, is unknown, or a request for it is already in flight.
    pub async fn request_illustration(&self, task_id: &str) -> StateResponse<Option<JoinHandle<()>>> {
        debug!(%task_id, "request_illustration: called");
        let claimed = self
            .request(|reply| StateCommand::ClaimIllustration {
                task_id: task_id.to_string(),
                reply,
            })
            .await?;

        let Some(context) = claimed else {
            return Ok(None);
        };

        let manager = self.clone();
        let task_id = task_id.to_string();
        let handle = tokio::spawn(async move {
            if let Some(url) = manager.illustrator.generate_illustration(&context).await {
                // The task may have been removed meanwhile; attach handles that
                if let Err(e) = manager.attach_image(&task_id, url).await {
                    debug!(%task_id, error = %e, "request_illustration: attach failed");
                }
            }
            let _ = manager.tx.send(StateCommand::ReleaseIllustration { task_id }).await;
        });
        Ok(Some(handle))
    }

    // === View state ===

    pub async fn select_task(&self, task_id: &str) -> StateResponse<()> {
        debug!(%task_id, "select_task: called");
        self.request(|reply| StateCommand::SelectTask {
            task_id: task_id.to_string(),
            reply,
        })
        .await
    }

    pub async fn navigate(&self, view: View) -> StateResponse<()> {
        debug!(?view, "navigate: called");
        self.request(|reply| StateCommand::Navigate { view, reply }).await
    }

    pub async fn dismiss_notice(&self) -> StateResponse<()> {
        debug!("dismiss_notice: called");
        self.request(|reply| StateCommand::DismissNotice { reply }).await
    }

    // === Queries ===

    /// Current read model
    pub async fn snapshot(&self) -> StateResponse<Snapshot> {
        self.request(|reply| StateCommand::GetSnapshot { reply }).await
    }

    /// Resolve a full id, id prefix or title fragment
    pub async fn resolve_task(&self, reference: &str) -> StateResponse<String> {
        debug!(%reference, "resolve_task: called");
        self.request(|reply| StateCommand::ResolveTask {
            reference: reference.to_string(),
            reply,
        })
        .await
    }

    /// Shutdown the StateManager
    pub async fn shutdown(&self) -> Result<(), StateError> {
        debug!("shutdown: called");
        self.tx
            .send(StateCommand::Shutdown)
            .await
            .map_err(|_| StateError::ChannelError)
    }
}

/// The actor loop that processes commands
async fn actor_loop(mut controller: TaskController, mut rx: mpsc::Receiver<StateCommand>) {
    debug!("actor_loop: called");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            StateCommand::BeginSubmission { goal, reply } => {
                debug!("actor_loop: BeginSubmission command");
                let _ = reply.send(controller.begin_submission(&goal));
            }

            StateCommand::CompleteSubmission { goal, result, reply } => {
                debug!("actor_loop: CompleteSubmission command");
                let _ = reply.send(controller.complete_submission(&goal, result));
            }

            StateCommand::ToggleStep {
                task_id,
                step_id,
                reply,
            } => {
                debug!(%task_id, %step_id, "actor_loop: ToggleStep command");
                let _ = reply.send(controller.toggle_step(&task_id, &step_id));
            }

            StateCommand::AttachImage {
                task_id,
                image_url,
                reply,
            } => {
                debug!(%task_id, "actor_loop: AttachImage command");
                let _ = reply.send(Ok(controller.attach_image(&task_id, image_url)));
            }

            StateCommand::SelectTask { task_id, reply } => {
                debug!(%task_id, "actor_loop: SelectTask command");
                let _ = reply.send(controller.select_task(&task_id));
            }

            StateCommand::Navigate { view, reply } => {
                debug!(?view, "actor_loop: Navigate command");
                let _ = reply.send(controller.navigate(view));
            }

            StateCommand::DismissNotice { reply } => {
                controller.dismiss_notice();
                let _ = reply.send(Ok(()));
            }

            StateCommand::ClaimIllustration { task_id, reply } => {
                debug!(%task_id, "actor_loop: ClaimIllustration command");
                let _ = reply.send(Ok(controller.claim_illustration(&task_id)));
            }

            StateCommand::ReleaseIllustration { task_id } => {
                controller.release_illustration(&task_id);
            }

            StateCommand::GetSnapshot { reply } => {
                let _ = reply.send(Ok(controller.snapshot()));
            }

            StateCommand::ResolveTask { reference, reply } => {
                let _ = reply.send(controller.resolve_task(&reference));
            }

            StateCommand::Shutdown => {
                info!("StateManager shutting down");
                break;
            }
        }
    }

    debug!("StateManager actor stopped");
}
