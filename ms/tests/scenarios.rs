//! End-to-end task lifecycle scenarios through the StateManager

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use microstep::llm::{Candidate, GenerateRequest, GenerateResponse, GenerativeClient, LlmError, Part};
use microstep::prompts::PromptLoader;
use microstep::state::{Snapshot, StateError, StateManager, TaskController, View};
use microstep::storage::{FileKvStore, KvStore, MemoryKvStore, TaskStorage};
use microstep::{GenerationError, Illustrator, PlanGenerator};

type Reply = Result<GenerateResponse, LlmError>;

/// Answers plan requests (those with a schema) and image requests from separate scripts
struct ScriptedClient {
    plans: Mutex<VecDeque<Reply>>,
    images: Mutex<VecDeque<Reply>>,
    /// If set, the first plan request waits for this before answering
    gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl ScriptedClient {
    fn new(plans: Vec<Reply>, images: Vec<Reply>) -> Self {
        Self {
            plans: Mutex::new(plans.into()),
            images: Mutex::new(images.into()),
            gate: Mutex::new(None),
        }
    }

    fn gated(plans: Vec<Reply>) -> (Self, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        let client = Self::new(plans, vec![]);
        *client.gate.lock().unwrap() = Some(rx);
        (client, tx)
    }
}

#[async_trait]
impl GenerativeClient for ScriptedClient {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let is_plan = request.response_schema.is_some();
        if is_plan {
            let gate = self.gate.lock().unwrap().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
        }
        let queue = if is_plan { &self.plans } else { &self.images };
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::InvalidResponse("script exhausted".to_string())))
    }
}

fn plan_json(title: &str, steps: usize) -> Reply {
    let steps: Vec<serde_json::Value> = (1..=steps)
        .map(|i| serde_json::json!({"text": format!("第{}步", i), "encouragement": "你可以的"}))
        .collect();
    Ok(GenerateResponse::from_text(
        serde_json::json!({
            "title": title,
            "steps": steps,
            "overallEncouragement": "慢慢来，比较快"
        })
        .to_string(),
    ))
}

fn image_reply(data: &str) -> Reply {
    Ok(GenerateResponse {
        candidates: vec![Candidate {
            parts: vec![Part::InlineData {
                mime_type: "image/png".to_string(),
                data: data.to_string(),
            }],
            finish_reason: Some("STOP".to_string()),
        }],
        block_reason: None,
    })
}

fn spawn_with(client: ScriptedClient, kv: Arc<dyn KvStore>) -> StateManager {
    let client = Arc::new(client);
    let prompts = Arc::new(PromptLoader::embedded_only());
    let planner = Arc::new(PlanGenerator::new(client.clone(), "plan-model", prompts.clone()));
    let illustrator = Arc::new(Illustrator::new(client, "image-model", prompts));
    StateManager::spawn(TaskController::new(TaskStorage::new(kv)), planner, illustrator)
}

fn spawn(client: ScriptedClient) -> StateManager {
    spawn_with(client, Arc::new(MemoryKvStore::new()))
}

async fn toggle_all(manager: &StateManager, task_id: &str) {
    let snapshot = manager.snapshot().await.unwrap();
    let step_ids: Vec<String> = snapshot
        .task(task_id)
        .unwrap()
        .steps()
        .iter()
        .map(|s| s.id().to_string())
        .collect();
    for step_id in step_ids {
        manager.toggle_step(task_id, &step_id).await.unwrap();
    }
}

async fn wait_for(manager: &StateManager, check: impl Fn(&Snapshot) -> bool) -> bool {
    for _ in 0..200 {
        if check(&manager.snapshot().await.unwrap()) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

#[tokio::test]
async fn scenario_a_goal_becomes_three_step_task_at_front() {
    let manager = spawn(ScriptedClient::new(
        vec![plan_json("早点休息", 1), plan_json("温柔入睡", 3)],
        vec![],
    ));

    manager.create_task("整理桌面").await.unwrap();
    let id = manager.create_task("我一直在刷视频，想去洗澡睡觉").await.unwrap();

    let snapshot = manager.snapshot().await.unwrap();
    let task = snapshot.task(&id).unwrap();
    assert_eq!(task.steps().len(), 3);
    assert!(!task.is_completed());
    assert!(task.completed_at().is_none());
    assert_eq!(task.original_input(), "我一直在刷视频，想去洗澡睡觉");
    assert_eq!(snapshot.tasks[0].id(), id);
    assert_eq!(snapshot.tasks.len(), 2);
    assert_eq!(snapshot.view, View::Active);
    assert_eq!(snapshot.active_task_id.as_deref(), Some(id.as_str()));
}

#[tokio::test]
async fn scenario_b_generation_error_leaves_collection_and_view() {
    let manager = spawn(ScriptedClient::new(
        vec![
            plan_json("existing", 2),
            Err(LlmError::ApiError {
                status: 503,
                message: "overloaded".to_string(),
            }),
        ],
        vec![],
    ));
    manager.create_task("first").await.unwrap();
    manager.navigate(View::Input).await.unwrap();

    let err = manager.create_task("second").await.unwrap_err();
    assert!(matches!(err, StateError::Generation(GenerationError::Endpoint(_))));

    let snapshot = manager.snapshot().await.unwrap();
    assert_eq!(snapshot.tasks.len(), 1);
    assert_eq!(snapshot.view, View::Input);
    assert!(snapshot.notice.is_some());
    assert!(!snapshot.plan_pending);

    // Notice is dismissible and the user can retry
    manager.dismiss_notice().await.unwrap();
    assert!(manager.snapshot().await.unwrap().notice.is_none());
}

#[tokio::test]
async fn scenario_c_last_step_completes_task() {
    let manager = spawn(ScriptedClient::new(vec![plan_json("four", 4)], vec![]));
    let id = manager.create_task("goal").await.unwrap();

    let snapshot = manager.snapshot().await.unwrap();
    let steps: Vec<String> = snapshot.task(&id).unwrap().steps().iter().map(|s| s.id().to_string()).collect();
    for step in &steps[..3] {
        manager.toggle_step(&id, step).await.unwrap();
    }
    let snapshot = manager.snapshot().await.unwrap();
    assert!(!snapshot.task(&id).unwrap().is_completed());

    manager.toggle_step(&id, &steps[3]).await.unwrap();
    let snapshot = manager.snapshot().await.unwrap();
    let task = snapshot.task(&id).unwrap();
    assert!(task.is_completed());
    assert!(task.completed_at().is_some());
    assert_eq!(task.progress_percent(), 100);
}

#[tokio::test]
async fn scenario_d_untoggle_reopens_task() {
    let manager = spawn(ScriptedClient::new(vec![plan_json("two", 2)], vec![]));
    let id = manager.create_task("goal").await.unwrap();
    toggle_all(&manager, &id).await;

    let snapshot = manager.snapshot().await.unwrap();
    let first_step = snapshot.task(&id).unwrap().steps()[0].id().to_string();
    assert!(snapshot.task(&id).unwrap().is_completed());

    assert!(!manager.toggle_step(&id, &first_step).await.unwrap());
    let snapshot = manager.snapshot().await.unwrap();
    let task = snapshot.task(&id).unwrap();
    assert!(!task.is_completed());
    assert!(task.completed_at().is_none());
}

#[tokio::test]
async fn scenario_e_illustration_failure_is_silent() {
    let manager = spawn(ScriptedClient::new(
        vec![plan_json("two", 2)],
        vec![Err(LlmError::ApiError {
            status: 500,
            message: "no images today".to_string(),
        })],
    ));
    let id = manager.create_task("goal").await.unwrap();

    let handle = manager.request_illustration(&id).await.unwrap().unwrap();
    handle.await.unwrap();

    let snapshot = manager.snapshot().await.unwrap();
    assert!(snapshot.task(&id).unwrap().image_url().is_none());
    assert!(snapshot.notice.is_none());

    // Steps still work
    toggle_all(&manager, &id).await;
    assert!(manager.snapshot().await.unwrap().task(&id).unwrap().is_completed());
}

#[tokio::test]
async fn illustration_attaches_once() {
    let manager = spawn(ScriptedClient::new(
        vec![plan_json("one", 1)],
        vec![image_reply("aGVsbG8="), image_reply("d29ybGQ=")],
    ));
    let id = manager.create_task("goal").await.unwrap();

    let first = manager.request_illustration(&id).await.unwrap();
    let second = manager.request_illustration(&id).await.unwrap();
    assert!(first.is_some());
    assert!(second.is_none());
    first.unwrap().await.unwrap();

    let snapshot = manager.snapshot().await.unwrap();
    assert_eq!(
        snapshot.task(&id).unwrap().image_url(),
        Some("data:image/png;base64,aGVsbG8=")
    );
    assert!(manager.request_illustration(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn second_submission_is_rejected_while_pending() {
    let (client, release) = ScriptedClient::gated(vec![plan_json("slow", 2), plan_json("fast", 1)]);
    let manager = spawn(client);

    let background = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.create_task("slow goal").await })
    };

    // Wait for the first submission to register
    assert!(wait_for(&manager, |s| s.plan_pending).await);

    let err = manager.create_task("another goal").await.unwrap_err();
    assert!(matches!(err, StateError::SubmissionPending));

    // The interface stays responsive meanwhile
    manager.navigate(View::History).await.unwrap();

    release.send(()).unwrap();
    let id = background.await.unwrap().unwrap();

    let snapshot = manager.snapshot().await.unwrap();
    assert_eq!(snapshot.tasks.len(), 1);
    assert_eq!(snapshot.tasks[0].id(), id);
    assert_eq!(snapshot.view, View::Active);
}

#[tokio::test]
async fn abandoned_submission_still_completes() {
    let (client, release) = ScriptedClient::gated(vec![plan_json("slow", 2), plan_json("next", 1)]);
    let manager = spawn(client);

    let caller = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.create_task("slow goal").await })
    };
    assert!(wait_for(&manager, |s| s.plan_pending).await);

    // The caller goes away while the plan is outstanding
    caller.abort();
    let _ = caller.await;
    release.send(()).unwrap();

    assert!(wait_for(&manager, |s| !s.plan_pending && s.tasks.len() == 1).await);
    assert_eq!(manager.snapshot().await.unwrap().tasks[0].original_input(), "slow goal");

    manager.create_task("next goal").await.unwrap();
    assert_eq!(manager.snapshot().await.unwrap().tasks.len(), 2);
}

#[tokio::test]
async fn tasks_survive_restart_on_disk() {
    let temp = tempfile::tempdir().unwrap();
    let kv: Arc<dyn KvStore> = Arc::new(FileKvStore::open(temp.path()).unwrap());

    let manager = spawn_with(
        ScriptedClient::new(vec![plan_json("a", 2), plan_json("b", 3)], vec![image_reply("aGk=")]),
        kv.clone(),
    );
    let first = manager.create_task("first").await.unwrap();
    let second = manager.create_task("second").await.unwrap();
    manager.request_illustration(&second).await.unwrap().unwrap().await.unwrap();
    toggle_all(&manager, &first).await;
    let before = manager.snapshot().await.unwrap().tasks;
    manager.shutdown().await.unwrap();

    let reopened: Arc<dyn KvStore> = Arc::new(FileKvStore::open(temp.path()).unwrap());
    let restarted = TaskController::new(TaskStorage::new(reopened));
    assert_eq!(restarted.history(), before.as_slice());
    assert_eq!(restarted.history()[0].id(), second);
    assert!(restarted.history()[1].is_completed());
    assert_eq!(restarted.view(), View::Input);
}
