//! MicroStep - tiny steps for the task you're putting off
//!
//! CLI entry point: the interactive view by default, plus subcommands for
//! scripting and quick checks.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result, eyre};
use tracing::{debug, info};

use microstep::cli::{Cli, Command};
use microstep::config::Config;
use microstep::domain::Task;
use microstep::illustrator::{Illustrator, decode_data_uri};
use microstep::llm::create_client;
use microstep::planner::PlanGenerator;
use microstep::prompts::PromptLoader;
use microstep::state::{StateError, StateManager, TaskController};
use microstep::storage::{FileKvStore, TaskStorage};
use microstep::tui::{self, format_date, illustration_label};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Logs go to a file so they never draw over the TUI
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("microstep")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("microstep.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    if cli.command.as_ref().is_none_or(Command::needs_model) {
        config.validate()?;
    }
    let storage = open_storage(&config)?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        None => cmd_tui(&config, storage).await,
        Some(Command::New { goal, no_illustration }) => cmd_new(&config, storage, &goal.join(" "), no_illustration).await,
        Some(Command::List) => cmd_list(storage),
        Some(Command::Show { task }) => cmd_show(storage, &task),
        Some(Command::Toggle { task, step }) => cmd_toggle(storage, &task, usize::from(step)),
        Some(Command::Illustrate { task }) => cmd_illustrate(&config, storage, &task).await,
        Some(Command::ExportImage { task, path }) => cmd_export_image(storage, &task, &path),
    }
}

fn open_storage(config: &Config) -> Result<TaskStorage> {
    let data_dir = config.storage.data_path();
    debug!(data_dir = %data_dir.display(), "open_storage: called");
    let kv = FileKvStore::open(&data_dir)
        .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?;
    Ok(TaskStorage::new(Arc::new(kv)))
}

/// Wire the model clients and spawn the state actor
fn spawn_state_manager(config: &Config, storage: TaskStorage) -> Result<StateManager> {
    let client = create_client(&config.llm).context("Failed to create generative client")?;
    let prompts = Arc::new(PromptLoader::new(config.prompts.dir_path().as_deref()));

    let planner = Arc::new(PlanGenerator::new(
        client.clone(),
        config.llm.plan_model.clone(),
        prompts.clone(),
    ));
    let illustrator = Arc::new(Illustrator::new(client, config.llm.image_model.clone(), prompts));

    Ok(StateManager::spawn(TaskController::new(storage), planner, illustrator))
}

/// Turn a resolution failure into a readable error
fn resolve(controller: &TaskController, reference: &str) -> Result<String> {
    controller.resolve_task(reference).map_err(describe_resolve_error)
}

fn describe_resolve_error(e: StateError) -> eyre::Report {
    match e {
        StateError::AmbiguousTask { reference, candidates } => {
            eyre!("'{}' matches several tasks: {}", reference, candidates.join(", "))
        }
        StateError::TaskNotFound(reference) => eyre!("No task matches '{}'", reference),
        other => eyre!(other),
    }
}

async fn cmd_tui(config: &Config, storage: TaskStorage) -> Result<()> {
    debug!("cmd_tui: called");
    let manager = spawn_state_manager(config, storage)?;
    let result = tui::run_with_state(manager.clone()).await;
    let _ = manager.shutdown().await;
    result
}

async fn cmd_new(config: &Config, storage: TaskStorage, goal: &str, no_illustration: bool) -> Result<()> {
    debug!(goal_len = goal.len(), no_illustration, "cmd_new: called");
    let manager = spawn_state_manager(config, storage)?;

    println!("{} {}", "…".dimmed(), "正在拆解...".dimmed());
    let id = match manager.create_task(goal).await {
        Ok(id) => id,
        Err(StateError::Generation(e)) if e.is_transient() => {
            return Err(eyre!("抱歉，拆解任务时遇到了一点小问题，请重试。({})", e));
        }
        Err(StateError::Generation(e)) => return Err(eyre!("抱歉，拆解任务失败了。({})", e)),
        Err(e) => return Err(e.into()),
    };

    if !no_illustration && let Some(handle) = manager.request_illustration(&id).await? {
        println!("{} {}", "…".dimmed(), "正在为你的行动绘制灵感...".dimmed());
        handle.await.context("Illustration task panicked")?;
    }

    let snapshot = manager.snapshot().await?;
    let task = snapshot
        .task(&id)
        .ok_or_else(|| eyre!("Task {} disappeared after creation", id))?;
    print_task(task);

    manager.shutdown().await?;
    Ok(())
}

fn cmd_list(storage: TaskStorage) -> Result<()> {
    debug!("cmd_list: called");
    let controller = TaskController::new(storage);
    let tasks = controller.history();

    if tasks.is_empty() {
        println!("{}", "还没有记录，去迈出第一步吧。".dimmed());
        return Ok(());
    }

    for task in tasks {
        let badge = if task.is_completed() {
            "✓ 已完成".green().to_string()
        } else {
            "继续".yellow().to_string()
        };
        println!(
            "{}  {}  {}  {}/{}  {}",
            task.id().cyan(),
            format_date(task.created_at()).dimmed(),
            task.title().bold(),
            task.completed_count(),
            task.steps().len(),
            badge
        );
    }
    Ok(())
}

fn cmd_show(storage: TaskStorage, reference: &str) -> Result<()> {
    debug!(%reference, "cmd_show: called");
    let controller = TaskController::new(storage);
    let id = resolve(&controller, reference)?;
    let task = controller.task(&id).ok_or_else(|| eyre!("No task matches '{}'", reference))?;
    print_task(task);
    Ok(())
}

fn cmd_toggle(storage: TaskStorage, reference: &str, step_number: usize) -> Result<()> {
    debug!(%reference, step_number, "cmd_toggle: called");
    let mut controller = TaskController::new(storage);
    let id = resolve(&controller, reference)?;

    let step_id = controller
        .task(&id)
        .and_then(|t| t.steps().get(step_number - 1))
        .map(|s| s.id().to_string())
        .ok_or_else(|| eyre!("Task has no step {}", step_number))?;

    let done = controller.toggle_step(&id, &step_id)?;
    let task = controller.task(&id).ok_or_else(|| eyre!("Task {} disappeared", id))?;

    let mark = if done { "✓".green() } else { "○".yellow() };
    println!("{} {}. {}", mark, step_number, task.steps()[step_number - 1].text());
    if task.is_completed() {
        println!("{} {}", "太棒了！".bold().green(), "你迈出了一大步。");
    }
    Ok(())
}

async fn cmd_illustrate(config: &Config, storage: TaskStorage, reference: &str) -> Result<()> {
    debug!(%reference, "cmd_illustrate: called");
    let manager = spawn_state_manager(config, storage)?;
    let id = manager.resolve_task(reference).await.map_err(describe_resolve_error)?;

    match manager.request_illustration(&id).await? {
        Some(handle) => {
            println!("{}", "正在为你的行动绘制灵感...".dimmed());
            handle.await.context("Illustration task panicked")?;
        }
        None => {
            println!("{}", "这个行动已经有插画了。".dimmed());
        }
    }

    let snapshot = manager.snapshot().await?;
    match snapshot.task(&id).and_then(Task::image_url) {
        Some(url) => println!("{} {}", "✓".green(), illustration_label(url)),
        None => println!("{}", "这次没能画出插画，稍后再试试吧。".yellow()),
    }

    manager.shutdown().await?;
    Ok(())
}

fn cmd_export_image(storage: TaskStorage, reference: &str, path: &Path) -> Result<()> {
    debug!(%reference, path = %path.display(), "cmd_export_image: called");
    let controller = TaskController::new(storage);
    let id = resolve(&controller, reference)?;
    let task = controller.task(&id).ok_or_else(|| eyre!("No task matches '{}'", reference))?;

    let url = task
        .image_url()
        .ok_or_else(|| eyre!("Task '{}' has no illustration yet", task.title()))?;
    let bytes = decode_data_uri(url).ok_or_else(|| eyre!("Stored illustration is not a PNG data URI"))?;

    fs::write(path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("{} wrote {} ({} bytes)", "✓".green(), path.display(), bytes.len());
    Ok(())
}

fn print_task(task: &Task) {
    println!();
    println!("{}  {}", task.title().bold(), task.id().cyan());
    println!("{}", task.original_input().dimmed());
    println!(
        "{} {}/{} ({}%)",
        "进度".bold(),
        task.completed_count(),
        task.steps().len(),
        task.progress_percent()
    );
    println!();

    for (i, step) in task.steps().iter().enumerate() {
        let mark = if step.is_completed() {
            "[✓]".green()
        } else {
            "[ ]".normal()
        };
        println!("  {} {}. {}", mark, i + 1, step.text());
        println!("        {}", step.encouragement().dimmed().italic());
    }

    println!();
    println!("{}", task.overall_encouragement().yellow());
    if let Some(url) = task.image_url() {
        println!("{}", illustration_label(url).dimmed());
    }
    if task.is_completed() {
        println!("{} {}", "太棒了！".bold().green(), "你迈出了一大步。");
    }
}

