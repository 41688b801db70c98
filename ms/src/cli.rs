//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// MicroStep - break what you're putting off into tiny steps
#[derive(Parser)]
#[command(
    name = "ms",
    about = "Break the task you are putting off into tiny, encouraging steps",
    version = env!("CARGO_PKG_VERSION"),
    after_help = "Run without a command to open the interactive view."
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Break a goal into steps and save it as a new task
    New {
        /// What you are putting off, in your own words
        #[arg(required = true, num_args = 1..)]
        goal: Vec<String>,

        /// Don't wait for an illustration
        #[arg(long)]
        no_illustration: bool,
    },

    /// List tasks, newest first
    List,

    /// Show a task and its steps
    Show {
        /// Task id, id prefix or part of the title
        task: String,
    },

    /// Check or uncheck a step
    Toggle {
        /// Task id, id prefix or part of the title
        task: String,

        /// Step number as shown by `show` (starting at 1)
        #[arg(value_parser = clap::value_parser!(u16).range(1..))]
        step: u16,
    },

    /// Generate an illustration for a task that has none
    Illustrate {
        /// Task id, id prefix or part of the title
        task: String,
    },

    /// Write a task's illustration to a PNG file
    ExportImage {
        /// Task id, id prefix or part of the title
        task: String,

        /// Output file
        path: PathBuf,
    },
}

impl Command {
    /// Whether the command calls the generative model
    pub fn needs_model(&self) -> bool {
        matches!(self, Command::New { .. } | Command::Illustrate { .. })
    }
}
