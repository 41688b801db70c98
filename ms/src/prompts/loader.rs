//! Prompt Loader
//!
//! Loads prompt templates from the override directory or falls back to
//! embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;

/// Context for the plan template
#[derive(Debug, Clone, Serialize)]
pub struct PlanPromptContext {
    /// The user's goal, verbatim
    pub goal: String,
}

/// Context for the illustration template
#[derive(Debug, Clone, Serialize)]
pub struct IllustrationPromptContext {
    /// Task title and original input, comma-joined
    pub context: String,
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory (e.g., `~/.config/microstep/prompts/`)
    override_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader that checks `override_dir` before the embedded templates
    pub fn new(override_dir: Option<&Path>) -> Self {
        Self {
            hbs: Self::engine(),
            override_dir: override_dir.filter(|d| d.exists()).map(Path::to_path_buf),
        }
    }

    /// Create a loader that only uses embedded prompts (for testing)
    pub fn embedded_only() -> Self {
        Self {
            hbs: Self::engine(),
            override_dir: None,
        }
    }

    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        // Prompts are plain text; HTML escaping would mangle quotes in user goals
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. Override: `{override_dir}/{name}.pmt`
    /// 2. Embedded fallback
    fn load_template(&self, name: &str) -> Result<String> {
        if let Some(ref dir) = self.override_dir {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!("Loading prompt from override: {:?}", path);
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt {}: {}", path.display(), e));
            }
        }

        if let Some(content) = embedded::get_embedded(name) {
            debug!("Using embedded prompt: {}", name);
            return Ok(content.to_string());
        }

        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        let template = self.load_template(template_name)?;
        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }

    /// Render the plan decomposition prompt
    pub fn plan_prompt(&self, goal: &str) -> Result<String> {
        self.render(
            "plan",
            &PlanPromptContext {
                goal: goal.to_string(),
            },
        )
    }

    /// Render the illustration prompt
    pub fn illustration_prompt(&self, context: &str) -> Result<String> {
        self.render(
            "illustration",
            &IllustrationPromptContext {
                context: context.to_string(),
            },
        )
    }
}
