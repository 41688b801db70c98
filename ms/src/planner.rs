//! Plan generation client
//!
//! Sends the user's goal to the language model with a structured-output
//! schema and parses the answer into a [`PlanResult`]. Any failure is a hard
//! error: without a plan there is nothing to show.

use std::sync::Arc;

use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::PlanResult;
use crate::llm::{GenerateRequest, GenerativeClient, LlmError};
use crate::prompts::PromptLoader;

/// Errors from plan generation
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Plan endpoint failed: {0}")]
    Endpoint(#[from] LlmError),

    #[error("Plan endpoint returned no content")]
    EmptyResponse,

    #[error("Plan response did not match the expected shape: {0}")]
    Malformed(String),

    #[error("Plan contained no steps")]
    NoSteps,

    #[error("Failed to build plan prompt: {0}")]
    Prompt(String),
}

impl GenerationError {
    /// Whether resubmitting the same goal may work
    ///
    /// Malformed answers count as transient: the model samples a new one.
    pub fn is_transient(&self) -> bool {
        match self {
            GenerationError::Endpoint(e) => e.is_transient(),
            GenerationError::EmptyResponse | GenerationError::Malformed(_) | GenerationError::NoSteps => true,
            GenerationError::Prompt(_) => false,
        }
    }
}

/// Structured-output schema for plans
pub fn plan_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "steps": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "text": { "type": "STRING" },
                        "encouragement": { "type": "STRING" }
                    },
                    "required": ["text", "encouragement"]
                }
            },
            "overallEncouragement": { "type": "STRING" }
        },
        "required": ["title", "steps", "overallEncouragement"]
    })
}

/// Parse and validate the model's JSON answer
pub fn parse_plan(text: &str) -> Result<PlanResult, GenerationError> {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }

    let plan: PlanResult = serde_json::from_str(body).map_err(|e| GenerationError::Malformed(e.to_string()))?;

    if plan.title.trim().is_empty() {
        return Err(GenerationError::Malformed("title is empty".to_string()));
    }
    if plan.steps.is_empty() {
        return Err(GenerationError::NoSteps);
    }
    if let Some(pos) = plan.steps.iter().position(|s| s.text.trim().is_empty()) {
        return Err(GenerationError::Malformed(format!("step {} has no text", pos + 1)));
    }

    Ok(plan)
}

/// Models occasionally wrap JSON in a markdown fence even in JSON mode
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Turns a free-text goal into a plan
pub struct PlanGenerator {
    client: Arc<dyn GenerativeClient>,
    model: String,
    prompts: Arc<PromptLoader>,
}

impl PlanGenerator {
    pub fn new(client: Arc<dyn GenerativeClient>, model: impl Into<String>, prompts: Arc<PromptLoader>) -> Self {
        Self {
            client,
            model: model.into(),
            prompts,
        }
    }

    /// Generate a plan for `goal`
    ///
    /// Makes exactly one call; no retry.
    pub async fn generate_plan(&self, goal: &str) -> Result<PlanResult, GenerationError> {
        debug!(model = %self.model, goal_len = goal.len(), "generate_plan: called");
        let prompt = self
            .prompts
            .plan_prompt(goal)
            .map_err(|e| GenerationError::Prompt(e.to_string()))?;

        let request = GenerateRequest::json(&self.model, prompt, plan_schema());
        let response = self.client.generate(request).await.map_err(|e| {
            warn!(error = %e, "Plan generation request failed");
            GenerationError::from(e)
        })?;

        if let Some(reason) = &response.block_reason {
            warn!(%reason, "Plan prompt was blocked");
            return Err(GenerationError::EmptyResponse);
        }

        let text = response.text().ok_or(GenerationError::EmptyResponse)?;
        let plan = parse_plan(&text).inspect_err(|e| warn!(error = %e, "Plan response rejected"))?;

        info!(title = %plan.title, steps = plan.steps.len(), "Generated plan");
        Ok(plan)
    }
}
