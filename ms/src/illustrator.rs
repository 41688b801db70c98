//! Illustration generation client
//!
//! Best-effort: every failure collapses to `None`. A missing illustration only
//! costs decoration, so nothing here is ever surfaced to the user.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, info, warn};

use crate::domain::Task;
use crate::llm::{GenerateRequest, GenerativeClient};
use crate::prompts::PromptLoader;

/// Prefix of every data URI this module produces
pub const DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Prompt context for a task: title and original goal
pub fn illustration_context(task: &Task) -> String {
    format!("{}, {}", task.title(), task.original_input())
}

/// Decode a `data:image/png;base64,...` URI back to image bytes
pub fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
    let payload = uri.strip_prefix(DATA_URI_PREFIX)?;
    STANDARD.decode(payload).ok()
}

/// Generates motivational illustrations
pub struct Illustrator {
    client: Arc<dyn GenerativeClient>,
    model: String,
    prompts: Arc<PromptLoader>,
}

impl Illustrator {
    pub fn new(client: Arc<dyn GenerativeClient>, model: impl Into<String>, prompts: Arc<PromptLoader>) -> Self {
        Self {
            client,
            model: model.into(),
            prompts,
        }
    }

    /// Generate an illustration and return it as a data URI
    pub async fn generate_illustration(&self, context: &str) -> Option<String> {
        debug!(model = %self.model, %context, "generate_illustration: called");
        let prompt = match self.prompts.illustration_prompt(context) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(error = %e, "Failed to build illustration prompt");
                return None;
            }
        };

        let response = match self.client.generate(GenerateRequest::text(&self.model, prompt)).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Illustration request failed");
                return None;
            }
        };

        if let Some(reason) = &response.block_reason {
            warn!(%reason, "Illustration prompt was refused");
            return None;
        }

        let Some((mime_type, data)) = response.first_inline_data() else {
            debug!("generate_illustration: response has no inline image");
            return None;
        };

        if STANDARD.decode(data).is_err() {
            warn!(%mime_type, "Illustration payload is not valid base64");
            return None;
        }

        info!(%mime_type, bytes = data.len(), "Generated illustration");
        Some(format!("{}{}", DATA_URI_PREFIX, data))
    }
}
