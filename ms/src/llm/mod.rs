//! Generative API client module for MicroStep
//!
//! Provides the provider-agnostic client trait, request/response types and
//! the Gemini implementation.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod gemini;
mod types;

pub use client::GenerativeClient;
pub use error::LlmError;
pub use gemini::GeminiClient;
pub use types::{Candidate, GenerateRequest, GenerateResponse, Part};

use crate::config::LlmConfig;

/// Create a generative client based on the provider specified in config
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn GenerativeClient>, LlmError> {
    debug!(provider = %config.provider, "create_client: called");
    match config.provider.as_str() {
        "gemini" => {
            debug!("create_client: creating Gemini client");
            Ok(Arc::new(GeminiClient::from_config(config)?))
        }
        other => {
            debug!(provider = %other, "create_client: unknown provider");
            Err(LlmError::InvalidResponse(format!(
                "Unknown LLM provider: '{}'. Supported: gemini",
                other
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client_unknown_provider() {
        let config = LlmConfig {
            provider: "carrier-pigeon".to_string(),
            ..Default::default()
        };
        let err = create_client(&config).err().unwrap();
        assert!(err.to_string().contains("carrier-pigeon"));
    }
}
