//! GenerativeClient trait definition

use async_trait::async_trait;

use super::{GenerateRequest, GenerateResponse, LlmError};

/// Stateless generative client - each call is independent
///
/// Used for both plan text and illustrations; the model named in the
/// request decides what comes back.
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Send a single generation request and wait for the full response
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError>;
}
