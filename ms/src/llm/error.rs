//! Errors from the generative endpoint

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API key not found. Set the {0} environment variable.")]
    MissingApiKey(String),

    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Quota exhausted, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Endpoint returned {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Could not decode response body: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Whether the same request could succeed if sent again later
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } | LlmError::Network(_) => true,
            LlmError::ApiError { status, .. } => *status >= 500,
            LlmError::MissingApiKey(_) | LlmError::InvalidResponse(_) | LlmError::Json(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_side_failures_are_transient() {
        assert!(
            LlmError::RateLimited {
                retry_after: Duration::from_secs(30)
            }
            .is_transient()
        );
        assert!(
            LlmError::ApiError {
                status: 503,
                message: "overloaded".to_string()
            }
            .is_transient()
        );
    }

    #[test]
    fn test_request_problems_are_not_transient() {
        assert!(
            !LlmError::ApiError {
                status: 400,
                message: "bad schema".to_string()
            }
            .is_transient()
        );
        assert!(!LlmError::InvalidResponse("no candidates".to_string()).is_transient());
        assert!(!LlmError::MissingApiKey("GEMINI_API_KEY".to_string()).is_transient());
    }

    #[test]
    fn test_missing_api_key_names_variable() {
        let err = LlmError::MissingApiKey("GEMINI_API_KEY".to_string());
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }
}
