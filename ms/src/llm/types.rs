//! Provider-agnostic request/response types for generative calls

use serde_json::Value;
use tracing::debug;

/// A single generation request
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Model identifier, e.g. "gemini-2.5-flash"
    pub model: String,

    /// The full rendered prompt
    pub prompt: String,

    /// Requested response MIME type (e.g. "application/json")
    pub response_mime_type: Option<String>,

    /// Structured-output schema the response must follow
    pub response_schema: Option<Value>,
}

impl GenerateRequest {
    /// Free-form request (used for images)
    pub fn text(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            response_mime_type: None,
            response_schema: None,
        }
    }

    /// Request constrained to JSON following `schema`
    pub fn json(model: impl Into<String>, prompt: impl Into<String>, schema: Value) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(schema),
        }
    }
}

/// One piece of generated content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    InlineData { mime_type: String, data: String },
}

/// One generated alternative
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
    pub parts: Vec<Part>,
    pub finish_reason: Option<String>,
}

/// Response from a generation request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateResponse {
    pub candidates: Vec<Candidate>,

    /// Set when the provider refused the prompt outright
    pub block_reason: Option<String>,
}

impl GenerateResponse {
    /// Response with a single text part
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                parts: vec![Part::Text(text.into())],
                finish_reason: Some("STOP".to_string()),
            }],
            block_reason: None,
        }
    }

    /// Concatenated text of the first candidate, `None` if there is none
    pub fn text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let text: String = candidate
            .parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::InlineData { .. } => None,
            })
            .collect();

        if text.trim().is_empty() {
            debug!("GenerateResponse::text: no text parts");
            None
        } else {
            Some(text)
        }
    }

    /// First inline data payload of the first candidate as `(mime_type, base64_data)`
    pub fn first_inline_data(&self) -> Option<(&str, &str)> {
        self.candidates.first()?.parts.iter().find_map(|p| match p {
            Part::InlineData { mime_type, data } => Some((mime_type.as_str(), data.as_str())),
            Part::Text(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_request_sets_mime_type() {
        let req = GenerateRequest::json("m", "p", serde_json::json!({"type": "OBJECT"}));
        assert_eq!(req.response_mime_type.as_deref(), Some("application/json"));
        assert!(req.response_schema.is_some());

        let req = GenerateRequest::text("m", "p");
        assert!(req.response_mime_type.is_none());
        assert!(req.response_schema.is_none());
    }

    #[test]
    fn test_text_joins_parts_and_skips_images() {
        let resp = GenerateResponse {
            candidates: vec![Candidate {
                parts: vec![
                    Part::Text("{\"a\":".to_string()),
                    Part::InlineData {
                        mime_type: "image/png".to_string(),
                        data: "AAAA".to_string(),
                    },
                    Part::Text("1}".to_string()),
                ],
                finish_reason: None,
            }],
            block_reason: None,
        };
        assert_eq!(resp.text().as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn test_text_none_without_candidates() {
        assert!(GenerateResponse::default().text().is_none());
        assert!(GenerateResponse::from_text("   ").text().is_none());
    }

    #[test]
    fn test_first_inline_data() {
        let resp = GenerateResponse {
            candidates: vec![Candidate {
                parts: vec![
                    Part::Text("here you go".to_string()),
                    Part::InlineData {
                        mime_type: "image/png".to_string(),
                        data: "Zmlyc3Q=".to_string(),
                    },
                    Part::InlineData {
                        mime_type: "image/png".to_string(),
                        data: "c2Vjb25k".to_string(),
                    },
                ],
                finish_reason: None,
            }],
            block_reason: None,
        };
        assert_eq!(resp.first_inline_data(), Some(("image/png", "Zmlyc3Q=")));
        assert!(GenerateResponse::from_text("no image").first_inline_data().is_none());
    }
}
