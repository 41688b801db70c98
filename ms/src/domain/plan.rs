//! Plan domain type
//!
//! A PlanResult is the structured output of plan generation. It is the only
//! input a Task can be built from.

use serde::{Deserialize, Serialize};

/// One step as proposed by the plan generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedStep {
    /// Action description
    pub text: String,

    /// Why this particular step is easy
    pub encouragement: String,
}

/// Structured plan returned by the language model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResult {
    /// Short name for the task
    pub title: String,

    /// Ordered steps, first step first
    pub steps: Vec<PlannedStep>,

    /// Supportive text for the task as a whole
    pub overall_encouragement: String,
}

impl PlanResult {
    pub fn new(title: impl Into<String>, steps: Vec<PlannedStep>, overall_encouragement: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            steps,
            overall_encouragement: overall_encouragement.into(),
        }
    }
}

impl PlannedStep {
    pub fn new(text: impl Into<String>, encouragement: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            encouragement: encouragement.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_model_output() {
        let json = r#"{
            "title": "温柔入睡",
            "steps": [
                {"text": "放下手机", "encouragement": "只需要松开手"},
                {"text": "走进浴室", "encouragement": "几步路而已"}
            ],
            "overallEncouragement": "你已经在路上了"
        }"#;

        let plan: PlanResult = serde_json::from_str(json).unwrap();
        assert_eq!(plan.title, "温柔入睡");
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].text, "放下手机");
        assert_eq!(plan.overall_encouragement, "你已经在路上了");
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        let json = r#"{"title": "x", "steps": []}"#;
        assert!(serde_json::from_str::<PlanResult>(json).is_err());
    }
}
