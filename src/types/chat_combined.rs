use serde::{Deserialize, Serialize};

use crate::types::SymptomResult;

/// Request body for the `chat-combined` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    /// The sanitized user text.
    pub message: String,
}

impl ChatRequest {
    /// Create a new `ChatRequest`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response body of the `chat-combined` endpoint.
///
/// Every field is optional; the backend only includes `symptomResult` when
/// the message looked like a symptom description.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    /// Free-text answer from the language model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_response: Option<String>,

    /// A clarifying question sent instead of a final answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followup: Option<String>,

    /// Structured symptom-checker result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptom_result: Option<SymptomResult>,
}
