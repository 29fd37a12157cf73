use serde::{Deserialize, Serialize};

use crate::types::SymptomResult;

/// Request body for the multilingual `analyze-ml` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalyzeRequest {
    /// The symptom description.
    pub text: String,
}

impl AnalyzeRequest {
    /// Create a new `AnalyzeRequest`.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Response body of the `analyze-ml` endpoint.
///
/// Unlike [`ChatResponse`](crate::types::ChatResponse), the analysis fields
/// are flat.  The backend answers either with a `followup` question, a
/// pre-formatted `answer`, or the three analysis fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalyzeResponse {
    /// The likely condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    /// A suggested medication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medication: Option<String>,

    /// General advice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advice: Option<String>,

    /// A clarifying question when no condition matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followup: Option<String>,

    /// A pre-formatted, possibly translated, answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl AnalyzeResponse {
    /// Returns true if any analysis key was present in the body, even empty.
    pub fn has_analysis(&self) -> bool {
        self.condition.is_some() || self.medication.is_some() || self.advice.is_some()
    }

    /// The flat analysis fields as a [`SymptomResult`].
    pub fn symptom_result(&self) -> SymptomResult {
        SymptomResult {
            condition: self.condition.clone(),
            medication: self.medication.clone(),
            advice: self.advice.clone(),
        }
    }
}
