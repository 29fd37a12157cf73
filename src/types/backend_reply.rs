use crate::types::{AnalyzeResponse, ChatResponse, SymptomResult};

/// A successful backend response, normalized across endpoint shapes.
///
/// Empty answer strings are dropped during normalization, so `answer` is only
/// `Some` when it carries displayable text.  `analysis` is `Some` whenever the
/// body carried a result at all, even one with no usable field; formatting
/// substitutes the fallback text for those.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendReply {
    /// Assistant free text: an answer or a follow-up question.
    pub answer: Option<String>,

    /// Structured symptom analysis.
    pub analysis: Option<SymptomResult>,
}

impl BackendReply {
    /// Create a reply carrying only an answer.
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            answer: non_empty(Some(text.into())),
            analysis: None,
        }
    }

    /// Create a reply carrying only an analysis.
    pub fn analysis(result: SymptomResult) -> Self {
        Self {
            answer: None,
            analysis: Some(result),
        }
    }

    /// Attach an analysis to this reply.
    pub fn with_analysis(mut self, result: SymptomResult) -> Self {
        self.analysis = Some(result);
        self
    }

    /// Returns true if the reply has nothing to display.
    pub fn is_empty(&self) -> bool {
        self.answer.is_none() && self.analysis.is_none()
    }
}

impl From<ChatResponse> for BackendReply {
    fn from(response: ChatResponse) -> Self {
        let answer = non_empty(response.ai_response).or_else(|| non_empty(response.followup));
        let analysis = response.symptom_result;
        Self { answer, analysis }
    }
}

impl From<AnalyzeResponse> for BackendReply {
    fn from(response: AnalyzeResponse) -> Self {
        let analysis = response
            .has_analysis()
            .then(|| response.symptom_result());
        let answer = non_empty(response.followup).or_else(|| non_empty(response.answer));
        Self { answer, analysis }
    }
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|s| !s.trim().is_empty())
}
