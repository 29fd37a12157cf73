use serde::{Deserialize, Serialize};

/// Text used when the analysis carries no condition.
pub const UNKNOWN_CONDITION: &str = "Unknown";

/// Text used when the analysis carries no medication.
pub const NO_MEDICATION: &str = "None recommended";

/// Text used when the analysis carries no advice.
pub const DEFAULT_ADVICE: &str = "Please consult a healthcare provider";

/// A structured symptom-checker result.
///
/// Every field is optional.  An empty string is treated the same as an absent
/// field when formatting.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymptomResult {
    /// The likely condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    /// A suggested over-the-counter medication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medication: Option<String>,

    /// General advice for the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advice: Option<String>,
}

impl SymptomResult {
    /// Create a new, empty `SymptomResult`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the condition.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Set the medication.
    pub fn with_medication(mut self, medication: impl Into<String>) -> Self {
        self.medication = Some(medication.into());
        self
    }

    /// Set the advice.
    pub fn with_advice(mut self, advice: impl Into<String>) -> Self {
        self.advice = Some(advice.into());
        self
    }

    /// Returns true if no field carries non-empty text.
    pub fn is_empty(&self) -> bool {
        present(&self.condition).is_none()
            && present(&self.medication).is_none()
            && present(&self.advice).is_none()
    }

    /// Format the result for display, substituting fallbacks for absent fields.
    pub fn format(&self) -> String {
        format!(
            "Condition: {}\nMedication: {}\nAdvice: {}",
            present(&self.condition).unwrap_or(UNKNOWN_CONDITION),
            present(&self.medication).unwrap_or(NO_MEDICATION),
            present(&self.advice).unwrap_or(DEFAULT_ADVICE),
        )
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_with_all_fields() {
        let result = SymptomResult::new()
            .with_condition("Migraine")
            .with_medication("Ibuprofen")
            .with_advice("Rest in a dark room");
        assert_eq!(
            result.format(),
            "Condition: Migraine\nMedication: Ibuprofen\nAdvice: Rest in a dark room"
        );
    }

    #[test]
    fn format_substitutes_fallbacks() {
        let result: SymptomResult = serde_json::from_str(r#"{"condition":"Flu"}"#).unwrap();
        let text = result.format();
        assert!(text.contains("Flu"));
        assert!(text.contains("None recommended"));
        assert!(text.contains("Please consult a healthcare provider"));
    }

    #[test]
    fn empty_string_counts_as_absent() {
        let result: SymptomResult =
            serde_json::from_str(r#"{"condition":"","medication":"","advice":""}"#).unwrap();
        assert!(result.is_empty());
        assert_eq!(
            result.format(),
            "Condition: Unknown\nMedication: None recommended\nAdvice: Please consult a healthcare provider"
        );
    }

    #[test]
    fn null_fields_deserialize() {
        let result: SymptomResult =
            serde_json::from_str(r#"{"condition":null,"medication":"Rest"}"#).unwrap();
        assert_eq!(result.condition, None);
        assert_eq!(result.medication.as_deref(), Some("Rest"));
        assert!(!result.is_empty());
    }
}
