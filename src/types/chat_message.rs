use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Who or what produced a chat message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageOrigin {
    /// Text the user submitted.
    User,

    /// A free-text answer or follow-up question from the backend.
    Assistant,

    /// A formatted structured symptom analysis.
    Analysis,

    /// A medical disclaimer or greeting appended by the client.
    Disclaimer,

    /// A terminal failure message.
    Error,
}

impl fmt::Display for MessageOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageOrigin::User => write!(f, "user"),
            MessageOrigin::Assistant => write!(f, "assistant"),
            MessageOrigin::Analysis => write!(f, "analysis"),
            MessageOrigin::Disclaimer => write!(f, "disclaimer"),
            MessageOrigin::Error => write!(f, "error"),
        }
    }
}

/// Error returned when parsing an invalid message origin string.
#[derive(Debug)]
pub struct MessageOriginParseError {
    /// The invalid string value that could not be parsed.
    pub invalid_value: String,
}

impl fmt::Display for MessageOriginParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown message origin: {}", self.invalid_value)
    }
}

impl std::error::Error for MessageOriginParseError {}

impl FromStr for MessageOrigin {
    type Err = MessageOriginParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageOrigin::User),
            "assistant" => Ok(MessageOrigin::Assistant),
            "analysis" => Ok(MessageOrigin::Analysis),
            "disclaimer" => Ok(MessageOrigin::Disclaimer),
            "error" => Ok(MessageOrigin::Error),
            _ => Err(MessageOriginParseError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

/// One entry in a conversation's history.
///
/// Messages are display-ready and are never edited once appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// The producer of this message.
    pub origin: MessageOrigin,

    /// The message text, possibly containing light markdown.
    pub text: String,
}

impl ChatMessage {
    /// Create a new `ChatMessage`.
    pub fn new(origin: MessageOrigin, text: impl Into<String>) -> Self {
        Self {
            origin,
            text: text.into(),
        }
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageOrigin::User, text)
    }

    /// Create an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(MessageOrigin::Assistant, text)
    }

    /// Create an analysis message.
    pub fn analysis(text: impl Into<String>) -> Self {
        Self::new(MessageOrigin::Analysis, text)
    }

    /// Create a disclaimer message.
    pub fn disclaimer(text: impl Into<String>) -> Self {
        Self::new(MessageOrigin::Disclaimer, text)
    }

    /// Create an error message.
    pub fn error(text: impl Into<String>) -> Self {
        Self::new(MessageOrigin::Error, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization() {
        let message = ChatMessage::analysis("Condition: Flu");
        let json = serde_json::to_string(&message).unwrap();
        assert_eq!(json, r#"{"origin":"analysis","text":"Condition: Flu"}"#);
    }

    #[test]
    fn deserialization() {
        let json = r#"{"origin":"disclaimer","text":"Not medical advice."}"#;
        let message: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(message.origin, MessageOrigin::Disclaimer);
        assert_eq!(message.text, "Not medical advice.");
    }

    #[test]
    fn origin_display_and_parse() {
        for origin in [
            MessageOrigin::User,
            MessageOrigin::Assistant,
            MessageOrigin::Analysis,
            MessageOrigin::Disclaimer,
            MessageOrigin::Error,
        ] {
            assert_eq!(origin.to_string().parse::<MessageOrigin>().unwrap(), origin);
        }
        assert!("bot".parse::<MessageOrigin>().is_err());
    }
}
