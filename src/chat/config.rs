//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::path::PathBuf;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::client::Endpoint;
use crate::dispatcher::{DisclaimerPolicy, DispatchConfig};
use crate::error::{Error, Result};

/// Default per-attempt timeout, in seconds.
const DEFAULT_TIMEOUT_SECS: u32 = 30;

/// Command-line arguments for the medicare-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Base URL of the backend API.
    #[arrrg(optional, "Backend base URL (default: $MEDICARE_API_URL or http://localhost:8080/api/)", "URL")]
    pub api_url: Option<String>,

    /// Endpoint to send messages to.
    #[arrrg(optional, "Endpoint: chat or analyze (default: chat)", "ENDPOINT")]
    pub endpoint: Option<String>,

    /// Language code for the analyze endpoint.
    #[arrrg(optional, "Language code for the analyze endpoint (default: en)", "LANG")]
    pub lang: Option<String>,

    /// Per-attempt timeout in seconds.
    #[arrrg(optional, "Per-attempt timeout in seconds (default: 30)", "SECS")]
    pub timeout_secs: Option<u32>,

    /// Disclaimer policy.
    #[arrrg(optional, "Disclaimer after answers: never, first or every (default: first)", "POLICY")]
    pub disclaimer: Option<String>,

    /// Transcript auto-save path.
    #[arrrg(optional, "Save the transcript to this file after every message", "PATH")]
    pub transcript: Option<String>,

    /// Start without the greeting message.
    #[arrrg(flag, "Do not seed the conversation with a greeting")]
    pub no_greeting: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Backend base URL; `None` defers to the environment and the built-in default.
    pub api_url: Option<String>,

    /// The endpoint messages are sent to.
    pub endpoint: Endpoint,

    /// Per-attempt timeout.
    pub timeout: Duration,

    /// When to append a disclaimer after an answer.
    pub disclaimer: DisclaimerPolicy,

    /// Whether a new conversation starts with a greeting.
    pub greeting: bool,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Path to persist transcripts automatically after each submission.
    pub transcript_path: Option<PathBuf>,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Endpoint: chat-combined
    /// - Timeout: 30 seconds
    /// - Disclaimer: after the first answer
    /// - Greeting: enabled
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            api_url: None,
            endpoint: Endpoint::ChatCombined,
            timeout: Duration::from_secs(u64::from(DEFAULT_TIMEOUT_SECS)),
            disclaimer: DisclaimerPolicy::default(),
            greeting: true,
            use_color: true,
            transcript_path: None,
        }
    }

    /// Sets the backend base URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    /// Sets the endpoint.
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Sets the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the disclaimer policy.
    pub fn with_disclaimer(mut self, policy: DisclaimerPolicy) -> Self {
        self.disclaimer = policy;
        self
    }

    /// Disables the greeting.
    pub fn without_greeting(mut self) -> Self {
        self.greeting = false;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Sets the transcript auto-save path.
    pub fn with_transcript_path(mut self, path: Option<PathBuf>) -> Self {
        self.transcript_path = path;
        self
    }

    /// The dispatcher settings implied by this config.
    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig::new()
            .with_attempt_timeout(self.timeout)
            .with_disclaimer(self.disclaimer)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = Error;

    fn try_from(args: ChatArgs) -> Result<Self> {
        let mut endpoint = match args.endpoint.as_deref() {
            Some(endpoint) => endpoint.parse::<Endpoint>()?,
            None => Endpoint::ChatCombined,
        };
        if let Some(lang) = args.lang {
            match &mut endpoint {
                Endpoint::AnalyzeMl { lang: current } => *current = lang,
                Endpoint::ChatCombined => {
                    return Err(Error::validation(
                        "--lang only applies to the analyze endpoint",
                        Some("lang".to_string()),
                    ));
                }
            }
        }
        let disclaimer = match args.disclaimer.as_deref() {
            Some(policy) => policy.parse::<DisclaimerPolicy>()?,
            None => DisclaimerPolicy::default(),
        };
        let timeout_secs = args.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(Error::validation(
                "timeout must be at least one second",
                Some("timeout_secs".to_string()),
            ));
        }

        Ok(ChatConfig {
            api_url: args.api_url,
            endpoint,
            timeout: Duration::from_secs(u64::from(timeout_secs)),
            disclaimer,
            greeting: !args.no_greeting,
            use_color: !args.no_color,
            transcript_path: args.transcript.map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert!(config.api_url.is_none());
        assert_eq!(config.endpoint, Endpoint::ChatCombined);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.disclaimer, DisclaimerPolicy::FirstAnswer);
        assert!(config.greeting);
        assert!(config.use_color);
        assert!(config.transcript_path.is_none());
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::try_from(ChatArgs::default()).unwrap();
        assert_eq!(config, ChatConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            api_url: Some("https://medicare.example.com/api".to_string()),
            endpoint: Some("analyze".to_string()),
            lang: Some("es".to_string()),
            timeout_secs: Some(10),
            disclaimer: Some("every".to_string()),
            transcript: Some("chat.json".to_string()),
            no_greeting: true,
            no_color: true,
        };
        let config = ChatConfig::try_from(args).unwrap();
        assert_eq!(
            config.api_url.as_deref(),
            Some("https://medicare.example.com/api")
        );
        assert_eq!(config.endpoint, Endpoint::analyze("es"));
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.disclaimer, DisclaimerPolicy::EveryAnswer);
        assert_eq!(config.transcript_path, Some(PathBuf::from("chat.json")));
        assert!(!config.greeting);
        assert!(!config.use_color);
    }

    #[test]
    fn config_from_args_rejects_bad_values() {
        let args = ChatArgs {
            endpoint: Some("diagnose".to_string()),
            ..ChatArgs::default()
        };
        assert!(ChatConfig::try_from(args).is_err());

        let args = ChatArgs {
            lang: Some("fr".to_string()),
            ..ChatArgs::default()
        };
        assert!(ChatConfig::try_from(args).is_err());

        let args = ChatArgs {
            timeout_secs: Some(0),
            ..ChatArgs::default()
        };
        assert!(ChatConfig::try_from(args).is_err());

        let args = ChatArgs {
            disclaimer: Some("sometimes".to_string()),
            ..ChatArgs::default()
        };
        assert!(ChatConfig::try_from(args).is_err());
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_api_url("http://localhost:9000/api/")
            .with_endpoint(Endpoint::analyze("de"))
            .with_timeout(Duration::from_secs(5))
            .with_disclaimer(DisclaimerPolicy::Never)
            .without_greeting()
            .without_color()
            .with_transcript_path(Some(PathBuf::from("transcript.json")));

        assert_eq!(config.api_url.as_deref(), Some("http://localhost:9000/api/"));
        assert_eq!(config.endpoint, Endpoint::analyze("de"));
        assert!(!config.greeting);
        assert!(!config.use_color);

        let dispatch = config.dispatch_config();
        assert_eq!(dispatch.attempt_timeout, Duration::from_secs(5));
        assert_eq!(dispatch.disclaimer, DisclaimerPolicy::Never);
        assert_eq!(dispatch.max_retries, 3);
        assert_eq!(dispatch.retry_delay, Duration::from_secs(2));
    }
}
