//! The resilient request dispatcher.
//!
//! A [`Dispatcher`] turns one user submission into an ordered set of
//! appends to a [`ConversationState`]:
//!
//! 1. The input is trimmed and truncated; empty input is ignored.
//! 2. A `user` message is appended before any network attempt.
//! 3. Each attempt races the [`Backend`] against a fixed timeout.  The losing
//!    future is dropped, so a response that arrives after its timeout fired
//!    (or a timer that would fire after a response arrived) has no effect.
//! 4. Retryable failures are retried with a fixed delay up to a bounded budget.
//!    Retries are reported to a [`DispatchObserver`] and never appended.
//! 5. The outcome is appended: assistant, analysis and disclaimer messages on
//!    success, or exactly one terminal `error` message on failure.
//!
//! The dispatcher never returns an error; every failure ends as history.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::observability::{
    DISPATCH_ATTEMPTS, DISPATCH_COMPLETIONS, DISPATCH_FAILURES, DISPATCH_IGNORED,
    DISPATCH_RETRIES, DISPATCH_RETRY_BACKOFF, DISPATCH_SUBMISSIONS, DISPATCH_TIMEOUTS,
    DISPATCH_TRUNCATED,
};
use crate::types::{BackendReply, ChatMessage, MessageOrigin};

/// Maximum number of characters forwarded to the backend.
pub const MAX_INPUT_CHARS: usize = 1000;

/// Upper bound on retries after the first attempt.
pub const MAX_RETRIES: u32 = 3;

const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Terminal message when the backend kept answering 429.
pub const RATE_LIMITED_TEXT: &str =
    "Too many requests. You are being rate limited; please wait a moment and try again.";

/// Terminal message when the backend kept answering 5xx.
pub const SERVICE_UNAVAILABLE_TEXT: &str =
    "The service is temporarily unavailable. Please try again later.";

/// Terminal message for every other failure.
pub const CONNECTION_FAILED_TEXT: &str =
    "Failed to get a response. Please check your connection and try again.";

/// Disclaimer appended after assistant answers.
pub const DISCLAIMER_TEXT: &str = "This information is for general guidance only and is not \
     a substitute for professional medical advice. If your symptoms are severe or persist, \
     please contact a healthcare provider.";

/// Greeting used to seed a new conversation.
pub const GREETING_TEXT: &str = "Hello! I'm Medicare AI. Describe how you feel or ask a \
     health question and I'll do my best to help.";

////////////////////////////////////// DisclaimerPolicy /////////////////////////////////////

/// When a disclaimer follows a successful assistant answer.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum DisclaimerPolicy {
    /// Never append a disclaimer.
    Never,

    /// Append a disclaimer after the first answer of the conversation only.
    #[default]
    FirstAnswer,

    /// Append a disclaimer after every answer.
    EveryAnswer,
}

impl fmt::Display for DisclaimerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisclaimerPolicy::Never => write!(f, "never"),
            DisclaimerPolicy::FirstAnswer => write!(f, "first"),
            DisclaimerPolicy::EveryAnswer => write!(f, "every"),
        }
    }
}

impl FromStr for DisclaimerPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "never" | "off" => Ok(DisclaimerPolicy::Never),
            "first" => Ok(DisclaimerPolicy::FirstAnswer),
            "every" | "always" => Ok(DisclaimerPolicy::EveryAnswer),
            _ => Err(Error::validation(
                format!("unknown disclaimer policy {s:?}; expected never, first or every"),
                Some("disclaimer".to_string()),
            )),
        }
    }
}

/////////////////////////////////////// DispatchConfig //////////////////////////////////////

/// Tunables for a [`Dispatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Retries allowed after the first attempt; never more than [`MAX_RETRIES`].
    pub max_retries: u32,

    /// How long a single attempt may run before it counts as a timeout.
    pub attempt_timeout: Duration,

    /// Fixed delay before each retry.
    pub retry_delay: Duration,

    /// Input longer than this many characters is truncated.
    pub max_input_chars: usize,

    /// When to append a disclaimer after an answer.
    pub disclaimer: DisclaimerPolicy,
}

impl DispatchConfig {
    /// Creates a config with the defaults: 3 retries, 30 s timeout, 2 s delay.
    pub fn new() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
            max_input_chars: MAX_INPUT_CHARS,
            disclaimer: DisclaimerPolicy::default(),
        }
    }

    /// Sets the retry budget, capped at [`MAX_RETRIES`].
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.min(MAX_RETRIES);
        self
    }

    /// Sets the per-attempt timeout.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Sets the delay between attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sets the disclaimer policy.
    pub fn with_disclaimer(mut self, policy: DisclaimerPolicy) -> Self {
        self.disclaimer = policy;
        self
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::new()
    }
}

///////////////////////////////////// ConversationState /////////////////////////////////////

/// The history of one chat session plus the dispatcher's retry counter.
///
/// History is append-only: the only way to remove messages is to discard
/// the whole conversation with [`ConversationState::clear`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    history: Vec<ChatMessage>,
    retry_count: u32,
}

impl ConversationState {
    /// Creates an empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a conversation seeded with the assistant greeting.
    pub fn with_greeting() -> Self {
        Self::from_history(vec![ChatMessage::assistant(GREETING_TEXT)])
    }

    /// Restores a conversation from previously persisted history.
    pub fn from_history(history: Vec<ChatMessage>) -> Self {
        Self {
            history,
            retry_count: 0,
        }
    }

    /// The ordered history.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Retries spent by the submission in flight; 0 when idle.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Number of messages in the history.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Returns true if the history holds no messages.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Discards the whole conversation.
    pub fn clear(&mut self) {
        self.history.clear();
        self.retry_count = 0;
    }

    /// Forgets a submission whose future was dropped before it finished.
    ///
    /// History is kept as-is; only the retry counter returns to 0.
    pub fn abandon(&mut self) {
        self.retry_count = 0;
    }

    /// Consumes the state, returning the history.
    pub fn into_history(self) -> Vec<ChatMessage> {
        self.history
    }

    fn append(&mut self, message: ChatMessage, observer: &mut dyn DispatchObserver) {
        observer.on_append(&message);
        self.history.push(message);
    }

    fn has_disclaimer(&self) -> bool {
        self.history
            .iter()
            .any(|m| m.origin == MessageOrigin::Disclaimer)
    }
}

////////////////////////////////////// DispatchOutcome //////////////////////////////////////

/// What one call to [`Dispatcher::submit`] did.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// The input was empty after trimming; nothing happened.
    Ignored,

    /// The backend answered.
    Completed {
        /// Messages appended after the user message, in order.  May be empty.
        messages: Vec<ChatMessage>,
        /// Retries spent before the answer arrived.
        retries: u32,
    },

    /// The submission failed and one terminal message was appended.
    Failed {
        /// The appended `error` message.
        message: ChatMessage,
        /// The last failure observed.
        error: Error,
        /// Retries spent before giving up.
        retries: u32,
    },
}

impl DispatchOutcome {
    /// Returns true for [`DispatchOutcome::Ignored`].
    pub fn is_ignored(&self) -> bool {
        matches!(self, DispatchOutcome::Ignored)
    }

    /// Returns true for [`DispatchOutcome::Completed`].
    pub fn is_completed(&self) -> bool {
        matches!(self, DispatchOutcome::Completed { .. })
    }

    /// Returns true for [`DispatchOutcome::Failed`].
    pub fn is_failed(&self) -> bool {
        matches!(self, DispatchOutcome::Failed { .. })
    }

    /// Messages appended after the user message.
    pub fn messages(&self) -> &[ChatMessage] {
        match self {
            DispatchOutcome::Ignored => &[],
            DispatchOutcome::Completed { messages, .. } => messages,
            DispatchOutcome::Failed { message, .. } => std::slice::from_ref(message),
        }
    }

    /// Retries spent by this submission.
    pub fn retries(&self) -> u32 {
        match self {
            DispatchOutcome::Ignored => 0,
            DispatchOutcome::Completed { retries, .. } => *retries,
            DispatchOutcome::Failed { retries, .. } => *retries,
        }
    }
}

///////////////////////////////////// DispatchObserver //////////////////////////////////////

/// Receives progress of a submission: appends and transient retry status.
pub trait DispatchObserver: Send {
    /// Called right before an attempt is issued.  `retry` is 0 for the first.
    fn on_attempt(&mut self, retry: u32) {
        _ = retry;
    }

    /// Called when a retryable failure will be retried after `delay`.
    fn on_retry(&mut self, retry: u32, max_retries: u32, delay: Duration, error: &Error) {
        _ = retry;
        _ = max_retries;
        _ = delay;
        _ = error;
    }

    /// Called for each message, in order, as it is appended to history.
    fn on_append(&mut self, message: &ChatMessage) {
        _ = message;
    }
}

impl DispatchObserver for () {}

///////////////////////////////////////// Dispatcher ////////////////////////////////////////

/// Sends user text to a [`Backend`] and records the outcome in history.
pub struct Dispatcher<B: Backend> {
    backend: B,
    config: DispatchConfig,
}

impl<B: Backend> Dispatcher<B> {
    /// Creates a dispatcher with the default config.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, DispatchConfig::default())
    }

    /// Creates a dispatcher with a custom config.
    pub fn with_config(backend: B, mut config: DispatchConfig) -> Self {
        config.max_retries = config.max_retries.min(MAX_RETRIES);
        Self { backend, config }
    }

    /// The active config.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// The active config for mutation.
    pub fn config_mut(&mut self) -> &mut DispatchConfig {
        &mut self.config
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The backend for mutation.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Submit one piece of user text.
    ///
    /// Taking `state` by `&mut` means a conversation cannot have two
    /// submissions in flight; see [`SharedSession`](crate::SharedSession)
    /// for sharing one across tasks.
    pub async fn submit(
        &self,
        state: &mut ConversationState,
        raw: &str,
        observer: &mut dyn DispatchObserver,
    ) -> DispatchOutcome {
        let Some(text) = sanitize_input(raw, self.config.max_input_chars) else {
            DISPATCH_IGNORED.click();
            return DispatchOutcome::Ignored;
        };
        DISPATCH_SUBMISSIONS.click();

        state.retry_count = 0;
        state.append(ChatMessage::user(text.clone()), observer);

        let max_retries = self.config.max_retries.min(MAX_RETRIES);
        let result = loop {
            DISPATCH_ATTEMPTS.click();
            observer.on_attempt(state.retry_count);
            let error = match self.attempt(&text).await {
                Ok(reply) => break Ok(reply),
                Err(error) => error,
            };
            if !error.is_retryable() || state.retry_count >= max_retries {
                break Err(error);
            }
            state.retry_count += 1;
            DISPATCH_RETRIES.click();
            DISPATCH_RETRY_BACKOFF.add(self.config.retry_delay.as_secs_f64());
            observer.on_retry(
                state.retry_count,
                max_retries,
                self.config.retry_delay,
                &error,
            );
            tokio::time::sleep(self.config.retry_delay).await;
        };

        let retries = state.retry_count;
        state.retry_count = 0;

        match result {
            Ok(reply) => {
                DISPATCH_COMPLETIONS.click();
                let messages = self.reply_messages(state, reply, retries);
                for message in messages.iter().cloned() {
                    state.append(message, observer);
                }
                DispatchOutcome::Completed { messages, retries }
            }
            Err(error) => {
                DISPATCH_FAILURES.click();
                let message = ChatMessage::error(terminal_text(&error));
                state.append(message.clone(), observer);
                DispatchOutcome::Failed {
                    message,
                    error,
                    retries,
                }
            }
        }
    }

    /// One attempt raced against the attempt timeout.
    async fn attempt(&self, text: &str) -> Result<BackendReply> {
        let timeout = self.config.attempt_timeout;
        match tokio::time::timeout(timeout, self.backend.send(text)).await {
            Ok(result) => result,
            Err(_) => {
                DISPATCH_TIMEOUTS.click();
                Err(Error::timeout(
                    "no response from the backend",
                    Some(timeout.as_secs_f64()),
                ))
            }
        }
    }

    fn reply_messages(
        &self,
        state: &ConversationState,
        reply: BackendReply,
        retries: u32,
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::new();
        let answered = reply.answer.is_some();
        if let Some(answer) = reply.answer {
            messages.push(ChatMessage::assistant(answer));
        }
        if let Some(analysis) = reply.analysis {
            messages.push(ChatMessage::analysis(analysis.format()));
        }
        let disclaim = match self.config.disclaimer {
            DisclaimerPolicy::Never => false,
            DisclaimerPolicy::FirstAnswer => !state.has_disclaimer(),
            DisclaimerPolicy::EveryAnswer => true,
        };
        if answered && retries == 0 && disclaim {
            messages.push(ChatMessage::disclaimer(DISCLAIMER_TEXT));
        }
        messages
    }
}

/// Trim and truncate raw user input; `None` if nothing remains.
pub fn sanitize_input(raw: &str, max_chars: usize) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            DISPATCH_TRUNCATED.click();
            Some(trimmed[..cut].to_string())
        }
        None => Some(trimmed.to_string()),
    }
}

/// The user-visible text of the terminal message for a failure.
pub fn terminal_text(error: &Error) -> &'static str {
    match error.status_code() {
        Some(429) => RATE_LIMITED_TEXT,
        Some(500..=599) => SERVICE_UNAVAILABLE_TEXT,
        _ => CONNECTION_FAILED_TEXT,
    }
}
