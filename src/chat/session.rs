//! Chat session management.
//!
//! This module provides the [`ChatSession`] struct, which pairs a
//! [`Dispatcher`] with the [`ConversationState`] it appends to and handles
//! transcript persistence, and [`SharedSession`], which lets several tasks
//! share one session while rejecting overlapping submissions.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_writer_pretty};
use tokio::sync::{Mutex, MutexGuard};

use crate::Error;
use crate::backend::Backend;
use crate::chat::config::ChatConfig;
use crate::client::MedicareClient;
use crate::dispatcher::{
    ConversationState, DisclaimerPolicy, DispatchConfig, DispatchObserver, DispatchOutcome,
    Dispatcher,
};
use crate::error::Result;
use crate::observability::SESSION_REJECTED;
use crate::types::ChatMessage;

/// A chat session: one conversation and the dispatcher that feeds it.
pub struct ChatSession<B: Backend> {
    dispatcher: Dispatcher<B>,
    state: ConversationState,
    transcript_path: Option<PathBuf>,
    submissions: u64,
    completed: u64,
    failed: u64,
    total_retries: u64,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// The number of messages in the conversation.
    pub message_count: usize,
    /// Non-empty submissions sent to the backend.
    pub submissions: u64,
    /// Submissions that ended with a backend reply.
    pub completed: u64,
    /// Submissions that ended with a terminal error message.
    pub failed: u64,
    /// Retries spent across all submissions.
    pub total_retries: u64,
    /// The active disclaimer policy.
    pub disclaimer: DisclaimerPolicy,
    /// The auto-save transcript path, if set.
    pub transcript_path: Option<PathBuf>,
}

impl ChatSession<MedicareClient> {
    /// Creates a session talking to the Medicare backend described by `config`.
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        let client = MedicareClient::with_options(
            config.api_url.clone(),
            Some(config.timeout),
            Some(config.endpoint.clone()),
        )?;
        let state = if config.greeting {
            ConversationState::with_greeting()
        } else {
            ConversationState::new()
        };
        let mut session = Self::with_state(client, config.dispatch_config(), state);
        session.transcript_path = config.transcript_path.clone();
        Ok(session)
    }
}

impl<B: Backend> ChatSession<B> {
    /// Creates a session with an empty conversation.
    pub fn new(backend: B, config: DispatchConfig) -> Self {
        Self::with_state(backend, config, ConversationState::new())
    }

    /// Creates a session that continues an existing conversation.
    pub fn with_state(backend: B, config: DispatchConfig, state: ConversationState) -> Self {
        Self {
            dispatcher: Dispatcher::with_config(backend, config),
            state,
            transcript_path: None,
            submissions: 0,
            completed: 0,
            failed: 0,
            total_retries: 0,
        }
    }

    /// Submits user text and records the outcome in history.
    ///
    /// When an auto-save path is configured the transcript is written after
    /// every non-ignored submission.
    ///
    /// # Errors
    ///
    /// The dispatch itself never fails; an error here means the auto-save
    /// could not be written.  History is updated either way.
    pub async fn submit(
        &mut self,
        raw: &str,
        observer: &mut dyn DispatchObserver,
    ) -> Result<DispatchOutcome> {
        let outcome = self.dispatcher.submit(&mut self.state, raw, observer).await;
        if outcome.is_ignored() {
            return Ok(outcome);
        }
        self.submissions += 1;
        self.total_retries += u64::from(outcome.retries());
        if outcome.is_completed() {
            self.completed += 1;
        } else {
            self.failed += 1;
        }
        self.auto_save_transcript()?;
        Ok(outcome)
    }

    /// The ordered conversation history.
    pub fn history(&self) -> &[ChatMessage] {
        self.state.history()
    }

    /// The conversation state.
    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Returns the number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.state.len()
    }

    /// Retries spent by the submission in flight; 0 when idle.
    pub fn retry_count(&self) -> u32 {
        self.state.retry_count()
    }

    /// Cleans up after a `submit` future was dropped before it finished.
    ///
    /// The user message stays in history without a reply; the retry counter
    /// is reset so the idle session reports no retries in flight.
    pub fn abandon(&mut self) {
        self.state.abandon();
    }

    /// Clears the conversation history.
    pub fn clear(&mut self) {
        self.state.clear();
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        self.dispatcher.backend()
    }

    /// The backend for mutation.
    pub fn backend_mut(&mut self) -> &mut B {
        self.dispatcher.backend_mut()
    }

    /// Sets the disclaimer policy.
    pub fn set_disclaimer_policy(&mut self, policy: DisclaimerPolicy) {
        self.dispatcher.config_mut().disclaimer = policy;
    }

    /// Returns the disclaimer policy.
    pub fn disclaimer_policy(&self) -> DisclaimerPolicy {
        self.dispatcher.config().disclaimer
    }

    /// Sets the auto-save transcript path.
    pub fn set_transcript_path(&mut self, path: Option<PathBuf>) {
        self.transcript_path = path;
    }

    /// Returns the configured transcript path, if any.
    pub fn transcript_path(&self) -> Option<&Path> {
        self.transcript_path.as_deref()
    }

    /// Saves the transcript to the specified path.
    pub fn save_transcript_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let transcript = TranscriptFile::new(self.state.history());
        let file = File::create(path.as_ref())
            .map_err(|err| Error::io("failed to create transcript file", err))?;
        let writer = BufWriter::new(file);
        to_writer_pretty(writer, &transcript).map_err(|err| {
            Error::serialization("failed to serialize transcript", Some(Box::new(err)))
        })
    }

    /// Loads a transcript from disk, replacing the current conversation history.
    pub fn load_transcript_from<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let file = File::open(path.as_ref())
            .map_err(|err| Error::io("failed to open transcript file", err))?;
        let reader = BufReader::new(file);
        let transcript: TranscriptFile = from_reader(reader).map_err(|err| {
            Error::serialization("failed to parse transcript", Some(Box::new(err)))
        })?;
        if transcript.version != TRANSCRIPT_VERSION {
            return Err(Error::validation(
                format!("unsupported transcript version {}", transcript.version),
                Some("version".to_string()),
            ));
        }
        self.state = ConversationState::from_history(transcript.messages);
        Ok(())
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            message_count: self.message_count(),
            submissions: self.submissions,
            completed: self.completed,
            failed: self.failed,
            total_retries: self.total_retries,
            disclaimer: self.disclaimer_policy(),
            transcript_path: self.transcript_path.clone(),
        }
    }

    fn auto_save_transcript(&self) -> Result<()> {
        if let Some(path) = &self.transcript_path {
            self.save_transcript_to(path)
        } else {
            Ok(())
        }
    }
}

const TRANSCRIPT_VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct TranscriptFile {
    version: u8,
    messages: Vec<ChatMessage>,
}

impl TranscriptFile {
    fn new(messages: &[ChatMessage]) -> Self {
        Self {
            version: TRANSCRIPT_VERSION,
            messages: messages.to_vec(),
        }
    }
}

/////////////////////////////////////// SharedSession ///////////////////////////////////////

/// A [`ChatSession`] shared between tasks.
///
/// Only one submission may be in flight.  [`SharedSession::try_submit`]
/// rejects a call that overlaps another with [`Error::Busy`] and leaves the
/// conversation untouched.
pub struct SharedSession<B: Backend> {
    inner: Arc<Mutex<ChatSession<B>>>,
}

impl<B: Backend> Clone for SharedSession<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: Backend> SharedSession<B> {
    /// Wraps a session for sharing.
    pub fn new(session: ChatSession<B>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Submits user text unless another submission is in flight.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] immediately if a submission is in flight, or
    /// the auto-save error from [`ChatSession::submit`].
    pub async fn try_submit(
        &self,
        raw: &str,
        observer: &mut dyn DispatchObserver,
    ) -> Result<DispatchOutcome> {
        let mut session = self.inner.try_lock().map_err(|_| {
            SESSION_REJECTED.click();
            Error::busy("a message is already being sent")
        })?;
        session.submit(raw, observer).await
    }

    /// Returns true while a submission holds the session.
    pub fn is_busy(&self) -> bool {
        self.inner.try_lock().is_err()
    }

    /// Waits for any in-flight submission and returns the session.
    pub async fn lock(&self) -> MutexGuard<'_, ChatSession<B>> {
        self.inner.lock().await
    }
}

/// How often [`wait_for_interrupt`] checks its flag.
const INTERRUPT_POLL: Duration = Duration::from_millis(100);

/// Resolves once `flag` has been raised, e.g. by a Ctrl+C handler.
///
/// Race it against [`ChatSession::submit`] to abandon a submission, then call
/// [`ChatSession::abandon`].
pub async fn wait_for_interrupt(flag: &AtomicBool) {
    while !flag.load(Ordering::Relaxed) {
        tokio::time::sleep(INTERRUPT_POLL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicU32;

    use tokio::sync::Notify;

    use crate::types::{BackendReply, MessageOrigin};

    struct EchoBackend;

    #[async_trait::async_trait]
    impl Backend for EchoBackend {
        async fn send(&self, text: &str) -> Result<BackendReply> {
            Ok(BackendReply::answer(format!("echo: {text}")))
        }
    }

    struct GatedBackend {
        entered: Notify,
        release: Notify,
        calls: AtomicU32,
    }

    #[async_trait::async_trait]
    impl Backend for GatedBackend {
        async fn send(&self, text: &str) -> Result<BackendReply> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.entered.notify_one();
            self.release.notified().await;
            Ok(BackendReply::answer(format!("answer to {text}")))
        }
    }

    fn quiet() -> DispatchConfig {
        DispatchConfig::new().with_disclaimer(DisclaimerPolicy::Never)
    }

    #[test]
    fn new_session_empty() {
        let session = ChatSession::new(EchoBackend, quiet());
        assert_eq!(session.message_count(), 0);
        assert_eq!(session.retry_count(), 0);
        assert_eq!(session.stats().submissions, 0);
    }

    #[tokio::test]
    async fn submit_updates_stats() {
        let mut session = ChatSession::new(EchoBackend, quiet());

        session.submit("  ", &mut ()).await.unwrap();
        session.submit("headache", &mut ()).await.unwrap();

        let stats = session.stats();
        assert_eq!(stats.submissions, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.message_count, 2);
        assert_eq!(session.history()[1].text, "echo: headache");
    }

    #[tokio::test]
    async fn clear_session() {
        let mut session = ChatSession::new(EchoBackend, quiet());
        session.submit("hello", &mut ()).await.unwrap();
        assert_eq!(session.message_count(), 2);

        session.clear();
        assert_eq!(session.message_count(), 0);
    }

    #[tokio::test]
    async fn transcript_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.json");

        let mut session =
            ChatSession::with_state(EchoBackend, quiet(), ConversationState::with_greeting());
        session.submit("sore throat", &mut ()).await.unwrap();
        session.save_transcript_to(&path).unwrap();

        let mut restored = ChatSession::new(EchoBackend, quiet());
        restored.load_transcript_from(&path).unwrap();
        assert_eq!(restored.history(), session.history());
        assert_eq!(restored.history()[0].origin, MessageOrigin::Assistant);
    }

    #[tokio::test]
    async fn auto_save_after_submit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auto.json");

        let mut session = ChatSession::new(EchoBackend, quiet());
        session.set_transcript_path(Some(path.clone()));
        session.submit("cough", &mut ()).await.unwrap();

        let saved: serde_json::Value =
            serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(saved["version"], 1);
        assert_eq!(saved["messages"][0]["origin"], "user");
        assert_eq!(saved["messages"][0]["text"], "cough");
        assert_eq!(saved["messages"][1]["origin"], "assistant");
    }

    #[test]
    fn load_rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.json");
        std::fs::write(&path, r#"{"version":9,"messages":[]}"#).unwrap();

        let mut session = ChatSession::new(EchoBackend, quiet());
        let err = session.load_transcript_from(&path).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let mut session = ChatSession::new(EchoBackend, quiet());
        let err = session
            .load_transcript_from("/nonexistent/medicare/transcript.json")
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[tokio::test]
    async fn overlapping_submit_is_rejected() {
        let backend = Arc::new(GatedBackend {
            entered: Notify::new(),
            release: Notify::new(),
            calls: AtomicU32::new(0),
        });
        let shared = SharedSession::new(ChatSession::new(Arc::clone(&backend), quiet()));

        let first = {
            let shared = shared.clone();
            tokio::spawn(async move { shared.try_submit("first", &mut ()).await })
        };
        backend.entered.notified().await;
        assert!(shared.is_busy());

        let err = shared.try_submit("second", &mut ()).await.unwrap_err();
        assert!(err.is_busy());

        backend.release.notify_one();
        let outcome = first.await.unwrap().unwrap();
        assert!(outcome.is_completed());
        assert!(!shared.is_busy());

        let session = shared.lock().await;
        let texts: Vec<_> = session.history().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "answer to first"]);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.stats().submissions, 1);
    }

    #[tokio::test]
    async fn sequential_shared_submits_succeed() {
        let shared = SharedSession::new(ChatSession::new(EchoBackend, quiet()));
        shared.try_submit("one", &mut ()).await.unwrap();
        shared.try_submit("two", &mut ()).await.unwrap();
        assert_eq!(shared.lock().await.message_count(), 4);
    }

    struct FailingBackend;

    #[async_trait::async_trait]
    impl Backend for FailingBackend {
        async fn send(&self, _: &str) -> Result<BackendReply> {
            Err(Error::service_unavailable(503, "down", None))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn abandon_resets_retry_count() {
        let mut session = ChatSession::new(FailingBackend, quiet());

        // Dropped during the second retry delay.
        let dropped =
            tokio::time::timeout(Duration::from_secs(3), session.submit("hello", &mut ())).await;
        assert!(dropped.is_err());
        assert_eq!(session.retry_count(), 2);

        session.abandon();
        assert_eq!(session.retry_count(), 0);
        let texts: Vec<_> = session.history().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["hello"]);
        assert_eq!(session.stats().submissions, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_wait_resolves_after_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let raiser = {
            let flag = Arc::clone(&flag);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                flag.store(true, Ordering::Relaxed);
            })
        };

        let early = tokio::time::timeout(Duration::from_secs(1), wait_for_interrupt(&flag)).await;
        assert!(early.is_err());

        tokio::time::timeout(Duration::from_secs(10), wait_for_interrupt(&flag))
            .await
            .unwrap();
        raiser.await.unwrap();
    }
}
