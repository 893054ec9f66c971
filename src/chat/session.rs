//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the conversation,
//! the streaming preference and the exchange controller, and keeps per-session
//! statistics and transcripts.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_writer_pretty};
use time::OffsetDateTime;

use crate::Error;
use crate::chat::config::ChatConfig;
use crate::client_logger::ClientLogger;
use crate::completion::CompletionService;
use crate::conversation::ConversationStore;
use crate::error::Result;
use crate::exchange::{CompletionFailure, ExchangeController, ExchangeMode, Reply};
use crate::render::Renderer;
use crate::types::Message;

const TRANSCRIPT_VERSION: u8 = 1;

/// A chat session that manages conversation state and service interactions.
pub struct ChatSession<C: CompletionService> {
    controller: ExchangeController<C>,
    store: ConversationStore,
    config: ChatConfig,
    logger: Option<Arc<dyn ClientLogger>>,
    exchanges_committed: u64,
    exchanges_failed: u64,
    placeholder_replies: u64,
    fragments_received: u64,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// The model used for the session.
    pub model: String,
    /// The number of messages in the conversation, including the system message.
    pub message_count: usize,
    /// Whether replies are streamed.
    pub streaming: bool,
    /// The per-request timeout.
    pub timeout: Duration,
    /// The system prompt seeding the conversation.
    pub system_prompt: String,
    /// The auto-save transcript path, if set.
    pub transcript_path: Option<PathBuf>,
    /// Exchanges that committed a reply.
    pub exchanges_committed: u64,
    /// Exchanges that were rolled back.
    pub exchanges_failed: u64,
    /// Buffered replies replaced by the placeholder.
    pub placeholder_replies: u64,
    /// Streamed fragments that carried text.
    pub fragments_received: u64,
}

impl<C: CompletionService> ChatSession<C> {
    /// Creates a new chat session with the given service and configuration.
    pub fn new(service: C, config: ChatConfig) -> Self {
        let controller = ExchangeController::new(service, config.timeout);
        let store = ConversationStore::new(config.system_prompt.clone());
        Self {
            controller,
            store,
            config,
            logger: None,
            exchanges_committed: 0,
            exchanges_failed: 0,
            placeholder_replies: 0,
            fragments_received: 0,
        }
    }

    /// Reports every failed exchange to `logger`.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Sends a user message and acquires the reply.
    ///
    /// In streaming mode the reply is rendered as it arrives; a buffered
    /// reply is returned for the caller to display.  A committed reply is
    /// auto-saved to the transcript path when one is configured.  Blank input
    /// is not sent and yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns a [`CompletionFailure`] if the service fails.  The conversation
    /// is left exactly as it was before the call.
    pub async fn send(
        &mut self,
        user_input: &str,
        renderer: &mut dyn Renderer,
    ) -> std::result::Result<Option<Reply>, CompletionFailure> {
        let utterance = user_input.trim();
        if utterance.is_empty() {
            return Ok(None);
        }

        let mode = ExchangeMode::from_streaming(self.config.streaming);
        match self
            .controller
            .run_exchange(&mut self.store, utterance, mode, renderer)
            .await
        {
            Ok(reply) => {
                self.exchanges_committed += 1;
                self.fragments_received += reply.fragments as u64;
                if reply.placeholder {
                    self.placeholder_replies += 1;
                }
                if let Err(err) = self.auto_save_transcript() {
                    renderer.print_warning(&format!("Failed to save transcript: {err}"));
                }
                Ok(Some(reply))
            }
            Err(failure) => {
                self.exchanges_failed += 1;
                if let Some(logger) = &self.logger {
                    logger.log_failure(failure.error());
                }
                Err(failure)
            }
        }
    }

    /// Clears the conversation back to the configured system prompt.
    pub fn clear(&mut self) {
        self.store.reset();
    }

    /// Clears the conversation like [`ChatSession::clear`] and also zeroes
    /// the statistics.
    pub fn start_new(&mut self) {
        self.store.reset();
        self.exchanges_committed = 0;
        self.exchanges_failed = 0;
        self.placeholder_replies = 0;
        self.fragments_received = 0;
    }

    /// Turns streaming on or off.
    pub fn set_streaming(&mut self, streaming: bool) {
        self.config.streaming = streaming;
    }

    /// Flips the streaming setting and returns the new value.
    pub fn toggle_streaming(&mut self) -> bool {
        self.config.streaming = !self.config.streaming;
        self.config.streaming
    }

    /// Returns whether replies are streamed.
    pub fn is_streaming(&self) -> bool {
        self.config.streaming
    }

    /// Returns the current number of messages, including the system message.
    pub fn message_count(&self) -> usize {
        self.store.len()
    }

    /// Returns the conversation history.
    pub fn messages(&self) -> &[Message] {
        self.store.messages()
    }

    /// Returns the model name.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Returns the completion service.
    pub fn service(&self) -> &C {
        self.controller.service()
    }

    /// Sets the auto-save transcript path.
    pub fn set_transcript_path(&mut self, path: Option<PathBuf>) {
        self.config.transcript_path = path;
    }

    /// Returns the configured transcript path, if any.
    pub fn transcript_path(&self) -> Option<&Path> {
        self.config.transcript_path.as_deref()
    }

    /// Saves the transcript to the specified path.
    pub fn save_transcript_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let transcript = TranscriptFile::new(self.store.messages());
        let file = File::create(path.as_ref())
            .map_err(|err| Error::io("failed to create transcript file", err))?;
        let writer = BufWriter::new(file);
        to_writer_pretty(writer, &transcript).map_err(|err| {
            Error::serialization("failed to serialize transcript", Some(Box::new(err)))
        })
    }

    /// Loads a transcript from disk, replacing the current conversation.
    ///
    /// The transcript's system message heads the history until the next
    /// `clear`, which re-seeds the configured prompt.  On error
    /// the conversation is unchanged.
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
        self.store.replace(transcript.messages)
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            model: self.config.model.clone(),
            message_count: self.message_count(),
            streaming: self.config.streaming,
            timeout: self.controller.timeout(),
            system_prompt: self.store.system_prompt().to_string(),
            transcript_path: self.config.transcript_path.clone(),
            exchanges_committed: self.exchanges_committed,
            exchanges_failed: self.exchanges_failed,
            placeholder_replies: self.placeholder_replies,
            fragments_received: self.fragments_received,
        }
    }

    fn auto_save_transcript(&self) -> Result<()> {
        if let Some(path) = &self.config.transcript_path {
            self.save_transcript_to(path)
        } else {
            Ok(())
        }
    }
}

#[derive(Serialize, Deserialize)]
struct TranscriptFile {
    version: u8,
    #[serde(with = "crate::utils::time")]
    saved_at: OffsetDateTime,
    messages: Vec<Message>,
}

impl TranscriptFile {
    fn new(messages: &[Message]) -> Self {
        Self {
            version: TRANSCRIPT_VERSION,
            saved_at: OffsetDateTime::now_utc(),
            messages: messages.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{BufferedReply, Completion};
    use crate::types::Role;

    struct Echo;

    #[async_trait::async_trait]
    impl CompletionService for Echo {
        async fn complete(
            &self,
            history: &[Message],
            _streaming: bool,
            _timeout: Duration,
        ) -> Result<Completion> {
            let last = history.last().map(|m| m.content.clone());
            Ok(Completion::Buffered(BufferedReply::new(last)))
        }
    }

    struct Quiet;

    impl Renderer for Quiet {
        fn start_reply(&mut self) {}
        fn print_text(&mut self, _: &str) {}
        fn finish_response(&mut self) {}
        fn print_error(&mut self, _: &str) {}
        fn print_warning(&mut self, _: &str) {}
        fn print_info(&mut self, _: &str) {}
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("airchat-{}-{name}", std::process::id()))
    }

    #[test]
    fn new_session_is_seeded() {
        let session = ChatSession::new(Echo, ChatConfig::default());
        assert_eq!(session.message_count(), 1);
        assert_eq!(session.messages()[0].role, Role::System);
        assert!(!session.is_streaming());
    }

    #[tokio::test]
    async fn send_commits_reply() {
        let mut session = ChatSession::new(Echo, ChatConfig::default());
        let reply = session.send("  ping  ", &mut Quiet).await.unwrap().unwrap();
        assert_eq!(reply.content, "ping");
        assert_eq!(session.message_count(), 3);
        assert_eq!(session.stats().exchanges_committed, 1);
    }

    #[tokio::test]
    async fn blank_input_is_not_sent() {
        let mut session = ChatSession::new(Echo, ChatConfig::default());
        assert_eq!(session.send("   ", &mut Quiet).await.unwrap(), None);
        assert_eq!(session.message_count(), 1);
        let stats = session.stats();
        assert_eq!(stats.exchanges_committed, 0);
        assert_eq!(stats.exchanges_failed, 0);
    }

    #[tokio::test]
    async fn clear_and_start_new() {
        let mut session = ChatSession::new(Echo, ChatConfig::default());
        session.send("one", &mut Quiet).await.unwrap();
        session.clear();
        assert_eq!(session.message_count(), 1);
        assert_eq!(session.stats().exchanges_committed, 1);

        session.send("two", &mut Quiet).await.unwrap();
        session.start_new();
        assert_eq!(session.message_count(), 1);
        assert_eq!(session.stats().exchanges_committed, 0);
    }

    #[test]
    fn streaming_toggle() {
        let mut session = ChatSession::new(Echo, ChatConfig::default());
        assert!(session.toggle_streaming());
        assert!(session.is_streaming());
        session.set_streaming(false);
        assert!(!session.is_streaming());
    }

    #[tokio::test]
    async fn transcript_round_trip() {
        let path = temp_path("round-trip.json");
        let mut session = ChatSession::new(Echo, ChatConfig::default());
        session.send("remember me", &mut Quiet).await.unwrap();
        session.save_transcript_to(&path).unwrap();

        let config = ChatConfig::default().with_system_prompt("Something else.");
        let mut restored = ChatSession::new(Echo, config);
        restored.load_transcript_from(&path).unwrap();
        assert_eq!(restored.messages(), session.messages());

        restored.clear();
        assert_eq!(restored.messages(), &[Message::system("Something else.")]);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn clear_and_start_new_agree_after_load() {
        let path = temp_path("loaded-seed.json");
        std::fs::write(
            &path,
            r#"{"version":1,"saved_at":"2024-01-01T00:00:00Z","messages":[{"role":"system","content":"Loaded prompt"},{"role":"user","content":"hi"},{"role":"assistant","content":"hello"}]}"#,
        )
        .unwrap();

        let mut cleared = ChatSession::new(Echo, ChatConfig::default());
        let mut renewed = ChatSession::new(Echo, ChatConfig::default());
        cleared.load_transcript_from(&path).unwrap();
        renewed.load_transcript_from(&path).unwrap();
        assert_eq!(cleared.messages()[0].content, "Loaded prompt");

        cleared.clear();
        renewed.start_new();
        assert_eq!(cleared.messages(), renewed.messages());
        assert_eq!(
            cleared.messages(),
            &[Message::system(crate::chat::DEFAULT_SYSTEM_PROMPT)]
        );

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn load_rejects_transcript_without_seed() {
        let path = temp_path("no-seed.json");
        std::fs::write(
            &path,
            r#"{"version":1,"saved_at":"2024-01-01T00:00:00Z","messages":[{"role":"user","content":"hi"}]}"#,
        )
        .unwrap();

        let mut session = ChatSession::new(Echo, ChatConfig::default());
        let err = session.load_transcript_from(&path).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(session.message_count(), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn load_rejects_unknown_version() {
        let path = temp_path("version.json");
        std::fs::write(
            &path,
            r#"{"version":2,"saved_at":"2024-01-01T00:00:00Z","messages":[{"role":"system","content":"s"}]}"#,
        )
        .unwrap();

        let mut session = ChatSession::new(Echo, ChatConfig::default());
        assert!(session.load_transcript_from(&path).unwrap_err().is_validation());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn auto_save_after_reply() {
        let path = temp_path("auto.json");
        let config = ChatConfig::default().with_transcript_path(Some(path.clone()));
        let mut session = ChatSession::new(Echo, config);
        session.send("hello", &mut Quiet).await.unwrap();

        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(saved.contains("\"hello\""));
        assert!(saved.contains("\"version\": 1"));

        let _ = std::fs::remove_file(&path);
    }
}
