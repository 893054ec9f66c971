//! One request/response cycle against a completion service.
//!
//! [`ExchangeController::run_exchange`] appends the user's utterance, asks the
//! service for a reply, and either commits the assistant's answer or rolls
//! the utterance back.  After it returns the history has grown by exactly
//! `[user, assistant]` or is exactly what it was before the call.

use std::time::{Duration, Instant};

use futures::StreamExt;

use crate::completion::{BufferedReply, Completion, CompletionService, Fragment, FragmentStream};
use crate::conversation::ConversationStore;
use crate::error::{Error, Result};
use crate::observability::{
    EXCHANGE_COMMITTED, EXCHANGE_DURATION, EXCHANGE_FRAGMENTS, EXCHANGE_PLACEHOLDERS,
    EXCHANGE_ROLLED_BACK,
};
use crate::render::Renderer;
use crate::types::Message;

/// Committed in place of a buffered reply that carried no text.
pub const EMPTY_REPLY_PLACEHOLDER: &str = "(No response generated)";

/// How the reply is acquired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExchangeMode {
    /// Wait for the whole reply, then display it.
    #[default]
    Buffered,
    /// Display the reply fragment by fragment as it is generated.
    Streamed,
}

impl ExchangeMode {
    /// Maps the session's streaming flag to a mode.
    pub fn from_streaming(streaming: bool) -> Self {
        if streaming {
            ExchangeMode::Streamed
        } else {
            ExchangeMode::Buffered
        }
    }

    /// True for [`ExchangeMode::Streamed`].
    pub fn is_streamed(&self) -> bool {
        matches!(self, ExchangeMode::Streamed)
    }
}

/// The assistant reply committed by a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// The committed assistant content.
    pub content: String,
    /// How the reply was acquired.  A streamed reply has already been shown.
    pub mode: ExchangeMode,
    /// True when the service produced no text and the placeholder was used.
    pub placeholder: bool,
    /// Number of non-null fragments received; zero for buffered replies.
    pub fragments: usize,
}

/// The completion service could not produce a reply.
///
/// The exchange that produced this has already been rolled back.
#[derive(Debug, Clone)]
pub struct CompletionFailure {
    error: Error,
}

impl CompletionFailure {
    /// Wraps the underlying fault.
    pub fn new(error: Error) -> Self {
        Self { error }
    }

    /// The underlying fault.
    pub fn error(&self) -> &Error {
        &self.error
    }

    /// Consumes the failure, returning the underlying fault.
    pub fn into_error(self) -> Error {
        self.error
    }
}

impl std::fmt::Display for CompletionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for CompletionFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<Error> for CompletionFailure {
    fn from(error: Error) -> Self {
        Self::new(error)
    }
}

/// Concatenates streamed fragments in arrival order.
#[derive(Debug, Default)]
pub struct StreamingAccumulator {
    buffer: String,
    fragments: usize,
}

impl StreamingAccumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a fragment and returns the text it contributed.
    ///
    /// Fragments without content are skipped and return `None`.
    pub fn push(&mut self, fragment: Fragment) -> Option<&str> {
        let text = fragment.content?;
        let start = self.buffer.len();
        self.buffer.push_str(&text);
        self.fragments += 1;
        Some(&self.buffer[start..])
    }

    /// Everything accumulated so far.
    pub fn content(&self) -> &str {
        &self.buffer
    }

    /// Number of fragments that carried content.
    pub fn fragments(&self) -> usize {
        self.fragments
    }

    /// Consumes the accumulator, returning the full reply.
    pub fn finish(self) -> String {
        self.buffer
    }
}

/// Drives exchanges against a completion service.
pub struct ExchangeController<C> {
    service: C,
    timeout: Duration,
}

impl<C: CompletionService> ExchangeController<C> {
    /// Creates a controller that gives the service `timeout` to start
    /// answering and, when streaming, to deliver each next fragment.
    pub fn new(service: C, timeout: Duration) -> Self {
        Self { service, timeout }
    }

    /// The completion service.
    pub fn service(&self) -> &C {
        &self.service
    }

    /// The per-invocation timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Changes the per-invocation timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Runs one exchange.
    ///
    /// `utterance` must already be trimmed and non-empty.  Streamed fragments
    /// are forwarded to `renderer` as they arrive; a buffered reply is only
    /// returned, for the caller to display.
    ///
    /// # Errors
    ///
    /// Returns a [`CompletionFailure`] if the service faults or times out at
    /// any point.  The user message is rolled back before returning, so the
    /// history is exactly what it was before the call.
    pub async fn run_exchange(
        &self,
        store: &mut ConversationStore,
        utterance: &str,
        mode: ExchangeMode,
        renderer: &mut dyn Renderer,
    ) -> std::result::Result<Reply, CompletionFailure> {
        let start = Instant::now();
        store.append(Message::user(utterance));

        let outcome = self.acquire(store.snapshot(), mode, renderer).await;
        EXCHANGE_DURATION.add(start.elapsed().as_secs_f64());

        match outcome {
            Ok(reply) => {
                store.append(Message::assistant(reply.content.clone()));
                EXCHANGE_COMMITTED.click();
                Ok(reply)
            }
            Err(err) => {
                store.rollback_last();
                EXCHANGE_ROLLED_BACK.click();
                Err(CompletionFailure::new(err))
            }
        }
    }

    async fn acquire(
        &self,
        history: Vec<Message>,
        mode: ExchangeMode,
        renderer: &mut dyn Renderer,
    ) -> Result<Reply> {
        let completion = tokio::time::timeout(
            self.timeout,
            self.service
                .complete(&history, mode.is_streamed(), self.timeout),
        )
        .await
        .map_err(|_| {
            Error::timeout(
                "the completion service did not answer in time",
                Some(self.timeout.as_secs_f64()),
            )
        })??;

        match completion {
            Completion::Buffered(reply) => Ok(settle_buffered(reply)),
            Completion::Streamed(fragments) => self.drain(fragments, renderer).await,
        }
    }

    async fn drain(
        &self,
        mut fragments: FragmentStream,
        renderer: &mut dyn Renderer,
    ) -> Result<Reply> {
        let mut accumulator = StreamingAccumulator::new();
        renderer.start_reply();
        loop {
            let next = match tokio::time::timeout(self.timeout, fragments.next()).await {
                Ok(next) => next,
                Err(_) => {
                    renderer.finish_response();
                    return Err(Error::timeout(
                        "the reply stream stalled",
                        Some(self.timeout.as_secs_f64()),
                    ));
                }
            };
            match next {
                Some(Ok(fragment)) => {
                    if let Some(text) = accumulator.push(fragment)
                        && !text.is_empty()
                    {
                        renderer.print_text(text);
                    }
                }
                Some(Err(err)) => {
                    renderer.finish_response();
                    return Err(err);
                }
                None => break,
            }
        }
        renderer.finish_response();

        let fragments = accumulator.fragments();
        EXCHANGE_FRAGMENTS.count(fragments as u64);
        Ok(Reply {
            content: accumulator.finish(),
            mode: ExchangeMode::Streamed,
            placeholder: false,
            fragments,
        })
    }
}

/// Trims a buffered reply, substituting the placeholder when it is empty.
fn settle_buffered(reply: BufferedReply) -> Reply {
    match reply.text.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Reply {
            content: text.to_string(),
            mode: ExchangeMode::Buffered,
            placeholder: false,
            fragments: 0,
        },
        _ => {
            EXCHANGE_PLACEHOLDERS.click();
            Reply {
                content: EMPTY_REPLY_PLACEHOLDER.to_string(),
                mode: ExchangeMode::Buffered,
                placeholder: true,
                fragments: 0,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulator_concatenates_in_order() {
        let mut acc = StreamingAccumulator::new();
        assert_eq!(acc.push(Fragment::text("He")), Some("He"));
        assert_eq!(acc.push(Fragment::empty()), None);
        assert_eq!(acc.push(Fragment::text("llo")), Some("llo"));
        assert_eq!(acc.push(Fragment::text("!")), Some("!"));
        assert_eq!(acc.content(), "Hello!");
        assert_eq!(acc.fragments(), 3);
        assert_eq!(acc.finish(), "Hello!");
    }

    #[test]
    fn accumulator_empty_stream() {
        let acc = StreamingAccumulator::new();
        assert_eq!(acc.fragments(), 0);
        assert_eq!(acc.finish(), "");
    }

    #[test]
    fn buffered_reply_is_trimmed() {
        let reply = settle_buffered(BufferedReply::new(Some("  hi there\n".to_string())));
        assert_eq!(reply.content, "hi there");
        assert!(!reply.placeholder);
        assert_eq!(reply.mode, ExchangeMode::Buffered);
    }

    #[test]
    fn buffered_empty_reply_uses_placeholder() {
        for text in [None, Some(String::new()), Some("  \n".to_string())] {
            let reply = settle_buffered(BufferedReply::new(text));
            assert_eq!(reply.content, EMPTY_REPLY_PLACEHOLDER);
            assert!(reply.placeholder);
        }
    }

    #[test]
    fn mode_from_flag() {
        assert_eq!(ExchangeMode::from_streaming(true), ExchangeMode::Streamed);
        assert_eq!(ExchangeMode::from_streaming(false), ExchangeMode::Buffered);
        assert!(!ExchangeMode::default().is_streamed());
    }

    #[test]
    fn failure_exposes_cause() {
        let failure = CompletionFailure::from(Error::connection("refused", None));
        assert!(failure.error().is_connection());
        assert_eq!(failure.to_string(), "Connection error: refused");
        assert!(std::error::Error::source(&failure).is_some());
    }
}
