//! The completion capability consumed by the exchange layer.
//!
//! A [`CompletionService`] maps a conversation history to either one buffered
//! reply or a single-pass stream of reply fragments.  How the service is
//! reached is its own business; [`crate::Refinery`] is the HTTP implementation.

use std::pin::Pin;
use std::time::Duration;

use futures::Stream;

use crate::error::Result;
use crate::types::Message;

/// One incremental piece of a streamed reply.
///
/// A fragment without content is skipped by the accumulator; it is neither
/// displayed nor an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    /// The text carried by this fragment, if any.
    pub content: Option<String>,
}

impl Fragment {
    /// A fragment carrying text.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
        }
    }

    /// A fragment carrying nothing.
    pub fn empty() -> Self {
        Self { content: None }
    }
}

/// A complete, buffered reply.  `None` means the far end produced no text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferedReply {
    /// The reply text.
    pub text: Option<String>,
}

impl BufferedReply {
    /// A buffered reply carrying `text`.
    pub fn new(text: impl Into<Option<String>>) -> Self {
        Self { text: text.into() }
    }
}

/// A lazy, finite, single-pass sequence of fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment>> + Send>>;

/// What a completion service hands back.
pub enum Completion {
    /// The whole reply in one unit.
    Buffered(BufferedReply),
    /// The reply as it is generated.
    Streamed(FragmentStream),
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Completion::Buffered(reply) => f.debug_tuple("Buffered").field(reply).finish(),
            Completion::Streamed(_) => f.write_str("Streamed(..)"),
        }
    }
}

/// A service that completes conversations.
///
/// Implementations report every fault (connection, timeout, malformed
/// response) as an [`Error`](crate::Error); callers need not distinguish them.
#[async_trait::async_trait]
pub trait CompletionService: Send + Sync {
    /// Completes `history`, buffered or streamed according to `streaming`.
    ///
    /// `timeout` bounds how long the service may take to start answering.
    async fn complete(
        &self,
        history: &[Message],
        streaming: bool,
        timeout: Duration,
    ) -> Result<Completion>;
}

#[async_trait::async_trait]
impl<S: CompletionService + ?Sized> CompletionService for std::sync::Arc<S> {
    async fn complete(
        &self,
        history: &[Message],
        streaming: bool,
        timeout: Duration,
    ) -> Result<Completion> {
        (**self).complete(history, streaming, timeout).await
    }
}

#[async_trait::async_trait]
impl<S: CompletionService + ?Sized> CompletionService for Box<S> {
    async fn complete(
        &self,
        history: &[Message],
        streaming: bool,
        timeout: Duration,
    ) -> Result<Completion> {
        (**self).complete(history, streaming, timeout).await
    }
}
