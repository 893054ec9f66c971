//! A terminal chat client for OpenAI-compatible chat completion services.
//!
//! The core is small: a [`ConversationStore`] owns the history, and an
//! [`ExchangeController`] runs one request/response cycle against any
//! [`CompletionService`], committing the reply or rolling the user's message
//! back.  [`Refinery`] is the HTTP implementation of the service, and
//! [`chat`] wraps everything in an interactive session.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use airchat::{
//!     BufferedReply, Completion, CompletionService, ConversationStore, ExchangeController,
//!     ExchangeMode, Message, PlainTextRenderer, Result,
//! };
//!
//! struct Canned;
//!
//! #[async_trait::async_trait]
//! impl CompletionService for Canned {
//!     async fn complete(&self, _: &[Message], _: bool, _: Duration) -> Result<Completion> {
//!         Ok(Completion::Buffered(BufferedReply::new(Some("Hi!".to_string()))))
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let controller = ExchangeController::new(Canned, Duration::from_secs(60));
//! let mut store = ConversationStore::new("You are terse.");
//! let mut renderer = PlainTextRenderer::new();
//! let reply = controller
//!     .run_exchange(&mut store, "Hello", ExchangeMode::Buffered, &mut renderer)
//!     .await
//!     .unwrap();
//! assert_eq!(reply.content, "Hi!");
//! assert_eq!(store.len(), 3);
//! # });
//! ```

// Public modules
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod completion;
pub mod conversation;
pub mod error;
pub mod exchange;
pub mod observability;
pub mod render;
pub mod sse;
pub mod types;
pub mod utils;

// Re-exports
pub use client::Refinery;
pub use client_logger::{ClientLogger, JsonlLogger};
pub use completion::{BufferedReply, Completion, CompletionService, Fragment, FragmentStream};
pub use conversation::ConversationStore;
pub use error::{Error, Result};
pub use exchange::{
    CompletionFailure, EMPTY_REPLY_PLACEHOLDER, ExchangeController, ExchangeMode, Reply,
    StreamingAccumulator,
};
pub use observability::register_biometrics;
pub use render::{PlainTextRenderer, Renderer};
pub use types::*;
