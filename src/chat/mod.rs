//! Interactive chat front end built on the exchange core.
//!
//! This module turns lines typed at a prompt into exchanges against a
//! [`CompletionService`](crate::CompletionService). It supports:
//!
//! - Buffered or streamed replies, switchable at runtime
//! - Bare and slash commands for session control
//! - Layered configuration from defaults, YAML, environment and flags
//! - JSON transcripts that can be saved and loaded
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration layering
//! - [`session`]: conversation ownership, statistics and transcripts
//! - [`commands`]: command parsing

mod commands;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{
    BASE_URL_ENV, ChatArgs, ChatConfig, ConfigFile, DEFAULT_SYSTEM_PROMPT, MODEL_ENV,
};
pub use session::{ChatSession, SessionStats};
