use serde::{Deserialize, Serialize};

use crate::types::Message;

/// Request body for the chat completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionParams {
    /// The model that will complete the conversation.
    pub model: String,

    /// The conversation so far, seed system message first.
    pub messages: Vec<Message>,

    /// Whether to stream the reply as server-sent events.
    #[serde(default)]
    pub stream: bool,
}

impl ChatCompletionParams {
    /// Create buffered request parameters.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: false,
        }
    }

    /// Switch the request to streaming mode.
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}
