//! Configuration types for the chat application.
//!
//! Settings are layered, later layers winning: built-in defaults, an optional
//! YAML file (`--config`), the `AIR_*` environment variables, and finally the
//! command-line flags parsed via `arrrg`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::{Deserialize, Serialize};

use crate::client::{API_KEY_ENV, DEFAULT_MODEL};
use crate::error::{Error, Result};

/// Default system prompt seeded into every conversation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful, respectful, and honest assistant.";

/// Default per-request timeout, in seconds.
const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// Environment variable overriding the service root.
pub const BASE_URL_ENV: &str = "AIR_BASE_URL";

/// Environment variable overriding the model.
pub const MODEL_ENV: &str = "AIR_MODEL";

/// Command-line arguments for the airchat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// API key; falls back to AIR_API_KEY.
    #[arrrg(optional, "API key (default: $AIR_API_KEY)", "KEY")]
    pub api_key: Option<String>,

    /// Service root URL.
    #[arrrg(optional, "Service root URL (default: $AIR_BASE_URL)", "URL")]
    pub base_url: Option<String>,

    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: $AIR_MODEL)", "MODEL")]
    pub model: Option<String>,

    /// System prompt to set context for the conversation.
    #[arrrg(optional, "System prompt for the conversation", "PROMPT")]
    pub system: Option<String>,

    /// Timeout for each request, in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECONDS")]
    pub timeout: Option<u32>,

    /// Start with streaming enabled.
    #[arrrg(flag, "Start with streaming responses enabled")]
    pub stream: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Auto-save transcript path.
    #[arrrg(optional, "Save the transcript to FILE after every reply", "FILE")]
    pub transcript: Option<String>,

    /// JSON-lines traffic log path.
    #[arrrg(optional, "Append a JSON-lines traffic log to FILE", "FILE")]
    pub log_file: Option<String>,

    /// YAML configuration file.
    #[arrrg(optional, "Read settings from a YAML file", "FILE")]
    pub config: Option<String>,
}

/// Settings read from a YAML configuration file.
///
/// Every field is optional; absent fields leave the lower layer untouched.
///
/// ```yaml
/// model: meta-llama/Llama-4-Maverick-17B-128E-Instruct
/// system_prompt: You are a terse assistant.
/// timeout_seconds: 30
/// streaming: true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Service root URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Model name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// System prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    /// Start with streaming enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streaming: Option<bool>,
    /// Use ANSI colors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,
    /// Auto-save transcript path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<PathBuf>,
    /// JSON-lines traffic log path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl ConfigFile {
    /// Parses a configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Loads a configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|err| {
            Error::io(
                format!("failed to read config file {}", path.display()),
                err,
            )
        })?;
        Self::from_yaml(&content)
    }
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after layering the
/// config file, environment and command line over the defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Explicit API key; `None` lets the client read AIR_API_KEY.
    pub api_key: Option<String>,

    /// Service root URL; `None` uses the client default.
    pub base_url: Option<String>,

    /// The model to use for generating responses.
    pub model: String,

    /// System prompt seeded at position 0 of every conversation.
    pub system_prompt: String,

    /// Timeout for each request and for each wait on a streamed fragment.
    pub timeout: Duration,

    /// Whether the session starts in streaming mode.
    pub streaming: bool,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Path to persist transcripts automatically after each reply.
    pub transcript_path: Option<PathBuf>,

    /// Path of the JSON-lines traffic log.
    pub log_path: Option<PathBuf>,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: meta-llama/Llama-4-Maverick-17B-128E-Instruct
    /// - Timeout: 60 seconds
    /// - Streaming: off
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            streaming: false,
            use_color: true,
            transcript_path: None,
            log_path: None,
        }
    }

    /// Resolves the full configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Fails if the config file cannot be read or parsed, or if the resulting
    /// timeout is zero.
    pub fn load(args: &ChatArgs) -> Result<Self> {
        let file = match &args.config {
            Some(path) => Some(ConfigFile::from_file(path)?),
            None => None,
        };
        Self::layered(args, file.as_ref(), |name| std::env::var(name).ok())
    }

    /// Layers `file`, the variables visible through `env`, and `args` over the
    /// defaults.
    pub fn layered<F>(args: &ChatArgs, file: Option<&ConfigFile>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();
        if let Some(file) = file {
            config = config.apply_file(file);
        }
        config = config.apply_env(env).apply_args(args);
        if config.timeout.is_zero() {
            return Err(Error::configuration("timeout must be at least one second"));
        }
        Ok(config)
    }

    fn apply_file(mut self, file: &ConfigFile) -> Self {
        if let Some(api_key) = &file.api_key {
            self.api_key = Some(api_key.clone());
        }
        if let Some(base_url) = &file.base_url {
            self.base_url = Some(base_url.clone());
        }
        if let Some(model) = &file.model {
            self.model = model.clone();
        }
        if let Some(prompt) = &file.system_prompt {
            self.system_prompt = prompt.clone();
        }
        if let Some(seconds) = file.timeout_seconds {
            self.timeout = Duration::from_secs(seconds);
        }
        if let Some(streaming) = file.streaming {
            self.streaming = streaming;
        }
        if let Some(color) = file.color {
            self.use_color = color;
        }
        if let Some(path) = &file.transcript {
            self.transcript_path = Some(path.clone());
        }
        if let Some(path) = &file.log_file {
            self.log_path = Some(path.clone());
        }
        self
    }

    fn apply_env<F>(mut self, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| env(name).filter(|value| !value.trim().is_empty());
        if let Some(api_key) = non_empty(API_KEY_ENV) {
            self.api_key = Some(api_key);
        }
        if let Some(base_url) = non_empty(BASE_URL_ENV) {
            self.base_url = Some(base_url);
        }
        if let Some(model) = non_empty(MODEL_ENV) {
            self.model = model;
        }
        self
    }

    fn apply_args(mut self, args: &ChatArgs) -> Self {
        if let Some(api_key) = &args.api_key {
            self.api_key = Some(api_key.clone());
        }
        if let Some(base_url) = &args.base_url {
            self.base_url = Some(base_url.clone());
        }
        if let Some(model) = &args.model {
            self.model = model.clone();
        }
        if let Some(prompt) = &args.system {
            self.system_prompt = prompt.clone();
        }
        if let Some(seconds) = args.timeout {
            self.timeout = Duration::from_secs(u64::from(seconds));
        }
        if args.stream {
            self.streaming = true;
        }
        if args.no_color {
            self.use_color = false;
        }
        if let Some(path) = &args.transcript {
            self.transcript_path = Some(PathBuf::from(path));
        }
        if let Some(path) = &args.log_file {
            self.log_path = Some(PathBuf::from(path));
        }
        self
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets whether the session starts in streaming mode.
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
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
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}
