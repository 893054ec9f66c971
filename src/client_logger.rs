//! Logging hooks for completion traffic.
//!
//! This module provides the [`ClientLogger`] trait that lets callers capture
//! everything passing through the [`Refinery`](crate::Refinery) client, plus
//! exchange failures reported by the chat session.  [`JsonlLogger`] writes each
//! record as one JSON object per line.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::{Error, Result};
use crate::types::{ChatCompletion, ChatCompletionChunk};

/// A trait for logging completion traffic.
///
/// # Example
///
/// ```rust,ignore
/// use airchat::{ChatCompletion, ChatCompletionChunk, ClientLogger, Error};
///
/// struct StderrLogger;
///
/// impl ClientLogger for StderrLogger {
///     fn log_response(&self, completion: &ChatCompletion) {
///         eprintln!("response: {:?}", completion.text());
///     }
///
///     fn log_stream_chunk(&self, chunk: &ChatCompletionChunk) {
///         eprintln!("chunk: {:?}", chunk.content());
///     }
///
///     fn log_failure(&self, error: &Error) {
///         eprintln!("failure: {error}");
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log a complete buffered response.
    fn log_response(&self, completion: &ChatCompletion);

    /// Log an individual streamed chunk, in arrival order.
    fn log_stream_chunk(&self, chunk: &ChatCompletionChunk);

    /// Log an exchange that failed and was rolled back.
    fn log_failure(&self, error: &Error);
}

/// A [`ClientLogger`] that appends JSON lines to a file.
///
/// Each line is an object with `at` (RFC 3339), `kind` (`response`, `chunk`
/// or `failure`) and a kind-specific payload.  Write errors are swallowed so
/// that logging can never break a conversation.
pub struct JsonlLogger {
    out: Mutex<BufWriter<File>>,
}

impl JsonlLogger {
    /// Opens `path` for appending, creating it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .map_err(|err| Error::io("failed to open log file", err))?;
        Ok(Self {
            out: Mutex::new(BufWriter::new(file)),
        })
    }

    fn write_record(&self, kind: &str, payload: Value) {
        let at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        let record = json!({"at": at, "kind": kind, "payload": payload});
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{record}");
            let _ = out.flush();
        }
    }
}

impl ClientLogger for JsonlLogger {
    fn log_response(&self, completion: &ChatCompletion) {
        self.write_record(
            "response",
            serde_json::to_value(completion).unwrap_or(Value::Null),
        );
    }

    fn log_stream_chunk(&self, chunk: &ChatCompletionChunk) {
        self.write_record(
            "chunk",
            serde_json::to_value(chunk).unwrap_or(Value::Null),
        );
    }

    fn log_failure(&self, error: &Error) {
        self.write_record("failure", json!({"message": error.to_string()}));
    }
}
