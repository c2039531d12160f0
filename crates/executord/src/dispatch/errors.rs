//! Error types for request dispatch failures.
//!
//! Only stream failures are fatal. Everything else is logged and the loop
//! keeps reading input.

use std::io;

use thiserror::Error;

/// Errors surfaced while reading, handling, or answering a request line.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Request line could not be parsed as a request.
    #[error("malformed request: {message}")]
    MalformedRequest {
        /// Description of the parse failure.
        message: String,
        /// Underlying JSON error, when there is one.
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Reading input or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Response serialisation failed.
    #[error("failed to serialise response: {0}")]
    SerializeResponse(#[source] serde_json::Error),

    /// The dispatcher thread is gone, so accepted lines can no longer be
    /// handled.
    #[error("dispatcher thread stopped")]
    DispatcherStopped,
}

impl DispatchError {
    /// Returns true when the loop cannot continue after this error.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Io(_) | Self::DispatcherStopped)
    }

    /// Creates a malformed request error from a serde error.
    #[must_use]
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::MalformedRequest {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a malformed request error with a custom message.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRequest {
            message: message.into(),
            source: None,
        }
    }
}
