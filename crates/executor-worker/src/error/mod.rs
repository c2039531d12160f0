//! Domain errors raised by worker operations.
//!
//! All errors use `thiserror`-derived enums with structured context so the
//! dispatcher can classify a failure without parsing its message. I/O errors
//! are wrapped in `Arc` to satisfy the `result_large_err` Clippy lint.

use std::sync::Arc;

use thiserror::Error;

/// Errors arising from worker operations.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The worker process could not be started.
    #[error("worker '{program}' failed to start: {message}")]
    SpawnFailed {
        /// Program that was launched.
        program: String,
        /// Human-readable failure description.
        message: String,
        /// Optional underlying I/O error.
        #[source]
        source: Option<Arc<std::io::Error>>,
    },

    /// An I/O error occurred while talking to the worker process.
    #[error("I/O error communicating with worker: {source}")]
    Io {
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A command could not be serialised for the worker.
    #[error("failed to serialise worker command: {0}")]
    SerializeCommand(#[source] serde_json::Error),

    /// The worker wrote a line that does not follow the protocol.
    #[error("worker wrote invalid reply: {message}")]
    InvalidReply {
        /// Description of the protocol violation.
        message: String,
        /// Optional underlying JSON error.
        #[source]
        source: Option<serde_json::Error>,
    },

    /// The worker process went away mid-exchange.
    #[error("worker process exited unexpectedly")]
    ChildExited,

    /// The worker did not answer within the configured bound.
    #[error("worker timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },

    /// The requested function does not exist in the target file.
    #[error("function '{fcn}' not found in '{file}'")]
    FunctionMissing {
        /// File that was searched.
        file: String,
        /// Function that was requested.
        fcn: String,
    },

    /// The function ran and failed.
    #[error("{message}")]
    CallFailed {
        /// Failure text reported by the worker, usually a traceback.
        message: String,
        /// Output printed before the failure.
        output: Option<String>,
    },

    /// The worker refused a non-call command.
    #[error("worker rejected {command}: {message}")]
    Rejected {
        /// Command kind that was refused.
        command: &'static str,
        /// Reason reported by the worker.
        message: String,
    },
}

impl WorkerError {
    /// Wraps an I/O error raised while exchanging messages.
    #[must_use]
    pub fn io(source: std::io::Error) -> Self {
        Self::Io {
            source: Arc::new(source),
        }
    }

    /// Builds a spawn failure for `program` from an I/O error.
    #[must_use]
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::SpawnFailed {
            program: program.into(),
            message: source.to_string(),
            source: Some(Arc::new(source)),
        }
    }

    /// Returns true when the named function was not found.
    #[must_use]
    pub const fn is_function_missing(&self) -> bool {
        matches!(self, Self::FunctionMissing { .. })
    }

    /// Output the worker captured before failing, if any.
    #[must_use]
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            Self::CallFailed { output, .. } => output.as_deref(),
            _ => None,
        }
    }

    /// Whether the child that produced this error can no longer be trusted.
    ///
    /// Transport failures leave the reply stream out of step with the
    /// commands, so the child is torn down and respawned on next use.
    #[must_use]
    pub const fn poisons_child(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::InvalidReply { .. } | Self::ChildExited | Self::Timeout { .. }
        )
    }
}
