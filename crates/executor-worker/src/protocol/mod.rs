//! Message types exchanged with worker processes.
//!
//! [`CallRequest`] and [`CallOutput`] are the values the dispatcher hands to
//! and receives from any [`WorkerHandle`](crate::WorkerHandle). The
//! [`ChildCommand`] and [`ChildReply`] types form the JSONL protocol spoken
//! by [`ProcessWorker`](crate::ProcessWorker) with its child interpreter: one
//! command line on stdin is answered by one reply line on stdout.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A function call to run inside the worker.
///
/// Every field except `fcn` defaults to empty so control messages may omit
/// them.
///
/// # Example
///
/// ```
/// use executor_worker::CallRequest;
///
/// let request = CallRequest::new("question", "q1", "server", "generate", vec![]);
/// assert_eq!(request.fcn(), "generate");
/// assert_eq!(request.call_type(), "question");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallRequest {
    #[serde(rename = "type", default)]
    call_type: String,
    #[serde(default)]
    directory: String,
    #[serde(default)]
    file: String,
    fcn: String,
    #[serde(default)]
    args: Vec<Value>,
}

impl CallRequest {
    /// Creates a call request.
    #[must_use]
    pub fn new(
        call_type: impl Into<String>,
        directory: impl Into<String>,
        file: impl Into<String>,
        fcn: impl Into<String>,
        args: Vec<Value>,
    ) -> Self {
        Self {
            call_type: call_type.into(),
            directory: directory.into(),
            file: file.into(),
            fcn: fcn.into(),
            args,
        }
    }

    /// Execution context of the call, opaque to the executor.
    #[must_use]
    pub const fn call_type(&self) -> &str {
        self.call_type.as_str()
    }

    /// Directory holding the callable code.
    #[must_use]
    pub const fn directory(&self) -> &str {
        self.directory.as_str()
    }

    /// File holding the callable code.
    #[must_use]
    pub const fn file(&self) -> &str {
        self.file.as_str()
    }

    /// Function name.
    #[must_use]
    pub const fn fcn(&self) -> &str {
        self.fcn.as_str()
    }

    /// Positional arguments.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }
}

/// Result of a successful call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutput {
    data: Value,
    output: Option<String>,
}

impl CallOutput {
    /// Creates a call output.
    #[must_use]
    pub const fn new(data: Value, output: Option<String>) -> Self {
        Self { data, output }
    }

    /// Value returned by the function.
    #[must_use]
    pub const fn data(&self) -> &Value {
        &self.data
    }

    /// Text printed while the function ran.
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    /// Splits the output into its parts.
    #[must_use]
    pub fn into_parts(self) -> (Value, Option<String>) {
        (self.data, self.output)
    }
}

/// Command written to a worker child on stdin.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChildCommand<'a> {
    /// Point the child at a course checkout.
    Prepare {
        /// Root of the course checkout.
        course_root: &'a Path,
    },
    /// Run a function.
    Call(&'a CallRequest),
    /// Drop cached modules and return to a clean state.
    Restart,
}

impl ChildCommand<'_> {
    /// Short name used in logs and errors.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Prepare { .. } => "prepare",
            Self::Call(_) => "call",
            Self::Restart => "restart",
        }
    }
}

/// Reply read from a worker child on stdout.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChildReply {
    /// The command succeeded.
    #[serde(rename = "ok")]
    Success {
        /// Return value, `null` for non-call commands.
        #[serde(default)]
        data: Value,
        /// Captured printed output.
        #[serde(default)]
        output: Option<String>,
    },
    /// The requested function does not exist.
    FunctionMissing,
    /// The command failed.
    Error {
        /// Failure description.
        message: String,
        /// Output printed before the failure.
        #[serde(default)]
        output: Option<String>,
    },
}
