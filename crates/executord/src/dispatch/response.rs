//! Response serialisation helpers for the dispatch loop.
//!
//! Every accepted request is answered with exactly one
//! [`ExecutionResponse`] line. Absent fields are omitted from the JSON rather
//! than written as `null`.

use std::io::Write;

use executor_worker::{CallOutput, WorkerError};
use serde::Serialize;
use serde_json::Value;

use super::errors::DispatchError;

/// Payload reported for every restart request, whatever its outcome.
pub const RESTART_ACKNOWLEDGEMENT: &str = "success";

/// Fallback text for failures that carry no message of their own.
const UNDESCRIBED_FAILURE: &str = "function call failed";

/// One response line.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_missing: Option<bool>,
}

impl ExecutionResponse {
    /// Response sent for a restart request.
    #[must_use]
    pub fn restart_acknowledged() -> Self {
        Self {
            data: Some(Value::from(RESTART_ACKNOWLEDGEMENT)),
            ..Self::default()
        }
    }

    /// Translates a worker call result into a response.
    ///
    /// A missing function is reported through `functionMissing` alone; any
    /// other failure becomes a non-empty `error` string.
    #[must_use]
    pub fn from_call(result: Result<CallOutput, WorkerError>) -> Self {
        match result {
            Ok(call_output) => {
                let (data, output) = call_output.into_parts();
                Self {
                    data: Some(data),
                    output,
                    ..Self::default()
                }
            }
            Err(failure) if failure.is_function_missing() => Self {
                function_missing: Some(true),
                ..Self::default()
            },
            Err(failure) => {
                let message = failure.to_string();
                Self {
                    error: Some(if message.trim().is_empty() {
                        String::from(UNDESCRIBED_FAILURE)
                    } else {
                        message
                    }),
                    output: failure.captured_output().map(str::to_owned),
                    ..Self::default()
                }
            }
        }
    }

    /// Failure message, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returned value, if any.
    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Captured output, if any.
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    /// Whether the function was reported missing.
    #[must_use]
    pub fn function_missing(&self) -> bool {
        self.function_missing.unwrap_or(false)
    }
}

/// Writer that frames responses as JSONL on an output stream.
#[derive(Debug)]
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Creates a response writer wrapping the given output stream.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes one response line and flushes it.
    ///
    /// The line is assembled before writing so a response is never
    /// interleaved with anything else on the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation, writing, or flushing fails.
    pub fn write_response(&mut self, response: &ExecutionResponse) -> Result<(), DispatchError> {
        let mut line = serde_json::to_vec(response).map_err(DispatchError::SerializeResponse)?;
        line.push(b'\n');
        self.writer.write_all(&line)?;
        self.writer.flush()?;
        Ok(())
    }
}
