//! Request deserialisation for the dispatch loop.

use executor_worker::CallRequest;

use super::errors::DispatchError;

/// Function name reserved for worker restart requests.
pub const RESTART_FCN: &str = "restart";

/// A parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionRequest {
    /// Recover the worker; never forwarded as a call.
    Restart,
    /// Run a function in the worker.
    Call(CallRequest),
}

impl ExecutionRequest {
    /// Parses one JSONL line.
    ///
    /// Surrounding whitespace, including the newline delimiter, is ignored.
    /// Only `fcn` is required; the remaining fields default to empty.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::MalformedRequest` if the line is blank or is
    /// not a JSON request object.
    pub fn parse(line: &[u8]) -> Result<Self, DispatchError> {
        let trimmed = line.trim_ascii();
        if trimmed.is_empty() {
            return Err(DispatchError::malformed("empty request line"));
        }

        let call: CallRequest =
            serde_json::from_slice(trimmed).map_err(DispatchError::from_json_error)?;
        if call.fcn() == RESTART_FCN {
            Ok(Self::Restart)
        } else {
            Ok(Self::Call(call))
        }
    }
}
