//! The worker abstraction driven by the dispatcher.

use std::path::Path;

use crate::error::WorkerError;
use crate::protocol::{CallOutput, CallRequest};

/// A stateful execution backend that runs course functions.
///
/// The production implementation is
/// [`ProcessWorker`](crate::process::ProcessWorker), which hosts an
/// interpreter child process. Test code can implement this trait to inject
/// pre-configured results.
///
/// A handle is owned by exactly one caller. Once [`done`](Self::done) has
/// been called the handle is discarded.
///
/// # Example
///
/// ```
/// use std::path::Path;
///
/// use executor_worker::{CallOutput, CallRequest, WorkerError, WorkerHandle};
///
/// struct Echo;
///
/// impl WorkerHandle for Echo {
///     fn ensure_child(&mut self) -> Result<(), WorkerError> {
///         Ok(())
///     }
///
///     fn prepare_for_course(&mut self, _course_root: &Path) -> Result<(), WorkerError> {
///         Ok(())
///     }
///
///     fn call(&mut self, request: &CallRequest) -> Result<CallOutput, WorkerError> {
///         Ok(CallOutput::new(request.args().into(), None))
///     }
///
///     fn restart(&mut self) -> Result<bool, WorkerError> {
///         Ok(true)
///     }
///
///     fn done(&mut self) {}
/// }
/// ```
pub trait WorkerHandle {
    /// Starts the underlying backend if it is not already running.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkerError`] if the backend cannot be started.
    fn ensure_child(&mut self) -> Result<(), WorkerError>;

    /// Performs best-effort setup for the course rooted at `course_root`.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkerError`] if setup fails.
    fn prepare_for_course(&mut self, course_root: &Path) -> Result<(), WorkerError>;

    /// Runs the requested function.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::FunctionMissing`] when the function does not
    /// exist, or any other [`WorkerError`] when the call fails.
    fn call(&mut self, request: &CallRequest) -> Result<CallOutput, WorkerError>;

    /// Attempts to recover the backend in place.
    ///
    /// Returns whether the backend reports a clean state.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkerError`] if the recovery attempt itself fails.
    fn restart(&mut self) -> Result<bool, WorkerError>;

    /// Releases every resource held by this handle.
    fn done(&mut self);
}
