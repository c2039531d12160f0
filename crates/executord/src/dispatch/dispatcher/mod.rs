//! The request handler that owns the worker.
//!
//! [`Dispatcher`] turns one accepted input line into one response line. It
//! holds the only [`WorkerHandle`] in the process and is the only code that
//! replaces it. Replacement happens between requests, after a restart request
//! that the worker could not honour.

use std::io::Write;
use std::sync::mpsc::Receiver;

use camino::Utf8PathBuf;
use executor_worker::{CallRequest, WorkerHandle};
use tracing::{debug, error, info, warn};

use super::DISPATCH_TARGET;
use super::errors::DispatchError;
use super::gate::InFlight;
use super::request::ExecutionRequest;
use super::response::{ExecutionResponse, ResponseWriter};

/// A line admitted through the in-flight gate, together with its guard.
#[derive(Debug)]
pub struct AcceptedLine {
    line: String,
    in_flight: InFlight,
}

impl AcceptedLine {
    /// Pairs a line with the guard that admitted it.
    pub const fn new(line: String, in_flight: InFlight) -> Self {
        Self { line, in_flight }
    }
}

/// Outcome of one request before it is written.
struct Handled {
    response: ExecutionResponse,
    needs_full_restart: bool,
}

/// Handles requests against an owned, replaceable worker.
///
/// `spawn_worker` builds a fresh handle; it is called once at startup and
/// again whenever the current handle has to be replaced.
#[derive(Debug)]
pub struct Dispatcher<F, W, O> {
    spawn_worker: F,
    worker: W,
    course_root: Utf8PathBuf,
    writer: ResponseWriter<O>,
}

impl<F, W, O> Dispatcher<F, W, O>
where
    F: Fn() -> W,
    W: WorkerHandle,
    O: Write,
{
    /// Creates the first worker, starts it, and wraps the output stream.
    ///
    /// A worker that fails to start is kept; it retries on first use.
    pub fn start(spawn_worker: F, course_root: impl Into<Utf8PathBuf>, output: O) -> Self {
        let worker = initialise(&spawn_worker);
        Self {
            spawn_worker,
            worker,
            course_root: course_root.into(),
            writer: ResponseWriter::new(output),
        }
    }

    /// Handles one admitted line and writes its response.
    ///
    /// The gate is reopened once the response is final and any worker
    /// replacement is complete, immediately before the response is written.
    /// A caller that waits for each response therefore never sees its next
    /// line refused.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::MalformedRequest` if the line is not a request
    /// (no response is written), or a fatal error if writing fails.
    pub fn handle_line(&mut self, line: &str, in_flight: InFlight) -> Result<(), DispatchError> {
        let request = ExecutionRequest::parse(line.as_bytes())?;
        let handled = self.handle_request(request);
        if handled.needs_full_restart {
            self.replace_worker();
        }
        drop(in_flight);
        self.writer.write_response(&handled.response)
    }

    /// Handles admitted lines until the sender goes away.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; malformed lines are logged and skipped.
    pub fn run(mut self, lines: &Receiver<AcceptedLine>) -> Result<(), DispatchError> {
        for AcceptedLine { line, in_flight } in lines {
            match self.handle_line(&line, in_flight) {
                Ok(()) => {}
                Err(err) if err.is_fatal() => {
                    error!(target: DISPATCH_TARGET, error = %err, "cannot answer requests, stopping");
                    return Err(err);
                }
                Err(err) => {
                    warn!(target: DISPATCH_TARGET, error = %err, "discarding request line");
                }
            }
        }
        Ok(())
    }

    fn handle_request(&mut self, request: ExecutionRequest) -> Handled {
        match request {
            ExecutionRequest::Restart => self.restart(),
            ExecutionRequest::Call(call) => self.call(&call),
        }
    }

    fn restart(&mut self) -> Handled {
        let needs_full_restart = match self.worker.restart() {
            Ok(true) => false,
            Ok(false) => {
                warn!(target: DISPATCH_TARGET, "worker restart reported an unclean state");
                true
            }
            Err(err) => {
                warn!(target: DISPATCH_TARGET, error = %err, "worker restart failed");
                true
            }
        };
        // The caller is told "success" either way; a failed restart is
        // repaired by replacing the worker before the next request.
        Handled {
            response: ExecutionResponse::restart_acknowledged(),
            needs_full_restart,
        }
    }

    fn call(&mut self, request: &CallRequest) -> Handled {
        // TODO: surface preparation failures once callers can tell them apart
        // from call failures.
        if let Err(err) = self
            .worker
            .prepare_for_course(self.course_root.as_std_path())
        {
            debug!(target: DISPATCH_TARGET, error = %err, "course preparation failed");
        }

        let result = self.worker.call(request);
        match &result {
            Ok(_) => debug!(target: DISPATCH_TARGET, fcn = request.fcn(), "call succeeded"),
            Err(err) if err.is_function_missing() => {
                debug!(target: DISPATCH_TARGET, fcn = request.fcn(), "function missing");
            }
            Err(err) => {
                info!(target: DISPATCH_TARGET, fcn = request.fcn(), error = %err, "call failed");
            }
        }

        Handled {
            response: ExecutionResponse::from_call(result),
            needs_full_restart: false,
        }
    }

    fn replace_worker(&mut self) {
        info!(target: DISPATCH_TARGET, "replacing worker");
        self.worker.done();
        self.worker = initialise(&self.spawn_worker);
    }
}

/// Builds a worker and asks it to start eagerly.
fn initialise<W: WorkerHandle>(spawn_worker: &impl Fn() -> W) -> W {
    let mut worker = spawn_worker();
    if let Err(err) = worker.ensure_child() {
        warn!(
            target: DISPATCH_TARGET,
            error = %err,
            "worker failed to start; it will retry on first use"
        );
    }
    worker
}
