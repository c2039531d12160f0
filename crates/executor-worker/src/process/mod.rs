//! Worker handle backed by a long-lived interpreter process.
//!
//! [`ProcessWorker`] implements [`WorkerHandle`] by spawning an interpreter
//! (by default `python3` running an embedded bootstrap script) and speaking a
//! JSONL protocol with it: one [`ChildCommand`] line on stdin, one
//! [`ChildReply`] line on stdout. The child is started lazily, restarted after
//! transport failures, and killed when the handle is finished.

mod child;

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::WorkerError;
use crate::handle::WorkerHandle;
use crate::protocol::{CallOutput, CallRequest, ChildCommand, ChildReply};

use self::child::RunningChild;

/// Tracing target for worker process operations.
const WORKER_TARGET: &str = "executor_worker::process";

/// Bootstrap script run by the interpreter when no custom script is set.
const BOOTSTRAP: &str = include_str!("bootstrap.py");

/// How to launch the worker interpreter.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use executor_worker::WorkerSettings;
///
/// let settings = WorkerSettings::new("python3")
///     .with_args(vec![String::from("-B")])
///     .with_call_timeout(Some(Duration::from_secs(30)));
/// assert_eq!(settings.program(), "python3");
/// assert!(settings.script().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    program: String,
    args: Vec<String>,
    script: Option<PathBuf>,
    call_timeout: Option<Duration>,
}

impl WorkerSettings {
    /// Creates settings for the given interpreter.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            script: None,
            call_timeout: None,
        }
    }

    /// Sets interpreter arguments placed before the entry point.
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Replaces the embedded bootstrap with a script on disk.
    #[must_use]
    pub fn with_script(mut self, script: Option<PathBuf>) -> Self {
        self.script = script;
        self
    }

    /// Bounds every round trip with the child.
    #[must_use]
    pub const fn with_call_timeout(mut self, call_timeout: Option<Duration>) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Interpreter program.
    #[must_use]
    pub const fn program(&self) -> &str {
        self.program.as_str()
    }

    /// Interpreter arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Custom entry script, if any.
    #[must_use]
    pub fn script(&self) -> Option<&Path> {
        self.script.as_deref()
    }

    /// Round-trip bound, if any.
    #[must_use]
    pub const fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout
    }
}

/// Runs course functions in a child interpreter.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::Path;
///
/// use executor_worker::{CallRequest, ProcessWorker, WorkerHandle, WorkerSettings};
///
/// let mut worker = ProcessWorker::new(WorkerSettings::new("python3"));
/// worker.ensure_child()?;
/// worker.prepare_for_course(Path::new("/course"))?;
/// let output = worker.call(&CallRequest::new("question", "q1", "server", "generate", vec![]))?;
/// println!("{}", output.data());
/// # Ok::<(), executor_worker::WorkerError>(())
/// ```
#[derive(Debug)]
pub struct ProcessWorker {
    settings: WorkerSettings,
    child: Option<RunningChild>,
    prepared_root: Option<PathBuf>,
}

impl ProcessWorker {
    /// Creates a worker; no process is started until first use.
    #[must_use]
    pub const fn new(settings: WorkerSettings) -> Self {
        Self {
            settings,
            child: None,
            prepared_root: None,
        }
    }

    /// Launch settings.
    #[must_use]
    pub const fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    /// Returns true while a child process is alive.
    #[must_use]
    pub fn is_running(&mut self) -> bool {
        self.child.as_mut().is_some_and(RunningChild::is_running)
    }

    /// Sends one command, tearing the child down if the exchange breaks.
    fn exchange(&mut self, command: &ChildCommand<'_>) -> Result<ChildReply, WorkerError> {
        self.ensure_child()?;
        let timeout = self.settings.call_timeout();
        let result = match self.child.as_mut() {
            Some(child) => child.exchange(command, timeout),
            None => Err(WorkerError::ChildExited),
        };
        if let Err(error) = &result
            && error.poisons_child()
        {
            warn!(
                target: WORKER_TARGET,
                command = command.kind(),
                %error,
                "worker exchange failed, discarding child"
            );
            self.discard_child();
        }
        result
    }

    fn discard_child(&mut self) {
        self.child = None;
        self.prepared_root = None;
    }
}

impl WorkerHandle for ProcessWorker {
    fn ensure_child(&mut self) -> Result<(), WorkerError> {
        if self.is_running() {
            return Ok(());
        }
        if self.child.is_some() {
            info!(target: WORKER_TARGET, "worker process has exited, respawning");
            self.discard_child();
        }
        self.child = Some(RunningChild::spawn(&self.settings)?);
        Ok(())
    }

    fn prepare_for_course(&mut self, course_root: &Path) -> Result<(), WorkerError> {
        if self.is_running() && self.prepared_root.as_deref() == Some(course_root) {
            return Ok(());
        }
        match self.exchange(&ChildCommand::Prepare { course_root })? {
            ChildReply::Success { .. } => {
                self.prepared_root = Some(course_root.to_path_buf());
                Ok(())
            }
            ChildReply::Error { message, .. } => Err(WorkerError::Rejected {
                command: "prepare",
                message,
            }),
            ChildReply::FunctionMissing => Err(WorkerError::InvalidReply {
                message: String::from("prepare answered with function_missing"),
                source: None,
            }),
        }
    }

    fn call(&mut self, request: &CallRequest) -> Result<CallOutput, WorkerError> {
        debug!(
            target: WORKER_TARGET,
            call_type = request.call_type(),
            directory = request.directory(),
            file = request.file(),
            fcn = request.fcn(),
            "calling worker function"
        );
        match self.exchange(&ChildCommand::Call(request))? {
            ChildReply::Success { data, output } => Ok(CallOutput::new(data, output)),
            ChildReply::FunctionMissing => Err(WorkerError::FunctionMissing {
                file: request.file().to_owned(),
                fcn: request.fcn().to_owned(),
            }),
            ChildReply::Error { message, output } => {
                Err(WorkerError::CallFailed { message, output })
            }
        }
    }

    fn restart(&mut self) -> Result<bool, WorkerError> {
        if !self.is_running() {
            info!(target: WORKER_TARGET, "restarting worker by respawning its process");
            self.discard_child();
            self.ensure_child()?;
            return Ok(true);
        }
        let reply = self.exchange(&ChildCommand::Restart)?;
        self.prepared_root = None;
        Ok(matches!(reply, ChildReply::Success { .. }))
    }

    fn done(&mut self) {
        self.discard_child();
    }
}

impl Drop for ProcessWorker {
    fn drop(&mut self) {
        self.done();
    }
}

#[cfg(test)]
mod tests;
