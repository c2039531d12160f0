//! Shared configuration for the course code executor.
//!
//! The executor is configured entirely from command-line flags, each of which
//! falls back to an `EXECUTOR_*` environment variable and then to the defaults
//! in this crate. Configuration is resolved once at startup; nothing here is
//! reloaded while the process runs.

mod defaults;
mod logging;

use std::ffi::OsString;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use thiserror::Error;

pub use defaults::{
    DEFAULT_COURSE_ROOT, DEFAULT_LOG_FILTER, DEFAULT_WORKER_PROGRAM, default_course_root,
    default_log_filter, default_log_format, default_worker_program,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved executor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(
    name = "executord",
    version,
    about = "Runs course code on behalf of a line-oriented JSON caller"
)]
pub struct Config {
    /// Course root handed to the worker before every call.
    #[arg(long, env = "EXECUTOR_COURSE_ROOT", default_value = DEFAULT_COURSE_ROOT)]
    course_root: Utf8PathBuf,

    /// Interpreter that hosts the worker.
    #[arg(long, env = "EXECUTOR_WORKER_PROGRAM", default_value = DEFAULT_WORKER_PROGRAM)]
    worker_program: String,

    /// Extra interpreter argument, placed before the worker entry point.
    #[arg(long = "worker-arg", value_name = "ARG", allow_hyphen_values = true)]
    worker_args: Vec<String>,

    /// Worker entry script; the embedded bootstrap is used when absent.
    #[arg(long, env = "EXECUTOR_WORKER_SCRIPT")]
    worker_script: Option<Utf8PathBuf>,

    /// Upper bound in seconds on each worker round trip. Unbounded when unset.
    #[arg(long, env = "EXECUTOR_CALL_TIMEOUT_SECS")]
    call_timeout_secs: Option<u64>,

    /// Tracing filter expression.
    #[arg(long, env = "EXECUTOR_LOG", default_value = DEFAULT_LOG_FILTER)]
    log_filter: String,

    /// Log output format (`json` or `compact`).
    #[arg(long, env = "EXECUTOR_LOG_FORMAT", default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

/// Errors raised while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The command line could not be parsed, or help/version was requested.
    #[error(transparent)]
    Cli(#[from] clap::Error),

    /// The worker program was blank.
    #[error("worker program must not be empty")]
    EmptyWorkerProgram,

    /// A zero-second call timeout would fail every call.
    #[error("call timeout must be at least one second")]
    ZeroCallTimeout,
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_iter(std::env::args_os())
    }

    /// Loads configuration from an explicit argument list.
    ///
    /// The first item is treated as the binary name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let config = Self::try_parse_from(args)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_program.trim().is_empty() {
            return Err(ConfigError::EmptyWorkerProgram);
        }
        if self.call_timeout_secs == Some(0) {
            return Err(ConfigError::ZeroCallTimeout);
        }
        Ok(())
    }

    /// Course root handed to the worker before every call.
    #[must_use]
    pub fn course_root(&self) -> &Utf8Path {
        self.course_root.as_path()
    }

    /// Interpreter that hosts the worker.
    #[must_use]
    pub const fn worker_program(&self) -> &str {
        self.worker_program.as_str()
    }

    /// Extra interpreter arguments.
    #[must_use]
    pub fn worker_args(&self) -> &[String] {
        &self.worker_args
    }

    /// Custom worker entry script, if configured.
    #[must_use]
    pub fn worker_script(&self) -> Option<&Utf8Path> {
        self.worker_script.as_deref()
    }

    /// Optional bound on each worker round trip.
    #[must_use]
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_secs.map(Duration::from_secs)
    }

    /// Tracing filter expression.
    #[must_use]
    pub const fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            course_root: Utf8PathBuf::from(default_course_root()),
            worker_program: default_worker_program().to_owned(),
            worker_args: Vec::new(),
            worker_script: None,
            call_timeout_secs: None,
            log_filter: default_log_filter().to_owned(),
            log_format: default_log_format(),
        }
    }
}
