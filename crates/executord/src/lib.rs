//! Long-running executor that runs course code for a line-oriented caller.
//!
//! The executor reads one JSON request per line from stdin, runs the named
//! function through a [`WorkerHandle`](executor_worker::WorkerHandle), and
//! writes exactly one JSON response per accepted request to stdout. The
//! worker is an untrusted, crash-prone backend; the [`dispatch`] module keeps
//! the line protocol intact when it fails, replacing the worker after a
//! failed restart so the caller never has to.
//!
//! Closing stdin is the shutdown signal. The process exits with status 0 as
//! soon as input ends, without waiting for a request still in flight.

pub mod dispatch;
pub mod telemetry;

use std::ffi::OsString;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use executor_config::{Config, ConfigError};
use executor_worker::{ProcessWorker, WorkerSettings};
use tracing::{error, info};

pub use dispatch::{DispatchError, Dispatcher, serve};
pub use telemetry::{TelemetryError, TelemetryHandle};

/// Tracing target for process lifecycle events.
const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Runs the executor with the given arguments on the process's stdio.
///
/// Returns success once stdin closes. Configuration errors are reported on
/// stderr; `--help` and `--version` are handled by the argument parser.
pub fn run<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let config = match Config::load_from_iter(args) {
        Ok(config) => config,
        Err(ConfigError::Cli(cli_error)) => cli_error.exit(),
        Err(config_error) => {
            report_startup_failure(&config_error);
            return ExitCode::FAILURE;
        }
    };

    if let Err(telemetry_error) = telemetry::initialise(&config) {
        report_startup_failure(&telemetry_error);
        return ExitCode::FAILURE;
    }

    info!(
        target: LIFECYCLE_TARGET,
        course_root = %config.course_root(),
        worker_program = config.worker_program(),
        "executor starting"
    );

    let settings = worker_settings(&config);
    let dispatcher = Dispatcher::start(
        move || ProcessWorker::new(settings.clone()),
        config.course_root(),
        io::stdout(),
    );

    match serve(io::stdin().lock().split(b'\n'), dispatcher) {
        Ok(_abandoned) => {
            info!(target: LIFECYCLE_TARGET, "executor stopping");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(target: LIFECYCLE_TARGET, error = %err, "executor failed");
            ExitCode::FAILURE
        }
    }
}

/// Maps executor configuration onto worker launch settings.
#[must_use]
pub fn worker_settings(config: &Config) -> WorkerSettings {
    WorkerSettings::new(config.worker_program())
        .with_args(config.worker_args().to_vec())
        .with_script(
            config
                .worker_script()
                .map(|script| script.as_std_path().to_path_buf()),
        )
        .with_call_timeout(config.call_timeout())
}

/// Writes a startup failure to stderr before telemetry exists.
fn report_startup_failure(error: &dyn std::error::Error) {
    drop(writeln!(io::stderr(), "executord: {error}"));
}

#[cfg(test)]
mod tests;
