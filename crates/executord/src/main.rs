//! Executor entrypoint.
//!
//! The binary delegates to [`executord::run`], which loads configuration,
//! initialises telemetry, starts the worker, and serves the line protocol on
//! stdin and stdout until stdin closes.

use std::process::ExitCode;

fn main() -> ExitCode {
    executord::run(std::env::args_os())
}
