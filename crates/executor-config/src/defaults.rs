use crate::logging::LogFormat;

/// Course root handed to the worker before every call.
///
/// The executor container mounts the course checkout here.
pub const DEFAULT_COURSE_ROOT: &str = "/course";

/// Interpreter used to host the worker bootstrap.
pub const DEFAULT_WORKER_PROGRAM: &str = "python3";

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default course root.
pub const fn default_course_root() -> &'static str {
    DEFAULT_COURSE_ROOT
}

/// Default worker interpreter.
pub const fn default_worker_program() -> &'static str {
    DEFAULT_WORKER_PROGRAM
}

/// Default log filter expression used by the binary.
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binary.
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
