//! Worker handles for the course code executor.
//!
//! The executor never runs course code itself. It drives a [`WorkerHandle`],
//! a stateful backend that loads a course file, calls a named function with
//! JSON arguments, and reports the return value together with anything the
//! function printed. Failures are classified so the caller can tell a missing
//! function apart from a function that ran and failed.
//!
//! [`ProcessWorker`] is the production handle. It keeps one interpreter child
//! alive across calls and talks to it over a single-line JSONL protocol on
//! standard I/O (see [`protocol`]).

pub mod error;
pub mod handle;
pub mod process;
pub mod protocol;

pub use self::error::WorkerError;
pub use self::handle::WorkerHandle;
pub use self::process::{ProcessWorker, WorkerSettings};
pub use self::protocol::{CallOutput, CallRequest, ChildCommand, ChildReply};
