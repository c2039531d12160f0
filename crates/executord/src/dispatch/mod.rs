//! JSONL request dispatch between the caller and the worker.
//!
//! ## Protocol
//!
//! The caller writes one request per line on stdin:
//!
//! ```json
//! {"type":"question","directory":"q1","file":"server","fcn":"generate","args":[{}]}
//! ```
//!
//! and reads exactly one response per accepted line on stdout:
//!
//! ```json
//! {"data":{"params":{}},"output":""}
//! {"functionMissing":true}
//! {"error":"Traceback (most recent call last): ..."}
//! ```
//!
//! A request whose `fcn` is `"restart"` is not forwarded as a call. It asks
//! the worker to recover in place and is always answered with
//! `{"data":"success"}`; if recovery fails the worker is replaced before the
//! next request is read.
//!
//! Only one request is in flight at a time. Lines received while a request
//! is being handled are dropped without a response. Malformed lines are
//! logged to stderr and also get no response.

mod dispatcher;
mod errors;
mod gate;
mod request;
mod response;
mod serve;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

pub use self::dispatcher::{AcceptedLine, Dispatcher};
pub use self::errors::DispatchError;
pub use self::gate::{InFlight, InFlightGate};
pub use self::request::{ExecutionRequest, RESTART_FCN};
pub use self::response::{ExecutionResponse, RESTART_ACKNOWLEDGEMENT, ResponseWriter};
pub use self::serve::{DispatcherThread, serve};
