//! The input loop: reads lines, admits them through the gate, and hands them
//! to the dispatcher thread.

use std::io::{self, Write};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use executor_worker::WorkerHandle;
use tracing::{debug, info};

use super::DISPATCH_TARGET;
use super::dispatcher::{AcceptedLine, Dispatcher};
use super::errors::DispatchError;
use super::gate::InFlightGate;

/// The dispatcher thread left running when input closes.
///
/// The binary drops this and exits at once, abandoning any request still in
/// flight. Tests join it to observe every response.
#[derive(Debug)]
pub struct DispatcherThread {
    handle: JoinHandle<Result<(), DispatchError>>,
}

impl DispatcherThread {
    /// Waits for the dispatcher to drain its queue and stop.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's fatal error, or
    /// `DispatchError::DispatcherStopped` if the thread panicked.
    pub fn join(self) -> Result<(), DispatchError> {
        self.handle
            .join()
            .map_err(|_| DispatchError::DispatcherStopped)?
    }

    /// Returns true once the dispatcher has stopped taking lines.
    ///
    /// While input is open the dispatcher only stops on a fatal error.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Joins a dispatcher that stopped early and reports why.
    fn stopped_error(self) -> DispatchError {
        match self.join() {
            Err(err) => err,
            Ok(()) => DispatchError::DispatcherStopped,
        }
    }
}

/// Runs the input loop until `lines` is exhausted.
///
/// `lines` yields raw newline-delimited input. Bytes that are not UTF-8 are
/// decoded lossily, so a corrupt line is answered or rejected like any other
/// request instead of ending the loop.
///
/// Each line is admitted only when no other request is in flight; lines that
/// arrive while the gate is closed are discarded without a response. Admitted
/// lines are handled one at a time on a dedicated dispatcher thread, so input
/// closure is observed even while a worker call is blocked.
///
/// # Errors
///
/// Returns an error if reading input fails, the dispatcher thread cannot be
/// started, or the dispatcher stopped on a fatal error before input closed.
pub fn serve<I, F, W, O>(
    lines: I,
    dispatcher: Dispatcher<F, W, O>,
) -> Result<DispatcherThread, DispatchError>
where
    I: IntoIterator<Item = io::Result<Vec<u8>>>,
    F: Fn() -> W + Send + 'static,
    W: WorkerHandle + Send + 'static,
    O: Write + Send + 'static,
{
    let gate = InFlightGate::new();
    let (sender, receiver) = mpsc::channel::<AcceptedLine>();
    let handle = thread::Builder::new()
        .name(String::from("executor-dispatch"))
        .spawn(move || dispatcher.run(&receiver))?;
    let dispatcher_thread = DispatcherThread { handle };

    for line in lines {
        let bytes = line?;
        let Some(in_flight) = gate.try_enter() else {
            debug!(target: DISPATCH_TARGET, "discarding line received while a request is in flight");
            continue;
        };
        let text = String::from_utf8_lossy(&bytes).into_owned();
        if sender.send(AcceptedLine::new(text, in_flight)).is_err() {
            return Err(dispatcher_thread.stopped_error());
        }
    }

    info!(target: DISPATCH_TARGET, "input closed");
    if dispatcher_thread.is_finished() {
        return Err(dispatcher_thread.stopped_error());
    }
    Ok(dispatcher_thread)
}
