//! Single-flight admission for input lines.
//!
//! The caller is expected to wait for each response before sending the next
//! request. Lines that arrive while a request is still being handled are
//! dropped here rather than queued: a misbehaving caller loses requests, but
//! responses can never be reordered or attributed to the wrong line.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Tracks whether a request is currently in flight.
#[derive(Debug, Clone, Default)]
pub struct InFlightGate {
    busy: Arc<AtomicBool>,
}

impl InFlightGate {
    /// Creates an idle gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits a request if none is in flight.
    ///
    /// Returns `None` while another request holds the gate. The returned
    /// guard keeps the gate closed until it is dropped.
    #[must_use]
    pub fn try_enter(&self) -> Option<InFlight> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight {
                busy: Arc::clone(&self.busy),
            })
    }

    /// Returns true while a request holds the gate.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Guard held for the lifetime of one request.
#[derive(Debug)]
#[must_use = "dropping the guard reopens the gate"]
pub struct InFlight {
    busy: Arc<AtomicBool>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
