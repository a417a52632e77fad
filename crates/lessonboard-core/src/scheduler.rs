//! Debounced scheduling driven by the host's event loop.

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// Coalesces bursts of requests into a single run after a quiet period.
///
/// There are no timers: the owner calls [`Debouncer::poll`] from its frame or
/// tick handler. Scheduling again cancels the pending deadline and replaces it.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
    in_flight: bool,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
            in_flight: false,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Request a run `delay` after `now`, replacing any pending request.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.in_flight
    }

    /// Whether the pending run is due. When it is, the deadline is consumed
    /// and the debouncer is marked running until [`Debouncer::finish`].
    ///
    /// Never fires while a run is in flight.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.in_flight {
            return false;
        }
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.in_flight = true;
                true
            }
            _ => false,
        }
    }

    /// Mark the current run as complete.
    pub fn finish(&mut self) {
        self.in_flight = false;
    }
}
