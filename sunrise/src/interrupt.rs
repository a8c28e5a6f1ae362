//! Cooperative cancellation flag shared between a session and its controller.
//!
//! The flag is the only piece of session state touched from outside the
//! worker thread. Work checks it at loop tops, before each chunk write and
//! before each hash block; nothing is ever preempted.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const RUNNING: u8 = 0;
const PAUSED: u8 = 1;
const SHUTDOWN: u8 = 2;

/// Why a session was asked to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The user paused; the session may be resumed by a new one.
    Pause,
    /// The application is exiting or a new session supersedes this one.
    Shutdown,
}

/// Atomic interrupt flag.
///
/// Clones share the same flag. Shutdown outranks Pause: a pause never
/// replaces a shutdown, a shutdown always replaces a pause.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    flag: Arc<AtomicU8>,
}

impl Interrupt {
    /// Create a cleared flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop.
    pub fn request(&self, reason: StopReason) {
        let value = match reason {
            StopReason::Pause => PAUSED,
            StopReason::Shutdown => SHUTDOWN,
        };
        self.flag.fetch_max(value, Ordering::SeqCst);
    }

    /// Clear a pause so the same session can run again.
    ///
    /// A shutdown is never cleared. Returns true if a pause was cleared.
    pub fn resume(&self) -> bool {
        self.flag
            .compare_exchange(PAUSED, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Whether a stop has been requested.
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst) != RUNNING
    }

    /// The stop reason, if any.
    pub fn reason(&self) -> Option<StopReason> {
        match self.flag.load(Ordering::SeqCst) {
            PAUSED => Some(StopReason::Pause),
            SHUTDOWN => Some(StopReason::Shutdown),
            _ => None,
        }
    }
}
