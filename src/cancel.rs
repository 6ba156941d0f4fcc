//! Cooperative cancellation flag
//!
//! Set by the interrupt listener, checked by the controller before every
//! prompt and every file read or write. File writes run under a write guard;
//! the listener waits for it before exiting the process, so a step file is
//! never left half-replaced.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cancellation token shared between the signal listener and the controller
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    cancelled: Arc<AtomicBool>,
    writes: Arc<Mutex<()>>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Returns `true` only for the first request.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Held for the duration of one file write. Check `is_cancelled` after
    /// taking it: a cancel that got in first must not be followed by a write.
    pub fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until no write guard is held.
    pub fn wait_for_writes(&self) {
        drop(self.write_guard());
    }
}
