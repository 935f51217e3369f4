//! Single-slot suspend/resume primitive
//!
//! A [`Gate`] lets one producer tell one waiting consumer that data is
//! available. It starts locked. [`Gate::release`] opens it and wakes the
//! waiter; a release with nobody waiting is remembered, so the next
//! [`Gate::wait`] resumes immediately. Releases never queue: any number of
//! releases before a wait satisfy exactly one wait cycle, and the consumer
//! re-locks the gate with [`Gate::arm`] before starting the next one.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

pub struct Gate {
    released: AtomicBool,
    notify: Notify,
}

impl Gate {
    /// Create a locked gate
    pub fn new() -> Self {
        Self {
            released: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Wait until the gate is released.
    ///
    /// Resolves immediately if the gate was released since the last
    /// [`arm`](Gate::arm). Waiting does not re-lock the gate.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register interest before checking the flag so a release landing
            // in between still wakes us.
            notified.as_mut().enable();

            if self.released.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }

    /// Open the gate and wake the pending waiter, if any
    pub fn release(&self) {
        self.released.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Re-lock the gate for the next wait cycle
    pub fn arm(&self) {
        self.released.store(false, Ordering::Release);
    }

    /// Whether a release is pending, i.e. the next `wait` returns at once
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gate")
            .field("released", &self.is_released())
            .finish()
    }
}
