//! Cooperative shutdown signal shared between the signal handler and the
//! stream loop.
//!
//! The loop only checks the signal while it waits for the next feed line,
//! so an event that is already being processed always runs to completion.
//! Connecting and reconnect delays are cut short with [`Shutdown::until`].

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// A one-way shutdown flag with async wake-up.
#[derive(Debug, Default)]
pub struct Shutdown {
    requested: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    /// Create a signal that has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Request shutdown and wake every waiter.
    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Resolve once shutdown has been requested.
    pub async fn wait(&self) {
        loop {
            // Register before checking so a request in between is not lost.
            let notified = self.notify.notified();
            if self.is_requested() {
                return;
            }
            notified.await;
        }
    }

    /// Run `future` unless shutdown is requested first, in which case it is
    /// dropped and `None` is returned.
    pub async fn until<F: Future>(&self, future: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            () = self.wait() => None,
            output = future => Some(output),
        }
    }
}
