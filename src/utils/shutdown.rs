//! Cooperative Shutdown Module
//!
//! Long-running loops (traversals, the monitor daemon) check this flag
//! at their next safe point: before the next queue item, before the
//! next poll cycle. Sleeps select against `wait()` so a stop signal
//! never has to outwait a full poll interval.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Shared stop signal. Trigger once; every holder observes it.
#[derive(Debug, Default)]
pub struct Shutdown {
    triggered: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown and wake everything parked in `wait()`
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Resolve once shutdown has been requested
    pub async fn wait(&self) {
        // Register interest before re-checking the flag so a trigger
        // between the check and the await cannot be missed
        loop {
            let notified = self.notify.notified();
            if self.is_triggered() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_is_observed() {
        let shutdown = Arc::new(Shutdown::new());
        assert!(!shutdown.is_triggered());

        let waiter = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                shutdown.wait().await;
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_wait_after_trigger_returns_immediately() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        tokio::time::timeout(Duration::from_millis(50), shutdown.wait())
            .await
            .expect("already-triggered wait must not block");
    }
}
