//! Graceful shutdown coordination.
//!
//! Uses a watch channel to broadcast the shutdown signal and tracks active
//! relay streams so the server can wait for them to drain.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::RelayError;
use crate::metrics;

/// Shutdown coordinator for graceful termination.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    inner: Arc<ShutdownInner>,
}

struct ShutdownInner {
    /// Broadcast channel for shutdown signal.
    shutdown_tx: watch::Sender<bool>,
    /// Receiver for shutdown signal (cloned for each stream).
    shutdown_rx: watch::Receiver<bool>,
    /// Active stream count.
    active_streams: AtomicU64,
    /// Waiters for stream drain.
    drain_notify: tokio::sync::Notify,
    /// Next stream ID.
    next_stream_id: AtomicU64,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            inner: Arc::new(ShutdownInner {
                shutdown_tx,
                shutdown_rx,
                active_streams: AtomicU64::new(0),
                drain_notify: tokio::sync::Notify::new(),
                next_stream_id: AtomicU64::new(1),
            }),
        }
    }

    /// Signal shutdown to all streams.
    pub fn shutdown(&self) {
        let _ = self.inner.shutdown_tx.send(true);
    }

    /// Check if shutdown has been signaled.
    pub fn is_shutdown(&self) -> bool {
        *self.inner.shutdown_rx.borrow()
    }

    /// Get a receiver to watch for shutdown.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.shutdown_rx.clone()
    }

    /// Resolve once shutdown has been signaled.
    pub async fn wait_for_shutdown(&self) {
        let mut rx = self.subscribe();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    /// Get current active stream count.
    pub fn active_streams(&self) -> u64 {
        self.inner.active_streams.load(Ordering::Relaxed)
    }

    /// Register a new stream if fewer than `max` are active.
    ///
    /// Fails with [`RelayError::Shutdown`] once shutdown has been signaled and
    /// with [`RelayError::Overloaded`] when the limit is reached.
    pub fn try_register_stream(&self, max: usize) -> Result<StreamGuard, RelayError> {
        if self.is_shutdown() {
            return Err(RelayError::Shutdown);
        }

        let max = max as u64;
        let prev = self
            .inner
            .active_streams
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |curr| {
                (curr < max).then_some(curr + 1)
            })
            .map_err(|_| RelayError::Overloaded)?;

        metrics::set_active_streams(prev + 1);
        let id = self.inner.next_stream_id.fetch_add(1, Ordering::Relaxed);

        Ok(StreamGuard {
            coordinator: self.clone(),
            id,
        })
    }

    /// Wait for all streams to drain.
    pub async fn wait_for_drain(&self) {
        loop {
            // Create the notification future before checking the count to avoid
            // missing a notify that happens after the load but before awaiting.
            let notified = self.inner.drain_notify.notified();
            if self.inner.active_streams.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    fn unregister_stream(&self) {
        // Use fetch_update to guard against underflow
        let result = self.inner.active_streams.fetch_update(
            Ordering::AcqRel,
            Ordering::Acquire,
            |curr| curr.checked_sub(1),
        );

        match result {
            Ok(prev) => {
                let new_count = prev - 1;
                metrics::set_active_streams(new_count);
                if new_count == 0 {
                    self.inner.drain_notify.notify_waiters();
                }
            }
            Err(_) => {
                tracing::error!("unregister_stream called with active_streams already at 0");
                metrics::set_active_streams(0);
            }
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard for one relay stream.
pub struct StreamGuard {
    coordinator: ShutdownCoordinator,
    id: u64,
}

impl StreamGuard {
    /// Get the stream ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get a receiver to watch for shutdown.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.coordinator.subscribe()
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.coordinator.unregister_stream();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_stream_tracking() {
        let coordinator = ShutdownCoordinator::new();
        assert_eq!(coordinator.active_streams(), 0);

        let guard1 = coordinator.try_register_stream(10).unwrap();
        assert_eq!(coordinator.active_streams(), 1);

        let guard2 = coordinator.try_register_stream(10).unwrap();
        assert_eq!(coordinator.active_streams(), 2);
        assert_ne!(guard1.id(), guard2.id());

        drop(guard1);
        assert_eq!(coordinator.active_streams(), 1);

        drop(guard2);
        assert_eq!(coordinator.active_streams(), 0);
    }

    #[tokio::test]
    async fn test_stream_limit() {
        let coordinator = ShutdownCoordinator::new();
        let _guard = coordinator.try_register_stream(1).unwrap();
        assert!(matches!(
            coordinator.try_register_stream(1),
            Err(RelayError::Overloaded)
        ));
        assert_eq!(coordinator.active_streams(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_signal() {
        let coordinator = ShutdownCoordinator::new();
        assert!(!coordinator.is_shutdown());

        coordinator.shutdown();
        assert!(coordinator.is_shutdown());
        assert!(matches!(
            coordinator.try_register_stream(10),
            Err(RelayError::Shutdown)
        ));

        tokio::time::timeout(Duration::from_secs(1), coordinator.wait_for_shutdown())
            .await
            .expect("shutdown already signaled");
    }

    #[tokio::test]
    async fn test_wait_for_drain() {
        let coordinator = ShutdownCoordinator::new();
        let guard = coordinator.try_register_stream(10).unwrap();

        let waiter = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.wait_for_drain().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("drain completes")
            .unwrap();
    }
}
