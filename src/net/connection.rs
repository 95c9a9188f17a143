//! Connection identity and drain tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use crate::observability::metrics;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique connection number, shown as `conn-N` in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Live {
    count: AtomicUsize,
    drained: Notify,
}

/// Counts live connection tasks so shutdown can wait for them.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    live: Arc<Live>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection; it counts as live until the guard drops.
    pub fn track(&self) -> ConnectionGuard {
        self.live.count.fetch_add(1, Ordering::SeqCst);
        metrics::connection_opened();
        ConnectionGuard {
            live: Arc::clone(&self.live),
            id: ConnectionId::next(),
        }
    }

    pub fn active_count(&self) -> usize {
        self.live.count.load(Ordering::SeqCst)
    }

    /// Wait for every tracked connection to finish, at most `grace`.
    ///
    /// Returns `false` if connections were still open at the deadline.
    pub async fn wait_for_drain(&self, grace: Duration) -> bool {
        let drained = async {
            loop {
                // Registered before the check so a concurrent last drop is not missed.
                let notified = self.live.drained.notified();
                if self.active_count() == 0 {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(grace, drained).await.is_ok()
    }
}

/// Live-connection marker held by a connection task.
#[derive(Debug)]
pub struct ConnectionGuard {
    live: Arc<Live>,
    id: ConnectionId,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.live.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.live.drained.notify_waiters();
        }
        metrics::connection_closed();
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_labelled() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("conn-"));
    }

    #[test]
    fn guards_keep_the_count() {
        let tracker = ConnectionTracker::new();
        let first = tracker.track();
        let second = tracker.track();
        assert_eq!(tracker.active_count(), 2);
        assert_ne!(first.id(), second.id());

        drop(first);
        assert_eq!(tracker.active_count(), 1);
        drop(second);
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn drain_waits_for_the_last_guard() {
        let tracker = ConnectionTracker::new();
        let guard = tracker.track();
        assert!(!tracker.wait_for_drain(Duration::from_millis(50)).await);

        let release = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(guard);
        });
        assert!(tracker.wait_for_drain(Duration::from_secs(2)).await);
        release.await.unwrap();
    }
}
