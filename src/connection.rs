//! Connection bookkeeping for the gateway listener.
//!
//! - [`ConnectionLimiter`] caps concurrent connections with a semaphore
//! - [`ConnectionTracker`] counts open connections so shutdown can drain them

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counts open connections.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active: Arc<AtomicUsize>,
}

impl ConnectionTracker {
    /// Create a new connection tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection until the returned guard is dropped.
    pub fn track(&self) -> ConnectionGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            active: Arc::clone(&self.active),
        }
    }

    /// Current number of open connections.
    pub fn count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Waits until every connection closed or `timeout` elapsed.
    ///
    /// Returns `true` if all connections finished in time.
    pub async fn wait_for_shutdown(&self, timeout: Duration) -> bool {
        let drained = async {
            while self.count() > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        };
        tokio::time::timeout(timeout, drained).await.is_ok()
    }
}

/// Keeps a connection counted while alive.
#[derive(Debug)]
pub struct ConnectionGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Outcome of asking the limiter for room.
#[derive(Debug)]
pub enum Admission {
    /// No limit configured.
    Unlimited,
    /// Admitted; the slot frees when the permit drops.
    Permitted(OwnedSemaphorePermit),
    /// At capacity.
    Rejected,
}

impl Admission {
    /// Whether the connection may proceed.
    pub fn is_admitted(&self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

/// Caps concurrent connections. A limit of 0 disables the cap.
#[derive(Debug, Clone)]
pub struct ConnectionLimiter {
    semaphore: Option<Arc<Semaphore>>,
    max_connections: usize,
}

impl ConnectionLimiter {
    /// Create a new connection limiter.
    pub fn new(max_connections: usize) -> Self {
        let semaphore = (max_connections > 0).then(|| Arc::new(Semaphore::new(max_connections)));
        Self {
            semaphore,
            max_connections,
        }
    }

    /// Check if connection limiting is enabled.
    pub fn is_enabled(&self) -> bool {
        self.semaphore.is_some()
    }

    /// Maximum number of connections (0 means unlimited).
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Tries to reserve a slot without waiting.
    pub fn admit(&self) -> Admission {
        match &self.semaphore {
            None => Admission::Unlimited,
            Some(sem) => match Arc::clone(sem).try_acquire_owned() {
                Ok(permit) => Admission::Permitted(permit),
                Err(_) => Admission::Rejected,
            },
        }
    }

    /// Check if we're at capacity (only meaningful if limiting is enabled).
    pub fn at_capacity(&self) -> bool {
        self.semaphore
            .as_ref()
            .is_some_and(|sem| sem.available_permits() == 0)
    }
}
