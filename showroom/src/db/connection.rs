//! The process-wide connection cache.
//!
//! A [`ConnectionCache`] owns the single store handle of the process. Nothing connects until the
//! first request asks for a connection. From then on:
//!
//! - a live handle is returned immediately, without a new attempt
//! - while an attempt is in flight, every caller awaits that same attempt
//! - a failed attempt leaves the cache empty, so the next caller starts over
//!
//! The attempt runs on its own task. A request that gives up (client disconnect, timeout) stops
//! waiting but does not cancel the attempt, which still completes and fills the cache.
//!
//! Handlers depend on the narrow [`ConnectionProvider`] trait rather than on the cache itself.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use super::{
    errors::{DbError, Result},
    store::Store,
};

/// Shared handle to a connected store.
pub type StoreHandle = Arc<dyn Store>;

/// Opens a new store session. Implemented once per backend.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, uri: &str) -> Result<StoreHandle>;
}

/// Hands out the store handle to request handlers.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Returns the cached handle, connecting first if needed.
    ///
    /// Fails with [`DbError::Unavailable`] when the store cannot be reached.
    async fn connection(&self) -> Result<StoreHandle>;
}

/// Errors are carried as strings so the outcome can be cloned to every waiter.
type PendingConnect = Shared<BoxFuture<'static, std::result::Result<StoreHandle, String>>>;

enum Slot {
    Empty,
    Connecting { attempt: u64, pending: PendingConnect },
    Ready(StoreHandle),
}

/// Lazily connected, process-wide store handle.
///
/// Cloning is cheap and clones share the same slot.
#[derive(Clone)]
pub struct ConnectionCache {
    uri: Arc<str>,
    connector: Arc<dyn Connector>,
    slot: Arc<Mutex<Slot>>,
    attempts: Arc<AtomicU64>,
}

impl ConnectionCache {
    pub fn new(uri: impl Into<String>, connector: Arc<dyn Connector>) -> Self {
        Self {
            uri: Arc::from(uri.into()),
            connector,
            slot: Arc::new(Mutex::new(Slot::Empty)),
            attempts: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of connection attempts started so far
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Whether a live handle is cached
    pub async fn is_connected(&self) -> bool {
        matches!(*self.slot.lock().await, Slot::Ready(_))
    }

    /// Start attempt number `attempt` on its own task.
    ///
    /// Must be called with the slot lock held, and the returned future stored in the slot before
    /// the lock is released.
    fn start_attempt(&self, attempt: u64) -> PendingConnect {
        let connector = self.connector.clone();
        let uri = self.uri.clone();
        let slot = self.slot.clone();

        let task = tokio::spawn(async move {
            info!(attempt, "Connecting to store");
            let result = connector.connect(&uri).await;

            let mut guard = slot.lock().await;
            let current = matches!(&*guard, Slot::Connecting { attempt: a, .. } if *a == attempt);
            match result {
                Ok(handle) => {
                    info!(attempt, backend = handle.backend(), "Store connection established");
                    if current {
                        *guard = Slot::Ready(handle.clone());
                    }
                    Ok(handle)
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Store connection attempt failed");
                    if current {
                        *guard = Slot::Empty;
                    }
                    Err(e.to_string())
                }
            }
        });

        let slot = self.slot.clone();
        async move {
            match task.await {
                Ok(result) => result,
                Err(join_error) => {
                    // The task panicked or the runtime is shutting down: free the slot
                    let mut guard = slot.lock().await;
                    if matches!(&*guard, Slot::Connecting { attempt: a, .. } if *a == attempt) {
                        *guard = Slot::Empty;
                    }
                    Err(format!("connection attempt {attempt} did not complete: {join_error}"))
                }
            }
        }
        .boxed()
        .shared()
    }
}

#[async_trait]
impl ConnectionProvider for ConnectionCache {
    #[instrument(skip_all, err)]
    async fn connection(&self) -> Result<StoreHandle> {
        let pending = {
            let mut slot = self.slot.lock().await;
            match &*slot {
                Slot::Ready(handle) => return Ok(handle.clone()),
                Slot::Connecting { pending, .. } => pending.clone(),
                Slot::Empty => {
                    let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    let pending = self.start_attempt(attempt);
                    *slot = Slot::Connecting {
                        attempt,
                        pending: pending.clone(),
                    };
                    pending
                }
            }
        };

        pending.await.map_err(|message| DbError::Unavailable { message })
    }
}

impl std::fmt::Debug for ConnectionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionCache").field("attempts", &self.attempts()).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::in_memory::MemoryStore;
    use std::{sync::atomic::AtomicUsize, time::Duration};

    /// Connector that counts calls, waits before answering, and fails the first `failures` calls.
    struct CountingConnector {
        calls: AtomicUsize,
        failures: usize,
        delay: Duration,
    }

    impl CountingConnector {
        fn new(failures: usize, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                failures,
                delay,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Connector for CountingConnector {
        async fn connect(&self, _uri: &str) -> Result<StoreHandle> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if call < self.failures {
                return Err(DbError::Unavailable {
                    message: "connection refused".to_string(),
                });
            }
            Ok(Arc::new(MemoryStore::new()))
        }
    }

    #[tokio::test]
    async fn test_concurrent_first_callers_share_one_attempt() {
        let connector = CountingConnector::new(0, Duration::from_millis(50));
        let cache = ConnectionCache::new("memory://", connector.clone());

        let callers = (0..16).map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.connection().await })
        });
        let handles: Vec<StoreHandle> = futures::future::join_all(callers)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect();

        assert_eq!(connector.calls(), 1);
        assert_eq!(cache.attempts(), 1);
        assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));
    }

    #[tokio::test]
    async fn test_cached_handle_is_reused() {
        let connector = CountingConnector::new(0, Duration::ZERO);
        let cache = ConnectionCache::new("memory://", connector.clone());

        let first = cache.connection().await.unwrap();
        let second = cache.connection().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(connector.calls(), 1);
        assert!(cache.is_connected().await);
    }

    #[test_log::test(tokio::test)]
    async fn test_failure_is_not_cached() {
        let connector = CountingConnector::new(1, Duration::ZERO);
        let cache = ConnectionCache::new("memory://", connector.clone());

        let err = cache.connection().await.unwrap_err();
        assert!(matches!(err, DbError::Unavailable { .. }));
        assert!(!cache.is_connected().await);

        cache.connection().await.expect("second attempt should connect");
        assert_eq!(connector.calls(), 2);
        assert_eq!(cache.attempts(), 2);
    }

    #[test_log::test(tokio::test)]
    async fn test_concurrent_callers_share_one_failure() {
        let connector = CountingConnector::new(1, Duration::from_millis(30));
        let cache = ConnectionCache::new("memory://", connector.clone());

        let (a, b) = tokio::join!(cache.connection(), cache.connection());
        assert!(a.is_err() && b.is_err());
        assert_eq!(connector.calls(), 1);

        assert!(cache.connection().await.is_ok());
        assert_eq!(connector.calls(), 2);
    }

    #[test_log::test(tokio::test)]
    async fn test_abandoned_caller_does_not_cancel_attempt() {
        let connector = CountingConnector::new(0, Duration::from_millis(50));
        let cache = ConnectionCache::new("memory://", connector.clone());

        let caller = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.connection().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        caller.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(cache.is_connected().await, "attempt should finish without any waiter");

        cache.connection().await.unwrap();
        assert_eq!(connector.calls(), 1);
    }
}
