use crate::cache::QueryResult;
use crate::key::CacheKey;
use serde_json::Value;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Live view of one cache key.
///
/// Holding the subscription is what keeps a key "observed": it receives
/// every loading and settled state, is considered by focus refetches, and
/// protects the entry from eviction. Drop it to unsubscribe.
pub struct QuerySubscription {
    key: CacheKey,
    rx: watch::Receiver<QueryResult<Value>>,
}

impl QuerySubscription {
    pub(crate) fn new(key: CacheKey, rx: watch::Receiver<QueryResult<Value>>) -> Self {
        Self { key, rx }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn current(&self) -> QueryResult<Value> {
        self.rx.borrow().clone()
    }

    /// Waits for the next state change. `None` once the entry is dropped
    /// from the cache.
    pub async fn changed(&mut self) -> Option<QueryResult<Value>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Waits until the key holds data or an error with nothing in flight.
    pub async fn settled(&mut self) -> Option<QueryResult<Value>> {
        loop {
            {
                let current = self.rx.borrow_and_update();
                if current.is_settled() {
                    return Some(current.clone());
                }
            }
            self.rx.changed().await.ok()?;
        }
    }

    pub fn into_stream(self) -> WatchStream<QueryResult<Value>> {
        WatchStream::new(self.rx)
    }
}
