use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::ApiError;
use crate::events::CacheEvent;

/// Cache tag provided by queries and invalidated by mutations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    UserIdentity,
    CurrentAlbum,
    DiscogsIdentity,
}

/// Cache key: endpoint name plus its serialized argument, if any.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryKey {
    endpoint: &'static str,
    arg: Option<String>,
}

impl QueryKey {
    pub fn new(endpoint: &'static str) -> Self {
        QueryKey {
            endpoint,
            arg: None,
        }
    }

    pub fn with_arg(endpoint: &'static str, arg: impl Into<String>) -> Self {
        QueryKey {
            endpoint,
            arg: Some(arg.into()),
        }
    }

    pub fn endpoint(&self) -> &'static str {
        self.endpoint
    }
}

struct Entry {
    value: Value,
    provides: Vec<Tag>,
    stale: bool,
}

/// Point-in-time view of one cached query, for derived view state.
#[derive(Debug, Clone, Default)]
pub struct QuerySnapshot {
    pub data: Option<Value>,
    pub is_fetching: bool,
}

/// Reversible optimistic write. Holds the exact value the entry had before
/// the patch; `undo` puts it back. Patching an endpoint that has never
/// cached anything records a no-op, and undoing it is a no-op too.
pub struct OptimisticPatch {
    key: QueryKey,
    previous: Option<Value>,
}

impl OptimisticPatch {
    /// Restore the pre-patch value.
    pub fn undo(self, cache: &QueryCache) {
        if let Some(previous) = self.previous {
            debug!("rolling back optimistic write to {}", self.key.endpoint);
            let mut entries = cache.entries.lock().unwrap();
            if let Some(entry) = entries.get_mut(&self.key) {
                entry.value = previous;
            }
        }
    }
}

/// Cache of query results keyed by endpoint+argument, with tag
/// invalidation and deduplication of identical in-flight fetches. Only the
/// request pipeline and the declared mutation side effects write here.
pub struct QueryCache {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    in_flight: Mutex<HashSet<QueryKey>>,
    fetch_locks: Mutex<HashMap<QueryKey, Arc<tokio::sync::Mutex<()>>>>,
    events: broadcast::Sender<CacheEvent>,
}

impl QueryCache {
    pub fn new(events: broadcast::Sender<CacheEvent>) -> Self {
        QueryCache {
            entries: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashSet::new()),
            fetch_locks: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Return the cached value when fresh; otherwise run `fetch` and cache
    /// its result. Concurrent callers for the same key share one request:
    /// the first in line fetches, the rest observe the cached outcome.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: QueryKey,
        provides: &[Tag],
        fetch: F,
    ) -> Result<Value, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Value, ApiError>>,
    {
        if let Some(value) = self.fresh_value(&key) {
            return Ok(value);
        }

        let lock = self.fetch_lock(&key);
        let _guard = lock.lock().await;

        // A queued caller finds the winner's result already cached.
        if let Some(value) = self.fresh_value(&key) {
            return Ok(value);
        }

        self.in_flight.lock().unwrap().insert(key.clone());
        let result = fetch().await;
        self.in_flight.lock().unwrap().remove(&key);

        match result {
            Ok(value) => {
                self.insert(key, provides, value.clone());
                Ok(value)
            }
            // Failures are not cached; a stale entry, if any, stays stale.
            Err(err) => Err(err),
        }
    }

    /// Write a value directly, bypassing any fetch. Creates the entry when
    /// the query has never run.
    pub fn upsert(&self, key: QueryKey, provides: &[Tag], value: Value) {
        self.insert(key, provides, value);
    }

    /// Mark every entry providing one of `tags` stale, forcing a refetch
    /// on next access.
    pub fn invalidate(&self, tags: &[Tag]) {
        {
            let mut entries = self.entries.lock().unwrap();
            for entry in entries.values_mut() {
                if entry.provides.iter().any(|t| tags.contains(t)) {
                    entry.stale = true;
                }
            }
        }
        for tag in tags {
            let _ = self.events.send(CacheEvent::TagInvalidated { tag: *tag });
        }
    }

    /// Apply a speculative edit to the cached value, returning the
    /// rollback handle.
    pub fn apply_patch(
        &self,
        key: &QueryKey,
        edit: impl FnOnce(&mut Value),
    ) -> OptimisticPatch {
        let mut entries = self.entries.lock().unwrap();
        match entries.get_mut(key) {
            Some(entry) => {
                let previous = entry.value.clone();
                edit(&mut entry.value);
                OptimisticPatch {
                    key: key.clone(),
                    previous: Some(previous),
                }
            }
            None => OptimisticPatch {
                key: key.clone(),
                previous: None,
            },
        }
    }

    pub fn snapshot(&self, key: &QueryKey) -> QuerySnapshot {
        let data = self
            .entries
            .lock()
            .unwrap()
            .get(key)
            .map(|entry| entry.value.clone());
        let is_fetching = self.in_flight.lock().unwrap().contains(key);
        QuerySnapshot { data, is_fetching }
    }

    fn fresh_value(&self, key: &QueryKey) -> Option<Value> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(key)
            .filter(|entry| !entry.stale)
            .map(|entry| entry.value.clone())
    }

    fn insert(&self, key: QueryKey, provides: &[Tag], value: Value) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key,
            Entry {
                value,
                provides: provides.to_vec(),
                stale: false,
            },
        );
    }

    fn fetch_lock(&self, key: &QueryKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.fetch_locks.lock().unwrap();
        locks.entry(key.clone()).or_default().clone()
    }
}
