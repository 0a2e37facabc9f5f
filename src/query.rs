//! Pull-based query cache with explicit invalidation
//!
//! Readers call [`QueryCache::fetch`] with a key and a fetcher. The first call
//! (or the first call after an invalidation) runs the fetcher and keeps the
//! result; later calls get the cached copy. Writers call
//! [`QueryCache::invalidate`] after changing the underlying data, which bumps
//! the entry's generation so subscribers know to read again.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::watch;

struct QueryEntry<T> {
    value: Option<T>,
    fetched_at: Option<Instant>,
    valid: bool,
    generation: watch::Sender<u64>,
}

impl<T> QueryEntry<T> {
    fn empty() -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            value: None,
            fetched_at: None,
            valid: false,
            generation,
        }
    }

    fn is_fresh(&self, stale_time: Option<Duration>) -> bool {
        if !self.valid || self.value.is_none() {
            return false;
        }
        match (stale_time, self.fetched_at) {
            (None, _) => true,
            (Some(max_age), Some(fetched_at)) => fetched_at.elapsed() <= max_age,
            (Some(_), None) => false,
        }
    }

    fn bump(&self) {
        self.generation.send_modify(|g| *g += 1);
    }
}

/// Keyed cache of query results
///
/// `stale_time` bounds how long a fetched value is served before the fetcher
/// runs again; `None` keeps values until they are invalidated.
pub struct QueryCache<T> {
    entries: Mutex<HashMap<String, QueryEntry<T>>>,
    stale_time: Option<Duration>,
}

impl<T: Clone> QueryCache<T> {
    /// Creates a cache whose entries expire after `stale_time`
    pub fn new(stale_time: Option<Duration>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            stale_time,
        }
    }

    /// Creates a cache whose entries only change through invalidation
    pub fn never_stale() -> Self {
        Self::new(None)
    }

    /// Returns the cached value for `key`, running `fetcher` if it is missing,
    /// invalidated or stale
    ///
    /// The fetcher runs under the cache lock and must not call back into this
    /// cache.
    pub fn fetch<F>(&self, key: &str, fetcher: F) -> T
    where
        F: FnOnce() -> T,
    {
        let mut entries = self.entries.lock();
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(QueryEntry::empty);

        if entry.is_fresh(self.stale_time) {
            if let Some(value) = &entry.value {
                return value.clone();
            }
        }

        tracing::trace!(key, "Query cache miss, fetching");
        let value = fetcher();
        entry.value = Some(value.clone());
        entry.fetched_at = Some(Instant::now());
        entry.valid = true;
        value
    }

    /// Returns the cached value without fetching, even if it has been invalidated
    pub fn peek(&self, key: &str) -> Option<T> {
        self.entries.lock().get(key).and_then(|e| e.value.clone())
    }

    /// Stores a known-fresh value and notifies subscribers
    pub fn set(&self, key: &str, value: T) {
        let mut entries = self.entries.lock();
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(QueryEntry::empty);
        entry.value = Some(value);
        entry.fetched_at = Some(Instant::now());
        entry.valid = true;
        entry.bump();
    }

    /// Marks `key` as needing a refetch and notifies subscribers
    pub fn invalidate(&self, key: &str) {
        let mut entries = self.entries.lock();
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(QueryEntry::empty);
        entry.valid = false;
        entry.bump();
        tracing::debug!(key, generation = *entry.generation.borrow(), "Query invalidated");
    }

    /// Subscribes to changes of `key`
    ///
    /// The receiver holds a generation number that increases every time the
    /// entry is invalidated or set.
    pub fn subscribe(&self, key: &str) -> watch::Receiver<u64> {
        let mut entries = self.entries.lock();
        entries
            .entry(key.to_string())
            .or_insert_with(QueryEntry::empty)
            .generation
            .subscribe()
    }

    /// Current generation of `key` (0 if it has never changed)
    pub fn generation(&self, key: &str) -> u64 {
        self.entries
            .lock()
            .get(key)
            .map(|e| *e.generation.borrow())
            .unwrap_or(0)
    }
}

impl<T: Clone> Default for QueryCache<T> {
    fn default() -> Self {
        Self::never_stale()
    }
}
