//! In-process cache implementation.
//!
//! [`MemoryCache`] keeps entries in a map per bucket. Handles for the same
//! bucket name share storage, so a value written through one handle is
//! visible through another. Expired entries are dropped lazily on read and
//! swept on every write.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::clock::{Clock, SystemClock, expiry_millis, to_millis};
use crate::{Cache, CacheBucket, CacheError};

type Entries = Arc<Mutex<HashMap<String, Entry>>>;

struct Entry {
    value: Vec<u8>,
    expires_at_ms: u64,
}

impl Entry {
    fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }
}

/// In-process [`Cache`] with per-entry expiry.
pub struct MemoryCache {
    buckets: Mutex<HashMap<String, Entries>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    /// Create an empty cache driven by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty cache driven by `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            clock,
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache for MemoryCache {
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket> {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        let entries = buckets.entry(name.to_owned()).or_default();
        Box::new(MemoryCacheBucket {
            entries: Arc::clone(entries),
            clock: Arc::clone(&self.clock),
        })
    }
}

struct MemoryCacheBucket {
    entries: Entries,
    clock: Arc<dyn Clock>,
}

impl CacheBucket for MemoryCacheBucket {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now_ms = self.clock.now_millis();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            Some(entry) if entry.is_expired(now_ms) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let now = self.clock.now();
        let now_ms = to_millis(now);
        let expires_at_ms = expiry_millis(now, ttl);

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, entry| !entry.is_expired(now_ms));
        entries.insert(
            key.to_owned(),
            Entry {
                value: value.to_vec(),
                expires_at_ms,
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}
