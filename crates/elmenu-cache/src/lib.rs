//! Expiring key-value cache abstraction for elmenu.
//!
//! This crate decouples cache consumers (the menu cache layer and the error
//! rate limiter) from the underlying storage mechanism. Two traits form the
//! core API:
//!
//! - [`Cache`]: Factory for named cache buckets
//! - [`CacheBucket`]: Key-value store where every entry carries a time-to-live
//!
//! # Implementations
//!
//! - [`NullCache`] / [`NullCacheBucket`]: No-op implementations (always miss)
//! - [`MemoryCache`]: In-process implementation, shared between bucket handles
//! - [`FileCache`]: File-based implementation with version validation
//!
//! Unlike a plain memoization map, every operation reports failures through
//! [`CacheError`]. Callers decide how to degrade: the menu layer rebuilds, the
//! rate limiter switches to its in-process fallback.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use elmenu_cache::{Cache, CacheBucket, NullCache};
//!
//! let cache = NullCache;
//! let bucket = cache.bucket("menu");
//! bucket.set("MENU_en", b"[]", Duration::from_secs(300)).unwrap();
//! assert_eq!(bucket.get("MENU_en").unwrap(), None); // NullCache always misses
//! ```

mod clock;
mod ext;
mod file;
mod memory;

use std::time::Duration;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ext::CacheBucketExt;
pub use file::FileCache;
pub use memory::MemoryCache;

/// Error raised by a cache backend.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// I/O error talking to the backend.
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Backend refused or could not serve the request.
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// A named partition within a [`Cache`].
///
/// Entries are stored with a time-to-live. Once the ttl has elapsed the entry
/// reads as a miss, so storing a key again after expiry behaves like storing
/// a brand new key.
pub trait CacheBucket: Send + Sync {
    /// Retrieve a cached value.
    ///
    /// Returns `Ok(None)` on miss or when the entry has expired.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store a value that expires after `ttl`.
    ///
    /// Overwrites any existing entry for the same key. A zero `ttl` stores an
    /// entry that is already expired.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the backend cannot be written.
    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError>;

    /// Remove an entry. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the backend cannot be written.
    fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Check that the bucket actually stores data.
    ///
    /// Writes `check_key` with a one second ttl and reads it back. Returns
    /// `false` when either operation fails or the value does not round-trip,
    /// which is the case for [`NullCacheBucket`].
    fn is_responsive(&self, check_key: &str) -> bool {
        if let Err(e) = self.set(check_key, b"1", Duration::from_secs(1)) {
            tracing::debug!(error = %e, "cache health check write failed");
            return false;
        }
        matches!(self.get(check_key), Ok(Some(value)) if value == b"1")
    }
}

/// Factory for named cache [`CacheBucket`]s.
///
/// A `Cache` produces buckets that are logically isolated from each other.
/// For example, a file-based cache stores each bucket in a separate
/// subdirectory.
pub trait Cache: Send + Sync {
    /// Open or create a named bucket.
    ///
    /// Calling `bucket` multiple times with the same name may return
    /// independent handles that share the same underlying storage.
    ///
    /// # Arguments
    ///
    /// * `name` - Bucket name (e.g., "menu", "errors")
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket>;
}

/// No-op [`CacheBucket`] that never stores or retrieves data.
///
/// Every `get` returns `Ok(None)`; every `set` is silently discarded.
pub struct NullCacheBucket;

impl CacheBucket for NullCacheBucket {
    fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }
}

/// No-op [`Cache`] that always returns [`NullCacheBucket`]s.
///
/// Use when caching is disabled.
pub struct NullCache;

impl Cache for NullCache {
    fn bucket(&self, _name: &str) -> Box<dyn CacheBucket> {
        Box::new(NullCacheBucket)
    }
}
