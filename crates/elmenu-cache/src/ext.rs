//! Extension trait for [`CacheBucket`] with typed convenience methods.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::CacheBucket;

/// Typed convenience methods for [`CacheBucket`].
///
/// Keeps [`CacheBucket`] object-safe and free of serde while giving callers
/// JSON access through a blanket impl. Backend failures are logged at debug
/// level and reported as a miss, since every caller treats the cache as
/// optional.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use elmenu_cache::{Cache, CacheBucketExt, MemoryCache};
///
/// let cache = MemoryCache::new();
/// let bucket = cache.bucket("menu");
///
/// bucket.set_json("MENU_en", &vec!["Home", "About"], Duration::from_secs(300));
/// let names: Option<Vec<String>> = bucket.get_json("MENU_en");
/// assert_eq!(names, Some(vec!["Home".to_owned(), "About".to_owned()]));
/// ```
pub trait CacheBucketExt: CacheBucket {
    /// Retrieve a JSON-deserialized value from the cache.
    ///
    /// Returns `None` on miss, expiry, backend error, or deserialization failure.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.get(key) {
            Ok(bytes) => bytes?,
            Err(e) => {
                tracing::debug!(key, error = %e, "cache read failed");
                return None;
            }
        };
        serde_json::from_slice(&bytes).ok()
    }

    /// Store a value as JSON in the cache.
    ///
    /// Returns `true` when the value was handed to the backend successfully.
    fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        let Ok(bytes) = serde_json::to_vec(value) else {
            return false;
        };
        match self.set(key, &bytes, ttl) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(key, error = %e, "cache write failed");
                false
            }
        }
    }
}

impl<B: CacheBucket + ?Sized> CacheBucketExt for B {}
