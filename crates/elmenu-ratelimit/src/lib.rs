//! Rate-limited deduplication of repeated error reports.
//!
//! [`RateLimitFilter`] decides whether an error report should go out. A
//! report is identified by the SHA-256 of its fully formatted trace; the same
//! trace seen again within the configured window is suppressed.
//!
//! Seen traces are tracked in a shared [`CacheBucket`] when one is configured
//! and answers a health check. Otherwise the filter keeps its own bounded table,
//! evicting the oldest traces first. Either way the filter only ever answers
//! permit or suppress.
//!
//! [`DedupFilter`] plugs the same decision into a `tracing_subscriber` layer
//! for ERROR events.
//!
//! # Example
//!
//! ```
//! use elmenu_ratelimit::{RateLimitConfig, RateLimitFilter};
//!
//! let filter = RateLimitFilter::new(RateLimitConfig::default());
//! assert!(filter.permit("boom"));
//! assert!(!filter.permit("boom"));
//! assert!(filter.permit("bang"));
//! ```

mod layer;

use std::error::Error;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use indexmap::IndexMap;
use sha2::{Digest, Sha256};

use elmenu_cache::{CacheBucket, CacheError, Clock, SystemClock};

pub use layer::DedupFilter;

/// Value stored under a trace key in the shared cache.
const SEEN: &[u8] = b"1";

/// Rate limiting settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// How long a trace stays suppressed. Zero disables deduplication.
    pub window: Duration,
    /// Maximum number of traces tracked without a shared cache.
    pub max_keys: usize,
    /// Prefix of shared cache keys; also used as the health check key.
    pub cache_prefix: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(10),
            max_keys: 100,
            cache_prefix: "ERROR_RATE".to_owned(),
        }
    }
}

/// Suppresses repeats of the same error trace within a time window.
///
/// Owns its fallback table, so every filter instance starts empty. Call
/// [`RateLimitFilter::reset`] to forget everything seen so far.
pub struct RateLimitFilter {
    config: RateLimitConfig,
    cache: Option<Box<dyn CacheBucket>>,
    clock: Arc<dyn Clock>,
    /// Trace hash -> first time seen within the current window, oldest first.
    seen: Mutex<IndexMap<String, SystemTime>>,
}

impl RateLimitFilter {
    /// Create a filter without a shared cache, on the system clock.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            cache: None,
            clock: Arc::new(SystemClock),
            seen: Mutex::new(IndexMap::new()),
        }
    }

    /// Track traces in a shared cache while it stays responsive.
    #[must_use]
    pub fn with_cache(mut self, cache: Box<dyn CacheBucket>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Use `clock` for the fallback table.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Current settings.
    #[must_use]
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Whether a report with this formatted trace should go out.
    ///
    /// Returns `false` when the same trace was permitted within the window.
    pub fn permit(&self, trace: &str) -> bool {
        if self.config.window.is_zero() {
            return true;
        }

        let hash = trace_hash(trace);

        if let Some(cache) = self.responsive_cache() {
            match self.seen_in_cache(cache, &hash) {
                Ok(duplicate) => return !duplicate,
                Err(e) => {
                    tracing::debug!(error = %e, "Rate limit cache failed, using local table");
                }
            }
        }

        !self.seen_locally(&hash)
    }

    /// [`RateLimitFilter::permit`] for the trace of `err`.
    pub fn permit_error(&self, err: &(dyn Error + 'static)) -> bool {
        self.permit(&format_trace(err))
    }

    /// Forget every trace tracked in the local table.
    pub fn reset(&self) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of traces in the local table.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn responsive_cache(&self) -> Option<&dyn CacheBucket> {
        let cache = self.cache.as_deref()?;
        cache
            .is_responsive(&self.config.cache_prefix)
            .then_some(cache)
    }

    /// Check and refresh `hash` in the shared cache.
    ///
    /// Every sighting restarts the window.
    fn seen_in_cache(&self, cache: &dyn CacheBucket, hash: &str) -> Result<bool, CacheError> {
        let key = format!("{}_{hash}", self.config.cache_prefix);
        let duplicate = cache.get(&key)?.as_deref() == Some(SEEN);
        cache.set(&key, SEEN, self.config.window)?;
        Ok(duplicate)
    }

    /// Check `hash` against the local table, recording it if new.
    fn seen_locally(&self, hash: &str) -> bool {
        let now = self.clock.now();
        let window = self.config.window;
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);

        seen.retain(|_, at| now.duration_since(*at).map_or(true, |age| age < window));
        if seen.contains_key(hash) {
            return true;
        }

        seen.insert(hash.to_owned(), now);
        while seen.len() > self.config.max_keys {
            seen.shift_remove_index(0);
        }
        false
    }
}

/// SHA-256 of a formatted trace, hex encoded.
#[must_use]
pub fn trace_hash(trace: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(trace.as_bytes());
    hex::encode(hasher.finalize())
}

/// Render an error and its chain of sources, one per line.
///
/// ```
/// use elmenu_ratelimit::format_trace;
///
/// let err = std::io::Error::other("disk on fire");
/// assert_eq!(format_trace(&err), "disk on fire");
/// ```
#[must_use]
pub fn format_trace(err: &(dyn Error + 'static)) -> String {
    let mut trace = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(trace, "\nCaused by: {cause}");
        source = cause.source();
    }
    trace
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use elmenu_cache::{Cache, ManualClock, MemoryCache, NullCache};
    use pretty_assertions::assert_eq;

    use super::*;

    static_assertions::assert_impl_all!(RateLimitFilter: Send, Sync);

    fn local_filter(config: RateLimitConfig) -> (RateLimitFilter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let filter = RateLimitFilter::new(config).with_clock(Arc::clone(&clock) as Arc<dyn Clock>);
        (filter, clock)
    }

    #[derive(Debug)]
    struct Wrapped {
        message: &'static str,
        source: Option<Box<Wrapped>>,
    }

    impl fmt::Display for Wrapped {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.message)
        }
    }

    impl Error for Wrapped {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            self.source.as_deref().map(|s| s as &(dyn Error + 'static))
        }
    }

    /// Bucket that answers the health check but fails for every other key.
    struct FlakyBucket {
        inner: Box<dyn CacheBucket>,
        check_key: String,
    }

    impl CacheBucket for FlakyBucket {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            if key == self.check_key {
                self.inner.get(key)
            } else {
                Err(CacheError::Unavailable("flaky".to_owned()))
            }
        }

        fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
            self.inner.set(key, value, ttl)
        }

        fn delete(&self, key: &str) -> Result<(), CacheError> {
            self.inner.delete(key)
        }
    }

    #[test]
    fn test_trace_hash_is_sha256_hex() {
        assert_eq!(
            trace_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(trace_hash("a"), trace_hash("a"));
        assert_ne!(trace_hash("a"), trace_hash("b"));
    }

    #[test]
    fn test_format_trace_includes_sources() {
        let err = Wrapped {
            message: "render failed",
            source: Some(Box::new(Wrapped {
                message: "store unavailable",
                source: Some(Box::new(Wrapped {
                    message: "connection refused",
                    source: None,
                })),
            })),
        };

        assert_eq!(
            format_trace(&err),
            "render failed\nCaused by: store unavailable\nCaused by: connection refused"
        );
    }

    #[test]
    fn test_duplicate_within_window_is_suppressed() {
        let (filter, clock) = local_filter(RateLimitConfig::default());

        assert!(filter.permit("trace"));
        clock.advance(Duration::from_secs(9));
        assert!(!filter.permit("trace"));
    }

    #[test]
    fn test_trace_is_new_again_after_window() {
        let (filter, clock) = local_filter(RateLimitConfig::default());

        assert!(filter.permit("trace"));
        clock.advance(Duration::from_secs(10));
        assert!(filter.permit("trace"));
        assert!(!filter.permit("trace"));
    }

    #[test]
    fn test_local_window_is_not_extended_by_duplicates() {
        let (filter, clock) = local_filter(RateLimitConfig::default());

        assert!(filter.permit("trace"));
        clock.advance(Duration::from_secs(6));
        assert!(!filter.permit("trace"));
        clock.advance(Duration::from_secs(6));
        assert!(filter.permit("trace"));
    }

    #[test]
    fn test_zero_window_permits_everything() {
        let (filter, _clock) = local_filter(RateLimitConfig {
            window: Duration::ZERO,
            ..RateLimitConfig::default()
        });

        assert!(filter.permit("trace"));
        assert!(filter.permit("trace"));
        assert_eq!(filter.tracked(), 0);
    }

    #[test]
    fn test_bounded_table_evicts_oldest_first() {
        let (filter, clock) = local_filter(RateLimitConfig {
            max_keys: 3,
            ..RateLimitConfig::default()
        });

        for trace in ["a", "b", "c", "d"] {
            assert!(filter.permit(trace));
            clock.advance(Duration::from_millis(10));
        }

        assert_eq!(filter.tracked(), 3);
        assert!(!filter.permit("d"));
        assert!(!filter.permit("b"));
        // Evicted, so treated as new
        assert!(filter.permit("a"));
    }

    #[test]
    fn test_default_bound_is_one_hundred() {
        let (filter, _clock) = local_filter(RateLimitConfig::default());

        for n in 0..=100 {
            assert!(filter.permit(&format!("trace {n}")));
        }

        assert_eq!(filter.tracked(), 100);
        assert!(filter.permit("trace 0"));
        assert!(!filter.permit("trace 100"));
    }

    #[test]
    fn test_reset_forgets_traces() {
        let (filter, _clock) = local_filter(RateLimitConfig::default());
        assert!(filter.permit("trace"));

        filter.reset();

        assert_eq!(filter.tracked(), 0);
        assert!(filter.permit("trace"));
    }

    #[test]
    fn test_permit_error_uses_full_trace() {
        let (filter, _clock) = local_filter(RateLimitConfig::default());
        let outer = |cause: &'static str| Wrapped {
            message: "render failed",
            source: Some(Box::new(Wrapped {
                message: cause,
                source: None,
            })),
        };

        assert!(filter.permit_error(&outer("timeout")));
        assert!(filter.permit_error(&outer("refused")));
        assert!(!filter.permit_error(&outer("timeout")));
    }

    #[test]
    fn test_shared_cache_tracks_traces() {
        let clock = Arc::new(ManualClock::default());
        let cache = MemoryCache::with_clock(Arc::clone(&clock) as Arc<dyn Clock>);
        let filter = RateLimitFilter::new(RateLimitConfig::default())
            .with_cache(cache.bucket("errors"))
            .with_clock(Arc::clone(&clock) as Arc<dyn Clock>);

        assert!(filter.permit("trace"));
        assert!(!filter.permit("trace"));
        assert_eq!(filter.tracked(), 0);

        let key = format!("ERROR_RATE_{}", trace_hash("trace"));
        assert_eq!(
            cache.bucket("errors").get(&key).unwrap(),
            Some(b"1".to_vec())
        );

        clock.advance(Duration::from_secs(10));
        assert!(filter.permit("trace"));
    }

    #[test]
    fn test_shared_cache_is_visible_to_other_filters() {
        let cache = MemoryCache::new();
        let first = RateLimitFilter::new(RateLimitConfig::default()).with_cache(cache.bucket("errors"));
        let second = RateLimitFilter::new(RateLimitConfig::default()).with_cache(cache.bucket("errors"));

        assert!(first.permit("trace"));
        assert!(!second.permit("trace"));
    }

    #[test]
    fn test_unresponsive_cache_falls_back_to_table() {
        let (filter, _clock) = local_filter(RateLimitConfig::default());
        let filter = filter.with_cache(NullCache.bucket("errors"));

        assert!(filter.permit("trace"));
        assert!(!filter.permit("trace"));
        assert_eq!(filter.tracked(), 1);
    }

    #[test]
    fn test_cache_error_after_health_check_falls_back_to_table() {
        let (filter, _clock) = local_filter(RateLimitConfig::default());
        let filter = filter.with_cache(Box::new(FlakyBucket {
            inner: MemoryCache::new().bucket("errors"),
            check_key: "ERROR_RATE".to_owned(),
        }));

        assert!(filter.permit("trace"));
        assert!(!filter.permit("trace"));
        assert_eq!(filter.tracked(), 1);
    }

    #[test]
    fn test_huge_window_with_shared_cache_suppresses_duplicates() {
        let clock = Arc::new(ManualClock::default());
        let cache = MemoryCache::with_clock(Arc::clone(&clock) as Arc<dyn Clock>);
        let filter = RateLimitFilter::new(RateLimitConfig {
            window: Duration::from_secs(u64::MAX),
            ..RateLimitConfig::default()
        })
        .with_cache(cache.bucket("errors"))
        .with_clock(Arc::clone(&clock) as Arc<dyn Clock>);

        assert!(filter.permit("trace"));
        clock.advance(Duration::from_secs(365 * 24 * 3600));
        assert!(!filter.permit("trace"));
    }
}
