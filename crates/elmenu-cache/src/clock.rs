//! Wall-clock seam for expiry decisions.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of the current time.
///
/// Expiry checks go through a `Clock` so tests can move time forward
/// without sleeping.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> SystemTime;

    /// Current time as milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64 {
        to_millis(self.now())
    }
}

/// [`Clock`] backed by [`SystemTime::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// [`Clock`] that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    #[must_use]
    pub fn new(start: SystemTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(UNIX_EPOCH + Duration::from_secs(1_700_000_000))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Milliseconds since the Unix epoch, saturating at the bounds.
pub(crate) fn to_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Expiry timestamp for an entry written at `now`, saturating instead of
/// overflowing for very long ttls.
pub(crate) fn expiry_millis(now: SystemTime, ttl: Duration) -> u64 {
    now.checked_add(ttl).map_or(u64::MAX, to_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(UNIX_EPOCH);
        assert_eq!(clock.now_millis(), 0);

        clock.advance(Duration::from_millis(1500));
        assert_eq!(clock.now_millis(), 1500);
    }

    #[test]
    fn test_to_millis_before_epoch_saturates() {
        let before = UNIX_EPOCH - Duration::from_secs(10);
        assert_eq!(to_millis(before), 0);
    }

    #[test]
    fn test_expiry_millis_saturates_on_huge_ttl() {
        let now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        assert_eq!(expiry_millis(now, Duration::from_secs(u64::MAX)), u64::MAX);
        assert_eq!(expiry_millis(now, Duration::from_secs(1)), 1_700_000_001_000);
    }
}
