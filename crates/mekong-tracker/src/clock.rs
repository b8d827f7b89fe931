//! Time source for record timestamps and identifiers.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

/// Source of "now" for the trackers.
pub trait Clock: Send + Sync + fmt::Debug {
    /// The current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Useful for tests and for replaying submissions with known timestamps.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    /// Jump to an absolute time.
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Allocate a millisecond identifier for a record created at `now`.
///
/// Identifiers are strictly increasing: if `newest` is not older than `now`
/// the result is `newest + 1`. Returns `None` when `newest` is already
/// `i64::MAX` and no larger identifier exists.
#[must_use]
pub fn next_id(now: DateTime<Utc>, newest: Option<i64>) -> Option<i64> {
    let millis = now.timestamp_millis();
    match newest {
        Some(prev) if prev >= millis => prev.checked_add(1),
        _ => Some(millis),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_manual_clock_is_frozen() {
        let clock = ManualClock::new(start());
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now(), start());
    }

    #[test]
    fn test_manual_clock_advance_and_set() {
        let clock = ManualClock::new(start());
        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now(), start() + Duration::seconds(90));

        clock.set(start());
        assert_eq!(clock.now(), start());
    }

    #[test]
    fn test_system_clock_moves_forward() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn test_next_id_uses_timestamp() {
        let now = start();
        assert_eq!(next_id(now, None), Some(now.timestamp_millis()));
        assert_eq!(next_id(now, Some(0)), Some(now.timestamp_millis()));
    }

    #[test]
    fn test_next_id_bumps_past_collision() {
        let now = start();
        let ms = now.timestamp_millis();
        assert_eq!(next_id(now, Some(ms)), Some(ms + 1));
        assert_eq!(next_id(now, Some(ms + 10)), Some(ms + 11));
    }

    #[test]
    fn test_next_id_exhausted_at_max() {
        assert_eq!(next_id(start(), Some(i64::MAX)), None);
        assert_eq!(next_id(start(), Some(i64::MAX - 1)), Some(i64::MAX));
    }
}
