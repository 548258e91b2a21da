//! Time source abstraction.
//!
//! Every age-dependent computation (decay, recency, retention scoring) reads
//! the current time through a [`Clock`] so tests can drive time explicitly.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
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

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    /// Move the clock forward by a (possibly fractional) number of days.
    pub fn advance_days(&self, days: f64) {
        #[allow(clippy::cast_possible_truncation)]
        let millis = (days * 86_400_000.0).round() as i64;
        self.advance(Duration::milliseconds(millis));
    }

    /// Jump to an absolute time.
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Fractional days between `earlier` and `later`, never negative.
#[must_use]
pub fn days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let millis = (later - earlier).num_milliseconds() as f64;
    (millis / 86_400_000.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let start = Utc::now();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);
        clock.advance_days(1.5);
        let elapsed = days_between(start, clock.now());
        assert!((elapsed - 1.5).abs() < 1e-9);
    }

    #[test]
    fn days_between_is_clamped() {
        let now = Utc::now();
        let later = now + Duration::days(3);
        assert!((days_between(now, later) - 3.0).abs() < 1e-9);
        assert!(days_between(later, now).abs() < f64::EPSILON);
    }
}
