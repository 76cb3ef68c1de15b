//! Wall-clock source for timestamps and tier expiry
//!
//! Tiers never call `Utc::now()` directly; they ask a [`Clock`]. Production
//! code uses [`SystemClock`], tests drive expiry boundaries with
//! [`ManualClock`].

use chrono::{DateTime, Duration, Utc};
use std::fmt::Debug;
use std::sync::{Mutex, PoisonError};

/// Source of the current UTC time
pub trait Clock: Debug + Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock.
///
/// Time only moves when told to, and never backwards.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`
    pub fn at(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Move the clock forward by `delta`. Negative deltas are ignored.
    pub fn advance(&self, delta: Duration) -> DateTime<Utc> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if delta > Duration::zero() {
            *current += delta;
        }
        *current
    }

    /// Jump to `instant` if it is not in the past.
    pub fn set(&self, instant: DateTime<Utc>) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if instant >= *current {
            *current = instant;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::at(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::at(epoch());
        assert_eq!(clock.now(), epoch());

        clock.advance(Duration::minutes(10));
        assert_eq!(clock.now(), epoch() + Duration::minutes(10));
    }

    #[test]
    fn test_manual_clock_never_goes_backwards() {
        let clock = ManualClock::at(epoch());
        clock.advance(Duration::seconds(-5));
        assert_eq!(clock.now(), epoch());

        clock.set(epoch() - Duration::hours(1));
        assert_eq!(clock.now(), epoch());

        clock.set(epoch() + Duration::hours(1));
        assert_eq!(clock.now(), epoch() + Duration::hours(1));
    }
}
