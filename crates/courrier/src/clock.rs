//! Time source for ids and timestamps
//!
//! Stores take their clock as a dependency so tests can drive time
//! explicitly instead of racing the wall clock.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::RwLock;

/// Source of "now" for courrier creation and updates
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock, truncated to millisecond precision
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        truncate_to_millis(Utc::now())
    }
}

/// Manually driven clock for tests and deterministic tooling
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `start` (truncated to milliseconds)
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(truncate_to_millis(start)),
        }
    }

    /// Create a clock frozen at the given Unix milliseconds
    pub fn at_millis(millis: i64) -> Self {
        let start = Utc
            .timestamp_millis_opt(millis)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        Self::new(start)
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.write() {
            *now = truncate_to_millis(*now + by);
        }
    }

    /// Move the clock forward by whole milliseconds
    pub fn advance_millis(&self, millis: i64) {
        self.advance(Duration::milliseconds(millis));
    }

    pub fn set(&self, at: DateTime<Utc>) {
        if let Ok(mut now) = self.now.write() {
            *now = truncate_to_millis(at);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.read().map(|now| *now).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

/// Drop sub-millisecond precision so stored timestamps round-trip exactly
pub fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(at.timestamp_millis())
        .single()
        .unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_system_clock_has_millisecond_precision() {
        let now = SystemClock.now();
        assert_eq!(now.nanosecond() % 1_000_000, 0);
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::at_millis(1_000);
        assert_eq!(clock.now().timestamp_millis(), 1_000);

        clock.advance_millis(5);
        assert_eq!(clock.now().timestamp_millis(), 1_005);

        clock.advance(Duration::seconds(1));
        assert_eq!(clock.now().timestamp_millis(), 2_005);
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::at_millis(0);
        let target = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        clock.set(target);
        assert_eq!(clock.now(), target);
    }
}
