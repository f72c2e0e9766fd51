// ⏰ Clock - time must be explicit
//
// Every timestamp in the lot (entry, exit, billing) comes from a Clock.
// Production uses the wall clock, tests drive a ManualClock forward.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, RwLock};

/// Source of "now" for the lot
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
///
/// Clones share the same instant, so a test can keep one handle and give
/// another to the lot.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        ManualClock {
            current: Arc::new(RwLock::new(start)),
        }
    }

    /// Move the clock forward (or backward, for a negative duration)
    pub fn advance(&self, by: Duration) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.read().unwrap_or_else(|e| e.into_inner())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_manual_clock_advances() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        let shared = clock.clone();

        clock.advance(Duration::seconds(90));

        assert_eq!(shared.now(), start + Duration::seconds(90));
    }

    #[test]
    fn test_manual_clock_set() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2025, 3, 1, 18, 30, 0).unwrap();
        let clock = ManualClock::new(start);

        clock.set(later);

        assert_eq!(clock.now(), later);
    }
}
