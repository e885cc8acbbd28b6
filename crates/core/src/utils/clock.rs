//! Injectable wall-clock source.
//!
//! Every time-based guard in the engine (lifecycle transitions, the 48h
//! deposit window, health sampling) reads the clock through this trait so
//! tests can pin or advance time deterministically.

use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

/// Wall-clock source.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests.
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Pins the clock to a new instant.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write().unwrap() = now;
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().unwrap();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_set_and_advance() {
        let start = Utc::now();
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::hours(2));
        assert_eq!(clock.now(), start + Duration::hours(2));

        let later = start + Duration::days(1);
        clock.set(later);
        assert_eq!(clock.now(), later);
    }
}
