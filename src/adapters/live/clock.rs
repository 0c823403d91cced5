//! Live clock using the system clock.

use chrono::{DateTime, SubsecRound, Utc};

use crate::ports::clock::Clock;

/// Live clock that returns the real current time at millisecond precision.
///
/// Persisted timestamps are rendered with millisecond precision, so the clock
/// never hands out finer values that would not survive a round trip.
pub struct LiveClock;

impl Clock for LiveClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(3)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Timelike;

    use super::*;

    #[test]
    fn returns_current_time_in_milliseconds() {
        let before = Utc::now().trunc_subsecs(3);
        let now = LiveClock.now();
        let after = Utc::now();

        assert!(now >= before);
        assert!(now <= after);
        assert_eq!(now.nanosecond() % 1_000_000, 0);
    }
}
