//! Wall-clock time for markers and ledger snapshots.

use chrono::{DateTime, Utc};

use crate::ports::clock::Clock;

/// Reads the system clock; marker suffixes come from its epoch millis.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_millis_and_now_read_the_same_clock() {
        let clock = SystemClock;
        let millis = i64::try_from(clock.epoch_millis()).unwrap();
        let gap = clock.now().timestamp_millis() - millis;
        assert!((0..5_000).contains(&gap), "gap {gap}ms");
    }
}
