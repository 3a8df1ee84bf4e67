use std::sync::atomic::{AtomicI64, Ordering};

use time::OffsetDateTime;

use crate::clock::Clock;

/// Clock starting at a fixed instant and advancing by one second on every
/// `now()` call, so consecutive timestamps are always distinguishable.
pub struct SteppingClock {
    seconds: AtomicI64,
}

impl SteppingClock {
    pub fn new(start: OffsetDateTime) -> Self {
        SteppingClock {
            seconds: AtomicI64::new(start.unix_timestamp()),
        }
    }
}

impl Default for SteppingClock {
    fn default() -> Self {
        SteppingClock::new(OffsetDateTime::UNIX_EPOCH)
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> OffsetDateTime {
        let at = self.seconds.fetch_add(1, Ordering::Relaxed);
        OffsetDateTime::from_unix_timestamp(at)
            .expect("stepping clock out of range")
    }
}
