#[cfg(test)] pub mod testing;

use time::OffsetDateTime;

/// Source of the current time for metadata timestamping. Injected so that
/// timer semantics can be tested with a stepping clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
