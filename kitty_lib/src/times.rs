use chrono::{DateTime, Local};
use std::cell::Cell;

/// Where the ledger gets the current time from.  Used both to stamp records
/// and to derive their ids.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

/// The wall clock
#[derive(Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock that only moves when told to.  Convenient for tests.
pub struct FixedClock {
    now: Cell<DateTime<Local>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Local>) -> Self {
        FixedClock {
            now: Cell::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Local>) {
        self.now.set(now);
    }

    pub fn advance(&self, delta: chrono::Duration) {
        self.now.set(self.now.get() + delta);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.now.get()
    }
}

/// Generates record ids from the clock, as milliseconds since the epoch.
/// Several records created within the same millisecond (a bulk purchase,
/// or a settlement and its offsetting expense) still get distinct ids: the
/// generator never returns the same value twice and never goes backward.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    pub fn next(&mut self, now: DateTime<Local>) -> i64 {
        self.last = now.timestamp_millis().max(self.last + 1);
        self.last
    }

    /// Make sure future ids will be larger than `id`
    pub fn observe(&mut self, id: i64) {
        self.last = self.last.max(id);
    }
}
