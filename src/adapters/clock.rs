use crate::ports::Clock;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Mutex, PoisonError};

/// System clock backed by `Utc::now()`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock that advances a fixed step on every reading
///
/// Used by tests so that reservation timestamps are strictly ordered.
#[derive(Debug)]
pub struct StepClock {
    next: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl StepClock {
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            next: Mutex::new(start),
            step,
        }
    }

    /// Move the clock forward without producing a reading
    pub fn advance(&self, by: Duration) {
        let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
        *next += by;
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
        let now = *next;
        *next += self.step;
        now
    }
}
