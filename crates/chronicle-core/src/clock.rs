//! Time source for record timestamps.

use chrono::{DateTime, Utc};

/// Source of record timestamps.
///
/// The event store asks the clock once per written record; tests inject a
/// deterministic clock to control global ordering.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
