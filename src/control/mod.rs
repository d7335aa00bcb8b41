//! Actuator control: decision engine, reconciliation loop and the
//! per-actuator controller composing them.

pub mod controller;
pub mod decision;
pub mod reconcile;

use crate::schedule::TimeOfDay;

/// Clock readings handed to every controller once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Now {
    /// Monotonic milliseconds since boot.
    pub uptime_ms: u64,
    /// Local wall-clock time, `None` until the clock has been synced.
    pub time_of_day: Option<TimeOfDay>,
}

impl Now {
    pub fn new(uptime_ms: u64, time_of_day: Option<TimeOfDay>) -> Self {
        Self {
            uptime_ms,
            time_of_day,
        }
    }
}
