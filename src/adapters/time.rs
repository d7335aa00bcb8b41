//! Gateway clock adapter.
//!
//! Supplies the two clocks a tick needs:
//!
//! - monotonic uptime in milliseconds (rate limits, heartbeats, rechecks);
//! - local time-of-day for schedule windows, `None` until the wall clock
//!   has been synced.
//!
//! **`feature = "espidf"`** wraps `esp_timer_get_time()` and
//! `gettimeofday()`.  Otherwise `std::time` is used and the host clock is
//! assumed synced.

use crate::control::Now;
use crate::schedule::TimeOfDay;

/// Anything before 2020-01-01 means SNTP has not run yet.
const EPOCH_2020: i64 = 1_577_836_800;

pub struct GatewayClock {
    utc_offset_secs: i32,
    #[cfg(not(feature = "espidf"))]
    start: std::time::Instant,
}

impl GatewayClock {
    pub fn new(utc_offset_secs: i32) -> Self {
        Self {
            utc_offset_secs,
            #[cfg(not(feature = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Both clocks, read together for one tick.
    pub fn now(&self) -> Now {
        Now::new(self.uptime_ms(), self.time_of_day())
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(feature = "espidf")]
    pub fn uptime_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1000
    }

    /// Milliseconds since start-up (monotonic).
    #[cfg(not(feature = "espidf"))]
    pub fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Local time-of-day, `None` before clock sync.
    pub fn time_of_day(&self) -> Option<TimeOfDay> {
        let unix = unix_secs()?;
        local_time_of_day(unix, self.utc_offset_secs)
    }
}

/// Convert Unix seconds to local time-of-day, rejecting unsynced clocks.
pub fn local_time_of_day(unix_secs: i64, utc_offset_secs: i32) -> Option<TimeOfDay> {
    (unix_secs >= EPOCH_2020).then(|| TimeOfDay::from_unix(unix_secs, utc_offset_secs))
}

#[cfg(feature = "espidf")]
fn unix_secs() -> Option<i64> {
    let mut tv = esp_idf_svc::sys::timeval {
        tv_sec: 0,
        tv_usec: 0,
    };
    if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
        return None;
    }
    Some(tv.tv_sec as i64)
}

#[cfg(not(feature = "espidf"))]
fn unix_secs() -> Option<i64> {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_secs()).ok())
}
