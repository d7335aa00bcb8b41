//! Time-of-day schedule window.
//!
//! A schedule forces its actuator ON between a start and a stop time each
//! day.  The window may wrap past midnight (`start > stop`).  While a
//! schedule is armed the gateway also publishes a countdown to the next
//! transition so the companion app can show "starts in 4 min" / "stops in
//! 30 s", rate-limited by [`CountdownPublisher`].
//!
//! ```text
//!        start            stop                  stop        start
//!  ──────[====in-window====)──────     ===in====)──────────[===in===
//!  00:00                 23:59     00:00                        23:59
//!          start <= stop                    start > stop (wraps)
//! ```
//!
//! Everything here is pure: no clocks are read, callers pass `now` in.

use log::debug;

use crate::error::ScheduleParseError;

/// Minutes in a day; valid minute-of-day values are `0..MINUTES_PER_DAY`.
pub const MINUTES_PER_DAY: u16 = 24 * 60;
const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

// ═══════════════════════════════════════════════════════════════
//  Time of day
// ═══════════════════════════════════════════════════════════════

/// Local wall-clock time of day, second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay {
    secs: u32,
}

impl TimeOfDay {
    /// Build from hour/minute/second.  Out-of-range parts wrap into the day.
    pub fn from_hms(hour: u8, minute: u8, second: u8) -> Self {
        let secs = u32::from(hour) * 3600 + u32::from(minute) * 60 + u32::from(second);
        Self {
            secs: secs % SECONDS_PER_DAY as u32,
        }
    }

    /// Local time of day for a Unix timestamp shifted by `utc_offset_secs`.
    pub fn from_unix(unix_secs: i64, utc_offset_secs: i32) -> Self {
        let local = unix_secs + i64::from(utc_offset_secs);
        Self {
            secs: local.rem_euclid(SECONDS_PER_DAY) as u32,
        }
    }

    /// Seconds since local midnight.
    pub fn seconds_of_day(self) -> u32 {
        self.secs
    }

    /// Minutes since local midnight (0–1439).
    pub fn minute_of_day(self) -> u16 {
        (self.secs / 60) as u16
    }

    /// Seconds past the current minute (0–59).
    pub fn second_of_minute(self) -> u8 {
        (self.secs % 60) as u8
    }
}

// ═══════════════════════════════════════════════════════════════
//  Schedule config
// ═══════════════════════════════════════════════════════════════

/// Parse an `"HH:MM"` bound into a minute-of-day.
///
/// Accepts one or two digits on each side of the colon; surrounding
/// whitespace is ignored.
pub fn parse_hhmm(s: &str) -> Result<u16, ScheduleParseError> {
    let (h, m) = s.trim().split_once(':').ok_or(ScheduleParseError::Malformed)?;
    let hour = parse_field(h)?;
    let minute = parse_field(m)?;
    if hour > 23 || minute > 59 {
        return Err(ScheduleParseError::OutOfRange);
    }
    Ok(hour * 60 + minute)
}

fn parse_field(field: &str) -> Result<u16, ScheduleParseError> {
    if field.is_empty() || field.len() > 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ScheduleParseError::Malformed);
    }
    field.parse().map_err(|_| ScheduleParseError::Malformed)
}

/// Schedule settings as last read from the config store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScheduleConfig {
    pub enabled: bool,
    /// Start minute-of-day, or `None` if unset / unparseable.
    pub start_minute: Option<u16>,
    /// Stop minute-of-day, or `None` if unset / unparseable.
    pub stop_minute: Option<u16>,
}

impl ScheduleConfig {
    /// Enabled with both bounds set.  An unset bound deactivates the
    /// window regardless of `enabled`.
    pub fn is_armed(&self) -> bool {
        self.enabled && self.start_minute.is_some() && self.stop_minute.is_some()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Window evaluation
// ═══════════════════════════════════════════════════════════════

/// Result of evaluating an armed schedule at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowStatus {
    pub in_window: bool,
    /// Seconds to the next transition, never negative.
    pub countdown_secs: u32,
}

/// Window membership.
///
/// `start <= stop`: `start <= now < stop`.
/// `start > stop` (wraps midnight): `now >= start || now < stop`.
pub fn in_window(start: u16, stop: u16, now_minute: u16) -> bool {
    if start <= stop {
        now_minute >= start && now_minute < stop
    } else {
        now_minute >= start || now_minute < stop
    }
}

/// Countdown to the next transition.
///
/// In-window: seconds until `stop`.  Before `start` the same day: seconds
/// until `start`.  Otherwise 0: the window has elapsed for today.  A
/// wrapped window evaluated before midnight therefore reads 0 rather than
/// counting across midnight; the result is clamped at 0 in every case.
pub fn countdown_secs(start: u16, stop: u16, now: TimeOfDay, in_window: bool) -> u32 {
    let now_sec = i64::from(now.seconds_of_day());
    let start_sec = i64::from(start) * 60;
    let stop_sec = i64::from(stop) * 60;

    let diff = if in_window {
        stop_sec - now_sec
    } else if now_sec <= start_sec {
        start_sec - now_sec
    } else {
        0
    };
    diff.max(0) as u32
}

/// Stateless evaluator tying the config to the clock.
pub struct ScheduleWindow;

impl ScheduleWindow {
    /// Evaluate `config` at `now`.
    ///
    /// Returns `None` when the schedule is not armed or the wall clock is
    /// unavailable (pre time-sync): in both cases there is no window to
    /// force the actuator and no countdown to publish.
    pub fn evaluate(config: &ScheduleConfig, now: Option<TimeOfDay>) -> Option<WindowStatus> {
        if !config.is_armed() {
            return None;
        }
        let (start, stop) = (config.start_minute?, config.stop_minute?);
        let now = now?;
        let inside = in_window(start, stop, now.minute_of_day());
        Some(WindowStatus {
            in_window: inside,
            countdown_secs: countdown_secs(start, stop, now, inside),
        })
    }
}

// ═══════════════════════════════════════════════════════════════
//  Countdown publish policy
// ═══════════════════════════════════════════════════════════════

/// Countdown threshold below which the publish cadence tightens.
const FINAL_MINUTE_SECS: u32 = 60;
/// Publish cadence inside the final minute.
const FINAL_MINUTE_STEP_SECS: u32 = 10;

/// Rate limiter for countdown writes to the config store.
///
/// More than a minute out, the countdown is published once per minute
/// boundary (second-of-minute == 0).  Inside the final minute it is
/// published on every 10-second boundary.  Either way, two writes are
/// never closer together than the debounce interval.
pub struct CountdownPublisher {
    debounce_ms: u64,
    last_publish_ms: Option<u64>,
}

impl CountdownPublisher {
    pub fn new(debounce_ms: u32) -> Self {
        Self {
            debounce_ms: u64::from(debounce_ms),
            last_publish_ms: None,
        }
    }

    /// Decide whether `status` should be written now.  On `true` the
    /// publish is recorded, so the caller must perform the write.
    pub fn should_publish(&mut self, status: &WindowStatus, now: TimeOfDay, now_ms: u64) -> bool {
        let debounced = self
            .last_publish_ms
            .is_none_or(|last| now_ms.saturating_sub(last) > self.debounce_ms);
        if !debounced {
            return false;
        }

        let on_boundary = if status.countdown_secs > FINAL_MINUTE_SECS {
            now.second_of_minute() == 0
        } else {
            status.countdown_secs % FINAL_MINUTE_STEP_SECS == 0
        };
        if on_boundary {
            self.last_publish_ms = Some(now_ms);
            debug!("SCHEDULE | countdown={}s", status.countdown_secs);
        }
        on_boundary
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
