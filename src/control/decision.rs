//! Desired-state decision engine.
//!
//! A pure function of the polled actuator config, the schedule window,
//! the interlock verdict and the monitored quantity.  Rule priority is
//! fixed:
//!
//! 1. interlock unsafe → OFF
//! 2. schedule armed and in-window → ON
//! 3. mode: `Manual` → manual override, `Auto` → threshold comparator
//!    (OFF without a reading), `Unknown` → OFF
//!
//! [`OverrideDetector`] tracks the mode / manual pair across config polls
//! so that a user touching either one cancels an active schedule.

use core::fmt;

use crate::safety::InterlockVerdict;
use crate::schedule::WindowStatus;

/// Actuator operating mode as stored remotely (`"manual"` / `"auto"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Manual,
    Auto,
    /// Any other stored text.  Always decides OFF.
    Unknown,
}

impl Mode {
    /// Parse the stored mode text.  Surrounding whitespace and one pair of
    /// double quotes are ignored; matching is case-insensitive.
    pub fn parse(raw: &str) -> Self {
        let text = strip_quotes(raw);
        if text.eq_ignore_ascii_case("manual") {
            Self::Manual
        } else if text.eq_ignore_ascii_case("auto") {
            Self::Auto
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Auto => "auto",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trim whitespace and strip one pair of surrounding double quotes.
pub fn strip_quotes(raw: &str) -> &str {
    let t = raw.trim();
    t.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .map_or(t, str::trim)
}

/// Direction in which the monitored quantity must cross the threshold
/// for auto mode to switch the actuator on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// ON while `quantity < threshold` (e.g. humidify when too dry).
    LessThan,
    /// ON while `quantity > threshold` (e.g. ventilate when too humid).
    GreaterThan,
}

impl Comparator {
    pub fn holds(self, quantity: f32, threshold: f32) -> bool {
        match self {
            Self::LessThan => quantity < threshold,
            Self::GreaterThan => quantity > threshold,
        }
    }
}

/// Per-actuator policy polled from the config store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorConfig {
    pub mode: Mode,
    pub manual_override: bool,
    pub auto_threshold: i32,
    pub comparator: Comparator,
}

impl ActuatorConfig {
    pub fn new(comparator: Comparator) -> Self {
        Self {
            mode: Mode::Manual,
            manual_override: false,
            auto_threshold: 60,
            comparator,
        }
    }
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self::new(Comparator::LessThan)
    }
}

/// Compute the desired actuator state for this tick.
///
/// `window` is `None` when the schedule is not armed or the clock is not
/// synced; `quantity` is `None` when no usable reading exists.
pub fn decide(
    config: &ActuatorConfig,
    window: Option<&WindowStatus>,
    verdict: &InterlockVerdict,
    quantity: Option<f32>,
) -> bool {
    if verdict.is_unsafe() {
        return false;
    }
    if window.is_some_and(|w| w.in_window) {
        return true;
    }
    match config.mode {
        Mode::Manual => config.manual_override,
        Mode::Auto => quantity
            .filter(|q| q.is_finite())
            .is_some_and(|q| config.comparator.holds(q, config.auto_threshold as f32)),
        Mode::Unknown => false,
    }
}

/// Detects user overrides between consecutive config polls.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverrideDetector {
    /// Mode and manual override seen at the previous poll.
    prev: Option<(Mode, bool)>,
}

impl OverrideDetector {
    pub const fn new() -> Self {
        Self { prev: None }
    }

    /// Record the freshly polled pair; `true` if either one changed since
    /// the previous poll.  The first poll only sets the baseline.
    pub fn observe(&mut self, config: &ActuatorConfig) -> bool {
        let current = (config.mode, config.manual_override);
        let overridden = self.prev.is_some_and(|prev| prev != current);
        self.prev = Some(current);
        overridden
    }
}
