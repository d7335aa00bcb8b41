//! Sensor-node data model.
//!
//! The remote sensor/actuator node reports one [`SensorSnapshot`] at a
//! time over the wireless link.  The control core only ever borrows the
//! latest snapshot for the duration of a tick; delivery from the link
//! callback to the tick loop goes through the single-slot [`feed`].
//!
//! ```text
//! ┌──────────────┐  publish()  ┌──────────────┐  latest()  ┌──────────────┐
//! │ Link callback│────────────▶│  SensorSlot  │───────────▶│  Tick loop   │
//! │ (producer)   │             │ (1 value)    │            │  (consumer)  │
//! └──────────────┘             └──────────────┘            └──────────────┘
//! ```

pub mod feed;

use core::fmt;

// ---------------------------------------------------------------------------
// Actuator identity
// ---------------------------------------------------------------------------

/// The physical actuators the node can drive.
///
/// The discriminant doubles as the command device-type byte on the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ActuatorId {
    /// Combined climate unit (single relay driving both outputs).
    Climate = 1,
    /// Circulation fan.
    Fan = 2,
    /// Steam emitter.
    Steam = 3,
}

impl ActuatorId {
    pub fn label(self) -> &'static str {
        match self {
            Self::Climate => "CONTROL",
            Self::Fan => "FAN",
            Self::Steam => "STEAM",
        }
    }
}

impl fmt::Display for ActuatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Tilt category
// ---------------------------------------------------------------------------

/// Orientation category reported by the node's tilt switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TiltState {
    #[default]
    Normal = 0,
    Warning = 1,
    /// The unit has fallen over. Hard-stop condition.
    Fall = 2,
}

impl TiltState {
    /// Decode the raw wire value.  Unknown values read as `Normal`.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Warning,
            2 => Self::Fall,
            _ => Self::Normal,
        }
    }

    /// Short text published alongside the numeric state.
    pub fn as_text(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Warning => "WARN",
            Self::Fall => "FALL",
        }
    }
}

// ---------------------------------------------------------------------------
// Per-actuator feedback
// ---------------------------------------------------------------------------

/// Actuator on/off states as observed by the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActuatorFeedback {
    pub climate_on: bool,
    pub fan_on: bool,
    pub steam_on: bool,
}

impl ActuatorFeedback {
    pub fn get(&self, id: ActuatorId) -> bool {
        match id {
            ActuatorId::Climate => self.climate_on,
            ActuatorId::Fan => self.fan_on,
            ActuatorId::Steam => self.steam_on,
        }
    }

    pub fn set(&mut self, id: ActuatorId, on: bool) {
        match id {
            ActuatorId::Climate => self.climate_on = on,
            ActuatorId::Fan => self.fan_on = on,
            ActuatorId::Steam => self.steam_on = on,
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor snapshot
// ---------------------------------------------------------------------------

/// Sentinel node id meaning "the feed has not produced a reading yet".
pub const NODE_ID_UNSET: u32 = 0;

/// A point-in-time snapshot reported by the sensor node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorSnapshot {
    /// Reporting node identity; [`NODE_ID_UNSET`] until the feed is live.
    pub node_id: u32,
    /// Relative humidity (%RH).  `None` or non-finite when the read failed.
    pub humidity_pct: Option<f32>,
    /// Air temperature (°C).
    pub temperature_c: Option<f32>,
    /// Reservoir level (0–100%).
    pub water_percent: u8,
    /// Raw reservoir level ADC value.
    pub water_raw: u16,
    /// Orientation category.
    pub tilt: TiltState,
    /// Observed actuator states.
    pub feedback: ActuatorFeedback,
    /// Last keypad key pressed on the node, if any.
    pub key_press: Option<char>,
}

impl SensorSnapshot {
    /// True once the feed has produced an identified reading.
    pub fn is_live(&self) -> bool {
        self.node_id != NODE_ID_UNSET
    }

    /// Humidity usable for automatic control: live feed, finite, positive.
    ///
    /// A zero reading is what the humidity sensor returns on a failed read.
    pub fn usable_humidity(&self) -> Option<f32> {
        if !self.is_live() {
            return None;
        }
        self.humidity_pct.filter(|h| h.is_finite() && *h > 0.0)
    }
}
