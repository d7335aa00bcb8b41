//! Telemetry mirrors.
//!
//! Copy sensor-node and climate readings into the config store so the
//! dashboard sees them.  Both mirrors publish on change and otherwise
//! refresh every `sensor_push_ms`, keeping store writes bounded.

use log::{debug, info};

use crate::app::ports::ConfigStore;
use crate::config::GatewayConfig;
use crate::sensors::{ActuatorFeedback, SensorSnapshot, TiltState};

pub const PATH_WATER_PERCENT: &str = "sensor/water_percent";
pub const PATH_WATER_RAW: &str = "sensor/water_raw";
pub const PATH_TILT_STATE: &str = "sensor/tilt_state";
pub const PATH_TILT_TEXT: &str = "sensor/tilt_state_text";
pub const PATH_KEY_LAST: &str = "sensor/key_last";
pub const PATH_TEMPERATURE: &str = "sensor/temperature";
pub const PATH_HUMIDITY: &str = "sensor/humidity";

// ───────────────────────────────────────────────────────────────
// Sensor-node mirror
// ───────────────────────────────────────────────────────────────

/// Fields whose change triggers an immediate publish.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Published {
    water_percent: u8,
    water_raw: u16,
    tilt: TiltState,
    feedback: ActuatorFeedback,
    key_press: Option<char>,
}

impl From<&SensorSnapshot> for Published {
    fn from(s: &SensorSnapshot) -> Self {
        Self {
            water_percent: s.water_percent,
            water_raw: s.water_raw,
            tilt: s.tilt,
            feedback: s.feedback,
            key_press: s.key_press,
        }
    }
}

impl Published {
    fn differs(&self, other: &Self) -> bool {
        self.water_percent != other.water_percent
            || self.water_raw != other.water_raw
            || self.tilt != other.tilt
            || self.feedback != other.feedback
    }
}

/// Mirrors the sensor node's water level, tilt and keypad into the store.
pub struct SensorMirror {
    push_interval_ms: u64,
    last: Option<Published>,
    last_push_ms: u64,
}

impl SensorMirror {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            push_interval_ms: u64::from(config.sensor_push_ms),
            last: None,
            last_push_ms: 0,
        }
    }

    /// Publish `snap` if it changed or the refresh interval elapsed.
    /// Returns `true` when a publish happened.  Not-live snapshots are
    /// never published.
    pub fn publish(
        &mut self,
        now_ms: u64,
        snap: &SensorSnapshot,
        store: &mut impl ConfigStore,
    ) -> bool {
        if !snap.is_live() {
            return false;
        }
        let current = Published::from(snap);
        let changed = self.last.is_none_or(|last| last.differs(&current));
        let due = now_ms.saturating_sub(self.last_push_ms) > self.push_interval_ms;
        if !changed && !due {
            return false;
        }

        let _ = store.write_int(PATH_WATER_PERCENT, i32::from(snap.water_percent));
        let _ = store.write_int(PATH_WATER_RAW, i32::from(snap.water_raw));
        let _ = store.write_int(PATH_TILT_STATE, snap.tilt as i32);
        let _ = store.write_string(PATH_TILT_TEXT, snap.tilt.as_text());

        if let Some(key) = snap.key_press {
            let previous = self.last.and_then(|l| l.key_press);
            if previous != Some(key) {
                let mut buf = [0u8; 4];
                let _ = store.write_string(PATH_KEY_LAST, key.encode_utf8(&mut buf));
                info!("KEYPAD | pressed '{key}'");
            }
        }

        debug!(
            "MIRROR | water={}% raw={} tilt={}",
            snap.water_percent,
            snap.water_raw,
            snap.tilt.as_text()
        );
        self.last = Some(current);
        self.last_push_ms = now_ms;
        true
    }
}

// ───────────────────────────────────────────────────────────────
// Environment mirror
// ───────────────────────────────────────────────────────────────

/// Mirrors temperature and humidity, publishing on significant change.
pub struct EnvironmentMirror {
    push_interval_ms: u64,
    humidity_delta: f32,
    temperature_delta: f32,
    /// Last published (humidity, temperature).
    last: Option<(f32, f32)>,
    last_push_ms: u64,
}

impl EnvironmentMirror {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            push_interval_ms: u64::from(config.sensor_push_ms),
            humidity_delta: config.env_humidity_delta,
            temperature_delta: config.env_temperature_delta,
            last: None,
            last_push_ms: 0,
        }
    }

    /// Publish the climate reading if it moved enough or is stale.
    /// Returns `true` when a publish happened.
    pub fn publish(
        &mut self,
        now_ms: u64,
        snap: &SensorSnapshot,
        store: &mut impl ConfigStore,
    ) -> bool {
        let (Some(h), Some(t)) = (snap.humidity_pct, snap.temperature_c) else {
            return false;
        };
        if !h.is_finite() || !t.is_finite() {
            return false;
        }

        let push = match self.last {
            None => true,
            Some((last_h, last_t)) => {
                (h - last_h).abs() >= self.humidity_delta
                    || (t - last_t).abs() >= self.temperature_delta
                    || now_ms.saturating_sub(self.last_push_ms) > self.push_interval_ms
            }
        };
        if !push {
            return false;
        }

        let _ = store.write_float(PATH_TEMPERATURE, t);
        let _ = store.write_float(PATH_HUMIDITY, h);
        info!("ENV | T={t:.1}\u{00b0}C H={h:.1}%");
        self.last = Some((h, t));
        self.last_push_ms = now_ms;
        true
    }
}
