//! Gateway configuration parameters
//!
//! All tunable timing constants and thresholds for the control loop.
//! Values can be overridden from NVS (see [`crate::adapters::nvs`]).
//! The per-actuator policy (mode, threshold, schedule) is *not* here: it
//! lives in the remote config store and is polled at runtime.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Mismatch retries before the reconciliation loop trusts the hardware.
pub const MAX_RETRY: u8 = 3;

/// Core gateway configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    // --- Timing ---
    /// Control loop interval (milliseconds)
    pub tick_interval_ms: u32,
    /// Minimum spacing between remote config polls (milliseconds)
    pub config_poll_ms: u32,
    /// Resend the current command after this long without a send (milliseconds)
    pub command_heartbeat_ms: u32,
    /// Grace period between feedback mismatch checks (milliseconds)
    pub mismatch_recheck_ms: u32,
    /// Consecutive mismatch retries before trust handover.  Must equal
    /// [`MAX_RETRY`]; `validate` rejects any other value.
    pub max_mismatch_retries: u8,
    /// Minimum spacing between schedule countdown writes (milliseconds)
    pub countdown_debounce_ms: u32,

    // --- Safety ---
    /// Reservoir level (0-100%) at or below which actuators are forced off
    pub water_empty_percent: u8,

    // --- Telemetry ---
    /// Periodic sensor republish interval even without changes (milliseconds)
    pub sensor_push_ms: u32,
    /// Humidity change (%RH) that triggers an environment publish
    pub env_humidity_delta: f32,
    /// Temperature change (°C) that triggers an environment publish
    pub env_temperature_delta: f32,

    // --- Clock ---
    /// Local time offset from UTC (seconds)
    pub utc_offset_secs: i32,

    // --- Remote log ---
    /// Remote log lines allowed per second (token refill rate)
    pub remote_log_per_sec: u32,
    /// Remote log burst capacity
    pub remote_log_burst: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            // Timing
            tick_interval_ms: 1000,
            config_poll_ms: 2000,
            command_heartbeat_ms: 3000,
            mismatch_recheck_ms: 900,
            max_mismatch_retries: MAX_RETRY,
            countdown_debounce_ms: 800,

            // Safety
            water_empty_percent: 10,

            // Telemetry
            sensor_push_ms: 10_000,
            env_humidity_delta: 1.0,
            env_temperature_delta: 0.5,

            // Clock (UTC+7)
            utc_offset_secs: 7 * 3600,

            // Remote log
            remote_log_per_sec: 5,
            remote_log_burst: 5,
        }
    }
}

impl GatewayConfig {
    /// Range-check every field. Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<()> {
        if !(100..=10_000).contains(&self.tick_interval_ms) {
            return Err(Error::Config("tick_interval_ms must be 100–10000"));
        }
        if !(500..=60_000).contains(&self.config_poll_ms) {
            return Err(Error::Config("config_poll_ms must be 500–60000"));
        }
        if !(1000..=60_000).contains(&self.command_heartbeat_ms) {
            return Err(Error::Config("command_heartbeat_ms must be 1000–60000"));
        }
        if !(100..=10_000).contains(&self.mismatch_recheck_ms) {
            return Err(Error::Config("mismatch_recheck_ms must be 100–10000"));
        }
        if self.max_mismatch_retries != MAX_RETRY {
            return Err(Error::Config("max_mismatch_retries must equal MAX_RETRY"));
        }
        if self.countdown_debounce_ms >= 1000 {
            return Err(Error::Config("countdown_debounce_ms must be below 1000"));
        }
        if self.water_empty_percent > 100 {
            return Err(Error::Config("water_empty_percent must be 0–100"));
        }
        if !(1000..=3_600_000).contains(&self.sensor_push_ms) {
            return Err(Error::Config("sensor_push_ms must be 1000–3600000"));
        }
        if !(self.env_humidity_delta > 0.0 && self.env_humidity_delta <= 50.0) {
            return Err(Error::Config("env_humidity_delta must be in (0, 50]"));
        }
        if !(self.env_temperature_delta > 0.0 && self.env_temperature_delta <= 20.0) {
            return Err(Error::Config("env_temperature_delta must be in (0, 20]"));
        }
        if !(-14 * 3600..=14 * 3600).contains(&self.utc_offset_secs) {
            return Err(Error::Config("utc_offset_secs must be within ±14h"));
        }
        if self.remote_log_per_sec == 0 || self.remote_log_burst == 0 {
            return Err(Error::Config("remote log rate and burst must be non-zero"));
        }
        Ok(())
    }
}
