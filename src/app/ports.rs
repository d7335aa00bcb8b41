//! Port traits — the hexagonal boundary between the control core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ActuatorController / GatewayService
//! ```
//!
//! Driven adapters (cloud config store, wireless command link, log sinks,
//! NVS) implement these traits.  The core consumes them via generics, so
//! it never touches a network stack directly and is testable with
//! in-memory fakes.
//!
//! Every call is treated as bounded-latency.  A failed or timed-out call
//! means "value unavailable this tick"; none of them is fatal.

use crate::config::GatewayConfig;
use crate::error::{LinkError, StoreError};
use crate::sensors::ActuatorId;

// ───────────────────────────────────────────────────────────────
// Config store port (driven adapter: domain ↔ cloud database)
// ───────────────────────────────────────────────────────────────

/// Path-addressed remote key/value store holding user-facing settings
/// (mode, manual state, thresholds, schedules) and published state.
///
/// Reads return `Err` when the value is unavailable; callers keep their
/// last-known-good value.  Writes are best-effort.
pub trait ConfigStore {
    /// Whether the store session is up.  When `false` the controllers
    /// skip the tick entirely.
    fn is_ready(&self) -> bool;

    fn read_string(&mut self, path: &str) -> Result<String, StoreError>;
    fn read_bool(&mut self, path: &str) -> Result<bool, StoreError>;
    fn read_int(&mut self, path: &str) -> Result<i32, StoreError>;

    fn write_string(&mut self, path: &str, value: &str) -> Result<(), StoreError>;
    fn write_bool(&mut self, path: &str, value: bool) -> Result<(), StoreError>;
    fn write_int(&mut self, path: &str, value: i32) -> Result<(), StoreError>;
    fn write_float(&mut self, path: &str, value: f32) -> Result<(), StoreError>;

    /// Append `value` to the list stored at `path`.
    fn push_string(&mut self, path: &str, value: &str) -> Result<(), StoreError>;
}

// ───────────────────────────────────────────────────────────────
// Command channel port (driven adapter: domain → actuator node)
// ───────────────────────────────────────────────────────────────

/// Fire-and-forget command link to the actuator node.
///
/// `Ok` means the transport accepted the frame, nothing more.  Whether the
/// actuator actually switched is only learned through sensor feedback.
pub trait CommandChannel {
    fn send(&mut self, target: ActuatorId, on: bool) -> Result<(), LinkError>;
}

// ───────────────────────────────────────────────────────────────
// Log sink port (driven adapter: domain → remote log)
// ───────────────────────────────────────────────────────────────

/// Destination for operator-visible log lines (persistent mismatches,
/// trust handovers, schedule cancellations).
pub trait LogSink {
    fn append(&mut self, message: &str);
}

// ───────────────────────────────────────────────────────────────
// Settings port (driven adapter: domain ↔ local persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the gateway's own [`GatewayConfig`].
///
/// Implementations MUST validate before persisting: invalid ranges are
/// rejected with [`SettingsError::ValidationFailed`], not silently clamped.
pub trait SettingsPort {
    /// Load configuration.  Returns [`GatewayConfig::default()`] if no
    /// stored config exists.
    fn load(&self) -> Result<GatewayConfig, SettingsError>;

    /// Validate and persist configuration.
    fn save(&mut self, config: &GatewayConfig) -> Result<(), SettingsError>;
}

/// Errors from [`SettingsPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsError {
    /// Stored blob failed deserialization.
    Corrupted,
    /// A field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "settings corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
