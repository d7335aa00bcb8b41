//! Mock adapters for integration tests.
//!
//! Records every command and log line so tests can assert on the full
//! history.  The config store is the library's in-memory store, which
//! already counts writes and supports failure injection.

use climate_gateway::adapters::memory_store::MemoryConfigStore;
use climate_gateway::app::ports::{CommandChannel, LogSink};
use climate_gateway::control::Now;
use climate_gateway::control::controller::{ActuatorController, ActuatorProfile};
use climate_gateway::config::GatewayConfig;
use climate_gateway::error::LinkError;
use climate_gateway::schedule::TimeOfDay;
use climate_gateway::sensors::{ActuatorId, SensorSnapshot};
use serde_json::Value;

// ── Command link ──────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct RecordingLink {
    pub sent: Vec<(ActuatorId, bool)>,
    /// When set, every send fails with this error (after recording).
    pub fail_with: Option<LinkError>,
}

#[allow(dead_code)]
impl RecordingLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, id: ActuatorId) -> usize {
        self.sent.iter().filter(|(t, _)| *t == id).count()
    }

    pub fn last(&self, id: ActuatorId) -> Option<bool> {
        self.sent.iter().rev().find(|(t, _)| *t == id).map(|(_, on)| *on)
    }
}

impl CommandChannel for RecordingLink {
    fn send(&mut self, target: ActuatorId, on: bool) -> Result<(), LinkError> {
        self.sent.push((target, on));
        match self.fail_with {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// ── Log sink ──────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct RecordingLog {
    pub lines: Vec<String>,
}

#[allow(dead_code)]
impl RecordingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }
}

impl LogSink for RecordingLog {
    fn append(&mut self, message: &str) {
        self.lines.push(message.to_owned());
    }
}

// ── Fixture ───────────────────────────────────────────────────

/// One controller wired to recording adapters.
pub struct Rig {
    pub ctl: ActuatorController,
    pub store: MemoryConfigStore,
    pub link: RecordingLink,
    pub log: RecordingLog,
}

#[allow(dead_code)]
impl Rig {
    pub fn new(profile: ActuatorProfile, seed: Value) -> Self {
        Self {
            ctl: ActuatorController::new(profile, &GatewayConfig::default()),
            store: MemoryConfigStore::from_json(seed),
            link: RecordingLink::new(),
            log: RecordingLog::new(),
        }
    }

    pub fn tick(&mut self, uptime_ms: u64, time_of_day: Option<TimeOfDay>, snap: &SensorSnapshot) {
        let now = Now::new(uptime_ms, time_of_day);
        self.ctl
            .tick(&now, snap, &mut self.store, &mut self.link, &mut self.log);
    }
}

/// A live node snapshot with healthy safety readings.
#[allow(dead_code)]
pub fn live_node() -> SensorSnapshot {
    SensorSnapshot {
        node_id: 0x42,
        humidity_pct: Some(50.0),
        temperature_c: Some(26.0),
        water_percent: 70,
        water_raw: 2900,
        ..Default::default()
    }
}

/// [`live_node`] reporting `on` for actuator `id`.
#[allow(dead_code)]
pub fn with_feedback(id: ActuatorId, on: bool) -> SensorSnapshot {
    let mut snap = live_node();
    snap.feedback.set(id, on);
    snap
}

#[allow(dead_code)]
pub fn at(h: u8, m: u8, s: u8) -> Option<TimeOfDay> {
    Some(TimeOfDay::from_hms(h, m, s))
}
