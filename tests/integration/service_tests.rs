//! End-to-end tests: [`GatewayService`] against the simulated node.
//!
//! Everything runs on one thread.  Each cycle the service ticks on the
//! node's latest snapshot, then the node steps and picks up the commands.

use std::time::Duration;

use climate_gateway::adapters::log_sink::{PATH_ERROR_LOG, StoreLogSink};
use climate_gateway::adapters::memory_store::MemoryConfigStore;
use climate_gateway::adapters::sim_node::{CommandQueue, SimLink, SimNode, SimNodeConfig};
use climate_gateway::app::service::GatewayService;
use climate_gateway::config::GatewayConfig;
use climate_gateway::control::Now;
use climate_gateway::control::reconcile::ReconPhase;
use climate_gateway::sensors::feed::{SensorReader, SensorSlot};
use climate_gateway::sensors::{ActuatorId, TiltState};
use climate_gateway::telemetry::{
    PATH_HUMIDITY, PATH_KEY_LAST, PATH_TEMPERATURE, PATH_TILT_TEXT, PATH_WATER_PERCENT,
};
use serde_json::{Value, json};

use crate::mock_hw::RecordingLog;

fn frozen_clock() -> Duration {
    Duration::from_secs(100)
}

fn seed() -> Value {
    json!({
        "control": { "mode": "manual", "manual_state": false, "target_humidity": 60 },
        "fan": { "mode": "manual", "manual_state": false, "target_humidity": 60 },
        "steam": { "mode": "manual", "manual_state": false, "target_humidity": 60 },
        "logs": { "errors": [] }
    })
}

/// Node with instant relays so feedback lands before the next tick.
fn instant() -> SimNodeConfig {
    SimNodeConfig {
        latency_ms: 0,
        ..SimNodeConfig::default()
    }
}

// ── Happy path ────────────────────────────────────────────────

#[test]
fn manual_on_reaches_the_relay_and_status_key() {
    let cfg = GatewayConfig::default();
    let queue = CommandQueue::new();
    let slot = SensorSlot::new();
    let mut node = SimNode::new(&queue, &slot, instant());
    let mut link = SimLink::new(&queue);
    let mut reader = SensorReader::new(&slot);
    let mut store = MemoryConfigStore::from_json(seed());
    store.set("fan/manual_state", json!(true));
    let mut log = RecordingLog::new();
    let mut svc = GatewayService::new(&cfg);

    node.step(0, 0);
    for t in 1..=4u64 {
        let now = Now::new(t * 1000, None);
        let snap = *reader.latest();
        svc.tick(&now, &snap, &mut store, &mut link, &mut log);
        node.step(t * 1000, 1000);
    }

    assert!(node.relays().get(ActuatorId::Fan));
    assert!(!node.relays().get(ActuatorId::Steam));
    assert_eq!(store.bool("fan/status"), Some(true));

    let fan = svc.controller(ActuatorId::Fan).expect("fan controller");
    assert_eq!(fan.recon_state().phase, ReconPhase::Synced);
    assert_eq!(fan.recon_state().mismatch_count, 0);
    assert!(log.lines.is_empty());

    assert_eq!(store.int(PATH_WATER_PERCENT), Some(80));
    assert!(store.float(PATH_HUMIDITY).is_some());
    assert!(store.float(PATH_TEMPERATURE).is_some());
    assert_eq!(svc.tick_count(), 4);
}

#[test]
fn auto_mode_humidifies_a_dry_room() {
    let cfg = GatewayConfig::default();
    let queue = CommandQueue::new();
    let slot = SensorSlot::new();
    let mut node = SimNode::new(&queue, &slot, instant());
    node.set_humidity(40.0);
    let mut link = SimLink::new(&queue);
    let mut reader = SensorReader::new(&slot);
    let mut store = MemoryConfigStore::from_json(seed());
    store.set("steam/mode", json!("auto"));
    let mut log = RecordingLog::new();
    let mut svc = GatewayService::new(&cfg);

    node.step(0, 0);
    for t in 1..=3u64 {
        let snap = *reader.latest();
        svc.tick(&Now::new(t * 1000, None), &snap, &mut store, &mut link, &mut log);
        node.step(t * 1000, 1000);
    }

    assert!(node.relays().get(ActuatorId::Steam));
    assert_eq!(store.bool("steam/status"), Some(true));
}

// ── Faults ────────────────────────────────────────────────────

#[test]
fn stuck_relay_handover_lands_in_remote_log() {
    let cfg = GatewayConfig::default();
    let queue = CommandQueue::new();
    let slot = SensorSlot::new();
    let mut node = SimNode::new(&queue, &slot, instant());
    node.set_stuck(ActuatorId::Steam, true);
    let mut link = SimLink::new(&queue);
    let mut reader = SensorReader::new(&slot);
    let mut store = MemoryConfigStore::from_json(seed());
    store.set("steam/manual_state", json!(true));
    let mut remote = StoreLogSink::with_time_provider(&cfg, frozen_clock);
    let mut svc = GatewayService::new(&cfg);

    node.step(0, 0);
    for t in 1..=6u64 {
        let snap = *reader.latest();
        svc.tick(&Now::new(t * 1000, None), &snap, &mut store, &mut link, &mut remote);
        remote.flush(&mut store);
        node.step(t * 1000, 1000);
    }

    let lines = store.list(PATH_ERROR_LOG);
    assert_eq!(lines.len(), 1, "one persistent mismatch: {lines:?}");
    assert!(lines[0].contains("MISMATCH PERSIST | STEAM trusting node, state=OFF"));
    assert_eq!(store.bool("steam/manual_state"), Some(false));
    assert_eq!(remote.pending(), 0);
    assert_eq!(remote.dropped(), 0);
}

#[test]
fn empty_reservoir_keeps_every_actuator_off() {
    let cfg = GatewayConfig::default();
    let queue = CommandQueue::new();
    let slot = SensorSlot::new();
    let mut node = SimNode::new(&queue, &slot, instant());
    node.set_water_percent(5);
    let mut link = SimLink::new(&queue);
    let mut reader = SensorReader::new(&slot);
    let mut store = MemoryConfigStore::from_json(seed());
    for ns in ["control", "fan", "steam"] {
        store.set(&format!("{ns}/manual_state"), json!(true));
    }
    let mut log = RecordingLog::new();
    let mut svc = GatewayService::new(&cfg);

    node.step(0, 0);
    for t in 1..=5u64 {
        let snap = *reader.latest();
        svc.tick(&Now::new(t * 1000, None), &snap, &mut store, &mut link, &mut log);
        node.step(t * 1000, 1000);
    }

    for id in [ActuatorId::Climate, ActuatorId::Fan, ActuatorId::Steam] {
        assert!(!node.relays().get(id), "{id} must stay off");
    }
    assert_eq!(store.int(PATH_WATER_PERCENT), Some(5));
}

#[test]
fn tilt_and_keypad_are_mirrored() {
    let cfg = GatewayConfig::default();
    let queue = CommandQueue::new();
    let slot = SensorSlot::new();
    let mut node = SimNode::new(&queue, &slot, instant());
    let mut link = SimLink::new(&queue);
    let mut reader = SensorReader::new(&slot);
    let mut store = MemoryConfigStore::from_json(seed());
    let mut log = RecordingLog::new();
    let mut svc = GatewayService::new(&cfg);

    node.set_tilt(TiltState::Fall);
    node.press_key('#');
    node.step(0, 0);
    let snap = *reader.latest();
    svc.tick(&Now::new(1000, None), &snap, &mut store, &mut link, &mut log);

    assert_eq!(store.string(PATH_TILT_TEXT).as_deref(), Some(TiltState::Fall.as_text()));
    assert_eq!(store.string(PATH_KEY_LAST).as_deref(), Some("#"));
}

#[test]
fn unreachable_node_leaves_fan_mismatched() {
    let cfg = GatewayConfig::default();
    let queue = CommandQueue::new();
    let slot = SensorSlot::new();
    let mut node = SimNode::new(&queue, &slot, instant());
    let mut link = SimLink::new(&queue);
    link.set_reachable(false);
    let mut reader = SensorReader::new(&slot);
    let mut store = MemoryConfigStore::from_json(seed());
    store.set("fan/manual_state", json!(true));
    let mut log = RecordingLog::new();
    let mut svc = GatewayService::new(&cfg);

    node.step(0, 0);
    for t in 1..=3u64 {
        let snap = *reader.latest();
        svc.tick(&Now::new(t * 1000, None), &snap, &mut store, &mut link, &mut log);
        node.step(t * 1000, 1000);
    }

    assert_eq!(link.sent(), 0);
    assert!(!node.relays().get(ActuatorId::Fan));
    let fan = svc.controller(ActuatorId::Fan).expect("fan controller");
    assert_eq!(fan.recon_state().phase, ReconPhase::Mismatched);
    assert_eq!(svc.tick_count(), 3);
}

// ── Store readiness ───────────────────────────────────────────

#[test]
fn service_waits_for_the_store() {
    let cfg = GatewayConfig::default();
    let queue = CommandQueue::new();
    let mut link = SimLink::new(&queue);
    let mut store = MemoryConfigStore::new();
    let mut log = RecordingLog::new();
    let mut svc = GatewayService::new(&cfg);
    let snap = climate_gateway::sensors::SensorSnapshot {
        node_id: 9,
        water_percent: 50,
        ..Default::default()
    };

    svc.tick(&Now::new(5000, None), &snap, &mut store, &mut link, &mut log);
    assert_eq!(svc.skipped_ticks(), 1);
    assert_eq!(link.sent(), 0);
    assert!(store.get(PATH_WATER_PERCENT).is_none());

    store.set_ready(true);
    svc.tick(&Now::new(6000, None), &snap, &mut store, &mut link, &mut log);
    assert_eq!(svc.tick_count(), 1);
    assert_eq!(store.int(PATH_WATER_PERCENT), Some(50));
}
