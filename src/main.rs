//! Climate Gateway — bench entry point.
//!
//! Wires the control core to the simulation adapters and runs the
//! fixed-period tick loop:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  MemoryConfigStore  SimLink          StoreLogSink   GatewayClock│
//! │  (ConfigStore)      (CommandChannel) (LogSink)      (Now)       │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │           GatewayService (pure logic)                  │    │
//! │  │  climate · fan · steam controllers · mirrors           │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  SimNode thread ──▶ SensorSlot ──▶ tick loop (main thread)     │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `climate-gateway [TICKS]` (default 90).  Log level via
//! `RUST_LOG`.
#![deny(unused_must_use)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use log::{info, warn};
use serde_json::json;

use climate_gateway::adapters::log_sink::StoreLogSink;
use climate_gateway::adapters::memory_store::MemoryConfigStore;
use climate_gateway::adapters::nvs::NvsAdapter;
use climate_gateway::adapters::sim_node::{CommandQueue, SimLink, SimNode, SimNodeConfig};
use climate_gateway::adapters::time::GatewayClock;
use climate_gateway::app::service::GatewayService;
use climate_gateway::schedule::TimeOfDay;
use climate_gateway::sensors::feed::{SensorReader, SensorSlot};
use climate_gateway::sensors::{ActuatorId, TiltState};

const DEFAULT_TICKS: u64 = 90;
/// Node simulation step.
const NODE_STEP_MS: u64 = 100;

fn main() -> Result<()> {
    init_logging()?;
    info!("Climate gateway v{} starting", env!("CARGO_PKG_VERSION"));

    let ticks = match std::env::args().nth(1) {
        Some(arg) => arg.parse().with_context(|| format!("invalid tick count {arg:?}"))?,
        None => DEFAULT_TICKS,
    };

    // ── 1. Settings ───────────────────────────────────────────
    let nvs = NvsAdapter::new().map_err(|e| anyhow!("NVS init failed: {e}"))?;
    let config = nvs.load_or_default();
    config.validate()?;

    // ── 2. Adapters ───────────────────────────────────────────
    let clock = GatewayClock::new(config.utc_offset_secs);
    let mut store = seed_store(clock.time_of_day());
    let mut remote_log = StoreLogSink::new(&config);
    let queue = CommandQueue::new();
    let slot = SensorSlot::new();
    let running = AtomicBool::new(true);

    // ── 3. Service ────────────────────────────────────────────
    let mut service = GatewayService::new(&config);

    std::thread::scope(|s| {
        s.spawn(|| run_node(&queue, &slot, &running));

        let mut link = SimLink::new(&queue);
        let mut reader = SensorReader::new(&slot);
        let tick = Duration::from_millis(u64::from(config.tick_interval_ms));

        for _ in 0..ticks {
            let now = clock.now();
            let snap = *reader.latest();
            service.tick(&now, &snap, &mut store, &mut link, &mut remote_log);
            remote_log.flush(&mut store);
            std::thread::sleep(tick);
        }
        running.store(false, Ordering::Relaxed);

        info!(
            "Bench done: {} ticks, {} node packets, {} frames sent, {} remote log line(s) dropped",
            service.tick_count(),
            reader.received(),
            link.sent(),
            remote_log.dropped()
        );
    });

    for ctl in service.controllers() {
        let st = ctl.recon_state();
        info!(
            "{}: mode={} commanded={} feedback={} phase={:?}",
            ctl.id(),
            ctl.config().mode,
            st.last_commanded,
            st.last_feedback,
            st.phase
        );
    }
    match serde_json::to_string_pretty(store.snapshot()) {
        Ok(dump) => info!("Final store:\n{dump}"),
        Err(e) => warn!("store dump failed: {e}"),
    }
    Ok(())
}

#[cfg(feature = "espidf")]
fn init_logging() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    Ok(())
}

#[cfg(not(feature = "espidf"))]
fn init_logging() -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("logger init failed: {e}"))
}

/// Initial remote config: climate unit on auto, fan on manual, steam on a
/// two-minute schedule around the current time.
fn seed_store(now: Option<TimeOfDay>) -> MemoryConfigStore {
    let (start, stop) = match now {
        Some(t) => {
            let m = t.minute_of_day();
            (hhmm(m.saturating_sub(1)), hhmm((m + 2) % 1440))
        }
        None => ("08:00".to_owned(), "17:00".to_owned()),
    };
    MemoryConfigStore::from_json(json!({
        "control": { "mode": "auto", "manual_state": false, "target_humidity": 60 },
        "fan": { "mode": "manual", "manual_state": true, "target_humidity": 60 },
        "steam": {
            "mode": "manual",
            "manual_state": false,
            "target_humidity": 60,
            "schedule": { "enable": true, "start": start, "stop": stop }
        },
        "logs": { "errors": [] }
    }))
}

fn hhmm(minute_of_day: u16) -> String {
    format!("{:02}:{:02}", minute_of_day / 60, minute_of_day % 60)
}

/// Node thread: scripted faults at fixed points of the run.
fn run_node(queue: &CommandQueue, slot: &SensorSlot, running: &AtomicBool) {
    let mut node = SimNode::new(queue, slot, SimNodeConfig::default());
    let mut t_ms = 0;
    while running.load(Ordering::Relaxed) {
        match t_ms {
            20_000 => {
                info!("SIM | steam relay stuck");
                node.set_stuck(ActuatorId::Steam, true);
            }
            45_000 => {
                info!("SIM | unit tipped over");
                node.set_tilt(TiltState::Fall);
                node.press_key('#');
            }
            55_000 => {
                info!("SIM | unit upright, steam relay freed");
                node.set_tilt(TiltState::Normal);
                node.set_stuck(ActuatorId::Steam, false);
            }
            _ => {}
        }
        node.step(t_ms, NODE_STEP_MS);
        std::thread::sleep(Duration::from_millis(NODE_STEP_MS));
        t_ms += NODE_STEP_MS;
    }
}
