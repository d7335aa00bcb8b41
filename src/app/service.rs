//! Gateway service — the per-tick orchestrator.
//!
//! [`GatewayService`] owns one [`ActuatorController`] per actuator plus
//! the telemetry mirrors.  Each tick it runs every controller in turn
//! against the same borrowed snapshot, then mirrors the readings to the
//! store.  Controllers share no state; the only shared things are the
//! injected ports, which are used strictly one caller at a time.
//!
//! ```text
//!  SensorSnapshot ──▶ ┌───────────────────────────────┐ ──▶ CommandChannel
//!                     │        GatewayService          │
//!  ConfigStore   ◀──▶ │ climate · fan · steam · mirrors│ ──▶ LogSink
//!                     └───────────────────────────────┘
//! ```

use log::info;

use crate::config::GatewayConfig;
use crate::control::Now;
use crate::control::controller::{ActuatorController, ActuatorPolicy, ActuatorProfile};
use crate::sensors::{ActuatorId, SensorSnapshot};
use crate::telemetry::{EnvironmentMirror, SensorMirror};

use super::ports::{CommandChannel, ConfigStore, LogSink};

pub struct GatewayService<P: ActuatorPolicy = ActuatorProfile> {
    controllers: Vec<ActuatorController<P>>,
    sensors: SensorMirror,
    environment: EnvironmentMirror,
    tick_count: u64,
    skipped_ticks: u64,
}

impl GatewayService<ActuatorProfile> {
    /// Service driving the climate unit, the fan and the steam emitter.
    pub fn new(config: &GatewayConfig) -> Self {
        Self::with_policies(
            config,
            [
                ActuatorProfile::climate(),
                ActuatorProfile::fan(),
                ActuatorProfile::steam(),
            ],
        )
    }
}

impl<P: ActuatorPolicy> GatewayService<P> {
    pub fn with_policies(config: &GatewayConfig, policies: impl IntoIterator<Item = P>) -> Self {
        let controllers: Vec<_> = policies
            .into_iter()
            .map(|p| ActuatorController::new(p, config))
            .collect();
        info!(
            "GatewayService: {} actuator(s): {}",
            controllers.len(),
            controllers
                .iter()
                .map(|c| c.id().label())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Self {
            controllers,
            sensors: SensorMirror::new(config),
            environment: EnvironmentMirror::new(config),
            tick_count: 0,
            skipped_ticks: 0,
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run every controller, then the mirrors.  Nothing happens while the
    /// store is not ready.
    pub fn tick(
        &mut self,
        now: &Now,
        snap: &SensorSnapshot,
        store: &mut impl ConfigStore,
        link: &mut impl CommandChannel,
        log: &mut impl LogSink,
    ) {
        if !store.is_ready() {
            self.skipped_ticks += 1;
            return;
        }
        self.tick_count += 1;

        for controller in &mut self.controllers {
            controller.tick(now, snap, store, link, log);
        }

        self.sensors.publish(now.uptime_ms, snap, store);
        self.environment.publish(now.uptime_ms, snap, store);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn controllers(&self) -> &[ActuatorController<P>] {
        &self.controllers
    }

    pub fn controller(&self, id: ActuatorId) -> Option<&ActuatorController<P>> {
        self.controllers.iter().find(|c| c.id() == id)
    }

    /// Ticks that ran with a ready store.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Ticks skipped because the store was not ready.
    pub fn skipped_ticks(&self) -> u64 {
        self.skipped_ticks
    }
}
