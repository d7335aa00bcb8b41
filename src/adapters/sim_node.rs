//! Simulated sensor/actuator node.
//!
//! Stands in for the remote node on the bench and in tests:
//!
//! ```text
//!  ActuatorController ──send()──▶ SimLink ──Channel──▶ SimNode ──publish()──▶ SensorSlot
//! ```
//!
//! [`SimLink`] implements [`CommandChannel`] by pushing frames into a
//! bounded `embassy-sync` channel; a full queue is reported as
//! [`LinkError::QueueFull`].  [`SimNode`] drains the queue, applies each
//! command after a fixed latency (unless that actuator is stuck), evolves
//! a crude climate model and publishes a snapshot every step.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use log::debug;

use crate::app::ports::CommandChannel;
use crate::error::LinkError;
use crate::sensors::feed::SensorSlot;
use crate::sensors::{ActuatorFeedback, ActuatorId, SensorSnapshot, TiltState};

/// Frames buffered between gateway and node.
pub const COMMAND_DEPTH: usize = 8;

/// One command frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeCommand {
    pub target: ActuatorId,
    pub on: bool,
}

pub type CommandQueue = Channel<CriticalSectionRawMutex, NodeCommand, COMMAND_DEPTH>;

// ───────────────────────────────────────────────────────────────
// Link (gateway side)
// ───────────────────────────────────────────────────────────────

/// Gateway end of the simulated wireless link.
pub struct SimLink<'a> {
    tx: Sender<'a, CriticalSectionRawMutex, NodeCommand, COMMAND_DEPTH>,
    reachable: bool,
    sent: u32,
}

impl<'a> SimLink<'a> {
    pub fn new(queue: &'a CommandQueue) -> Self {
        Self {
            tx: queue.sender(),
            reachable: true,
            sent: 0,
        }
    }

    /// Simulate the peer dropping off the air.
    pub fn set_reachable(&mut self, reachable: bool) {
        self.reachable = reachable;
    }

    /// Frames accepted by the link.
    pub fn sent(&self) -> u32 {
        self.sent
    }
}

impl CommandChannel for SimLink<'_> {
    fn send(&mut self, target: ActuatorId, on: bool) -> Result<(), LinkError> {
        if !self.reachable {
            return Err(LinkError::PeerUnreachable);
        }
        self.tx
            .try_send(NodeCommand { target, on })
            .map_err(|_| LinkError::QueueFull)?;
        self.sent = self.sent.wrapping_add(1);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Node
// ───────────────────────────────────────────────────────────────

/// Initial conditions and behaviour of the simulated node.
#[derive(Debug, Clone, Copy)]
pub struct SimNodeConfig {
    pub node_id: u32,
    /// Delay between receiving a command and the relay switching.
    pub latency_ms: u64,
    pub humidity_pct: f32,
    pub temperature_c: f32,
    pub water_percent: u8,
}

impl Default for SimNodeConfig {
    fn default() -> Self {
        Self {
            node_id: 0x00C0_FFEE,
            latency_ms: 300,
            humidity_pct: 52.0,
            temperature_c: 27.0,
            water_percent: 80,
        }
    }
}

/// Raw ADC counts at 100% reservoir level.
const WATER_RAW_FULL: u16 = 4095;

/// Node end of the simulated link.
pub struct SimNode<'a> {
    rx: Receiver<'a, CriticalSectionRawMutex, NodeCommand, COMMAND_DEPTH>,
    slot: &'a SensorSlot,
    cfg: SimNodeConfig,
    in_flight: heapless::Vec<(u64, NodeCommand), COMMAND_DEPTH>,
    relays: ActuatorFeedback,
    /// Bit per [`ActuatorId`] whose relay ignores commands.
    stuck: u8,
    humidity: f32,
    temperature: f32,
    water_percent: u8,
    tilt: TiltState,
    key_press: Option<char>,
}

impl<'a> SimNode<'a> {
    pub fn new(queue: &'a CommandQueue, slot: &'a SensorSlot, cfg: SimNodeConfig) -> Self {
        Self {
            rx: queue.receiver(),
            slot,
            cfg,
            in_flight: heapless::Vec::new(),
            relays: ActuatorFeedback::default(),
            stuck: 0,
            humidity: cfg.humidity_pct,
            temperature: cfg.temperature_c,
            water_percent: cfg.water_percent,
            tilt: TiltState::Normal,
            key_press: None,
        }
    }

    /// A stuck relay keeps its current position whatever it is told.
    pub fn set_stuck(&mut self, id: ActuatorId, stuck: bool) {
        let bit = 1u8 << (id as u8);
        if stuck {
            self.stuck |= bit;
        } else {
            self.stuck &= !bit;
        }
    }

    pub fn set_water_percent(&mut self, percent: u8) {
        self.water_percent = percent.min(100);
    }

    pub fn set_tilt(&mut self, tilt: TiltState) {
        self.tilt = tilt;
    }

    pub fn set_humidity(&mut self, humidity_pct: f32) {
        self.humidity = humidity_pct;
    }

    pub fn press_key(&mut self, key: char) {
        self.key_press = Some(key);
    }

    pub fn relays(&self) -> ActuatorFeedback {
        self.relays
    }

    /// Advance the node to `now_ms`: take new frames, switch relays whose
    /// latency has elapsed, update the climate model and publish.
    pub fn step(&mut self, now_ms: u64, dt_ms: u64) -> SensorSnapshot {
        while let Ok(cmd) = self.rx.try_receive() {
            let due = now_ms + self.cfg.latency_ms;
            if self.in_flight.push((due, cmd)).is_err() {
                debug!("SIM | in-flight buffer full, dropping {:?}", cmd);
            }
        }

        let stuck = self.stuck;
        let relays = &mut self.relays;
        self.in_flight.retain(|(due, cmd)| {
            if *due > now_ms {
                return true;
            }
            if stuck & (1u8 << (cmd.target as u8)) == 0 {
                relays.set(cmd.target, cmd.on);
            }
            false
        });

        self.evolve(dt_ms);

        let snap = self.snapshot();
        self.slot.publish(snap);
        self.key_press = None;
        snap
    }

    pub fn snapshot(&self) -> SensorSnapshot {
        SensorSnapshot {
            node_id: self.cfg.node_id,
            humidity_pct: Some(self.humidity),
            temperature_c: Some(self.temperature),
            water_percent: self.water_percent,
            water_raw: (u32::from(WATER_RAW_FULL) * u32::from(self.water_percent) / 100) as u16,
            tilt: self.tilt,
            feedback: self.relays,
            key_press: self.key_press,
        }
    }

    /// Humidifying raises humidity and drains the reservoir; the fan and
    /// ambient leakage pull humidity back down.
    fn evolve(&mut self, dt_ms: u64) {
        let dt = dt_ms as f32 / 1000.0;
        let humidifying =
            self.relays.get(ActuatorId::Steam) || self.relays.get(ActuatorId::Climate);
        let mut rate = -0.05;
        if humidifying {
            rate += 0.4;
        }
        if self.relays.get(ActuatorId::Fan) {
            rate -= 0.1;
        }
        self.humidity = (self.humidity + rate * dt).clamp(5.0, 99.0);
        if humidifying && dt_ms > 0 {
            self.water_percent = self.water_percent.saturating_sub(1);
        }
    }
}
