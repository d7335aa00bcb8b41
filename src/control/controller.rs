//! Per-actuator controller.
//!
//! [`ActuatorController`] composes the schedule window, the safety
//! interlock, the decision engine and the reconciliation loop into one
//! unit that is polled once per tick.  The combined climate unit, the fan
//! and the steam emitter all run the same controller and differ only in
//! their [`ActuatorPolicy`]: command id, store-key namespace, comparator
//! and monitored quantity.
//!
//! ```text
//!  ConfigStore ──poll──▶ ┌──────────────────────────────────┐ ──send──▶ CommandChannel
//!                        │ Schedule · Interlock · Decide ·   │
//!  SensorSnapshot ─────▶ │ Reconcile                         │ ──append─▶ LogSink
//!                        └──────────────────────────────────┘ ──write──▶ ConfigStore
//! ```
//!
//! Tick order: config poll (rate-limited, override detection) → interlock
//! → window + countdown publish → decide → reconcile.

use core::fmt::Write as _;

use heapless::String;
use log::{debug, info, warn};

use crate::app::events::ControlEvent;
use crate::app::ports::{CommandChannel, ConfigStore, LogSink};
use crate::config::GatewayConfig;
use crate::safety::{InterlockVerdict, SafetyInterlock};
use crate::schedule::{CountdownPublisher, ScheduleConfig, ScheduleWindow, WindowStatus, parse_hhmm};
use crate::sensors::{ActuatorId, SensorSnapshot};

use super::Now;
use super::decision::{ActuatorConfig, Comparator, Mode, OverrideDetector, decide, strip_quotes};
use super::reconcile::{ReconState, ReconTiming, ReconcileReport, ReconciliationLoop, SendKind};

/// Longest store path (`<namespace>/schedule/countdown`).
pub const KEY_CAP: usize = 48;

pub type StoreKey = String<KEY_CAP>;

// ───────────────────────────────────────────────────────────────
// Store keys
// ───────────────────────────────────────────────────────────────

/// Config-store paths owned by one actuator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKeys {
    pub mode: StoreKey,
    pub manual: StoreKey,
    pub threshold: StoreKey,
    pub status: StoreKey,
    pub schedule_enable: StoreKey,
    pub schedule_start: StoreKey,
    pub schedule_stop: StoreKey,
    pub schedule_countdown: StoreKey,
}

impl StoreKeys {
    /// Build every path under `namespace`.  Paths that would overflow
    /// [`KEY_CAP`] are truncated.
    pub fn under(namespace: &str) -> Self {
        let key = |leaf: &str| {
            let mut s = StoreKey::new();
            let _ = write!(s, "{namespace}/{leaf}");
            s
        };
        Self {
            mode: key("mode"),
            manual: key("manual_state"),
            threshold: key("target_humidity"),
            status: key("status"),
            schedule_enable: key("schedule/enable"),
            schedule_start: key("schedule/start"),
            schedule_stop: key("schedule/stop"),
            schedule_countdown: key("schedule/countdown"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Policy
// ───────────────────────────────────────────────────────────────

/// What distinguishes one actuator controller from another.
pub trait ActuatorPolicy {
    fn id(&self) -> ActuatorId;
    fn keys(&self) -> &StoreKeys;
    fn comparator(&self) -> Comparator;

    /// The quantity auto mode compares against the threshold, or `None`
    /// when no usable reading exists.
    fn monitored(&self, snap: &SensorSnapshot) -> Option<f32> {
        snap.usable_humidity()
    }
}

/// Stock policy: humidity-driven actuator under its own key namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuatorProfile {
    id: ActuatorId,
    keys: StoreKeys,
    comparator: Comparator,
}

impl ActuatorProfile {
    pub fn new(id: ActuatorId, namespace: &str, comparator: Comparator) -> Self {
        Self {
            id,
            keys: StoreKeys::under(namespace),
            comparator,
        }
    }

    /// Combined climate unit.  Auto: ON while drier than target.
    pub fn climate() -> Self {
        Self::new(ActuatorId::Climate, "control", Comparator::LessThan)
    }

    /// Fan unit.  Auto: ON while drier than target.
    pub fn fan() -> Self {
        Self::new(ActuatorId::Fan, "fan", Comparator::LessThan)
    }

    /// Steam emitter.  Auto: ON while drier than target.
    pub fn steam() -> Self {
        Self::new(ActuatorId::Steam, "steam", Comparator::LessThan)
    }

    pub fn with_comparator(mut self, comparator: Comparator) -> Self {
        self.comparator = comparator;
        self
    }
}

impl ActuatorPolicy for ActuatorProfile {
    fn id(&self) -> ActuatorId {
        self.id
    }

    fn keys(&self) -> &StoreKeys {
        &self.keys
    }

    fn comparator(&self) -> Comparator {
        self.comparator
    }
}

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

/// One polled actuator control unit.
pub struct ActuatorController<P: ActuatorPolicy = ActuatorProfile> {
    policy: P,
    config: ActuatorConfig,
    schedule: ScheduleConfig,
    overrides: OverrideDetector,
    interlock: SafetyInterlock,
    countdown: CountdownPublisher,
    recon: ReconciliationLoop,
    poll_interval_ms: u64,
    last_poll_ms: Option<u64>,
    ticks: u64,
}

impl<P: ActuatorPolicy> ActuatorController<P> {
    pub fn new(policy: P, gateway: &GatewayConfig) -> Self {
        let config = ActuatorConfig::new(policy.comparator());
        Self {
            policy,
            config,
            schedule: ScheduleConfig::default(),
            overrides: OverrideDetector::new(),
            interlock: SafetyInterlock::new(gateway),
            countdown: CountdownPublisher::new(gateway.countdown_debounce_ms),
            recon: ReconciliationLoop::new(ReconTiming::from(gateway)),
            poll_interval_ms: u64::from(gateway.config_poll_ms),
            last_poll_ms: None,
            ticks: 0,
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle.  A no-op while the config store is not
    /// ready: no state changes and nothing is sent.
    pub fn tick(
        &mut self,
        now: &Now,
        snap: &SensorSnapshot,
        store: &mut impl ConfigStore,
        link: &mut impl CommandChannel,
        log: &mut impl LogSink,
    ) {
        if !store.is_ready() {
            return;
        }
        self.ticks += 1;

        // 1. Remote config poll
        self.poll_config(now.uptime_ms, store, log);

        // 2. Safety interlock
        let verdict = self.interlock.evaluate(snap);

        // 3. Schedule window + countdown
        let window = ScheduleWindow::evaluate(&self.schedule, now.time_of_day);
        if let (Some(status), Some(tod)) = (window, now.time_of_day) {
            if self.countdown.should_publish(&status, tod, now.uptime_ms) {
                let secs = i32::try_from(status.countdown_secs).unwrap_or(i32::MAX);
                let _ = store.write_int(&self.policy.keys().schedule_countdown, secs);
            }
        }

        // 4. Desired state
        let desired = decide(
            &self.config,
            window.as_ref(),
            &verdict,
            self.policy.monitored(snap),
        );

        // 5. Reconcile against feedback
        let feedback = snap.feedback.get(self.policy.id());
        let report = self.recon.step(desired, feedback, now.uptime_ms);
        self.apply(&report, &verdict, window, store, link, log);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn id(&self) -> ActuatorId {
        self.policy.id()
    }

    /// Last-known-good actuator config.
    pub fn config(&self) -> &ActuatorConfig {
        &self.config
    }

    pub fn schedule(&self) -> &ScheduleConfig {
        &self.schedule
    }

    pub fn recon_state(&self) -> &ReconState {
        self.recon.state()
    }

    /// Ticks executed while the store was ready.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    // ── Internal ──────────────────────────────────────────────

    /// Re-read the actuator config, at most once per poll interval.
    /// Unavailable values keep their last-known-good setting.
    fn poll_config(&mut self, now_ms: u64, store: &mut impl ConfigStore, log: &mut impl LogSink) {
        if self
            .last_poll_ms
            .is_some_and(|last| now_ms.saturating_sub(last) < self.poll_interval_ms)
        {
            return;
        }
        self.last_poll_ms = Some(now_ms);

        let id = self.policy.id();
        let keys = self.policy.keys();

        if let Ok(raw) = store.read_string(&keys.mode) {
            self.config.mode = Mode::parse(&raw);
        }
        if let Ok(on) = store.read_bool(&keys.manual) {
            self.config.manual_override = on;
        }
        if let Ok(threshold) = store.read_int(&keys.threshold) {
            self.config.auto_threshold = threshold;
        }
        if let Ok(enabled) = store.read_bool(&keys.schedule_enable) {
            self.schedule.enabled = enabled;
        }
        if let Ok(raw) = store.read_string(&keys.schedule_start) {
            self.schedule.start_minute = parse_bound(id, "start", &raw);
        }
        if let Ok(raw) = store.read_string(&keys.schedule_stop) {
            self.schedule.stop_minute = parse_bound(id, "stop", &raw);
        }

        if self.overrides.observe(&self.config) && self.schedule.enabled {
            self.schedule.enabled = false;
            if let Err(e) = store.write_bool(&keys.schedule_enable, false) {
                warn!("SCHEDULE | {id} disable write failed: {e}");
            }
            emit(ControlEvent::ScheduleCancelled { id }, log);
        }
    }

    /// Carry out the actions the reconciliation loop asked for.
    fn apply(
        &mut self,
        report: &ReconcileReport,
        verdict: &InterlockVerdict,
        window: Option<WindowStatus>,
        store: &mut impl ConfigStore,
        link: &mut impl CommandChannel,
        log: &mut impl LogSink,
    ) {
        let id = self.policy.id();
        let keys = self.policy.keys();

        if let Some(dispatch) = report.dispatch {
            // Send failures surface as a mismatch at the next recheck.
            if let Err(e) = link.send(id, dispatch.on) {
                debug!("LINK | {id} send failed: {e}");
            }
            match dispatch.kind {
                SendKind::Retry(attempt) => emit(
                    ControlEvent::MismatchRetry {
                        id,
                        attempt,
                        on: dispatch.on,
                    },
                    log,
                ),
                SendKind::Heartbeat => debug!("SENT | {id} heartbeat CMD={}", dispatch.on),
                SendKind::Change => emit(
                    ControlEvent::CommandSent {
                        id,
                        on: dispatch.on,
                        mode: self.config.mode,
                        schedule_enabled: self.schedule.enabled,
                        schedule_active: window.is_some_and(|w| w.in_window),
                        blocked_by: verdict.is_unsafe().then(|| verdict.reason.clone()),
                    },
                    log,
                ),
            }
        }

        if let Some(on) = report.feedback_changed {
            let _ = store.write_bool(&keys.status, on);
            emit(ControlEvent::FeedbackChanged { id, on }, log);
        }

        if let Some(adopted) = report.handover {
            let mut manual_synced = false;
            if self.config.mode == Mode::Manual {
                // Local state follows the store only once the write lands,
                // so a failed write never reads back as a user override.
                match store.write_bool(&keys.manual, adopted) {
                    Ok(()) => {
                        self.config.manual_override = adopted;
                        self.overrides.observe(&self.config);
                        manual_synced = true;
                    }
                    Err(e) => warn!("MISMATCH | {id} manual override write-back failed: {e}"),
                }
            }
            emit(
                ControlEvent::TrustHandover {
                    id,
                    adopted,
                    manual_synced,
                },
                log,
            );
        }

        if report.resolved {
            emit(ControlEvent::MismatchResolved { id }, log);
        }
    }
}

/// Parse one schedule bound; a bad value leaves the bound unset.
fn parse_bound(id: ActuatorId, which: &str, raw: &str) -> Option<u16> {
    match parse_hhmm(strip_quotes(raw)) {
        Ok(minute) => Some(minute),
        Err(e) => {
            debug!("SCHEDULE | {id} {which} {raw:?}: {e}");
            None
        }
    }
}

/// Log locally; forward operator-visible events to the remote log.
fn emit(event: ControlEvent, log: &mut impl LogSink) {
    if event.is_operator_visible() {
        warn!("{event}");
        log.append(&event.to_string());
    } else {
        info!("{event}");
    }
}
