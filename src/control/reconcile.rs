//! Command / feedback reconciliation.
//!
//! ```text
//!            dispatch             recheck: differs (count < max)
//!   Synced ───────────▶ Pending ──────────────────────────────▶ Mismatched
//!     ▲                   │                                        │  │
//!     │  recheck: equal   │                                        │  │ recheck: differs
//!     └───────────────────┴────────────────────────────────────────┘  │ (count == max)
//!     ▲                                                               │
//!     └──────────── trust handover: adopt feedback, count = 0 ────────┘
//! ```
//!
//! Trust handover is instantaneous: the loop lands back in `Synced` in
//! the same step and reports the adopted value through
//! [`ReconcileReport::handover`].
//!
//! The loop never touches a port.  [`ReconciliationLoop::step`] returns a
//! [`ReconcileReport`] describing the send, publish and handover actions
//! the controller must carry out for this tick.

use crate::config::GatewayConfig;

/// Timing parameters for one loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconTiming {
    /// Resend the current intent after this long without a send.
    pub heartbeat_ms: u64,
    /// Grace period between mismatch checks.
    pub recheck_ms: u64,
    /// Resends before trusting the feedback.
    pub max_retries: u8,
}

impl From<&GatewayConfig> for ReconTiming {
    fn from(cfg: &GatewayConfig) -> Self {
        Self {
            heartbeat_ms: u64::from(cfg.command_heartbeat_ms),
            recheck_ms: u64::from(cfg.mismatch_recheck_ms),
            max_retries: cfg.max_mismatch_retries,
        }
    }
}

/// Reconciliation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconPhase {
    /// Commanded state matches feedback.
    #[default]
    Synced,
    /// Command sent, feedback not yet converged.
    Pending,
    /// Feedback disagreed at a recheck; resending.
    Mismatched,
}

/// Why a command goes out this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendKind {
    /// Desired state differs from the last command.
    Change,
    /// Heartbeat interval elapsed without a send.
    Heartbeat,
    /// Mismatch resend, 1-based attempt number.
    Retry(u8),
}

/// Command the controller must put on the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    pub on: bool,
    pub kind: SendKind,
}

/// Actions for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileReport {
    pub dispatch: Option<Dispatch>,
    /// New feedback value to publish to the status key.
    pub feedback_changed: Option<bool>,
    /// Feedback value adopted as ground truth after exhausting retries.
    pub handover: Option<bool>,
    /// A mismatch in progress converged at this recheck.
    pub resolved: bool,
}

/// Snapshot of the loop's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconState {
    pub phase: ReconPhase,
    pub last_commanded: bool,
    pub last_feedback: bool,
    pub mismatch_count: u8,
    pub last_send_ms: u64,
    pub last_check_ms: u64,
}

/// Per-actuator reconciliation state machine.
pub struct ReconciliationLoop {
    timing: ReconTiming,
    state: ReconState,
}

impl ReconciliationLoop {
    pub fn new(timing: ReconTiming) -> Self {
        Self {
            timing,
            state: ReconState::default(),
        }
    }

    pub fn state(&self) -> &ReconState {
        &self.state
    }

    pub fn phase(&self) -> ReconPhase {
        self.state.phase
    }

    /// Advance one tick with the freshly decided `desired` state and the
    /// node's reported `feedback`.
    pub fn step(&mut self, desired: bool, feedback: bool, now_ms: u64) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let s = &mut self.state;

        // Dispatch on change or heartbeat.
        let heartbeat_due = now_ms.saturating_sub(s.last_send_ms) > self.timing.heartbeat_ms;
        if desired != s.last_commanded || heartbeat_due {
            let kind = if desired != s.last_commanded {
                SendKind::Change
            } else {
                SendKind::Heartbeat
            };
            report.dispatch = Some(Dispatch { on: desired, kind });
            s.last_commanded = desired;
            s.last_send_ms = now_ms;
            s.last_check_ms = now_ms;
            if desired != feedback && s.phase == ReconPhase::Synced {
                s.phase = ReconPhase::Pending;
            }
        }

        // Feedback visibility does not wait for the recheck.
        if feedback != s.last_feedback {
            report.feedback_changed = Some(feedback);
            s.last_feedback = feedback;
        }

        if now_ms.saturating_sub(s.last_check_ms) <= self.timing.recheck_ms {
            return report;
        }

        if desired == feedback {
            report.resolved = s.mismatch_count > 0;
            s.mismatch_count = 0;
            s.phase = ReconPhase::Synced;
        } else if s.mismatch_count < self.timing.max_retries {
            s.mismatch_count += 1;
            s.phase = ReconPhase::Mismatched;
            report.dispatch = Some(Dispatch {
                on: desired,
                kind: SendKind::Retry(s.mismatch_count),
            });
            s.last_send_ms = now_ms;
        } else {
            s.last_commanded = feedback;
            s.mismatch_count = 0;
            report.handover = Some(feedback);
            s.phase = ReconPhase::Synced;
        }
        s.last_check_ms = now_ms;

        report
    }
}
