//! Outbound control events.
//!
//! Controllers describe what they did each tick as [`ControlEvent`]s.
//! Every event is written to the local log; the operator-visible subset
//! (persistent mismatch, schedule cancellation) is also appended to the
//! remote [`LogSink`](super::ports::LogSink).

use core::fmt;

use heapless::String;

use crate::control::decision::Mode;
use crate::safety::REASON_CAP;
use crate::sensors::ActuatorId;

/// Structured events emitted by an actuator controller.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// A state change went out on the link.  Heartbeats are only logged
    /// at debug level and retries are [`ControlEvent::MismatchRetry`].
    CommandSent {
        id: ActuatorId,
        on: bool,
        mode: Mode,
        schedule_enabled: bool,
        schedule_active: bool,
        /// Interlock reason when the command is a safety block.
        blocked_by: Option<String<REASON_CAP>>,
    },

    /// The node reported a new actuator state.
    FeedbackChanged { id: ActuatorId, on: bool },

    /// Feedback still disagrees with the command; resent.
    MismatchRetry { id: ActuatorId, attempt: u8, on: bool },

    /// Retry budget exhausted; feedback adopted as ground truth.
    /// `manual_synced` is set when the manual override was rewritten.
    TrustHandover {
        id: ActuatorId,
        adopted: bool,
        manual_synced: bool,
    },

    /// Feedback converged after one or more retries.
    MismatchResolved { id: ActuatorId },

    /// A user override cancelled the active schedule.
    ScheduleCancelled { id: ActuatorId },
}

impl ControlEvent {
    /// Whether this event belongs in the remote operator log.
    pub fn is_operator_visible(&self) -> bool {
        matches!(
            self,
            Self::TrustHandover { .. } | Self::ScheduleCancelled { .. }
        )
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "ON" } else { "OFF" }
}

impl fmt::Display for ControlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommandSent {
                id,
                on,
                mode,
                schedule_enabled,
                schedule_active,
                blocked_by,
            } => {
                write!(
                    f,
                    "SENT | {id} CMD={} (mode={mode}, sched_en={}, sched_now={}, safe={})",
                    on_off(*on),
                    on_off(*schedule_enabled),
                    on_off(*schedule_active),
                    if blocked_by.is_some() { "BLOCK" } else { "OK" },
                )?;
                if let Some(reason) = blocked_by {
                    write!(f, " reason={reason}")?;
                }
                Ok(())
            }
            Self::FeedbackChanged { id, on } => write!(f, "FEEDBACK | {id} REAL={}", on_off(*on)),
            Self::MismatchRetry { id, attempt, on } => {
                write!(f, "MISMATCH | {id} attempt {attempt}, resend CMD={}", on_off(*on))
            }
            Self::TrustHandover {
                id,
                adopted,
                manual_synced,
            } => {
                write!(
                    f,
                    "MISMATCH PERSIST | {id} trusting node, state={}",
                    on_off(*adopted)
                )?;
                if *manual_synced {
                    write!(f, ", manual override synced")?;
                }
                Ok(())
            }
            Self::MismatchResolved { id } => write!(f, "SYNC | {id} mismatch resolved"),
            Self::ScheduleCancelled { id } => {
                write!(f, "SCHEDULE | {id} cancelled by user override")
            }
        }
    }
}
