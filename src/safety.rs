//! Safety interlock.
//!
//! Runs **every tick before the decision engine** and forces every
//! actuator OFF while a hard-stop condition is present on the sensor
//! node.  Conditions are tracked in a fault bitmask so that several can
//! be active at once; the verdict carries a composite reason tag such as
//! `WATER_EMPTY+TILT_FALL`.
//!
//! ## Not-live feed
//!
//! Until the node has produced an identified reading (node id is the
//! unset sentinel) evaluation is skipped and the verdict is *safe*: a
//! missing feed defers to the other rules instead of forcing OFF during
//! start-up.

use core::fmt;

use heapless::String;
use log::{error, info};

use crate::config::GatewayConfig;
use crate::sensors::{SensorSnapshot, TiltState};

/// Longest composite reason: every fault name joined with `+`.
pub const REASON_CAP: usize = 32;

/// Hard-stop conditions, one bit each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SafetyFault {
    /// Reservoir at or below the empty threshold.
    WaterEmpty = 0b0000_0001,
    /// Unit has fallen over.
    TiltFall = 0b0000_0010,
}

impl SafetyFault {
    /// Evaluation (and reason) order.
    const ALL: [Self; 2] = [Self::WaterEmpty, Self::TiltFall];

    pub const fn mask(self) -> u8 {
        self as u8
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::WaterEmpty => "WATER_EMPTY",
            Self::TiltFall => "TILT_FALL",
        }
    }
}

impl fmt::Display for SafetyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Outcome of one interlock evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InterlockVerdict {
    /// Fault bitmask (0 = safe).
    pub faults: u8,
    /// Composite reason, empty when safe.
    pub reason: String<REASON_CAP>,
}

impl InterlockVerdict {
    pub fn safe() -> Self {
        Self::default()
    }

    pub fn is_unsafe(&self) -> bool {
        self.faults != 0
    }

    fn from_faults(faults: u8) -> Self {
        let mut reason = String::new();
        for fault in SafetyFault::ALL {
            if faults & fault.mask() == 0 {
                continue;
            }
            if !reason.is_empty() {
                let _ = reason.push('+');
            }
            let _ = reason.push_str(fault.tag());
        }
        Self { faults, reason }
    }
}

/// Safety interlock with edge-logged fault latching.
pub struct SafetyInterlock {
    water_empty_percent: u8,
    /// Fault bitmask from the last live evaluation.
    faults: u8,
}

impl SafetyInterlock {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            water_empty_percent: config.water_empty_percent,
            faults: 0,
        }
    }

    /// Evaluate all hard-stop predicates against `snap`.
    pub fn evaluate(&mut self, snap: &SensorSnapshot) -> InterlockVerdict {
        if !snap.is_live() {
            return InterlockVerdict::safe();
        }

        self.eval_fault(
            SafetyFault::WaterEmpty,
            snap.water_percent <= self.water_empty_percent,
        );
        self.eval_fault(SafetyFault::TiltFall, snap.tilt == TiltState::Fall);

        InterlockVerdict::from_faults(self.faults)
    }

    /// Fault bitmask from the last live evaluation.
    pub fn faults(&self) -> u8 {
        self.faults
    }

    // ── Internal ──────────────────────────────────────────────────

    fn eval_fault(&mut self, fault: SafetyFault, condition: bool) {
        if condition {
            if self.faults & fault.mask() == 0 {
                error!("SAFETY | fault set: {fault}");
            }
            self.faults |= fault.mask();
        } else {
            if self.faults & fault.mask() != 0 {
                info!("SAFETY | fault cleared: {fault}");
            }
            self.faults &= !fault.mask();
        }
    }
}
