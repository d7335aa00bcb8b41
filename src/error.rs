//! Unified error types for the climate gateway.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! control loop's error handling uniform. All variants are `Copy` so they
//! can be passed through the reconciliation path without allocation.
//!
//! Nothing in the control core is fatal: every variant here maps onto a
//! "value unavailable this tick" or "best-effort write skipped" outcome.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level gateway error
// ---------------------------------------------------------------------------

/// Every fallible operation in the gateway funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The remote configuration store rejected or failed a request.
    Store(StoreError),
    /// The command link to the actuator node failed.
    Link(LinkError),
    /// A schedule bound ("HH:MM") could not be parsed.
    Schedule(ScheduleParseError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => write!(f, "store: {e}"),
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Schedule(e) => write!(f, "schedule: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// Store session is not authenticated / connected yet.
    NotReady,
    /// No value exists at the requested path.
    NotFound,
    /// A value exists but has a different type than requested.
    TypeMismatch,
    /// Transport-level failure or timeout.
    Io,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => write!(f, "store not ready"),
            Self::NotFound => write!(f, "path not found"),
            Self::TypeMismatch => write!(f, "type mismatch"),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

// ---------------------------------------------------------------------------
// Command link errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// The peer node did not acknowledge at transport level.
    PeerUnreachable,
    /// Outbound queue is full; the command was dropped.
    QueueFull,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerUnreachable => write!(f, "peer unreachable"),
            Self::QueueFull => write!(f, "send queue full"),
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Schedule parse errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleParseError {
    /// Not of the form `H:M` / `HH:MM`.
    Malformed,
    /// Hour outside 0–23 or minute outside 0–59.
    OutOfRange,
}

impl fmt::Display for ScheduleParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed HH:MM"),
            Self::OutOfRange => write!(f, "time of day out of range"),
        }
    }
}

impl From<ScheduleParseError> for Error {
    fn from(e: ScheduleParseError) -> Self {
        Self::Schedule(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Gateway-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
