//! Single-slot sensor feed.
//!
//! The link receive callback overwrites the slot with every packet it
//! decodes; the tick loop takes whatever is newest, at most once per tick,
//! and never waits.  A packet that arrives while the previous one is
//! still unread replaces it; only the latest reading matters.
//!
//! Backed by an `embassy-sync` [`Signal`], which is exactly a
//! "latest value wins" cell guarded by a critical section, so the
//! producer may run on another task or core.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use super::SensorSnapshot;

/// The shared slot between the link callback (producer) and the tick loop.
pub struct SensorSlot {
    inner: Signal<CriticalSectionRawMutex, SensorSnapshot>,
}

impl SensorSlot {
    pub const fn new() -> Self {
        Self {
            inner: Signal::new(),
        }
    }

    /// Store `snapshot`, replacing any unread value.
    pub fn publish(&self, snapshot: SensorSnapshot) {
        self.inner.signal(snapshot);
    }

    /// True if a value has been published and not yet taken.
    pub fn has_pending(&self) -> bool {
        self.inner.signaled()
    }

    /// Take the pending value, if any.
    fn take(&self) -> Option<SensorSnapshot> {
        self.inner.try_take()
    }
}

impl Default for SensorSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumer half: remembers the most recent snapshot across ticks.
///
/// Until the first packet arrives the reader yields the default snapshot,
/// whose node id is the unset sentinel, so safety and auto-mode decisions
/// defer to their not-live behaviour.
pub struct SensorReader<'a> {
    slot: &'a SensorSlot,
    latest: SensorSnapshot,
    received: u64,
}

impl<'a> SensorReader<'a> {
    pub fn new(slot: &'a SensorSlot) -> Self {
        Self {
            slot,
            latest: SensorSnapshot::default(),
            received: 0,
        }
    }

    /// Pull a fresh value from the slot if one is waiting, then return the
    /// most recent snapshot.
    pub fn latest(&mut self) -> &SensorSnapshot {
        if let Some(snapshot) = self.slot.take() {
            self.latest = snapshot;
            self.received = self.received.wrapping_add(1);
        }
        &self.latest
    }

    /// Number of packets consumed so far.
    pub fn received(&self) -> u64 {
        self.received
    }
}
