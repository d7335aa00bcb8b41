//! Log sink adapters.
//!
//! - [`ConsoleLogSink`]: writes operator lines to the local logger.
//! - [`StoreLogSink`]: queues lines for the config store's error log and
//!   flushes them once per tick.  A `burster` token bucket caps how many
//!   lines get through so a fault storm cannot flood the store; rejected
//!   lines are counted and reported locally.

use core::time::Duration;

use burster::Limiter;
use heapless::Deque;
use log::{info, warn};

use crate::app::ports::{ConfigStore, LogSink};
use crate::config::GatewayConfig;

/// Store path the remote log is appended to.
pub const PATH_ERROR_LOG: &str = "logs/errors";

/// Lines held between flushes.
const QUEUE_DEPTH: usize = 16;

/// Adapter that logs every line to the serial console.
#[derive(Debug, Default)]
pub struct ConsoleLogSink;

impl ConsoleLogSink {
    pub fn new() -> Self {
        Self
    }
}

impl LogSink for ConsoleLogSink {
    fn append(&mut self, message: &str) {
        info!("REMOTE | {message}");
    }
}

/// Rate-limited remote log, drained into a [`ConfigStore`].
pub struct StoreLogSink {
    limiter: burster::TokenBucket<fn() -> Duration>,
    queue: Deque<String, QUEUE_DEPTH>,
    dropped: u32,
    reported_dropped: u32,
}

impl StoreLogSink {
    pub fn new(config: &GatewayConfig) -> Self {
        Self::with_time_provider(config, platform_now)
    }

    /// Same as [`new`](Self::new) with an injected clock.
    pub fn with_time_provider(config: &GatewayConfig, now: fn() -> Duration) -> Self {
        Self {
            limiter: burster::TokenBucket::new_with_time_provider(
                u64::from(config.remote_log_per_sec),
                u64::from(config.remote_log_burst),
                now,
            ),
            queue: Deque::new(),
            dropped: 0,
            reported_dropped: 0,
        }
    }

    /// Lines rejected by the rate limit or a full queue since start-up.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Append every queued line to [`PATH_ERROR_LOG`].  Stops at the first
    /// failed write and keeps the remaining lines for the next flush.
    pub fn flush(&mut self, store: &mut impl ConfigStore) -> usize {
        if self.dropped != self.reported_dropped {
            warn!(
                "REMOTE | {} log line(s) dropped by rate limit",
                self.dropped - self.reported_dropped
            );
            self.reported_dropped = self.dropped;
        }
        if !store.is_ready() {
            return 0;
        }

        let mut written = 0;
        while let Some(line) = self.queue.front() {
            if store.push_string(PATH_ERROR_LOG, line).is_err() {
                break;
            }
            self.queue.pop_front();
            written += 1;
        }
        written
    }
}

impl LogSink for StoreLogSink {
    fn append(&mut self, message: &str) {
        if self.limiter.try_consume(1).is_err() {
            self.dropped = self.dropped.wrapping_add(1);
            return;
        }
        let line = format!("[{}s] {message}", platform_now().as_secs());
        if self.queue.push_back(line).is_err() {
            self.dropped = self.dropped.wrapping_add(1);
        }
    }
}

// ── Platform time for rate limiter ───────────────────────────

#[cfg(feature = "espidf")]
fn platform_now() -> Duration {
    let us = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
    Duration::from_micros(us as u64)
}

#[cfg(not(feature = "espidf"))]
fn platform_now() -> Duration {
    use std::time::Instant;
    static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    START.get_or_init(Instant::now).elapsed()
}
