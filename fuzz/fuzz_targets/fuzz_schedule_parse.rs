//! Fuzz target: schedule bound and mode parsing
//!
//! Feeds arbitrary store text through `parse_hhmm` and `Mode::parse` and
//! evaluates the resulting window at a fuzzed time of day, asserting:
//! - No panics on any input
//! - Accepted bounds are valid minutes of the day
//! - The countdown never exceeds one day
//!
//! cargo fuzz run fuzz_schedule_parse

#![no_main]

use climate_gateway::control::decision::{Mode, strip_quotes};
use climate_gateway::schedule::{ScheduleConfig, ScheduleWindow, TimeOfDay, parse_hhmm};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let secs = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let Ok(text) = core::str::from_utf8(&data[4..]) else {
        return;
    };

    let _ = Mode::parse(text);

    let (start, stop) = text.split_once('|').unwrap_or((text, text));
    let start = parse_hhmm(strip_quotes(start)).ok();
    let stop = parse_hhmm(strip_quotes(stop)).ok();
    for bound in [start, stop].into_iter().flatten() {
        assert!(bound < 1440, "bound outside the day");
    }

    let config = ScheduleConfig {
        enabled: true,
        start_minute: start,
        stop_minute: stop,
    };
    let now = TimeOfDay::from_unix(i64::from(secs), 0);
    if let Some(status) = ScheduleWindow::evaluate(&config, Some(now)) {
        assert!(status.countdown_secs <= 86_400);
    }
});
