//! Integration tests for one [`ActuatorController`] driven tick by tick.
//!
//! Default timing: config poll every 2 s, heartbeat after 3 s without a
//! send, mismatch recheck after 900 ms, three retries before handover.
//! Ticks below run once per second starting at 1 s uptime.

use climate_gateway::control::controller::ActuatorProfile;
use climate_gateway::control::decision::Mode;
use climate_gateway::control::reconcile::ReconPhase;
use climate_gateway::sensors::{ActuatorId, TiltState};
use serde_json::json;

use crate::mock_hw::{Rig, at, live_node, with_feedback};

fn fan_manual(on: bool) -> Rig {
    Rig::new(
        ActuatorProfile::fan(),
        json!({ "fan": { "mode": "manual", "manual_state": on, "target_humidity": 60 } }),
    )
}

fn steam_scheduled(on: bool, start: &str, stop: &str) -> Rig {
    Rig::new(
        ActuatorProfile::steam(),
        json!({
            "steam": {
                "mode": "manual",
                "manual_state": on,
                "target_humidity": 60,
                "schedule": { "enable": true, "start": start, "stop": stop }
            }
        }),
    )
}

// ── Readiness ─────────────────────────────────────────────────

#[test]
fn not_ready_store_is_a_no_op() {
    let mut rig = fan_manual(true);
    rig.store.set_ready(false);

    for t in 1..=5 {
        rig.tick(t * 1000, at(9, 0, 0), &live_node());
    }

    assert!(rig.link.sent.is_empty(), "nothing may be sent before the store is ready");
    assert!(rig.log.lines.is_empty());
    assert_eq!(rig.ctl.ticks(), 0);
    assert_eq!(rig.store.writes("fan/status"), 0);
    assert_eq!(rig.ctl.recon_state().phase, ReconPhase::Synced);
}

// ── Safety interlock ──────────────────────────────────────────

#[test]
fn empty_reservoir_forces_off_in_manual_on() {
    let mut rig = fan_manual(true);
    rig.tick(1000, None, &live_node());
    assert_eq!(rig.link.last(ActuatorId::Fan), Some(true));

    let mut dry = live_node();
    dry.water_percent = 5;
    rig.tick(2000, None, &dry);

    assert_eq!(rig.link.sent, vec![(ActuatorId::Fan, true), (ActuatorId::Fan, false)]);
    assert!(rig.ctl.config().manual_override, "manual setting itself is untouched");
}

#[test]
fn fallen_unit_blocks_an_active_schedule() {
    let mut rig = steam_scheduled(false, "08:00", "17:00");
    let mut fallen = live_node();
    fallen.tilt = TiltState::Fall;

    rig.tick(1000, at(9, 0, 0), &fallen);
    assert_eq!(rig.link.count(ActuatorId::Steam), 0, "desired stays OFF");

    rig.tick(2000, at(9, 0, 1), &live_node());
    assert_eq!(rig.link.last(ActuatorId::Steam), Some(true), "upright again: window wins");
}

#[test]
fn interlock_is_ignored_before_the_feed_is_live() {
    let mut rig = fan_manual(true);
    // Default snapshot: node id unset, water 0%.
    rig.tick(1000, None, &Default::default());
    assert_eq!(rig.link.last(ActuatorId::Fan), Some(true));
}

// ── Schedule ──────────────────────────────────────────────────

#[test]
fn schedule_window_forces_on_over_manual_off() {
    let mut rig = steam_scheduled(false, "08:00", "17:00");
    rig.tick(1000, at(9, 0, 0), &live_node());

    assert_eq!(rig.link.last(ActuatorId::Steam), Some(true));
    assert_eq!(
        rig.store.int("steam/schedule/countdown"),
        Some(8 * 3600),
        "in-window countdown runs to the stop time"
    );
}

#[test]
fn schedule_outside_window_defers_to_manual() {
    let mut rig = steam_scheduled(false, "08:00", "17:00");
    rig.tick(1000, at(17, 0, 0), &live_node());
    assert_eq!(rig.link.count(ActuatorId::Steam), 0);
    assert_eq!(rig.store.int("steam/schedule/countdown"), Some(0));
}

#[test]
fn wrapped_window_covers_midnight() {
    let mut rig = steam_scheduled(false, "22:00", "06:00");
    rig.tick(1000, at(2, 30, 0), &live_node());
    assert_eq!(rig.link.last(ActuatorId::Steam), Some(true));
}

#[test]
fn bad_bound_deactivates_the_window() {
    let mut rig = steam_scheduled(false, "8am", "17:00");
    rig.tick(1000, at(9, 0, 0), &live_node());

    assert_eq!(rig.ctl.schedule().start_minute, None);
    assert_eq!(rig.ctl.schedule().stop_minute, Some(17 * 60));
    assert_eq!(rig.link.count(ActuatorId::Steam), 0);
    assert_eq!(rig.store.writes("steam/schedule/countdown"), 0);
}

#[test]
fn schedule_is_inert_without_wall_clock() {
    let mut rig = steam_scheduled(false, "00:00", "23:59");
    rig.tick(1000, None, &live_node());
    assert_eq!(rig.link.count(ActuatorId::Steam), 0);
    assert_eq!(rig.store.writes("steam/schedule/countdown"), 0);
}

#[test]
fn countdown_publishes_on_minute_then_ten_second_boundaries() {
    let mut rig = steam_scheduled(false, "08:00", "17:00");
    let key = "steam/schedule/countdown";

    rig.tick(1000, at(16, 58, 0), &live_node());
    assert_eq!(rig.store.int(key), Some(120));
    assert_eq!(rig.store.writes(key), 1);

    rig.tick(2000, at(16, 58, 1), &live_node());
    assert_eq!(rig.store.writes(key), 1, "mid-minute: no publish");

    rig.tick(3000, at(16, 59, 10), &live_node());
    assert_eq!(rig.store.int(key), Some(50));
    assert_eq!(rig.store.writes(key), 2);

    rig.tick(4000, at(16, 59, 15), &live_node());
    assert_eq!(rig.store.writes(key), 2, "45 s is not a 10 s boundary");

    rig.tick(4500, at(16, 59, 20), &live_node());
    assert_eq!(rig.store.int(key), Some(40));
    assert_eq!(rig.store.writes(key), 3);

    rig.tick(4600, at(16, 59, 20), &live_node());
    assert_eq!(rig.store.writes(key), 3, "debounced");
}

// ── User override ─────────────────────────────────────────────

#[test]
fn manual_change_cancels_the_schedule() {
    let mut rig = steam_scheduled(false, "08:00", "17:00");
    rig.tick(1000, at(18, 0, 0), &live_node());
    assert!(rig.ctl.schedule().enabled, "first poll is only the baseline");

    rig.store.set("steam/manual_state", json!(true));
    rig.tick(2000, at(18, 0, 1), &live_node());
    assert!(rig.ctl.schedule().enabled, "not polled yet");

    rig.tick(3000, at(18, 0, 2), &live_node());
    assert!(!rig.ctl.schedule().enabled);
    assert_eq!(rig.store.bool("steam/schedule/enable"), Some(false));
    assert_eq!(rig.store.writes("steam/schedule/enable"), 1);
    assert!(rig.log.contains("SCHEDULE | STEAM cancelled by user override"));
    assert_eq!(rig.link.last(ActuatorId::Steam), Some(true), "manual ON now applies");

    rig.tick(5000, at(18, 0, 4), &live_node());
    assert_eq!(rig.store.writes("steam/schedule/enable"), 1, "cancelled once");
    assert_eq!(rig.log.lines.len(), 1);
}

#[test]
fn mode_change_cancels_the_schedule() {
    let mut rig = steam_scheduled(false, "08:00", "17:00");
    rig.tick(1000, at(9, 0, 0), &live_node());
    rig.store.set("steam/mode", json!("auto"));
    rig.tick(3000, at(9, 0, 2), &live_node());

    assert_eq!(rig.ctl.config().mode, Mode::Auto);
    assert!(!rig.ctl.schedule().enabled);
}

#[test]
fn boot_with_non_default_mode_keeps_the_schedule() {
    let mut rig = Rig::new(
        ActuatorProfile::steam(),
        json!({
            "steam": {
                "mode": "auto",
                "manual_state": true,
                "schedule": { "enable": true, "start": "08:00", "stop": "17:00" }
            }
        }),
    );
    rig.tick(1000, at(9, 0, 0), &live_node());
    rig.tick(3000, at(9, 0, 2), &live_node());

    assert!(rig.ctl.schedule().enabled);
    assert_eq!(rig.store.writes("steam/schedule/enable"), 0);
    assert!(rig.log.lines.is_empty());
}

// ── Config polling ────────────────────────────────────────────

#[test]
fn failed_read_keeps_last_known_value() {
    let mut rig = fan_manual(true);
    let fed_back = with_feedback(ActuatorId::Fan, true);
    rig.tick(1000, None, &fed_back);
    assert_eq!(rig.link.count(ActuatorId::Fan), 1);

    rig.store.fail_path("fan/manual_state");
    rig.store.set("fan/manual_state", json!(false));
    rig.tick(3000, None, &fed_back);
    assert!(rig.ctl.config().manual_override);
    assert_eq!(rig.link.count(ActuatorId::Fan), 1);

    rig.store.heal_path("fan/manual_state");
    rig.tick(5000, None, &fed_back);
    assert!(!rig.ctl.config().manual_override);
    assert_eq!(rig.link.last(ActuatorId::Fan), Some(false));
}

#[test]
fn unknown_mode_decides_off() {
    let mut rig = Rig::new(
        ActuatorProfile::fan(),
        json!({ "fan": { "mode": "\"eco\"", "manual_state": true } }),
    );
    rig.tick(1000, None, &live_node());
    assert_eq!(rig.ctl.config().mode, Mode::Unknown);
    assert_eq!(rig.link.count(ActuatorId::Fan), 0);
}

#[test]
fn quoted_mode_text_is_accepted() {
    let mut rig = Rig::new(
        ActuatorProfile::climate(),
        json!({ "control": { "mode": "\"auto\"", "target_humidity": 60 } }),
    );
    let mut dry = live_node();
    dry.humidity_pct = Some(40.0);
    rig.tick(1000, None, &dry);
    assert_eq!(rig.ctl.config().mode, Mode::Auto);
    assert_eq!(rig.link.last(ActuatorId::Climate), Some(true));
}

// ── Auto mode ─────────────────────────────────────────────────

#[test]
fn auto_without_humidity_is_off() {
    let mut rig = Rig::new(
        ActuatorProfile::climate(),
        json!({ "control": { "mode": "auto", "target_humidity": 60 } }),
    );
    let mut blind = live_node();
    blind.humidity_pct = None;
    rig.tick(1000, None, &blind);
    assert_eq!(rig.link.count(ActuatorId::Climate), 0);

    // A zero reading is a failed sensor read, not a dry room.
    blind.humidity_pct = Some(0.0);
    rig.tick(2000, None, &blind);
    assert_eq!(rig.link.count(ActuatorId::Climate), 0);

    let mut dry = live_node();
    dry.humidity_pct = Some(45.0);
    rig.tick(3000, None, &dry);
    assert_eq!(rig.link.last(ActuatorId::Climate), Some(true));
}

// ── Reconciliation ────────────────────────────────────────────

#[test]
fn feedback_is_published_to_status_key() {
    let mut rig = fan_manual(false);
    let on = with_feedback(ActuatorId::Fan, true);

    rig.tick(1000, None, &on);
    assert_eq!(rig.store.bool("fan/status"), Some(true));
    rig.tick(2000, None, &on);
    assert_eq!(rig.store.writes("fan/status"), 1, "published on change only");

    rig.tick(3000, None, &live_node());
    assert_eq!(rig.store.bool("fan/status"), Some(false));
    assert_eq!(rig.store.writes("fan/status"), 2);
}

#[test]
fn converged_actuator_only_sends_heartbeats() {
    let mut rig = fan_manual(true);
    let on = with_feedback(ActuatorId::Fan, true);
    for t in 1..=10 {
        rig.tick(t * 1000, None, &on);
    }

    // Change at 1 s, heartbeats at 5 s and 9 s.
    assert_eq!(rig.link.sent, vec![(ActuatorId::Fan, true); 3]);
    assert_eq!(rig.ctl.recon_state().phase, ReconPhase::Synced);
    assert!(rig.log.lines.is_empty());
}

#[test]
fn stuck_relay_ends_in_trust_handover() {
    let mut rig = fan_manual(true);
    let stuck_off = live_node();

    rig.tick(1000, None, &stuck_off);
    assert_eq!(rig.ctl.recon_state().phase, ReconPhase::Pending);

    for t in 2..=4 {
        rig.tick(t * 1000, None, &stuck_off);
        assert_eq!(rig.ctl.recon_state().phase, ReconPhase::Mismatched);
        assert_eq!(rig.ctl.recon_state().mismatch_count as u64, t - 1);
    }

    rig.tick(5000, None, &stuck_off);
    let st = rig.ctl.recon_state();
    assert_eq!(st.phase, ReconPhase::Synced);
    assert!(!st.last_commanded, "feedback adopted");
    assert_eq!(st.mismatch_count, 0);

    // One change plus three retries, all ON.
    assert_eq!(rig.link.sent, vec![(ActuatorId::Fan, true); 4]);
    assert_eq!(rig.store.bool("fan/manual_state"), Some(false));
    assert_eq!(rig.store.writes("fan/manual_state"), 1);
    assert_eq!(rig.log.lines.len(), 1);
    assert!(
        rig.log
            .contains("MISMATCH PERSIST | FAN trusting node, state=OFF, manual override synced")
    );

    // The write-back is not mistaken for a user override on later polls.
    for t in 6..=9 {
        rig.tick(t * 1000, None, &stuck_off);
    }
    assert!(!rig.ctl.config().manual_override);
    assert_eq!(rig.log.lines.len(), 1);
    assert_eq!(rig.link.sent.len(), 5, "one OFF heartbeat at 8 s");
    assert_eq!(rig.link.last(ActuatorId::Fan), Some(false));
}

#[test]
fn failed_write_back_does_not_cancel_the_schedule() {
    let mut rig = steam_scheduled(true, "08:00", "17:00");
    let evening = at(18, 0, 0);
    let stuck_off = live_node();

    for t in 1..=4 {
        rig.tick(t * 1000, evening, &stuck_off);
    }
    assert_eq!(rig.ctl.recon_state().mismatch_count, 3);

    rig.store.fail_path("steam/manual_state");
    rig.tick(5000, evening, &stuck_off);
    rig.store.heal_path("steam/manual_state");

    assert!(!rig.ctl.recon_state().last_commanded, "feedback adopted");
    assert!(rig.ctl.config().manual_override, "user intent kept");
    assert_eq!(rig.log.lines, ["MISMATCH PERSIST | STEAM trusting node, state=OFF"]);

    // Next poll at 7 s reads the unchanged user value.
    for t in 6..=7 {
        rig.tick(t * 1000, evening, &stuck_off);
    }
    assert!(rig.ctl.schedule().enabled);
    assert_eq!(rig.store.bool("steam/schedule/enable"), Some(true));
    assert_eq!(rig.store.writes("steam/schedule/enable"), 0);
    assert_eq!(rig.store.bool("steam/manual_state"), Some(true));
    assert_eq!(rig.log.lines.len(), 1, "no cancellation: {:?}", rig.log.lines);
}

#[test]
fn handover_in_auto_mode_leaves_manual_key_alone() {
    let mut rig = Rig::new(
        ActuatorProfile::climate(),
        json!({ "control": { "mode": "auto", "manual_state": false, "target_humidity": 60 } }),
    );
    let mut dry = live_node();
    dry.humidity_pct = Some(40.0);
    for t in 1..=5 {
        rig.tick(t * 1000, None, &dry);
    }

    assert!(rig.log.contains("MISMATCH PERSIST | CONTROL trusting node, state=OFF"));
    assert!(!rig.log.contains("manual override synced"));
    assert_eq!(rig.store.writes("control/manual_state"), 0);
}

#[test]
fn late_feedback_resolves_mismatch() {
    let mut rig = fan_manual(true);
    rig.tick(1000, None, &live_node());
    rig.tick(2000, None, &live_node());
    assert_eq!(rig.ctl.recon_state().mismatch_count, 1);

    rig.tick(3000, None, &with_feedback(ActuatorId::Fan, true));
    let st = rig.ctl.recon_state();
    assert_eq!(st.phase, ReconPhase::Synced);
    assert_eq!(st.mismatch_count, 0);
    assert!(rig.log.lines.is_empty(), "resolution is not operator-visible");
}

#[test]
fn send_failures_surface_as_mismatch() {
    let mut rig = fan_manual(true);
    rig.link.fail_with = Some(climate_gateway::error::LinkError::PeerUnreachable);
    rig.tick(1000, None, &live_node());
    rig.tick(2000, None, &live_node());

    assert_eq!(rig.link.count(ActuatorId::Fan), 2, "retried despite the failed send");
    assert_eq!(rig.ctl.recon_state().phase, ReconPhase::Mismatched);
}
