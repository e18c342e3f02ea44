use crate::cooldown::{CooldownState, CooldownTracker};
use crate::delta;
use crate::engine::{AlertPolicy, DecisionEngine};
use crate::error::{AlertError, ReadingRole};
use crate::window::{is_quiet, QuietHoursWindow};
use baromon_common::types::{Decision, NotificationMemory, PressureReading};
use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc};

fn jst(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    FixedOffset::east_opt(9 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 6, 1, h, m, s)
        .unwrap()
        .with_timezone(&Utc)
}

fn reading(value_hpa: f64, at: DateTime<Utc>) -> PressureReading {
    PressureReading::new(at, value_hpa)
}

/// Historical reading 30 minutes before `now`, current reading at `now`.
fn pair(historical: f64, current: f64, now: DateTime<Utc>) -> (PressureReading, PressureReading) {
    (
        reading(historical, now - Duration::minutes(30)),
        reading(current, now),
    )
}

// ── Delta evaluator ──

#[test]
fn delta_is_current_minus_historical() {
    let now = jst(9, 0, 0);
    let (h, c) = pair(1013.0, 1012.5, now);
    assert_eq!(delta::evaluate(&h, &c).unwrap().value, -0.5);

    let (h, c) = pair(1010.0, 1012.0, now);
    assert_eq!(delta::evaluate(&h, &c).unwrap().value, 2.0);
}

#[test]
fn delta_rejects_non_finite_values() {
    let now = jst(9, 0, 0);
    let (h, c) = pair(f64::NAN, 1012.0, now);
    match delta::evaluate(&h, &c) {
        Err(AlertError::InvalidReading { which, .. }) => assert_eq!(which, ReadingRole::Historical),
        other => panic!("expected InvalidReading, got {other:?}"),
    }

    let (h, c) = pair(1012.0, f64::INFINITY, now);
    match delta::evaluate(&h, &c) {
        Err(AlertError::InvalidReading { which, .. }) => assert_eq!(which, ReadingRole::Current),
        other => panic!("expected InvalidReading, got {other:?}"),
    }
}

#[test]
fn delta_does_not_validate_time_gap() {
    let now = jst(9, 0, 0);
    let h = reading(1013.0, now);
    let c = reading(1011.0, now - Duration::hours(2));
    assert_eq!(delta::evaluate(&h, &c).unwrap().value, -2.0);
}

// ── Quiet hours ──

#[test]
fn quiet_hours_boundaries_are_half_open() {
    let window = QuietHoursWindow::default();
    assert!(window.is_quiet(jst(0, 0, 0)));
    assert!(window.is_quiet(jst(3, 0, 0)));
    assert!(window.is_quiet(jst(5, 59, 59)));
    assert!(!window.is_quiet(jst(6, 0, 0)));
    assert!(!window.is_quiet(jst(23, 59, 59)));
    assert!(is_quiet(jst(1, 0, 0), &window));
}

#[test]
fn quiet_hours_use_local_offset_not_utc() {
    let window = QuietHoursWindow::default();
    // 20:00 UTC is 05:00 JST the next day.
    let at = Utc.with_ymd_and_hms(2024, 6, 1, 20, 0, 0).unwrap();
    assert!(window.is_quiet(at));
    // 03:00 UTC is 12:00 JST.
    let at = Utc.with_ymd_and_hms(2024, 6, 1, 3, 0, 0).unwrap();
    assert!(!window.is_quiet(at));
}

#[test]
fn quiet_hours_overnight_window() {
    let window = QuietHoursWindow::new(
        NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
        FixedOffset::east_opt(9 * 3600).unwrap(),
    );
    assert!(window.is_quiet(jst(22, 0, 0)));
    assert!(window.is_quiet(jst(23, 30, 0)));
    assert!(window.is_quiet(jst(5, 59, 59)));
    assert!(!window.is_quiet(jst(6, 0, 0)));
    assert!(!window.is_quiet(jst(21, 59, 59)));
}

#[test]
fn quiet_hours_empty_window_is_never_quiet() {
    let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
    let window = QuietHoursWindow::new(noon, noon, FixedOffset::east_opt(0).unwrap());
    let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    assert!(!window.is_quiet(at));
}

// ── Cooldown tracker ──

#[test]
fn cooldown_idle_without_memory() {
    let tracker = CooldownTracker::default();
    let now = jst(9, 0, 0);
    assert_eq!(tracker.state(now, &NotificationMemory::empty()), CooldownState::Idle);
    assert!(tracker.allow(now, &NotificationMemory::empty()));
}

#[test]
fn cooldown_transitions_back_to_idle_exactly_at_six_hours() {
    let tracker = CooldownTracker::default();
    let sent = jst(9, 0, 0);
    let memory = NotificationMemory::sent_at(sent);

    assert_eq!(
        tracker.state(sent + Duration::hours(2), &memory),
        CooldownState::Cooling {
            until: sent + Duration::hours(6)
        }
    );
    assert!(!tracker.allow(sent + Duration::hours(6) - Duration::seconds(1), &memory));
    assert!(tracker.allow(sent + Duration::hours(6), &memory));
    assert!(tracker.allow(sent + Duration::hours(7), &memory));
}

#[test]
fn cooldown_future_last_sent_keeps_cooling() {
    let tracker = CooldownTracker::default();
    let now = jst(9, 0, 0);
    let memory = NotificationMemory::sent_at(now + Duration::minutes(5));
    assert!(!tracker.allow(now, &memory));
}

#[test]
fn cooldown_duration_is_configurable() {
    let tracker = CooldownTracker::new(Duration::minutes(30));
    let sent = jst(9, 0, 0);
    let memory = NotificationMemory::sent_at(sent);
    assert!(!tracker.allow(sent + Duration::minutes(29), &memory));
    assert!(tracker.allow(sent + Duration::minutes(30), &memory));
}

#[test]
fn cooldown_longer_than_the_calendar_saturates() {
    let tracker = CooldownTracker::new(Duration::MAX);
    let sent = jst(9, 0, 0);
    let memory = NotificationMemory::sent_at(sent);
    assert_eq!(
        tracker.state(sent + Duration::days(365), &memory),
        CooldownState::Cooling {
            until: DateTime::<Utc>::MAX_UTC
        }
    );
}

// ── Decision orchestrator ──

#[test]
fn scenario_a_small_drop_does_not_trigger() {
    let engine = DecisionEngine::default();
    let now = jst(9, 0, 0);
    let (h, c) = pair(1013.0, 1012.5, now);
    let outcome = engine.decide(&h, &c, now, &NotificationMemory::empty()).unwrap();
    assert_eq!(outcome.decision, Decision::NoTrigger);
    assert_eq!(outcome.delta.value, -0.5);
    assert!(outcome.memory.is_none());
}

#[test]
fn scenario_b_drop_during_quiet_hours_is_suppressed() {
    let engine = DecisionEngine::default();
    let now = jst(3, 0, 0);
    let (h, c) = pair(1013.0, 1011.5, now);
    let outcome = engine.decide(&h, &c, now, &NotificationMemory::empty()).unwrap();
    assert_eq!(outcome.decision, Decision::SuppressQuietHours);
    assert!(outcome.memory.is_none());
}

#[test]
fn scenario_c_drop_within_cooldown_is_suppressed() {
    let engine = DecisionEngine::default();
    let now = jst(9, 0, 0);
    let (h, c) = pair(1013.0, 1011.5, now);
    let memory = NotificationMemory::sent_at(now - Duration::hours(2));
    let outcome = engine.decide(&h, &c, now, &memory).unwrap();
    assert_eq!(outcome.decision, Decision::SuppressCooldown);
    assert!(outcome.memory.is_none());
}

#[test]
fn scenario_d_drop_after_cooldown_sends() {
    let engine = DecisionEngine::default();
    let now = jst(9, 0, 0);
    let (h, c) = pair(1013.0, 1011.5, now);
    let memory = NotificationMemory::sent_at(now - Duration::hours(7));
    let outcome = engine.decide(&h, &c, now, &memory).unwrap();
    assert_eq!(outcome.decision, Decision::Send);
    assert_eq!(outcome.memory, Some(NotificationMemory::sent_at(now)));
}

#[test]
fn drop_of_exactly_one_hpa_does_not_trigger() {
    let engine = DecisionEngine::default();
    let now = jst(9, 0, 0);

    let (h, c) = pair(1013.0, 1012.0, now);
    let outcome = engine.decide(&h, &c, now, &NotificationMemory::empty()).unwrap();
    assert_eq!(outcome.delta.value, -1.0);
    assert_eq!(outcome.decision, Decision::NoTrigger);

    let (h, c) = pair(1013.0, 1011.9999, now);
    let outcome = engine.decide(&h, &c, now, &NotificationMemory::empty()).unwrap();
    assert_eq!(outcome.decision, Decision::Send);
}

#[test]
fn quiet_boundary_applies_to_decisions() {
    let engine = DecisionEngine::default();

    let now = jst(5, 59, 59);
    let (h, c) = pair(1013.0, 1011.5, now);
    let outcome = engine.decide(&h, &c, now, &NotificationMemory::empty()).unwrap();
    assert_eq!(outcome.decision, Decision::SuppressQuietHours);

    let now = jst(6, 0, 0);
    let (h, c) = pair(1013.0, 1011.5, now);
    let outcome = engine.decide(&h, &c, now, &NotificationMemory::empty()).unwrap();
    assert_eq!(outcome.decision, Decision::Send);
}

#[test]
fn no_trigger_wins_over_quiet_hours_and_cooldown() {
    let engine = DecisionEngine::default();
    let recent = NotificationMemory::sent_at(jst(2, 0, 0));
    let memories = [NotificationMemory::empty(), recent];
    let times = [jst(0, 0, 0), jst(3, 0, 0), jst(9, 0, 0), jst(23, 0, 0)];
    let pairs = [(1013.0, 1013.0), (1013.0, 1012.0), (1013.0, 1012.5), (1000.0, 1010.0)];

    for now in times {
        for memory in &memories {
            for (hist, cur) in pairs {
                let (h, c) = pair(hist, cur, now);
                let outcome = engine.decide(&h, &c, now, memory).unwrap();
                assert_eq!(outcome.decision, Decision::NoTrigger, "{hist} -> {cur} at {now}");
                assert!(outcome.memory.is_none());
            }
        }
    }
}

#[test]
fn quiet_hours_checked_before_cooldown() {
    let engine = DecisionEngine::default();
    let now = jst(4, 0, 0);
    let (h, c) = pair(1013.0, 1011.0, now);
    let memory = NotificationMemory::sent_at(now - Duration::hours(1));
    let outcome = engine.decide(&h, &c, now, &memory).unwrap();
    assert_eq!(outcome.decision, Decision::SuppressQuietHours);
}

#[test]
fn quiet_hours_suppression_does_not_consume_cooldown() {
    let engine = DecisionEngine::default();
    // Sent at 23:00, suppressed through the night, eligible again at 05:00
    // but still quiet until 06:00.
    let memory = NotificationMemory::sent_at(jst(23, 0, 0) - Duration::days(1));

    let night = jst(5, 30, 0);
    let (h, c) = pair(1013.0, 1011.0, night);
    let outcome = engine.decide(&h, &c, night, &memory).unwrap();
    assert_eq!(outcome.decision, Decision::SuppressQuietHours);
    assert!(outcome.memory.is_none());

    let morning = jst(6, 10, 0);
    let (h, c) = pair(1013.0, 1011.0, morning);
    let outcome = engine.decide(&h, &c, morning, &memory).unwrap();
    assert_eq!(outcome.decision, Decision::Send);
    assert_eq!(outcome.memory, Some(NotificationMemory::sent_at(morning)));
}

#[test]
fn invalid_reading_aborts_the_cycle() {
    let engine = DecisionEngine::default();
    let now = jst(9, 0, 0);
    let (h, c) = pair(1013.0, f64::NAN, now);
    assert!(matches!(
        engine.decide(&h, &c, now, &NotificationMemory::empty()),
        Err(AlertError::InvalidReading { .. })
    ));
}

#[test]
fn decide_is_deterministic_for_identical_inputs() {
    let engine = DecisionEngine::default();
    let now = jst(9, 0, 0);
    let (h, c) = pair(1013.0, 1011.5, now);
    let memory = NotificationMemory::sent_at(now - Duration::hours(7));

    let first = engine.decide(&h, &c, now, &memory).unwrap();
    for _ in 0..5 {
        assert_eq!(engine.decide(&h, &c, now, &memory).unwrap(), first);
    }
}

#[test]
fn consecutive_cycles_follow_cooldown_episode() {
    let engine = DecisionEngine::default();
    let mut memory = NotificationMemory::empty();
    let mut sends = Vec::new();

    // A drop that persists all day, evaluated every 10 minutes from 06:00.
    let start = jst(6, 0, 0);
    for step in 0..(18 * 6) {
        let now = start + Duration::minutes(10 * step);
        let (h, c) = pair(1013.0, 1010.0, now);
        let outcome = engine.decide(&h, &c, now, &memory).unwrap();
        if let Some(next) = outcome.memory {
            assert!(next.last_sent_at >= memory.last_sent_at);
            memory = next;
            sends.push(now);
        }
    }

    assert_eq!(sends, vec![jst(6, 0, 0), jst(12, 0, 0), jst(18, 0, 0)]);
}

#[test]
fn custom_policy_threshold() {
    let engine = DecisionEngine::new(AlertPolicy {
        drop_threshold_hpa: 2.0,
        ..AlertPolicy::default()
    });
    let now = jst(9, 0, 0);
    let (h, c) = pair(1013.0, 1011.5, now);
    let outcome = engine.decide(&h, &c, now, &NotificationMemory::empty()).unwrap();
    assert_eq!(outcome.decision, Decision::NoTrigger);
}
