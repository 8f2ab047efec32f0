//! Integration tests for the session time budget and quest notification.
//!
//! Run on a paused clock so hour-long budgets finish instantly.

use std::time::Duration;

use tokio::time::Instant;

use quest_passer::models::session::EndReason;
use quest_passer::models::settings::Settings;
use quest_passer::orchestrator::{SupervisorEvent, SupervisorPhase};

use super::test_helpers::{game, next_event, settings_with_duration, start, wait_for_start, POLL};

const LONG: Duration = Duration::from_secs(7200);

#[tokio::test(start_paused = true)]
async fn armed_session_ends_at_time_limit_and_queue_advances() {
    let mut h = start(settings_with_duration(60));
    h.handle.enqueue(game("a", "A")).await.expect("enqueue");
    h.handle.enqueue(game("b", "B")).await.expect("enqueue");
    h.handle.set_armed(true).await.expect("arm");
    assert_eq!(wait_for_start(&mut h.events).await, "a");
    let started = Instant::now();

    assert_eq!(
        next_event(&mut h.events, LONG).await,
        SupervisorEvent::SessionEnded {
            catalog_id: "a".into(),
            reason: EndReason::TimeLimit,
        }
    );
    let ran = started.elapsed();
    assert!(ran >= Duration::from_secs(60), "stopped early: {ran:?}");
    assert!(ran <= Duration::from_secs(60) + POLL, "stopped late: {ran:?}");

    assert_eq!(wait_for_start(&mut h.events).await, "b");
    assert_eq!(
        next_event(&mut h.events, LONG).await,
        SupervisorEvent::SessionEnded {
            catalog_id: "b".into(),
            reason: EndReason::TimeLimit,
        }
    );
    assert_eq!(next_event(&mut h.events, LONG).await, SupervisorEvent::QueueExhausted);
    assert_eq!(h.launcher.terminated(), ["A.exe", "B.exe"]);
}

#[tokio::test(start_paused = true)]
async fn time_limit_fires_exactly_once() {
    let mut h = start(settings_with_duration(60));
    h.handle.enqueue(game("a", "A")).await.expect("enqueue");
    h.handle.set_armed(true).await.expect("arm");
    assert_eq!(wait_for_start(&mut h.events).await, "a");

    assert!(matches!(
        next_event(&mut h.events, LONG).await,
        SupervisorEvent::SessionEnded {
            reason: EndReason::TimeLimit,
            ..
        }
    ));
    assert_eq!(next_event(&mut h.events, LONG).await, SupervisorEvent::QueueExhausted);

    let quiet = tokio::time::timeout(Duration::from_secs(600), h.events.recv()).await;
    assert!(quiet.is_err(), "no further events");
    assert_eq!(h.launcher.terminated().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn manual_session_is_not_time_capped() {
    let mut h = start(settings_with_duration(60));
    h.handle.play(game("a", "A"), None).await.expect("play");
    assert_eq!(wait_for_start(&mut h.events).await, "a");

    let quiet = tokio::time::timeout(LONG, h.events.recv()).await;
    assert!(quiet.is_err(), "disarmed session keeps running");
    assert_eq!(
        h.handle.snapshot().await.expect("snapshot").phase,
        SupervisorPhase::Running
    );
    assert!(h.launcher.terminated().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_time_limit_stop_is_retried_each_tick() {
    let mut h = start(settings_with_duration(60));
    h.handle.enqueue(game("a", "A")).await.expect("enqueue");
    h.handle.set_armed(true).await.expect("arm");
    assert_eq!(wait_for_start(&mut h.events).await, "a");
    h.launcher.set_fail_terminate(true);

    let first = next_event(&mut h.events, LONG).await;
    assert!(matches!(
        first,
        SupervisorEvent::StopFailed {
            reason: EndReason::TimeLimit,
            ..
        }
    ));
    let first_at = Instant::now();

    let second = next_event(&mut h.events, LONG).await;
    assert!(matches!(second, SupervisorEvent::StopFailed { .. }));
    assert!(first_at.elapsed() >= POLL, "retried on the next tick");
    assert_eq!(
        h.handle.snapshot().await.expect("snapshot").phase,
        SupervisorPhase::Running
    );

    h.launcher.set_fail_terminate(false);
    assert_eq!(
        next_event(&mut h.events, LONG).await,
        SupervisorEvent::SessionEnded {
            catalog_id: "a".into(),
            reason: EndReason::TimeLimit,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn budget_notification_fires_once_per_session() {
    let mut h = start(Settings::new(3600, true));
    h.handle.play(game("a", "A"), None).await.expect("play");
    assert_eq!(wait_for_start(&mut h.events).await, "a");

    assert_eq!(
        next_event(&mut h.events, LONG).await,
        SupervisorEvent::BudgetReached {
            catalog_id: "a".into(),
            elapsed_seconds: 930,
        }
    );

    let quiet = tokio::time::timeout(Duration::from_secs(1800), h.events.recv()).await;
    assert!(quiet.is_err(), "notification is one-shot");
}

#[tokio::test(start_paused = true)]
async fn budget_notification_respects_setting() {
    let mut h = start(Settings::new(3600, false));
    h.handle.play(game("a", "A"), None).await.expect("play");
    assert_eq!(wait_for_start(&mut h.events).await, "a");

    let quiet = tokio::time::timeout(Duration::from_secs(1800), h.events.recv()).await;
    assert!(quiet.is_err(), "notifications are off");
}

#[tokio::test(start_paused = true)]
async fn notification_precedes_time_limit_on_same_tick() {
    let mut h = start(Settings::new(930, true));
    h.handle.enqueue(game("a", "A")).await.expect("enqueue");
    h.handle.set_armed(true).await.expect("arm");
    assert_eq!(wait_for_start(&mut h.events).await, "a");

    assert!(matches!(
        next_event(&mut h.events, LONG).await,
        SupervisorEvent::BudgetReached { .. }
    ));
    assert!(matches!(
        next_event(&mut h.events, LONG).await,
        SupervisorEvent::SessionEnded {
            reason: EndReason::TimeLimit,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn shortened_budget_applies_to_running_session() {
    let mut h = start(settings_with_duration(3600));
    h.handle.enqueue(game("a", "A")).await.expect("enqueue");
    h.handle.set_armed(true).await.expect("arm");
    assert_eq!(wait_for_start(&mut h.events).await, "a");

    tokio::time::sleep(Duration::from_secs(120)).await;
    h.settings
        .update(|s| s.session_duration_seconds = 60)
        .expect("update");

    let ended = tokio::time::timeout(POLL + Duration::from_secs(1), h.events.recv())
        .await
        .expect("ends on the next tick")
        .expect("channel open");
    assert!(matches!(
        ended,
        SupervisorEvent::SessionEnded {
            reason: EndReason::TimeLimit,
            ..
        }
    ));
}
