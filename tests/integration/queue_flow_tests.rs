//! Integration tests for queue advancement and arming.

use std::time::Duration;

use quest_passer::models::session::EndReason;
use quest_passer::orchestrator::{SupervisorEvent, SupervisorPhase};

use super::test_helpers::{
    drain, game, next_event, settings_with_duration, start, wait_for_phase, wait_for_start,
};

const WAIT: Duration = Duration::from_secs(1);

fn started_id(event: &SupervisorEvent) -> Option<&str> {
    match event {
        SupervisorEvent::SessionStarted { game, .. } => Some(game.id.as_str()),
        _ => None,
    }
}

#[tokio::test]
async fn enqueue_while_disarmed_does_not_start() {
    let mut h = start(settings_with_duration(930));

    assert!(h.handle.enqueue(game("a", "A")).await.expect("enqueue"));
    assert!(h.handle.enqueue(game("b", "B")).await.expect("enqueue"));

    let snapshot = h.handle.snapshot().await.expect("snapshot");
    assert_eq!(snapshot.phase, SupervisorPhase::Idle);
    assert!(!snapshot.armed);
    assert_eq!(snapshot.queue.len(), 2);
    assert!(h.launcher.launched_ids().is_empty());
    assert!(drain(&mut h.events).is_empty());
}

#[tokio::test]
async fn duplicate_enqueue_is_rejected() {
    let h = start(settings_with_duration(930));

    assert!(h.handle.enqueue(game("a", "A")).await.expect("enqueue"));
    assert!(!h.handle.enqueue(game("a", "A again")).await.expect("enqueue"));
    assert_eq!(h.handle.snapshot().await.expect("snapshot").queue.len(), 1);
}

#[tokio::test]
async fn arming_idle_queue_plays_front_immediately() {
    let mut h = start(settings_with_duration(930));
    h.handle.enqueue(game("a", "A")).await.expect("enqueue");
    h.handle.enqueue(game("b", "B")).await.expect("enqueue");

    h.handle.set_armed(true).await.expect("arm");

    assert_eq!(
        next_event(&mut h.events, WAIT).await,
        SupervisorEvent::QueueAdvanced { game: game("a", "A") }
    );
    assert_eq!(started_id(&next_event(&mut h.events, WAIT).await), Some("a"));

    let snapshot = h.handle.snapshot().await.expect("snapshot");
    assert_eq!(snapshot.phase, SupervisorPhase::Running);
    assert!(snapshot.armed);
    assert_eq!(snapshot.queue, vec![game("b", "B")]);
}

#[tokio::test]
async fn queue_runs_in_order_on_session_end() {
    let mut h = start(settings_with_duration(930));
    for id in ["a", "b", "c"] {
        h.handle.enqueue(game(id, id)).await.expect("enqueue");
    }
    h.handle.set_armed(true).await.expect("arm");
    assert_eq!(wait_for_start(&mut h.events).await, "a");

    h.handle.report_exit("a.exe").await.expect("exit a");
    assert_eq!(wait_for_start(&mut h.events).await, "b");
    let snapshot = h.handle.snapshot().await.expect("snapshot");
    assert_eq!(snapshot.queue, vec![game("c", "c")]);
    assert_eq!(snapshot.session.map(|s| s.catalog_id), Some("b".into()));

    h.handle.stop().await.expect("manual stop b");
    assert_eq!(wait_for_start(&mut h.events).await, "c");
    assert_eq!(h.launcher.launched_ids(), ["a", "b", "c"]);

    h.handle.report_exit("c.exe").await.expect("exit c");
    assert_eq!(
        next_event(&mut h.events, WAIT).await,
        SupervisorEvent::SessionEnded {
            catalog_id: "c".into(),
            reason: EndReason::External,
        }
    );
    assert_eq!(next_event(&mut h.events, WAIT).await, SupervisorEvent::QueueExhausted);

    let snapshot = h.handle.snapshot().await.expect("snapshot");
    assert!(!snapshot.armed);
    assert_eq!(snapshot.phase, SupervisorPhase::Idle);
}

#[tokio::test]
async fn arming_empty_queue_exhausts_once() {
    let mut h = start(settings_with_duration(930));

    h.handle.set_armed(true).await.expect("arm");

    assert_eq!(next_event(&mut h.events, WAIT).await, SupervisorEvent::QueueExhausted);
    assert!(!h.handle.snapshot().await.expect("snapshot").armed);
    assert!(drain(&mut h.events).is_empty(), "exactly one queue-exhausted");
}

#[tokio::test]
async fn arming_while_running_waits_for_session_end() {
    let mut h = start(settings_with_duration(930));
    h.handle.play(game("m", "Manual"), None).await.expect("play");
    h.handle.enqueue(game("a", "A")).await.expect("enqueue");
    drain(&mut h.events);

    h.handle.set_armed(true).await.expect("arm");
    assert_eq!(h.launcher.launched_ids(), ["m"]);

    h.handle.stop().await.expect("stop");
    assert_eq!(wait_for_start(&mut h.events).await, "a");
    assert_eq!(h.launcher.launched_ids(), ["m", "a"]);
}

#[tokio::test]
async fn disarming_never_interrupts_running_session() {
    let mut h = start(settings_with_duration(930));
    h.handle.enqueue(game("a", "A")).await.expect("enqueue");
    h.handle.enqueue(game("b", "B")).await.expect("enqueue");
    h.handle.set_armed(true).await.expect("arm");
    assert_eq!(wait_for_start(&mut h.events).await, "a");

    h.handle.set_armed(false).await.expect("disarm");
    let snapshot = h.handle.snapshot().await.expect("snapshot");
    assert_eq!(snapshot.phase, SupervisorPhase::Running);

    h.handle.report_exit("A.exe").await.expect("exit");
    let snapshot = h.handle.snapshot().await.expect("snapshot");
    assert_eq!(snapshot.phase, SupervisorPhase::Idle);
    assert_eq!(snapshot.queue, vec![game("b", "B")]);
    assert_eq!(h.launcher.launched_ids(), ["a"]);
}

#[tokio::test]
async fn failed_queued_launch_moves_on() {
    let mut h = start(settings_with_duration(930));
    h.launcher.fail_launch_of("bad");
    h.handle.enqueue(game("bad", "Bad")).await.expect("enqueue");
    h.handle.enqueue(game("good", "Good")).await.expect("enqueue");

    h.handle.set_armed(true).await.expect("arm");

    let mut events = Vec::new();
    for _ in 0..4 {
        events.push(next_event(&mut h.events, WAIT).await);
    }
    assert!(matches!(events[0], SupervisorEvent::QueueAdvanced { ref game } if game.id == "bad"));
    assert!(matches!(events[1], SupervisorEvent::LaunchFailed { ref catalog_id, .. } if catalog_id == "bad"));
    assert!(matches!(events[2], SupervisorEvent::QueueAdvanced { ref game } if game.id == "good"));
    assert_eq!(started_id(&events[3]), Some("good"));
    wait_for_phase(&h.handle, SupervisorPhase::Running).await;
    assert!(drain(&mut h.events).is_empty());
}

#[tokio::test]
async fn remove_and_clear_edit_queue() {
    let h = start(settings_with_duration(930));
    for id in ["a", "b", "c"] {
        h.handle.enqueue(game(id, id)).await.expect("enqueue");
    }

    assert!(h.handle.remove("b").await.expect("remove"));
    assert!(!h.handle.remove("b").await.expect("remove absent"));
    assert_eq!(
        h.handle.snapshot().await.expect("snapshot").queue,
        vec![game("a", "a"), game("c", "c")]
    );

    assert_eq!(h.handle.clear_queue().await.expect("clear"), 2);
    assert!(h.handle.snapshot().await.expect("snapshot").queue.is_empty());
}

#[tokio::test]
async fn clear_keeps_armed_flag_while_running() {
    let h = start(settings_with_duration(930));
    h.handle.enqueue(game("a", "A")).await.expect("enqueue");
    h.handle.enqueue(game("b", "B")).await.expect("enqueue");
    h.handle.set_armed(true).await.expect("arm");

    h.handle.clear_queue().await.expect("clear");
    assert!(h.handle.snapshot().await.expect("snapshot").armed);
}

#[tokio::test]
async fn snapshot_estimates_finish_time() {
    let h = start(settings_with_duration(600));
    let idle = h.handle.snapshot().await.expect("snapshot");
    assert!(idle.estimated_finish.is_none());

    h.handle.enqueue(game("a", "A")).await.expect("enqueue");
    h.handle.enqueue(game("b", "B")).await.expect("enqueue");
    let before = chrono::Utc::now();
    let snapshot = h.handle.snapshot().await.expect("snapshot");
    let finish = snapshot.estimated_finish.expect("estimate");

    let lead = finish - before;
    assert!(lead >= chrono::TimeDelta::seconds(1199) && lead <= chrono::TimeDelta::seconds(1201));
}

#[tokio::test(start_paused = true)]
async fn enqueue_and_arm_during_manual_launch_leaves_session_uncapped() {
    let mut h = start(settings_with_duration(60));
    let gate = h.launcher.hold_launches();

    let handle = h.handle.clone();
    let play = tokio::spawn(async move { handle.play(game("a", "A"), None).await });
    wait_for_phase(&h.handle, SupervisorPhase::Starting).await;

    assert!(h.handle.enqueue_and_arm(game("b", "B")).await.expect("enqueue"));
    gate.notify_one();
    play.await.expect("join").expect("play");
    assert_eq!(wait_for_start(&mut h.events).await, "a");

    tokio::time::sleep(Duration::from_secs(600)).await;

    let snapshot = h.handle.snapshot().await.expect("snapshot");
    assert!(!snapshot.armed);
    assert_eq!(snapshot.phase, SupervisorPhase::Running);
    assert_eq!(snapshot.queue, vec![game("b", "B")]);
    assert!(h.launcher.terminated().is_empty());
    assert!(drain(&mut h.events).is_empty());
}

#[tokio::test]
async fn enqueue_and_arm_when_idle_starts_front() {
    let mut h = start(settings_with_duration(930));

    assert!(h.handle.enqueue_and_arm(game("a", "A")).await.expect("enqueue"));

    assert_eq!(wait_for_start(&mut h.events).await, "a");
    assert!(h.handle.snapshot().await.expect("snapshot").armed);
}
