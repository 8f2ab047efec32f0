//! Unit tests for the per-session watchdog timer.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use quest_passer::orchestrator::watchdog::{Watchdog, WatchdogTick};

fn test_watchdog(
    session_id: &str,
    interval_secs: u64,
) -> (Watchdog, mpsc::Receiver<WatchdogTick>, CancellationToken) {
    let ct = CancellationToken::new();
    let (tx, rx) = mpsc::channel(8);
    let watchdog = Watchdog::new(
        session_id.to_owned(),
        Duration::from_secs(interval_secs),
        tx,
        ct.clone(),
    );
    (watchdog, rx, ct)
}

#[tokio::test(start_paused = true)]
async fn first_tick_waits_one_interval() {
    let (watchdog, mut rx, _ct) = test_watchdog("s1", 5);
    let handle = watchdog.spawn();
    assert_eq!(handle.session_id(), "s1");

    let early = tokio::time::timeout(Duration::from_secs(4), rx.recv()).await;
    assert!(early.is_err(), "no tick before the first interval");

    let tick = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("tick after one interval")
        .expect("channel open");
    assert_eq!(tick.session_id, "s1");
}

#[tokio::test(start_paused = true)]
async fn ticks_repeat() {
    let (watchdog, mut rx, _ct) = test_watchdog("s2", 1);
    let _handle = watchdog.spawn();

    for _ in 0..3 {
        let tick = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("tick")
            .expect("channel open");
        assert_eq!(tick.session_id, "s2");
    }
}

#[tokio::test(start_paused = true)]
async fn dropping_handle_stops_ticks() {
    let (watchdog, mut rx, _ct) = test_watchdog("s3", 1);
    let handle = watchdog.spawn();
    drop(handle);

    let next = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("task exits and closes the channel");
    assert!(next.is_none(), "no tick after the handle is dropped");
}

#[tokio::test(start_paused = true)]
async fn parent_cancellation_stops_ticks() {
    let (watchdog, mut rx, ct) = test_watchdog("s4", 1);
    let handle = watchdog.spawn();
    ct.cancel();

    let next = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("task exits and closes the channel");
    assert!(next.is_none());
    handle.await_completion().await;
}
