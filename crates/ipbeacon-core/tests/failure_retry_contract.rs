//! Contract Test: Retry by Next Interval
//!
//! Constraints verified:
//! - A failed fetch skips reconciliation and leaves the observed IP alone
//! - A failed reconciliation leaves the observed IP alone
//! - The same new IP is reattempted on the next cycle
//! - The loop keeps running after failures and stops on shutdown
//!
//! If this test fails, a transient outage can leave the channel stale
//! until the IP changes again.

mod common;

use common::*;
use ipbeacon_core::{CycleOutcome, PollerEvent};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn fetch_failure_skips_reconciliation() {
    let source = ScriptedIpSource::new(vec![Err("connection reset".to_string())]);
    let channel = Arc::new(RecordingChannel::new());
    let (mut poller, mut events) = test_poller(&source, &channel);

    let outcome = poller.poll_once().await;

    assert!(
        matches!(&outcome, CycleOutcome::FetchFailed { error } if error.contains("connection reset")),
        "got {:?}",
        outcome
    );
    assert_eq!(poller.observed_ip(), None);
    assert!(channel.calls().is_empty());
    assert!(matches!(
        drain_events(&mut events).as_slice(),
        [PollerEvent::FetchFailed { .. }]
    ));
}

#[tokio::test]
async fn fetch_failure_keeps_existing_baseline() {
    let source = ScriptedIpSource::new(vec![
        Ok(ip("1.2.3.4")),
        Err("timeout".to_string()),
        Ok(ip("1.2.3.4")),
    ]);
    let channel = Arc::new(RecordingChannel::new());
    let (mut poller, _events) = test_poller(&source, &channel);

    poller.poll_once().await;
    channel.clear_calls();

    assert!(matches!(poller.poll_once().await, CycleOutcome::FetchFailed { .. }));
    assert_eq!(poller.observed_ip(), Some(ip("1.2.3.4")));

    assert!(matches!(poller.poll_once().await, CycleOutcome::Unchanged { .. }));
    assert!(channel.calls().is_empty());
}

#[tokio::test]
async fn reconcile_failure_keeps_observed_ip_and_retries_same_value() {
    let source = ScriptedIpSource::new(vec![Ok(ip("1.2.3.4")), Ok(ip("5.6.7.8"))]);
    let channel = Arc::new(RecordingChannel::new());
    let (mut poller, _events) = test_poller(&source, &channel);

    poller.poll_once().await;
    assert_eq!(poller.observed_ip(), Some(ip("1.2.3.4")));

    channel.fail(Operation::Edit);
    let outcome = poller.poll_once().await;
    assert!(
        matches!(&outcome, CycleOutcome::ReconcileFailed { new_ip, .. } if *new_ip == ip("5.6.7.8")),
        "got {:?}",
        outcome
    );
    assert_eq!(
        poller.observed_ip(),
        Some(ip("1.2.3.4")),
        "Observed IP must not move on failure"
    );

    channel.recover(Operation::Edit);
    let outcome = poller.poll_once().await;
    assert!(
        matches!(
            &outcome,
            CycleOutcome::Reconciled { previous_ip: Some(prev), new_ip, .. }
                if *prev == ip("1.2.3.4") && *new_ip == ip("5.6.7.8")
        ),
        "got {:?}",
        outcome
    );
    assert_eq!(poller.observed_ip(), Some(ip("5.6.7.8")));
    assert_eq!(
        channel.pinned()[0].content,
        "Current IP Address: `5.6.7.8`"
    );
}

#[tokio::test]
async fn announcement_failure_is_retried_in_full() {
    let source = ScriptedIpSource::fixed(ip("1.2.3.4"));
    let channel = Arc::new(RecordingChannel::new());
    channel.seed_pinned("Current IP Address: `9.9.9.9`");
    let (mut poller, _events) = test_poller(&source, &channel);

    channel.fail(Operation::Send);
    assert!(matches!(
        poller.poll_once().await,
        CycleOutcome::ReconcileFailed { .. }
    ));
    assert_eq!(poller.observed_ip(), None);

    channel.recover(Operation::Send);
    assert!(matches!(
        poller.poll_once().await,
        CycleOutcome::Reconciled { .. }
    ));
    assert_eq!(channel.sent_with_prefix("IP Address has changed to").len(), 1);
}

#[tokio::test]
async fn loop_retries_after_fetch_failure() {
    let source = ScriptedIpSource::new(vec![
        Err("dns failure".to_string()),
        Err("dns failure".to_string()),
        Ok(ip("1.2.3.4")),
    ]);
    let channel = Arc::new(RecordingChannel::new());
    let (mut poller, _events) = test_poller(&source, &channel);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move {
        poller.run_with_shutdown(shutdown_rx).await;
        poller
    });

    tokio::time::sleep(Duration::from_millis(150)).await;
    shutdown_tx.send(()).unwrap();
    let poller = handle.await.unwrap();

    assert!(source.fetch_count() >= 3, "Loop should keep polling");
    assert_eq!(poller.observed_ip(), Some(ip("1.2.3.4")));
    assert_eq!(
        channel.sent_with_prefix("IP Address has changed to"),
        vec!["IP Address has changed to `1.2.3.4`".to_string()],
        "Steady IP must be announced exactly once"
    );
}

#[tokio::test]
async fn shutdown_stops_loop_and_emits_events() {
    let source = ScriptedIpSource::fixed(ip("1.2.3.4"));
    let channel = Arc::new(RecordingChannel::new());
    let (mut poller, mut events) = test_poller(&source, &channel);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move { poller.run_with_shutdown(shutdown_rx).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("poller stops promptly after shutdown");
    result.unwrap();

    let fetches = source.fetch_count();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(source.fetch_count(), fetches, "No fetches after shutdown");

    let events = drain_events(&mut events);
    assert!(matches!(events.first(), Some(PollerEvent::Started { .. })));
    assert!(matches!(events.last(), Some(PollerEvent::Stopped { .. })));
    assert!(
        events
            .iter()
            .any(|e| matches!(e, PollerEvent::Reconciled { .. }))
    );
}
