mod common;

use std::time::Duration;

use chrono::{Duration as Days, Utc};
use common::*;
use datarequest_types::Status;
use serde_json::json;
use tokio::sync::watch;

#[tokio::test]
async fn overdue_review_is_forced_to_reviewed() {
    let h = harness();
    let o = &h.orchestrator;
    let id = under_review(&h, &["m1", "m2"], 1).await;
    o.submit_review(&member("m1"), id, json!({})).await.unwrap();

    let sweeper = o.sweeper();
    let early = sweeper.sweep_at(Utc::now()).await.unwrap();
    assert_eq!(early.examined, 1);
    assert_eq!(early.skipped, 1);
    assert!(early.transitioned.is_empty());

    let late = sweeper
        .sweep_at(Utc::now() + Days::days(2))
        .await
        .unwrap();
    assert_eq!(late.transitioned, vec![id]);
    assert_eq!(o.get_status(id).await.unwrap(), Status::Reviewed);
    assert!(o
        .get_provenance(&pm(), id)
        .await
        .unwrap()
        .contains_key(&Status::Reviewed));

    let again = sweeper
        .sweep_at(Utc::now() + Days::days(3))
        .await
        .unwrap();
    assert_eq!(again.examined, 0);
    assert!(again.transitioned.is_empty());

    let err = o
        .submit_review(&member("m2"), id, json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "illegal_status");
}

#[tokio::test]
async fn sweep_stops_when_shutdown_is_signalled() {
    let h = harness();
    under_review(&h, &["m1"], 1).await;
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let report = h
        .orchestrator
        .sweeper()
        .sweep_until(Utc::now() + Days::days(2), &rx)
        .await
        .unwrap();
    assert!(report.cancelled);
    assert!(report.transitioned.is_empty());
}

#[tokio::test]
async fn run_loop_exits_on_shutdown() {
    let h = harness();
    let sweeper = h.orchestrator.sweeper();
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(async move { sweeper.run(Duration::from_millis(10), rx).await });
    tokio::time::sleep(Duration::from_millis(30)).await;
    tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("sweeper did not stop")
        .unwrap();
}

#[tokio::test]
async fn configured_sweeper_can_be_disabled() {
    let h = harness();
    let (tx, rx) = watch::channel(false);
    let handle = h
        .orchestrator
        .spawn_sweeper(rx.clone())
        .expect("sweeper is enabled by default");
    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("sweeper did not stop")
        .unwrap();

    let mut config = datarequest_engine::WorkflowConfig::default();
    config.sweeper.enabled = false;
    let disabled = datarequest_engine::WorkflowOrchestrator::new(
        config,
        h.storage.clone(),
        h.directory.clone(),
        std::sync::Arc::new(datarequest_engine::MockValidator::accept_all()),
        h.notifier.clone(),
    );
    assert!(disabled.spawn_sweeper(rx).is_none());
}
