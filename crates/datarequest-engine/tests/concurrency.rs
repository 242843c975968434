mod common;

use std::collections::BTreeSet;
use std::time::Duration;

use common::*;
use datarequest_engine::Submission;
use datarequest_types::{RequestId, Status};
use serde_json::json;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_last_reviewers_transition_once() {
    let h = harness();
    let id = under_review(&h, &["m1", "m2"], 14).await;

    let handles: Vec<_> = ["m1", "m2"]
        .into_iter()
        .map(|name| {
            let o = h.orchestrator.clone();
            tokio::spawn(async move { o.submit_review(&member(name), id, json!({})).await })
        })
        .collect();

    let mut remaining = Vec::new();
    for handle in handles {
        remaining.push(handle.await.unwrap().unwrap().reviewers_remaining);
    }
    remaining.sort_unstable();
    assert_eq!(remaining, vec![0, 1]);

    let o = &h.orchestrator;
    assert_eq!(o.get_status(id).await.unwrap(), Status::Reviewed);
    let reviewed_events = h
        .notifier
        .events()
        .into_iter()
        .filter(|event| event.new_status == Status::Reviewed)
        .count();
    assert_eq!(reviewed_events, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_get_distinct_ids() {
    let h = harness();

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let o = h.orchestrator.clone();
            tokio::spawn(async move {
                o.submit(&member(&format!("researcher{n}")), Submission::new(regular_request()))
                    .await
            })
        })
        .collect();

    let mut ids = BTreeSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap().unwrap().request_id.value());
    }
    assert_eq!(ids, (1..=8).collect::<BTreeSet<u64>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn decisions_racing_on_one_request_commit_once() {
    let h = harness();
    let id = h
        .orchestrator
        .submit(&researcher(), Submission::new(regular_request()))
        .await
        .unwrap()
        .request_id;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let o = h.orchestrator.clone();
            tokio::spawn(async move {
                o.preliminary_review(
                    &pm(),
                    id,
                    json!({ "preliminary_review": "Accepted for data manager review" }),
                )
                .await
            })
        })
        .collect();

    let mut committed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => committed += 1,
            Err(err) => assert_eq!(err.code(), "illegal_status"),
        }
    }
    assert_eq!(committed, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_resubmissions_retire_the_previous_request_once() {
    let h = slow_harness(Duration::from_millis(5));
    let o = &h.orchestrator;
    let first = o
        .submit(&researcher(), Submission::new(regular_request()))
        .await
        .unwrap()
        .request_id;
    o.preliminary_review(
        &pm(),
        first,
        json!({ "preliminary_review": "Rejected (resubmit)", "feedback_for_researcher": "Narrow the cohort" }),
    )
    .await
    .unwrap();

    let mut payload = regular_request();
    payload["previous_request_id"] = json!(first.value());

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let o = h.orchestrator.clone();
            let payload = payload.clone();
            tokio::spawn(async move { o.submit(&researcher(), Submission::new(payload)).await })
        })
        .collect();

    let mut created = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(outcome) => created.push(outcome.request_id),
            Err(err) => assert_eq!(err.code(), "illegal_status"),
        }
    }
    assert_eq!(created.len(), 1);

    assert_eq!(o.get_status(first).await.unwrap(), Status::Resubmitted);
    assert_eq!(o.resubmission_id(first).await.unwrap(), created[0]);
    let stray = RequestId(created[0].value() + 1);
    assert_eq!(o.get_status(stray).await.unwrap_err().code(), "not_found");
}
