#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use datarequest_engine::{
    MockValidator, RecordingNotifier, StaticDirectory, WorkflowConfig, WorkflowOrchestrator,
};
use datarequest_store::{
    AccessLevel, AclEntry, AclStore, InMemoryStorage, MetadataQuery, MetadataRow, MetadataStore,
    ObjectStore, Storage, StorageResult,
};
use datarequest_types::{Principal, RequestId};
use serde_json::{json, Value};

pub const DAO_PURPOSE: &str = "Analyses for data assessment only (results will not be published)";

pub struct Harness {
    pub orchestrator: WorkflowOrchestrator,
    pub storage: Arc<InMemoryStorage>,
    pub directory: Arc<StaticDirectory>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn researcher() -> Principal {
    Principal::new("alice")
}

pub fn pm() -> Principal {
    Principal::new("pat")
}

pub fn dm() -> Principal {
    Principal::new("dana")
}

pub fn member(name: &str) -> Principal {
    Principal::new(name)
}

pub fn harness() -> Harness {
    harness_with(MockValidator::accept_all())
}

pub fn harness_with(validator: MockValidator) -> Harness {
    let storage = Arc::new(InMemoryStorage::new());
    build(storage.clone(), storage, validator)
}

/// Harness whose orchestrator sees every write take `delay`, which widens
/// the windows between an operation's checks and its writes.
pub fn slow_harness(delay: Duration) -> Harness {
    let storage = Arc::new(InMemoryStorage::new());
    let slow = Arc::new(SlowStorage {
        inner: storage.clone(),
        delay,
    });
    build(slow, storage, MockValidator::accept_all())
}

fn build(backend: Arc<dyn Storage>, storage: Arc<InMemoryStorage>, validator: MockValidator) -> Harness {
    let config = WorkflowConfig::default();
    let groups = config.groups.clone();
    let directory = Arc::new(
        StaticDirectory::new()
            .with_group(groups.project_managers, &["pat"])
            .with_group(groups.data_managers, &["dana"])
            .with_group(
                groups.data_access_committee,
                &["m1", "m2", "m3", "alice", "rods"],
            ),
    );
    let notifier = Arc::new(RecordingNotifier::new());
    let orchestrator = WorkflowOrchestrator::new(
        config,
        backend,
        directory.clone(),
        Arc::new(validator),
        notifier.clone(),
    );

    Harness {
        orchestrator,
        storage,
        directory,
        notifier,
    }
}

pub fn regular_request() -> Value {
    json!({
        "datarequest": {
            "purpose": "Analyses in order to publish",
            "attachments": { "attachments": "No" },
            "study_information": { "title": "Sleep and screen time" }
        }
    })
}

pub fn dao_request() -> Value {
    json!({
        "datarequest": {
            "purpose": DAO_PURPOSE,
            "attachments": { "attachments": "No" },
            "study_information": { "title": "Cohort sizes" }
        }
    })
}

pub fn with_attachments() -> Value {
    json!({
        "datarequest": {
            "purpose": "Analyses in order to publish",
            "attachments": { "attachments": "Yes" },
            "study_information": { "title": "Growth curves" }
        }
    })
}

/// Drive a fresh regular request to `UNDER_REVIEW` with the given reviewers.
pub async fn under_review(h: &Harness, reviewers: &[&str], days: u64) -> RequestId {
    let o = &h.orchestrator;
    let submitted = o
        .submit(&researcher(), datarequest_engine::Submission::new(regular_request()))
        .await
        .unwrap();
    let id = submitted.request_id;
    o.preliminary_review(
        &pm(),
        id,
        json!({ "preliminary_review": "Accepted for data manager review" }),
    )
    .await
    .unwrap();
    o.datamanager_review(&dm(), id, json!({ "datamanager_review": "Accepted" }))
        .await
        .unwrap();
    o.assign(
        &pm(),
        id,
        json!({
            "decision": "Accepted for review",
            "assign_to": reviewers,
            "review_period_length": days
        }),
    )
    .await
    .unwrap();
    id
}

/// Delays every write before handing it to the in-memory store.
pub struct SlowStorage {
    inner: Arc<InMemoryStorage>,
    delay: Duration,
}

#[async_trait]
impl ObjectStore for SlowStorage {
    async fn create_collection(&self, path: &str) -> StorageResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.create_collection(path).await
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        self.inner.exists(path).await
    }

    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.inner.read(path).await
    }

    async fn write(&self, path: &str, bytes: Vec<u8>) -> StorageResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.write(path, bytes).await
    }

    async fn list_children(&self, path: &str) -> StorageResult<Vec<String>> {
        self.inner.list_children(path).await
    }
}

#[async_trait]
impl AclStore for SlowStorage {
    async fn set_acl(&self, path: &str, principal: &str, level: AccessLevel) -> StorageResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.set_acl(path, principal, level).await
    }

    async fn acl(&self, path: &str) -> StorageResult<Vec<AclEntry>> {
        self.inner.acl(path).await
    }
}

#[async_trait]
impl MetadataStore for SlowStorage {
    async fn set_metadata(&self, path: &str, key: &str, values: Vec<String>) -> StorageResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.set_metadata(path, key, values).await
    }

    async fn add_metadata(&self, path: &str, key: &str, value: &str) -> StorageResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.add_metadata(path, key, value).await
    }

    async fn metadata(&self, path: &str, key: &str) -> StorageResult<Vec<String>> {
        self.inner.metadata(path, key).await
    }

    async fn query(&self, query: &MetadataQuery) -> StorageResult<Vec<MetadataRow>> {
        self.inner.query(query).await
    }
}
