//! In-memory collaborators for tests and local development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use datarequest_types::Principal;
use serde_json::Value;

use crate::collaborators::{
    DirectoryError, GroupDirectory, Notifier, SchemaRequest, SchemaValidator, ValidationIssue,
    WorkflowEvent,
};

/// Group directory backed by a fixed membership table.
#[derive(Default)]
pub struct StaticDirectory {
    groups: HashMap<String, Vec<Principal>>,
    unavailable: AtomicBool,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `members` to `group`.
    pub fn with_group(mut self, group: impl Into<String>, members: &[&str]) -> Self {
        self.groups
            .entry(group.into())
            .or_default()
            .extend(members.iter().map(|m| Principal::new(*m)));
        self
    }

    /// Make every lookup fail until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl GroupDirectory for StaticDirectory {
    async fn members_of(&self, group: &str) -> Result<Vec<Principal>, DirectoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable("static directory switched off".into()));
        }
        Ok(self.groups.get(group).cloned().unwrap_or_default())
    }
}

/// Validator that accepts everything except the listed schema names.
#[derive(Default)]
pub struct MockValidator {
    rejected_schemas: Vec<String>,
}

impl MockValidator {
    pub fn accept_all() -> Self {
        Self::default()
    }

    pub fn rejecting(schema: impl Into<String>) -> Self {
        Self {
            rejected_schemas: vec![schema.into()],
        }
    }
}

impl SchemaValidator for MockValidator {
    fn validate(&self, _payload: &Value, schema: &SchemaRequest) -> Vec<ValidationIssue> {
        if self.rejected_schemas.contains(&schema.name) {
            vec![ValidationIssue::new("", format!("{} rejected by mock", schema.name))]
        } else {
            Vec::new()
        }
    }
}

/// Notifier that keeps every event in memory.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<WorkflowEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events delivered so far.
    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events.lock().map(|guard| guard.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: WorkflowEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}
