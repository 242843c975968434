//! Contracts for the services the workflow depends on but does not own:
//! schema validation, notification delivery and the group directory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use datarequest_types::{Principal, RequestId, Status};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// One reason a payload failed schema validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// JSON pointer of the offending value, empty for the document root.
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Schema a payload is validated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRequest {
    /// Form name, e.g. `datarequest` or `assignment`.
    pub name: String,
    pub version: String,
    /// Committee roster substituted into the assignment schema.
    pub assignable_reviewers: Option<Vec<Principal>>,
}

impl SchemaRequest {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            assignable_reviewers: None,
        }
    }

    pub fn with_reviewers(mut self, reviewers: Vec<Principal>) -> Self {
        self.assignable_reviewers = Some(reviewers);
        self
    }
}

/// Validates form payloads. Any returned issue rejects the payload.
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, payload: &Value, schema: &SchemaRequest) -> Vec<ValidationIssue>;
}

/// Status change announced to interested principals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub event_id: Uuid,
    pub stage: String,
    pub request_id: RequestId,
    pub new_status: Status,
    pub recipients: Vec<Principal>,
    pub occurred_at: DateTime<Utc>,
}

/// Delivers workflow events. Fire-and-forget: delivery failures are the
/// notifier's to log and retry, never the workflow's.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: WorkflowEvent);
}

/// Directory lookup failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),

    #[error("unknown group: {0}")]
    UnknownGroup(String),
}

/// Identity and group membership.
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    async fn members_of(&self, group: &str) -> Result<Vec<Principal>, DirectoryError>;

    async fn is_member(&self, principal: &Principal, group: &str) -> Result<bool, DirectoryError> {
        Ok(self.members_of(group).await?.contains(principal))
    }
}
