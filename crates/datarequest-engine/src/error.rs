use datarequest_store::StorageError;
use datarequest_types::{Principal, Status, TypeError};
use thiserror::Error;

use crate::collaborators::{DirectoryError, ValidationIssue};

/// Result alias for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Denials raised by the permission gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    #[error("request {request_id} is in status {status}, which does not allow this action")]
    IllegalStatus { request_id: String, status: Status },

    #[error("{principal} holds none of the roles required on request {request_id}")]
    InsufficientRole { request_id: String, principal: Principal },
}

/// Failures of the provenance ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvenanceError {
    #[error("request {request_id} already has a timestamp for {status}")]
    DuplicateTimestamp { request_id: String, status: Status },

    #[error("request id is not numeric: {0:?}")]
    InvalidRequestId(String),
}

/// Failures of reviewer assignment and completion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignmentError {
    #[error("{principal} is not a pending reviewer of request {request_id}")]
    NotAPendingReviewer { request_id: String, principal: Principal },

    #[error("request {0} cannot be assigned to an empty set of reviewers")]
    NoAssignees(String),
}

/// Every failure a workflow operation can return.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error(transparent)]
    Provenance(#[from] ProvenanceError),

    #[error(transparent)]
    Assignment(#[from] AssignmentError),

    #[error("invalid decision {value:?} for {stage}")]
    InvalidDecision { stage: String, value: String },

    #[error("{schema} form data did not pass validation ({} issue(s))", issues.len())]
    Validation {
        schema: String,
        issues: Vec<ValidationIssue>,
    },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("request {0} not found")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl WorkflowError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::InvalidStatus(_) => "invalid_status",
            WorkflowError::Permission(PermissionError::IllegalStatus { .. }) => "illegal_status",
            WorkflowError::Permission(PermissionError::InsufficientRole { .. }) => {
                "insufficient_role"
            }
            WorkflowError::Provenance(ProvenanceError::DuplicateTimestamp { .. }) => {
                "duplicate_timestamp"
            }
            WorkflowError::Provenance(ProvenanceError::InvalidRequestId(_)) => "invalid_request_id",
            WorkflowError::Assignment(AssignmentError::NotAPendingReviewer { .. }) => {
                "not_a_pending_reviewer"
            }
            WorkflowError::Assignment(AssignmentError::NoAssignees(_)) => "no_assignees",
            WorkflowError::InvalidDecision { .. } => "invalid_decision",
            WorkflowError::Validation { .. } => "validation_fail",
            WorkflowError::Storage(_) => "storage_error",
            WorkflowError::NotFound(_) => "not_found",
            WorkflowError::Internal(_) => "internal_error",
        }
    }

    /// True for gate denials.
    pub fn is_permission(&self) -> bool {
        matches!(self, WorkflowError::Permission(_))
    }

    pub(crate) fn validation(schema: &str, path: &str, message: impl Into<String>) -> Self {
        WorkflowError::Validation {
            schema: schema.to_string(),
            issues: vec![ValidationIssue::new(path, message)],
        }
    }
}

impl From<TypeError> for WorkflowError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidStatus(status) => WorkflowError::InvalidStatus(status),
            TypeError::InvalidRequestId(id) => ProvenanceError::InvalidRequestId(id).into(),
            TypeError::InvalidDecision { stage, value } => WorkflowError::InvalidDecision {
                stage: stage.to_string(),
                value,
            },
            TypeError::InvalidRole(role) => WorkflowError::Internal(format!("unknown role {role}")),
        }
    }
}

impl From<DirectoryError> for WorkflowError {
    fn from(err: DirectoryError) -> Self {
        WorkflowError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for WorkflowError {
    fn from(err: serde_json::Error) -> Self {
        WorkflowError::Storage(StorageError::Serialization(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let err: WorkflowError = PermissionError::InsufficientRole {
            request_id: "3".into(),
            principal: Principal::new("eve"),
        }
        .into();
        assert_eq!(err.code(), "insufficient_role");
        assert!(err.is_permission());

        let err: WorkflowError = TypeError::InvalidRequestId("x1".into()).into();
        assert_eq!(err.code(), "invalid_request_id");

        let err: WorkflowError = StorageError::Backend("down".into()).into();
        assert_eq!(err.code(), "storage_error");
        assert_eq!(err.to_string(), "storage error: backend error: down");
    }
}
