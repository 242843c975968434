//! Permission gate: status precondition first, then role intersection.
//!
//! Lookup failures other than an unknown request are reported as internal
//! errors so that an unavailable directory or store never grants access.

use datarequest_types::{Principal, RequestId, Role, RoleSet, Status};
use tracing::{debug, warn};

use crate::error::{PermissionError, WorkflowError, WorkflowResult};
use crate::records::RequestRecords;
use crate::roles::RoleResolver;

/// What the gate observed when it let a caller through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub status: Status,
    pub roles: RoleSet,
}

#[derive(Clone)]
pub struct PermissionGate {
    roles: RoleResolver,
    records: RequestRecords,
}

fn fail_closed(request_id: RequestId, what: &str, err: WorkflowError) -> WorkflowError {
    match err {
        WorkflowError::NotFound(_) => err,
        other => WorkflowError::Internal(format!(
            "permission check on request {request_id} could not read {what}: {other}"
        )),
    }
}

impl PermissionGate {
    pub fn new(roles: RoleResolver, records: RequestRecords) -> Self {
        Self { roles, records }
    }

    /// Authorize `principal` for an action on `request_id`.
    ///
    /// `allowed_statuses = None` skips the status check.
    pub async fn authorize(
        &self,
        principal: &Principal,
        request_id: RequestId,
        allowed_roles: &[Role],
        allowed_statuses: Option<&[Status]>,
    ) -> WorkflowResult<Authorization> {
        let status = self
            .records
            .status(request_id)
            .await
            .map_err(|err| fail_closed(request_id, "status", err))?;

        if let Some(allowed) = allowed_statuses {
            if !allowed.contains(&status) {
                warn!(
                    request_id = %request_id,
                    principal = %principal,
                    status = %status,
                    "action denied: illegal status"
                );
                return Err(PermissionError::IllegalStatus {
                    request_id: request_id.to_string(),
                    status,
                }
                .into());
            }
        }

        let roles = self
            .roles
            .roles_for(principal, Some(request_id))
            .await
            .map_err(|err| fail_closed(request_id, "roles", err))?;

        if !roles.intersects(allowed_roles) {
            warn!(
                request_id = %request_id,
                principal = %principal,
                "action denied: insufficient role"
            );
            return Err(PermissionError::InsufficientRole {
                request_id: request_id.to_string(),
                principal: principal.clone(),
            }
            .into());
        }

        debug!(request_id = %request_id, principal = %principal, status = %status, "action permitted");
        Ok(Authorization { status, roles })
    }

    /// Advisory variant for read paths whose output is already filtered by
    /// role: a denial is logged and yields an empty role set.
    pub async fn advisory(
        &self,
        principal: &Principal,
        request_id: RequestId,
        allowed_roles: &[Role],
    ) -> WorkflowResult<Authorization> {
        match self.authorize(principal, request_id, allowed_roles, None).await {
            Ok(authorization) => Ok(authorization),
            Err(WorkflowError::Permission(denial)) => {
                warn!(request_id = %request_id, principal = %principal, reason = %denial, "advisory check failed");
                Ok(Authorization {
                    status: self
                        .records
                        .status(request_id)
                        .await
                        .map_err(|err| fail_closed(request_id, "status", err))?,
                    roles: RoleSet::new(),
                })
            }
            Err(err) => Err(err),
        }
    }
}
