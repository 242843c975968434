//! Per-stage workflow operations.
//!
//! Every mutating operation runs the same steps: validate the payload,
//! take the request lock, pass the permission gate, parse the decision and
//! check the status graph, and only then write the stage document, commit
//! the new status with its provenance entry and notify. Anything that can
//! be refused is refused before the first write.

mod queries;
mod stages;
mod submit;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use datarequest_store::Storage;
use datarequest_types::{Principal, RequestId, Role, Status};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::collaborators::{GroupDirectory, Notifier, SchemaRequest, SchemaValidator};
use crate::config::WorkflowConfig;
use crate::error::{WorkflowError, WorkflowResult};
use crate::gate::{Authorization, PermissionGate};
use crate::graph;
use crate::locks::{RequestGuard, RequestLocks};
use crate::notify::Notifications;
use crate::provenance::ProvenanceLog;
use crate::records::RequestRecords;
use crate::review::ReviewAssignment;
use crate::roles::RoleResolver;
use crate::sweeper::ExpirationSweeper;

pub use queries::DatarequestView;
pub use submit::{SubmitOutcome, Submission};

/// Result of an operation that moved a request to a new status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub request_id: RequestId,
    pub from: Status,
    pub to: Status,
}

/// Result of one committee member submitting a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub request_id: RequestId,
    pub reviewers_remaining: usize,
    pub status: Status,
}

/// Shared components behind the orchestrator and the sweeper.
pub(crate) struct WorkflowCore {
    pub(crate) config: WorkflowConfig,
    pub(crate) records: RequestRecords,
    pub(crate) roles: RoleResolver,
    pub(crate) gate: PermissionGate,
    pub(crate) provenance: ProvenanceLog,
    pub(crate) reviews: ReviewAssignment,
    pub(crate) notifications: Notifications,
    pub(crate) validator: Arc<dyn SchemaValidator>,
    pub(crate) locks: RequestLocks,
    /// Serializes id assignment and collection creation.
    pub(crate) creation: tokio::sync::Mutex<()>,
}

impl WorkflowCore {
    /// Commit `from -> to` and record its provenance. The caller holds the
    /// request lock and has already observed `from`.
    pub(crate) async fn commit(
        &self,
        guard: &RequestGuard,
        from: Status,
        to: Status,
        now: DateTime<Utc>,
    ) -> WorkflowResult<()> {
        let id = guard.id();
        graph::ensure_transition(from, to)?;
        self.records.set_status(id, to).await?;
        info!(request_id = %id, from = %from, to = %to, "status changed");
        self.provenance
            .record_timestamp(&id.to_string(), to, now)
            .await
    }

    /// Commit, then notify. Notification happens only after a clean commit.
    pub(crate) async fn transition(
        &self,
        guard: &RequestGuard,
        stage: &str,
        from: Status,
        to: Status,
        now: DateTime<Utc>,
    ) -> WorkflowResult<TransitionOutcome> {
        self.commit(guard, from, to, now).await?;
        self.notifications
            .status_changed(stage, guard.id(), to, now)
            .await;
        Ok(TransitionOutcome {
            request_id: guard.id(),
            from,
            to,
        })
    }

    /// Lock the request, then authorize under the lock so the observed
    /// status cannot change before the operation commits.
    pub(crate) async fn enter(
        &self,
        principal: &Principal,
        id: RequestId,
        roles: &[Role],
        statuses: Option<&[Status]>,
    ) -> WorkflowResult<(RequestGuard, Authorization)> {
        let guard = self.locks.lock(id).await;
        let authorization = self.gate.authorize(principal, id, roles, statuses).await?;
        Ok((guard, authorization))
    }

    pub(crate) fn validate(&self, payload: &Value, schema: SchemaRequest) -> WorkflowResult<()> {
        let issues = self.validator.validate(payload, &schema);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(WorkflowError::Validation {
                schema: schema.name,
                issues,
            })
        }
    }

    pub(crate) fn schema(&self, name: &str) -> SchemaRequest {
        SchemaRequest::new(name, self.config.schema.version.clone())
    }

    pub(crate) fn group(&self, role: Role) -> WorkflowResult<String> {
        self.roles
            .group_of(role)
            .map(str::to_string)
            .ok_or_else(|| WorkflowError::Internal(format!("{role} is not a group role")))
    }

    /// Owner of a request that must have one.
    pub(crate) async fn owner(&self, id: RequestId) -> WorkflowResult<Principal> {
        self.records
            .owner(id)
            .await?
            .ok_or_else(|| WorkflowError::Internal(format!("request {id} has no owner")))
    }

    /// Committee members eligible to review `id`: the committee without the
    /// request owner and the administrative principal.
    pub(crate) async fn dac_members(&self, id: RequestId) -> WorkflowResult<Vec<Principal>> {
        let owner = self.records.owner(id).await?;
        let admin = Principal::new(self.config.admin_principal.clone());
        Ok(self
            .roles
            .members(Role::Dac)
            .await?
            .into_iter()
            .filter(|member| Some(member) != owner.as_ref() && *member != admin)
            .collect())
    }
}

/// Entry point for every workflow operation.
#[derive(Clone)]
pub struct WorkflowOrchestrator {
    core: Arc<WorkflowCore>,
}

impl WorkflowOrchestrator {
    pub fn new(
        config: WorkflowConfig,
        storage: Arc<dyn Storage>,
        directory: Arc<dyn GroupDirectory>,
        validator: Arc<dyn SchemaValidator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let records = RequestRecords::new(storage, config.request_root.clone());
        let roles = RoleResolver::new(directory, records.clone(), config.groups.clone());
        let gate = PermissionGate::new(roles.clone(), records.clone());
        let provenance = ProvenanceLog::new(records.clone());
        let reviews = ReviewAssignment::new(records.clone());
        let notifications = Notifications::new(
            notifier,
            roles.clone(),
            records.clone(),
            reviews.clone(),
            Principal::new(config.admin_principal.clone()),
        );

        Self {
            core: Arc::new(WorkflowCore {
                config,
                records,
                roles,
                gate,
                provenance,
                reviews,
                notifications,
                validator,
                locks: RequestLocks::new(),
                creation: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.core.config
    }

    /// Sweeper sharing this orchestrator's locks and storage.
    pub fn sweeper(&self) -> ExpirationSweeper {
        ExpirationSweeper::new(self.core.clone())
    }

    /// Start the periodic sweep described by the `sweeper` settings. Returns
    /// `None` when sweeping is disabled.
    pub fn spawn_sweeper(&self, shutdown: watch::Receiver<bool>) -> Option<JoinHandle<()>> {
        let settings = &self.core.config.sweeper;
        if !settings.enabled {
            return None;
        }
        let period = Duration::from_secs(settings.interval_secs.max(1));
        let sweeper = self.sweeper();
        Some(tokio::spawn(async move { sweeper.run(period, shutdown).await }))
    }

    /// Force every overdue review to completion now.
    pub async fn run_expiration_sweep(&self) -> WorkflowResult<crate::sweeper::SweepReport> {
        self.sweeper().sweep_at(Utc::now()).await
    }
}

/// String field of a payload, or a validation error naming it.
pub(crate) fn required_str<'a>(payload: &'a Value, schema: &str, field: &str) -> WorkflowResult<&'a str> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| {
            WorkflowError::validation(schema, &format!("/{field}"), format!("{field} is required"))
        })
}
