//! Who hears about which status change.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use datarequest_types::{Principal, RequestId, Role, Status};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::collaborators::{Notifier, WorkflowEvent};
use crate::error::WorkflowResult;
use crate::records::RequestRecords;
use crate::review::ReviewAssignment;
use crate::roles::RoleResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Owner,
    ProjectManagers,
    DataManagers,
    PendingReviewers,
}

/// Audiences notified when a request enters `status`.
pub fn audience(status: Status) -> &'static [Audience] {
    use Audience::*;
    match status {
        Status::Submitted | Status::DaoSubmitted => &[Owner, ProjectManagers],
        Status::PreliminaryAccept => &[DataManagers],
        Status::DatamanagerAccept | Status::DatamanagerReject | Status::DatamanagerResubmit => {
            &[ProjectManagers]
        }
        Status::UnderReview => &[Owner, PendingReviewers],
        Status::Reviewed => &[Owner, ProjectManagers],
        Status::PreregistrationSubmitted => &[ProjectManagers],
        Status::PreregistrationConfirmed | Status::DaoApproved => &[Owner, DataManagers],
        Status::DtaReady => &[Owner, ProjectManagers],
        Status::DtaSigned => &[DataManagers, ProjectManagers],
        Status::PreliminaryReject
        | Status::PreliminaryResubmit
        | Status::RejectedAfterDatamanagerReview
        | Status::ResubmitAfterDatamanagerReview
        | Status::Approved
        | Status::Rejected
        | Status::Resubmit
        | Status::DataReady => &[Owner],
        Status::InSubmission
        | Status::Draft
        | Status::PendingAttachments
        | Status::Resubmitted => &[],
    }
}

/// Resolves recipients and hands events to the notifier.
#[derive(Clone)]
pub struct Notifications {
    notifier: Arc<dyn Notifier>,
    roles: RoleResolver,
    records: RequestRecords,
    reviews: ReviewAssignment,
    admin: Principal,
}

impl Notifications {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        roles: RoleResolver,
        records: RequestRecords,
        reviews: ReviewAssignment,
        admin: Principal,
    ) -> Self {
        Self {
            notifier,
            roles,
            records,
            reviews,
            admin,
        }
    }

    async fn recipients(&self, id: RequestId, status: Status) -> WorkflowResult<Vec<Principal>> {
        let mut recipients: Vec<Principal> = Vec::new();
        for audience in audience(status) {
            let members: Vec<Principal> = match audience {
                Audience::Owner => self.records.owner(id).await?.into_iter().collect(),
                Audience::ProjectManagers => self.roles.members(Role::Pm).await?,
                Audience::DataManagers => self.roles.members(Role::Dm).await?,
                Audience::PendingReviewers => self.reviews.pending(id).await?,
            };
            for member in members {
                if member != self.admin && !recipients.contains(&member) {
                    recipients.push(member);
                }
            }
        }
        Ok(recipients)
    }

    /// Announce that `id` entered `status`. Never fails: recipient lookup
    /// problems are logged and the event is dropped.
    pub async fn status_changed(&self, stage: &str, id: RequestId, status: Status, now: DateTime<Utc>) {
        let recipients = match self.recipients(id, status).await {
            Ok(recipients) => recipients,
            Err(err) => {
                warn!(request_id = %id, status = %status, error = %err, "could not resolve notification recipients");
                return;
            }
        };
        if recipients.is_empty() {
            debug!(request_id = %id, status = %status, "no one to notify");
            return;
        }

        self.notifier
            .notify(WorkflowEvent {
                event_id: Uuid::new_v4(),
                stage: stage.to_string(),
                request_id: id,
                new_status: status,
                recipients,
                occurred_at: now,
            })
            .await;
    }
}
