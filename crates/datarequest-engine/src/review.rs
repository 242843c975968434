//! Committee review fan-out and fan-in.
//!
//! Pending reviewers live in the `assignedForReview` attribute and completed
//! ones in `reviewedBy`. Both mutating calls take a [`RequestGuard`], so
//! reviewer transfer is serialized per request and completion is
//! linearizable: of two concurrent last reviewers exactly one sees zero
//! remaining.

use chrono::{DateTime, Duration, Utc};
use datarequest_store::path;
use datarequest_types::{Principal, RequestId, Status};
use tracing::info;

use crate::error::{AssignmentError, PermissionError, WorkflowError, WorkflowResult};
use crate::locks::RequestGuard;
use crate::records::{files, keys, RequestRecords};

/// End of a review period of `days` starting at `now`. A period that runs
/// past the representable calendar is a validation failure.
pub fn review_deadline(now: DateTime<Utc>, days: u32) -> WorkflowResult<DateTime<Utc>> {
    now.checked_add_signed(Duration::days(i64::from(days)))
        .ok_or_else(|| {
            WorkflowError::validation(
                "assignment",
                "/review_period_length",
                format!("a review period of {days} days is out of range"),
            )
        })
}

/// Outcome of one reviewer completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewProgress {
    pub reviewers_remaining: usize,
}

impl ReviewProgress {
    pub fn is_complete(&self) -> bool {
        self.reviewers_remaining == 0
    }
}

#[derive(Clone)]
pub struct ReviewAssignment {
    records: RequestRecords,
}

impl ReviewAssignment {
    pub fn new(records: RequestRecords) -> Self {
        Self { records }
    }

    /// Hand the request to `assignees` for `review_period_days`.
    ///
    /// Resets both reviewer sets, records the deadline and gives each
    /// assignee read access to the documents they review. Returns the
    /// deadline.
    pub async fn assign(
        &self,
        guard: &RequestGuard,
        assignees: &[Principal],
        review_period_days: u32,
        now: DateTime<Utc>,
    ) -> WorkflowResult<DateTime<Utc>> {
        let id = guard.id();
        let deadline = review_deadline(now, review_period_days)?;
        let status = self.records.status(id).await?;
        if !Status::DATAMANAGER_REVIEWED.contains(&status) {
            return Err(PermissionError::IllegalStatus {
                request_id: id.to_string(),
                status,
            }
            .into());
        }

        let mut unique: Vec<Principal> = Vec::with_capacity(assignees.len());
        for assignee in assignees {
            if !unique.contains(assignee) {
                unique.push(assignee.clone());
            }
        }
        if unique.is_empty() {
            return Err(AssignmentError::NoAssignees(id.to_string()).into());
        }

        let documents = self.reviewable_documents(id).await?;
        for assignee in &unique {
            for document in &documents {
                self.records.grant_read(document, assignee.as_str()).await?;
            }
        }

        self.records
            .set_principals(id, keys::ASSIGNED_FOR_REVIEW, &unique)
            .await?;
        self.records.set_principals(id, keys::REVIEWED_BY, &[]).await?;
        self.records
            .set_review_deadline(id, deadline.timestamp())
            .await?;

        info!(
            request_id = %id,
            reviewers = unique.len(),
            deadline = %deadline,
            "request assigned for review"
        );
        Ok(deadline)
    }

    /// Move `principal` from pending to completed and report how many
    /// reviewers are still pending.
    pub async fn complete(
        &self,
        guard: &RequestGuard,
        principal: &Principal,
    ) -> WorkflowResult<ReviewProgress> {
        let id = guard.id();
        let mut pending = self.pending(id).await?;
        let Some(position) = pending.iter().position(|p| p == principal) else {
            return Err(AssignmentError::NotAPendingReviewer {
                request_id: id.to_string(),
                principal: principal.clone(),
            }
            .into());
        };
        pending.remove(position);

        // Completed first: a lock-free reader never sees the reviewer in
        // neither set.
        self.records.add_principal(id, keys::REVIEWED_BY, principal).await?;
        self.records
            .set_principals(id, keys::ASSIGNED_FOR_REVIEW, &pending)
            .await?;

        info!(
            request_id = %id,
            reviewer = %principal,
            remaining = pending.len(),
            "review completed"
        );
        Ok(ReviewProgress {
            reviewers_remaining: pending.len(),
        })
    }

    pub async fn pending(&self, id: RequestId) -> WorkflowResult<Vec<Principal>> {
        self.records.principals(id, keys::ASSIGNED_FOR_REVIEW).await
    }

    pub async fn completed(&self, id: RequestId) -> WorkflowResult<Vec<Principal>> {
        self.records.principals(id, keys::REVIEWED_BY).await
    }

    /// The request form, both earlier reviews and every attachment.
    async fn reviewable_documents(&self, id: RequestId) -> WorkflowResult<Vec<String>> {
        let storage = self.records.storage();
        let mut documents = Vec::new();
        for name in [
            files::DATAREQUEST,
            files::PRELIMINARY_REVIEW,
            files::DATAMANAGER_REVIEW,
        ] {
            let file = self.records.file(id, name);
            if storage.exists(&file).await.map_err(WorkflowError::from)? {
                documents.push(file);
            }
        }
        let attachments = self.records.file(id, files::ATTACHMENTS);
        for name in self.records.uploads(id, files::ATTACHMENTS).await? {
            documents.push(path::join(&attachments, &name));
        }
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locks::RequestLocks;
    use datarequest_store::{AccessLevel, InMemoryStorage};
    use std::sync::Arc;

    async fn setup(status: Status) -> (ReviewAssignment, RequestRecords, RequestLocks) {
        let records = RequestRecords::new(Arc::new(InMemoryStorage::new()), "/z/requests");
        records.create(RequestId(1), &Principal::new("alice")).await.unwrap();
        records
            .write_json(RequestId(1), files::DATAREQUEST, &serde_json::json!({}), &[])
            .await
            .unwrap();
        records
            .write_upload(RequestId(1), files::ATTACHMENTS, "protocol.pdf", vec![0])
            .await
            .unwrap();
        records.set_status(RequestId(1), status).await.unwrap();
        (ReviewAssignment::new(records.clone()), records, RequestLocks::new())
    }

    fn members(names: &[&str]) -> Vec<Principal> {
        names.iter().map(|n| Principal::new(*n)).collect()
    }

    #[tokio::test]
    async fn assign_sets_pending_deadline_and_grants() {
        let (reviews, records, locks) = setup(Status::DatamanagerAccept).await;
        let guard = locks.lock(RequestId(1)).await;
        let now = Utc::now();

        let deadline = reviews
            .assign(&guard, &members(&["m1", "m2", "m1"]), 14, now)
            .await
            .unwrap();

        assert_eq!(deadline, now + Duration::days(14));
        assert_eq!(reviews.pending(RequestId(1)).await.unwrap(), members(&["m1", "m2"]));
        assert!(reviews.completed(RequestId(1)).await.unwrap().is_empty());
        assert_eq!(
            records.review_deadline(RequestId(1)).await.unwrap(),
            Some(deadline.timestamp())
        );

        let attachment = records.file(RequestId(1), "attachments/protocol.pdf");
        let acl = records.storage().acl(&attachment).await.unwrap();
        assert!(acl
            .iter()
            .any(|e| e.principal == "m2" && e.level == AccessLevel::Read));
    }

    #[tokio::test]
    async fn assign_requires_datamanager_review() {
        let (reviews, _, locks) = setup(Status::Submitted).await;
        let guard = locks.lock(RequestId(1)).await;
        let err = reviews
            .assign(&guard, &members(&["m1"]), 14, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "illegal_status");
    }

    #[tokio::test]
    async fn assign_rejects_empty_set() {
        let (reviews, _, locks) = setup(Status::DatamanagerResubmit).await;
        let guard = locks.lock(RequestId(1)).await;
        let err = reviews.assign(&guard, &[], 14, Utc::now()).await.unwrap_err();
        assert_eq!(err.code(), "no_assignees");
    }

    #[tokio::test]
    async fn out_of_range_period_writes_nothing() {
        let (reviews, records, locks) = setup(Status::DatamanagerAccept).await;
        let guard = locks.lock(RequestId(1)).await;
        let err = reviews
            .assign(&guard, &members(&["m1"]), u32::MAX, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "validation_fail");
        assert!(reviews.pending(RequestId(1)).await.unwrap().is_empty());
        assert_eq!(records.review_deadline(RequestId(1)).await.unwrap(), None);
    }

    #[test]
    fn deadline_is_whole_days_after_now() {
        let now = Utc::now();
        assert_eq!(review_deadline(now, 3).unwrap(), now + Duration::days(3));
        assert!(review_deadline(now, 100_000_000).is_err());
    }

    #[tokio::test]
    async fn completion_counts_down_once_per_reviewer() {
        let (reviews, _, locks) = setup(Status::DatamanagerAccept).await;
        let guard = locks.lock(RequestId(1)).await;
        reviews
            .assign(&guard, &members(&["m1", "m2"]), 14, Utc::now())
            .await
            .unwrap();

        let first = reviews.complete(&guard, &Principal::new("m1")).await.unwrap();
        assert_eq!(first.reviewers_remaining, 1);

        let again = reviews.complete(&guard, &Principal::new("m1")).await.unwrap_err();
        assert_eq!(again.code(), "not_a_pending_reviewer");

        let last = reviews.complete(&guard, &Principal::new("m2")).await.unwrap();
        assert!(last.is_complete());
        assert_eq!(reviews.completed(RequestId(1)).await.unwrap(), members(&["m1", "m2"]));
    }
}
