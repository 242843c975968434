//! Reviewing stages from preliminary review to data delivery.

use std::str::FromStr;

use chrono::Utc;
use datarequest_types::{
    AssignmentDecision, DatamanagerDecision, EvaluationDecision, Principal, PreliminaryDecision,
    RequestId, Role, Status, TypeError,
};
use serde_json::{json, Value};
use super::{required_str, ReviewOutcome, TransitionOutcome, WorkflowCore, WorkflowOrchestrator};
use crate::error::{AssignmentError, WorkflowError, WorkflowResult};
use crate::graph;
use crate::locks::RequestGuard;
use crate::review::review_deadline;
use crate::records::files;

const FEEDBACK_FIELD: &str = "feedback_for_researcher";

fn decision<D>(payload: &Value, schema: &str, field: &str) -> WorkflowResult<D>
where
    D: FromStr<Err = TypeError>,
{
    Ok(required_str(payload, schema, field)?.parse()?)
}

/// Feedback text, required when the decision sends the request back.
fn feedback<'a>(payload: &'a Value, schema: &str, required: bool) -> WorkflowResult<Option<&'a str>> {
    if !required {
        return Ok(None);
    }
    required_str(payload, schema, FEEDBACK_FIELD).map(Some)
}

impl WorkflowCore {
    /// Readers of documents that stay within PM and the committee members
    /// working on the request.
    async fn pm_and_reviewers(&self, id: RequestId) -> WorkflowResult<Vec<String>> {
        let mut readers = vec![self.group(Role::Pm)?];
        for reviewer in self
            .reviews
            .pending(id)
            .await?
            .into_iter()
            .chain(self.reviews.completed(id).await?)
        {
            let name = reviewer.to_string();
            if !readers.contains(&name) {
                readers.push(name);
            }
        }
        Ok(readers)
    }

    async fn write_feedback(&self, id: RequestId, text: &str) -> WorkflowResult<()> {
        let owner = self.owner(id).await?;
        let readers = [self.group(Role::Pm)?, owner.to_string()];
        self.records
            .write_json(id, files::FEEDBACK, &json!(text), &readers)
            .await
    }

    async fn dm_and_pm(&self) -> WorkflowResult<[String; 2]> {
        Ok([self.group(Role::Dm)?, self.group(Role::Pm)?])
    }

    /// Store an uploaded agreement in `sub_collection`, readable by PM, DM
    /// and the owner.
    async fn store_agreement(
        &self,
        guard: &RequestGuard,
        sub_collection: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> WorkflowResult<()> {
        let id = guard.id();
        let stored = self
            .records
            .write_upload(id, sub_collection, filename, bytes)
            .await?;
        let owner = self.owner(id).await?;
        let [dm, pm] = self.dm_and_pm().await?;
        for reader in [pm.as_str(), dm.as_str(), owner.as_str()] {
            self.records.grant_read(&stored, reader).await?;
        }
        Ok(())
    }

    async fn simple_transition(
        &self,
        principal: &Principal,
        id: RequestId,
        stage: &str,
        roles: &[Role],
        from: Status,
        to: Status,
    ) -> WorkflowResult<TransitionOutcome> {
        let (guard, authorization) = self.enter(principal, id, roles, Some(&[from])).await?;
        graph::ensure_transition(authorization.status, to)?;
        self.transition(&guard, stage, authorization.status, to, Utc::now())
            .await
    }
}

impl WorkflowOrchestrator {
    /// Project manager's preliminary decision on a submitted request.
    pub async fn preliminary_review(
        &self,
        principal: &Principal,
        id: RequestId,
        payload: Value,
    ) -> WorkflowResult<TransitionOutcome> {
        const STAGE: &str = "preliminary_review";
        let core = &self.core;
        let now = Utc::now();
        core.validate(&payload, core.schema(STAGE))?;

        let (guard, authorization) = core
            .enter(principal, id, &[Role::Pm], Some(&[Status::Submitted]))
            .await?;
        let verdict: PreliminaryDecision = decision(&payload, STAGE, STAGE)?;
        let to = match verdict {
            PreliminaryDecision::Accept => Status::PreliminaryAccept,
            PreliminaryDecision::Reject => Status::PreliminaryReject,
            PreliminaryDecision::Resubmit => Status::PreliminaryResubmit,
        };
        graph::ensure_transition(authorization.status, to)?;
        let feedback = feedback(&payload, STAGE, verdict.requires_feedback())?;

        core.records
            .write_json(id, files::PRELIMINARY_REVIEW, &payload, &core.dm_and_pm().await?)
            .await?;
        if let Some(text) = feedback {
            core.write_feedback(id, text).await?;
        }
        core.transition(&guard, STAGE, authorization.status, to, now)
            .await
    }

    /// Data manager's verdict after a preliminary accept.
    pub async fn datamanager_review(
        &self,
        principal: &Principal,
        id: RequestId,
        mut payload: Value,
    ) -> WorkflowResult<TransitionOutcome> {
        const STAGE: &str = "datamanager_review";
        let core = &self.core;
        let now = Utc::now();
        core.validate(&payload, core.schema(STAGE))?;

        let (guard, authorization) = core
            .enter(principal, id, &[Role::Dm], Some(&[Status::PreliminaryAccept]))
            .await?;
        let verdict: DatamanagerDecision = decision(&payload, STAGE, STAGE)?;
        let to = match verdict {
            DatamanagerDecision::Accept => Status::DatamanagerAccept,
            DatamanagerDecision::Reject => Status::DatamanagerReject,
            DatamanagerDecision::Resubmit => Status::DatamanagerResubmit,
        };
        graph::ensure_transition(authorization.status, to)?;

        if let Some(object) = payload.as_object_mut() {
            object.insert("reviewing_dm".into(), json!(principal.as_str()));
        }
        core.records
            .write_json(id, files::DATAMANAGER_REVIEW, &payload, &core.dm_and_pm().await?)
            .await?;
        core.transition(&guard, STAGE, authorization.status, to, now)
            .await
    }

    /// Project manager's decision after the data manager review; acceptance
    /// hands the request to committee members for review.
    pub async fn assign(
        &self,
        principal: &Principal,
        id: RequestId,
        payload: Value,
    ) -> WorkflowResult<TransitionOutcome> {
        const STAGE: &str = "assignment";
        let core = &self.core;
        let now = Utc::now();
        let roster = core.dac_members(id).await?;
        core.validate(&payload, core.schema(STAGE).with_reviewers(roster.clone()))?;

        let (guard, authorization) = core
            .enter(principal, id, &[Role::Pm], Some(&Status::DATAMANAGER_REVIEWED))
            .await?;
        let verdict: AssignmentDecision = decision(&payload, STAGE, "decision")?;
        let to = match verdict {
            AssignmentDecision::AcceptForReview => Status::UnderReview,
            AssignmentDecision::Reject => Status::RejectedAfterDatamanagerReview,
            AssignmentDecision::Resubmit => Status::ResubmitAfterDatamanagerReview,
        };
        graph::ensure_transition(authorization.status, to)?;
        let feedback = feedback(&payload, STAGE, verdict.requires_feedback())?;

        let assignees = match verdict {
            AssignmentDecision::AcceptForReview => {
                let assignees = assignees(&payload, &roster)?;
                if assignees.is_empty() {
                    return Err(AssignmentError::NoAssignees(id.to_string()).into());
                }
                let days = review_period(&payload)?;
                review_deadline(now, days)?;
                Some((assignees, days))
            }
            _ => None,
        };

        let mut readers = core.dm_and_pm().await?.to_vec();
        if let Some((assignees, _)) = &assignees {
            readers.extend(assignees.iter().map(Principal::to_string));
        }
        core.records
            .write_json(id, files::ASSIGNMENT, &payload, &readers)
            .await?;
        if let Some((assignees, days)) = &assignees {
            core.reviews.assign(&guard, assignees, *days, now).await?;
        }
        if let Some(text) = feedback {
            core.write_feedback(id, text).await?;
        }
        core.transition(&guard, STAGE, authorization.status, to, now)
            .await
    }

    /// One committee member's review. The last pending review moves the
    /// request to `REVIEWED`.
    pub async fn submit_review(
        &self,
        principal: &Principal,
        id: RequestId,
        payload: Value,
    ) -> WorkflowResult<ReviewOutcome> {
        const STAGE: &str = "review";
        let core = &self.core;
        let now = Utc::now();
        core.validate(&payload, core.schema(STAGE))?;

        let (guard, authorization) = core
            .enter(principal, id, &[Role::Pm, Role::Rev], Some(&[Status::UnderReview]))
            .await?;
        if !core.reviews.pending(id).await?.contains(principal) {
            return Err(AssignmentError::NotAPendingReviewer {
                request_id: id.to_string(),
                principal: principal.clone(),
            }
            .into());
        }

        let readers = core.pm_and_reviewers(id).await?;
        core.records
            .write_json(id, &files::review(principal.as_str()), &payload, &readers)
            .await?;
        let progress = core.reviews.complete(&guard, principal).await?;

        let status = if progress.is_complete() {
            core.transition(&guard, STAGE, authorization.status, Status::Reviewed, now)
                .await?
                .to
        } else {
            authorization.status
        };
        Ok(ReviewOutcome {
            request_id: id,
            reviewers_remaining: progress.reviewers_remaining,
            status,
        })
    }

    /// Project manager's final evaluation of a reviewed or DAO request.
    pub async fn evaluate(
        &self,
        principal: &Principal,
        id: RequestId,
        payload: Value,
    ) -> WorkflowResult<TransitionOutcome> {
        const STAGE: &str = "evaluation";
        let core = &self.core;
        let now = Utc::now();
        core.validate(&payload, core.schema(STAGE))?;

        let (guard, authorization) = core
            .enter(
                principal,
                id,
                &[Role::Pm],
                Some(&[Status::Reviewed, Status::DaoSubmitted]),
            )
            .await?;
        let verdict: EvaluationDecision = decision(&payload, STAGE, STAGE)?;
        let to = match (verdict, authorization.status) {
            (EvaluationDecision::Approve, Status::DaoSubmitted) => Status::DaoApproved,
            (EvaluationDecision::Approve, _) => Status::Approved,
            (EvaluationDecision::Reject, _) => Status::Rejected,
            (EvaluationDecision::Resubmit, _) => Status::Resubmit,
        };
        graph::ensure_transition(authorization.status, to)?;
        let feedback = feedback(&payload, STAGE, verdict.requires_feedback())?;

        if let Some(conditions) = payload.get("approval_conditions") {
            let owner = core.owner(id).await?;
            core.records
                .write_json(id, files::APPROVAL_CONDITIONS, conditions, &[owner.to_string()])
                .await?;
        }
        let readers = core.pm_and_reviewers(id).await?;
        core.records
            .write_json(id, files::EVALUATION, &payload, &readers)
            .await?;
        if let Some(text) = feedback {
            core.write_feedback(id, text).await?;
        }
        core.transition(&guard, STAGE, authorization.status, to, now)
            .await
    }

    /// Researcher's preregistration of an approved study.
    pub async fn preregistration_submit(
        &self,
        principal: &Principal,
        id: RequestId,
        payload: Value,
    ) -> WorkflowResult<TransitionOutcome> {
        const STAGE: &str = "preregistration";
        let core = &self.core;
        let now = Utc::now();
        core.validate(&payload, core.schema(STAGE))?;

        let (guard, authorization) = core
            .enter(principal, id, &[Role::Own], Some(&[Status::Approved]))
            .await?;
        graph::ensure_transition(authorization.status, Status::PreregistrationSubmitted)?;

        let readers = [principal.to_string(), core.group(Role::Pm)?];
        core.records
            .write_json(id, files::PREREGISTRATION, &payload, &readers)
            .await?;
        core.transition(
            &guard,
            STAGE,
            authorization.status,
            Status::PreregistrationSubmitted,
            now,
        )
        .await
    }

    pub async fn preregistration_confirm(&self, principal: &Principal, id: RequestId) -> WorkflowResult<TransitionOutcome> {
        self.core
            .simple_transition(
                principal,
                id,
                "preregistration_confirm",
                &[Role::Pm],
                Status::PreregistrationSubmitted,
                Status::PreregistrationConfirmed,
            )
            .await
    }

    /// Data manager uploaded the data transfer agreement.
    pub async fn dta_uploaded(
        &self,
        principal: &Principal,
        id: RequestId,
        filename: &str,
        bytes: Vec<u8>,
    ) -> WorkflowResult<TransitionOutcome> {
        let core = &self.core;
        let now = Utc::now();
        let (guard, authorization) = core
            .enter(
                principal,
                id,
                &[Role::Dm],
                Some(&[
                    Status::Approved,
                    Status::PreregistrationConfirmed,
                    Status::DaoApproved,
                ]),
            )
            .await?;
        graph::ensure_transition(authorization.status, Status::DtaReady)?;

        core.store_agreement(&guard, files::DTA, filename, bytes).await?;
        core.transition(&guard, "dta", authorization.status, Status::DtaReady, now)
            .await
    }

    /// Researcher uploaded the signed agreement.
    pub async fn signed_dta_uploaded(
        &self,
        principal: &Principal,
        id: RequestId,
        filename: &str,
        bytes: Vec<u8>,
    ) -> WorkflowResult<TransitionOutcome> {
        let core = &self.core;
        let now = Utc::now();
        let (guard, authorization) = core
            .enter(principal, id, &[Role::Own], Some(&[Status::DtaReady]))
            .await?;
        graph::ensure_transition(authorization.status, Status::DtaSigned)?;

        core.store_agreement(&guard, files::SIGNED_DTA, filename, bytes)
            .await?;
        core.transition(&guard, "signed_dta", authorization.status, Status::DtaSigned, now)
            .await
    }

    pub async fn data_ready(&self, principal: &Principal, id: RequestId) -> WorkflowResult<TransitionOutcome> {
        self.core
            .simple_transition(
                principal,
                id,
                "data_ready",
                &[Role::Dm],
                Status::DtaSigned,
                Status::DataReady,
            )
            .await
    }
}

/// `assign_to` entries, each of which must be an eligible committee member.
fn assignees(payload: &Value, roster: &[Principal]) -> WorkflowResult<Vec<Principal>> {
    const SCHEMA: &str = "assignment";
    let Some(entries) = payload.get("assign_to") else {
        return Ok(Vec::new());
    };
    let entries = entries
        .as_array()
        .ok_or_else(|| WorkflowError::validation(SCHEMA, "/assign_to", "must be a list of reviewers"))?;

    let mut assignees = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let pointer = format!("/assign_to/{index}");
        let name = entry
            .as_str()
            .ok_or_else(|| WorkflowError::validation(SCHEMA, &pointer, "must be a user name"))?;
        let reviewer = Principal::new(name);
        if !roster.contains(&reviewer) {
            return Err(WorkflowError::validation(
                SCHEMA,
                &pointer,
                format!("{name} is not an eligible committee member"),
            ));
        }
        assignees.push(reviewer);
    }
    Ok(assignees)
}

fn review_period(payload: &Value) -> WorkflowResult<u32> {
    payload
        .get("review_period_length")
        .and_then(Value::as_u64)
        .filter(|days| *days >= 1)
        .and_then(|days| u32::try_from(days).ok())
        .ok_or_else(|| {
            WorkflowError::validation(
                "assignment",
                "/review_period_length",
                "review period must be a positive number of days",
            )
        })
}
