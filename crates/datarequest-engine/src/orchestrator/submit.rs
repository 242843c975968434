//! Submission, draft saves, resubmission and attachment uploads.

use chrono::{DateTime, Utc};
use datarequest_store::{path, AccessLevel};
use datarequest_types::{Principal, RequestId, RequestKind, Role, Status};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::{TransitionOutcome, WorkflowCore, WorkflowOrchestrator};
use crate::error::{PermissionError, WorkflowError, WorkflowResult};
use crate::locks::RequestGuard;
use crate::records::files;

const SCHEMA: &str = "datarequest";

/// A datarequest form handed in by a researcher.
#[derive(Debug, Clone)]
pub struct Submission {
    pub payload: Value,
    /// Save without validating or entering the review pipeline.
    pub draft: bool,
    /// Existing draft to update instead of creating a new request.
    pub draft_request_id: Option<RequestId>,
}

impl Submission {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            draft: false,
            draft_request_id: None,
        }
    }

    pub fn draft(payload: Value) -> Self {
        Self {
            draft: true,
            ..Self::new(payload)
        }
    }

    /// Continue from the draft saved as `id`.
    pub fn from_draft(mut self, id: RequestId) -> Self {
        self.draft_request_id = Some(id);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub request_id: RequestId,
    pub status: Status,
    pub kind: RequestKind,
}

impl SubmitOutcome {
    pub fn pending_attachments(&self) -> bool {
        self.status == Status::PendingAttachments
    }
}

fn pointer_str<'a>(payload: &'a Value, pointer: &str) -> Option<&'a str> {
    payload.pointer(pointer).and_then(Value::as_str)
}

/// `previous_request_id` of a resubmission, as a number or numeric string.
fn previous_request_id(payload: &Value) -> WorkflowResult<Option<RequestId>> {
    match payload.get("previous_request_id") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(|id| Some(RequestId(id)))
            .ok_or_else(|| WorkflowError::validation(SCHEMA, "/previous_request_id", "must be a request id")),
        Some(Value::String(s)) => Ok(Some(s.parse()?)),
        Some(_) => Err(WorkflowError::validation(
            SCHEMA,
            "/previous_request_id",
            "must be a request id",
        )),
    }
}

impl WorkflowCore {
    fn destination(&self, payload: &Value) -> (RequestKind, Status) {
        let purpose = pointer_str(payload, "/datarequest/purpose");
        match RequestKind::derive(false, purpose, &self.config.dao_purpose) {
            RequestKind::Dao => (RequestKind::Dao, Status::DaoSubmitted),
            kind => {
                if pointer_str(payload, "/datarequest/attachments/attachments") == Some("Yes") {
                    (kind, Status::PendingAttachments)
                } else {
                    (kind, Status::Submitted)
                }
            }
        }
    }

    fn enrich(&self, payload: &mut Value, owner: &Principal, draft: bool, now: DateTime<Utc>) -> WorkflowResult<()> {
        let href = self
            .config
            .schema
            .datarequest_schema_href(&self.config.schema.version);
        let object = payload
            .as_object_mut()
            .ok_or_else(|| WorkflowError::validation(SCHEMA, "", "form data must be an object"))?;
        object.insert("owner".into(), json!(owner.as_str()));
        object.insert("draft".into(), json!(draft));
        object.insert("links".into(), json!([{ "rel": "describedby", "href": href }]));
        object.insert("submission_timestamp".into(), json!(now.timestamp().to_string()));
        Ok(())
    }

    /// Lock the previous request of a resubmission and check that it belongs
    /// to the caller and is waiting for one. The guard is held until the
    /// previous request is retired.
    async fn lock_resubmittable(
        &self,
        principal: &Principal,
        previous: RequestId,
    ) -> WorkflowResult<(RequestGuard, Status)> {
        self.records.ensure_exists(previous).await?;
        let guard = self.locks.lock(previous).await;
        if self.records.owner(previous).await?.as_ref() != Some(principal) {
            return Err(PermissionError::InsufficientRole {
                request_id: previous.to_string(),
                principal: principal.clone(),
            }
            .into());
        }
        let status = self.records.status(previous).await?;
        if !Status::AWAITING_RESUBMISSION.contains(&status) {
            return Err(PermissionError::IllegalStatus {
                request_id: previous.to_string(),
                status,
            }
            .into());
        }
        Ok((guard, status))
    }

    /// Allocate an id and lay out the request collection.
    async fn create_request(&self, owner: &Principal) -> WorkflowResult<RequestGuard> {
        let _creating = self.creation.lock().await;
        let id = self.records.next_request_id().await?;
        let guard = self.locks.lock(id).await;
        self.records.create(id, owner).await?;

        let storage = self.records.storage();
        let collection = self.records.collection(id);
        let pm = self.group(Role::Pm)?;
        let dm = self.group(Role::Dm)?;
        let dac = self.group(Role::Dac)?;
        let admin = self.config.admin_principal.as_str();

        for target in [collection.clone(), path::join(&collection, files::ATTACHMENTS)] {
            for group in [&dm, &dac, &pm] {
                self.records.grant_read(&target, group).await?;
            }
            storage.set_acl(&target, admin, AccessLevel::Own).await?;
        }
        self.records
            .grant_read(&path::join(&collection, files::ATTACHMENTS), owner.as_str())
            .await?;
        for sub in [files::DTA, files::SIGNED_DTA] {
            let target = path::join(&collection, sub);
            for reader in [pm.as_str(), dm.as_str(), owner.as_str()] {
                self.records.grant_read(&target, reader).await?;
            }
            storage.set_acl(&target, admin, AccessLevel::Own).await?;
        }
        storage
            .set_acl(&self.records.file(id, files::PROVENANCE), owner.as_str(), AccessLevel::Null)
            .await?;

        info!(request_id = %id, owner = %owner, "request created");
        Ok(guard)
    }
}

impl WorkflowOrchestrator {
    /// Submit a datarequest, save it as a draft, or submit a saved draft.
    pub async fn submit(&self, principal: &Principal, submission: Submission) -> WorkflowResult<SubmitOutcome> {
        let core = &self.core;
        let now = Utc::now();
        let Submission {
            mut payload,
            draft,
            draft_request_id,
        } = submission;

        if !draft {
            core.validate(&payload, core.schema(SCHEMA))?;
        }

        let standing = core.roles.roles_for(principal, None).await?;
        if standing.intersects(&[Role::Pm, Role::Dm]) {
            return Err(PermissionError::InsufficientRole {
                request_id: draft_request_id.map_or_else(|| "new".to_string(), |id| id.to_string()),
                principal: principal.clone(),
            }
            .into());
        }

        let previous = if draft { None } else { previous_request_id(&payload)? };

        let (kind, destination) = if draft {
            (RequestKind::Draft, Status::Draft)
        } else {
            core.destination(&payload)
        };
        let from = if draft_request_id.is_some() {
            Status::Draft
        } else {
            Status::InSubmission
        };
        if from != destination {
            crate::graph::ensure_transition(from, destination)?;
        }
        core.enrich(&mut payload, principal, draft, now)?;

        if previous.is_some() && previous == draft_request_id {
            return Err(WorkflowError::validation(
                SCHEMA,
                "/previous_request_id",
                "a request cannot resubmit itself",
            ));
        }
        // Every resubmission path locks the previous request before the new one.
        let retiring = match previous {
            Some(previous) => Some(core.lock_resubmittable(principal, previous).await?),
            None => None,
        };

        let guard = match draft_request_id {
            Some(id) => {
                let (guard, _) = core
                    .enter(principal, id, &[Role::Own], Some(&[Status::Draft]))
                    .await?;
                guard
            }
            None => core.create_request(principal).await?,
        };
        let id = guard.id();

        if draft {
            core.records
                .write_json(id, files::DATAREQUEST, &payload, &[])
                .await?;
            if from == Status::InSubmission {
                core.commit(&guard, from, Status::Draft, now).await?;
            }
            info!(request_id = %id, principal = %principal, "draft saved");
            return Ok(SubmitOutcome {
                request_id: id,
                status: Status::Draft,
                kind,
            });
        }

        let readers = [core.group(Role::Dm)?, core.group(Role::Pm)?];
        core.records
            .write_json(id, files::DATAREQUEST, &payload, &readers)
            .await?;
        core.records
            .grant_read(&core.records.file(id, files::DATAREQUEST), principal.as_str())
            .await?;
        if let Some(title) = pointer_str(&payload, "/datarequest/study_information/title") {
            core.records.set_title(id, title).await?;
        }
        if let Some(previous) = previous {
            core.records.set_previous_request_id(id, previous).await?;
        }

        core.transition(&guard, "submit", from, destination, now).await?;
        drop(guard);

        if let Some((previous_guard, previous_status)) = retiring {
            core.transition(&previous_guard, "resubmit", previous_status, Status::Resubmitted, now)
                .await?;
        }

        Ok(SubmitOutcome {
            request_id: id,
            status: destination,
            kind,
        })
    }

    /// Store one attachment of a request waiting for them.
    pub async fn upload_attachment(
        &self,
        principal: &Principal,
        id: RequestId,
        filename: &str,
        bytes: Vec<u8>,
    ) -> WorkflowResult<String> {
        let core = &self.core;
        let (_guard, _) = core
            .enter(principal, id, &[Role::Own], Some(&[Status::PendingAttachments]))
            .await?;
        let stored = core
            .records
            .write_upload(id, files::ATTACHMENTS, filename, bytes)
            .await?;
        for group in [core.group(Role::Pm)?, core.group(Role::Dm)?] {
            core.records.grant_read(&stored, &group).await?;
        }
        info!(request_id = %id, file = %filename, "attachment uploaded");
        Ok(stored)
    }

    /// Finish the attachment step and hand the request to the project
    /// managers.
    pub async fn submit_attachments(&self, principal: &Principal, id: RequestId) -> WorkflowResult<TransitionOutcome> {
        let core = &self.core;
        let now = Utc::now();
        let (guard, authorization) = core
            .enter(principal, id, &[Role::Own], Some(&[Status::PendingAttachments]))
            .await?;
        crate::graph::ensure_transition(authorization.status, Status::Submitted)?;

        let attachments = core.records.file(id, files::ATTACHMENTS);
        for name in core.records.uploads(id, files::ATTACHMENTS).await? {
            core.records
                .grant_read(&path::join(&attachments, &name), principal.as_str())
                .await?;
        }

        core.transition(&guard, "submit_attachments", authorization.status, Status::Submitted, now)
            .await
    }
}
