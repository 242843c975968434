//! Read-side operations. None of them take the request lock.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use datarequest_types::{DocumentKind, Principal, RequestId, RequestKind, Role, RoleSet, Status};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{WorkflowCore, WorkflowOrchestrator};
use crate::error::{WorkflowError, WorkflowResult};
use crate::records::files;
use crate::visibility;

/// A stored datarequest together with where it stands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatarequestView {
    pub request_id: RequestId,
    pub json: Value,
    pub kind: RequestKind,
    pub status: Status,
    pub schema_version: String,
    pub available_documents: Vec<DocumentKind>,
}

impl WorkflowCore {
    pub(crate) fn kind_of(&self, datarequest: &Value) -> RequestKind {
        let draft = datarequest
            .get("draft")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let purpose = datarequest
            .pointer("/datarequest/purpose")
            .and_then(Value::as_str);
        RequestKind::derive(draft, purpose, &self.config.dao_purpose)
    }

    /// Schema version a stored datarequest was submitted against. Requests
    /// without `links` predate versioned schemas.
    fn schema_version(&self, id: RequestId, datarequest: &Value) -> WorkflowResult<String> {
        let Some(links) = datarequest.get("links").and_then(Value::as_array) else {
            return Ok(self.config.schema.legacy_version.clone());
        };
        let described_by: Vec<&str> = links
            .iter()
            .filter(|link| link.get("rel").and_then(Value::as_str) == Some("describedby"))
            .filter_map(|link| link.get("href").and_then(Value::as_str))
            .collect();
        let [href] = described_by.as_slice() else {
            return Err(WorkflowError::Internal(format!(
                "request {id} has {} describedby links",
                described_by.len()
            )));
        };
        self.config
            .schema
            .version_from_href(href)
            .map(str::to_string)
            .ok_or_else(|| {
                WorkflowError::Internal(format!("request {id} links an unknown schema: {href}"))
            })
    }
}

impl WorkflowOrchestrator {
    pub async fn get_status(&self, id: RequestId) -> WorkflowResult<Status> {
        self.core.records.status(id).await
    }

    pub async fn get_roles(&self, principal: &Principal, id: Option<RequestId>) -> WorkflowResult<RoleSet> {
        self.core.roles.roles_for(principal, id).await
    }

    pub async fn request_kind(&self, id: RequestId) -> WorkflowResult<RequestKind> {
        let core = &self.core;
        core.records.ensure_exists(id).await?;
        Ok(match core.records.read_json_opt::<Value>(id, files::DATAREQUEST).await? {
            Some(datarequest) => core.kind_of(&datarequest),
            None => RequestKind::Draft,
        })
    }

    /// Documents `principal` may open on request `id` at its current status.
    pub async fn get_available_documents(
        &self,
        principal: &Principal,
        id: RequestId,
    ) -> WorkflowResult<Vec<DocumentKind>> {
        let authorization = self
            .core
            .gate
            .advisory(
                principal,
                id,
                &[Role::Pm, Role::Dm, Role::Dac, Role::Own, Role::Rev],
            )
            .await?;
        let kind = self.request_kind(id).await?;
        Ok(visibility::available_documents(
            kind,
            authorization.status,
            &authorization.roles,
        ))
    }

    pub async fn get_datarequest(&self, principal: &Principal, id: RequestId) -> WorkflowResult<DatarequestView> {
        let core = &self.core;
        let authorization = core
            .gate
            .authorize(principal, id, &[Role::Pm, Role::Dm, Role::Dac, Role::Own], None)
            .await?;
        let json: Value = core.records.read_json(id, files::DATAREQUEST).await?;
        let kind = core.kind_of(&json);
        let schema_version = core.schema_version(id, &json)?;
        let available_documents =
            visibility::available_documents(kind, authorization.status, &authorization.roles);

        Ok(DatarequestView {
            request_id: id,
            json,
            kind,
            status: authorization.status,
            schema_version,
            available_documents,
        })
    }

    async fn gated_document(
        &self,
        principal: &Principal,
        id: RequestId,
        roles: &[Role],
        name: &str,
    ) -> WorkflowResult<Value> {
        self.core.gate.authorize(principal, id, roles, None).await?;
        self.core.records.read_json(id, name).await
    }

    pub async fn get_preliminary_review(&self, principal: &Principal, id: RequestId) -> WorkflowResult<Value> {
        self.gated_document(principal, id, &[Role::Pm, Role::Dm, Role::Rev], files::PRELIMINARY_REVIEW)
            .await
    }

    pub async fn get_datamanager_review(&self, principal: &Principal, id: RequestId) -> WorkflowResult<Value> {
        self.gated_document(principal, id, &[Role::Pm, Role::Dm, Role::Rev], files::DATAMANAGER_REVIEW)
            .await
    }

    pub async fn get_assignment(&self, principal: &Principal, id: RequestId) -> WorkflowResult<Value> {
        self.gated_document(principal, id, &[Role::Pm], files::ASSIGNMENT)
            .await
    }

    pub async fn get_evaluation(&self, principal: &Principal, id: RequestId) -> WorkflowResult<Value> {
        self.gated_document(principal, id, &[Role::Pm, Role::Dac], files::EVALUATION)
            .await
    }

    pub async fn get_preregistration(&self, principal: &Principal, id: RequestId) -> WorkflowResult<Value> {
        self.gated_document(principal, id, &[Role::Pm], files::PREREGISTRATION)
            .await
    }

    /// Submitted reviews keyed by reviewer.
    pub async fn get_reviews(
        &self,
        principal: &Principal,
        id: RequestId,
    ) -> WorkflowResult<BTreeMap<Principal, Value>> {
        let core = &self.core;
        core.gate
            .authorize(principal, id, &[Role::Pm, Role::Rev], None)
            .await?;
        let reads = core
            .records
            .review_files(id)
            .await?
            .into_iter()
            .map(|name| async move {
                let review: Value = core.records.read_json(id, &name).await?;
                let reviewer = name
                    .trim_start_matches(files::REVIEW_PREFIX)
                    .trim_end_matches(".json");
                Ok::<_, WorkflowError>((Principal::new(reviewer), review))
            });
        Ok(try_join_all(reads).await?.into_iter().collect())
    }

    /// Feedback left for the owner by a rejecting decision.
    pub async fn get_feedback(&self, principal: &Principal, id: RequestId) -> WorkflowResult<String> {
        let core = &self.core;
        core.gate
            .authorize(principal, id, &[Role::Own], Some(&Status::WITH_FEEDBACK))
            .await?;
        core.records.read_json(id, files::FEEDBACK).await
    }

    pub async fn get_approval_conditions(
        &self,
        principal: &Principal,
        id: RequestId,
    ) -> WorkflowResult<Option<Value>> {
        let core = &self.core;
        core.gate.authorize(principal, id, &[Role::Own], None).await?;
        core.records
            .read_json_opt(id, files::APPROVAL_CONDITIONS)
            .await
    }

    pub async fn get_attachments(&self, principal: &Principal, id: RequestId) -> WorkflowResult<Vec<String>> {
        let core = &self.core;
        core.gate
            .authorize(principal, id, &[Role::Pm, Role::Dm, Role::Dac, Role::Own], None)
            .await?;
        core.records.uploads(id, files::ATTACHMENTS).await
    }

    /// Status timestamps of request `id`.
    pub async fn get_provenance(
        &self,
        principal: &Principal,
        id: RequestId,
    ) -> WorkflowResult<BTreeMap<Status, DateTime<Utc>>> {
        let core = &self.core;
        core.gate
            .authorize(principal, id, &[Role::Pm, Role::Dm], None)
            .await?;
        core.provenance.timestamps(id).await
    }

    /// Committee members eligible to review request `id`.
    pub async fn dac_members(&self, principal: &Principal, id: RequestId) -> WorkflowResult<Vec<Principal>> {
        self.core
            .gate
            .authorize(principal, id, &[Role::Pm], None)
            .await?;
        self.core.dac_members(id).await
    }

    /// Request that resubmitted `previous`.
    pub async fn resubmission_id(&self, previous: RequestId) -> WorkflowResult<RequestId> {
        let successors = self.core.records.successors_of(previous).await?;
        match successors.as_slice() {
            [] => Err(WorkflowError::NotFound(format!("resubmission of {previous}"))),
            [id] => Ok(*id),
            many => Err(WorkflowError::Internal(format!(
                "request {previous} was resubmitted {} times",
                many.len()
            ))),
        }
    }
}
