//! Typed access to the storage layout of requests.
//!
//! Every request is a collection `<root>/<id>` holding its stage documents,
//! three sub-collections for uploaded files, and a handful of metadata
//! attributes (status, owner, reviewer sets, review deadline).

use std::sync::Arc;

use datarequest_store::{path, AccessLevel, MetadataQuery, Storage, StorageError};
use datarequest_types::{Principal, RequestId, Status};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{WorkflowError, WorkflowResult};

/// File names inside a request collection.
pub mod files {
    pub const DATAREQUEST: &str = "datarequest.json";
    pub const PROVENANCE: &str = "provenance.json";
    pub const PRELIMINARY_REVIEW: &str = "preliminary_review.json";
    pub const DATAMANAGER_REVIEW: &str = "datamanager_review.json";
    pub const ASSIGNMENT: &str = "assignment.json";
    pub const EVALUATION: &str = "evaluation.json";
    pub const APPROVAL_CONDITIONS: &str = "approval_conditions.json";
    pub const FEEDBACK: &str = "feedback.json";
    pub const PREREGISTRATION: &str = "preregistration.json";

    pub const ATTACHMENTS: &str = "attachments";
    pub const DTA: &str = "dta";
    pub const SIGNED_DTA: &str = "signed_dta";

    /// Review document of one committee member.
    pub fn review(reviewer: &str) -> String {
        format!("review_{reviewer}.json")
    }

    pub const REVIEW_PREFIX: &str = "review_";
}

/// Metadata attribute names on a request collection.
pub mod keys {
    pub const STATUS: &str = "status";
    pub const OWNER: &str = "owner";
    pub const PREVIOUS_REQUEST_ID: &str = "previous_request_id";
    pub const ASSIGNED_FOR_REVIEW: &str = "assignedForReview";
    pub const REVIEWED_BY: &str = "reviewedBy";
    pub const END_OF_REVIEW_PERIOD: &str = "endOfReviewPeriod";
    pub const TITLE: &str = "title";
}

#[derive(Clone)]
pub struct RequestRecords {
    storage: Arc<dyn Storage>,
    root: String,
}

impl RequestRecords {
    pub fn new(storage: Arc<dyn Storage>, root: impl Into<String>) -> Self {
        Self {
            storage,
            root: root.into(),
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn collection(&self, id: RequestId) -> String {
        path::join(&self.root, &id.to_string())
    }

    pub fn file(&self, id: RequestId, name: &str) -> String {
        path::join(&self.collection(id), name)
    }

    pub async fn exists(&self, id: RequestId) -> WorkflowResult<bool> {
        Ok(self.storage.exists(&self.collection(id)).await?)
    }

    pub async fn ensure_exists(&self, id: RequestId) -> WorkflowResult<()> {
        if self.exists(id).await? {
            Ok(())
        } else {
            Err(WorkflowError::NotFound(id.to_string()))
        }
    }

    // ── Creation ────────────────────────────────────────────────────

    /// Highest numeric child of the root plus one; 1 for an empty root.
    pub async fn next_request_id(&self) -> WorkflowResult<RequestId> {
        let children = match self.storage.list_children(&self.root).await {
            Ok(children) => children,
            Err(StorageError::NotFound(_)) => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        let max = children
            .iter()
            .filter_map(|name| name.parse::<RequestId>().ok())
            .max()
            .unwrap_or(RequestId(0));
        max.next()
            .ok_or_else(|| WorkflowError::Internal(format!("request id space exhausted after {max}")))
    }

    /// Create the request collection, its upload sub-collections and an
    /// empty provenance log. Callers serialize creation.
    pub async fn create(&self, id: RequestId, owner: &Principal) -> WorkflowResult<()> {
        let collection = self.collection(id);
        self.storage.create_collection(&collection).await?;
        for sub in [files::ATTACHMENTS, files::DTA, files::SIGNED_DTA] {
            self.storage.create_collection(&path::join(&collection, sub)).await?;
        }
        self.storage
            .set_acl(&collection, owner.as_str(), AccessLevel::Own)
            .await?;
        self.storage
            .set_metadata(&collection, keys::OWNER, vec![owner.to_string()])
            .await?;
        self.write_json(id, files::PROVENANCE, &serde_json::Map::new(), &[])
            .await
    }

    // ── Status ──────────────────────────────────────────────────────

    /// Current status. No recorded status means `IN_SUBMISSION`; more than
    /// one is an internal error.
    pub async fn status(&self, id: RequestId) -> WorkflowResult<Status> {
        self.ensure_exists(id).await?;
        let values = self
            .storage
            .metadata(&self.collection(id), keys::STATUS)
            .await?;
        match values.as_slice() {
            [] => Ok(Status::InSubmission),
            [value] => Ok(value.parse()?),
            _ => Err(WorkflowError::Internal(format!(
                "request {id} has {} status values",
                values.len()
            ))),
        }
    }

    pub async fn set_status(&self, id: RequestId, status: Status) -> WorkflowResult<()> {
        self.storage
            .set_metadata(&self.collection(id), keys::STATUS, vec![status.to_string()])
            .await?;
        Ok(())
    }

    /// Ids of all requests currently in `status`.
    pub async fn ids_with_status(&self, status: Status) -> WorkflowResult<Vec<RequestId>> {
        let rows = self
            .storage
            .query(&MetadataQuery::new(&self.root, keys::STATUS).equals(status.as_str()))
            .await?;
        Ok(rows
            .iter()
            .filter_map(|row| path::file_name(&row.path).parse().ok())
            .collect())
    }

    // ── Single-valued attributes ────────────────────────────────────

    async fn single_value(&self, id: RequestId, key: &str) -> WorkflowResult<Option<String>> {
        let mut values = self.storage.metadata(&self.collection(id), key).await?;
        match values.len() {
            0 => Ok(None),
            1 => Ok(values.pop()),
            n => Err(WorkflowError::Internal(format!(
                "request {id} has {n} values for {key}"
            ))),
        }
    }

    pub async fn owner(&self, id: RequestId) -> WorkflowResult<Option<Principal>> {
        Ok(self.single_value(id, keys::OWNER).await?.map(Principal::from))
    }

    pub async fn previous_request_id(&self, id: RequestId) -> WorkflowResult<Option<RequestId>> {
        match self.single_value(id, keys::PREVIOUS_REQUEST_ID).await? {
            Some(value) => Ok(Some(value.parse()?)),
            None => Ok(None),
        }
    }

    pub async fn set_previous_request_id(
        &self,
        id: RequestId,
        previous: RequestId,
    ) -> WorkflowResult<()> {
        self.storage
            .set_metadata(
                &self.collection(id),
                keys::PREVIOUS_REQUEST_ID,
                vec![previous.to_string()],
            )
            .await?;
        Ok(())
    }

    /// Requests that name `previous` as their predecessor.
    pub async fn successors_of(&self, previous: RequestId) -> WorkflowResult<Vec<RequestId>> {
        let rows = self
            .storage
            .query(
                &MetadataQuery::new(&self.root, keys::PREVIOUS_REQUEST_ID)
                    .equals(previous.to_string()),
            )
            .await?;
        Ok(rows
            .iter()
            .filter_map(|row| path::file_name(&row.path).parse().ok())
            .collect())
    }

    pub async fn set_title(&self, id: RequestId, title: &str) -> WorkflowResult<()> {
        self.storage
            .set_metadata(&self.collection(id), keys::TITLE, vec![title.to_string()])
            .await?;
        Ok(())
    }

    // ── Review bookkeeping ──────────────────────────────────────────

    pub async fn principals(&self, id: RequestId, key: &str) -> WorkflowResult<Vec<Principal>> {
        Ok(self
            .storage
            .metadata(&self.collection(id), key)
            .await?
            .into_iter()
            .map(Principal::from)
            .collect())
    }

    pub async fn set_principals(
        &self,
        id: RequestId,
        key: &str,
        principals: &[Principal],
    ) -> WorkflowResult<()> {
        self.storage
            .set_metadata(
                &self.collection(id),
                key,
                principals.iter().map(Principal::to_string).collect(),
            )
            .await?;
        Ok(())
    }

    pub async fn add_principal(
        &self,
        id: RequestId,
        key: &str,
        principal: &Principal,
    ) -> WorkflowResult<()> {
        self.storage
            .add_metadata(&self.collection(id), key, principal.as_str())
            .await?;
        Ok(())
    }

    /// Review deadline in unix seconds.
    pub async fn review_deadline(&self, id: RequestId) -> WorkflowResult<Option<i64>> {
        match self.single_value(id, keys::END_OF_REVIEW_PERIOD).await? {
            Some(value) => value.parse::<i64>().map(Some).map_err(|_| {
                WorkflowError::Internal(format!("request {id} has a malformed review deadline"))
            }),
            None => Ok(None),
        }
    }

    pub async fn set_review_deadline(&self, id: RequestId, deadline: i64) -> WorkflowResult<()> {
        self.storage
            .set_metadata(
                &self.collection(id),
                keys::END_OF_REVIEW_PERIOD,
                vec![deadline.to_string()],
            )
            .await?;
        Ok(())
    }

    // ── Documents ───────────────────────────────────────────────────

    pub async fn read_json<T: DeserializeOwned>(&self, id: RequestId, name: &str) -> WorkflowResult<T> {
        let bytes = self.storage.read(&self.file(id, name)).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Like [`Self::read_json`], but a missing document is `None`.
    pub async fn read_json_opt<T: DeserializeOwned>(
        &self,
        id: RequestId,
        name: &str,
    ) -> WorkflowResult<Option<T>> {
        match self.read_json(id, name).await {
            Ok(value) => Ok(Some(value)),
            Err(WorkflowError::Storage(StorageError::NotFound(_))) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Write a document and grant read access to each of `readers`.
    pub async fn write_json<T: Serialize + ?Sized>(
        &self,
        id: RequestId,
        name: &str,
        value: &T,
        readers: &[String],
    ) -> WorkflowResult<()> {
        let file = self.file(id, name);
        let bytes = serde_json::to_vec_pretty(value)?;
        self.storage.write(&file, bytes).await?;
        for reader in readers {
            self.storage.set_acl(&file, reader, AccessLevel::Read).await?;
        }
        Ok(())
    }

    /// Store an uploaded file in one of the upload sub-collections.
    pub async fn write_upload(
        &self,
        id: RequestId,
        sub_collection: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> WorkflowResult<String> {
        if filename.is_empty() || filename.contains('/') {
            return Err(WorkflowError::validation(
                sub_collection,
                "/filename",
                "file name must be a single path component",
            ));
        }
        let target = path::join(&self.file(id, sub_collection), filename);
        self.storage.write(&target, bytes).await?;
        Ok(target)
    }

    /// Files in an upload sub-collection, sorted by name.
    pub async fn uploads(&self, id: RequestId, sub_collection: &str) -> WorkflowResult<Vec<String>> {
        Ok(self
            .storage
            .list_children(&self.file(id, sub_collection))
            .await?)
    }

    /// Names of the review documents written so far.
    pub async fn review_files(&self, id: RequestId) -> WorkflowResult<Vec<String>> {
        Ok(self
            .storage
            .list_children(&self.collection(id))
            .await?
            .into_iter()
            .filter(|name| name.starts_with(files::REVIEW_PREFIX) && name.ends_with(".json"))
            .collect())
    }

    pub async fn grant_read(&self, target: &str, principal: &str) -> WorkflowResult<()> {
        self.storage.set_acl(target, principal, AccessLevel::Read).await?;
        Ok(())
    }
}
