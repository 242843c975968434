//! In-memory reference implementation of the storage traits.
//!
//! Deterministic and test-friendly. Each method takes one lock at a time,
//! so every individual write is atomic but sequences of writes are not.

use crate::model::{AccessLevel, AclEntry, MetadataQuery, MetadataRow};
use crate::path;
use crate::traits::{AclStore, MetadataStore, ObjectStore};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

/// In-memory storage adapter.
#[derive(Default)]
pub struct InMemoryStorage {
    collections: RwLock<BTreeSet<String>>,
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
    acls: RwLock<HashMap<String, BTreeMap<String, AccessLevel>>>,
    metadata: RwLock<HashMap<String, BTreeMap<String, Vec<String>>>>,
    failing_paths: RwLock<Vec<String>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write whose path contains `fragment` fail with
    /// a backend error. Applies to objects, ACLs and metadata.
    pub fn fail_writes_containing(&self, fragment: impl Into<String>) {
        if let Ok(mut guard) = self.failing_paths.write() {
            guard.push(fragment.into());
        }
    }

    fn check_injected_failure(&self, target: &str) -> StorageResult<()> {
        let guard = self
            .failing_paths
            .read()
            .map_err(|_| StorageError::Backend("failure list lock poisoned".to_string()))?;
        if guard.iter().any(|fragment| target.contains(fragment.as_str())) {
            return Err(StorageError::Backend(format!("injected write failure on {target}")));
        }
        Ok(())
    }

    fn is_collection(&self, path: &str) -> StorageResult<bool> {
        let guard = self
            .collections
            .read()
            .map_err(|_| StorageError::Backend("collections lock poisoned".to_string()))?;
        Ok(guard.contains(path))
    }

    fn is_object(&self, path: &str) -> StorageResult<bool> {
        let guard = self
            .objects
            .read()
            .map_err(|_| StorageError::Backend("objects lock poisoned".to_string()))?;
        Ok(guard.contains_key(path))
    }

    fn ensure_exists(&self, path: &str) -> StorageResult<()> {
        if self.is_collection(path)? || self.is_object(path)? {
            Ok(())
        } else {
            Err(StorageError::NotFound(path.to_string()))
        }
    }
}

fn validate_path(path: &str) -> StorageResult<()> {
    if path.is_empty() || path.split('/').any(|part| part == "..") {
        return Err(StorageError::InvalidInput(format!("invalid path {path:?}")));
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for InMemoryStorage {
    async fn create_collection(&self, path: &str) -> StorageResult<()> {
        validate_path(path)?;
        if self.is_object(path)? {
            return Err(StorageError::Conflict(format!("{path} is an object")));
        }

        let mut guard = self
            .collections
            .write()
            .map_err(|_| StorageError::Backend("collections lock poisoned".to_string()))?;
        if guard.contains(path) {
            return Err(StorageError::Conflict(format!("collection {path} already exists")));
        }

        let mut ancestor = path::parent(path);
        while let Some(dir) = ancestor.filter(|dir| !dir.is_empty()) {
            guard.insert(dir.to_string());
            ancestor = path::parent(dir);
        }
        guard.insert(path.to_string());
        Ok(())
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        Ok(self.is_collection(path)? || self.is_object(path)?)
    }

    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        let guard = self
            .objects
            .read()
            .map_err(|_| StorageError::Backend("objects lock poisoned".to_string()))?;
        guard
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn write(&self, path: &str, bytes: Vec<u8>) -> StorageResult<()> {
        validate_path(path)?;
        self.check_injected_failure(path)?;
        let parent = path::parent(path)
            .ok_or_else(|| StorageError::InvalidInput(format!("{path} has no parent")))?;
        if !self.is_collection(parent)? {
            return Err(StorageError::NotFound(parent.to_string()));
        }
        if self.is_collection(path)? {
            return Err(StorageError::Conflict(format!("{path} is a collection")));
        }

        let mut guard = self
            .objects
            .write()
            .map_err(|_| StorageError::Backend("objects lock poisoned".to_string()))?;
        guard.insert(path.to_string(), bytes);
        Ok(())
    }

    async fn list_children(&self, path: &str) -> StorageResult<Vec<String>> {
        if !self.is_collection(path)? {
            return Err(StorageError::NotFound(path.to_string()));
        }

        let mut names = BTreeSet::new();
        {
            let guard = self
                .collections
                .read()
                .map_err(|_| StorageError::Backend("collections lock poisoned".to_string()))?;
            names.extend(
                guard
                    .iter()
                    .filter(|child| path::parent(child) == Some(path))
                    .map(|child| path::file_name(child).to_string()),
            );
        }
        {
            let guard = self
                .objects
                .read()
                .map_err(|_| StorageError::Backend("objects lock poisoned".to_string()))?;
            names.extend(
                guard
                    .keys()
                    .filter(|child| path::parent(child) == Some(path))
                    .map(|child| path::file_name(child).to_string()),
            );
        }
        Ok(names.into_iter().collect())
    }
}

#[async_trait]
impl AclStore for InMemoryStorage {
    async fn set_acl(&self, path: &str, principal: &str, level: AccessLevel) -> StorageResult<()> {
        self.ensure_exists(path)?;
        self.check_injected_failure(path)?;

        let mut guard = self
            .acls
            .write()
            .map_err(|_| StorageError::Backend("acl lock poisoned".to_string()))?;
        let entries = guard.entry(path.to_string()).or_default();
        if level == AccessLevel::Null {
            entries.remove(principal);
        } else {
            entries.insert(principal.to_string(), level);
        }
        Ok(())
    }

    async fn acl(&self, path: &str) -> StorageResult<Vec<AclEntry>> {
        self.ensure_exists(path)?;
        let guard = self
            .acls
            .read()
            .map_err(|_| StorageError::Backend("acl lock poisoned".to_string()))?;
        Ok(guard
            .get(path)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(principal, level)| AclEntry {
                        principal: principal.clone(),
                        level: *level,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl MetadataStore for InMemoryStorage {
    async fn set_metadata(&self, path: &str, key: &str, values: Vec<String>) -> StorageResult<()> {
        self.ensure_exists(path)?;
        self.check_injected_failure(&path::join(path, key))?;

        let mut guard = self
            .metadata
            .write()
            .map_err(|_| StorageError::Backend("metadata lock poisoned".to_string()))?;
        let attributes = guard.entry(path.to_string()).or_default();
        if values.is_empty() {
            attributes.remove(key);
        } else {
            attributes.insert(key.to_string(), values);
        }
        Ok(())
    }

    async fn add_metadata(&self, path: &str, key: &str, value: &str) -> StorageResult<()> {
        self.ensure_exists(path)?;
        self.check_injected_failure(&path::join(path, key))?;

        let mut guard = self
            .metadata
            .write()
            .map_err(|_| StorageError::Backend("metadata lock poisoned".to_string()))?;
        guard
            .entry(path.to_string())
            .or_default()
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
        Ok(())
    }

    async fn metadata(&self, path: &str, key: &str) -> StorageResult<Vec<String>> {
        let guard = self
            .metadata
            .read()
            .map_err(|_| StorageError::Backend("metadata lock poisoned".to_string()))?;
        Ok(guard
            .get(path)
            .and_then(|attributes| attributes.get(key))
            .cloned()
            .unwrap_or_default())
    }

    async fn query(&self, query: &MetadataQuery) -> StorageResult<Vec<MetadataRow>> {
        let guard = self
            .metadata
            .read()
            .map_err(|_| StorageError::Backend("metadata lock poisoned".to_string()))?;

        let mut rows: Vec<MetadataRow> = guard
            .iter()
            .filter(|(path, _)| path::parent(path) == Some(query.parent.as_str()))
            .filter_map(|(path, attributes)| {
                attributes.get(&query.key).map(|values| (path, values))
            })
            .flat_map(|(path, values)| {
                values
                    .iter()
                    .filter(|value| query.predicate.matches(value))
                    .map(move |value| MetadataRow {
                        path: path.clone(),
                        key: query.key.clone(),
                        value: value.clone(),
                    })
            })
            .collect();
        rows.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn objects_require_parent_collection() {
        let store = InMemoryStorage::new();
        let err = store.write("/zone/a/doc.json", b"{}".to_vec()).await.unwrap_err();
        assert_eq!(err, StorageError::NotFound("/zone/a".into()));

        store.create_collection("/zone/a").await.unwrap();
        store.write("/zone/a/doc.json", b"{}".to_vec()).await.unwrap();
        assert_eq!(store.read("/zone/a/doc.json").await.unwrap(), b"{}".to_vec());
        assert!(store.exists("/zone").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_collection_conflicts() {
        let store = InMemoryStorage::new();
        store.create_collection("/zone/requests/1").await.unwrap();
        assert!(matches!(
            store.create_collection("/zone/requests/1").await,
            Err(StorageError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn lists_direct_children_only() {
        let store = InMemoryStorage::new();
        store.create_collection("/root/1/attachments").await.unwrap();
        store.create_collection("/root/2").await.unwrap();
        store.write("/root/1/datarequest.json", vec![]).await.unwrap();

        assert_eq!(store.list_children("/root").await.unwrap(), vec!["1", "2"]);
        assert_eq!(
            store.list_children("/root/1").await.unwrap(),
            vec!["attachments", "datarequest.json"]
        );
        assert!(matches!(store.list_children("/missing").await, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn acl_grants_and_revokes() {
        let store = InMemoryStorage::new();
        store.create_collection("/root/1").await.unwrap();
        store.set_acl("/root/1", "alice", AccessLevel::Own).await.unwrap();
        store.set_acl("/root/1", "dm-group", AccessLevel::Read).await.unwrap();
        store.set_acl("/root/1", "dm-group", AccessLevel::Null).await.unwrap();

        let acl = store.acl("/root/1").await.unwrap();
        assert_eq!(
            acl,
            vec![AclEntry {
                principal: "alice".into(),
                level: AccessLevel::Own
            }]
        );
        assert!(store.set_acl("/root/9", "bob", AccessLevel::Read).await.is_err());
    }

    #[tokio::test]
    async fn metadata_query_filters_by_parent_and_value() {
        let store = InMemoryStorage::new();
        for id in ["1", "2", "3"] {
            store.create_collection(&format!("/root/{id}")).await.unwrap();
        }
        store.create_collection("/elsewhere/4").await.unwrap();
        store.set_metadata("/root/1", "status", vec!["UNDER_REVIEW".into()]).await.unwrap();
        store.set_metadata("/root/2", "status", vec!["SUBMITTED".into()]).await.unwrap();
        store.set_metadata("/root/3", "status", vec!["UNDER_REVIEW".into()]).await.unwrap();
        store.set_metadata("/elsewhere/4", "status", vec!["UNDER_REVIEW".into()]).await.unwrap();
        store.set_metadata("/root/1", "endOfReviewPeriod", vec!["100".into()]).await.unwrap();
        store.set_metadata("/root/3", "endOfReviewPeriod", vec!["300".into()]).await.unwrap();

        let under_review = store
            .query(&MetadataQuery::new("/root", "status").equals("UNDER_REVIEW"))
            .await
            .unwrap();
        let paths: Vec<_> = under_review.iter().map(|row| row.path.as_str()).collect();
        assert_eq!(paths, vec!["/root/1", "/root/3"]);

        let expired = store
            .query(&MetadataQuery::new("/root", "endOfReviewPeriod").less_than(200))
            .await
            .unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].path, "/root/1");
    }

    #[tokio::test]
    async fn metadata_values_accumulate_and_clear() {
        let store = InMemoryStorage::new();
        store.create_collection("/root/1").await.unwrap();
        store.add_metadata("/root/1", "reviewedBy", "m1").await.unwrap();
        store.add_metadata("/root/1", "reviewedBy", "m2").await.unwrap();
        assert_eq!(store.metadata("/root/1", "reviewedBy").await.unwrap(), vec!["m1", "m2"]);

        store.set_metadata("/root/1", "reviewedBy", vec![]).await.unwrap();
        assert!(store.metadata("/root/1", "reviewedBy").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn injected_failures_hit_matching_paths() {
        let store = InMemoryStorage::new();
        store.create_collection("/root/1").await.unwrap();
        store.fail_writes_containing("provenance.json");

        assert!(matches!(
            store.write("/root/1/provenance.json", vec![]).await,
            Err(StorageError::Backend(_))
        ));
        store.write("/root/1/datarequest.json", vec![]).await.unwrap();
    }
}
