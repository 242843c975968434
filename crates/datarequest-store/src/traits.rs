use crate::model::{AccessLevel, AclEntry, MetadataQuery, MetadataRow};
use crate::StorageResult;
use async_trait::async_trait;

/// Collections and objects.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create a collection, including missing ancestors.
    ///
    /// Fails with `Conflict` when the collection already exists.
    async fn create_collection(&self, path: &str) -> StorageResult<()>;

    /// True if an object or collection exists at `path`.
    async fn exists(&self, path: &str) -> StorageResult<bool>;

    /// Read an object; `NotFound` if absent.
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Create or overwrite an object. The parent collection must exist.
    async fn write(&self, path: &str, bytes: Vec<u8>) -> StorageResult<()>;

    /// Names of the direct children of a collection, sorted.
    async fn list_children(&self, path: &str) -> StorageResult<Vec<String>>;
}

/// Access control lists.
#[async_trait]
pub trait AclStore: Send + Sync {
    /// Grant `level` to `principal` on `path`; `AccessLevel::Null` revokes.
    async fn set_acl(&self, path: &str, principal: &str, level: AccessLevel) -> StorageResult<()>;

    /// Current grants on `path`.
    async fn acl(&self, path: &str) -> StorageResult<Vec<AclEntry>>;
}

/// Multi-valued metadata attributes on paths.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Replace all values of `key`. An empty list removes the attribute.
    async fn set_metadata(&self, path: &str, key: &str, values: Vec<String>) -> StorageResult<()>;

    /// Append one value to `key`.
    async fn add_metadata(&self, path: &str, key: &str, value: &str) -> StorageResult<()>;

    /// All values of `key`, in insertion order. Empty when unset.
    async fn metadata(&self, path: &str, key: &str) -> StorageResult<Vec<String>>;

    /// Rows for the direct children of `query.parent` matching the query.
    async fn query(&self, query: &MetadataQuery) -> StorageResult<Vec<MetadataRow>>;
}

/// Unified storage bundle used by the workflow engine.
pub trait Storage: ObjectStore + AclStore + MetadataStore + Send + Sync {}

impl<T> Storage for T where T: ObjectStore + AclStore + MetadataStore + Send + Sync {}
