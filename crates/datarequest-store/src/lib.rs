//! Storage abstractions for the data-request workflow.
//!
//! The workflow sees storage as a hierarchical namespace of collections and
//! objects, with per-path access control lists and a metadata index:
//! - objects and collections (stage documents, attachments)
//! - ACL grants per principal or group
//! - multi-valued metadata attributes that can be queried by parent collection
//!
//! Every single-field write is atomic. There is no cross-path transaction;
//! callers serialize their own multi-step updates.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
mod model;
pub mod path;
mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryStorage;
pub use model::{AccessLevel, AclEntry, MetadataPredicate, MetadataQuery, MetadataRow};
pub use traits::{AclStore, MetadataStore, ObjectStore, Storage};
