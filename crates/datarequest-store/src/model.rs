use serde::{Deserialize, Serialize};

/// Access level granted on a path.
///
/// `Null` removes an existing grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Null,
    Read,
    Write,
    Own,
}

/// One grant in an access control list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    pub principal: String,
    pub level: AccessLevel,
}

/// Value filter applied by a metadata query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataPredicate {
    /// Every value of the attribute.
    Any,
    /// Values equal to the given string.
    Equals(String),
    /// Values that parse as an integer strictly below the bound.
    LessThan(i64),
}

impl MetadataPredicate {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            MetadataPredicate::Any => true,
            MetadataPredicate::Equals(expected) => value == expected,
            MetadataPredicate::LessThan(bound) => value
                .parse::<i64>()
                .map(|parsed| parsed < *bound)
                .unwrap_or(false),
        }
    }
}

/// Query over the metadata of the direct children of one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataQuery {
    pub parent: String,
    pub key: String,
    pub predicate: MetadataPredicate,
}

impl MetadataQuery {
    pub fn new(parent: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            key: key.into(),
            predicate: MetadataPredicate::Any,
        }
    }

    pub fn equals(mut self, value: impl Into<String>) -> Self {
        self.predicate = MetadataPredicate::Equals(value.into());
        self
    }

    pub fn less_than(mut self, bound: i64) -> Self {
        self.predicate = MetadataPredicate::LessThan(bound);
        self
    }
}

/// One matching attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRow {
    pub path: String,
    pub key: String,
    pub value: String,
}
