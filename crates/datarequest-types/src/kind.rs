use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a request, derived from its submitted payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestKind {
    /// Saved but not yet submitted.
    Draft,
    /// Full review path.
    Regular,
    /// Data assessment only; skips committee review.
    Dao,
}

impl RequestKind {
    /// Derive the kind from the draft flag and the stated purpose.
    ///
    /// The draft flag wins over the purpose.
    pub fn derive(draft: bool, purpose: Option<&str>, dao_purpose: &str) -> Self {
        if draft {
            RequestKind::Draft
        } else if purpose == Some(dao_purpose) {
            RequestKind::Dao
        } else {
            RequestKind::Regular
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Draft => "DRAFT",
            RequestKind::Regular => "REGULAR",
            RequestKind::Dao => "DAO",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAO: &str = "Analyses for data assessment only (results will not be published)";

    #[test]
    fn draft_flag_takes_precedence() {
        assert_eq!(RequestKind::derive(true, Some(DAO), DAO), RequestKind::Draft);
        assert_eq!(RequestKind::derive(false, Some(DAO), DAO), RequestKind::Dao);
        assert_eq!(RequestKind::derive(false, Some("Publication"), DAO), RequestKind::Regular);
        assert_eq!(RequestKind::derive(false, None, DAO), RequestKind::Regular);
    }
}
