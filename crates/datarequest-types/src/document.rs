use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage documents a request accumulates along the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Datarequest,
    PreliminaryReview,
    DatamanagerReview,
    Assignment,
    Review,
    Evaluation,
    Preregistration,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 7] = [
        DocumentKind::Datarequest,
        DocumentKind::PreliminaryReview,
        DocumentKind::DatamanagerReview,
        DocumentKind::Assignment,
        DocumentKind::Review,
        DocumentKind::Evaluation,
        DocumentKind::Preregistration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Datarequest => "datarequest",
            DocumentKind::PreliminaryReview => "preliminary_review",
            DocumentKind::DatamanagerReview => "datamanager_review",
            DocumentKind::Assignment => "assignment",
            DocumentKind::Review => "review",
            DocumentKind::Evaluation => "evaluation",
            DocumentKind::Preregistration => "preregistration",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
