use thiserror::Error;

/// Result alias for parsing workflow vocabulary.
pub type TypeResult<T> = Result<T, TypeError>;

/// Errors raised when external strings do not map onto the workflow vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("unknown status: {0}")]
    InvalidStatus(String),

    #[error("request id is not numeric: {0:?}")]
    InvalidRequestId(String),

    #[error("invalid decision {value:?} for stage {stage}")]
    InvalidDecision { stage: &'static str, value: String },

    #[error("unknown role: {0}")]
    InvalidRole(String),
}
