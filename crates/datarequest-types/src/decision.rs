//! Decision values carried in stage payloads.
//!
//! Each reviewing stage accepts exactly three decision strings. Anything
//! else is an [`TypeError::InvalidDecision`].

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::TypeError;

const REJECTED: &str = "Rejected";
const REJECTED_RESUBMIT: &str = "Rejected (resubmit)";

fn invalid(stage: &'static str, value: &str) -> TypeError {
    TypeError::InvalidDecision {
        stage,
        value: value.to_string(),
    }
}

/// Project manager's first look at a submitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreliminaryDecision {
    Accept,
    Reject,
    Resubmit,
}

impl PreliminaryDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreliminaryDecision::Accept => "Accepted for data manager review",
            PreliminaryDecision::Reject => REJECTED,
            PreliminaryDecision::Resubmit => REJECTED_RESUBMIT,
        }
    }

    pub fn requires_feedback(&self) -> bool {
        !matches!(self, PreliminaryDecision::Accept)
    }
}

impl FromStr for PreliminaryDecision {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Accepted for data manager review" => Ok(PreliminaryDecision::Accept),
            REJECTED => Ok(PreliminaryDecision::Reject),
            REJECTED_RESUBMIT => Ok(PreliminaryDecision::Resubmit),
            other => Err(invalid("preliminary_review", other)),
        }
    }
}

/// Data manager's verdict after the preliminary review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatamanagerDecision {
    Accept,
    Reject,
    Resubmit,
}

impl DatamanagerDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatamanagerDecision::Accept => "Accepted",
            DatamanagerDecision::Reject => REJECTED,
            DatamanagerDecision::Resubmit => REJECTED_RESUBMIT,
        }
    }
}

impl FromStr for DatamanagerDecision {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Accepted" => Ok(DatamanagerDecision::Accept),
            REJECTED => Ok(DatamanagerDecision::Reject),
            REJECTED_RESUBMIT => Ok(DatamanagerDecision::Resubmit),
            other => Err(invalid("datamanager_review", other)),
        }
    }
}

/// Project manager's decision whether to send the request to the committee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentDecision {
    AcceptForReview,
    Reject,
    Resubmit,
}

impl AssignmentDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentDecision::AcceptForReview => "Accepted for review",
            AssignmentDecision::Reject => REJECTED,
            AssignmentDecision::Resubmit => REJECTED_RESUBMIT,
        }
    }

    pub fn requires_feedback(&self) -> bool {
        !matches!(self, AssignmentDecision::AcceptForReview)
    }
}

impl FromStr for AssignmentDecision {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Accepted for review" => Ok(AssignmentDecision::AcceptForReview),
            REJECTED => Ok(AssignmentDecision::Reject),
            REJECTED_RESUBMIT => Ok(AssignmentDecision::Resubmit),
            other => Err(invalid("assignment", other)),
        }
    }
}

/// Final evaluation after committee review (or directly for DAO requests).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaluationDecision {
    Approve,
    Reject,
    Resubmit,
}

impl EvaluationDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationDecision::Approve => "Approved",
            EvaluationDecision::Reject => REJECTED,
            EvaluationDecision::Resubmit => REJECTED_RESUBMIT,
        }
    }

    pub fn requires_feedback(&self) -> bool {
        !matches!(self, EvaluationDecision::Approve)
    }
}

impl FromStr for EvaluationDecision {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Approved" => Ok(EvaluationDecision::Approve),
            REJECTED => Ok(EvaluationDecision::Reject),
            REJECTED_RESUBMIT => Ok(EvaluationDecision::Resubmit),
            other => Err(invalid("evaluation", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_specific_accept_strings() {
        assert_eq!(
            "Accepted for data manager review".parse::<PreliminaryDecision>(),
            Ok(PreliminaryDecision::Accept)
        );
        assert_eq!("Accepted".parse::<DatamanagerDecision>(), Ok(DatamanagerDecision::Accept));
        assert_eq!(
            "Accepted for review".parse::<AssignmentDecision>(),
            Ok(AssignmentDecision::AcceptForReview)
        );
        assert_eq!("Approved".parse::<EvaluationDecision>(), Ok(EvaluationDecision::Approve));
    }

    #[test]
    fn accept_strings_do_not_cross_stages() {
        assert!("Accepted".parse::<PreliminaryDecision>().is_err());
        assert!("Approved".parse::<AssignmentDecision>().is_err());
        assert_eq!(
            "Accepted for review".parse::<EvaluationDecision>(),
            Err(TypeError::InvalidDecision {
                stage: "evaluation",
                value: "Accepted for review".into()
            })
        );
    }

    #[test]
    fn shared_reject_strings() {
        assert_eq!("Rejected (resubmit)".parse::<EvaluationDecision>(), Ok(EvaluationDecision::Resubmit));
        assert_eq!("Rejected".parse::<DatamanagerDecision>(), Ok(DatamanagerDecision::Reject));
        assert!(EvaluationDecision::Reject.requires_feedback());
        assert!(!PreliminaryDecision::Accept.requires_feedback());
    }
}
