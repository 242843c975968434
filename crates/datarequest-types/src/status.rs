use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypeError;

/// Lifecycle status of a data request.
///
/// The set is closed; legal moves between statuses are defined by the
/// status graph in `datarequest-engine`. A request without any recorded
/// status is in [`Status::InSubmission`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    InSubmission,
    Draft,
    PendingAttachments,
    DaoSubmitted,
    Submitted,

    PreliminaryAccept,
    PreliminaryReject,
    PreliminaryResubmit,

    DatamanagerAccept,
    DatamanagerReject,
    DatamanagerResubmit,

    UnderReview,
    RejectedAfterDatamanagerReview,
    ResubmitAfterDatamanagerReview,

    Reviewed,

    Approved,
    Rejected,
    Resubmit,
    Resubmitted,

    PreregistrationSubmitted,
    PreregistrationConfirmed,

    DaoApproved,
    DtaReady,
    DtaSigned,
    DataReady,
}

impl Status {
    /// Every status, in declaration order.
    pub const ALL: [Status; 25] = [
        Status::InSubmission,
        Status::Draft,
        Status::PendingAttachments,
        Status::DaoSubmitted,
        Status::Submitted,
        Status::PreliminaryAccept,
        Status::PreliminaryReject,
        Status::PreliminaryResubmit,
        Status::DatamanagerAccept,
        Status::DatamanagerReject,
        Status::DatamanagerResubmit,
        Status::UnderReview,
        Status::RejectedAfterDatamanagerReview,
        Status::ResubmitAfterDatamanagerReview,
        Status::Reviewed,
        Status::Approved,
        Status::Rejected,
        Status::Resubmit,
        Status::Resubmitted,
        Status::PreregistrationSubmitted,
        Status::PreregistrationConfirmed,
        Status::DaoApproved,
        Status::DtaReady,
        Status::DtaSigned,
        Status::DataReady,
    ];

    /// Statuses produced by a data manager's review.
    pub const DATAMANAGER_REVIEWED: [Status; 3] = [
        Status::DatamanagerAccept,
        Status::DatamanagerReject,
        Status::DatamanagerResubmit,
    ];

    /// Statuses from which the researcher may submit a new version.
    pub const AWAITING_RESUBMISSION: [Status; 3] = [
        Status::PreliminaryResubmit,
        Status::ResubmitAfterDatamanagerReview,
        Status::Resubmit,
    ];

    /// Statuses in which feedback for the researcher exists.
    pub const WITH_FEEDBACK: [Status; 6] = [
        Status::PreliminaryReject,
        Status::PreliminaryResubmit,
        Status::RejectedAfterDatamanagerReview,
        Status::ResubmitAfterDatamanagerReview,
        Status::Rejected,
        Status::Resubmit,
    ];

    /// Canonical upper-case name, as stored in the metadata index.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::InSubmission => "IN_SUBMISSION",
            Status::Draft => "DRAFT",
            Status::PendingAttachments => "PENDING_ATTACHMENTS",
            Status::DaoSubmitted => "DAO_SUBMITTED",
            Status::Submitted => "SUBMITTED",
            Status::PreliminaryAccept => "PRELIMINARY_ACCEPT",
            Status::PreliminaryReject => "PRELIMINARY_REJECT",
            Status::PreliminaryResubmit => "PRELIMINARY_RESUBMIT",
            Status::DatamanagerAccept => "DATAMANAGER_ACCEPT",
            Status::DatamanagerReject => "DATAMANAGER_REJECT",
            Status::DatamanagerResubmit => "DATAMANAGER_RESUBMIT",
            Status::UnderReview => "UNDER_REVIEW",
            Status::RejectedAfterDatamanagerReview => "REJECTED_AFTER_DATAMANAGER_REVIEW",
            Status::ResubmitAfterDatamanagerReview => "RESUBMIT_AFTER_DATAMANAGER_REVIEW",
            Status::Reviewed => "REVIEWED",
            Status::Approved => "APPROVED",
            Status::Rejected => "REJECTED",
            Status::Resubmit => "RESUBMIT",
            Status::Resubmitted => "RESUBMITTED",
            Status::PreregistrationSubmitted => "PREREGISTRATION_SUBMITTED",
            Status::PreregistrationConfirmed => "PREREGISTRATION_CONFIRMED",
            Status::DaoApproved => "DAO_APPROVED",
            Status::DtaReady => "DTA_READY",
            Status::DtaSigned => "DTA_SIGNED",
            Status::DataReady => "DATA_READY",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| TypeError::InvalidStatus(s.to_string()))
    }
}
