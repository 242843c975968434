//! Which stage documents a principal may currently read.
//!
//! Two static tables are intersected: the documents that exist for a
//! (kind, status) pair, and the documents the principal's single best role
//! may ever see. Order follows the first table.

use datarequest_types::{DocumentKind, RequestKind, Role, RoleSet, Status};

use DocumentKind::*;

const UP_TO_DATAREQUEST: &[DocumentKind] = &[Datarequest];
const UP_TO_PRELIMINARY: &[DocumentKind] = &[Datarequest, PreliminaryReview];
const UP_TO_DATAMANAGER: &[DocumentKind] = &[Datarequest, PreliminaryReview, DatamanagerReview];
const UP_TO_ASSIGNMENT: &[DocumentKind] =
    &[Datarequest, PreliminaryReview, DatamanagerReview, Assignment];
const UP_TO_REVIEW: &[DocumentKind] =
    &[Datarequest, PreliminaryReview, DatamanagerReview, Assignment, Review];
const UP_TO_EVALUATION: &[DocumentKind] = &[
    Datarequest,
    PreliminaryReview,
    DatamanagerReview,
    Assignment,
    Review,
    Evaluation,
];
const EVERYTHING: &[DocumentKind] = &DocumentKind::ALL;

const DAO_EVALUATED: &[DocumentKind] = &[Datarequest, Evaluation];

/// Documents that exist for a request of `kind` in `status`.
pub fn produced_documents(kind: RequestKind, status: Status) -> &'static [DocumentKind] {
    match kind {
        RequestKind::Draft => &[],
        RequestKind::Regular => match status {
            Status::Submitted | Status::PendingAttachments => UP_TO_DATAREQUEST,
            Status::PreliminaryAccept | Status::PreliminaryReject | Status::PreliminaryResubmit => {
                UP_TO_PRELIMINARY
            }
            Status::DatamanagerAccept | Status::DatamanagerReject | Status::DatamanagerResubmit => {
                UP_TO_DATAMANAGER
            }
            Status::UnderReview
            | Status::RejectedAfterDatamanagerReview
            | Status::ResubmitAfterDatamanagerReview => UP_TO_ASSIGNMENT,
            Status::Reviewed => UP_TO_REVIEW,
            Status::Approved | Status::Rejected | Status::Resubmit | Status::Resubmitted => {
                UP_TO_EVALUATION
            }
            Status::PreregistrationSubmitted
            | Status::PreregistrationConfirmed
            | Status::DtaReady
            | Status::DtaSigned
            | Status::DataReady => EVERYTHING,
            _ => &[],
        },
        RequestKind::Dao => match status {
            Status::DaoSubmitted => UP_TO_DATAREQUEST,
            Status::DaoApproved | Status::DtaReady | Status::DtaSigned | Status::DataReady => {
                DAO_EVALUATED
            }
            _ => &[],
        },
    }
}

/// Documents `role` may ever read.
pub fn allowed_documents(role: Role) -> &'static [DocumentKind] {
    match role {
        Role::Own => &[Datarequest, Preregistration],
        Role::Pm => EVERYTHING,
        Role::Dm => UP_TO_DATAMANAGER,
        Role::Rev => UP_TO_EVALUATION,
        Role::Dac | Role::PenRev => &[],
    }
}

/// The role whose allow-list applies: OWN, then PM, then DM, then REV.
pub fn best_role(roles: &RoleSet) -> Option<Role> {
    [Role::Own, Role::Pm, Role::Dm, Role::Rev]
        .into_iter()
        .find(|role| roles.contains(*role))
}

/// Produced documents the holder of `roles` may read, in workflow order.
pub fn available_documents(kind: RequestKind, status: Status, roles: &RoleSet) -> Vec<DocumentKind> {
    let Some(role) = best_role(roles) else {
        return Vec::new();
    };
    let allowed = allowed_documents(role);
    produced_documents(kind, status)
        .iter()
        .copied()
        .filter(|doc| allowed.contains(doc))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_never_sees_committee_documents() {
        let docs = available_documents(
            RequestKind::Regular,
            Status::UnderReview,
            &RoleSet::from([Role::Own]),
        );
        assert_eq!(docs, vec![Datarequest]);
    }

    #[test]
    fn owner_precedence_hides_pm_documents() {
        // A project manager who also owns the request sees only owner documents.
        let docs = available_documents(
            RequestKind::Regular,
            Status::Reviewed,
            &RoleSet::from([Role::Pm, Role::Own]),
        );
        assert_eq!(docs, vec![Datarequest]);
    }

    #[test]
    fn pm_sees_everything_produced() {
        let docs = available_documents(
            RequestKind::Regular,
            Status::DtaSigned,
            &RoleSet::from([Role::Pm]),
        );
        assert_eq!(docs, DocumentKind::ALL.to_vec());
    }

    #[test]
    fn reviewer_and_data_manager_limits() {
        let rev = available_documents(
            RequestKind::Regular,
            Status::DataReady,
            &RoleSet::from([Role::Dac, Role::Rev]),
        );
        assert!(!rev.contains(&Preregistration));
        assert!(rev.contains(&Evaluation));

        let dm = available_documents(
            RequestKind::Regular,
            Status::Reviewed,
            &RoleSet::from([Role::Dm]),
        );
        assert_eq!(dm, vec![Datarequest, PreliminaryReview, DatamanagerReview]);
    }

    #[test]
    fn dao_and_draft_tables() {
        let pm = RoleSet::from([Role::Pm]);
        assert_eq!(
            available_documents(RequestKind::Dao, Status::DaoApproved, &pm),
            vec![Datarequest, Evaluation]
        );
        assert!(available_documents(RequestKind::Dao, Status::Submitted, &pm).is_empty());
        assert!(available_documents(RequestKind::Draft, Status::Draft, &pm).is_empty());
        assert!(available_documents(RequestKind::Regular, Status::Draft, &pm).is_empty());
    }

    #[test]
    fn committee_membership_alone_shows_nothing() {
        let dac = RoleSet::from([Role::Dac]);
        assert!(available_documents(RequestKind::Regular, Status::Reviewed, &dac).is_empty());
    }
}
