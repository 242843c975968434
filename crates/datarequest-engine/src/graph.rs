//! The fixed status graph.
//!
//! Status changes only along these edges. The graph is acyclic and has no
//! self-loops; every mutating operation and the expiration sweep check it
//! before committing a status.

use datarequest_types::Status;

use crate::error::{WorkflowError, WorkflowResult};

use Status::*;

const DATAMANAGER_EXITS: &[Status] = &[
    UnderReview,
    RejectedAfterDatamanagerReview,
    ResubmitAfterDatamanagerReview,
];

/// Adjacency list: source status and its legal destinations.
pub const EDGES: &[(Status, &[Status])] = &[
    (InSubmission, &[Draft, PendingAttachments, DaoSubmitted, Submitted]),
    (Draft, &[PendingAttachments, DaoSubmitted, Submitted]),
    (PendingAttachments, &[Submitted]),
    (DaoSubmitted, &[DaoApproved, Rejected, Resubmit]),
    (Submitted, &[PreliminaryAccept, PreliminaryReject, PreliminaryResubmit]),
    (PreliminaryAccept, &[DatamanagerAccept, DatamanagerReject, DatamanagerResubmit]),
    (DatamanagerAccept, DATAMANAGER_EXITS),
    (DatamanagerReject, DATAMANAGER_EXITS),
    (DatamanagerResubmit, DATAMANAGER_EXITS),
    (UnderReview, &[Reviewed]),
    (Reviewed, &[Approved, Rejected, Resubmit]),
    (Resubmit, &[Resubmitted]),
    (PreliminaryResubmit, &[Resubmitted]),
    (ResubmitAfterDatamanagerReview, &[Resubmitted]),
    (Approved, &[PreregistrationSubmitted]),
    (PreregistrationSubmitted, &[PreregistrationConfirmed]),
    (PreregistrationConfirmed, &[DtaReady]),
    (DaoApproved, &[DtaReady]),
    (DtaReady, &[DtaSigned]),
    (DtaSigned, &[DataReady]),
];

/// Legal destinations from `from`; empty for terminal statuses.
pub fn successors(from: Status) -> &'static [Status] {
    EDGES
        .iter()
        .find(|(source, _)| *source == from)
        .map(|(_, destinations)| *destinations)
        .unwrap_or(&[])
}

/// Membership test against the edge table.
pub fn is_legal_transition(from: Status, to: Status) -> bool {
    successors(from).contains(&to)
}

/// String form of [`is_legal_transition`]; unknown names are an error.
pub fn is_legal_transition_str(from: &str, to: &str) -> WorkflowResult<bool> {
    let from: Status = from.parse()?;
    let to: Status = to.parse()?;
    Ok(is_legal_transition(from, to))
}

/// True when no edge leaves `status`.
pub fn is_terminal(status: Status) -> bool {
    successors(status).is_empty()
}

/// Fail with `InvalidStatus` unless `from -> to` is an edge.
pub fn ensure_transition(from: Status, to: Status) -> WorkflowResult<()> {
    if is_legal_transition(from, to) {
        Ok(())
    } else {
        Err(WorkflowError::InvalidStatus(format!(
            "transition {from} -> {to} is not allowed"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn listed_edges() -> HashSet<(Status, Status)> {
        EDGES
            .iter()
            .flat_map(|(from, tos)| tos.iter().map(move |to| (*from, *to)))
            .collect()
    }

    fn any_status() -> impl Strategy<Value = Status> {
        (0..Status::ALL.len()).prop_map(|i| Status::ALL[i])
    }

    proptest! {
        #[test]
        fn legality_matches_edge_table(from in any_status(), to in any_status()) {
            let expected = listed_edges().contains(&(from, to));
            prop_assert_eq!(is_legal_transition(from, to), expected);
            prop_assert_eq!(ensure_transition(from, to).is_ok(), expected);
        }

        #[test]
        fn no_self_loops(status in any_status()) {
            prop_assert!(!is_legal_transition(status, status));
        }
    }

    #[test]
    fn every_source_is_listed_once() {
        let mut seen = HashSet::new();
        for (source, _) in EDGES {
            assert!(seen.insert(*source), "{source} listed twice");
        }
    }

    #[test]
    fn graph_is_acyclic() {
        // Depth-first search with an explicit colouring.
        fn visit(status: Status, on_path: &mut Vec<Status>, done: &mut HashSet<Status>) {
            if done.contains(&status) {
                return;
            }
            assert!(!on_path.contains(&status), "cycle through {status}");
            on_path.push(status);
            for next in successors(status) {
                visit(*next, on_path, done);
            }
            on_path.pop();
            done.insert(status);
        }

        let mut done = HashSet::new();
        for status in Status::ALL {
            visit(status, &mut Vec::new(), &mut done);
        }
    }

    #[test]
    fn terminal_statuses() {
        for status in [
            Resubmitted,
            DataReady,
            PreliminaryReject,
            RejectedAfterDatamanagerReview,
            Rejected,
        ] {
            assert!(is_terminal(status), "{status} should be terminal");
        }
        assert!(!is_terminal(DatamanagerReject));
        assert!(!is_terminal(UnderReview));
    }

    #[test]
    fn string_form_rejects_unknown_names() {
        assert!(is_legal_transition_str("UNDER_REVIEW", "REVIEWED").unwrap());
        assert!(!is_legal_transition_str("REVIEWED", "UNDER_REVIEW").unwrap());
        let err = is_legal_transition_str("UNDER_REVIEW", "DONE").unwrap_err();
        assert_eq!(err.code(), "invalid_status");
    }

    #[test]
    fn merge_points() {
        assert!(is_legal_transition(PreregistrationConfirmed, DtaReady));
        assert!(is_legal_transition(DaoApproved, DtaReady));
        assert!(!is_legal_transition(Approved, DtaReady));
        assert!(is_legal_transition(DaoSubmitted, Rejected));
        assert!(is_legal_transition(Reviewed, Rejected));
    }
}
