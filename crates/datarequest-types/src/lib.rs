//! Core vocabulary of the data-request workflow.
//!
//! Everything here is plain data: request identifiers, the closed set of
//! workflow statuses, roles, document kinds and the per-stage decision
//! values. Behaviour that needs storage or a directory lives in
//! `datarequest-engine`.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod decision;
mod document;
mod error;
mod ids;
mod kind;
mod role;
mod status;

pub use decision::{AssignmentDecision, DatamanagerDecision, EvaluationDecision, PreliminaryDecision};
pub use document::DocumentKind;
pub use error::{TypeError, TypeResult};
pub use ids::{Principal, RequestId};
pub use kind::RequestKind;
pub use role::{Role, RoleSet};
pub use status::Status;
