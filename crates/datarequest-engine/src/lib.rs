//! Data-request approval workflow.
//!
//! Requests move through a fixed status graph from submission to data
//! delivery. Every mutating operation is serialized per request, checked by
//! the [`PermissionGate`] before anything is written, and recorded in the
//! request's [`ProvenanceLog`] when it commits.
//!
//! ## Components
//!
//! - [`graph`]: the legal status transitions
//! - [`RoleResolver`] and [`PermissionGate`]: who may act, and when
//! - [`ReviewAssignment`]: committee review fan-out and fan-in
//! - [`visibility`]: which documents a role may open at a given status
//! - [`WorkflowOrchestrator`]: one operation per workflow stage
//! - [`ExpirationSweeper`]: forces overdue reviews to completion

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod collaborators;
pub mod config;
pub mod error;
pub mod gate;
pub mod graph;
pub mod locks;
pub mod mocks;
pub mod notify;
pub mod orchestrator;
pub mod provenance;
pub mod records;
pub mod review;
pub mod roles;
pub mod sweeper;
pub mod telemetry;
pub mod visibility;

pub use collaborators::{
    DirectoryError, GroupDirectory, Notifier, SchemaRequest, SchemaValidator, ValidationIssue,
    WorkflowEvent,
};
pub use config::{GroupConfig, LoggingConfig, SchemaConfig, SweeperConfig, WorkflowConfig};
pub use error::{
    AssignmentError, PermissionError, ProvenanceError, WorkflowError, WorkflowResult,
};
pub use gate::{Authorization, PermissionGate};
pub use locks::{RequestGuard, RequestLocks};
pub use mocks::{MockValidator, RecordingNotifier, StaticDirectory};
pub use notify::{Audience, Notifications};
pub use orchestrator::{
    DatarequestView, ReviewOutcome, SubmitOutcome, Submission, TransitionOutcome,
    WorkflowOrchestrator,
};
pub use provenance::ProvenanceLog;
pub use records::RequestRecords;
pub use review::{ReviewAssignment, ReviewProgress};
pub use roles::RoleResolver;
pub use sweeper::{ExpirationSweeper, SweepReport};
