//! engine
//!
//! Orchestrates every user intent across the repository and the data store.
//!
//! # Architecture
//!
//! A validated [`Request`] goes to [`Orchestrator::handle`], which runs
//! exactly one operation. Each operation calls the drivers synchronously in
//! a fixed order, consults policy, fires lifecycle events, and returns an
//! [`Outcome`].
//!
//! ```text
//! Request -> handle -> [policy] -> Pre* event -> driver calls -> audit -> Post* event
//! ```
//!
//! # Invariants
//!
//! - Validation errors are raised before the first mutation
//! - `Pre*` events precede the first mutation; `Post*` events fire only on success
//! - After checkout, merge, and revert the tracked tree is clean or the
//!   operation fails with [`DriverError::DirtyAfter`]
//! - Completed steps are never rolled back; a failure mid-sequence leaves
//!   the repository where the last successful step put it
//! - Audit and notification failures are logged, never returned
//!
//! # Example
//!
//! ```
//! use revkeep::audit::MemoryNotifier;
//! use revkeep::core::records::MemoryRecordStore;
//! use revkeep::engine::{EventBus, Orchestrator, Outcome, Request};
//! use revkeep::git::mock::MockRepository;
//! use revkeep::snapshot::mock::MockSnapshotStore;
//!
//! let repo = MockRepository::new();
//! repo.commit_files(&[("index.php", "<?php")], "initial");
//! let snapshots = MockSnapshotStore::new();
//! let records = MemoryRecordStore::new();
//! let audit = MemoryNotifier::new();
//! let events = EventBus::new();
//!
//! let engine = Orchestrator::new(&repo, &snapshots, &records, &audit, &events);
//! let outcome = engine.handle(Request::Discard).unwrap();
//! assert_eq!(outcome, Outcome::Discarded);
//! ```
//!
//! [`DriverError::DirtyAfter`]: crate::git::DriverError::DirtyAfter

mod branch;
mod checkout;
mod commit;
mod discard;
pub mod events;
mod merge;
pub mod orchestrator;
pub mod request;
mod revert;
mod setup;
mod sync;
#[cfg(test)]
mod testing;

pub use events::{Event, EventBus};
pub use orchestrator::Orchestrator;
pub use request::{
    CheckoutRequest, CommitRequest, CreateBranchRequest, DeleteBranchRequest, ImportRequest,
    MergeRequest, Outcome, Request, Respond, RevertOutcome, RevertRequest, RevertScope,
};

use thiserror::Error;

use crate::core::records::RecordError;
use crate::core::types::{BranchName, TypeError};
use crate::git::DriverError;
use crate::snapshot::SnapshotError;

/// Errors from orchestrator operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request is malformed. Nothing was changed.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The request selects nothing. Nothing was changed.
    #[error("nothing to do: {0}")]
    NothingToDo(String),

    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Branch creation failed; carries the normalized name for display.
    #[error("could not create branch '{branch}': {source}")]
    BranchCreate {
        branch: BranchName,
        #[source]
        source: DriverError,
    },

    #[error("snapshot store: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("record store: {0}")]
    Record(#[from] RecordError),
}

impl From<TypeError> for EngineError {
    fn from(err: TypeError) -> Self {
        EngineError::Validation(err.to_string())
    }
}

/// Coarse error classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NothingToDo,
    /// Any repository, snapshot, or record store failure.
    Driver,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation(_) => ErrorKind::Validation,
            EngineError::NothingToDo(_) => ErrorKind::NothingToDo,
            EngineError::Driver(_)
            | EngineError::BranchCreate { .. }
            | EngineError::Snapshot(_)
            | EngineError::Record(_) => ErrorKind::Driver,
        }
    }

    /// The driver error underneath, if any.
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            EngineError::Driver(err) | EngineError::BranchCreate { source: err, .. } => Some(err),
            _ => None,
        }
    }
}
