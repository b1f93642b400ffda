//! snapshot
//!
//! Capture and restore of the companion data store.
//!
//! # Model
//!
//! The data store is a set of named units (one file per table or
//! collection). A snapshot copies some or all units. Its [`SnapshotRecord`]
//! names the revision the repository stood at when it was taken, and its
//! id is unique, so snapshots are only ever added, never replaced.
//!
//! The records are what pair data with history. To find "the data that
//! goes with this commit", walk the commit's first-parent ancestry and take
//! the newest snapshot recorded at the first revision that has one
//! ([`SnapshotStore::latest_for`]).
//!
//! # Implementations
//!
//! - [`FileSnapshotStore`]: snapshots on disk under `.git/revkeep/snapshots`
//! - [`mock::MockSnapshotStore`]: in-memory, for tests

mod file_store;
pub mod mock;

pub use file_store::FileSnapshotStore;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{Oid, SnapshotId, TypeError, UnitId, UtcTimestamp};

/// Errors from snapshot operations.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// No snapshot with this id.
    #[error("snapshot not found: {id}")]
    NotFound { id: String },

    /// Snapshots are never overwritten.
    #[error("snapshot {id} already exists")]
    AlreadyExists { id: String },

    /// The unit does not exist where it was expected.
    #[error("data unit not found: {unit}")]
    UnitNotFound { unit: String },

    /// A stored unit no longer matches the digest recorded when it was taken.
    #[error("snapshot {id} is corrupt: {unit} does not match its recorded digest")]
    Corrupt { id: String, unit: String },

    #[error("unreadable snapshot manifest '{path}': {message}")]
    Manifest { path: PathBuf, message: String },

    #[error("snapshot io error at '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failure reported by a store backend that has no richer variant.
    #[error("snapshot store error: {message}")]
    Backend { message: String },

    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Which units a snapshot or restore covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotScope {
    /// Every unit in the store.
    Full,
    /// Only the listed units.
    Units(Vec<UnitId>),
}

impl SnapshotScope {
    pub fn method(&self) -> SnapshotMethod {
        match self {
            SnapshotScope::Full => SnapshotMethod::Full,
            SnapshotScope::Units(_) => SnapshotMethod::Partial,
        }
    }
}

/// How a snapshot was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotMethod {
    Full,
    Partial,
}

/// Metadata for one stored snapshot. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub id: SnapshotId,
    pub created_at: UtcTimestamp,
    pub method: SnapshotMethod,
    /// Revision the snapshot pairs with.
    pub revision: Oid,
    /// Units captured, sorted by name.
    pub units: Vec<UnitId>,
}

/// Capture, restore, and import for the managed data store.
///
/// Calls block until the underlying copy finishes.
pub trait SnapshotStore {
    /// Capture `scope` as a new snapshot recorded at `revision`.
    fn snapshot(&self, scope: &SnapshotScope, revision: &Oid)
        -> Result<SnapshotRecord, SnapshotError>;

    /// Put the units in `scope` back to how snapshot `id` recorded them.
    ///
    /// A full restore also removes live units the snapshot does not contain.
    fn restore(&self, id: &SnapshotId, scope: &SnapshotScope)
        -> Result<SnapshotRecord, SnapshotError>;

    /// Bring units that exist in stored snapshots but not in the live store
    /// into the live store. Returns the units actually imported.
    fn import_untracked(&self, units: &[UnitId]) -> Result<Vec<UnitId>, SnapshotError>;

    /// Look up a snapshot without touching the live store.
    fn find(&self, id: &SnapshotId) -> Result<Option<SnapshotRecord>, SnapshotError>;

    /// All snapshots, newest first.
    fn list(&self) -> Result<Vec<SnapshotRecord>, SnapshotError>;

    /// Units present in some snapshot but missing from the live store.
    fn untracked_units(&self) -> Result<Vec<UnitId>, SnapshotError>;

    /// The newest snapshot recorded at `revision`.
    fn latest_for(&self, revision: &Oid) -> Result<Option<SnapshotRecord>, SnapshotError> {
        Ok(self.list()?.into_iter().find(|s| &s.revision == revision))
    }
}
