//! core::records
//!
//! Commit records: what the orchestrator knows about each change set.
//!
//! A [`CommitRecord`] starts pending while a commit is being assembled and
//! becomes committed once the repository reports the new revision. Only
//! committed records can be stored, and a stored record is never rewritten.
//!
//! Records are keyed by revision and [`RecordKind`]: a file commit and a
//! data snapshot taken afterwards at the same revision get one record each.
//!
//! # Example
//!
//! ```
//! use revkeep::core::records::{CommitRecord, CommitStatus};
//! use revkeep::core::types::{BranchName, Oid};
//!
//! let pending = CommitRecord::pending(
//!     Some(BranchName::new("main").unwrap()),
//!     "fix typo",
//!     vec!["a.txt".into(), "b.txt".into()],
//! );
//! assert_eq!(pending.status, CommitStatus::Pending);
//!
//! let done = pending.committed(Oid::new("a".repeat(40)).unwrap());
//! assert_eq!(done.files_changed(), 2);
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::paths::RevkeepPaths;
use crate::core::types::{BranchName, Oid, SnapshotId, UtcTimestamp};

/// Errors from record storage.
#[derive(Debug, Error)]
pub enum RecordError {
    /// Tried to store a record that has no revision yet.
    #[error("commit record is still pending")]
    NotCommitted,

    /// Records are immutable once stored.
    #[error("a record for revision {revision} already exists")]
    AlreadyExists { revision: String },

    #[error("record io error at '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed record '{path}': {message}")]
    Malformed { path: PathBuf, message: String },
}

/// What a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// A commit of working-tree files.
    Files,
    /// A data snapshot paired with an existing revision.
    Data,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Files => "files",
            RecordKind::Data => "data",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStatus {
    Pending,
    Committed,
}

/// One change set as the orchestrator saw it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Set when the record is committed.
    pub revision: Option<Oid>,
    /// Branch at the time of the commit (`None` when detached).
    pub branch: Option<BranchName>,
    pub message: String,
    /// Changed paths, in the order they were staged.
    pub files: Vec<String>,
    /// Data snapshot paired with this revision.
    pub snapshot_id: Option<SnapshotId>,
    pub status: CommitStatus,
    pub created_at: UtcTimestamp,
}

impl CommitRecord {
    pub fn pending(branch: Option<BranchName>, message: impl Into<String>, files: Vec<String>) -> Self {
        Self {
            revision: None,
            branch,
            message: message.into(),
            files,
            snapshot_id: None,
            status: CommitStatus::Pending,
            created_at: UtcTimestamp::now(),
        }
    }

    /// Pair this record with a snapshot taken before (or with) the commit.
    pub fn with_snapshot(mut self, id: SnapshotId) -> Self {
        self.snapshot_id = Some(id);
        self
    }

    /// Seal the record with the revision the repository produced.
    pub fn committed(mut self, revision: Oid) -> Self {
        self.revision = Some(revision);
        self.status = CommitStatus::Committed;
        self
    }

    pub fn files_changed(&self) -> usize {
        self.files.len()
    }

    pub fn kind(&self) -> RecordKind {
        if self.files.is_empty() && self.snapshot_id.is_some() {
            RecordKind::Data
        } else {
            RecordKind::Files
        }
    }

    /// Revision of a committed record.
    fn sealed_revision(&self) -> Result<&Oid, RecordError> {
        match (&self.revision, self.status) {
            (Some(rev), CommitStatus::Committed) => Ok(rev),
            _ => Err(RecordError::NotCommitted),
        }
    }
}

/// Key/value sink for commit records, keyed by revision and kind.
pub trait RecordStore {
    /// Store a committed record. Refuses pending records and overwrites.
    fn put(&self, record: &CommitRecord) -> Result<(), RecordError>;

    fn get(&self, revision: &Oid, kind: RecordKind) -> Result<Option<CommitRecord>, RecordError>;

    /// Every record for `revision`, file commits first.
    fn for_revision(&self, revision: &Oid) -> Result<Vec<CommitRecord>, RecordError> {
        let mut records = Vec::new();
        for kind in [RecordKind::Files, RecordKind::Data] {
            records.extend(self.get(revision, kind)?);
        }
        Ok(records)
    }
}

/// One JSON file per record: `.git/revkeep/records/<revision>.<kind>.json`.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    paths: RevkeepPaths,
}

impl FileRecordStore {
    pub fn new(paths: RevkeepPaths) -> Self {
        Self { paths }
    }
}

impl RecordStore for FileRecordStore {
    fn put(&self, record: &CommitRecord) -> Result<(), RecordError> {
        let revision = record.sealed_revision()?;
        let path = self.paths.record_path(revision, record.kind());
        if path.exists() {
            return Err(RecordError::AlreadyExists {
                revision: revision.to_string(),
            });
        }

        let dir = self.paths.records_dir();
        fs::create_dir_all(&dir).map_err(|source| RecordError::Io { path: dir, source })?;

        let json = serde_json::to_string_pretty(record).map_err(|e| RecordError::Malformed {
            path: path.clone(),
            message: e.to_string(),
        })?;

        let temp = path.with_extension("json.tmp");
        fs::write(&temp, json).map_err(|source| RecordError::Io {
            path: temp.clone(),
            source,
        })?;
        fs::rename(&temp, &path).map_err(|source| RecordError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(revision = %revision, files = record.files_changed(), "commit record stored");
        Ok(())
    }

    fn get(&self, revision: &Oid, kind: RecordKind) -> Result<Option<CommitRecord>, RecordError> {
        let path = self.paths.record_path(revision, kind);
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path).map_err(|source| RecordError::Io {
            path: path.clone(),
            source,
        })?;
        let record = serde_json::from_str(&contents).map_err(|e| RecordError::Malformed {
            path,
            message: e.to_string(),
        })?;
        Ok(Some(record))
    }
}

/// In-memory record store. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    records: Arc<Mutex<BTreeMap<(Oid, RecordKind), CommitRecord>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for MemoryRecordStore {
    fn put(&self, record: &CommitRecord) -> Result<(), RecordError> {
        let key = (record.sealed_revision()?.clone(), record.kind());
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&key) {
            return Err(RecordError::AlreadyExists {
                revision: key.0.to_string(),
            });
        }
        records.insert(key, record.clone());
        Ok(())
    }

    fn get(&self, revision: &Oid, kind: RecordKind) -> Result<Option<CommitRecord>, RecordError> {
        let key = (revision.clone(), kind);
        Ok(self.records.lock().unwrap().get(&key).cloned())
    }
}
