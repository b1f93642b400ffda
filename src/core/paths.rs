//! core::paths
//!
//! Centralized path routing for revkeep storage.
//!
//! # Storage Layout
//!
//! Everything revkeep writes lives under `<git_dir>/revkeep/`, which keeps
//! it out of the working tree so bookkeeping never makes the tree dirty:
//!
//! - `config.toml` - Repository configuration
//! - `records/<revision>.<kind>.json` - Commit records (`files` or `data`)
//! - `snapshots/<snapshot-id>/` - Snapshot unit copies plus `manifest.json`
//! - `data/` - Default location of the managed data store
//! - `audit.jsonl` - Append-only audit trail
//!
//! # Example
//!
//! ```
//! use revkeep::core::paths::RevkeepPaths;
//! use std::path::PathBuf;
//!
//! let paths = RevkeepPaths::new(PathBuf::from("/repo/.git"));
//! assert_eq!(
//!     paths.repo_config_path(),
//!     PathBuf::from("/repo/.git/revkeep/config.toml")
//! );
//! ```

use std::path::{Path, PathBuf};

use crate::core::records::RecordKind;
use crate::core::types::{Oid, SnapshotId};

/// Path routing for one repository.
///
/// No code outside this module should compute `*.join("revkeep")` paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevkeepPaths {
    git_dir: PathBuf,
}

impl RevkeepPaths {
    pub fn new(git_dir: PathBuf) -> Self {
        Self { git_dir }
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// `<git_dir>/revkeep`
    pub fn root(&self) -> PathBuf {
        self.git_dir.join("revkeep")
    }

    pub fn repo_config_path(&self) -> PathBuf {
        self.root().join("config.toml")
    }

    pub fn records_dir(&self) -> PathBuf {
        self.root().join("records")
    }

    pub fn record_path(&self, revision: &Oid, kind: RecordKind) -> PathBuf {
        self.records_dir()
            .join(format!("{}.{}.json", revision, kind.as_str()))
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.root().join("snapshots")
    }

    pub fn snapshot_dir(&self, id: &SnapshotId) -> PathBuf {
        self.snapshots_dir().join(id.as_str())
    }

    /// Data store location used when the config does not name one.
    pub fn default_data_dir(&self) -> PathBuf {
        self.root().join("data")
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.root().join("audit.jsonl")
    }

    /// Create the revkeep directory structure.
    ///
    /// # Errors
    ///
    /// Returns an IO error if directory creation fails.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.records_dir())?;
        std::fs::create_dir_all(self.snapshots_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> RevkeepPaths {
        RevkeepPaths::new(PathBuf::from("/repo/.git"))
    }

    #[test]
    fn everything_lives_under_git_dir() {
        let p = paths();
        for path in [
            p.repo_config_path(),
            p.records_dir(),
            p.snapshots_dir(),
            p.default_data_dir(),
            p.audit_log_path(),
        ] {
            assert!(path.starts_with("/repo/.git/revkeep"), "{}", path.display());
        }
    }

    #[test]
    fn record_and_snapshot_paths_are_keyed_by_revision() {
        let oid = Oid::new("ab".repeat(20)).unwrap();
        let p = paths();
        assert_eq!(
            p.record_path(&oid, RecordKind::Data),
            PathBuf::from(format!("/repo/.git/revkeep/records/{}.data.json", oid))
        );
        assert_eq!(
            p.snapshot_dir(&SnapshotId::sequenced(&oid, 3)),
            PathBuf::from(format!("/repo/.git/revkeep/snapshots/{}-0003", oid))
        );
    }

    #[test]
    fn ensure_dirs_creates_layout() {
        let temp = tempfile::TempDir::new().unwrap();
        let p = RevkeepPaths::new(temp.path().to_path_buf());
        p.ensure_dirs().unwrap();
        assert!(p.records_dir().is_dir());
        assert!(p.snapshots_dir().is_dir());
    }
}
