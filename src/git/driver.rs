//! git::driver
//!
//! The repository driver contract.
//!
//! The orchestrator never talks to git directly; it sequences calls on a
//! [`RepositoryDriver`]. [`crate::git::Git`] is the production driver and
//! [`crate::git::mock::MockRepository`] is the in-memory one used by tests.
//!
//! # Error Handling
//!
//! Failures are normalized into [`DriverError`] variants so higher layers can
//! tell a missing revision from a merge conflict from a network failure:
//! - [`DriverError::RevisionNotFound`]: reset/resolve target does not exist
//! - [`DriverError::RefNotFound`]: branch does not exist
//! - [`DriverError::MergeConflict`]: merge or pull stopped on conflicts
//! - [`DriverError::Remote`]: fetch, pull, or push could not reach the remote

use serde::Serialize;
use thiserror::Error;

use crate::core::types::{BranchName, Oid, TypeError};

/// Errors from repository driver operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DriverError {
    /// Not inside a repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: String,
    },

    /// Branch or ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// Revision expression could not be resolved.
    #[error("revision not found: {revision}")]
    RevisionNotFound {
        /// The revision expression as given
        revision: String,
    },

    /// Merge or pull stopped on conflicts. The driver aborts the merge
    /// before returning, so the tree is back at its pre-merge state.
    #[error("merge of {branch} has conflicts in: {}", files.join(", "))]
    MergeConflict {
        /// Branch being merged
        branch: String,
        /// Conflicted paths
        files: Vec<String>,
    },

    /// Remote operation failed.
    #[error("{operation} failed: {message}")]
    Remote {
        /// fetch, pull, or push
        operation: String,
        /// Error output from the remote side
        message: String,
    },

    /// A git command exited unsuccessfully.
    #[error("`{command}` failed: {stderr}")]
    CommandFailed {
        /// The command line that was run
        command: String,
        /// Captured stderr
        stderr: String,
    },

    /// The git binary could not be started.
    #[error("failed to run `{command}`: {message}")]
    Spawn {
        /// The command line that was attempted
        command: String,
        /// OS error text
        message: String,
    },

    /// Working tree still has changes after an operation that must leave it clean.
    #[error("working tree is dirty after {operation}")]
    DirtyAfter {
        /// The operation that finished dirty
        operation: String,
    },

    /// Command output could not be parsed.
    #[error("unexpected output from `{command}`: {message}")]
    InvalidOutput {
        /// The command that produced it
        command: String,
        /// What was wrong
        message: String,
    },

    /// A value read from git failed validation.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

/// How far a reset reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetMode {
    /// Move the branch pointer only; differences stay staged.
    Soft,
    /// Move the pointer and the index; the working tree is untouched.
    Mixed,
    /// Move the pointer, index, and working tree.
    Hard,
}

impl ResetMode {
    /// The `git reset` flag for this mode.
    pub fn as_flag(&self) -> &'static str {
        match self {
            ResetMode::Soft => "--soft",
            ResetMode::Mixed => "--mixed",
            ResetMode::Hard => "--hard",
        }
    }
}

/// Summary of working tree status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorktreeStatus {
    /// Number of staged changes
    pub staged: usize,
    /// Number of unstaged changes to tracked files
    pub unstaged: usize,
    /// Number of untracked files
    pub untracked: usize,
    /// Whether there are unresolved conflicts
    pub has_conflicts: bool,
}

impl WorktreeStatus {
    /// No staged or unstaged changes to tracked files and no conflicts.
    pub fn is_clean(&self) -> bool {
        self.staged == 0 && self.unstaged == 0 && !self.has_conflicts
    }

    /// Clean and no untracked files either.
    pub fn is_pristine(&self) -> bool {
        self.is_clean() && self.untracked == 0
    }
}

/// Read-mostly view of where the repository stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryState {
    /// Current branch, `None` when detached or unborn
    pub branch: Option<BranchName>,
    /// Current revision, `None` when unborn
    pub revision: Option<Oid>,
    /// Configured remote name
    pub remote: String,
    /// Untracked or uncommitted changes present
    pub dirty: bool,
}

/// One line of `git log --pretty=oneline`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    /// Commit id
    pub oid: Oid,
    /// First line of the message
    pub summary: String,
}

impl CommitSummary {
    /// Parse `--pretty=oneline` output. Blank lines are skipped.
    ///
    /// # Example
    ///
    /// ```
    /// use revkeep::git::CommitSummary;
    ///
    /// let out = "1111111111111111111111111111111111111111 Add posts\n\n";
    /// let commits = CommitSummary::parse_oneline(out).unwrap();
    /// assert_eq!(commits.len(), 1);
    /// assert_eq!(commits[0].summary, "Add posts");
    /// ```
    pub fn parse_oneline(output: &str) -> Result<Vec<Self>, DriverError> {
        output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                let (oid, summary) = line.split_once(' ').unwrap_or((line, ""));
                Ok(CommitSummary {
                    oid: Oid::new(oid).map_err(|e| DriverError::InvalidOutput {
                        command: "git log --pretty=oneline".to_string(),
                        message: e.to_string(),
                    })?,
                    summary: summary.to_string(),
                })
            })
            .collect()
    }
}

/// Operations the orchestrator needs from version control.
///
/// All calls block until the underlying tool finishes. Implementations must
/// not retry or roll back on their own; the orchestrator owns sequencing.
pub trait RepositoryDriver {
    /// Whether the working directory is inside a repository.
    fn is_repo(&self) -> bool;

    /// Create a repository in the working directory.
    fn init(&self) -> Result<(), DriverError>;

    /// Name of the remote used by fetch, pull, and push.
    fn remote(&self) -> &str;

    /// Current branch, `None` when HEAD is detached or unborn.
    fn current_branch(&self) -> Result<Option<BranchName>, DriverError>;

    /// Revision HEAD points at.
    fn current_revision(&self) -> Result<Oid, DriverError>;

    /// Resolve a revision expression (abbreviated id, branch, `HEAD~2`).
    fn resolve(&self, revision: &str) -> Result<Oid, DriverError>;

    /// Status counts for the working tree.
    fn worktree_status(&self) -> Result<WorktreeStatus, DriverError>;

    /// `from` followed by its first-parent ancestors, at most `limit` entries.
    fn ancestors(&self, from: &Oid, limit: usize) -> Result<Vec<Oid>, DriverError>;

    /// Switch the working tree to an existing branch.
    fn checkout(&self, branch: &BranchName) -> Result<(), DriverError>;

    /// Reset HEAD to `target`. With `clean_untracked`, untracked files and
    /// directories are removed as well.
    fn reset(&self, mode: ResetMode, target: &str, clean_untracked: bool)
        -> Result<(), DriverError>;

    /// Stage exactly these paths (additions, modifications, and deletions).
    fn stage(&self, paths: &[String]) -> Result<(), DriverError>;

    /// Stage every difference in the working tree.
    fn stage_all(&self) -> Result<(), DriverError>;

    /// Commit the index and return the new revision.
    fn commit(&self, message: &str) -> Result<Oid, DriverError>;

    fn create_branch(&self, name: &BranchName) -> Result<(), DriverError>;

    fn delete_branch(&self, name: &BranchName) -> Result<(), DriverError>;

    /// Merge `branch` into the current branch.
    fn merge(&self, branch: &BranchName) -> Result<(), DriverError>;

    /// Update remote-tracking refs without touching the working tree.
    fn fetch(&self) -> Result<(), DriverError>;

    /// Merge the remote counterpart of the current branch. `incoming` is the
    /// list computed before the pull, used for reporting.
    fn pull(&self, incoming: &[CommitSummary]) -> Result<(), DriverError>;

    /// Push the current branch to the remote.
    fn push(&self) -> Result<(), DriverError>;

    /// Escape hatch for commands without a dedicated method (log queries,
    /// remote ref deletion). Returns stdout.
    fn run(&self, command: &str, args: &[&str]) -> Result<String, DriverError>;

    fn get_config(&self, namespace: &str, key: &str) -> Result<Option<String>, DriverError>;

    fn set_config(&self, namespace: &str, key: &str, value: &str) -> Result<(), DriverError>;

    /// Snapshot of branch, revision, remote, and dirty flag.
    fn state(&self) -> Result<RepositoryState, DriverError> {
        let revision = match self.current_revision() {
            Ok(oid) => Some(oid),
            Err(DriverError::RefNotFound { .. }) => None,
            Err(e) => return Err(e),
        };

        Ok(RepositoryState {
            branch: self.current_branch()?,
            revision,
            remote: self.remote().to_string(),
            dirty: !self.worktree_status()?.is_pristine(),
        })
    }
}
