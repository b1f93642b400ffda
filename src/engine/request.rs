//! engine::request
//!
//! Validated requests and the outcomes they produce.
//!
//! A [`Request`] is a closed union: one variant per user intent. Each
//! variant carries already-typed inputs (branch names are [`BranchName`],
//! units are [`UnitId`]), so the orchestrator never parses strings. The
//! one exception is the revert target, which stays a revision expression
//! until the repository resolves it.

use std::str::FromStr;

use serde::Serialize;

use crate::core::naming::normalize_branch_name;
use crate::core::records::CommitRecord;
use crate::core::types::{BranchName, Oid, SnapshotId, TypeError, UnitId};
use crate::git::CommitSummary;

/// Placeholder message some editors submit for an untitled change.
pub const PLACEHOLDER_MESSAGE: &str = "Auto Draft";

/// Whether a commit message is missing or the placeholder.
pub fn is_blank_message(message: &str) -> bool {
    let message = message.trim();
    message.is_empty() || message == PLACEHOLDER_MESSAGE
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub branch: BranchName,
    /// The branch was just created; skip the post-checkout restore.
    pub new_branch: bool,
}

/// What to commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitRequest {
    /// Commit working-tree files.
    ///
    /// With `quick_stage` each entry is a plain path. Otherwise entries are
    /// status-review lines (`"M  a.txt"`) and the path follows the
    /// three-column status prefix.
    Files {
        paths: Vec<String>,
        quick_stage: bool,
        message: String,
    },
    /// Take a full data snapshot and pair it with the current revision.
    Snapshot { message: String },
    /// Nothing selected.
    Empty { message: String },
}

impl CommitRequest {
    /// Pick the commit mode from raw inputs. Paths win over `snapshot`.
    pub fn from_inputs(
        message: impl Into<String>,
        paths: Vec<String>,
        quick_stage: bool,
        snapshot: bool,
    ) -> Self {
        let message = message.into();
        if !paths.is_empty() {
            CommitRequest::Files {
                paths,
                quick_stage,
                message,
            }
        } else if snapshot {
            CommitRequest::Snapshot { message }
        } else {
            CommitRequest::Empty { message }
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CommitRequest::Files { message, .. }
            | CommitRequest::Snapshot { message }
            | CommitRequest::Empty { message } => message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBranchRequest {
    /// Normalized name (whitespace replaced by `-`).
    pub name: BranchName,
    pub checkout: bool,
}

impl CreateBranchRequest {
    pub fn new(raw_name: &str, checkout: bool) -> Result<Self, TypeError> {
        Ok(Self {
            name: normalize_branch_name(raw_name)?,
            checkout,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteBranchRequest {
    pub branch: BranchName,
    /// Also delete the branch on the remote.
    pub delete_remote: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
    pub branch: BranchName,
    /// Restore the data snapshot paired with the merged state.
    pub import_data: bool,
}

/// Which half of the system a revert touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevertScope {
    Files,
    Data,
    Both,
}

impl RevertScope {
    pub fn includes_files(&self) -> bool {
        matches!(self, RevertScope::Files | RevertScope::Both)
    }

    pub fn includes_data(&self) -> bool {
        matches!(self, RevertScope::Data | RevertScope::Both)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RevertScope::Files => "files",
            RevertScope::Data => "data",
            RevertScope::Both => "both",
        }
    }
}

impl std::fmt::Display for RevertScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RevertScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "files" => Ok(RevertScope::Files),
            "data" | "db" => Ok(RevertScope::Data),
            "both" | "all" => Ok(RevertScope::Both),
            other => Err(format!(
                "unknown revert scope '{}', expected files, data or both",
                other
            )),
        }
    }
}

/// How the caller wants the revert result presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Respond {
    /// Send the user somewhere else (the caller decides where).
    #[default]
    Redirect,
    /// Report the outcome in place.
    Inline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertRequest {
    pub branch: BranchName,
    /// Revision expression to revert to.
    pub revision: String,
    pub scope: RevertScope,
    /// Link to the record that triggered the revert, echoed in the audit line.
    pub record_ref: Option<String>,
    pub respond: Respond,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    pub units: Vec<UnitId>,
}

/// One user intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Init,
    Checkout(CheckoutRequest),
    Commit(CommitRequest),
    CreateBranch(CreateBranchRequest),
    DeleteBranch(DeleteBranchRequest),
    Merge(MergeRequest),
    Pull,
    Push,
    Discard,
    Revert(RevertRequest),
    /// File-only revert without the audit and notification step.
    RevertFiles { branch: BranchName, revision: String },
    Import(ImportRequest),
}

impl Request {
    /// Operation name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Request::Init => "init",
            Request::Checkout(_) => "checkout",
            Request::Commit(_) => "commit",
            Request::CreateBranch(_) => "create_branch",
            Request::DeleteBranch(_) => "delete_branch",
            Request::Merge(_) => "merge",
            Request::Pull => "pull",
            Request::Push => "push",
            Request::Discard => "discard",
            Request::Revert(_) => "revert",
            Request::RevertFiles { .. } => "revert_files",
            Request::Import(_) => "import",
        }
    }
}

/// Result of a completed revert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevertOutcome {
    pub branch: BranchName,
    /// The revision reverted to.
    pub target: Oid,
    /// The new commit, when files were reverted.
    pub new_revision: Option<Oid>,
    pub scope: RevertScope,
    /// Snapshot restored, when data was reverted.
    pub restored: Option<SnapshotId>,
    /// Whether auto-push published the revert commit.
    pub pushed: bool,
    pub respond: Respond,
}

/// What an operation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Initialized,
    CheckedOut {
        branch: BranchName,
        restored: Option<SnapshotId>,
    },
    Committed(CommitRecord),
    BranchCreated {
        branch: BranchName,
        checked_out: bool,
    },
    BranchDeleted {
        branch: BranchName,
        remote_deleted: bool,
    },
    /// A policy refused the request. Nothing was changed.
    Refused { reason: String },
    Merged {
        branch: BranchName,
        restored: Option<SnapshotId>,
    },
    Pulled {
        incoming: Vec<CommitSummary>,
        /// Snapshot taken before the pull, if policy asked for one.
        undo_point: Option<SnapshotId>,
    },
    Pushed,
    Discarded,
    Imported { units: Vec<UnitId> },
    Reverted(RevertOutcome),
}

impl Outcome {
    /// One-line human summary.
    pub fn summary(&self) -> String {
        match self {
            Outcome::Initialized => "Initialized a new repository.".to_string(),
            Outcome::CheckedOut { branch, restored } => match restored {
                Some(id) => format!("Checked out {} (restored data from #{}).", branch, short_id(id)),
                None => format!("Checked out {}.", branch),
            },
            Outcome::Committed(record) => match (&record.revision, record.files_changed()) {
                (Some(rev), 0) => format!("Snapshot of data paired with #{}.", rev.short(7)),
                (Some(rev), n) => format!("Committed #{} ({} file(s) changed).", rev.short(7), n),
                (None, _) => "Commit pending.".to_string(),
            },
            Outcome::BranchCreated {
                branch,
                checked_out,
            } => {
                if *checked_out {
                    format!("Created and checked out {}.", branch)
                } else {
                    format!("Created branch {}.", branch)
                }
            }
            Outcome::BranchDeleted {
                branch,
                remote_deleted,
            } => {
                if *remote_deleted {
                    format!("Deleted branch {} locally and on the remote.", branch)
                } else {
                    format!("Deleted branch {}.", branch)
                }
            }
            Outcome::Refused { reason } => format!("Nothing done: {}", reason),
            Outcome::Merged { branch, restored } => match restored {
                Some(id) => format!("Merged {} (imported data from #{}).", branch, short_id(id)),
                None => format!("Merged {}.", branch),
            },
            Outcome::Pulled {
                incoming,
                undo_point,
            } => {
                let mut line = format!("Pulled {} new commit(s).", incoming.len());
                if let Some(id) = undo_point {
                    line.push_str(&format!(" Undo point: #{}.", short_id(id)));
                }
                line
            }
            Outcome::Pushed => "Pushed.".to_string(),
            Outcome::Discarded => "Discarded all uncommitted changes.".to_string(),
            Outcome::Imported { units } => format!("Imported {} data unit(s).", units.len()),
            Outcome::Reverted(revert) => match &revert.new_revision {
                Some(rev) => format!(
                    "Reverted {} to #{} as #{}.",
                    revert.branch,
                    revert.target.short(7),
                    rev.short(7)
                ),
                None => format!(
                    "Reverted {} data to #{}.",
                    revert.branch,
                    revert.target.short(7)
                ),
            },
        }
    }
}

fn short_id(id: &SnapshotId) -> &str {
    let s = id.as_str();
    &s[..s.len().min(7)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_placeholder_messages() {
        assert!(is_blank_message(""));
        assert!(is_blank_message("   \n"));
        assert!(is_blank_message("Auto Draft"));
        assert!(is_blank_message("  Auto Draft "));
        assert!(!is_blank_message("Auto Draft v2"));
        assert!(!is_blank_message("fix typo"));
    }

    #[test]
    fn paths_take_precedence_over_snapshot() {
        let req = CommitRequest::from_inputs("m", vec!["a.txt".into()], true, true);
        assert!(matches!(req, CommitRequest::Files { quick_stage: true, .. }));

        let req = CommitRequest::from_inputs("m", vec![], false, true);
        assert_eq!(req, CommitRequest::Snapshot { message: "m".into() });

        let req = CommitRequest::from_inputs("m", vec![], false, false);
        assert_eq!(req.message(), "m");
        assert!(matches!(req, CommitRequest::Empty { .. }));
    }

    #[test]
    fn create_branch_normalizes_whitespace() {
        let req = CreateBranchRequest::new(" new feature\tbranch ", false).unwrap();
        assert_eq!(req.name.as_str(), "new-feature-branch");
        assert!(CreateBranchRequest::new("   ", false).is_err());
    }

    #[test]
    fn revert_scope_parsing() {
        assert_eq!("files".parse::<RevertScope>().unwrap(), RevertScope::Files);
        assert_eq!("DB".parse::<RevertScope>().unwrap(), RevertScope::Data);
        assert_eq!("both".parse::<RevertScope>().unwrap(), RevertScope::Both);
        assert!("everything".parse::<RevertScope>().is_err());

        assert!(RevertScope::Both.includes_files() && RevertScope::Both.includes_data());
        assert!(!RevertScope::Data.includes_files());
        assert!(!RevertScope::Files.includes_data());
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let json = serde_json::to_value(Outcome::Refused {
            reason: "current branch".into(),
        })
        .unwrap();
        assert_eq!(json["outcome"], "refused");
        assert_eq!(json["reason"], "current branch");
    }

    #[test]
    fn pulled_summary_mentions_undo_point() {
        let id = SnapshotId::sequenced(&Oid::new("d".repeat(40)).unwrap(), 1);
        let outcome = Outcome::Pulled {
            incoming: vec![],
            undo_point: Some(id),
        };
        assert_eq!(outcome.summary(), "Pulled 0 new commit(s). Undo point: #ddddddd.");
    }
}
