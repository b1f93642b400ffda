//! git::interface
//!
//! Production [`RepositoryDriver`] backed by git.
//!
//! Reads (HEAD, status, ancestry, config) go through `git2`. Mutations that
//! touch the working tree or the network (checkout, reset, merge, pull, push)
//! shell out to the `git` binary so hooks, credential helpers, and the
//! user's git configuration behave exactly as they would on the command line.
//!
//! Every subprocess runs with `GIT_TERMINAL_PROMPT=0` and `LC_ALL=C`: a
//! credential prompt would hang the operation, and stderr classification
//! relies on untranslated messages.
//!
//! # Example
//!
//! ```ignore
//! use revkeep::git::{Git, RepositoryDriver};
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."), "origin")?;
//! println!("on {:?} at {}", git.current_branch()?, git.current_revision()?.short(7));
//! ```

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use super::driver::{CommitSummary, DriverError, RepositoryDriver, ResetMode, WorktreeStatus};
use crate::core::types::{BranchName, Oid};

impl DriverError {
    /// Normalize a git2 error, using `context` for the missing-thing name.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound | git2::ErrorCode::UnbornBranch => DriverError::RefNotFound {
                refname: context.to_string(),
            },
            git2::ErrorCode::InvalidSpec | git2::ErrorCode::Ambiguous => {
                DriverError::RevisionNotFound {
                    revision: context.to_string(),
                }
            }
            _ => DriverError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

/// stderr fragments git prints when a revision expression cannot be resolved.
const MISSING_REVISION_MARKERS: &[&str] = &[
    "unknown revision",
    "ambiguous argument",
    "bad revision",
    "Needed a single revision",
    "only has",
    "not a valid object name",
];

/// stderr fragments git prints when a branch does not exist.
const MISSING_REF_MARKERS: &[&str] = &[
    "did not match any file(s) known to git",
    "invalid reference",
    "not found",
];

fn mentions_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| text.contains(m))
}

/// A working tree driven through git.
#[derive(Debug, Clone)]
pub struct Git {
    work_dir: PathBuf,
    remote: String,
}

impl Git {
    /// Create a driver for `work_dir` without checking that a repository
    /// exists there yet. Used before `init`.
    pub fn new(work_dir: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            remote: remote.into(),
        }
    }

    /// Discover the repository containing `path`.
    ///
    /// `path` may be any directory inside the working tree.
    ///
    /// # Errors
    ///
    /// - [`DriverError::NotARepo`] if no repository is found or it is bare
    pub fn open(path: &Path, remote: impl Into<String>) -> Result<Self, DriverError> {
        let not_a_repo = || DriverError::NotARepo {
            path: path.display().to_string(),
        };

        let repo = git2::Repository::discover(path).map_err(|_| not_a_repo())?;
        let work_dir = repo.workdir().ok_or_else(not_a_repo)?.to_path_buf();

        Ok(Self::new(work_dir, remote))
    }

    /// Root of the working tree.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// The `.git` directory.
    pub fn git_dir(&self) -> Result<PathBuf, DriverError> {
        Ok(self.repo()?.path().to_path_buf())
    }

    fn repo(&self) -> Result<git2::Repository, DriverError> {
        git2::Repository::open(&self.work_dir).map_err(|_| DriverError::NotARepo {
            path: self.work_dir.display().to_string(),
        })
    }

    // =========================================================================
    // Subprocess plumbing
    // =========================================================================

    fn command_line(args: &[&str]) -> String {
        format!("git {}", args.join(" "))
    }

    /// Run git and hand back the raw output, failing only if it cannot start.
    fn exec(&self, args: &[&str]) -> Result<Output, DriverError> {
        tracing::debug!(command = %Self::command_line(args), "running git");

        Command::new("git")
            .args(args)
            .current_dir(&self.work_dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C")
            .output()
            .map_err(|e| DriverError::Spawn {
                command: Self::command_line(args),
                message: e.to_string(),
            })
    }

    /// Run git, returning stdout on success and `CommandFailed` otherwise.
    fn git(&self, args: &[&str]) -> Result<String, DriverError> {
        let output = self.exec(args)?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::debug!(command = %Self::command_line(args), %stderr, "git failed");

        Err(DriverError::CommandFailed {
            command: Self::command_line(args),
            stderr,
        })
    }

    /// Run a network command, mapping failure to `DriverError::Remote`.
    fn remote_git(&self, operation: &str, args: &[&str]) -> Result<String, DriverError> {
        self.git(args).map_err(|e| match e {
            DriverError::CommandFailed { stderr, .. } => DriverError::Remote {
                operation: operation.to_string(),
                message: stderr,
            },
            other => other,
        })
    }

    /// Paths with unresolved conflicts in the index.
    fn conflicted_files(&self) -> Result<Vec<String>, DriverError> {
        let out = self.git(&["diff", "--name-only", "--diff-filter=U"])?;
        Ok(out.lines().map(str::to_string).collect())
    }

    /// Run a merging command. On conflict, abort the merge so the tree is
    /// back where it started, then report the conflicted paths.
    fn merging(
        &self,
        branch: &str,
        operation: &str,
        args: &[&str],
    ) -> Result<(), DriverError> {
        let output = self.exec(args)?;
        if output.status.success() {
            return Ok(());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if stdout.contains("CONFLICT") || stderr.contains("CONFLICT") {
            let files = self.conflicted_files()?;
            self.git(&["merge", "--abort"])?;
            tracing::warn!(branch, ?files, "merge stopped on conflicts and was aborted");
            return Err(DriverError::MergeConflict {
                branch: branch.to_string(),
                files,
            });
        }

        if operation == "merge" {
            if mentions_any(&stderr, &["not something we can merge"]) {
                return Err(DriverError::RefNotFound {
                    refname: branch.to_string(),
                });
            }
            return Err(DriverError::CommandFailed {
                command: Self::command_line(args),
                stderr,
            });
        }

        Err(DriverError::Remote {
            operation: operation.to_string(),
            message: stderr,
        })
    }

    fn current_branch_or_detached(&self) -> Result<BranchName, DriverError> {
        self.current_branch()?.ok_or_else(|| DriverError::RefNotFound {
            refname: "HEAD (detached)".to_string(),
        })
    }
}

impl RepositoryDriver for Git {
    fn is_repo(&self) -> bool {
        self.repo().is_ok()
    }

    fn init(&self) -> Result<(), DriverError> {
        std::fs::create_dir_all(&self.work_dir).map_err(|e| DriverError::Internal {
            message: format!("cannot create {}: {}", self.work_dir.display(), e),
        })?;
        self.git(&["init"])?;
        Ok(())
    }

    fn remote(&self) -> &str {
        &self.remote
    }

    fn current_branch(&self) -> Result<Option<BranchName>, DriverError> {
        let repo = self.repo()?;
        let head = match repo.head() {
            Ok(h) => h,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(DriverError::from_git2(e, "HEAD")),
        };

        if head.is_branch() {
            if let Some(name) = head.shorthand() {
                return Ok(Some(BranchName::new(name)?));
            }
        }

        Ok(None)
    }

    fn current_revision(&self) -> Result<Oid, DriverError> {
        let repo = self.repo()?;
        let head = repo.head().map_err(|e| DriverError::from_git2(e, "HEAD"))?;
        let oid = head
            .peel_to_commit()
            .map_err(|e| DriverError::from_git2(e, "HEAD"))?
            .id();

        Ok(Oid::new(oid.to_string())?)
    }

    fn resolve(&self, revision: &str) -> Result<Oid, DriverError> {
        let repo = self.repo()?;
        let missing = || DriverError::RevisionNotFound {
            revision: revision.to_string(),
        };

        let object = repo.revparse_single(revision).map_err(|e| match e.code() {
            git2::ErrorCode::NotFound
            | git2::ErrorCode::InvalidSpec
            | git2::ErrorCode::Ambiguous => missing(),
            _ => DriverError::from_git2(e, revision),
        })?;
        let commit = object.peel_to_commit().map_err(|_| missing())?;

        Ok(Oid::new(commit.id().to_string())?)
    }

    fn worktree_status(&self) -> Result<WorktreeStatus, DriverError> {
        let repo = self.repo()?;
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);

        let statuses = repo
            .statuses(Some(&mut opts))
            .map_err(|e| DriverError::from_git2(e, "status"))?;

        let mut result = WorktreeStatus::default();

        for entry in statuses.iter() {
            let status = entry.status();

            if status.is_conflicted() {
                result.has_conflicts = true;
            }

            if status.is_index_new()
                || status.is_index_modified()
                || status.is_index_deleted()
                || status.is_index_renamed()
                || status.is_index_typechange()
            {
                result.staged += 1;
            }

            if status.is_wt_modified()
                || status.is_wt_deleted()
                || status.is_wt_renamed()
                || status.is_wt_typechange()
            {
                result.unstaged += 1;
            }

            if status.is_wt_new() {
                result.untracked += 1;
            }
        }

        Ok(result)
    }

    fn ancestors(&self, from: &Oid, limit: usize) -> Result<Vec<Oid>, DriverError> {
        let repo = self.repo()?;
        let start = git2::Oid::from_str(from.as_str())
            .map_err(|e| DriverError::from_git2(e, from.as_str()))?;

        let mut walk = repo
            .revwalk()
            .map_err(|e| DriverError::from_git2(e, "revwalk"))?;
        walk.simplify_first_parent()
            .map_err(|e| DriverError::from_git2(e, "revwalk"))?;
        walk.push(start)
            .map_err(|e| DriverError::from_git2(e, from.as_str()))?;

        walk.take(limit)
            .map(|oid| {
                let oid = oid.map_err(|e| DriverError::from_git2(e, from.as_str()))?;
                Ok(Oid::new(oid.to_string())?)
            })
            .collect()
    }

    fn checkout(&self, branch: &BranchName) -> Result<(), DriverError> {
        self.git(&["checkout", branch.as_str()]).map_err(|e| match e {
            DriverError::CommandFailed { ref stderr, .. }
                if mentions_any(stderr, MISSING_REF_MARKERS) =>
            {
                DriverError::RefNotFound {
                    refname: branch.to_string(),
                }
            }
            other => other,
        })?;
        Ok(())
    }

    fn reset(
        &self,
        mode: ResetMode,
        target: &str,
        clean_untracked: bool,
    ) -> Result<(), DriverError> {
        self.git(&["reset", mode.as_flag(), target])
            .map_err(|e| match e {
                DriverError::CommandFailed { ref stderr, .. }
                    if mentions_any(stderr, MISSING_REVISION_MARKERS) =>
                {
                    DriverError::RevisionNotFound {
                        revision: target.to_string(),
                    }
                }
                other => other,
            })?;

        if clean_untracked {
            self.git(&["clean", "-f", "-d"])?;
        }
        Ok(())
    }

    fn stage(&self, paths: &[String]) -> Result<(), DriverError> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec!["add", "-A", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.git(&args)?;
        Ok(())
    }

    fn stage_all(&self) -> Result<(), DriverError> {
        self.git(&["add", "-A"])?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<Oid, DriverError> {
        self.git(&["commit", "-m", message])?;
        self.current_revision()
    }

    fn create_branch(&self, name: &BranchName) -> Result<(), DriverError> {
        self.git(&["branch", name.as_str()])?;
        Ok(())
    }

    fn delete_branch(&self, name: &BranchName) -> Result<(), DriverError> {
        self.git(&["branch", "-D", name.as_str()])
            .map_err(|e| match e {
                DriverError::CommandFailed { ref stderr, .. }
                    if mentions_any(stderr, MISSING_REF_MARKERS) =>
                {
                    DriverError::RefNotFound {
                        refname: name.to_string(),
                    }
                }
                other => other,
            })?;
        Ok(())
    }

    fn merge(&self, branch: &BranchName) -> Result<(), DriverError> {
        self.merging(
            branch.as_str(),
            "merge",
            &["merge", "--no-edit", branch.as_str()],
        )
    }

    fn fetch(&self) -> Result<(), DriverError> {
        self.remote_git("fetch", &["fetch", &self.remote])?;
        Ok(())
    }

    fn pull(&self, incoming: &[CommitSummary]) -> Result<(), DriverError> {
        let branch = self.current_branch_or_detached()?;
        tracing::debug!(branch = %branch, incoming = incoming.len(), "pulling");
        self.merging(
            branch.as_str(),
            "pull",
            &["pull", "--no-edit", &self.remote, branch.as_str()],
        )
    }

    fn push(&self) -> Result<(), DriverError> {
        self.remote_git("push", &["push", &self.remote, "HEAD"])?;
        Ok(())
    }

    fn run(&self, command: &str, args: &[&str]) -> Result<String, DriverError> {
        let mut full = vec![command];
        full.extend_from_slice(args);

        match command {
            "push" | "fetch" | "pull" | "ls-remote" => self.remote_git(command, &full),
            _ => self.git(&full),
        }
    }

    fn get_config(&self, namespace: &str, key: &str) -> Result<Option<String>, DriverError> {
        let name = format!("{}.{}", namespace, key);
        let config = self
            .repo()?
            .config()
            .map_err(|e| DriverError::from_git2(e, "config"))?;

        match config.get_string(&name) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(DriverError::from_git2(e, &name)),
        }
    }

    fn set_config(&self, namespace: &str, key: &str, value: &str) -> Result<(), DriverError> {
        let name = format!("{}.{}", namespace, key);
        let mut config = self
            .repo()?
            .config()
            .and_then(|c| c.open_level(git2::ConfigLevel::Local))
            .map_err(|e| DriverError::from_git2(e, "config"))?;

        config
            .set_str(&name, value)
            .map_err(|e| DriverError::from_git2(e, &name))
    }
}
