//! engine::revert
//!
//! Revert a branch to an earlier revision without discarding history.
//!
//! # Algorithm
//!
//! The file half moves the branch back to revision R, then moves HEAD
//! forward again while keeping R's tree in the index, and commits that
//! tree on top of the old tip:
//!
//! ```text
//! checkout B (if needed)
//! reset --hard HEAD          drop local edits
//! reset --hard R             index and tree become R's
//! reset --soft HEAD@{1}      HEAD back to the old tip, index keeps R's tree
//! add -A; commit             new commit whose tree equals R's
//! ```
//!
//! If the branch already has R's tree, no commit is made and the revert
//! goes straight on to the data half. A files-only revert in that state
//! has nothing to do.
//!
//! The data half restores the snapshot paired with R: the one named by R's
//! data record, or else the newest snapshot taken at R.
//!
//! # Reflog dependency
//!
//! `HEAD@{1}` is the position HEAD had before the `reset --hard R`. If the
//! reflog holds fewer than two entries at that point (reflogs expired or
//! disabled), the soft reset fails with a driver error, no commit is made,
//! and the branch is left at R by the completed hard reset. Nothing is
//! rolled back.

use crate::audit::Category;
use crate::core::policy::PolicyKey;
use crate::core::records::RecordKind;
use crate::core::types::{BranchName, Oid, SnapshotId};
use crate::git::ResetMode;
use crate::snapshot::{SnapshotError, SnapshotScope};

use super::events::Event;
use super::orchestrator::Orchestrator;
use super::request::{Outcome, Respond, RevertOutcome, RevertRequest, RevertScope};
use super::EngineError;

/// Reflog expression for where HEAD was before the last move.
const PREVIOUS_HEAD: &str = "HEAD@{1}";

struct FilesReverted {
    target: Oid,
    /// `None` when the branch already had the target's tree.
    new_revision: Option<Oid>,
    pushed: bool,
}

impl FilesReverted {
    fn committed_or_nothing_to_do(self, branch: &BranchName) -> Result<Self, EngineError> {
        if self.new_revision.is_none() {
            return Err(EngineError::NothingToDo(format!(
                "{} already has the tree of #{}",
                branch,
                self.target.short(7)
            )));
        }
        Ok(self)
    }
}

fn validate_revision(revision: &str) -> Result<&str, EngineError> {
    let revision = revision.trim();
    if revision.is_empty() {
        return Err(EngineError::Validation(
            "a revision to revert to is required".to_string(),
        ));
    }
    Ok(revision)
}

impl Orchestrator<'_> {
    pub fn revert(&self, request: &RevertRequest) -> Result<Outcome, EngineError> {
        let revision = validate_revision(&request.revision)?;
        let scope = request.scope;

        self.fire(Event::PreRevert { scope });

        let (target, new_revision, pushed) = if scope.includes_files() {
            let mut files = self.revert_files_inner(&request.branch, revision)?;
            if !scope.includes_data() {
                files = files.committed_or_nothing_to_do(&request.branch)?;
            }
            (files.target, files.new_revision, files.pushed)
        } else {
            (self.repo.resolve(revision)?, None, false)
        };

        let restored = if scope.includes_data() {
            let id = self.paired_snapshot(&target)?;
            self.snapshots.restore(&id, &SnapshotScope::Full)?;
            Some(id)
        } else {
            None
        };

        let mut message = format!(
            "Reverted {} to commit: [#{}](commit/{}).",
            scope,
            target.short(7),
            target
        );
        if let Some(record_ref) = &request.record_ref {
            message.push_str(&format!(" Requested from {}.", record_ref));
        }
        self.audit(&message, Category::Revert);
        if new_revision.is_some() {
            self.notify_reverted(&target);
        }

        self.fire(Event::PostRevert {
            revision: target.clone(),
            scope,
        });

        Ok(Outcome::Reverted(RevertOutcome {
            branch: request.branch.clone(),
            target,
            new_revision,
            scope,
            restored,
            pushed,
            respond: request.respond,
        }))
    }

    /// The file half of a revert, on its own.
    pub fn revert_files(&self, branch: &BranchName, revision: &str) -> Result<Outcome, EngineError> {
        let revision = validate_revision(revision)?;
        let scope = RevertScope::Files;

        self.fire(Event::PreRevert { scope });
        let files = self
            .revert_files_inner(branch, revision)?
            .committed_or_nothing_to_do(branch)?;

        self.audit(
            &format!(
                "Reverted files to commit: #{}.",
                files.target.short(7)
            ),
            Category::Revert,
        );
        self.notify_reverted(&files.target);
        self.fire(Event::PostRevert {
            revision: files.target.clone(),
            scope,
        });

        Ok(Outcome::Reverted(RevertOutcome {
            branch: branch.clone(),
            target: files.target,
            new_revision: files.new_revision,
            scope,
            restored: None,
            pushed: files.pushed,
            respond: Respond::Inline,
        }))
    }

    /// Commits the target's tree on top of the branch tip. Makes no commit
    /// when the tip already has that tree.
    fn revert_files_inner(
        &self,
        branch: &BranchName,
        revision: &str,
    ) -> Result<FilesReverted, EngineError> {
        if self.repo.current_branch()?.as_ref() != Some(branch) {
            self.repo.checkout(branch)?;
        }

        self.repo.reset(ResetMode::Hard, "HEAD", true)?;
        let tip = self.repo.current_revision()?;

        self.repo.reset(ResetMode::Hard, revision, false)?;
        let target = self.repo.current_revision()?;
        let unchanged = FilesReverted {
            target: target.clone(),
            new_revision: None,
            pushed: false,
        };
        if target == tip {
            tracing::debug!(%target, "branch is already at the target");
            return Ok(unchanged);
        }

        self.repo.reset(ResetMode::Soft, PREVIOUS_HEAD, false)?;
        self.repo.stage_all()?;
        if self.repo.worktree_status()?.staged == 0 {
            tracing::debug!(%target, "tip already has the target's tree");
            return Ok(unchanged);
        }

        let new_revision = self
            .repo
            .commit(&format!("Reverted to commit: #{}.", target.short(7)))?;
        self.ensure_clean("revert")?;
        tracing::debug!(%target, %new_revision, "revert commit created");

        let pushed = if self.policy_enabled(PolicyKey::AutoPush)? {
            self.repo.push()?;
            true
        } else {
            false
        };

        Ok(FilesReverted {
            target,
            new_revision: Some(new_revision),
            pushed,
        })
    }

    /// Sent whenever a revert commit lands, whichever entry point made it.
    fn notify_reverted(&self, target: &Oid) {
        self.notify(
            &format!("{} - Commit Reverted", self.site_name),
            &format!("{} was reverted to commit #{}.", self.site_name, target.short(7)),
        );
    }

    /// The snapshot a data revert to `target` restores.
    fn paired_snapshot(&self, target: &Oid) -> Result<SnapshotId, EngineError> {
        if let Some(id) = self
            .records
            .get(target, RecordKind::Data)?
            .and_then(|record| record.snapshot_id)
        {
            return Ok(id);
        }
        match self.snapshots.latest_for(target)? {
            Some(record) => Ok(record.id),
            None => Err(SnapshotError::NotFound {
                id: format!("at {}", target.short(7)),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::Harness;
    use crate::core::records::{CommitRecord, RecordStore};
    use crate::git::{DriverError, RepositoryDriver};
    use crate::snapshot::SnapshotStore;

    fn main() -> BranchName {
        BranchName::new("main").unwrap()
    }

    fn request(revision: &str, scope: RevertScope) -> RevertRequest {
        RevertRequest {
            branch: main(),
            revision: revision.to_string(),
            scope,
            record_ref: None,
            respond: Respond::Redirect,
        }
    }

    /// Three commits on main: r1 -> r2 -> r3.
    fn history(h: &Harness) -> (Oid, Oid, Oid) {
        let r1 = h.repo.commit_files(&[("a.txt", "one"), ("b.txt", "b")], "first");
        let r2 = h.repo.commit_files(&[("a.txt", "two"), ("c.txt", "c")], "second");
        h.repo.remove_file("b.txt");
        let r3 = h.repo.commit_files(&[("a.txt", "three")], "third");
        (r1, r2, r3)
    }

    #[test]
    fn revert_preserves_history_and_reproduces_tree() {
        let h = Harness::new();
        let (r1, r2, r3) = history(&h);
        let commits_before = h.repo.commit_count();

        let outcome = h
            .engine()
            .revert(&request(r1.as_str(), RevertScope::Files))
            .unwrap();

        let Outcome::Reverted(revert) = outcome else {
            panic!("expected a revert outcome");
        };
        let head = h.repo.current_revision().unwrap();
        assert_eq!(revert.new_revision.as_ref(), Some(&head));
        assert_eq!(revert.target, r1);
        assert_eq!(h.repo.tree_at(&head), h.repo.tree_at(&r1));
        assert_eq!(h.repo.parents_of(&head), vec![r3.clone()]);
        assert!(h.repo.is_ancestor(&r2, &head));
        assert!(h.repo.is_ancestor(&r3, &head));
        assert_eq!(h.repo.commit_count(), commits_before + 1);
        assert_eq!(
            h.repo.message_of(&head).as_deref(),
            Some(format!("Reverted to commit: #{}.", r1.short(7)).as_str())
        );
        assert!(h.repo.worktree_status().unwrap().is_clean());
    }

    #[test]
    fn revert_runs_the_reset_sequence() {
        let h = Harness::new();
        let (r1, _, _) = history(&h);
        h.clear_trace();

        h.engine()
            .revert(&request(r1.as_str(), RevertScope::Files))
            .unwrap();

        let calls = h.calls();
        assert_eq!(
            &calls[..4],
            &[
                "repo: reset --hard HEAD +clean".to_string(),
                format!("repo: reset --hard {}", r1),
                "repo: reset --soft HEAD@{1}".to_string(),
                "repo: stage -A".to_string(),
            ]
        );
        assert!(calls[4].starts_with("repo: commit Reverted to commit: #"));
        assert!(!calls.iter().any(|c| c == "repo: push"));
    }

    #[test]
    fn audit_and_notification() {
        let h = Harness::new();
        let (r1, _, _) = history(&h);
        let mut req = request(r1.as_str(), RevertScope::Files);
        req.record_ref = Some("posts/42".to_string());

        h.engine().revert(&req).unwrap();

        let logs = h.audit.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].0, Category::Revert);
        assert_eq!(
            logs[0].1,
            format!(
                "Reverted files to commit: [#{}](commit/{}). Requested from posts/42.",
                r1.short(7),
                r1
            )
        );
        assert_eq!(
            h.audit.notifications(),
            vec![(
                "Test Site - Commit Reverted".to_string(),
                format!("Test Site was reverted to commit #{}.", r1.short(7))
            )]
        );
        assert_eq!(h.event_names(), vec!["pre_revert", "post_revert"]);
    }

    #[test]
    fn checks_out_the_branch_when_not_current() {
        let h = Harness::new();
        let (r1, _, _) = history(&h);
        h.repo
            .create_branch(&BranchName::new("other").unwrap())
            .unwrap();
        h.repo
            .checkout(&BranchName::new("other").unwrap())
            .unwrap();
        h.clear_trace();

        h.engine()
            .revert(&request(r1.as_str(), RevertScope::Files))
            .unwrap();

        assert_eq!(h.calls()[0], "repo: checkout main");
        assert_eq!(h.repo.current_branch().unwrap(), Some(main()));
    }

    #[test]
    fn missing_revision_makes_no_commit() {
        let h = Harness::new();
        let (_, _, r3) = history(&h);
        let commits_before = h.repo.commit_count();

        let err = h
            .engine()
            .revert(&request("deadbeef", RevertScope::Files))
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Driver(DriverError::RevisionNotFound { .. })
        ));
        assert_eq!(h.repo.current_revision().unwrap(), r3);
        assert_eq!(h.repo.commit_count(), commits_before);
        assert!(h.audit.logs().is_empty());
        assert_eq!(h.event_names(), vec!["pre_revert"]);
    }

    #[test]
    fn short_reflog_aborts_without_commit() {
        let h = Harness::new();
        let (r1, _, _) = history(&h);
        h.repo.expire_reflog();
        let commits_before = h.repo.commit_count();

        let err = h
            .engine()
            .revert(&request(r1.as_str(), RevertScope::Files))
            .unwrap_err();

        assert_eq!(err.kind(), crate::engine::ErrorKind::Driver);
        assert_eq!(h.repo.reflog_len(), 1);
        assert_eq!(h.repo.commit_count(), commits_before);
        assert!(!h.calls().iter().any(|c| c.starts_with("repo: commit")));
        // The completed hard reset is not rolled back.
        assert_eq!(h.repo.current_revision().unwrap(), r1);
        assert!(h.audit.notifications().is_empty());
    }

    #[test]
    fn reverting_to_head_is_nothing_to_do() {
        let h = Harness::new();
        let (_, _, r3) = history(&h);

        let err = h
            .engine()
            .revert(&request("HEAD", RevertScope::Files))
            .unwrap_err();

        assert!(matches!(err, EngineError::NothingToDo(_)));
        assert_eq!(h.repo.current_revision().unwrap(), r3);
    }

    #[test]
    fn blank_revision_is_rejected_before_anything_happens() {
        let h = Harness::new();
        history(&h);
        h.clear_trace();

        let err = h
            .engine()
            .revert(&request("  ", RevertScope::Both))
            .unwrap_err();

        assert!(matches!(err, EngineError::Validation(_)));
        assert!(h.calls().is_empty());
        assert!(h.event_names().is_empty());
    }

    #[test]
    fn auto_push_publishes_the_revert() {
        let h = Harness::new();
        let (r1, _, _) = history(&h);
        h.enable(PolicyKey::AutoPush);

        let Outcome::Reverted(revert) = h
            .engine()
            .revert(&request(r1.as_str(), RevertScope::Files))
            .unwrap()
        else {
            panic!("expected a revert outcome");
        };

        assert!(revert.pushed);
        assert_eq!(h.repo.remote_tip("main"), revert.new_revision);
    }

    #[test]
    fn data_only_restores_the_paired_snapshot() {
        let h = Harness::new();
        let (r1, _, r3) = history(&h);
        h.snapshots.set_unit("posts", "at r1");
        let taken = h.snapshots.snapshot(&SnapshotScope::Full, &r1).unwrap();
        h.snapshots.set_unit("posts", "now");
        h.clear_trace();

        let Outcome::Reverted(revert) = h
            .engine()
            .revert(&request(r1.short(10), RevertScope::Data))
            .unwrap()
        else {
            panic!("expected a revert outcome");
        };

        assert_eq!(revert.restored, Some(taken.id));
        assert_eq!(revert.new_revision, None);
        assert_eq!(h.snapshots.unit("posts").as_deref(), Some("at r1"));
        assert_eq!(h.repo.current_revision().unwrap(), r3);
        assert!(!h.calls().iter().any(|c| c.starts_with("repo: reset")));
        assert_eq!(h.audit.logs().len(), 1);
        assert!(h.audit.notifications().is_empty());
    }

    #[test]
    fn data_revert_uses_the_data_record_snapshot() {
        let h = Harness::new();
        let (r1, _, _) = history(&h);
        h.snapshots.set_unit("posts", "committed");
        let paired = h.snapshots.snapshot(&SnapshotScope::Full, &r1).unwrap();
        h.records
            .put(
                &CommitRecord::pending(Some(main()), "pair", Vec::new())
                    .with_snapshot(paired.id.clone())
                    .committed(r1.clone()),
            )
            .unwrap();
        h.snapshots.set_unit("posts", "safety copy");
        h.snapshots.snapshot(&SnapshotScope::Full, &r1).unwrap();
        h.snapshots.set_unit("posts", "now");

        let Outcome::Reverted(revert) = h
            .engine()
            .revert(&request(r1.as_str(), RevertScope::Data))
            .unwrap()
        else {
            panic!("expected a revert outcome");
        };

        assert_eq!(revert.restored, Some(paired.id));
        assert_eq!(h.snapshots.unit("posts").as_deref(), Some("committed"));
    }

    #[test]
    fn both_at_the_tip_still_restores_data() {
        let h = Harness::new();
        let (_, _, r3) = history(&h);
        h.snapshots.set_unit("posts", "at r3");
        let taken = h.snapshots.snapshot(&SnapshotScope::Full, &r3).unwrap();
        h.snapshots.set_unit("posts", "drifted");
        let commits_before = h.repo.commit_count();

        let Outcome::Reverted(revert) = h
            .engine()
            .revert(&request(r3.as_str(), RevertScope::Both))
            .unwrap()
        else {
            panic!("expected a revert outcome");
        };

        assert_eq!(revert.new_revision, None);
        assert_eq!(revert.restored, Some(taken.id));
        assert_eq!(h.snapshots.unit("posts").as_deref(), Some("at r3"));
        assert_eq!(h.repo.current_revision().unwrap(), r3);
        assert_eq!(h.repo.commit_count(), commits_before);
        assert!(h.audit.notifications().is_empty());
    }

    #[test]
    fn both_with_matching_tree_restores_data_without_commit() {
        let h = Harness::new();
        let (r1, _, _) = history(&h);
        h.snapshots.set_unit("posts", "at r1");
        h.snapshots.snapshot(&SnapshotScope::Full, &r1).unwrap();
        h.repo.write_file("a.txt", "one");
        h.repo.write_file("b.txt", "b");
        h.repo.remove_file("c.txt");
        let same_tree = h.repo.commit_files(&[], "back to r1's tree");
        h.snapshots.set_unit("posts", "drifted");

        let Outcome::Reverted(revert) = h
            .engine()
            .revert(&request(r1.as_str(), RevertScope::Both))
            .unwrap()
        else {
            panic!("expected a revert outcome");
        };

        assert_eq!(revert.new_revision, None);
        assert_eq!(h.repo.current_revision().unwrap(), same_tree);
        assert_eq!(h.snapshots.unit("posts").as_deref(), Some("at r1"));
    }

    #[test]
    fn both_reverts_files_then_data() {
        let h = Harness::new();
        let (r1, _, _) = history(&h);
        h.snapshots.set_unit("posts", "at r1");
        h.snapshots.snapshot(&SnapshotScope::Full, &r1).unwrap();
        h.snapshots.set_unit("posts", "now");
        h.clear_trace();

        h.engine()
            .revert(&request(r1.as_str(), RevertScope::Both))
            .unwrap();

        let calls = h.calls();
        let commit = calls
            .iter()
            .position(|c| c.starts_with("repo: commit"))
            .unwrap();
        let restore = calls
            .iter()
            .position(|c| c.starts_with("data: restore"))
            .unwrap();
        assert!(commit < restore);
        assert_eq!(h.snapshots.unit("posts").as_deref(), Some("at r1"));
    }

    #[test]
    fn data_revert_without_snapshot_fails() {
        let h = Harness::new();
        let (r1, _, _) = history(&h);

        let err = h
            .engine()
            .revert(&request(r1.as_str(), RevertScope::Data))
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Snapshot(crate::snapshot::SnapshotError::NotFound { .. })
        ));
    }

    #[test]
    fn revert_files_entry_point() {
        let h = Harness::new();
        let (r1, _, _) = history(&h);

        let outcome = h.engine().revert_files(&main(), r1.as_str()).unwrap();

        let Outcome::Reverted(revert) = outcome else {
            panic!("expected a revert outcome");
        };
        assert_eq!(revert.scope, RevertScope::Files);
        assert_eq!(revert.respond, Respond::Inline);
        assert_eq!(h.audit.logs().len(), 1);
        assert_eq!(
            h.audit.notifications(),
            vec![(
                "Test Site - Commit Reverted".to_string(),
                format!("Test Site was reverted to commit #{}.", r1.short(7))
            )]
        );
        let head = h.repo.current_revision().unwrap();
        assert_eq!(h.repo.tree_at(&head), h.repo.tree_at(&r1));
    }
}
