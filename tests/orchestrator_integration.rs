//! Integration tests for the orchestrator against real stores.
//!
//! Every test runs the production drivers: a real git repository, the
//! on-disk snapshot store, the JSON record store, and the JSON-lines audit
//! log. They check the properties that only hold end to end: reverts keep
//! history and reproduce trees, and data follows the revision it was
//! paired with.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use revkeep::audit::{AuditLog, Category};
use revkeep::core::paths::RevkeepPaths;
use revkeep::core::policy::PolicyKey;
use revkeep::core::records::{FileRecordStore, RecordKind, RecordStore};
use revkeep::core::types::{BranchName, Oid};
use revkeep::engine::{
    CheckoutRequest, CommitRequest, CreateBranchRequest, EngineError, ErrorKind, EventBus,
    MergeRequest, Orchestrator, Outcome, Request, Respond, RevertRequest, RevertScope,
};
use revkeep::git::{DriverError, Git, RepositoryDriver};
use revkeep::snapshot::{FileSnapshotStore, SnapshotStore};

// =============================================================================
// Test Fixtures
// =============================================================================

/// A real repository with the production stores wired under `.git/revkeep`.
struct Site {
    dir: TempDir,
    git: Git,
    paths: RevkeepPaths,
    snapshots: FileSnapshotStore,
    records: FileRecordStore,
    audit: AuditLog,
    events: EventBus,
}

impl Site {
    fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        run_git(dir.path(), &["init", "-b", "main"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["config", "user.name", "Test User"]);
        std::fs::write(dir.path().join("README.md"), "# Site\n").unwrap();
        run_git(dir.path(), &["add", "README.md"]);
        run_git(dir.path(), &["commit", "-m", "Initial commit"]);
        Self::wire(dir)
    }

    fn wire(dir: TempDir) -> Self {
        let git = Git::open(dir.path(), "origin").unwrap();
        let paths = RevkeepPaths::new(git.git_dir().unwrap());
        paths.ensure_dirs().unwrap();
        let snapshots = FileSnapshotStore::new(paths.default_data_dir(), paths.snapshots_dir());
        let records = FileRecordStore::new(paths.clone());
        let audit = AuditLog::new(paths.audit_log_path());

        Self {
            dir,
            git,
            paths,
            snapshots,
            records,
            audit,
            events: EventBus::new(),
        }
    }

    fn engine(&self) -> Orchestrator<'_> {
        Orchestrator::new(
            &self.git,
            &self.snapshots,
            &self.records,
            &self.audit,
            &self.events,
        )
        .with_site_name("Test Site")
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn commit_file(&self, path: &str, content: &str, message: &str) -> Oid {
        std::fs::write(self.path().join(path), content).unwrap();
        run_git(self.path(), &["add", path]);
        run_git(self.path(), &["commit", "-m", message]);
        self.git.current_revision().unwrap()
    }

    fn read(&self, path: &str) -> Option<String> {
        std::fs::read_to_string(self.path().join(path)).ok()
    }

    fn data_dir(&self) -> PathBuf {
        self.paths.default_data_dir()
    }

    fn set_unit(&self, unit: &str, content: &str) {
        std::fs::create_dir_all(self.data_dir()).unwrap();
        std::fs::write(self.data_dir().join(unit), content).unwrap();
    }

    fn unit(&self, unit: &str) -> Option<String> {
        std::fs::read_to_string(self.data_dir().join(unit)).ok()
    }

    fn tree_of(&self, rev: &str) -> String {
        git_stdout(self.path(), &["rev-parse", &format!("{rev}^{{tree}}")])
    }

    fn enable(&self, key: PolicyKey) {
        run_git(
            self.path(),
            &["config", &format!("revkeep.{}", key.as_str()), "true"],
        );
    }
}

fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

fn git_stdout(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

fn name(s: &str) -> BranchName {
    BranchName::new(s).unwrap()
}

fn revert_request(revision: &str, scope: RevertScope) -> Request {
    Request::Revert(RevertRequest {
        branch: name("main"),
        revision: revision.to_string(),
        scope,
        record_ref: None,
        respond: Respond::Redirect,
    })
}

// =============================================================================
// Revert
// =============================================================================

#[test]
fn revert_adds_a_commit_reproducing_the_target_tree() {
    let site = Site::new();
    let target = site.commit_file("page.html", "v1", "first version");
    let middle = site.commit_file("page.html", "v2", "second version");
    let tip = site.commit_file("extra.html", "added later", "third");

    let outcome = site
        .engine()
        .handle(revert_request(target.as_str(), RevertScope::Files))
        .unwrap();

    let Outcome::Reverted(revert) = outcome else {
        panic!("expected a revert outcome");
    };
    let new_rev = revert.new_revision.expect("files were reverted");
    assert_eq!(revert.target, target);
    assert_eq!(site.git.current_revision().unwrap(), new_rev);

    // Tree equals the target's, history is intact.
    assert_eq!(site.tree_of("HEAD"), site.tree_of(target.as_str()));
    assert_eq!(git_stdout(site.path(), &["rev-parse", "HEAD~1"]), tip.as_str());
    let history = git_stdout(site.path(), &["rev-list", "HEAD"]);
    assert!(history.contains(middle.as_str()));
    assert_eq!(site.read("page.html").as_deref(), Some("v1"));
    assert_eq!(site.read("extra.html"), None);
    assert!(site.git.worktree_status().unwrap().is_pristine());

    let subject = git_stdout(site.path(), &["log", "-1", "--format=%s"]);
    assert_eq!(subject, format!("Reverted to commit: #{}.", target.short(7)));
}

#[test]
fn revert_writes_audit_and_notification() {
    let site = Site::new();
    let target = site.commit_file("a.txt", "1", "one");
    site.commit_file("a.txt", "2", "two");

    site.engine()
        .handle(Request::Revert(RevertRequest {
            branch: name("main"),
            revision: target.short(7).to_string(),
            scope: RevertScope::Files,
            record_ref: Some("ticket-42".to_string()),
            respond: Respond::Inline,
        }))
        .unwrap();

    let entries = site.audit.recent(10).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].category, Category::Notification);
    assert_eq!(
        entries[0].message,
        format!(
            "Test Site - Commit Reverted: Test Site was reverted to commit #{}.",
            target.short(7)
        )
    );
    assert_eq!(entries[1].category, Category::Revert);
    assert_eq!(
        entries[1].message,
        format!(
            "Reverted files to commit: [#{}](commit/{}). Requested from ticket-42.",
            target.short(7),
            target
        )
    );
}

#[test]
fn revert_both_restores_paired_data() {
    let site = Site::new();
    let target = site.commit_file("a.txt", "1", "one");
    site.set_unit("posts", "posts at v1");
    let Outcome::Committed(paired) = site
        .engine()
        .handle(Request::Commit(CommitRequest::Snapshot {
            message: "pair data".into(),
        }))
        .unwrap()
    else {
        panic!("expected a commit outcome");
    };

    site.commit_file("a.txt", "2", "two");
    site.set_unit("posts", "posts at v2");
    site.set_unit("comments", "added after v1");

    let outcome = site
        .engine()
        .handle(revert_request(target.as_str(), RevertScope::Both))
        .unwrap();

    let Outcome::Reverted(revert) = outcome else {
        panic!("expected a revert outcome");
    };
    assert_eq!(revert.restored, paired.snapshot_id);
    assert_eq!(site.unit("posts").as_deref(), Some("posts at v1"));
    assert_eq!(site.unit("comments"), None);
    assert_eq!(site.read("a.txt").as_deref(), Some("1"));
}

#[test]
fn data_only_revert_leaves_files() {
    let site = Site::new();
    let target = site.commit_file("a.txt", "1", "one");
    site.set_unit("posts", "old");
    site.snapshots
        .snapshot(&revkeep::snapshot::SnapshotScope::Full, &target)
        .unwrap();
    let tip = site.commit_file("a.txt", "2", "two");
    site.set_unit("posts", "new");

    site.engine()
        .handle(revert_request(target.as_str(), RevertScope::Data))
        .unwrap();

    assert_eq!(site.git.current_revision().unwrap(), tip);
    assert_eq!(site.read("a.txt").as_deref(), Some("2"));
    assert_eq!(site.unit("posts").as_deref(), Some("old"));
}

#[test]
fn revert_to_unknown_revision_changes_nothing() {
    let site = Site::new();
    let tip = site.commit_file("a.txt", "1", "one");

    let err = site
        .engine()
        .handle(revert_request("0123456789abcdef", RevertScope::Files))
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Driver(DriverError::RevisionNotFound { .. })
    ));
    assert_eq!(site.git.current_revision().unwrap(), tip);
    assert!(site.audit.recent(10).unwrap().is_empty());
}

#[test]
fn revert_without_reflog_fails_at_target() {
    let site = Site::new();
    let target = site.commit_file("a.txt", "1", "one");
    site.commit_file("a.txt", "2", "two");
    run_git(site.path(), &["config", "core.logAllRefUpdates", "false"]);
    std::fs::remove_dir_all(site.path().join(".git/logs")).unwrap();

    let err = site
        .engine()
        .handle(revert_request(target.as_str(), RevertScope::Files))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Driver);
    // The hard reset completed and is not rolled back.
    assert_eq!(site.git.current_revision().unwrap(), target);
    assert!(site.audit.recent(10).unwrap().is_empty());
}

#[test]
fn revert_files_checks_out_the_branch_first() {
    let site = Site::new();
    let target = site.commit_file("a.txt", "1", "one");
    site.commit_file("a.txt", "2", "two");
    run_git(site.path(), &["checkout", "-b", "other"]);

    site.engine()
        .handle(Request::RevertFiles {
            branch: name("main"),
            revision: target.to_string(),
        })
        .unwrap();

    assert_eq!(site.git.current_branch().unwrap(), Some(name("main")));
    assert_eq!(site.read("a.txt").as_deref(), Some("1"));
    let entries = site.audit.recent(10).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].category, Category::Notification);
    assert_eq!(
        entries[0].message,
        format!(
            "Test Site - Commit Reverted: Test Site was reverted to commit #{}.",
            target.short(7)
        )
    );
    assert_eq!(
        entries[1].message,
        format!("Reverted files to commit: #{}.", target.short(7))
    );
}

#[test]
fn revert_both_at_the_tip_restores_data() {
    let site = Site::new();
    let tip = site.commit_file("a.txt", "1", "one");
    site.set_unit("posts", "paired");
    site.engine()
        .handle(Request::Commit(CommitRequest::Snapshot {
            message: "pair".into(),
        }))
        .unwrap();
    site.set_unit("posts", "drifted");

    let outcome = site
        .engine()
        .handle(revert_request(tip.as_str(), RevertScope::Both))
        .unwrap();

    let Outcome::Reverted(revert) = outcome else {
        panic!("expected a revert outcome");
    };
    assert_eq!(revert.new_revision, None);
    assert_eq!(site.git.current_revision().unwrap(), tip);
    assert_eq!(site.unit("posts").as_deref(), Some("paired"));
}

// =============================================================================
// Commit
// =============================================================================

#[test]
fn commit_files_writes_record() {
    let site = Site::new();
    std::fs::write(site.path().join("a.txt"), "a").unwrap();
    std::fs::write(site.path().join("b.txt"), "b").unwrap();

    let outcome = site
        .engine()
        .handle(Request::Commit(CommitRequest::Files {
            paths: vec!["a.txt".into()],
            quick_stage: true,
            message: "add a".into(),
        }))
        .unwrap();

    let Outcome::Committed(record) = outcome else {
        panic!("expected a commit outcome");
    };
    let rev = record.revision.clone().unwrap();
    assert_eq!(site.git.current_revision().unwrap(), rev);
    assert!(site.paths.record_path(&rev, RecordKind::Files).exists());
    assert_eq!(
        site.records.get(&rev, RecordKind::Files).unwrap(),
        Some(record)
    );
    // b.txt was not selected.
    assert_eq!(site.git.worktree_status().unwrap().untracked, 1);
}

#[test]
fn commit_from_status_lines() {
    let site = Site::new();
    site.commit_file("a.txt", "a", "add a");
    std::fs::write(site.path().join("a.txt"), "changed").unwrap();

    // As `git status --porcelain` prints it: two status columns, a space, the path.
    site.engine()
        .handle(Request::Commit(CommitRequest::Files {
            paths: vec![" M a.txt".to_string()],
            quick_stage: false,
            message: "change a".into(),
        }))
        .unwrap();

    assert!(site.git.worktree_status().unwrap().is_pristine());
}

// =============================================================================
// Checkout and merge
// =============================================================================

#[test]
fn checkout_carries_data_between_branches() {
    let site = Site::new();
    site.enable(PolicyKey::SnapshotOnCheckout);
    site.set_unit("posts", "main data");
    site.engine()
        .handle(Request::Commit(CommitRequest::Snapshot {
            message: "pair main".into(),
        }))
        .unwrap();

    site.engine()
        .handle(Request::CreateBranch(
            CreateBranchRequest::new("new feature", true).unwrap(),
        ))
        .unwrap();
    assert_eq!(
        site.git.current_branch().unwrap(),
        Some(name("new-feature"))
    );
    site.commit_file("f.txt", "feature", "feature work");
    site.set_unit("posts", "feature data");

    site.engine()
        .handle(Request::Checkout(CheckoutRequest {
            branch: name("main"),
            new_branch: false,
        }))
        .unwrap();
    assert_eq!(site.unit("posts").as_deref(), Some("main data"));
    assert_eq!(site.read("f.txt"), None);

    site.engine()
        .handle(Request::Checkout(CheckoutRequest {
            branch: name("new-feature"),
            new_branch: false,
        }))
        .unwrap();
    assert_eq!(site.unit("posts").as_deref(), Some("feature data"));
}

#[test]
fn checkout_without_policy_leaves_data() {
    let site = Site::new();
    run_git(site.path(), &["branch", "feature"]);
    site.set_unit("posts", "live");

    site.engine()
        .handle(Request::Checkout(CheckoutRequest {
            branch: name("feature"),
            new_branch: false,
        }))
        .unwrap();

    assert_eq!(site.unit("posts").as_deref(), Some("live"));
    assert!(site.snapshots.list().unwrap().is_empty());
}

#[test]
fn safety_snapshots_leave_the_paired_snapshot_alone() {
    let site = Site::new();
    site.set_unit("posts", "v1");
    let Outcome::Committed(record) = site
        .engine()
        .handle(Request::Commit(CommitRequest::Snapshot {
            message: "pair".into(),
        }))
        .unwrap()
    else {
        panic!("expected a commit outcome");
    };
    let paired = record.snapshot_id.clone().expect("data record names its snapshot");
    let revision = record.revision.clone().unwrap();

    site.set_unit("posts", "v2");
    site.enable(PolicyKey::SnapshotOnCheckout);
    run_git(site.path(), &["branch", "topic"]);
    site.engine()
        .handle(Request::Checkout(CheckoutRequest {
            branch: name("topic"),
            new_branch: true,
        }))
        .unwrap();

    let at_revision: Vec<_> = site
        .snapshots
        .list()
        .unwrap()
        .into_iter()
        .filter(|s| s.revision == revision)
        .collect();
    assert_eq!(at_revision.len(), 2);
    assert!(at_revision.iter().any(|s| s.id == paired));

    site.snapshots
        .restore(&paired, &revkeep::snapshot::SnapshotScope::Full)
        .unwrap();
    assert_eq!(site.unit("posts").as_deref(), Some("v1"));
}

#[test]
fn merge_conflict_reaches_the_caller() {
    let site = Site::new();
    site.commit_file("a.txt", "base", "base");
    run_git(site.path(), &["checkout", "-b", "feature"]);
    site.commit_file("a.txt", "theirs", "theirs");
    run_git(site.path(), &["checkout", "main"]);
    site.commit_file("a.txt", "ours", "ours");

    let err = site
        .engine()
        .handle(Request::Merge(MergeRequest {
            branch: name("feature"),
            import_data: false,
        }))
        .unwrap_err();

    assert!(matches!(
        err.driver_error(),
        Some(DriverError::MergeConflict { .. })
    ));
    assert!(site.git.worktree_status().unwrap().is_pristine());
}

// =============================================================================
// Pull
// =============================================================================

#[test]
fn pull_discards_local_edits_and_records_undo_point() {
    let root = TempDir::new().unwrap();
    let remote = root.path().join("remote.git");
    run_git(root.path(), &["init", "--bare", "-b", "main", "remote.git"]);

    let site = Site::new();
    let base = site.git.current_revision().unwrap();
    run_git(
        site.path(),
        &["remote", "add", "origin", remote.to_str().unwrap()],
    );
    run_git(site.path(), &["push", "-u", "origin", "main"]);

    let other = TempDir::new().unwrap();
    run_git(
        other.path(),
        &["clone", "-b", "main", remote.to_str().unwrap(), "."],
    );
    run_git(other.path(), &["config", "user.email", "other@example.com"]);
    run_git(other.path(), &["config", "user.name", "Other"]);
    std::fs::write(other.path().join("up.txt"), "upstream").unwrap();
    run_git(other.path(), &["add", "up.txt"]);
    run_git(other.path(), &["commit", "-m", "upstream work"]);
    run_git(other.path(), &["push", "origin", "main"]);

    site.enable(PolicyKey::SnapshotOnPull);
    site.set_unit("posts", "before pull");
    std::fs::write(site.path().join("README.md"), "local edit").unwrap();

    let outcome = site.engine().handle(Request::Pull).unwrap();

    let Outcome::Pulled {
        incoming,
        undo_point,
    } = outcome
    else {
        panic!("expected a pull outcome");
    };
    assert_eq!(incoming.len(), 1);
    let undo_point = undo_point.expect("snapshot-on-pull takes a snapshot");
    assert_eq!(undo_point.revision(), base);
    assert_eq!(
        git_stdout(site.path(), &["config", "revkeep.last-snapshot-id"]),
        undo_point.as_str()
    );
    assert_eq!(site.read("README.md").as_deref(), Some("# Site\n"));
    assert_eq!(site.read("up.txt").as_deref(), Some("upstream"));
}
