//! git::mock
//!
//! In-memory repository for deterministic orchestrator tests.
//!
//! # Design
//!
//! `MockRepository` models just enough of git for the orchestrator: commits
//! with trees of path → contents, branches, an index, a working tree, a HEAD
//! reflog, a remote with its own branch tips, and `revkeep.*` config. It
//! records every driver call and can be told to fail a specific one.
//!
//! The reflog only gains an entry when HEAD actually moves to a different
//! revision. Real git also logs no-op resets, so a single-commit history
//! is the easiest way to see `HEAD@{1}` fail here.
//!
//! # Example
//!
//! ```
//! use revkeep::git::mock::MockRepository;
//! use revkeep::git::RepositoryDriver;
//!
//! let repo = MockRepository::new();
//! let first = repo.commit_files(&[("a.txt", "one")], "first");
//! assert_eq!(repo.current_revision().unwrap(), first);
//! assert!(repo.worktree_status().unwrap().is_pristine());
//! ```

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use sha2::{Digest as _, Sha256};

use super::driver::{CommitSummary, DriverError, RepositoryDriver, ResetMode, WorktreeStatus};
use crate::core::types::{BranchName, Oid};

/// Ordered call log shared between mocks so tests can assert cross-mock ordering.
pub type CallTrace = Arc<Mutex<Vec<String>>>;

/// Create an empty shared call trace.
pub fn new_trace() -> CallTrace {
    Arc::new(Mutex::new(Vec::new()))
}

type Tree = BTreeMap<String, String>;

#[derive(Debug, Clone)]
struct MockCommit {
    parents: Vec<Oid>,
    message: String,
    tree: Tree,
}

/// Mock repository for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockRepository {
    inner: Arc<Mutex<MockRepositoryInner>>,
}

#[derive(Debug)]
struct MockRepositoryInner {
    initialized: bool,
    remote: String,
    commits: HashMap<String, MockCommit>,
    branches: BTreeMap<String, Oid>,
    head: String,
    index: Tree,
    worktree: Tree,
    /// HEAD positions, oldest first.
    reflog: Vec<Oid>,
    config: HashMap<String, String>,
    remote_branches: BTreeMap<String, Oid>,
    /// Remote-tracking refs as of the last fetch or pull.
    tracking: BTreeMap<String, Oid>,
    counter: u64,
    fail_on: Option<FailOn>,
    operations: Vec<MockOperation>,
    trace: Option<CallTrace>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    Checkout(DriverError),
    /// Fail resets whose target equals the given expression (any reset if `None`).
    Reset(Option<String>, DriverError),
    Stage(DriverError),
    Commit(DriverError),
    CreateBranch(DriverError),
    DeleteBranch(DriverError),
    Merge(DriverError),
    Fetch(DriverError),
    Pull(DriverError),
    Push(DriverError),
    Run(DriverError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    Init,
    Checkout { branch: String },
    Reset { mode: ResetMode, target: String, clean: bool },
    Stage { paths: Vec<String> },
    StageAll,
    Commit { message: String },
    CreateBranch { name: String },
    DeleteBranch { name: String },
    Merge { branch: String },
    Fetch,
    Pull { incoming: usize },
    Push,
    Run { command: String, args: Vec<String> },
    SetConfig { key: String, value: String },
}

impl MockOperation {
    /// Short human-readable form used in call traces.
    pub fn label(&self) -> String {
        match self {
            MockOperation::Init => "init".to_string(),
            MockOperation::Checkout { branch } => format!("checkout {}", branch),
            MockOperation::Reset {
                mode,
                target,
                clean,
            } => {
                let clean = if *clean { " +clean" } else { "" };
                format!("reset {} {}{}", mode.as_flag(), target, clean)
            }
            MockOperation::Stage { paths } => format!("stage {}", paths.join(" ")),
            MockOperation::StageAll => "stage -A".to_string(),
            MockOperation::Commit { message } => format!("commit {}", message),
            MockOperation::CreateBranch { name } => format!("branch {}", name),
            MockOperation::DeleteBranch { name } => format!("branch -D {}", name),
            MockOperation::Merge { branch } => format!("merge {}", branch),
            MockOperation::Fetch => "fetch".to_string(),
            MockOperation::Pull { incoming } => format!("pull ({} incoming)", incoming),
            MockOperation::Push => "push".to_string(),
            MockOperation::Run { command, args } => format!("{} {}", command, args.join(" ")),
            MockOperation::SetConfig { key, value } => format!("config {}={}", key, value),
        }
    }
}

impl MockRepositoryInner {
    fn head_tip(&self) -> Option<Oid> {
        self.branches.get(&self.head).cloned()
    }

    fn tree_of(&self, oid: Option<&Oid>) -> Tree {
        oid.and_then(|o| self.commits.get(o.as_str()))
            .map(|c| c.tree.clone())
            .unwrap_or_default()
    }

    fn untracked(&self) -> Tree {
        self.worktree
            .iter()
            .filter(|(path, _)| !self.index.contains_key(*path))
            .map(|(p, c)| (p.clone(), c.clone()))
            .collect()
    }

    fn tracked_dirty(&self) -> bool {
        let head_tree = self.tree_of(self.head_tip().as_ref());
        self.index != head_tree
            || self
                .index
                .iter()
                .any(|(path, contents)| self.worktree.get(path) != Some(contents))
    }

    /// Point the current branch at `target`, logging the move if HEAD changed.
    fn move_head(&mut self, target: Oid) {
        let moved = self.head_tip().as_ref() != Some(&target);
        self.branches.insert(self.head.clone(), target.clone());
        if moved {
            self.reflog.push(target);
        }
    }

    /// Replace index and worktree with `tree`, keeping untracked files unless `clean`.
    fn materialize(&mut self, tree: Tree, clean: bool) {
        let untracked = if clean { Tree::new() } else { self.untracked() };
        self.index = tree.clone();
        self.worktree = tree;
        for (path, contents) in untracked {
            self.worktree.entry(path).or_insert(contents);
        }
    }

    fn new_commit(&mut self, parents: Vec<Oid>, message: &str, tree: Tree) -> Oid {
        self.counter += 1;
        let mut hasher = Sha256::new();
        hasher.update(self.counter.to_be_bytes());
        hasher.update(message.as_bytes());
        for parent in &parents {
            hasher.update(parent.as_str().as_bytes());
        }
        let hex = hex::encode(hasher.finalize());
        let oid = Oid::new(&hex[..40]).unwrap_or_else(|_| unreachable!("sha256 hex is valid"));

        self.commits.insert(
            oid.as_str().to_string(),
            MockCommit {
                parents,
                message: message.to_string(),
                tree,
            },
        );
        oid
    }

    /// Every commit reachable from `from`, breadth-first, `from` included.
    fn reachable(&self, from: &Oid) -> Vec<Oid> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([from.clone()]);

        while let Some(oid) = queue.pop_front() {
            if !seen.insert(oid.clone()) {
                continue;
            }
            if let Some(commit) = self.commits.get(oid.as_str()) {
                queue.extend(commit.parents.iter().cloned());
            }
            order.push(oid);
        }
        order
    }

    fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> bool {
        self.reachable(descendant).contains(ancestor)
    }

    fn merge_base(&self, a: &Oid, b: &Oid) -> Option<Oid> {
        let from_a: HashSet<Oid> = self.reachable(a).into_iter().collect();
        self.reachable(b).into_iter().find(|oid| from_a.contains(oid))
    }

    fn resolve(&self, revision: &str) -> Result<Oid, DriverError> {
        let missing = || DriverError::RevisionNotFound {
            revision: revision.to_string(),
        };

        if let Some(n) = revision
            .strip_prefix("HEAD@{")
            .and_then(|rest| rest.strip_suffix('}'))
        {
            let n: usize = n.parse().map_err(|_| missing())?;
            let len = self.reflog.len();
            return if n < len {
                Ok(self.reflog[len - 1 - n].clone())
            } else {
                Err(missing())
            };
        }

        if let Some((base, steps)) = revision.split_once('~') {
            let steps: usize = steps.parse().map_err(|_| missing())?;
            let mut oid = self.resolve(base)?;
            for _ in 0..steps {
                oid = self
                    .commits
                    .get(oid.as_str())
                    .and_then(|c| c.parents.first().cloned())
                    .ok_or_else(missing)?;
            }
            return Ok(oid);
        }

        if revision == "HEAD" {
            return self.head_tip().ok_or_else(missing);
        }
        if let Some(oid) = self.branches.get(revision) {
            return Ok(oid.clone());
        }
        if let Some(branch) = revision.strip_prefix(&format!("{}/", self.remote)) {
            if let Some(oid) = self.tracking.get(branch) {
                return Ok(oid.clone());
            }
        }

        let needle = revision.to_ascii_lowercase();
        if needle.len() >= 4 {
            let matches: Vec<&String> = self
                .commits
                .keys()
                .filter(|k| k.starts_with(&needle))
                .collect();
            if let [only] = matches.as_slice() {
                return Oid::new(only.as_str()).map_err(|_| missing());
            }
        }

        Err(missing())
    }

    /// Three-way merge of `theirs` into HEAD. Conflicts leave state untouched.
    fn merge_into_head(&mut self, branch: &str, theirs: Oid) -> Result<(), DriverError> {
        let ours = match self.head_tip() {
            Some(oid) => oid,
            None => {
                self.move_head(theirs.clone());
                let tree = self.tree_of(Some(&theirs));
                self.materialize(tree, false);
                return Ok(());
            }
        };

        if self.is_ancestor(&theirs, &ours) {
            return Ok(());
        }

        if self.is_ancestor(&ours, &theirs) {
            self.move_head(theirs.clone());
            let tree = self.tree_of(Some(&theirs));
            self.materialize(tree, false);
            return Ok(());
        }

        let base_tree = self.tree_of(self.merge_base(&ours, &theirs).as_ref());
        let our_tree = self.tree_of(Some(&ours));
        let their_tree = self.tree_of(Some(&theirs));

        let paths: std::collections::BTreeSet<&String> = base_tree
            .keys()
            .chain(our_tree.keys())
            .chain(their_tree.keys())
            .collect();

        let mut merged = Tree::new();
        let mut conflicts = Vec::new();
        for path in paths {
            let (b, o, t) = (base_tree.get(path), our_tree.get(path), their_tree.get(path));
            let pick = if o == t || t == b {
                o
            } else if o == b {
                t
            } else {
                conflicts.push(path.clone());
                continue;
            };
            if let Some(contents) = pick {
                merged.insert(path.clone(), contents.clone());
            }
        }

        if !conflicts.is_empty() {
            return Err(DriverError::MergeConflict {
                branch: branch.to_string(),
                files: conflicts,
            });
        }

        let message = format!("Merge branch '{}'", branch);
        let oid = self.new_commit(vec![ours, theirs], &message, merged.clone());
        self.move_head(oid);
        self.materialize(merged, false);
        Ok(())
    }
}

impl MockRepository {
    /// An initialized repository on `main` with no commits and remote `origin`.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockRepositoryInner {
                initialized: true,
                remote: "origin".to_string(),
                commits: HashMap::new(),
                branches: BTreeMap::new(),
                head: "main".to_string(),
                index: Tree::new(),
                worktree: Tree::new(),
                reflog: Vec::new(),
                config: HashMap::new(),
                remote_branches: BTreeMap::new(),
                tracking: BTreeMap::new(),
                counter: 0,
                fail_on: None,
                operations: Vec::new(),
                trace: None,
            })),
        }
    }

    /// A directory that is not a repository yet.
    pub fn uninitialized() -> Self {
        let repo = Self::new();
        repo.inner.lock().unwrap().initialized = false;
        repo
    }

    /// Configure an operation to fail.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.set_fail_on(fail_on);
        self
    }

    /// Configure an operation to fail on a repository already shared with
    /// other collaborators.
    pub fn set_fail_on(&self, fail_on: FailOn) {
        self.inner.lock().unwrap().fail_on = Some(fail_on);
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.inner.lock().unwrap().fail_on = None;
    }

    /// Append every call to a trace shared with other mocks.
    pub fn with_trace(self, trace: CallTrace) -> Self {
        self.inner.lock().unwrap().trace = Some(trace);
        self
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.inner.lock().unwrap().operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        self.inner.lock().unwrap().operations.clear();
    }

    // =========================================================================
    // Fixture helpers
    // =========================================================================

    pub fn write_file(&self, path: &str, contents: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.worktree.insert(path.to_string(), contents.to_string());
    }

    pub fn remove_file(&self, path: &str) {
        self.inner.lock().unwrap().worktree.remove(path);
    }

    pub fn read_file(&self, path: &str) -> Option<String> {
        self.inner.lock().unwrap().worktree.get(path).cloned()
    }

    /// Write files, stage everything, and commit without recording operations.
    pub fn commit_files(&self, files: &[(&str, &str)], message: &str) -> Oid {
        let mut inner = self.inner.lock().unwrap();
        for (path, contents) in files {
            inner
                .worktree
                .insert(path.to_string(), contents.to_string());
        }
        inner.index = inner.worktree.clone();

        let parents = inner.head_tip().into_iter().collect();
        let tree = inner.index.clone();
        let oid = inner.new_commit(parents, message, tree);
        inner.move_head(oid.clone());
        oid
    }

    /// Create a commit on the remote only, as if someone else pushed it.
    pub fn push_remote_commit(&self, branch: &str, files: &[(&str, &str)], message: &str) -> Oid {
        let mut inner = self.inner.lock().unwrap();
        let base = inner
            .remote_branches
            .get(branch)
            .or_else(|| inner.branches.get(branch))
            .cloned();

        let mut tree = inner.tree_of(base.as_ref());
        for (path, contents) in files {
            tree.insert(path.to_string(), contents.to_string());
        }

        let oid = inner.new_commit(base.into_iter().collect(), message, tree);
        inner.remote_branches.insert(branch.to_string(), oid.clone());
        oid
    }

    /// Tree contents recorded at `oid`.
    pub fn tree_at(&self, oid: &Oid) -> BTreeMap<String, String> {
        self.inner.lock().unwrap().tree_of(Some(oid))
    }

    pub fn parents_of(&self, oid: &Oid) -> Vec<Oid> {
        let inner = self.inner.lock().unwrap();
        inner
            .commits
            .get(oid.as_str())
            .map(|c| c.parents.clone())
            .unwrap_or_default()
    }

    pub fn message_of(&self, oid: &Oid) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.commits.get(oid.as_str()).map(|c| c.message.clone())
    }

    /// Whether `ancestor` is reachable from `descendant` (inclusive).
    pub fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> bool {
        self.inner.lock().unwrap().is_ancestor(ancestor, descendant)
    }

    pub fn branch_tip(&self, name: &str) -> Option<Oid> {
        self.inner.lock().unwrap().branches.get(name).cloned()
    }

    pub fn branch_names(&self) -> Vec<String> {
        self.inner.lock().unwrap().branches.keys().cloned().collect()
    }

    pub fn remote_tip(&self, branch: &str) -> Option<Oid> {
        self.inner.lock().unwrap().remote_branches.get(branch).cloned()
    }

    pub fn commit_count(&self) -> usize {
        self.inner.lock().unwrap().commits.len()
    }

    pub fn reflog_len(&self) -> usize {
        self.inner.lock().unwrap().reflog.len()
    }

    /// Drop every reflog entry, like `git reflog expire --expire=now --all`.
    pub fn expire_reflog(&self) {
        self.inner.lock().unwrap().reflog.clear();
    }

    pub fn config_value(&self, key: &str) -> Option<String> {
        self.inner.lock().unwrap().config.get(key).cloned()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn record(&self, op: MockOperation) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(trace) = &inner.trace {
            trace.lock().unwrap().push(format!("repo: {}", op.label()));
        }
        inner.operations.push(op);
    }

    /// Check if we should fail and return the error if so.
    fn check_fail(&self, expected: &str, target: Option<&str>) -> Result<(), DriverError> {
        let inner = self.inner.lock().unwrap();
        let err = match &inner.fail_on {
            Some(FailOn::Checkout(e)) if expected == "checkout" => e,
            Some(FailOn::Reset(only, e)) if expected == "reset" => match only {
                Some(only) if Some(only.as_str()) != target => return Ok(()),
                _ => e,
            },
            Some(FailOn::Stage(e)) if expected == "stage" => e,
            Some(FailOn::Commit(e)) if expected == "commit" => e,
            Some(FailOn::CreateBranch(e)) if expected == "create_branch" => e,
            Some(FailOn::DeleteBranch(e)) if expected == "delete_branch" => e,
            Some(FailOn::Merge(e)) if expected == "merge" => e,
            Some(FailOn::Fetch(e)) if expected == "fetch" => e,
            Some(FailOn::Pull(e)) if expected == "pull" => e,
            Some(FailOn::Push(e)) if expected == "push" => e,
            Some(FailOn::Run(e)) if expected == "run" => e,
            _ => return Ok(()),
        };
        Err(err.clone())
    }

    fn ensure_repo(&self) -> Result<(), DriverError> {
        if self.inner.lock().unwrap().initialized {
            Ok(())
        } else {
            Err(DriverError::NotARepo {
                path: "<mock>".to_string(),
            })
        }
    }

    fn failed(command: &str, stderr: &str) -> DriverError {
        DriverError::CommandFailed {
            command: format!("git {}", command),
            stderr: stderr.to_string(),
        }
    }

    fn log_range(&self, range: &str) -> Result<String, DriverError> {
        let inner = self.inner.lock().unwrap();
        let (from, to) = range
            .split_once("..")
            .ok_or_else(|| Self::failed("log", "unsupported range"))?;

        let exclude: HashSet<Oid> = inner.reachable(&inner.resolve(from)?).into_iter().collect();
        let lines: Vec<String> = inner
            .reachable(&inner.resolve(to)?)
            .into_iter()
            .filter(|oid| !exclude.contains(oid))
            .map(|oid| {
                let summary = inner
                    .commits
                    .get(oid.as_str())
                    .and_then(|c| c.message.lines().next())
                    .unwrap_or_default()
                    .to_string();
                format!("{} {}\n", oid, summary)
            })
            .collect();

        Ok(lines.concat())
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryDriver for MockRepository {
    fn is_repo(&self) -> bool {
        self.inner.lock().unwrap().initialized
    }

    fn init(&self) -> Result<(), DriverError> {
        self.record(MockOperation::Init);
        self.inner.lock().unwrap().initialized = true;
        Ok(())
    }

    fn remote(&self) -> &str {
        // The remote name never changes after construction.
        "origin"
    }

    fn current_branch(&self) -> Result<Option<BranchName>, DriverError> {
        self.ensure_repo()?;
        let inner = self.inner.lock().unwrap();
        if inner.head_tip().is_none() {
            return Ok(None);
        }
        Ok(Some(BranchName::new(inner.head.clone())?))
    }

    fn current_revision(&self) -> Result<Oid, DriverError> {
        self.ensure_repo()?;
        self.inner
            .lock()
            .unwrap()
            .head_tip()
            .ok_or_else(|| DriverError::RefNotFound {
                refname: "HEAD".to_string(),
            })
    }

    fn resolve(&self, revision: &str) -> Result<Oid, DriverError> {
        self.ensure_repo()?;
        self.inner.lock().unwrap().resolve(revision)
    }

    fn worktree_status(&self) -> Result<WorktreeStatus, DriverError> {
        self.ensure_repo()?;
        let inner = self.inner.lock().unwrap();
        let head_tree = inner.tree_of(inner.head_tip().as_ref());

        let staged = head_tree
            .keys()
            .chain(inner.index.keys())
            .collect::<HashSet<_>>()
            .into_iter()
            .filter(|path| head_tree.get(*path) != inner.index.get(*path))
            .count();
        let unstaged = inner
            .index
            .iter()
            .filter(|(path, contents)| inner.worktree.get(*path) != Some(*contents))
            .count();

        Ok(WorktreeStatus {
            staged,
            unstaged,
            untracked: inner.untracked().len(),
            has_conflicts: false,
        })
    }

    fn ancestors(&self, from: &Oid, limit: usize) -> Result<Vec<Oid>, DriverError> {
        self.ensure_repo()?;
        let inner = self.inner.lock().unwrap();
        if !inner.commits.contains_key(from.as_str()) {
            return Err(DriverError::RevisionNotFound {
                revision: from.to_string(),
            });
        }

        let mut out = Vec::new();
        let mut cursor = Some(from.clone());
        while let Some(oid) = cursor {
            if out.len() == limit {
                break;
            }
            cursor = inner
                .commits
                .get(oid.as_str())
                .and_then(|c| c.parents.first().cloned());
            out.push(oid);
        }
        Ok(out)
    }

    fn checkout(&self, branch: &BranchName) -> Result<(), DriverError> {
        self.record(MockOperation::Checkout {
            branch: branch.to_string(),
        });
        self.ensure_repo()?;
        self.check_fail("checkout", None)?;

        let mut inner = self.inner.lock().unwrap();
        let target = inner
            .branches
            .get(branch.as_str())
            .cloned()
            .ok_or_else(|| DriverError::RefNotFound {
                refname: branch.to_string(),
            })?;

        if inner.head == branch.as_str() {
            return Ok(());
        }
        if inner.tracked_dirty() && inner.head_tip().as_ref() != Some(&target) {
            return Err(Self::failed(
                &format!("checkout {}", branch),
                "Your local changes to the following files would be overwritten by checkout",
            ));
        }

        let moved = inner.head_tip().as_ref() != Some(&target);
        inner.head = branch.to_string();
        if moved {
            inner.reflog.push(target.clone());
        }
        let tree = inner.tree_of(Some(&target));
        inner.materialize(tree, false);
        Ok(())
    }

    fn reset(
        &self,
        mode: ResetMode,
        target: &str,
        clean_untracked: bool,
    ) -> Result<(), DriverError> {
        self.record(MockOperation::Reset {
            mode,
            target: target.to_string(),
            clean: clean_untracked,
        });
        self.ensure_repo()?;
        self.check_fail("reset", Some(target))?;

        let mut inner = self.inner.lock().unwrap();
        let oid = inner.resolve(target)?;
        inner.move_head(oid.clone());

        let tree = inner.tree_of(Some(&oid));
        match mode {
            ResetMode::Soft => {}
            ResetMode::Mixed => inner.index = tree,
            ResetMode::Hard => inner.materialize(tree, false),
        }
        if clean_untracked {
            let untracked = inner.untracked();
            for path in untracked.keys() {
                inner.worktree.remove(path);
            }
        }
        Ok(())
    }

    fn stage(&self, paths: &[String]) -> Result<(), DriverError> {
        self.record(MockOperation::Stage {
            paths: paths.to_vec(),
        });
        self.ensure_repo()?;
        self.check_fail("stage", None)?;

        let mut inner = self.inner.lock().unwrap();
        for path in paths {
            match inner.worktree.get(path).cloned() {
                Some(contents) => {
                    inner.index.insert(path.clone(), contents);
                }
                None if inner.index.contains_key(path) => {
                    inner.index.remove(path);
                }
                None => {
                    return Err(Self::failed(
                        "add",
                        &format!("pathspec '{}' did not match any files", path),
                    ))
                }
            }
        }
        Ok(())
    }

    fn stage_all(&self) -> Result<(), DriverError> {
        self.record(MockOperation::StageAll);
        self.ensure_repo()?;
        self.check_fail("stage", None)?;

        let mut inner = self.inner.lock().unwrap();
        inner.index = inner.worktree.clone();
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<Oid, DriverError> {
        self.record(MockOperation::Commit {
            message: message.to_string(),
        });
        self.ensure_repo()?;
        self.check_fail("commit", None)?;

        let mut inner = self.inner.lock().unwrap();
        if message.trim().is_empty() {
            return Err(Self::failed(
                "commit",
                "Aborting commit due to empty commit message.",
            ));
        }
        let head_tree = inner.tree_of(inner.head_tip().as_ref());
        if inner.index == head_tree {
            return Err(Self::failed("commit", "nothing to commit, working tree clean"));
        }

        let parents = inner.head_tip().into_iter().collect();
        let tree = inner.index.clone();
        let oid = inner.new_commit(parents, message, tree);
        inner.move_head(oid.clone());
        Ok(oid)
    }

    fn create_branch(&self, name: &BranchName) -> Result<(), DriverError> {
        self.record(MockOperation::CreateBranch {
            name: name.to_string(),
        });
        self.ensure_repo()?;
        self.check_fail("create_branch", None)?;

        let mut inner = self.inner.lock().unwrap();
        if inner.branches.contains_key(name.as_str()) {
            return Err(Self::failed(
                "branch",
                &format!("a branch named '{}' already exists", name),
            ));
        }
        let tip = inner
            .head_tip()
            .ok_or_else(|| Self::failed("branch", "not a valid object name: 'HEAD'"))?;
        inner.branches.insert(name.to_string(), tip);
        Ok(())
    }

    fn delete_branch(&self, name: &BranchName) -> Result<(), DriverError> {
        self.record(MockOperation::DeleteBranch {
            name: name.to_string(),
        });
        self.ensure_repo()?;
        self.check_fail("delete_branch", None)?;

        let mut inner = self.inner.lock().unwrap();
        if inner.head == name.as_str() {
            return Err(Self::failed(
                "branch -D",
                &format!("Cannot delete branch '{}' checked out", name),
            ));
        }
        inner
            .branches
            .remove(name.as_str())
            .map(|_| ())
            .ok_or_else(|| DriverError::RefNotFound {
                refname: name.to_string(),
            })
    }

    fn merge(&self, branch: &BranchName) -> Result<(), DriverError> {
        self.record(MockOperation::Merge {
            branch: branch.to_string(),
        });
        self.ensure_repo()?;
        self.check_fail("merge", None)?;

        let mut inner = self.inner.lock().unwrap();
        let theirs = inner
            .branches
            .get(branch.as_str())
            .cloned()
            .ok_or_else(|| DriverError::RefNotFound {
                refname: branch.to_string(),
            })?;
        inner.merge_into_head(branch.as_str(), theirs)
    }

    fn fetch(&self) -> Result<(), DriverError> {
        self.record(MockOperation::Fetch);
        self.ensure_repo()?;
        self.check_fail("fetch", None)?;

        let mut inner = self.inner.lock().unwrap();
        inner.tracking = inner.remote_branches.clone();
        Ok(())
    }

    fn pull(&self, incoming: &[CommitSummary]) -> Result<(), DriverError> {
        self.record(MockOperation::Pull {
            incoming: incoming.len(),
        });
        self.ensure_repo()?;
        self.check_fail("pull", None)?;

        let mut inner = self.inner.lock().unwrap();
        inner.tracking = inner.remote_branches.clone();

        let branch = inner.head.clone();
        let theirs = inner
            .remote_branches
            .get(&branch)
            .cloned()
            .ok_or_else(|| DriverError::Remote {
                operation: "pull".to_string(),
                message: format!("couldn't find remote ref {}", branch),
            })?;
        inner.merge_into_head(&branch, theirs)
    }

    fn push(&self) -> Result<(), DriverError> {
        self.record(MockOperation::Push);
        self.ensure_repo()?;
        self.check_fail("push", None)?;

        let mut inner = self.inner.lock().unwrap();
        let tip = inner.head_tip().ok_or_else(|| DriverError::Remote {
            operation: "push".to_string(),
            message: "src refspec HEAD does not match any".to_string(),
        })?;
        let branch = inner.head.clone();
        inner.remote_branches.insert(branch.clone(), tip.clone());
        inner.tracking.insert(branch, tip);
        Ok(())
    }

    fn run(&self, command: &str, args: &[&str]) -> Result<String, DriverError> {
        self.record(MockOperation::Run {
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        });
        self.ensure_repo()?;
        self.check_fail("run", None)?;

        match (command, args) {
            ("log", [range, ..]) => self.log_range(range),
            ("push", [_, "--delete", branch]) => {
                let mut inner = self.inner.lock().unwrap();
                inner.tracking.remove(*branch);
                inner
                    .remote_branches
                    .remove(*branch)
                    .map(|_| String::new())
                    .ok_or_else(|| DriverError::Remote {
                        operation: "push".to_string(),
                        message: format!("unable to delete '{}': remote ref does not exist", branch),
                    })
            }
            _ => Ok(String::new()),
        }
    }

    fn get_config(&self, namespace: &str, key: &str) -> Result<Option<String>, DriverError> {
        self.ensure_repo()?;
        let name = format!("{}.{}", namespace, key);
        Ok(self.inner.lock().unwrap().config.get(&name).cloned())
    }

    fn set_config(&self, namespace: &str, key: &str, value: &str) -> Result<(), DriverError> {
        let name = format!("{}.{}", namespace, key);
        self.record(MockOperation::SetConfig {
            key: name.clone(),
            value: value.to_string(),
        });
        self.ensure_repo()?;
        self.inner
            .lock()
            .unwrap()
            .config
            .insert(name, value.to_string());
        Ok(())
    }
}
