//! engine::orchestrator
//!
//! The [`Orchestrator`]: one synchronous actor that owns the order of
//! repository mutations and data-store operations for a single request.
//!
//! Operations live in sibling modules (`checkout`, `commit`, `branch`,
//! `merge`, `sync`, `discard`, `revert`, `setup`) as `impl Orchestrator` blocks. This
//! module holds the dispatch and the helpers they share.

use crate::audit::{Category, Notifier};
use crate::core::config::{PolicyDefaults, DEFAULT_SITE_NAME};
use crate::core::policy::{Policy, PolicyKey};
use crate::core::records::RecordStore;
use crate::core::types::{Oid, SnapshotId};
use crate::git::{DriverError, RepositoryDriver};
use crate::snapshot::{SnapshotScope, SnapshotStore};

use super::events::{Event, EventBus};
use super::request::{Outcome, Request};
use super::EngineError;

/// How many first-parent ancestors to search for a paired snapshot.
pub const RESTORE_SEARCH_DEPTH: usize = 100;

/// Coordinates the repository driver, snapshot store, record store,
/// audit sink, and event bus for one repository.
///
/// Holds only borrowed collaborators, so it is cheap to build per request.
pub struct Orchestrator<'a> {
    pub(super) repo: &'a dyn RepositoryDriver,
    pub(super) snapshots: &'a dyn SnapshotStore,
    pub(super) records: &'a dyn RecordStore,
    pub(super) audit: &'a dyn Notifier,
    pub(super) events: &'a EventBus,
    pub(super) site_name: String,
    policy_defaults: PolicyDefaults,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        repo: &'a dyn RepositoryDriver,
        snapshots: &'a dyn SnapshotStore,
        records: &'a dyn RecordStore,
        audit: &'a dyn Notifier,
        events: &'a EventBus,
    ) -> Self {
        Self {
            repo,
            snapshots,
            records,
            audit,
            events,
            site_name: DEFAULT_SITE_NAME.to_string(),
            policy_defaults: PolicyDefaults::default(),
        }
    }

    /// Name used in audit lines and notification subjects.
    pub fn with_site_name(mut self, name: impl Into<String>) -> Self {
        self.site_name = name.into();
        self
    }

    /// Policy values used when git config has no `revkeep.*` key.
    pub fn with_policy_defaults(mut self, defaults: PolicyDefaults) -> Self {
        self.policy_defaults = defaults;
        self
    }

    /// Run the single operation `request` names.
    pub fn handle(&self, request: Request) -> Result<Outcome, EngineError> {
        let op = request.name();
        let span = tracing::info_span!("op", op);
        let _guard = span.enter();
        tracing::debug!("dispatch");

        let result = match request {
            Request::Init => self.init_repo(),
            Request::Checkout(req) => self.checkout(&req),
            Request::Commit(req) => self.commit(&req),
            Request::CreateBranch(req) => self.create_branch(&req),
            Request::DeleteBranch(req) => self.delete_branch(&req),
            Request::Merge(req) => self.merge(&req),
            Request::Pull => self.pull(),
            Request::Push => self.push(),
            Request::Discard => self.discard(),
            Request::Revert(req) => self.revert(&req),
            Request::RevertFiles { branch, revision } => self.revert_files(&branch, &revision),
            Request::Import(req) => self.import_untracked(&req),
        };

        match &result {
            Ok(outcome) => tracing::info!(summary = %outcome.summary(), "completed"),
            Err(err) => tracing::warn!(error = %err, "failed"),
        }
        result
    }

    pub fn policy(&self) -> Policy<'_> {
        Policy::new(self.repo, self.policy_defaults.clone())
    }

    pub(super) fn policy_enabled(&self, key: PolicyKey) -> Result<bool, EngineError> {
        Ok(self.policy().enabled(key)?)
    }

    pub(super) fn fire(&self, event: Event) {
        self.events.fire(&event);
    }

    /// Write an audit line. Failures are logged and swallowed.
    pub(super) fn audit(&self, message: &str, category: Category) {
        if let Err(err) = self.audit.log(message, category) {
            tracing::warn!(%category, error = %err, "audit write failed");
        }
    }

    /// Send a notification. Failures are logged and swallowed.
    pub(super) fn notify(&self, subject: &str, body: &str) {
        if let Err(err) = self.audit.notify(subject, body) {
            tracing::warn!(subject, error = %err, "notification failed");
        }
    }

    /// Fail with `DirtyAfter` unless tracked files match HEAD.
    pub(super) fn ensure_clean(&self, operation: &str) -> Result<(), EngineError> {
        let status = self.repo.worktree_status()?;
        if status.is_clean() {
            Ok(())
        } else {
            Err(DriverError::DirtyAfter {
                operation: operation.to_string(),
            }
            .into())
        }
    }

    /// Full snapshot keyed by the current revision.
    ///
    /// An unborn branch has no revision to pair with, so nothing is taken.
    pub(super) fn snapshot_current(&self) -> Result<Option<SnapshotId>, EngineError> {
        let revision = match self.repo.current_revision() {
            Ok(rev) => rev,
            Err(DriverError::RefNotFound { .. }) => {
                tracing::warn!("no commits yet, skipping snapshot");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let record = self.snapshots.snapshot(&SnapshotScope::Full, &revision)?;
        tracing::debug!(id = %record.id, units = record.units.len(), "snapshot taken");
        Ok(Some(record.id))
    }

    /// Restore the snapshot paired with HEAD or its nearest first-parent
    /// ancestor. Finding none is a logged no-op.
    pub(super) fn restore_for_head(&self) -> Result<Option<SnapshotId>, EngineError> {
        match self.repo.current_revision() {
            Ok(head) => self.restore_nearest(&head),
            Err(DriverError::RefNotFound { .. }) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub(super) fn restore_nearest(&self, from: &Oid) -> Result<Option<SnapshotId>, EngineError> {
        for revision in self.repo.ancestors(from, RESTORE_SEARCH_DEPTH)? {
            if let Some(record) = self.snapshots.latest_for(&revision)? {
                self.snapshots.restore(&record.id, &SnapshotScope::Full)?;
                tracing::debug!(id = %record.id, from = %from.short(7), "restored paired snapshot");
                return Ok(Some(record.id));
            }
        }

        tracing::warn!(
            from = %from.short(7),
            depth = RESTORE_SEARCH_DEPTH,
            "no snapshot found for revision or its ancestors, data left as is"
        );
        Ok(None)
    }
}
