//! cli::workspace
//!
//! Production wiring: one repository, its config, and the on-disk stores
//! the orchestrator borrows.

use std::path::Path;

use anyhow::{Context as _, Result};

use super::Context;
use crate::audit::AuditLog;
use crate::core::config::Config;
use crate::core::paths::RevkeepPaths;
use crate::core::records::FileRecordStore;
use crate::core::types::OpId;
use crate::engine::{EventBus, Orchestrator};
use crate::git::Git;
use crate::snapshot::FileSnapshotStore;
use crate::ui::output::{self, Verbosity};

/// Everything a command needs to build an [`Orchestrator`].
#[derive(Debug)]
pub struct Workspace {
    git: Git,
    paths: RevkeepPaths,
    config: Config,
    snapshots: FileSnapshotStore,
    records: FileRecordStore,
    audit: AuditLog,
    events: EventBus,
}

impl Workspace {
    /// Open the repository containing the context's working directory.
    pub fn open(ctx: &Context) -> Result<Self> {
        let cwd = ctx.work_dir()?;
        let probe = Git::open(&cwd, "origin")
            .with_context(|| format!("No repository at {}. Run 'rk init' first.", cwd.display()))?;
        let git_dir = probe.git_dir().context("Failed to locate .git directory")?;
        let paths = RevkeepPaths::new(git_dir);

        let config = Config::load(Some(&paths)).context("Failed to load config")?;
        let git = Git::new(probe.work_dir().to_path_buf(), config.remote());

        paths
            .ensure_dirs()
            .with_context(|| format!("Failed to create {}", paths.root().display()))?;

        Self::assemble(git, paths, config, ctx.verbosity())
    }

    /// A workspace for a directory that may not hold a repository yet.
    pub fn for_init(ctx: &Context) -> Result<Self> {
        let cwd = ctx.work_dir()?;
        let paths = RevkeepPaths::new(cwd.join(".git"));
        let config = Config::load(None).context("Failed to load config")?;
        let git = Git::new(cwd, config.remote());

        Self::assemble(git, paths, config, ctx.verbosity())
    }

    fn assemble(git: Git, paths: RevkeepPaths, config: Config, verbosity: Verbosity) -> Result<Self> {
        let data_dir = config
            .data_dir(&paths, git.work_dir())
            .context("Failed to load config")?;
        let snapshots = FileSnapshotStore::new(data_dir, paths.snapshots_dir());
        let records = FileRecordStore::new(paths.clone());
        let audit = AuditLog::new(paths.audit_log_path())
            .with_notifications(config.notifications_enabled())
            .with_op_id(OpId::new());

        let mut events = EventBus::new();
        events.subscribe(move |event| output::debug(format!("event: {}", event.name()), verbosity));

        Ok(Self {
            git,
            paths,
            config,
            snapshots,
            records,
            audit,
            events,
        })
    }

    pub fn orchestrator(&self) -> Orchestrator<'_> {
        Orchestrator::new(
            &self.git,
            &self.snapshots,
            &self.records,
            &self.audit,
            &self.events,
        )
        .with_site_name(self.config.site_name())
        .with_policy_defaults(self.config.policy_defaults())
    }

    pub fn git(&self) -> &Git {
        &self.git
    }

    pub fn work_dir(&self) -> &Path {
        self.git.work_dir()
    }

    pub fn paths(&self) -> &RevkeepPaths {
        &self.paths
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn snapshots(&self) -> &FileSnapshotStore {
        &self.snapshots
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Whether the global config asks for JSON logs. Unreadable config
    /// counts as no; the command will report it once it loads config itself.
    pub fn global_log_json() -> bool {
        Config::load(None).map(|c| c.log_json()).unwrap_or(false)
    }
}
