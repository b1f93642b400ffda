//! engine::sync
//!
//! Exchange commits with the remote.
//!
//! A pull always starts from a clean tree: local edits are discarded
//! before anything is fetched. When `snapshot-on-pull` is on, the data
//! store is captured after the fetch and before the merge, and the
//! snapshot id is remembered under `revkeep.last-snapshot-id` as the undo
//! point. A pull that fails after that step leaves the undo point in place.

use crate::audit::Category;
use crate::core::policy::PolicyKey;
use crate::git::{CommitSummary, ResetMode};

use super::events::Event;
use super::orchestrator::Orchestrator;
use super::request::Outcome;
use super::EngineError;

impl Orchestrator<'_> {
    pub fn pull(&self) -> Result<Outcome, EngineError> {
        let branch = self.repo.current_branch()?.ok_or_else(|| {
            EngineError::Validation("pull needs a checked-out branch with commits".to_string())
        })?;
        let remote = self.repo.remote().to_string();

        self.repo.reset(ResetMode::Hard, "HEAD", true)?;
        self.ensure_clean("pull")?;

        self.repo.fetch()?;
        let range = format!("{branch}..{remote}/{branch}");
        let log = self.repo.run("log", &[range.as_str(), "--pretty=oneline"])?;
        let incoming = CommitSummary::parse_oneline(&log)?;
        tracing::debug!(%branch, incoming = incoming.len(), "fetched");

        let undo_point = if self.policy_enabled(PolicyKey::SnapshotOnPull)? {
            let id = self.snapshot_current()?;
            if let Some(id) = &id {
                self.policy().record_last_snapshot(id)?;
            }
            id
        } else {
            None
        };

        self.fire(Event::PrePull {
            commits: incoming.clone(),
        });

        self.repo.pull(&incoming)?;

        self.audit(
            &format!(
                "Pulled {} new commit(s) from {}/{}.",
                incoming.len(),
                remote,
                branch
            ),
            Category::Pull,
        );
        self.fire(Event::PostPull {
            incoming: incoming.len(),
        });

        Ok(Outcome::Pulled {
            incoming,
            undo_point,
        })
    }

    pub fn push(&self) -> Result<Outcome, EngineError> {
        self.fire(Event::PrePush);

        self.repo.push()?;

        let target = match self.repo.current_branch()? {
            Some(branch) => format!("{}/{}", self.repo.remote(), branch),
            None => self.repo.remote().to_string(),
        };
        self.audit(&format!("Pushed changes to {}.", target), Category::Push);
        self.fire(Event::PostPush);

        Ok(Outcome::Pushed)
    }
}
