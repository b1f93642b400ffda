//! engine::merge

use crate::audit::Category;

use super::events::Event;
use super::orchestrator::Orchestrator;
use super::request::{MergeRequest, Outcome};
use super::EngineError;

impl Orchestrator<'_> {
    /// Merge a branch into the current one.
    ///
    /// Conflicts come back as `DriverError::MergeConflict` untouched; the
    /// driver has already aborted the merge by then. With `import_data`,
    /// the snapshot paired with the merged state (or its nearest ancestor)
    /// is restored.
    pub fn merge(&self, request: &MergeRequest) -> Result<Outcome, EngineError> {
        let branch = &request.branch;

        self.fire(Event::PreMerge {
            branch: branch.clone(),
        });

        self.repo.merge(branch)?;
        self.ensure_clean("merge")?;

        let restored = if request.import_data {
            self.restore_for_head()?
        } else {
            None
        };

        let current = self
            .repo
            .current_branch()?
            .map(|b| b.to_string())
            .unwrap_or_else(|| "HEAD".to_string());
        self.audit(
            &format!("Merged {} into {}.", branch, current),
            Category::Merge,
        );
        self.fire(Event::PostMerge {
            branch: branch.clone(),
        });

        Ok(Outcome::Merged {
            branch: branch.clone(),
            restored,
        })
    }
}
