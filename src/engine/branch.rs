//! engine::branch
//!
//! Create and delete branches. Neither touches the data store.

use crate::audit::Category;

use super::events::Event;
use super::orchestrator::Orchestrator;
use super::request::{CreateBranchRequest, DeleteBranchRequest, Outcome};
use super::EngineError;

impl Orchestrator<'_> {
    /// Create a branch at HEAD and optionally switch to it.
    ///
    /// The switch is a plain checkout: the new branch shares the current
    /// tree, so there is nothing to snapshot or restore.
    pub fn create_branch(&self, request: &CreateBranchRequest) -> Result<Outcome, EngineError> {
        let branch = &request.name;

        self.repo
            .create_branch(branch)
            .map_err(|source| EngineError::BranchCreate {
                branch: branch.clone(),
                source,
            })?;

        self.audit(&format!("Created new branch: {}", branch), Category::Branch);
        self.fire(Event::PostBranchCreated {
            branch: branch.clone(),
        });

        if request.checkout {
            self.repo.checkout(branch)?;
        }

        Ok(Outcome::BranchCreated {
            branch: branch.clone(),
            checked_out: request.checkout,
        })
    }

    /// Delete a branch, and its remote counterpart when asked.
    ///
    /// The checked-out branch is never deleted; that request is refused
    /// without error.
    pub fn delete_branch(&self, request: &DeleteBranchRequest) -> Result<Outcome, EngineError> {
        let branch = &request.branch;

        if self.repo.current_branch()?.as_ref() == Some(branch) {
            tracing::info!(%branch, "refusing to delete the checked-out branch");
            return Ok(Outcome::Refused {
                reason: format!("'{}' is the checked-out branch", branch),
            });
        }

        self.repo.delete_branch(branch)?;

        if request.delete_remote {
            let remote = self.repo.remote().to_string();
            self.repo
                .run("push", &[remote.as_str(), "--delete", branch.as_str()])?;
        }

        let where_ = if request.delete_remote {
            " (local and remote)"
        } else {
            ""
        };
        self.audit(
            &format!("Deleted branch: {}{}", branch, where_),
            Category::Branch,
        );
        self.fire(Event::PostBranchDeleted {
            branch: branch.clone(),
        });

        Ok(Outcome::BranchDeleted {
            branch: branch.clone(),
            remote_deleted: request.delete_remote,
        })
    }
}
