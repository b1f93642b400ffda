//! engine::checkout
//!
//! Switch branches, carrying the data store along when policy asks.
//!
//! With `snapshot-on-checkout` on, the data store is captured at the old
//! tip before switching and restored from the new tip's paired snapshot
//! afterwards. A freshly created branch shares the old tree, so it skips
//! the restore.

use crate::audit::Category;
use crate::core::policy::PolicyKey;
use crate::git::ResetMode;

use super::events::Event;
use super::orchestrator::Orchestrator;
use super::request::{CheckoutRequest, Outcome};
use super::EngineError;

impl Orchestrator<'_> {
    pub fn checkout(&self, request: &CheckoutRequest) -> Result<Outcome, EngineError> {
        let branch = &request.branch;
        let carry_data = self.policy_enabled(PolicyKey::SnapshotOnCheckout)?;

        if carry_data {
            self.snapshot_current()?;
        }

        self.fire(Event::PreCheckout {
            branch: branch.clone(),
        });

        self.repo.reset(ResetMode::Hard, "HEAD", true)?;
        self.repo.checkout(branch)?;

        let restored = if carry_data && !request.new_branch {
            self.restore_for_head()?
        } else {
            None
        };

        self.ensure_clean("checkout")?;

        self.audit(&format!("Checked out branch: {}.", branch), Category::Checkout);
        self.fire(Event::PostCheckout {
            branch: branch.clone(),
        });

        Ok(Outcome::CheckedOut {
            branch: branch.clone(),
            restored,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{BranchName, SnapshotId};
    use crate::engine::testing::Harness;
    use crate::git::mock::FailOn;
    use crate::git::{DriverError, RepositoryDriver};
    use crate::snapshot::{SnapshotScope, SnapshotStore};

    fn request(branch: &str, new_branch: bool) -> CheckoutRequest {
        CheckoutRequest {
            branch: BranchName::new(branch).unwrap(),
            new_branch,
        }
    }

    /// `main` and `feature` diverge by one commit each; each tip has data.
    fn two_branches(h: &Harness) -> (crate::core::types::Oid, crate::core::types::Oid) {
        let base = h.repo.commit_files(&[("a.txt", "base")], "base");
        h.repo
            .create_branch(&BranchName::new("feature").unwrap())
            .unwrap();
        let main_tip = h.repo.commit_files(&[("a.txt", "main")], "main work");

        h.repo.checkout(&BranchName::new("feature").unwrap()).unwrap();
        let feature_tip = h.repo.commit_files(&[("b.txt", "feature")], "feature work");
        h.snapshots.set_unit("posts", "feature data");
        h.snapshots
            .snapshot(&SnapshotScope::Full, &feature_tip)
            .unwrap();

        h.repo.checkout(&BranchName::new("main").unwrap()).unwrap();
        h.snapshots.set_unit("posts", "main data");
        assert_ne!(base, main_tip);
        h.clear_trace();
        (main_tip, feature_tip)
    }

    #[test]
    fn snapshot_then_checkout_then_restore() {
        let h = Harness::new();
        let (main_tip, feature_tip) = two_branches(&h);
        h.enable(PolicyKey::SnapshotOnCheckout);

        let outcome = h.engine().checkout(&request("feature", false)).unwrap();

        assert_eq!(
            h.calls(),
            vec![
                format!("data: snapshot full @{}", main_tip.short(7)),
                "repo: reset --hard HEAD +clean".to_string(),
                "repo: checkout feature".to_string(),
                format!("data: restore full @{}", feature_tip.short(7)),
            ]
        );
        assert_eq!(
            outcome,
            Outcome::CheckedOut {
                branch: BranchName::new("feature").unwrap(),
                restored: Some(SnapshotId::sequenced(&feature_tip, 1)),
            }
        );
        assert_eq!(h.snapshots.unit("posts").as_deref(), Some("feature data"));
        assert_eq!(h.event_names(), vec!["pre_checkout", "post_checkout"]);
        assert_eq!(
            h.audit.logs(),
            vec![(Category::Checkout, "Checked out branch: feature.".to_string())]
        );
    }

    #[test]
    fn policy_off_touches_no_data() {
        let h = Harness::new();
        two_branches(&h);

        h.engine().checkout(&request("feature", false)).unwrap();

        assert_eq!(
            h.calls(),
            vec!["repo: reset --hard HEAD +clean", "repo: checkout feature"]
        );
        assert_eq!(h.snapshots.unit("posts").as_deref(), Some("main data"));
        assert_eq!(h.repo.current_branch().unwrap().unwrap().as_str(), "feature");
    }

    #[test]
    fn new_branch_skips_restore() {
        let h = Harness::new();
        two_branches(&h);
        h.enable(PolicyKey::SnapshotOnCheckout);
        h.repo
            .create_branch(&BranchName::new("fresh").unwrap())
            .unwrap();
        h.clear_trace();

        let outcome = h.engine().checkout(&request("fresh", true)).unwrap();

        assert!(matches!(outcome, Outcome::CheckedOut { restored: None, .. }));
        assert!(!h.calls().iter().any(|c| c.starts_with("data: restore")));
    }

    #[test]
    fn hard_reset_discards_local_edits_first() {
        let h = Harness::new();
        two_branches(&h);
        h.repo.write_file("a.txt", "uncommitted");
        h.repo.write_file("scratch.txt", "untracked");

        h.engine().checkout(&request("feature", false)).unwrap();

        assert_eq!(h.repo.read_file("a.txt").as_deref(), Some("base"));
        assert_eq!(h.repo.read_file("scratch.txt"), None);
    }

    #[test]
    fn failed_checkout_skips_restore_and_post_event() {
        let h = Harness::new();
        two_branches(&h);
        h.enable(PolicyKey::SnapshotOnCheckout);
        h.repo.set_fail_on(FailOn::Checkout(DriverError::RefNotFound {
            refname: "feature".into(),
        }));

        let err = h.engine().checkout(&request("feature", false)).unwrap_err();

        assert!(matches!(err, EngineError::Driver(DriverError::RefNotFound { .. })));
        assert!(!h.calls().iter().any(|c| c.starts_with("data: restore")));
        assert_eq!(h.event_names(), vec!["pre_checkout"]);
        assert!(h.audit.logs().is_empty());
    }

    #[test]
    fn missing_branch_is_a_driver_error() {
        let h = Harness::new();
        h.repo.commit_files(&[("a.txt", "1")], "base");
        let err = h.engine().checkout(&request("nope", false)).unwrap_err();
        assert!(matches!(err, EngineError::Driver(DriverError::RefNotFound { .. })));
    }
}
