//! core::naming
//!
//! Branch naming rules for user-typed input.
//!
//! Branch names cannot contain whitespace, so a name typed as
//! `"my new feature"` is turned into `"my-new-feature"` before it reaches git.

use super::types::{BranchName, TypeError};

/// Separator substituted for whitespace in branch names.
pub const BRANCH_SEPARATOR: char = '-';

/// Replace every whitespace character with [`BRANCH_SEPARATOR`] and trim the
/// ends, then validate the result as a branch name.
///
/// Each whitespace character maps to one separator, so `"a  b"` becomes
/// `"a--b"`; this mirrors a plain character substitution and keeps the
/// mapping predictable for the user who typed it.
///
/// # Example
///
/// ```
/// use revkeep::core::naming::normalize_branch_name;
///
/// assert_eq!(normalize_branch_name("my new feature").unwrap().as_str(), "my-new-feature");
/// assert_eq!(normalize_branch_name("  hotfix ").unwrap().as_str(), "hotfix");
/// assert!(normalize_branch_name("   ").is_err());
/// ```
pub fn normalize_branch_name(raw: &str) -> Result<BranchName, TypeError> {
    let normalized: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { BRANCH_SEPARATOR } else { c })
        .collect();

    BranchName::new(normalized)
}
