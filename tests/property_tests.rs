//! Property-based tests for naming, parsing, and request selection.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use proptest::prelude::*;

use revkeep::core::naming::normalize_branch_name;
use revkeep::core::policy::parse_bool;
use revkeep::core::types::{BranchName, Oid, SnapshotId};
use revkeep::engine::request::{is_blank_message, PLACEHOLDER_MESSAGE};
use revkeep::engine::{CommitRequest, RevertScope};

/// Strategy for one word of a branch name (no separators, no specials).
fn word() -> impl Strategy<Value = String> {
    "[a-z0-9][a-z0-9_]{0,10}"
}

/// Strategy for whitespace runs users type between words.
fn whitespace_run() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(vec![' ', '\t', '\n']), 1..4)
        .prop_map(|chars| chars.into_iter().collect())
}

/// Strategy for generating valid hex OIDs.
fn valid_oid_string() -> impl Strategy<Value = String> {
    "[0-9a-f]{40}"
}

proptest! {
    /// Every whitespace character becomes exactly one '-'.
    #[test]
    fn normalize_replaces_each_whitespace_char(
        first in word(),
        rest in prop::collection::vec((whitespace_run(), word()), 0..5),
    ) {
        let mut raw = first.clone();
        let mut expected = first;
        for (gap, w) in &rest {
            raw.push_str(gap);
            raw.push_str(w);
            expected.push_str(&"-".repeat(gap.chars().count()));
            expected.push_str(w);
        }

        let name = normalize_branch_name(&raw).unwrap();
        prop_assert_eq!(name.as_str(), expected.as_str());
        prop_assert!(!name.as_str().chars().any(char::is_whitespace));
    }

    /// Leading and trailing whitespace is dropped, not turned into '-'.
    #[test]
    fn normalize_trims_ends(w in word(), lead in whitespace_run(), trail in whitespace_run()) {
        let raw = format!("{lead}{w}{trail}");
        let name = normalize_branch_name(&raw).unwrap();
        prop_assert_eq!(name.as_str(), w.as_str());
    }

    /// Names git already accepts pass through unchanged.
    #[test]
    fn normalize_is_identity_on_valid_names(parts in prop::collection::vec(word(), 1..4)) {
        let raw = parts.join("/");
        let direct = BranchName::new(raw.as_str()).unwrap();
        prop_assert_eq!(normalize_branch_name(&raw).unwrap(), direct);
    }

    /// Normalizing twice is the same as normalizing once.
    #[test]
    fn normalize_is_idempotent(
        first in word(),
        rest in prop::collection::vec((whitespace_run(), word()), 0..4),
    ) {
        let raw: String = std::iter::once(first)
            .chain(rest.into_iter().map(|(gap, w)| format!("{gap}{w}")))
            .collect();
        let once = normalize_branch_name(&raw).unwrap();
        let twice = normalize_branch_name(once.as_str()).unwrap();
        prop_assert_eq!(once, twice);
    }

    /// A snapshot id taken at a revision names that revision and parses back.
    #[test]
    fn snapshot_id_pairs_with_revision(hex in valid_oid_string(), seq in 0u64..100_000) {
        let oid = Oid::new(hex.as_str()).unwrap();
        for id in [SnapshotId::generate(&oid), SnapshotId::sequenced(&oid, seq)] {
            prop_assert_eq!(id.revision(), oid.clone());
            prop_assert!(id.as_str().starts_with(oid.as_str()));
            prop_assert_eq!(SnapshotId::new(id.as_str()).unwrap(), id);
        }
    }

    /// Revert scopes parse regardless of case.
    #[test]
    fn revert_scope_parse_ignores_case(
        scope in prop::sample::select(vec![RevertScope::Files, RevertScope::Data, RevertScope::Both]),
        upper in any::<bool>(),
    ) {
        let text = if upper {
            scope.as_str().to_ascii_uppercase()
        } else {
            scope.as_str().to_string()
        };
        prop_assert_eq!(text.parse::<RevertScope>().unwrap(), scope);
    }

    /// Only the accepted spellings parse as booleans.
    #[test]
    fn parse_bool_rejects_other_words(s in "[g-mp-xz]{2,8}") {
        prop_assert_eq!(parse_bool(&s), None);
    }

    /// Whitespace-only messages and the padded placeholder are blank.
    #[test]
    fn blank_messages(pad_left in "[ \t\n]{0,4}", pad_right in "[ \t\n]{0,4}") {
        let ws_only = format!("{pad_left}{pad_right}");
        let placeholder = format!("{pad_left}{PLACEHOLDER_MESSAGE}{pad_right}");
        prop_assert!(is_blank_message(&ws_only));
        prop_assert!(is_blank_message(&placeholder));
    }

    /// Any message with a visible word other than the placeholder is not blank.
    #[test]
    fn real_messages_are_not_blank(msg in "[a-z]{1,20}( [a-z]{1,10}){0,3}") {
        prop_assert!(!is_blank_message(&msg));
    }

    /// Paths always win over the snapshot flag.
    #[test]
    fn commit_paths_win(
        paths in prop::collection::vec("[a-z]{1,8}\\.txt", 0..4),
        quick in any::<bool>(),
        snapshot in any::<bool>(),
    ) {
        let request = CommitRequest::from_inputs("msg", paths.clone(), quick, snapshot);
        match (paths.is_empty(), snapshot) {
            (false, _) => {
                let is_files = matches!(request, CommitRequest::Files { .. });
                prop_assert!(is_files);
            }
            (true, true) => prop_assert_eq!(request, CommitRequest::Snapshot { message: "msg".into() }),
            (true, false) => prop_assert_eq!(request, CommitRequest::Empty { message: "msg".into() }),
        }
        let empty_request = CommitRequest::from_inputs("msg", vec![], quick, snapshot);
        prop_assert_eq!(empty_request.message(), "msg");
    }
}
