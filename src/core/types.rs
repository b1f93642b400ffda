//! core::types
//!
//! Strong types for the identifiers that flow between the repository, the
//! data store, and the orchestrator.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name
//! - [`Oid`] - Full revision identifier (content hash)
//! - [`SnapshotId`] - Identifier of a data-store snapshot
//! - [`UnitId`] - Name of one data unit inside the managed store
//! - [`OpId`] - Unique id stamped on every orchestrated operation
//! - [`UtcTimestamp`] - RFC3339 timestamp
//! - [`Digest`] - sha256 over a data unit's bytes
//!
//! # Validation
//!
//! Values are checked at construction time, so an operation never receives
//! a branch name git would reject or a revision that is not hex.
//!
//! # Examples
//!
//! ```
//! use revkeep::core::types::{BranchName, Oid, SnapshotId};
//!
//! let branch = BranchName::new("feature/data-sync").unwrap();
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! let snap = SnapshotId::generate(&oid);
//!
//! assert_eq!(snap.revision(), oid);
//! assert_ne!(snap, SnapshotId::generate(&oid));
//! assert!(BranchName::new("has space").is_err());
//! ```

use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

/// Errors from type validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid snapshot id: {0}")]
    InvalidSnapshotId(String),

    #[error("invalid data unit: {0}")]
    InvalidUnit(String),
}

/// A validated Git branch name.
///
/// Follows `git check-ref-format --branch`: no empty names, no leading `.` or
/// `-`, no trailing `/` or `.lock`, none of `..`, `@{`, `//`, whitespace,
/// `~ ^ : \ ? * [` or control characters, and not exactly `@`.
///
/// User-typed names with spaces go through
/// [`crate::core::naming::normalize_branch_name`] first.
///
/// ```
/// use revkeep::core::types::BranchName;
///
/// assert_eq!(BranchName::new("main").unwrap().as_str(), "main");
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("wip.lock").is_err());
/// assert!(BranchName::new("@").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if git would refuse the name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let reject = |why: &str| Err(TypeError::InvalidBranchName(why.to_string()));

        if name.is_empty() {
            return reject("branch name cannot be empty");
        }
        if name == "@" {
            return reject("branch name cannot be '@'");
        }
        if name.starts_with('-') {
            return reject("branch name cannot start with '-'");
        }
        if name.ends_with('/') {
            return reject("branch name cannot end with '/'");
        }

        for seq in ["..", "@{", "//"] {
            if name.contains(seq) {
                return reject(&format!("branch name cannot contain '{seq}'"));
            }
        }

        if let Some(c) = name
            .chars()
            .find(|c| c.is_whitespace() || c.is_ascii_control() || "~^:\\?*[".contains(*c))
        {
            return reject(&format!("branch name cannot contain {c:?}"));
        }

        for component in name.split('/') {
            if component.starts_with('.') {
                return reject("path component cannot start with '.'");
            }
            if component.ends_with(".lock") {
                return reject("path component cannot end with '.lock'");
            }
        }

        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A full revision identifier (SHA-1 or SHA-256), normalized to lowercase.
///
/// ```
/// use revkeep::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// assert!(Oid::new("abc123").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` unless the value is 40 or 64 hex digits.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().trim().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid("object id must be hexadecimal".into()));
        }
        Ok(Self(oid))
    }

    /// Abbreviated form, clamped to the full length.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a data-store snapshot: `<revision>-<tag>`.
///
/// The revision prefix names where the repository stood when the snapshot
/// was taken. The tag makes every snapshot distinct, so a later snapshot at
/// the same revision never replaces an earlier one.
///
/// ```
/// use revkeep::core::types::{Oid, SnapshotId};
///
/// let oid = Oid::new("a".repeat(40)).unwrap();
/// let id = SnapshotId::sequenced(&oid, 3);
/// assert_eq!(id.as_str(), format!("{}-0003", oid));
/// assert_eq!(SnapshotId::new(id.as_str()).unwrap(), id);
/// assert!(SnapshotId::new(oid.as_str()).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SnapshotId(String);

impl SnapshotId {
    /// Longest tag accepted after the revision.
    pub const MAX_TAG_LEN: usize = 32;

    /// Parse a stored snapshot id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidSnapshotId` unless the value is a revision
    /// id, a `-`, and a tag of lowercase letters and digits.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        let invalid = |reason: String| TypeError::InvalidSnapshotId(format!("{id}: {reason}"));

        let (revision, tag) = id
            .rsplit_once('-')
            .ok_or_else(|| invalid("expected <revision>-<tag>".to_string()))?;
        let revision = Oid::new(revision).map_err(|e| invalid(e.to_string()))?;
        if tag.is_empty()
            || tag.len() > Self::MAX_TAG_LEN
            || !tag.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(invalid(format!("bad tag '{}'", tag)));
        }
        Ok(Self(format!("{}-{}", revision, tag)))
    }

    /// A fresh id for a snapshot taken at `revision`.
    pub fn generate(revision: &Oid) -> Self {
        let tag = Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}", revision, &tag[..12]))
    }

    /// A predictable id for the `seq`-th snapshot of an in-memory store.
    pub fn sequenced(revision: &Oid, seq: u64) -> Self {
        Self(format!("{}-{:04}", revision, seq))
    }

    /// The revision the snapshot was taken at.
    pub fn revision(&self) -> Oid {
        let revision = self.0.rsplit_once('-').map_or(self.0.as_str(), |(rev, _)| rev);
        Oid(revision.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SnapshotId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<SnapshotId> for String {
    fn from(id: SnapshotId) -> Self {
        id.0
    }
}

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of one unit (a table, a collection) in the managed data store.
///
/// Units map to single files, so the name must be a plain file name.
///
/// ```
/// use revkeep::core::types::UnitId;
///
/// assert!(UnitId::new("wp_posts.json").is_ok());
/// assert!(UnitId::new("../escape").is_err());
/// assert!(UnitId::new("manifest.json").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UnitId(String);

impl UnitId {
    /// File name reserved for snapshot manifests.
    pub const MANIFEST: &'static str = "manifest.json";

    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.is_empty() || name == "." || name == ".." {
            return Err(TypeError::InvalidUnit(format!("'{name}' is not a unit name")));
        }
        if name.contains('/') || name.contains('\\') || name.contains('\0') {
            return Err(TypeError::InvalidUnit(format!(
                "'{name}' must be a plain file name"
            )));
        }
        if name == Self::MANIFEST {
            return Err(TypeError::InvalidUnit(format!("'{name}' is reserved")));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UnitId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<UnitId> for String {
    fn from(id: UnitId) -> Self {
        id.0
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique id for one orchestrated operation, carried on its audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpId(String);

impl OpId {
    /// Generate a new unique operation id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for OpId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OpId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A UTC timestamp in RFC3339 format.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UtcTimestamp(chrono::DateTime<chrono::Utc>);

impl UtcTimestamp {
    /// Create a timestamp for the current moment.
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    pub fn from_datetime(dt: chrono::DateTime<chrono::Utc>) -> Self {
        Self(dt)
    }

    pub fn as_datetime(&self) -> &chrono::DateTime<chrono::Utc> {
        &self.0
    }
}

impl std::fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// sha256 of a data unit's contents, hex encoded.
///
/// ```
/// use revkeep::core::types::Digest;
///
/// let a = Digest::of(b"rows");
/// assert_eq!(a, Digest::of(b"rows"));
/// assert_ne!(a, Digest::of(b"other rows"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest(String);

impl Digest {
    pub fn of(bytes: &[u8]) -> Self {
        use sha2::Digest as _;
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
