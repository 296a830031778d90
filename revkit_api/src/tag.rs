use serde::{Deserialize, Serialize};

/// Name prefix reserved for tags produced by the snapshot feature.
pub const SNAPSHOT_TAG_PREFIX: &str = "snapshot-";

/// A tag resolved to the commit it marks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    /// Short tag name (without `refs/tags/`).
    pub name: String,
    /// Commit the tag resolves to, or the raw target when it cannot be peeled.
    pub hash: String,
    /// Annotation message for annotated tags.
    #[serde(default)]
    pub message: Option<String>,
    /// Author time of the resolved commit, else the tagger time (Unix seconds).
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// Set when the name carries [`SNAPSHOT_TAG_PREFIX`].
    pub is_snapshot: bool,
}

/// Returns true when a tag name follows the snapshot naming convention.
#[must_use]
pub fn is_snapshot_tag(name: &str) -> bool {
    name.starts_with(SNAPSHOT_TAG_PREFIX)
}
