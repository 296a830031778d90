use serde::{Deserialize, Serialize};

/// File-level comparison between two revisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    /// Revision expression for the base side, as supplied by the caller.
    pub from: String,
    /// Revision expression for the head side, as supplied by the caller.
    pub to: String,
    /// Changed files, ordered by path.
    #[serde(default)]
    pub files: Vec<FileDiff>,
    /// Aggregate over `files`.
    #[serde(default)]
    pub summary: DiffSummary,
}

impl DiffResult {
    /// Build a result whose summary is derived from `files`.
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>, files: Vec<FileDiff>) -> Self {
        let summary = DiffSummary::aggregate(&files);
        Self {
            from: from.into(),
            to: to.into(),
            files,
            summary,
        }
    }
}

/// Change record for a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    /// Path relative to the repository root on the head side
    /// (the removed path for deletions).
    pub path: String,
    /// Previous path for renames and copies.
    #[serde(default)]
    pub old_path: Option<String>,
    /// Kind of change.
    pub status: FileStatus,
    /// Line counts for the change.
    #[serde(default)]
    pub stats: DiffStats,
}

/// Line-level summary for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DiffStats {
    /// Number of added lines.
    pub additions: u32,
    /// Number of removed lines.
    pub deletions: u32,
}

impl DiffStats {
    /// A stats instance with zero additions and deletions.
    pub const ZERO: Self = Self {
        additions: 0,
        deletions: 0,
    };

    /// Convenience constructor for explicit values.
    #[must_use]
    pub const fn new(additions: u32, deletions: u32) -> Self {
        Self {
            additions,
            deletions,
        }
    }

    /// Combine two stats structs.
    #[must_use]
    pub const fn add(self, other: Self) -> Self {
        Self {
            additions: self.additions.saturating_add(other.additions),
            deletions: self.deletions.saturating_add(other.deletions),
        }
    }

    /// The same change seen from the other direction.
    #[must_use]
    pub const fn swapped(self) -> Self {
        Self {
            additions: self.deletions,
            deletions: self.additions,
        }
    }
}

/// Totals across every entry of a [`DiffResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DiffSummary {
    /// Number of file entries.
    pub files_changed: u32,
    /// Sum of per-file additions.
    pub additions: u32,
    /// Sum of per-file deletions.
    pub deletions: u32,
}

impl DiffSummary {
    /// Sum the per-file entries. This is the only way a summary is produced.
    #[must_use]
    pub fn aggregate(files: &[FileDiff]) -> Self {
        let totals = files
            .iter()
            .fold(DiffStats::ZERO, |acc, file| acc.add(file.stats));
        Self {
            files_changed: u32::try_from(files.len()).unwrap_or(u32::MAX),
            additions: totals.additions,
            deletions: totals.deletions,
        }
    }
}

/// File status from the diff's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// File only exists on the head side.
    Added,
    /// File exists on both sides with modifications.
    Modified,
    /// File only exists on the base side.
    Deleted,
    /// File path changed between base and head.
    Renamed,
    /// File content copied from another location.
    Copied,
}

impl FileStatus {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Renamed => "renamed",
            Self::Copied => "copied",
        }
    }

    /// Whether the status carries an `old_path`.
    #[must_use]
    pub const fn has_source(self) -> bool {
        matches!(self, Self::Renamed | Self::Copied)
    }
}
