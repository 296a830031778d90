use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use revkit_api::{DiffStats, FileStatus};

/// Identity of an execution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// External `git` executable spawned per call.
    Cli,
    /// In-process libgit2 repository handle.
    Library,
}

impl BackendKind {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cli => "cli",
            Self::Library => "library",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every operation the router exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Operation {
    /// Create a repository at the root.
    #[serde(rename = "init")]
    Init,
    /// Classified working-tree status.
    #[serde(rename = "status")]
    Status,
    /// Name of the checked-out branch.
    #[serde(rename = "branch")]
    CurrentBranch,
    /// Commit history from HEAD.
    #[serde(rename = "history")]
    History,
    /// Stage paths.
    #[serde(rename = "add")]
    Add,
    /// Record a commit.
    #[serde(rename = "commit")]
    Commit,
    /// Create a tag on HEAD.
    #[serde(rename = "tag")]
    CreateTag,
    /// Enumerate tags.
    #[serde(rename = "tags")]
    ListTags,
    /// Compare two revisions.
    #[serde(rename = "diff")]
    Diff,
    /// Clone a remote into the root.
    #[serde(rename = "clone")]
    Clone,
    /// Fetch from a remote.
    #[serde(rename = "fetch")]
    Fetch,
    /// Pull from a remote.
    #[serde(rename = "pull")]
    Pull,
    /// Push to a remote.
    #[serde(rename = "push")]
    Push,
    /// Switch the working tree to a revision.
    #[serde(rename = "checkout")]
    Checkout,
    /// Read a remote's URL.
    #[serde(rename = "remote")]
    RemoteUrl,
    /// Set or add a remote's URL.
    #[serde(rename = "set_remote")]
    SetRemoteUrl,
    /// Install large-file tracking hooks.
    #[serde(rename = "init_lfs")]
    InitLfs,
    /// Probe whether large-file tracking is available.
    #[serde(rename = "lfs_enabled")]
    LfsEnabled,
    /// Track a path pattern with large-file storage.
    #[serde(rename = "track_lfs")]
    TrackLfs,
}

impl Operation {
    /// All operations, in declaration order.
    pub const ALL: [Self; 19] = [
        Self::Init,
        Self::Status,
        Self::CurrentBranch,
        Self::History,
        Self::Add,
        Self::Commit,
        Self::CreateTag,
        Self::ListTags,
        Self::Diff,
        Self::Clone,
        Self::Fetch,
        Self::Pull,
        Self::Push,
        Self::Checkout,
        Self::RemoteUrl,
        Self::SetRemoteUrl,
        Self::InitLfs,
        Self::LfsEnabled,
        Self::TrackLfs,
    ];

    /// Stable name used in configuration and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Status => "status",
            Self::CurrentBranch => "branch",
            Self::History => "history",
            Self::Add => "add",
            Self::Commit => "commit",
            Self::CreateTag => "tag",
            Self::ListTags => "tags",
            Self::Diff => "diff",
            Self::Clone => "clone",
            Self::Fetch => "fetch",
            Self::Pull => "pull",
            Self::Push => "push",
            Self::Checkout => "checkout",
            Self::RemoteUrl => "remote",
            Self::SetRemoteUrl => "set_remote",
            Self::InitLfs => "init_lfs",
            Self::LfsEnabled => "lfs_enabled",
            Self::TrackLfs => "track_lfs",
        }
    }

    /// True for operations that only read repository state.
    #[must_use]
    pub const fn is_read_only(self) -> bool {
        matches!(
            self,
            Self::Status
                | Self::CurrentBranch
                | Self::History
                | Self::ListTags
                | Self::Diff
                | Self::RemoteUrl
        )
    }

    /// Backend used when no preference names the operation.
    ///
    /// Mutating and remote operations go through the external tool so that
    /// hooks, credential helpers and user configuration apply.
    #[must_use]
    pub const fn default_backend(self) -> BackendKind {
        if self.is_read_only() {
            BackendKind::Library
        } else {
            BackendKind::Cli
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown operation name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation name: {0}")]
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|operation| operation.as_str() == value)
            .ok_or_else(|| UnknownOperation(value.to_owned()))
    }
}

/// One working-tree path as classified by a backend, before aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusEntry {
    /// Path relative to the repository root.
    pub path: String,
    /// Index differs from HEAD.
    pub staged: bool,
    /// Working copy differs from the index.
    pub modified: bool,
    /// Path is unknown to the index.
    pub untracked: bool,
    /// Path carries unmerged entries.
    pub conflicted: bool,
}

impl StatusEntry {
    /// Entry for `path` with no flags set.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// Raw working-tree scan produced by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkingTreeScan {
    /// Checked-out branch, empty when detached or unborn.
    pub branch: String,
    /// Every path with a non-current state.
    pub entries: Vec<StatusEntry>,
}

/// One file-level change reported by a backend, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Kind of change as the backend understood it.
    pub status: FileStatus,
    /// Head-side path (base-side path for deletions).
    pub path: String,
    /// Source path for renames and copies.
    pub old_path: Option<String>,
    /// Line counts; zero for binary content.
    pub stats: DiffStats,
    /// True when the blob is byte-identical on both sides.
    pub content_unchanged: bool,
}

/// A commit a tag reference peels to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeeledCommit {
    /// Commit id in hex.
    pub hash: String,
    /// Author time in Unix seconds.
    pub author_time: i64,
}

/// Metadata carried by an annotated tag object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagAnnotation {
    /// Annotation message as stored.
    pub message: String,
    /// Tagger time in Unix seconds, when recorded.
    pub tagger_time: Option<i64>,
}

/// A tag reference as read from the repository, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRef {
    /// Short tag name.
    pub name: String,
    /// Object id the reference points at.
    pub target: String,
    /// Present for annotated tags.
    pub annotation: Option<TagAnnotation>,
    /// The commit the tag resolves to, when it can be resolved.
    pub commit: Option<PeeledCommit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_names_round_trip() {
        for operation in Operation::ALL {
            let parsed: Operation = operation.as_str().parse().expect("parse operation");
            assert_eq!(parsed, operation);

            let json = serde_json::to_string(&operation).expect("serialize operation");
            assert_eq!(json, format!("\"{}\"", operation.as_str()));
        }
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let err = "rebase".parse::<Operation>().expect_err("unknown name");
        assert_eq!(err, UnknownOperation("rebase".into()));
    }

    #[test]
    fn reads_default_to_library() {
        for operation in [
            Operation::Status,
            Operation::CurrentBranch,
            Operation::History,
            Operation::ListTags,
            Operation::Diff,
            Operation::RemoteUrl,
        ] {
            assert_eq!(operation.default_backend(), BackendKind::Library);
        }
    }

    #[test]
    fn mutations_default_to_cli() {
        for operation in [
            Operation::Init,
            Operation::Add,
            Operation::Commit,
            Operation::CreateTag,
            Operation::Clone,
            Operation::Fetch,
            Operation::Pull,
            Operation::Push,
            Operation::Checkout,
            Operation::SetRemoteUrl,
            Operation::InitLfs,
            Operation::LfsEnabled,
            Operation::TrackLfs,
        ] {
            assert_eq!(operation.default_backend(), BackendKind::Cli);
        }
    }
}
