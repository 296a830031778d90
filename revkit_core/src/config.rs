//! Per-repository configuration for [`crate::RepositoryHandle`].

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use revkit_api::Author;
use revkit_backend_api::{
    BackendKind, Operation, OperationPreference, VcsError, VcsResult, DEFAULT_RENAME_THRESHOLD,
};
use serde::{Deserialize, Serialize};

/// Overrides the external executable.
pub const GIT_BIN_ENV: &str = "REVKIT_GIT_BIN";
/// Kills external invocations after this many seconds.
pub const GIT_TIMEOUT_ENV: &str = "REVKIT_GIT_TIMEOUT_SECS";
/// Rename-detection similarity percentage.
pub const RENAME_THRESHOLD_ENV: &str = "REVKIT_RENAME_THRESHOLD";

/// Everything a handle needs to know about one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Working-tree root. Fixed for the life of the handle.
    pub root: PathBuf,
    /// External executable; `git` from `PATH` when absent.
    #[serde(default)]
    pub git_path: Option<PathBuf>,
    /// Per-operation backend overrides.
    #[serde(default)]
    pub preferences: OperationPreference,
    /// Author used by `commit` when the caller passes none.
    #[serde(default)]
    pub default_author: Option<Author>,
    /// Upper bound on any single external invocation.
    #[serde(default, with = "timeout_secs")]
    pub command_timeout: Option<Duration>,
    /// Similarity percentage at which a delete/add pair becomes a rename.
    #[serde(default = "default_rename_threshold")]
    pub rename_threshold: u16,
    /// Report copies in diffs. Off by default: with copies on, an entry
    /// reported as `copied` in one direction is a plain deletion in the
    /// other, so swapped diffs stop mirroring each other.
    #[serde(default)]
    pub detect_copies: bool,
}

const fn default_rename_threshold() -> u16 {
    DEFAULT_RENAME_THRESHOLD
}

impl RepositoryConfig {
    /// Defaults for `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            git_path: None,
            preferences: OperationPreference::new(),
            default_author: None,
            command_timeout: None,
            rename_threshold: DEFAULT_RENAME_THRESHOLD,
            detect_copies: false,
        }
    }

    /// Defaults for `root`, overridden by `REVKIT_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::InvalidInput`] when a variable is set but cannot
    /// be parsed.
    pub fn from_env(root: impl Into<PathBuf>) -> VcsResult<Self> {
        Self::from_lookup(root, |name| env::var_os(name))
    }

    fn from_lookup(
        root: impl Into<PathBuf>,
        lookup: impl Fn(&str) -> Option<OsString>,
    ) -> VcsResult<Self> {
        let mut config = Self::new(root);

        if let Some(program) = lookup(GIT_BIN_ENV).filter(|value| !value.is_empty()) {
            config.git_path = Some(PathBuf::from(program));
        }
        if let Some(secs) = parse_var::<u64>(&lookup, GIT_TIMEOUT_ENV)? {
            config.command_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(threshold) = parse_var::<u16>(&lookup, RENAME_THRESHOLD_ENV)? {
            config.rename_threshold = threshold;
        }

        config.validate()?;
        Ok(config)
    }

    /// Use an explicit executable.
    #[must_use]
    pub fn with_git_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.git_path = Some(path.into());
        self
    }

    /// Route `operation` to `backend`.
    #[must_use]
    pub fn prefer(mut self, operation: Operation, backend: BackendKind) -> Self {
        self.preferences = self.preferences.prefer(operation, backend);
        self
    }

    /// Replace every override.
    #[must_use]
    pub fn with_preferences(mut self, preferences: OperationPreference) -> Self {
        self.preferences = preferences;
        self
    }

    /// Author for commits that do not name one.
    #[must_use]
    pub fn with_default_author(mut self, author: Author) -> Self {
        self.default_author = Some(author);
        self
    }

    /// Upper bound on any single external invocation.
    #[must_use]
    pub const fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    /// Rename-detection similarity percentage.
    #[must_use]
    pub const fn with_rename_threshold(mut self, threshold: u16) -> Self {
        self.rename_threshold = threshold;
        self
    }

    /// Report copies in diffs.
    #[must_use]
    pub const fn with_copy_detection(mut self, enabled: bool) -> Self {
        self.detect_copies = enabled;
        self
    }

    /// Reject settings no backend can honour.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::InvalidInput`] for an empty root or a threshold
    /// above 100.
    pub fn validate(&self) -> VcsResult<()> {
        if self.root.as_os_str().is_empty() {
            return Err(VcsError::invalid("Repository root cannot be empty"));
        }
        if self.rename_threshold > 100 {
            return Err(VcsError::invalid(format!(
                "Rename threshold must be between 0 and 100, got {}",
                self.rename_threshold
            )));
        }
        if let Some(author) = &self.default_author {
            if !author.is_complete() {
                return Err(VcsError::invalid("Default author needs a name and an email"));
            }
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<OsString>,
    name: &str,
) -> VcsResult<Option<T>> {
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    let value = raw.to_string_lossy();
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| VcsError::invalid(format!("{name} has an invalid value: {value:?}")))
}

mod timeout_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs))
    }
}
