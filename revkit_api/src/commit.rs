use serde::{Deserialize, Serialize};

/// Number of hex characters kept in [`CommitRecord::short_hash`].
pub const SHORT_HASH_LEN: usize = 8;

/// Identity of a commit author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Display name for the individual.
    pub name: String,
    /// Email address.
    pub email: String,
}

impl Author {
    /// Convenience constructor.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Returns true when both name and email carry text.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.email.trim().is_empty()
    }
}

/// A single commit as reported by either backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Full object identifier in lowercase hex.
    pub hash: String,
    /// First [`SHORT_HASH_LEN`] characters of `hash`.
    pub short_hash: String,
    /// Commit message with surrounding whitespace removed.
    pub message: String,
    /// Author identity.
    pub author: Author,
    /// Author timestamp in Unix seconds.
    #[serde(default)]
    pub timestamp: i64,
}

impl CommitRecord {
    /// Build a record, normalizing the hash and message.
    #[must_use]
    pub fn new(hash: &str, message: &str, author: Author, timestamp: i64) -> Self {
        let hash = normalize_hash(hash);
        Self {
            short_hash: short_hash(&hash),
            hash,
            message: message.trim().to_owned(),
            author,
            timestamp,
        }
    }
}

/// Lowercase a hex object id and strip surrounding whitespace.
#[must_use]
pub fn normalize_hash(hash: &str) -> String {
    hash.trim().to_ascii_lowercase()
}

/// Derive the short form of a full hash.
#[must_use]
pub fn short_hash(hash: &str) -> String {
    hash.chars().take(SHORT_HASH_LEN).collect()
}
