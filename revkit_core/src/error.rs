use revkit_backend_api::{ErrorCode, VcsError};
use serde::{Deserialize, Serialize};

/// Serializable form of a [`VcsError`] for collaborators that cannot hold
/// the Rust type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Stable category.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Diagnostic payload such as captured stderr.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<&VcsError> for ErrorEnvelope {
    fn from(err: &VcsError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            detail: err.detail().map(str::to_owned),
        }
    }
}

impl From<VcsError> for ErrorEnvelope {
    fn from(err: VcsError) -> Self {
        Self::from(&err)
    }
}
