use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{BackendKind, CancelReason, Operation};

/// Common result type for backend and router operations.
pub type VcsResult<T> = std::result::Result<T, VcsError>;

/// Stable machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// I/O, process or repository-graph failure.
    StorageFailure,
    /// Caller supplied an unusable argument.
    InvalidInput,
    /// A remote, tag, branch or revision does not exist.
    NotFound,
    /// The root is not an initialized repository.
    NotRepository,
    /// The selected backend cannot perform the operation.
    NotImplemented,
    /// The cancellation signal fired.
    Cancelled,
}

impl ErrorCode {
    /// Wire form of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StorageFailure => "STORAGE_FAILURE",
            Self::InvalidInput => "INVALID_INPUT",
            Self::NotFound => "NOT_FOUND",
            Self::NotRepository => "NOT_REPOSITORY",
            Self::NotImplemented => "NOT_IMPLEMENTED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

/// Errors surfaced by backends and the router.
#[derive(Debug, Error)]
pub enum VcsError {
    /// I/O, process or repository-graph failure.
    #[error("{message}")]
    StorageFailure {
        /// Human-readable summary.
        message: String,
        /// Diagnostic payload, such as captured stderr.
        detail: Option<String>,
    },
    /// Caller supplied an unusable argument.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// What was wrong with the input.
        message: String,
    },
    /// A remote, tag, branch or revision does not exist.
    #[error("not found: {message}")]
    NotFound {
        /// What could not be found.
        message: String,
    },
    /// Provided path does not correspond to a repository.
    #[error("path does not reference a git repository: {path}")]
    NotARepository {
        /// Path that failed to resolve to a repository.
        path: String,
    },
    /// The selected backend cannot perform the operation.
    #[error("operation `{operation}` is not implemented by the {backend} backend")]
    NotImplemented {
        /// Operation that was requested.
        operation: Operation,
        /// Backend the dispatch table selected.
        backend: BackendKind,
    },
    /// The operation was cancelled or timed out.
    #[error("operation `{operation}` stopped: {reason}")]
    Cancelled {
        /// Operation that was interrupted.
        operation: Operation,
        /// Whether the caller cancelled or the deadline passed.
        reason: CancelReason,
    },
}

impl VcsError {
    /// Storage failure with a diagnostic payload.
    pub fn storage(message: impl Into<String>, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self::StorageFailure {
            message: message.into(),
            detail: (!detail.trim().is_empty()).then(|| detail.trim().to_owned()),
        }
    }

    /// Invalid-input error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Stable category of the error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::StorageFailure { .. } => ErrorCode::StorageFailure,
            Self::InvalidInput { .. } => ErrorCode::InvalidInput,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::NotARepository { .. } => ErrorCode::NotRepository,
            Self::NotImplemented { .. } => ErrorCode::NotImplemented,
            Self::Cancelled { .. } => ErrorCode::Cancelled,
        }
    }

    /// Diagnostic payload, when one was captured.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::StorageFailure { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}
