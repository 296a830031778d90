//! Core library for revkit's version-control abstraction.
//!
//! The crate is layered around three responsibilities:
//! - routing each operation to the external `git` executable or to libgit2
//! - deriving backend-independent views (status, diff, tags)
//! - configuration and error reporting for collaborators

#![warn(
    clippy::all,
    clippy::cargo,
    clippy::nursery,
    clippy::pedantic,
    missing_docs
)]
#![cfg_attr(
    not(test),
    deny(
        clippy::dbg_macro,
        clippy::expect_used,
        clippy::panic,
        clippy::print_stderr,
        clippy::print_stdout,
        clippy::todo,
        clippy::unwrap_used
    )
)]

/// Repository configuration and environment overrides.
pub mod config;
/// Diff normalisation and summaries.
pub mod diff;
mod error;
/// The capability router.
pub mod router;
/// Working-tree status classification.
pub mod status;
/// Tag resolution.
pub mod tags;

pub use config::RepositoryConfig;
pub use diff::DiffEngine;
pub use error::ErrorEnvelope;
pub use router::RepositoryHandle;
pub use status::StatusAggregator;
pub use tags::TagResolver;

pub use revkit_api::{
    Author, CommitRecord, DiffResult, DiffStats, DiffSummary, FileDiff, FileStatus, StatusView,
    TagRecord,
};
pub use revkit_backend_api::{
    BackendKind, CancelReason, Cancellation, DispatchTable, ErrorCode, InvocationLog,
    InvocationOutcome, InvocationRecord, MemoryLog, Operation, OperationPreference, TracingLog,
    VcsError,
};

/// Common result type for the crate.
pub type Result<T> = std::result::Result<T, VcsError>;
