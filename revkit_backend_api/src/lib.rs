//! Capability interface shared by revkit's execution strategies.
//!
//! Both backends implement [`VcsBackend`]. Every method has a default body
//! that reports [`VcsError::NotImplemented`], so a backend only overrides
//! what it can actually do and an unsupported request never turns into a
//! silent no-op.

mod cancel;
pub mod dispatch;
mod error;
pub mod log;
mod types;
pub mod validate;

use revkit_api::{Author, CommitRecord};

pub use cancel::{CancelReason, Cancellation};
pub use dispatch::{DispatchTable, OperationPreference};
pub use error::{ErrorCode, VcsError, VcsResult};
pub use log::{InvocationLog, InvocationOutcome, InvocationRecord, MemoryLog, TracingLog};
pub use types::{
    BackendKind, FileChange, Operation, PeeledCommit, StatusEntry, TagAnnotation, TagRef,
    UnknownOperation, WorkingTreeScan,
};

/// Default number of commits returned by a history query.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Default rename-detection similarity threshold, in percent.
pub const DEFAULT_RENAME_THRESHOLD: u16 = 50;

/// One execution strategy for version-control operations.
pub trait VcsBackend: Send + Sync {
    /// Identity used by the dispatch table and in errors.
    fn kind(&self) -> BackendKind;

    /// Whether this backend overrides `operation`.
    fn supports(&self, operation: Operation) -> bool;

    /// Error for an operation this backend does not provide.
    fn unsupported(&self, operation: Operation) -> VcsError {
        VcsError::NotImplemented {
            operation,
            backend: self.kind(),
        }
    }

    /// Create a repository at the backend's root.
    ///
    /// # Errors
    ///
    /// Backend-defined; `NotImplemented` by default.
    fn init(&self, _cancel: &Cancellation) -> VcsResult<()> {
        Err(self.unsupported(Operation::Init))
    }

    /// Scan the working tree.
    ///
    /// # Errors
    ///
    /// Backend-defined; `NotImplemented` by default.
    fn status(&self, _cancel: &Cancellation) -> VcsResult<WorkingTreeScan> {
        Err(self.unsupported(Operation::Status))
    }

    /// Checked-out branch, empty when detached or unborn.
    ///
    /// # Errors
    ///
    /// Backend-defined; `NotImplemented` by default.
    fn current_branch(&self, _cancel: &Cancellation) -> VcsResult<String> {
        Err(self.unsupported(Operation::CurrentBranch))
    }

    /// Up to `limit` commits walking back from HEAD, newest first.
    ///
    /// # Errors
    ///
    /// Backend-defined; `NotImplemented` by default.
    fn history(&self, _limit: usize, _cancel: &Cancellation) -> VcsResult<Vec<CommitRecord>> {
        Err(self.unsupported(Operation::History))
    }

    /// Stage `paths`.
    ///
    /// # Errors
    ///
    /// Backend-defined; `NotImplemented` by default.
    fn add(&self, _paths: &[String], _cancel: &Cancellation) -> VcsResult<()> {
        Err(self.unsupported(Operation::Add))
    }

    /// Record the index as a new commit on HEAD.
    ///
    /// # Errors
    ///
    /// Backend-defined; `NotImplemented` by default.
    fn commit(
        &self,
        _message: &str,
        _author: Option<&Author>,
        _cancel: &Cancellation,
    ) -> VcsResult<CommitRecord> {
        Err(self.unsupported(Operation::Commit))
    }

    /// Tag HEAD; annotated when `message` is given, lightweight otherwise.
    ///
    /// # Errors
    ///
    /// Backend-defined; `NotImplemented` by default.
    fn create_tag(
        &self,
        _name: &str,
        _message: Option<&str>,
        _cancel: &Cancellation,
    ) -> VcsResult<()> {
        Err(self.unsupported(Operation::CreateTag))
    }

    /// Raw tag references in the backend's natural order.
    ///
    /// # Errors
    ///
    /// Backend-defined; `NotImplemented` by default.
    fn list_tags(&self, _cancel: &Cancellation) -> VcsResult<Vec<TagRef>> {
        Err(self.unsupported(Operation::ListTags))
    }

    /// File-level changes between two revisions.
    ///
    /// # Errors
    ///
    /// Backend-defined; `NotImplemented` by default.
    fn diff(&self, _from: &str, _to: &str, _cancel: &Cancellation) -> VcsResult<Vec<FileChange>> {
        Err(self.unsupported(Operation::Diff))
    }

    /// Clone `url` into the backend's root.
    ///
    /// # Errors
    ///
    /// Backend-defined; `NotImplemented` by default.
    fn clone_repository(&self, _url: &str, _cancel: &Cancellation) -> VcsResult<()> {
        Err(self.unsupported(Operation::Clone))
    }

    /// Fetch from `remote`.
    ///
    /// # Errors
    ///
    /// Backend-defined; `NotImplemented` by default.
    fn fetch(&self, _remote: &str, _cancel: &Cancellation) -> VcsResult<()> {
        Err(self.unsupported(Operation::Fetch))
    }

    /// Pull; empty `remote`/`branch` defer to the configured upstream.
    ///
    /// # Errors
    ///
    /// Backend-defined; `NotImplemented` by default.
    fn pull(&self, _remote: &str, _branch: &str, _cancel: &Cancellation) -> VcsResult<()> {
        Err(self.unsupported(Operation::Pull))
    }

    /// Push; empty `remote`/`branch` defer to the configured upstream.
    ///
    /// # Errors
    ///
    /// Backend-defined; `NotImplemented` by default.
    fn push(&self, _remote: &str, _branch: &str, _cancel: &Cancellation) -> VcsResult<()> {
        Err(self.unsupported(Operation::Push))
    }

    /// Switch the working tree to `revision`.
    ///
    /// # Errors
    ///
    /// Backend-defined; `NotImplemented` by default.
    fn checkout(&self, _revision: &str, _cancel: &Cancellation) -> VcsResult<()> {
        Err(self.unsupported(Operation::Checkout))
    }

    /// URL of remote `name`.
    ///
    /// # Errors
    ///
    /// Backend-defined; `NotImplemented` by default.
    fn remote_url(&self, _name: &str, _cancel: &Cancellation) -> VcsResult<String> {
        Err(self.unsupported(Operation::RemoteUrl))
    }

    /// Point remote `name` at `url`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Backend-defined; `NotImplemented` by default.
    fn set_remote_url(&self, _name: &str, _url: &str, _cancel: &Cancellation) -> VcsResult<()> {
        Err(self.unsupported(Operation::SetRemoteUrl))
    }

    /// Install large-file tracking for the repository.
    ///
    /// # Errors
    ///
    /// Backend-defined; `NotImplemented` by default.
    fn init_lfs(&self, _cancel: &Cancellation) -> VcsResult<()> {
        Err(self.unsupported(Operation::InitLfs))
    }

    /// Whether large-file tracking is available.
    ///
    /// # Errors
    ///
    /// Backend-defined; `NotImplemented` by default.
    fn lfs_enabled(&self, _cancel: &Cancellation) -> VcsResult<bool> {
        Err(self.unsupported(Operation::LfsEnabled))
    }

    /// Track `pattern` with large-file storage.
    ///
    /// # Errors
    ///
    /// Backend-defined; `NotImplemented` by default.
    fn track_lfs(&self, _pattern: &str, _cancel: &Cancellation) -> VcsResult<()> {
        Err(self.unsupported(Operation::TrackLfs))
    }
}
