//! Capability router: one façade over both execution strategies.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use revkit_api::{Author, CommitRecord, DiffResult, StatusView, TagRecord};
use revkit_backend_api::{
    BackendKind, Cancellation, DispatchTable, InvocationLog, Operation, TracingLog, VcsBackend,
    VcsError, VcsResult, DEFAULT_HISTORY_LIMIT,
};
use revkit_backends::{is_repository, CliBackend, Git2Backend};

use crate::{DiffEngine, RepositoryConfig, StatusAggregator, TagResolver};

/// Handle to one repository root.
///
/// Every operation is answered by exactly one backend, chosen from the
/// dispatch table built at construction. A failure is reported as is; the
/// other backend is never tried. The in-process repository is opened on the
/// first call routed to it and kept until the handle is closed or dropped.
pub struct RepositoryHandle {
    config: RepositoryConfig,
    table: DispatchTable,
    cli: Arc<CliBackend>,
    library: Mutex<Option<Arc<Git2Backend>>>,
}

impl RepositoryHandle {
    /// Handle for `config.root`, logging external invocations via `tracing`.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::InvalidInput`] for an empty root or invalid
    /// settings, and a storage failure when the root exists but is not a
    /// readable directory. A root that does not exist yet is accepted.
    pub fn open(config: RepositoryConfig) -> VcsResult<Self> {
        Self::with_log(config, Arc::new(TracingLog))
    }

    /// Like [`Self::open`], recording external invocations to `log`.
    ///
    /// # Errors
    ///
    /// See [`Self::open`].
    pub fn with_log(config: RepositoryConfig, log: Arc<dyn InvocationLog>) -> VcsResult<Self> {
        config.validate()?;
        check_root(&config.root)?;

        let mut cli = CliBackend::new(config.root.clone(), log)
            .with_timeout(config.command_timeout)
            .with_rename_threshold(config.rename_threshold)
            .with_copy_detection(config.detect_copies);
        if let Some(program) = &config.git_path {
            cli = cli.with_program(program.clone());
        }

        let table = DispatchTable::new(&config.preferences);
        for (operation, backend) in config.preferences.overrides() {
            tracing::debug!(%operation, %backend, "operation preference override");
        }

        Ok(Self {
            config,
            table,
            cli: Arc::new(cli),
            library: Mutex::new(None),
        })
    }

    /// Working-tree root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Configuration the handle was built from.
    #[must_use]
    pub const fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// The resolved operation-to-backend mapping.
    #[must_use]
    pub const fn dispatch_table(&self) -> &DispatchTable {
        &self.table
    }

    /// Backend that answers `operation`.
    #[must_use]
    pub fn backend_for(&self, operation: Operation) -> BackendKind {
        self.table.backend_for(operation)
    }

    /// True when the root holds a `.git` directory or file.
    #[must_use]
    pub fn is_repository(&self) -> bool {
        is_repository(&self.config.root)
    }

    /// Whether the in-process repository has been opened.
    #[must_use]
    pub fn is_library_open(&self) -> bool {
        self.slot().is_some()
    }

    /// Release the in-process repository and consume the handle.
    pub fn close(self) {
        if self.slot().take().is_some() {
            tracing::debug!(root = %self.config.root.display(), "closed in-process repository");
        }
    }

    /// Create a repository at the root.
    ///
    /// # Errors
    ///
    /// Propagates the selected backend's failure.
    pub fn init(&self, cancel: &Cancellation) -> VcsResult<()> {
        match self.dispatch(Operation::Init)? {
            BackendKind::Library => {
                cancel.check(Operation::Init)?;
                let backend = Git2Backend::create(self.config.root.clone())?
                    .with_rename_threshold(self.config.rename_threshold)
                    .with_copy_detection(self.config.detect_copies);
                *self.slot() = Some(Arc::new(backend));
                tracing::debug!(root = %self.config.root.display(), "created in-process repository");
                Ok(())
            }
            BackendKind::Cli => self.cli.init(cancel),
        }
    }

    /// Classified working-tree status.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::NotARepository`] when the root holds no repository.
    pub fn status(&self, cancel: &Cancellation) -> VcsResult<StatusView> {
        let backend = self.backend(Operation::Status)?;
        StatusAggregator::new().status(backend.as_ref(), cancel)
    }

    /// Checked-out branch; empty on a detached head or before the first commit.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::NotARepository`] when the root holds no repository.
    pub fn current_branch(&self, cancel: &Cancellation) -> VcsResult<String> {
        self.backend(Operation::CurrentBranch)?.current_branch(cancel)
    }

    /// Commits walking back from HEAD, newest first.
    ///
    /// `None` or zero means the default of 100.
    ///
    /// # Errors
    ///
    /// Propagates the selected backend's failure.
    pub fn commit_history(
        &self,
        limit: Option<usize>,
        cancel: &Cancellation,
    ) -> VcsResult<Vec<CommitRecord>> {
        let limit = limit
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_HISTORY_LIMIT);
        self.backend(Operation::History)?.history(limit, cancel)
    }

    /// Stage `paths`.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::InvalidInput`] for an empty path list.
    pub fn add(&self, paths: &[String], cancel: &Cancellation) -> VcsResult<()> {
        self.backend(Operation::Add)?.add(paths, cancel)
    }

    /// Commit the index, attributed to `author` or the configured default.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::InvalidInput`] for a blank message and a storage
    /// failure when there is nothing to commit.
    pub fn commit(
        &self,
        message: &str,
        author: Option<&Author>,
        cancel: &Cancellation,
    ) -> VcsResult<CommitRecord> {
        let author = author.or(self.config.default_author.as_ref());
        self.backend(Operation::Commit)?.commit(message, author, cancel)
    }

    /// Tag HEAD, annotated when `message` is given.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::InvalidInput`] for an invalid tag name.
    pub fn create_tag(
        &self,
        name: &str,
        message: Option<&str>,
        cancel: &Cancellation,
    ) -> VcsResult<()> {
        self.backend(Operation::CreateTag)?
            .create_tag(name, message, cancel)
    }

    /// Every tag, resolved to its commit.
    ///
    /// # Errors
    ///
    /// Propagates the selected backend's failure; zero tags is an empty list.
    pub fn list_tags(&self, cancel: &Cancellation) -> VcsResult<Vec<TagRecord>> {
        let backend = self.backend(Operation::ListTags)?;
        TagResolver::new().list(backend.as_ref(), cancel)
    }

    /// File-level comparison of two revisions.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::InvalidInput`] for an empty or option-like
    /// revision and [`VcsError::NotFound`] for one that does not resolve.
    pub fn diff(&self, from: &str, to: &str, cancel: &Cancellation) -> VcsResult<DiffResult> {
        let backend = self.backend(Operation::Diff)?;
        DiffEngine::new().diff(backend.as_ref(), from, to, cancel)
    }

    /// Clone `url` into the root.
    ///
    /// # Errors
    ///
    /// Propagates the selected backend's failure.
    pub fn clone_from(&self, url: &str, cancel: &Cancellation) -> VcsResult<()> {
        self.backend(Operation::Clone)?
            .clone_repository(url, cancel)
    }

    /// Fetch from `remote`.
    ///
    /// # Errors
    ///
    /// Propagates the selected backend's failure.
    pub fn fetch(&self, remote: &str, cancel: &Cancellation) -> VcsResult<()> {
        self.backend(Operation::Fetch)?.fetch(remote, cancel)
    }

    /// Pull; empty `remote` and `branch` use the configured upstream.
    ///
    /// # Errors
    ///
    /// Propagates the selected backend's failure.
    pub fn pull(&self, remote: &str, branch: &str, cancel: &Cancellation) -> VcsResult<()> {
        self.backend(Operation::Pull)?.pull(remote, branch, cancel)
    }

    /// Push; empty `remote` and `branch` use the configured upstream.
    ///
    /// # Errors
    ///
    /// Propagates the selected backend's failure.
    pub fn push(&self, remote: &str, branch: &str, cancel: &Cancellation) -> VcsResult<()> {
        self.backend(Operation::Push)?.push(remote, branch, cancel)
    }

    /// Switch the working tree to `revision`.
    ///
    /// # Errors
    ///
    /// Propagates the selected backend's failure.
    pub fn checkout(&self, revision: &str, cancel: &Cancellation) -> VcsResult<()> {
        self.backend(Operation::Checkout)?.checkout(revision, cancel)
    }

    /// URL of remote `name`.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::NotFound`] when the remote does not exist.
    pub fn remote_url(&self, name: &str, cancel: &Cancellation) -> VcsResult<String> {
        self.backend(Operation::RemoteUrl)?.remote_url(name, cancel)
    }

    /// Point remote `name` at `url`, adding it when missing.
    ///
    /// # Errors
    ///
    /// Propagates the selected backend's failure.
    pub fn set_remote_url(&self, name: &str, url: &str, cancel: &Cancellation) -> VcsResult<()> {
        self.backend(Operation::SetRemoteUrl)?
            .set_remote_url(name, url, cancel)
    }

    /// Install large-file tracking for this repository.
    ///
    /// # Errors
    ///
    /// Propagates the selected backend's failure.
    pub fn init_lfs(&self, cancel: &Cancellation) -> VcsResult<()> {
        self.backend(Operation::InitLfs)?.init_lfs(cancel)
    }

    /// Whether large-file tracking is available.
    ///
    /// # Errors
    ///
    /// Propagates the selected backend's failure; an unavailable extension
    /// is `false`, not an error.
    pub fn is_lfs_enabled(&self, cancel: &Cancellation) -> VcsResult<bool> {
        self.backend(Operation::LfsEnabled)?.lfs_enabled(cancel)
    }

    /// Track `pattern` with large-file storage.
    ///
    /// # Errors
    ///
    /// Propagates the selected backend's failure.
    pub fn track_lfs(&self, pattern: &str, cancel: &Cancellation) -> VcsResult<()> {
        self.backend(Operation::TrackLfs)?.track_lfs(pattern, cancel)
    }

    fn dispatch(&self, operation: Operation) -> VcsResult<BackendKind> {
        let backend = self.table.backend_for(operation);
        tracing::debug!(%operation, %backend, "dispatching operation");
        if backend == BackendKind::Library && !Git2Backend::provides(operation) {
            return Err(VcsError::NotImplemented { operation, backend });
        }
        Ok(backend)
    }

    fn backend(&self, operation: Operation) -> VcsResult<Arc<dyn VcsBackend>> {
        let backend: Arc<dyn VcsBackend> = match self.dispatch(operation)? {
            BackendKind::Cli => self.cli.clone(),
            BackendKind::Library => self.library()?,
        };
        Ok(backend)
    }

    fn library(&self) -> VcsResult<Arc<Git2Backend>> {
        let mut slot = self.slot();
        if let Some(backend) = slot.as_ref() {
            return Ok(Arc::clone(backend));
        }
        let backend = Arc::new(
            Git2Backend::open(self.config.root.clone())?
                .with_rename_threshold(self.config.rename_threshold)
                .with_copy_detection(self.config.detect_copies),
        );
        tracing::debug!(root = %self.config.root.display(), "opened in-process repository");
        *slot = Some(Arc::clone(&backend));
        Ok(backend)
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<Git2Backend>>> {
        self.library.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for RepositoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryHandle")
            .field("root", &self.config.root)
            .field("library_open", &self.is_library_open())
            .finish_non_exhaustive()
    }
}

fn check_root(root: &Path) -> VcsResult<()> {
    let metadata = match fs::metadata(root) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => {
            return Err(VcsError::storage(
                "Repository root is not accessible",
                format!("{}: {err}", root.display()),
            ))
        }
    };
    if !metadata.is_dir() {
        return Err(VcsError::storage(
            "Repository root is not a directory",
            root.display().to_string(),
        ));
    }
    fs::read_dir(root).map(drop).map_err(|err| {
        VcsError::storage(
            "Repository root is not readable",
            format!("{}: {err}", root.display()),
        )
    })
}
