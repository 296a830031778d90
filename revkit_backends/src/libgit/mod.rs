//! In-process backend built on libgit2.

mod convert;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use git2::{
    DiffFindOptions, DiffOptions, IndexAddOption, Repository, Signature, Sort, StatusOptions,
};
use revkit_api::{Author, CommitRecord, DiffStats, FileStatus};
use revkit_backend_api::{
    validate, BackendKind, Cancellation, FileChange, Operation, PeeledCommit, TagAnnotation,
    TagRef, VcsBackend, VcsError, VcsResult, WorkingTreeScan, DEFAULT_RENAME_THRESHOLD,
};

use convert::{classify_status, file_status, git_error, is_unborn, path_string, saturating_u32};

const TAG_PREFIX: &str = "refs/tags/";

/// Backend holding one libgit2 repository handle for its whole lifetime.
///
/// Access is serialised through a mutex; libgit2 handles are not safe to
/// share between threads.
pub struct Git2Backend {
    root: PathBuf,
    repo: Mutex<Repository>,
    rename_threshold: u16,
    detect_copies: bool,
}

impl Git2Backend {
    /// Open the existing repository at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::NotARepository`] when `root` holds no repository
    /// and a storage failure for bare repositories or unreadable metadata.
    pub fn open(root: impl Into<PathBuf>) -> VcsResult<Self> {
        let root = root.into();
        let repo = match Repository::open(&root) {
            Ok(repo) => repo,
            Err(err) if err.code() == git2::ErrorCode::NotFound => {
                return Err(VcsError::NotARepository {
                    path: path_string(&root),
                })
            }
            Err(err) => return Err(VcsError::storage("Failed to open repository", err.message())),
        };
        Self::from_repository(root, repo)
    }

    /// Create a repository at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns a storage failure when the directory or repository cannot be
    /// created.
    pub fn create(root: impl Into<PathBuf>) -> VcsResult<Self> {
        let root = root.into();
        let repo = init_repository(&root)?;
        Self::from_repository(root, repo)
    }

    fn from_repository(root: PathBuf, repo: Repository) -> VcsResult<Self> {
        if repo.is_bare() {
            return Err(VcsError::storage(
                "Bare repositories are not supported",
                path_string(&root),
            ));
        }
        Ok(Self {
            root,
            repo: Mutex::new(repo),
            rename_threshold: DEFAULT_RENAME_THRESHOLD,
            detect_copies: false,
        })
    }

    /// Operations this backend answers; everything else is `NotImplemented`.
    ///
    /// Known without opening a repository, so a router can reject a
    /// request before touching the disk.
    #[must_use]
    pub const fn provides(operation: Operation) -> bool {
        matches!(
            operation,
            Operation::Init
                | Operation::Status
                | Operation::CurrentBranch
                | Operation::History
                | Operation::Add
                | Operation::Commit
                | Operation::CreateTag
                | Operation::ListTags
                | Operation::Diff
                | Operation::RemoteUrl
                | Operation::SetRemoteUrl
        )
    }

    /// Similarity percentage at which a delete/add pair becomes a rename.
    #[must_use]
    pub const fn with_rename_threshold(mut self, threshold: u16) -> Self {
        self.rename_threshold = threshold;
        self
    }

    /// Also report copies in diffs; off by default.
    #[must_use]
    pub const fn with_copy_detection(mut self, enabled: bool) -> Self {
        self.detect_copies = enabled;
        self
    }

    /// Root the repository was opened at.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn lock(&self) -> MutexGuard<'_, Repository> {
        self.repo.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_repo<T>(&self, f: impl FnOnce(&Repository) -> VcsResult<T>) -> VcsResult<T> {
        let repo = self.lock();
        f(&repo)
    }

    fn head_commit(repo: &Repository) -> VcsResult<Option<git2::Commit<'_>>> {
        let head = match repo.head() {
            Ok(head) => head,
            Err(err) if is_unborn(&err) => return Ok(None),
            Err(err) => return Err(git_error("Failed to resolve HEAD", &err)),
        };
        head.peel_to_commit()
            .map(Some)
            .map_err(|err| git_error("Failed to resolve HEAD", &err))
    }

    fn resolve_tree<'r>(repo: &'r Repository, revision: &str) -> VcsResult<git2::Tree<'r>> {
        validate::revision(revision)?;
        let not_found = || VcsError::not_found(format!("Revision not found: {revision}"));
        let object = repo.revparse_single(revision).map_err(|err| {
            match err.code() {
                git2::ErrorCode::NotFound
                | git2::ErrorCode::InvalidSpec
                | git2::ErrorCode::Ambiguous => not_found(),
                _ => git_error("Failed to resolve revision", &err),
            }
        })?;
        let commit = object.peel_to_commit().map_err(|_| not_found())?;
        commit
            .tree()
            .map_err(|err| git_error("Failed to read commit tree", &err))
    }

    fn signature(repo: &Repository, author: Option<&Author>) -> VcsResult<Signature<'static>> {
        match author.filter(|author| author.is_complete()) {
            Some(author) => Signature::now(&author.name, &author.email)
                .map_err(|err| VcsError::invalid(format!("Invalid author: {}", err.message()))),
            None => repo
                .signature()
                .map_err(|err| VcsError::storage("No committer identity configured", err.message())),
        }
    }
}

impl fmt::Debug for Git2Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Git2Backend")
            .field("root", &self.root)
            .field("rename_threshold", &self.rename_threshold)
            .field("detect_copies", &self.detect_copies)
            .finish_non_exhaustive()
    }
}

impl VcsBackend for Git2Backend {
    fn kind(&self) -> BackendKind {
        BackendKind::Library
    }

    fn supports(&self, operation: Operation) -> bool {
        Self::provides(operation)
    }

    fn init(&self, cancel: &Cancellation) -> VcsResult<()> {
        cancel.check(Operation::Init)?;
        let repo = init_repository(&self.root)?;
        *self.lock() = repo;
        Ok(())
    }

    fn status(&self, cancel: &Cancellation) -> VcsResult<WorkingTreeScan> {
        let branch = self.current_branch(cancel)?;
        self.with_repo(|repo| {
            let mut options = StatusOptions::new();
            options
                .include_untracked(true)
                .recurse_untracked_dirs(true)
                .include_ignored(false)
                .renames_head_to_index(false)
                .renames_index_to_workdir(false);
            let statuses = repo
                .statuses(Some(&mut options))
                .map_err(|err| git_error("Failed to read working tree status", &err))?;

            let mut entries = Vec::with_capacity(statuses.len());
            for entry in statuses.iter() {
                cancel.check(Operation::Status)?;
                let Some(path) = entry.path() else {
                    continue;
                };
                if let Some(classified) = classify_status(path, entry.status()) {
                    entries.push(classified);
                }
            }
            Ok(WorkingTreeScan { branch, entries })
        })
    }

    fn current_branch(&self, cancel: &Cancellation) -> VcsResult<String> {
        cancel.check(Operation::CurrentBranch)?;
        self.with_repo(|repo| {
            let head = match repo.head() {
                Ok(head) => head,
                Err(err) if is_unborn(&err) => return Ok(String::new()),
                Err(err) => return Err(git_error("Failed to resolve HEAD", &err)),
            };
            if !head.is_branch() {
                return Ok(String::new());
            }
            Ok(head.shorthand().map(str::to_owned).unwrap_or_default())
        })
    }

    fn history(&self, limit: usize, cancel: &Cancellation) -> VcsResult<Vec<CommitRecord>> {
        cancel.check(Operation::History)?;
        self.with_repo(|repo| {
            if Self::head_commit(repo)?.is_none() {
                return Ok(Vec::new());
            }
            let walk_error = |err: git2::Error| git_error("Failed to read commit history", &err);
            let mut walk = repo.revwalk().map_err(walk_error)?;
            walk.push_head().map_err(walk_error)?;
            walk.set_sorting(Sort::TIME).map_err(walk_error)?;

            let mut commits = Vec::new();
            for oid in walk.take(limit) {
                cancel.check(Operation::History)?;
                let oid = oid.map_err(walk_error)?;
                let commit = repo.find_commit(oid).map_err(walk_error)?;
                let author = commit.author();
                commits.push(CommitRecord::new(
                    &oid.to_string(),
                    commit.message().unwrap_or_default(),
                    Author::new(
                        author.name().unwrap_or_default(),
                        author.email().unwrap_or_default(),
                    ),
                    author.when().seconds(),
                ));
            }
            Ok(commits)
        })
    }

    fn add(&self, paths: &[String], cancel: &Cancellation) -> VcsResult<()> {
        validate::paths(paths)?;
        cancel.check(Operation::Add)?;
        self.with_repo(|repo| {
            let add_error = |err: git2::Error| git_error("Failed to add files", &err);
            let mut index = repo.index().map_err(add_error)?;
            // Pick up changes written by other processes since the last call.
            index.read(false).map_err(add_error)?;

            for path in paths {
                let known = index.get_path(Path::new(path), 0).is_some();
                if !known && !self.root.join(path).exists() {
                    return Err(VcsError::storage(
                        "Failed to add files",
                        format!("pathspec '{path}' did not match any files"),
                    ));
                }
            }

            index
                .add_all(paths.iter().map(String::as_str), IndexAddOption::DEFAULT, None)
                .map_err(add_error)?;
            index
                .update_all(paths.iter().map(String::as_str), None)
                .map_err(add_error)?;
            index.write().map_err(add_error)
        })
    }

    fn commit(
        &self,
        message: &str,
        author: Option<&Author>,
        cancel: &Cancellation,
    ) -> VcsResult<CommitRecord> {
        let message = validate::commit_message(message)?;
        cancel.check(Operation::Commit)?;
        self.with_repo(|repo| {
            let commit_error = |err: git2::Error| git_error("Failed to create commit", &err);
            let mut index = repo.index().map_err(commit_error)?;
            index.read(false).map_err(commit_error)?;
            let tree_id = index.write_tree().map_err(commit_error)?;
            let tree = repo.find_tree(tree_id).map_err(commit_error)?;

            let parent = Self::head_commit(repo)?;
            let unchanged = match &parent {
                Some(parent) => parent.tree_id() == tree_id,
                None => index.is_empty(),
            };
            if unchanged {
                return Err(VcsError::storage("Failed to create commit", "nothing to commit"));
            }

            let signature = Self::signature(repo, author)?;
            let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
            let oid = repo
                .commit(
                    Some("HEAD"),
                    &signature,
                    &signature,
                    &format!("{message}\n"),
                    &tree,
                    &parents,
                )
                .map_err(commit_error)?;

            Ok(CommitRecord::new(
                &oid.to_string(),
                message,
                Author::new(
                    signature.name().unwrap_or_default(),
                    signature.email().unwrap_or_default(),
                ),
                signature.when().seconds(),
            ))
        })
    }

    fn create_tag(
        &self,
        name: &str,
        message: Option<&str>,
        cancel: &Cancellation,
    ) -> VcsResult<()> {
        validate::ref_name("tag", name)?;
        cancel.check(Operation::CreateTag)?;
        self.with_repo(|repo| {
            let tag_error = |err: git2::Error| git_error("Failed to create tag", &err);
            let head = Self::head_commit(repo)?.ok_or_else(|| {
                VcsError::storage("Failed to create tag", "HEAD does not point at a commit")
            })?;
            match message.map(str::trim).filter(|message| !message.is_empty()) {
                Some(message) => {
                    let tagger = Self::signature(repo, None)?;
                    repo.tag(name, head.as_object(), &tagger, &format!("{message}\n"), false)
                        .map_err(tag_error)?;
                }
                None => {
                    repo.tag_lightweight(name, head.as_object(), false)
                        .map_err(tag_error)?;
                }
            }
            Ok(())
        })
    }

    fn list_tags(&self, cancel: &Cancellation) -> VcsResult<Vec<TagRef>> {
        cancel.check(Operation::ListTags)?;
        self.with_repo(|repo| {
            let list_error = |err: git2::Error| git_error("Failed to list tags", &err);
            let references = repo
                .references_glob(&format!("{TAG_PREFIX}*"))
                .map_err(list_error)?;

            let mut tags = Vec::new();
            for reference in references {
                cancel.check(Operation::ListTags)?;
                let reference = reference.map_err(list_error)?;
                let (Some(full_name), Some(target)) = (reference.name(), reference.target())
                else {
                    continue;
                };
                let name = full_name.trim_start_matches(TAG_PREFIX).to_owned();

                let (annotation, commit) = match repo.find_tag(target) {
                    Ok(tag) => (
                        Some(TagAnnotation {
                            message: tag.message().unwrap_or_default().to_owned(),
                            tagger_time: tag.tagger().map(|tagger| tagger.when().seconds()),
                        }),
                        reference.peel_to_commit().ok(),
                    ),
                    Err(_) => (None, repo.find_commit(target).ok()),
                };

                tags.push(TagRef {
                    name,
                    target: target.to_string(),
                    annotation,
                    commit: commit.map(|commit| PeeledCommit {
                        hash: commit.id().to_string(),
                        author_time: commit.author().when().seconds(),
                    }),
                });
            }
            tags.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(tags)
        })
    }

    fn diff(&self, from: &str, to: &str, cancel: &Cancellation) -> VcsResult<Vec<FileChange>> {
        cancel.check(Operation::Diff)?;
        self.with_repo(|repo| {
            let diff_error = |err: git2::Error| git_error("Failed to compute diff", &err);
            let old_tree = Self::resolve_tree(repo, from)?;
            let new_tree = Self::resolve_tree(repo, to)?;

            let mut options = DiffOptions::new();
            let mut diff = repo
                .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), Some(&mut options))
                .map_err(diff_error)?;

            let threshold = self.rename_threshold.min(100);
            let mut find = DiffFindOptions::new();
            find.renames(true).rename_threshold(threshold);
            if self.detect_copies {
                find.copies(true).copy_threshold(threshold);
            }
            diff.find_similar(Some(&mut find)).map_err(diff_error)?;

            let mut changes = Vec::new();
            for (idx, delta) in diff.deltas().enumerate() {
                cancel.check(Operation::Diff)?;
                let Some(status) = file_status(delta.status()) else {
                    continue;
                };
                let old_path = delta.old_file().path().map(Path::to_string_lossy);
                let new_path = delta.new_file().path().map(Path::to_string_lossy);
                let path = match status {
                    FileStatus::Deleted => old_path.clone(),
                    _ => new_path.or_else(|| old_path.clone()),
                }
                .map(|path| path.into_owned())
                .unwrap_or_default();

                let stats = match git2::Patch::from_diff(&diff, idx).map_err(diff_error)? {
                    Some(patch) => {
                        let (_, additions, deletions) = patch.line_stats().map_err(diff_error)?;
                        DiffStats::new(saturating_u32(additions), saturating_u32(deletions))
                    }
                    None => DiffStats::ZERO,
                };

                changes.push(FileChange {
                    status,
                    old_path: status
                        .has_source()
                        .then(|| old_path.map(|path| path.into_owned()))
                        .flatten(),
                    path,
                    stats,
                    content_unchanged: delta.old_file().id() == delta.new_file().id(),
                });
            }
            Ok(changes)
        })
    }

    fn remote_url(&self, name: &str, cancel: &Cancellation) -> VcsResult<String> {
        validate::ref_name("remote", name)?;
        cancel.check(Operation::RemoteUrl)?;
        self.with_repo(|repo| {
            let remote = repo.find_remote(name).map_err(|err| match err.code() {
                git2::ErrorCode::NotFound | git2::ErrorCode::InvalidSpec => {
                    VcsError::not_found(format!("Remote not found: {name}"))
                }
                _ => git_error("Failed to read remote", &err),
            })?;
            remote
                .url()
                .map(str::to_owned)
                .ok_or_else(|| VcsError::not_found(format!("Remote URL not found: {name}")))
        })
    }

    fn set_remote_url(&self, name: &str, url: &str, cancel: &Cancellation) -> VcsResult<()> {
        validate::ref_name("remote", name)?;
        if url.trim().is_empty() {
            return Err(VcsError::invalid("Remote URL cannot be empty"));
        }
        cancel.check(Operation::SetRemoteUrl)?;
        self.with_repo(|repo| {
            let remote_error = |err: git2::Error| git_error("Failed to set remote URL", &err);
            match repo.find_remote(name) {
                Ok(_) => repo.remote_set_url(name, url).map_err(remote_error),
                Err(err) if err.code() == git2::ErrorCode::NotFound => {
                    repo.remote(name, url).map(drop).map_err(remote_error)
                }
                Err(err) => Err(remote_error(err)),
            }
        })
    }
}

fn init_repository(root: &Path) -> VcsResult<Repository> {
    fs::create_dir_all(root).map_err(|err| {
        VcsError::storage("Failed to create repository directory", err.to_string())
    })?;
    Repository::init(root)
        .map_err(|err| VcsError::storage("Failed to initialize Git repository", err.message()))
}
