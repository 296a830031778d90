//! Backend that shells out to the `git` executable.

mod exec;
mod parse;

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use revkit_api::{Author, CommitRecord};
use revkit_backend_api::{
    validate, BackendKind, Cancellation, FileChange, InvocationLog, Operation, PeeledCommit, TagRef,
    VcsBackend, VcsError, VcsResult, WorkingTreeScan, DEFAULT_RENAME_THRESHOLD,
};

use crate::is_repository;

use exec::GitRunner;

const DEFAULT_PROGRAM: &str = "git";

/// Runs each operation as a `git` subprocess in the repository root.
///
/// Mutating and remote operations default here because the external tool
/// honors the user's hooks, credential helpers and configuration.
#[derive(Debug, Clone)]
pub struct CliBackend {
    root: PathBuf,
    runner: GitRunner,
    rename_threshold: u16,
    detect_copies: bool,
}

impl CliBackend {
    /// Backend for `root` using `git` from `PATH`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, log: Arc<dyn InvocationLog>) -> Self {
        Self {
            root: root.into(),
            runner: GitRunner::new(OsString::from(DEFAULT_PROGRAM), None, log),
            rename_threshold: DEFAULT_RENAME_THRESHOLD,
            detect_copies: false,
        }
    }

    /// Use an explicit executable.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.runner = GitRunner::new(program.into(), self.runner_timeout(), self.runner_log());
        self
    }

    /// Kill any invocation that runs longer than `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.runner = GitRunner::new(self.runner.program().clone(), timeout, self.runner_log());
        self
    }

    /// Similarity percentage at which a delete/add pair becomes a rename.
    #[must_use]
    pub const fn with_rename_threshold(mut self, threshold: u16) -> Self {
        self.rename_threshold = threshold;
        self
    }

    /// Also report copies in diffs.
    ///
    /// Off by default: a copy is reported against its source in one
    /// direction but as a plain deletion in the other, so swapped diffs no
    /// longer mirror each other.
    #[must_use]
    pub const fn with_copy_detection(mut self, enabled: bool) -> Self {
        self.detect_copies = enabled;
        self
    }

    /// Repository root every invocation runs in.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn runner_timeout(&self) -> Option<Duration> {
        self.runner.timeout()
    }

    fn runner_log(&self) -> Arc<dyn InvocationLog> {
        self.runner.log()
    }

    fn git(
        &self,
        operation: Operation,
        args: &[&str],
        cancel: &Cancellation,
        failure: &str,
    ) -> VcsResult<exec::ProcessOutput> {
        self.runner
            .run_ok(operation, &self.root, args, cancel, failure)
    }

    fn ensure_repository(&self) -> VcsResult<()> {
        if is_repository(&self.root) {
            Ok(())
        } else {
            Err(VcsError::NotARepository {
                path: self.root.to_string_lossy().into_owned(),
            })
        }
    }

    fn has_commits(&self, operation: Operation, cancel: &Cancellation) -> VcsResult<bool> {
        let output =
            self.runner
                .run(operation, &self.root, &["rev-parse", "--verify", "-q", "HEAD"], cancel)?;
        Ok(output.success())
    }

    fn resolve_commit(&self, revision: &str, cancel: &Cancellation) -> VcsResult<String> {
        validate::revision(revision)?;
        let spec = format!("{revision}^{{commit}}");
        let output = self.runner.run(
            Operation::Diff,
            &self.root,
            &["rev-parse", "--verify", "-q", &spec],
            cancel,
        )?;
        match output.lines().first() {
            Some(hash) if output.success() => Ok((*hash).to_owned()),
            _ => Err(VcsError::not_found(format!("Revision not found: {revision}"))),
        }
    }

    fn head_record(&self, cancel: &Cancellation) -> VcsResult<CommitRecord> {
        let output = self.git(
            Operation::Commit,
            &["log", "-1", parse::LOG_FORMAT, "HEAD"],
            cancel,
            "Failed to read new commit",
        )?;
        parse::parse_log(&output.stdout)
            .into_iter()
            .next()
            .ok_or_else(|| VcsError::storage("Failed to read new commit", output.stdout.clone()))
    }

    /// Commit behind a tag whose `%(*objectname)` is not one; `for-each-ref`
    /// peels a single level, so a tag of a tag needs its own lookup.
    fn peel_tag(&self, name: &str, cancel: &Cancellation) -> VcsResult<Option<PeeledCommit>> {
        let revision = format!("refs/tags/{name}^{{commit}}");
        let output = self.runner.run(
            Operation::ListTags,
            &self.root,
            &["log", "-1", parse::PEEL_FORMAT, &revision, "--"],
            cancel,
        )?;
        if !output.success() {
            return Ok(None);
        }
        Ok(parse::parse_peeled(&output.stdout))
    }

    fn similarity_args(&self) -> Vec<String> {
        let threshold = self.rename_threshold.min(100);
        let mut args = vec![format!("-M{threshold}%")];
        if self.detect_copies {
            args.push(format!("-C{threshold}%"));
        }
        args
    }

    fn diff_output(
        &self,
        format: &str,
        from: &str,
        to: &str,
        cancel: &Cancellation,
    ) -> VcsResult<String> {
        let similarity = self.similarity_args();
        let mut args = vec!["diff", "--no-ext-diff", format, "-z"];
        args.extend(similarity.iter().map(String::as_str));
        args.extend([from, to]);
        let output = self.git(Operation::Diff, &args, cancel, "Failed to compute diff")?;
        Ok(output.stdout)
    }
}

impl VcsBackend for CliBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Cli
    }

    fn supports(&self, _operation: Operation) -> bool {
        true
    }

    fn init(&self, cancel: &Cancellation) -> VcsResult<()> {
        fs::create_dir_all(&self.root).map_err(|err| {
            VcsError::storage("Failed to create repository directory", err.to_string())
        })?;
        self.git(
            Operation::Init,
            &["init"],
            cancel,
            "Failed to initialize Git repository",
        )?;
        Ok(())
    }

    fn status(&self, cancel: &Cancellation) -> VcsResult<WorkingTreeScan> {
        self.ensure_repository()?;
        let branch = self.current_branch(cancel)?;
        let output = self.git(
            Operation::Status,
            &[
                "status",
                "--porcelain=v1",
                "-z",
                "--untracked-files=all",
                "--no-renames",
            ],
            cancel,
            "Failed to read working tree status",
        )?;
        Ok(WorkingTreeScan {
            branch,
            entries: parse::parse_porcelain_status(&output.stdout),
        })
    }

    fn current_branch(&self, cancel: &Cancellation) -> VcsResult<String> {
        self.ensure_repository()?;
        if !self.has_commits(Operation::CurrentBranch, cancel)? {
            return Ok(String::new());
        }
        let output = self.runner.run(
            Operation::CurrentBranch,
            &self.root,
            &["symbolic-ref", "--short", "-q", "HEAD"],
            cancel,
        )?;
        if !output.success() {
            // Detached HEAD.
            return Ok(String::new());
        }
        Ok(output
            .lines()
            .first()
            .map(|line| (*line).to_owned())
            .unwrap_or_default())
    }

    fn history(&self, limit: usize, cancel: &Cancellation) -> VcsResult<Vec<CommitRecord>> {
        self.ensure_repository()?;
        if !self.has_commits(Operation::History, cancel)? {
            return Ok(Vec::new());
        }
        let max_count = format!("--max-count={limit}");
        let output = self.git(
            Operation::History,
            &["log", &max_count, parse::LOG_FORMAT, "HEAD"],
            cancel,
            "Failed to read commit history",
        )?;
        Ok(parse::parse_log(&output.stdout))
    }

    fn add(&self, paths: &[String], cancel: &Cancellation) -> VcsResult<()> {
        validate::paths(paths)?;
        self.ensure_repository()?;
        let mut args = vec!["add", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.git(Operation::Add, &args, cancel, "Failed to add files")?;
        Ok(())
    }

    fn commit(
        &self,
        message: &str,
        author: Option<&Author>,
        cancel: &Cancellation,
    ) -> VcsResult<CommitRecord> {
        let message = validate::commit_message(message)?;
        self.ensure_repository()?;

        let mut owned: Vec<String> = Vec::new();
        if let Some(author) = author.filter(|author| author.is_complete()) {
            owned.extend([
                "-c".to_owned(),
                format!("user.name={}", author.name),
                "-c".to_owned(),
                format!("user.email={}", author.email),
                "commit".to_owned(),
                "--author".to_owned(),
                format!("{} <{}>", author.name, author.email),
            ]);
        } else {
            owned.push("commit".to_owned());
        }
        owned.extend(["-m".to_owned(), message.to_owned()]);
        let args: Vec<&str> = owned.iter().map(String::as_str).collect();

        self.git(Operation::Commit, &args, cancel, "Failed to create commit")?;
        self.head_record(cancel)
    }

    fn create_tag(
        &self,
        name: &str,
        message: Option<&str>,
        cancel: &Cancellation,
    ) -> VcsResult<()> {
        validate::ref_name("tag", name)?;
        self.ensure_repository()?;
        let args = match message.map(str::trim).filter(|message| !message.is_empty()) {
            Some(message) => vec!["tag", "-a", name, "-m", message],
            None => vec!["tag", name],
        };
        self.git(Operation::CreateTag, &args, cancel, "Failed to create tag")?;
        Ok(())
    }

    fn list_tags(&self, cancel: &Cancellation) -> VcsResult<Vec<TagRef>> {
        self.ensure_repository()?;
        let output = self.git(
            Operation::ListTags,
            &["for-each-ref", parse::TAG_FORMAT, "refs/tags"],
            cancel,
            "Failed to list tags",
        )?;
        let mut tags = parse::parse_tag_refs(&output.stdout);
        for tag in tags
            .iter_mut()
            .filter(|tag| tag.annotation.is_some() && tag.commit.is_none())
        {
            tag.commit = self.peel_tag(&tag.name, cancel)?;
        }
        Ok(tags)
    }

    fn diff(&self, from: &str, to: &str, cancel: &Cancellation) -> VcsResult<Vec<FileChange>> {
        validate::revision(from)?;
        validate::revision(to)?;
        self.ensure_repository()?;
        let from_commit = self.resolve_commit(from, cancel)?;
        let to_commit = self.resolve_commit(to, cancel)?;
        let numstat = self.diff_output("--numstat", &from_commit, &to_commit, cancel)?;
        let name_status = self.diff_output("--name-status", &from_commit, &to_commit, cancel)?;

        let stats = parse::parse_numstat(&numstat);
        Ok(parse::parse_name_status(&name_status, &stats))
    }

    fn clone_repository(&self, url: &str, cancel: &Cancellation) -> VcsResult<()> {
        if url.trim().is_empty() || url.starts_with('-') {
            return Err(VcsError::invalid(format!("Invalid clone URL: {url:?}")));
        }
        let parent = self
            .root
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|err| {
            VcsError::storage("Failed to create clone destination", err.to_string())
        })?;
        let target = self
            .root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| VcsError::invalid("Clone destination has no directory name"))?;
        self.runner.run_ok(
            Operation::Clone,
            parent,
            &["clone", "--", url, &target],
            cancel,
            "Failed to clone repository",
        )?;
        Ok(())
    }

    fn fetch(&self, remote: &str, cancel: &Cancellation) -> VcsResult<()> {
        validate::ref_name("remote", remote)?;
        self.ensure_repository()?;
        self.git(
            Operation::Fetch,
            &["fetch", remote],
            cancel,
            "Failed to fetch from remote",
        )?;
        Ok(())
    }

    fn pull(&self, remote: &str, branch: &str, cancel: &Cancellation) -> VcsResult<()> {
        self.ensure_repository()?;
        let args = upstream_args("pull", remote, branch)?;
        self.git(Operation::Pull, &args, cancel, "Failed to pull from remote")?;
        Ok(())
    }

    fn push(&self, remote: &str, branch: &str, cancel: &Cancellation) -> VcsResult<()> {
        self.ensure_repository()?;
        let args = upstream_args("push", remote, branch)?;
        self.git(Operation::Push, &args, cancel, "Failed to push to remote")?;
        Ok(())
    }

    fn checkout(&self, revision: &str, cancel: &Cancellation) -> VcsResult<()> {
        validate::revision(revision)?;
        self.ensure_repository()?;
        self.git(
            Operation::Checkout,
            &["checkout", revision],
            cancel,
            "Failed to checkout reference",
        )?;
        Ok(())
    }

    fn remote_url(&self, name: &str, cancel: &Cancellation) -> VcsResult<String> {
        validate::ref_name("remote", name)?;
        self.ensure_repository()?;
        let output = self
            .runner
            .run(Operation::RemoteUrl, &self.root, &["remote", "get-url", name], cancel)?;
        if !output.success() {
            return Err(VcsError::not_found(format!("Remote not found: {name}")));
        }
        output
            .lines()
            .first()
            .map(|line| (*line).to_owned())
            .ok_or_else(|| VcsError::not_found(format!("Remote URL not found: {name}")))
    }

    fn set_remote_url(&self, name: &str, url: &str, cancel: &Cancellation) -> VcsResult<()> {
        validate::ref_name("remote", name)?;
        if url.trim().is_empty() {
            return Err(VcsError::invalid("Remote URL cannot be empty"));
        }
        self.ensure_repository()?;
        let updated = self.runner.run(
            Operation::SetRemoteUrl,
            &self.root,
            &["remote", "set-url", name, url],
            cancel,
        )?;
        if !updated.success() {
            self.git(
                Operation::SetRemoteUrl,
                &["remote", "add", name, url],
                cancel,
                "Failed to set remote URL",
            )?;
        }
        Ok(())
    }

    fn init_lfs(&self, cancel: &Cancellation) -> VcsResult<()> {
        self.ensure_repository()?;
        self.git(
            Operation::InitLfs,
            &["lfs", "install", "--local"],
            cancel,
            "Failed to initialize Git LFS",
        )?;
        Ok(())
    }

    fn lfs_enabled(&self, cancel: &Cancellation) -> VcsResult<bool> {
        self.ensure_repository()?;
        let output = self
            .runner
            .run(Operation::LfsEnabled, &self.root, &["lfs", "env"], cancel)?;
        if !output.success() {
            tracing::debug!(exit_code = ?output.exit_code, "git lfs env reported unavailable");
        }
        Ok(output.success())
    }

    fn track_lfs(&self, pattern: &str, cancel: &Cancellation) -> VcsResult<()> {
        if pattern.trim().is_empty() {
            return Err(VcsError::invalid("LFS pattern cannot be empty"));
        }
        self.ensure_repository()?;
        self.git(
            Operation::TrackLfs,
            &["lfs", "track", pattern],
            cancel,
            "Failed to track LFS pattern",
        )?;
        if self.root.join(".gitattributes").is_file() {
            self.git(
                Operation::TrackLfs,
                &["add", "--", ".gitattributes"],
                cancel,
                "Failed to stage .gitattributes",
            )?;
        }
        Ok(())
    }
}

fn upstream_args<'a>(verb: &'a str, remote: &'a str, branch: &'a str) -> VcsResult<Vec<&'a str>> {
    match (remote.is_empty(), branch.is_empty()) {
        (true, true) => Ok(vec![verb]),
        (false, false) => {
            validate::ref_name("remote", remote)?;
            validate::ref_name("branch", branch)?;
            Ok(vec![verb, remote, branch])
        }
        _ => Err(VcsError::invalid(
            "Remote and branch must be given together or not at all",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revkit_backend_api::{ErrorCode, MemoryLog};

    fn backend(root: &Path) -> (CliBackend, Arc<MemoryLog>) {
        let log = Arc::new(MemoryLog::new());
        (CliBackend::new(root, log.clone()), log)
    }

    #[test]
    fn empty_commit_message_is_rejected_before_spawning() {
        let (backend, log) = backend(Path::new("/nonexistent/revkit"));
        let err = backend
            .commit("   ", None, &Cancellation::new())
            .expect_err("blank message");
        assert_eq!(err.code(), ErrorCode::InvalidInput);
        assert!(log.is_empty());
    }

    #[test]
    fn empty_path_list_is_rejected_before_spawning() {
        let (backend, log) = backend(Path::new("/nonexistent/revkit"));
        let err = backend
            .add(&[], &Cancellation::new())
            .expect_err("no paths");
        assert_eq!(err.code(), ErrorCode::InvalidInput);
        assert!(log.is_empty());
    }

    #[test]
    fn reads_outside_a_repository_report_not_a_repository() {
        let (backend, log) = backend(Path::new("/nonexistent/revkit"));
        let err = backend
            .current_branch(&Cancellation::new())
            .expect_err("not a repository");
        assert_eq!(err.code(), ErrorCode::NotRepository);
        assert!(log.is_empty());
    }

    #[test]
    fn upstream_arguments_require_both_or_neither() {
        assert_eq!(upstream_args("push", "", "").ok(), Some(vec!["push"]));
        assert_eq!(
            upstream_args("push", "origin", "main").ok(),
            Some(vec!["push", "origin", "main"])
        );
        assert!(upstream_args("pull", "origin", "").is_err());
    }

    #[test]
    fn similarity_arguments_follow_threshold() {
        let (backend, _) = backend(Path::new("/tmp"));
        let backend = backend.with_rename_threshold(75);
        assert_eq!(backend.similarity_args(), ["-M75%"]);
        let backend = backend.with_copy_detection(true);
        assert_eq!(backend.similarity_args(), ["-M75%", "-C75%"]);
    }
}
