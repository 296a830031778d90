#![allow(dead_code, unused_macros)]

use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use revkit_core::{
    Author, BackendKind, Cancellation, CommitRecord, MemoryLog, Operation, RepositoryConfig,
    RepositoryHandle,
};

pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

macro_rules! require_git {
    () => {
        if !common::git_available() {
            eprintln!("skipping: git executable not found");
            return;
        }
    };
}

pub fn author() -> Author {
    Author::new("Test User", "test@example.com")
}

pub fn write_file(root: &Path, path: &str, contents: &str) {
    let full = root.join(path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(full, contents).expect("write file");
}

/// Give the repository a local identity so tag annotations work anywhere.
pub fn configure_identity(root: &Path) {
    let repo = git2::Repository::open(root).expect("open repository");
    let mut config = repo.config().expect("config");
    config.set_str("user.name", "Test User").expect("user.name");
    config
        .set_str("user.email", "test@example.com")
        .expect("user.email");
    config.set_bool("commit.gpgsign", false).expect("gpgsign");
    config.set_bool("tag.gpgsign", false).expect("tag gpgsign");
}

/// Every operation the in-process backend provides, routed to it.
pub fn library_only(root: &Path) -> RepositoryConfig {
    RepositoryConfig::new(root)
        .with_default_author(author())
        .with_preferences(revkit_core::OperationPreference::new().prefer_all(
            [
                Operation::Init,
                Operation::Add,
                Operation::Commit,
                Operation::CreateTag,
                Operation::SetRemoteUrl,
            ],
            BackendKind::Library,
        ))
}

/// Initialised repository with a local identity, behind a handle using
/// `config`.
pub fn open(config: RepositoryConfig) -> (RepositoryHandle, Arc<MemoryLog>) {
    git2::Repository::init(&config.root).expect("init repository");
    configure_identity(&config.root);
    let log = Arc::new(MemoryLog::new());
    let handle = RepositoryHandle::with_log(config, log.clone()).expect("handle");
    (handle, log)
}

pub fn commit(handle: &RepositoryHandle, paths: &[&str], message: &str) -> CommitRecord {
    let cancel = Cancellation::new();
    let paths: Vec<String> = paths.iter().map(|path| (*path).to_owned()).collect();
    handle.add(&paths, &cancel).expect("add");
    handle.commit(message, None, &cancel).expect("commit")
}
