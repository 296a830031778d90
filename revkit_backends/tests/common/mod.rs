#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use revkit_backend_api::{Cancellation, MemoryLog, VcsBackend};
use revkit_backends::CliBackend;

/// Whether a usable `git` executable is on `PATH`.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Skip the calling test when git is missing.
macro_rules! require_git {
    () => {
        if !common::git_available() {
            eprintln!("skipping: git executable not found");
            return;
        }
    };
}

pub fn write_file(root: &Path, path: &str, contents: &str) {
    let full = root.join(path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(full, contents).expect("write file");
}

/// Initialise a repository through the CLI and give it a local identity.
pub fn cli_repository(root: &Path) -> (CliBackend, Arc<MemoryLog>) {
    let log = Arc::new(MemoryLog::new());
    let backend = CliBackend::new(root, log.clone());
    backend.init(&Cancellation::new()).expect("git init");

    let repo = git2::Repository::open(root).expect("open repository");
    let mut config = repo.config().expect("config");
    config.set_str("user.name", "Test User").expect("user.name");
    config
        .set_str("user.email", "test@example.com")
        .expect("user.email");
    config.set_bool("commit.gpgsign", false).expect("gpgsign");
    config.set_bool("tag.gpgsign", false).expect("tag gpgsign");
    (backend, log)
}

pub fn commit(backend: &dyn VcsBackend, paths: &[&str], message: &str) -> revkit_api::CommitRecord {
    let cancel = Cancellation::new();
    let paths: Vec<String> = paths.iter().map(|path| (*path).to_owned()).collect();
    backend.add(&paths, &cancel).expect("add");
    backend.commit(message, None, &cancel).expect("commit")
}
