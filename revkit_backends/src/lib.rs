//! Execution strategies for revkit: the external `git` executable and an
//! in-process libgit2 handle.

mod cli;
mod libgit;

use std::path::Path;

pub use cli::CliBackend;
pub use libgit::Git2Backend;

/// True when `root` holds a `.git` directory, or a `.git` file as linked
/// worktrees and submodules do.
#[must_use]
pub fn is_repository(root: &Path) -> bool {
    let marker = root.join(".git");
    marker.is_dir() || marker.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn detects_git_directory_and_file() {
        let plain = TempDir::new().expect("tempdir");
        assert!(!is_repository(plain.path()));

        let dir = TempDir::new().expect("tempdir");
        std::fs::create_dir(dir.path().join(".git")).expect("create .git");
        assert!(is_repository(dir.path()));

        let worktree = TempDir::new().expect("tempdir");
        std::fs::write(worktree.path().join(".git"), "gitdir: ../main/.git/worktrees/x\n")
            .expect("write .git file");
        assert!(is_repository(worktree.path()));
    }
}
