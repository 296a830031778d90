//! Turns a backend's raw change list into a [`DiffResult`].

use revkit_api::{DiffResult, DiffStats, FileDiff, FileStatus};
use revkit_backend_api::{validate, Cancellation, FileChange, VcsBackend, VcsResult};

/// Normalises per-file changes so both backends produce identical results.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiffEngine;

impl DiffEngine {
    /// Construct a new diff engine instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Compare `from` with `to` through `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`revkit_backend_api::VcsError::InvalidInput`] for an empty or
    /// option-like revision, `NotFound` when a revision does not resolve, and
    /// whatever the backend reports otherwise.
    pub fn diff(
        &self,
        backend: &dyn VcsBackend,
        from: &str,
        to: &str,
        cancel: &Cancellation,
    ) -> VcsResult<DiffResult> {
        validate::revision(from)?;
        validate::revision(to)?;
        let changes = backend.diff(from, to, cancel)?;
        Ok(self.build(from, to, changes))
    }

    /// Normalise `changes` and derive the summary from them.
    #[must_use]
    pub fn build(&self, from: &str, to: &str, changes: Vec<FileChange>) -> DiffResult {
        let mut files: Vec<FileDiff> = changes.into_iter().filter_map(normalize_change).collect();
        files.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
                .then_with(|| a.old_path.cmp(&b.old_path))
        });
        DiffResult::new(from, to, files)
    }
}

/// Repository-relative, `/`-separated form of `path`.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let mut normalized = path.trim().replace('\\', "/");
    while let Some(rest) = normalized.strip_prefix("./") {
        normalized = rest.to_owned();
    }
    normalized
}

fn normalize_change(change: FileChange) -> Option<FileDiff> {
    let path = normalize_path(&change.path);
    if path.is_empty() {
        return None;
    }
    let source = change
        .old_path
        .as_deref()
        .map(normalize_path)
        .filter(|old| !old.is_empty());

    let (status, old_path) = if change.status.has_source() {
        match source {
            Some(old) if old != path => (change.status, Some(old)),
            Some(_) => (FileStatus::Modified, None),
            None => (FileStatus::Added, None),
        }
    } else {
        (change.status, None)
    };

    let stats = if status == FileStatus::Renamed && change.content_unchanged {
        DiffStats::ZERO
    } else {
        change.stats
    };

    Some(FileDiff {
        path,
        old_path,
        status,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(status: FileStatus, path: &str, old_path: Option<&str>) -> FileChange {
        FileChange {
            status,
            path: path.into(),
            old_path: old_path.map(str::to_owned),
            stats: DiffStats::new(2, 1),
            content_unchanged: false,
        }
    }

    #[test]
    fn entries_are_sorted_and_summarised() {
        let result = DiffEngine::new().build(
            "HEAD~1",
            "HEAD",
            vec![
                change(FileStatus::Modified, "src/z.rs", None),
                change(FileStatus::Added, "a.txt", None),
                change(FileStatus::Deleted, "m.txt", None),
            ],
        );
        let paths: Vec<&str> = result.files.iter().map(|file| file.path.as_str()).collect();
        assert_eq!(paths, ["a.txt", "m.txt", "src/z.rs"]);
        assert_eq!(result.summary.files_changed, 3);
        assert_eq!(result.summary.additions, 6);
        assert_eq!(result.summary.deletions, 3);
        assert_eq!(result.from, "HEAD~1");
        assert_eq!(result.to, "HEAD");
    }

    #[test]
    fn paths_are_normalised() {
        assert_eq!(normalize_path(".\\src\\lib.rs"), "src/lib.rs");
        assert_eq!(normalize_path("././a.txt"), "a.txt");
        assert_eq!(normalize_path("dir/b.txt"), "dir/b.txt");
    }

    #[test]
    fn pure_rename_has_zero_counts() {
        let mut rename = change(FileStatus::Renamed, "new.txt", Some("old.txt"));
        rename.content_unchanged = true;
        let result = DiffEngine::new().build("a", "b", vec![rename]);
        let file = &result.files[0];
        assert_eq!(file.status, FileStatus::Renamed);
        assert_eq!(file.old_path.as_deref(), Some("old.txt"));
        assert_eq!(file.stats, DiffStats::ZERO);
        assert_eq!(result.summary.additions, 0);
    }

    #[test]
    fn rename_without_distinct_source_collapses() {
        let result = DiffEngine::new().build(
            "a",
            "b",
            vec![
                change(FileStatus::Renamed, "same.txt", Some("./same.txt")),
                change(FileStatus::Copied, "copy.txt", None),
            ],
        );
        assert_eq!(result.files[0].path, "copy.txt");
        assert_eq!(result.files[0].status, FileStatus::Added);
        assert_eq!(result.files[1].status, FileStatus::Modified);
        assert!(result.files.iter().all(|file| file.old_path.is_none()));
    }

    #[test]
    fn exact_copy_keeps_its_counts() {
        let mut copy = change(FileStatus::Copied, "copy.txt", Some("orig.txt"));
        copy.content_unchanged = true;
        copy.stats = DiffStats::new(10, 0);
        let result = DiffEngine::new().build("a", "b", vec![copy]);
        assert_eq!(result.files[0].status, FileStatus::Copied);
        assert_eq!(result.files[0].stats, DiffStats::new(10, 0));
        assert_eq!(result.summary.additions, 10);
    }

    #[test]
    fn stray_old_path_is_dropped() {
        let result = DiffEngine::new().build(
            "a",
            "b",
            vec![change(FileStatus::Deleted, "gone.txt", Some("other.txt"))],
        );
        assert!(result.files[0].old_path.is_none());
    }

    #[test]
    fn empty_change_list_yields_zero_summary() {
        let result = DiffEngine::new().build("HEAD", "HEAD", Vec::new());
        assert!(result.files.is_empty());
        assert_eq!(result.summary.files_changed, 0);
    }
}
