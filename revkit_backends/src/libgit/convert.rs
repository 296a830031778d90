use std::path::Path;

use git2::{Delta, ErrorClass, ErrorCode, Status};
use revkit_api::FileStatus;
use revkit_backend_api::{StatusEntry, VcsError};

const STAGED: Status = Status::INDEX_NEW
    .union(Status::INDEX_MODIFIED)
    .union(Status::INDEX_DELETED)
    .union(Status::INDEX_RENAMED)
    .union(Status::INDEX_TYPECHANGE);

const MODIFIED: Status = Status::WT_MODIFIED
    .union(Status::WT_DELETED)
    .union(Status::WT_TYPECHANGE)
    .union(Status::WT_RENAMED);

/// Map a libgit2 error onto the shared taxonomy.
pub(super) fn git_error(context: &str, err: &git2::Error) -> VcsError {
    match err.code() {
        ErrorCode::NotFound => VcsError::not_found(format!("{context}: {}", err.message())),
        ErrorCode::InvalidSpec => VcsError::invalid(format!("{context}: {}", err.message())),
        _ => VcsError::storage(context, err.message()),
    }
}

/// HEAD names a branch with no commits yet.
pub(super) fn is_unborn(err: &git2::Error) -> bool {
    matches!(
        (err.class(), err.code()),
        (
            ErrorClass::Reference,
            ErrorCode::NotFound | ErrorCode::UnbornBranch
        )
    )
}

pub(super) fn classify_status(path: &str, status: Status) -> Option<StatusEntry> {
    if status.is_empty() || status.contains(Status::IGNORED) {
        return None;
    }
    let mut entry = StatusEntry::new(path);
    if status.contains(Status::CONFLICTED) {
        entry.conflicted = true;
        return Some(entry);
    }
    entry.staged = status.intersects(STAGED);
    entry.modified = status.intersects(MODIFIED);
    entry.untracked = status.contains(Status::WT_NEW);
    (entry.staged || entry.modified || entry.untracked).then_some(entry)
}

pub(super) const fn file_status(delta: Delta) -> Option<FileStatus> {
    match delta {
        Delta::Added => Some(FileStatus::Added),
        Delta::Deleted => Some(FileStatus::Deleted),
        Delta::Modified | Delta::Typechange => Some(FileStatus::Modified),
        Delta::Renamed => Some(FileStatus::Renamed),
        Delta::Copied => Some(FileStatus::Copied),
        _ => None,
    }
}

pub(super) fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

pub(super) fn saturating_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
