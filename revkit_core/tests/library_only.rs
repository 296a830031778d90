//! Scenarios routed entirely through the in-process backend; no `git`
//! executable is needed.

mod common;

use revkit_core::{Cancellation, ErrorCode, FileStatus, Operation, VcsError};
use tempfile::TempDir;

use common::{author, commit, library_only, open, write_file};

#[test]
fn fresh_repository_status_is_clean_with_empty_branch() {
    let temp = TempDir::new().expect("tempdir");
    let (handle, log) = open(library_only(temp.path()));

    let status = handle.status(&Cancellation::new()).expect("status");
    assert!(status.clean);
    assert_eq!(status.branch, "");
    assert!(status.staged.is_empty());
    assert!(status.modified.is_empty());
    assert!(status.untracked.is_empty());
    assert!(status.conflicted.is_empty());
    assert!(log.is_empty());
}

#[test]
fn commit_then_history_reflects_one_new_commit() {
    let temp = TempDir::new().expect("tempdir");
    let (handle, _log) = open(library_only(temp.path()));
    let cancel = Cancellation::new();

    write_file(temp.path(), "a.txt", "hello\n");
    commit(&handle, &["a.txt"], "initial");
    let before = handle.commit_history(None, &cancel).expect("history");

    write_file(temp.path(), "a.txt", "hello\nworld\n");
    let record = commit(&handle, &["a.txt"], "update");
    let after = handle.commit_history(Some(0), &cancel).expect("history");

    assert_eq!(after.len(), before.len() + 1);
    assert_eq!(after[0], record);
    assert_eq!(after[0].message, "update");
    assert_eq!(after[0].author, author());
    assert_eq!(after[0].short_hash, after[0].hash[..8]);
    assert!(!handle.current_branch(&cancel).expect("branch").is_empty());
}

#[test]
fn diff_of_head_parent_reports_the_update() {
    let temp = TempDir::new().expect("tempdir");
    let (handle, _log) = open(library_only(temp.path()));

    write_file(temp.path(), "a.txt", "hello\n");
    commit(&handle, &["a.txt"], "initial");
    write_file(temp.path(), "a.txt", "hello\nworld\n");
    commit(&handle, &["a.txt"], "update");

    let diff = handle
        .diff("HEAD~1", "HEAD", &Cancellation::new())
        .expect("diff");
    assert_eq!(diff.summary.files_changed, 1);
    assert!(diff.summary.additions >= 1);
    assert_eq!(diff.summary.deletions, 0);
    assert_eq!(diff.files.len(), 1);
    assert_eq!(diff.files[0].path, "a.txt");
    assert_eq!(diff.files[0].status, FileStatus::Modified);
}

#[test]
fn snapshot_tags_are_flagged() {
    let temp = TempDir::new().expect("tempdir");
    let (handle, _log) = open(library_only(temp.path()));
    let cancel = Cancellation::new();
    assert!(handle.list_tags(&cancel).expect("no tags").is_empty());

    write_file(temp.path(), "a.txt", "hello\n");
    let head = commit(&handle, &["a.txt"], "c1");
    handle
        .create_tag("snapshot-c1", Some("first snapshot"), &cancel)
        .expect("tag");

    let tags = handle.list_tags(&cancel).expect("tags");
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].name, "snapshot-c1");
    assert!(tags[0].is_snapshot);
    assert_eq!(tags[0].hash, head.hash);
    assert_eq!(tags[0].message.as_deref(), Some("first snapshot"));
    assert_eq!(tags[0].timestamp, Some(head.timestamp));
}

#[test]
fn remotes_are_managed_in_process() {
    let temp = TempDir::new().expect("tempdir");
    let (handle, log) = open(library_only(temp.path()));
    let cancel = Cancellation::new();

    let err = handle.remote_url("origin", &cancel).expect_err("missing");
    assert_eq!(err.code(), ErrorCode::NotFound);
    handle
        .set_remote_url("origin", "https://example.com/repo.git", &cancel)
        .expect("set remote");
    assert_eq!(
        handle.remote_url("origin", &cancel).expect("url"),
        "https://example.com/repo.git"
    );
    assert!(log.is_empty());
}

#[test]
fn input_is_validated_before_any_work() {
    let temp = TempDir::new().expect("tempdir");
    let (handle, _log) = open(library_only(temp.path()));
    let cancel = Cancellation::new();

    for err in [
        handle.commit("  ", None, &cancel).expect_err("blank message"),
        handle.add(&[], &cancel).expect_err("no paths"),
        handle.diff("", "HEAD", &cancel).expect_err("empty revision"),
        handle.diff("--output=x", "HEAD", &cancel).expect_err("option-like"),
    ] {
        assert_eq!(err.code(), ErrorCode::InvalidInput, "{err}");
    }
}

#[test]
fn network_and_lfs_operations_cannot_be_routed_in_process() {
    let temp = TempDir::new().expect("tempdir");
    let config = library_only(temp.path()).with_preferences(
        revkit_core::OperationPreference::new()
            .prefer(Operation::Init, revkit_core::BackendKind::Library)
            .prefer(Operation::TrackLfs, revkit_core::BackendKind::Library)
            .prefer(Operation::Fetch, revkit_core::BackendKind::Library),
    );
    let (handle, log) = open(config);
    let cancel = Cancellation::new();

    let err = handle.track_lfs("*.bin", &cancel).expect_err("lfs");
    assert!(matches!(
        err,
        VcsError::NotImplemented {
            operation: Operation::TrackLfs,
            ..
        }
    ));
    let err = handle.fetch("origin", &cancel).expect_err("fetch");
    assert_eq!(err.code(), ErrorCode::NotImplemented);
    assert!(log.is_empty());
}

#[test]
fn cancelled_signal_stops_library_reads() {
    let temp = TempDir::new().expect("tempdir");
    let (handle, _log) = open(library_only(temp.path()));
    write_file(temp.path(), "a.txt", "hello\n");
    commit(&handle, &["a.txt"], "initial");

    let cancel = Cancellation::new();
    cancel.cancel();
    let err = handle.commit_history(None, &cancel).expect_err("cancelled");
    assert_eq!(err.code(), ErrorCode::Cancelled);
}

#[test]
fn closing_releases_the_in_process_repository() {
    let temp = TempDir::new().expect("tempdir");
    let (handle, _log) = open(library_only(temp.path()));
    assert!(!handle.is_library_open());
    handle.current_branch(&Cancellation::new()).expect("branch");
    assert!(handle.is_library_open());
    handle.close();

    let reopened = revkit_core::RepositoryHandle::open(library_only(temp.path())).expect("open");
    assert!(!reopened.is_library_open());
    reopened
        .current_branch(&Cancellation::new())
        .expect("branch");
    assert!(reopened.is_library_open());
}
