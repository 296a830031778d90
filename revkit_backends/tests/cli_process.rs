#[macro_use]
mod common;

use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use revkit_backend_api::{
    CancelReason, Cancellation, ErrorCode, InvocationOutcome, MemoryLog, VcsBackend, VcsError,
};
use revkit_backends::CliBackend;
use tempfile::TempDir;

use common::{cli_repository, write_file};

#[test]
fn every_invocation_is_recorded() {
    require_git!();
    let temp = TempDir::new().expect("tempdir");
    let (cli, log) = cli_repository(temp.path());
    let before = log.len();

    cli.current_branch(&Cancellation::new()).expect("branch");
    let records = log.records();
    assert!(records.len() > before);
    let last = records.last().expect("record");
    assert_eq!(last.cwd, temp.path());
    assert!(last.args.iter().any(|arg| arg == "rev-parse"));
}

#[test]
fn failed_invocation_carries_stderr() {
    require_git!();
    let temp = TempDir::new().expect("tempdir");
    let (cli, log) = cli_repository(temp.path());
    write_file(temp.path(), "a.txt", "one\n");

    let err = cli
        .checkout("no-such-branch", &Cancellation::new())
        .expect_err("checkout fails");
    assert_eq!(err.code(), ErrorCode::StorageFailure);
    assert!(err.detail().is_some());

    let last = log.records().pop().expect("record");
    match last.outcome {
        InvocationOutcome::Failed { exit_code, stderr } => {
            assert!(exit_code.is_some_and(|code| code != 0));
            assert!(!stderr.is_empty());
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn missing_executable_is_a_storage_failure() {
    let temp = TempDir::new().expect("tempdir");
    let log = Arc::new(MemoryLog::new());
    let cli = CliBackend::new(temp.path().join("repo"), log.clone())
        .with_program("/nonexistent/revkit-git");

    let err = cli.init(&Cancellation::new()).expect_err("spawn fails");
    assert_eq!(err.code(), ErrorCode::StorageFailure);
    assert_eq!(log.len(), 1);
    assert!(matches!(
        log.records()[0].outcome,
        InvocationOutcome::Failed {
            exit_code: None,
            ..
        }
    ));
}

#[test]
fn cancelled_before_start_spawns_nothing() {
    let temp = TempDir::new().expect("tempdir");
    fs::create_dir(temp.path().join(".git")).expect("create .git");
    let log = Arc::new(MemoryLog::new());
    let cli = CliBackend::new(temp.path(), log.clone());

    let cancel = Cancellation::new();
    cancel.cancel();
    let err = cli.fetch("origin", &cancel).expect_err("cancelled");
    assert!(matches!(
        err,
        VcsError::Cancelled {
            reason: CancelReason::Requested,
            ..
        }
    ));
    assert!(log.is_empty());
}

#[cfg(unix)]
fn slow_program(dir: &std::path::Path) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("slow-git");
    fs::write(&script, "#!/bin/sh\nexec sleep 30\n").expect("write script");
    let mut permissions = fs::metadata(&script).expect("metadata").permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&script, permissions).expect("chmod");
    script
}

#[cfg(unix)]
#[test]
fn deadline_kills_a_hung_process() {
    let temp = TempDir::new().expect("tempdir");
    let repo = temp.path().join("repo");
    fs::create_dir_all(repo.join(".git")).expect("create .git");
    let log = Arc::new(MemoryLog::new());
    let cli = CliBackend::new(&repo, log.clone()).with_program(slow_program(temp.path()));

    let started = Instant::now();
    let err = cli
        .lfs_enabled(&Cancellation::with_timeout(Duration::from_millis(200)))
        .expect_err("deadline");
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(matches!(
        err,
        VcsError::Cancelled {
            reason: CancelReason::DeadlineExceeded,
            ..
        }
    ));
    assert!(matches!(
        log.records()[0].outcome,
        InvocationOutcome::Cancelled {
            reason: CancelReason::DeadlineExceeded
        }
    ));
}

#[cfg(unix)]
#[test]
fn backend_timeout_applies_without_a_deadline() {
    let temp = TempDir::new().expect("tempdir");
    let repo = temp.path().join("repo");
    fs::create_dir_all(repo.join(".git")).expect("create .git");
    let log = Arc::new(MemoryLog::new());
    let cli = CliBackend::new(&repo, log)
        .with_program(slow_program(temp.path()))
        .with_timeout(Some(Duration::from_millis(200)));

    let err = cli
        .fetch("origin", &Cancellation::new())
        .expect_err("timeout");
    assert_eq!(err.code(), ErrorCode::Cancelled);
}

#[test]
fn clone_into_root_from_local_source() {
    require_git!();
    let temp = TempDir::new().expect("tempdir");
    let source = temp.path().join("source");
    let (origin, _) = cli_repository(&source);
    write_file(&source, "a.txt", "one\n");
    common::commit(&origin, &["a.txt"], "seed");

    let target = temp.path().join("nested").join("clone");
    let log = Arc::new(MemoryLog::new());
    let cli = CliBackend::new(&target, log.clone());
    cli.clone_repository(&source.to_string_lossy(), &Cancellation::new())
        .expect("clone");

    assert!(target.join("a.txt").is_file());
    assert_eq!(log.records()[0].cwd, temp.path().join("nested"));
    assert_eq!(
        cli.remote_url("origin", &Cancellation::new()).expect("origin"),
        source.to_string_lossy()
    );
}
