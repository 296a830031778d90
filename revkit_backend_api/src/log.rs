//! Audit trail for external-process invocations.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::CancelReason;

/// Stderr kept in a record for failed invocations, in bytes.
pub const MAX_LOGGED_STDERR: usize = 2048;

/// How an invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// Process exited with status zero.
    Succeeded,
    /// Process could not be spawned or exited non-zero.
    Failed {
        /// Exit code, absent when the process never ran or was signalled.
        exit_code: Option<i32>,
        /// Stderr (or the spawn error), truncated to [`MAX_LOGGED_STDERR`].
        stderr: String,
    },
    /// Process was killed because the cancellation signal fired.
    Cancelled {
        /// Why the signal fired.
        reason: CancelReason,
    },
}

impl InvocationOutcome {
    /// True for [`InvocationOutcome::Succeeded`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// One external-process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRecord {
    /// Executable that was run.
    pub program: String,
    /// Arguments passed to it.
    pub args: Vec<String>,
    /// Working directory.
    pub cwd: PathBuf,
    /// Wall-clock time from spawn to exit.
    pub duration: Duration,
    /// How it ended.
    pub outcome: InvocationOutcome,
}

impl InvocationRecord {
    /// Program and arguments joined by spaces.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Sink for invocation records, injected into each backend.
pub trait InvocationLog: Send + Sync {
    /// Record one finished invocation.
    fn record(&self, record: &InvocationRecord);
}

/// Emits each record as a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl InvocationLog for TracingLog {
    fn record(&self, record: &InvocationRecord) {
        let command = record.command_line();
        let cwd = record.cwd.display();
        let duration_ms = u64::try_from(record.duration.as_millis()).unwrap_or(u64::MAX);
        match &record.outcome {
            InvocationOutcome::Succeeded => tracing::debug!(
                cmd = %command,
                dir = %cwd,
                duration_ms,
                "git command completed"
            ),
            InvocationOutcome::Failed { exit_code, stderr } => tracing::error!(
                cmd = %command,
                dir = %cwd,
                duration_ms,
                exit_code = ?exit_code,
                stderr = %stderr,
                "git command failed"
            ),
            InvocationOutcome::Cancelled { reason } => tracing::warn!(
                cmd = %command,
                dir = %cwd,
                duration_ms,
                reason = %reason,
                "git command cancelled"
            ),
        }
    }
}

/// Keeps records in memory; used to assert on the audit trail.
#[derive(Debug, Default)]
pub struct MemoryLog {
    records: Mutex<Vec<InvocationRecord>>,
}

impl MemoryLog {
    /// Empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn records(&self) -> Vec<InvocationRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of records captured.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl InvocationLog for MemoryLog {
    fn record(&self, record: &InvocationRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }
}

/// Trim `stderr` and cut it to at most [`MAX_LOGGED_STDERR`] bytes on a
/// character boundary.
#[must_use]
pub fn truncate_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.len() <= MAX_LOGGED_STDERR {
        return trimmed.to_owned();
    }
    let mut end = MAX_LOGGED_STDERR;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &trimmed[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(outcome: InvocationOutcome) -> InvocationRecord {
        InvocationRecord {
            program: "git".into(),
            args: vec!["status".into(), "--porcelain=v1".into()],
            cwd: PathBuf::from("/tmp/repo"),
            duration: Duration::from_millis(12),
            outcome,
        }
    }

    #[test]
    fn memory_log_captures_records() {
        let log = MemoryLog::new();
        assert!(log.is_empty());

        log.record(&record(InvocationOutcome::Succeeded));
        log.record(&record(InvocationOutcome::Failed {
            exit_code: Some(128),
            stderr: "fatal: not a git repository".into(),
        }));

        let records = log.records();
        assert_eq!(records.len(), 2);
        assert!(records[0].outcome.is_success());
        assert!(!records[1].outcome.is_success());
        assert_eq!(records[0].command_line(), "git status --porcelain=v1");
    }

    #[test]
    fn tracing_log_accepts_every_outcome() {
        let log = TracingLog;
        log.record(&record(InvocationOutcome::Succeeded));
        log.record(&record(InvocationOutcome::Cancelled {
            reason: CancelReason::DeadlineExceeded,
        }));
    }

    #[test]
    fn stderr_is_truncated_on_char_boundary() {
        let long = "é".repeat(MAX_LOGGED_STDERR);
        let truncated = truncate_stderr(&long);
        assert!(truncated.len() <= MAX_LOGGED_STDERR + '…'.len_utf8());
        assert!(truncated.ends_with('…'));

        assert_eq!(truncate_stderr("  short\n"), "short");
    }
}
