use std::ffi::OsString;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use revkit_backend_api::{
    log::truncate_stderr, CancelReason, Cancellation, InvocationLog, InvocationOutcome,
    InvocationRecord, Operation, VcsError, VcsResult,
};
use wait_timeout::ChildExt;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Captured result of one finished process.
#[derive(Debug)]
pub(crate) struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    success: bool,
}

impl ProcessOutput {
    pub(crate) const fn success(&self) -> bool {
        self.success
    }

    /// Stderr when present, else stdout; git reports some refusals on stdout.
    pub(crate) fn diagnostics(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }

    /// Non-blank trimmed stdout lines.
    pub(crate) fn lines(&self) -> Vec<&str> {
        self.stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }
}

/// Spawns the git executable with a fixed, non-interactive environment.
#[derive(Clone)]
pub(crate) struct GitRunner {
    program: OsString,
    timeout: Option<Duration>,
    log: Arc<dyn InvocationLog>,
}

impl GitRunner {
    pub(crate) fn new(
        program: OsString,
        timeout: Option<Duration>,
        log: Arc<dyn InvocationLog>,
    ) -> Self {
        Self {
            program,
            timeout,
            log,
        }
    }

    pub(crate) fn program(&self) -> &OsString {
        &self.program
    }

    pub(crate) const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn log(&self) -> Arc<dyn InvocationLog> {
        Arc::clone(&self.log)
    }

    /// Run and require a zero exit status.
    pub(crate) fn run_ok(
        &self,
        operation: Operation,
        cwd: &Path,
        args: &[&str],
        cancel: &Cancellation,
        failure: &str,
    ) -> VcsResult<ProcessOutput> {
        let output = self.run(operation, cwd, args, cancel)?;
        if output.success() {
            Ok(output)
        } else {
            Err(VcsError::storage(failure, output.diagnostics()))
        }
    }

    /// Run to completion; a non-zero exit is returned, not raised.
    ///
    /// Spawn failures and cancellation are errors. Every call produces
    /// exactly one invocation record.
    pub(crate) fn run(
        &self,
        operation: Operation,
        cwd: &Path,
        args: &[&str],
        cancel: &Cancellation,
    ) -> VcsResult<ProcessOutput> {
        cancel.check(operation)?;

        let mut command = Command::new(&self.program);
        command.args(args);
        command.current_dir(cwd);
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        configure_environment(&mut command);

        let started = Instant::now();
        let deadline = self.deadline(started, cancel);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                let message = format!("failed to spawn {}: {err}", self.program.to_string_lossy());
                self.record(
                    cwd,
                    args,
                    started,
                    InvocationOutcome::Failed {
                        exit_code: None,
                        stderr: truncate_stderr(&message),
                    },
                );
                return Err(VcsError::storage("Failed to run git", message));
            }
        };

        let stdout_handle = child.stdout.take().map(|mut stdout| {
            thread::spawn(move || -> io::Result<Vec<u8>> {
                let mut buffer = Vec::new();
                stdout.read_to_end(&mut buffer)?;
                Ok(buffer)
            })
        });

        let stderr_handle = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || -> io::Result<Vec<u8>> {
                let mut buffer = Vec::new();
                stderr.read_to_end(&mut buffer)?;
                Ok(buffer)
            })
        });

        loop {
            match child.wait_timeout(POLL_INTERVAL) {
                Ok(Some(_)) => break,
                Ok(None) => {
                    if let Some(reason) = interruption(cancel, deadline) {
                        let _ = child.kill();
                        let _ = child.wait();
                        self.record(cwd, args, started, InvocationOutcome::Cancelled { reason });
                        return Err(VcsError::Cancelled { operation, reason });
                    }
                }
                Err(err) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    let message = format!("failed waiting on git: {err}");
                    self.record(
                        cwd,
                        args,
                        started,
                        InvocationOutcome::Failed {
                            exit_code: None,
                            stderr: truncate_stderr(&message),
                        },
                    );
                    return Err(VcsError::storage("Failed to run git", message));
                }
            }
        }

        let status = child
            .wait()
            .map_err(|err| VcsError::storage("Failed to reap git", err.to_string()))?;

        let stdout = join_reader(stdout_handle, "stdout")?;
        let stderr = join_reader(stderr_handle, "stderr")?;

        let outcome = if status.success() {
            InvocationOutcome::Succeeded
        } else {
            InvocationOutcome::Failed {
                exit_code: status.code(),
                stderr: truncate_stderr(&stderr),
            }
        };
        self.record(cwd, args, started, outcome);

        Ok(output(status, stdout, stderr))
    }

    fn deadline(&self, started: Instant, cancel: &Cancellation) -> Option<Instant> {
        let own = self.timeout.and_then(|timeout| started.checked_add(timeout));
        match (own, cancel.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn record(&self, cwd: &Path, args: &[&str], started: Instant, outcome: InvocationOutcome) {
        self.log.record(&InvocationRecord {
            program: self.program.to_string_lossy().into_owned(),
            args: args.iter().map(|arg| (*arg).to_owned()).collect(),
            cwd: cwd.to_path_buf(),
            duration: started.elapsed(),
            outcome,
        });
    }
}

impl std::fmt::Debug for GitRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRunner")
            .field("program", &self.program)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn configure_environment(command: &mut Command) {
    // Credential helpers only; never block on a terminal prompt.
    command.env("GIT_TERMINAL_PROMPT", "0");
    command.env("GIT_ASKPASS", "true");
}

fn interruption(cancel: &Cancellation, deadline: Option<Instant>) -> Option<CancelReason> {
    cancel.reason().or_else(|| match deadline {
        Some(deadline) if Instant::now() >= deadline => Some(CancelReason::DeadlineExceeded),
        _ => None,
    })
}

fn output(status: ExitStatus, stdout: String, stderr: String) -> ProcessOutput {
    ProcessOutput {
        stdout,
        stderr,
        exit_code: status.code(),
        success: status.success(),
    }
}

fn join_reader(handle: Option<JoinHandle<io::Result<Vec<u8>>>>, stream: &str) -> VcsResult<String> {
    match handle {
        Some(handle) => {
            let bytes = handle
                .join()
                .map_err(|_| {
                    VcsError::storage("Failed to read git output", format!("{stream} reader panicked"))
                })?
                .map_err(|err| {
                    VcsError::storage("Failed to read git output", format!("{stream}: {err}"))
                })?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        None => Ok(String::new()),
    }
}
