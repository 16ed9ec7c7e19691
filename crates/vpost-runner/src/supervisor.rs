//! Worker process supervision.
//!
//! One invocation yields exactly one [`WorkerOutcome`]. Exit, error,
//! and timeout notifications all funnel into that single return value,
//! so there is no window for two terminal transitions to race each
//! other for the same job.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Terminal outcome of one worker invocation.
#[derive(Debug)]
pub enum WorkerOutcome {
    /// The process exited on its own.
    Exited(WorkerExit),
    /// The wall-clock timer expired and the process was killed.
    TimedOut,
    /// The process could not be started at all.
    SpawnFailed { message: String },
}

/// A natural process exit with its full captured output.
#[derive(Debug)]
pub struct WorkerExit {
    /// Exit code, if the process exited normally
    pub code: Option<i32>,
    /// Termination signal, if the process was signalled (unix only)
    pub signal: Option<i32>,
    /// Everything the worker wrote to stdout
    pub stdout: String,
    /// Everything the worker wrote to stderr
    pub stderr: String,
}

impl WorkerExit {
    /// Whether this exit looks like a success: code 0 and a non-empty
    /// stdout payload. A silent success is not a success.
    pub fn is_success(&self) -> bool {
        self.code == Some(0) && !self.stdout.trim().is_empty()
    }
}

/// Spawns the worker, enforces the wall-clock timeout, and captures
/// output.
#[derive(Debug, Clone)]
pub struct WorkerSupervisor {
    timeout: Duration,
}

impl WorkerSupervisor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run a prepared command to its single terminal outcome.
    ///
    /// Stdout and stderr are drained by independent tasks so neither
    /// pipe can fill up and stall the worker; no emitted output is
    /// dropped.
    pub async fn run(&self, mut command: Command) -> WorkerOutcome {
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return WorkerOutcome::SpawnFailed {
                    message: format!("Failed to start worker: {e}"),
                }
            }
        };

        let stdout = child.stdout.take().expect("stdout not captured");
        let stderr = child.stderr.take().expect("stderr not captured");
        let stdout_task = tokio::spawn(read_to_string_lossy(stdout));
        let stderr_task = tokio::spawn(read_to_string_lossy(stderr));

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => {
                let stdout = stdout_task.await.unwrap_or_default();
                let stderr = stderr_task.await.unwrap_or_default();
                debug!(
                    code = ?status.code(),
                    stdout_bytes = stdout.len(),
                    stderr_bytes = stderr.len(),
                    "Worker exited"
                );
                WorkerOutcome::Exited(WorkerExit {
                    code: status.code(),
                    signal: exit_signal(&status),
                    stdout,
                    stderr,
                })
            }
            Ok(Err(e)) => WorkerOutcome::SpawnFailed {
                message: format!("Failed to observe worker exit: {e}"),
            },
            Err(_) => {
                // A worker exiting naturally at this same instant still
                // ends up here: the timeout is the one transition recorded.
                warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "Worker timed out, killing process"
                );
                let _ = child.kill().await;
                WorkerOutcome::TimedOut
            }
        }
    }
}

async fn read_to_string_lossy<R: AsyncRead + Unpin>(mut reader: R) -> String {
    let mut buf = Vec::new();
    let _ = reader.read_to_end(&mut buf).await;
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Stdio;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    #[tokio::test]
    async fn test_captures_exit_code_and_both_streams() {
        let supervisor = WorkerSupervisor::new(Duration::from_secs(5));
        let outcome = supervisor
            .run(sh("echo payload; echo diagnostics >&2; exit 3"))
            .await;

        match outcome {
            WorkerOutcome::Exited(exit) => {
                assert_eq!(exit.code, Some(3));
                assert_eq!(exit.stdout.trim(), "payload");
                assert_eq!(exit.stderr.trim(), "diagnostics");
                assert!(!exit.is_success());
            }
            other => panic!("expected Exited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_success_requires_nonempty_stdout() {
        let supervisor = WorkerSupervisor::new(Duration::from_secs(5));
        let outcome = supervisor.run(sh("exit 0")).await;

        match outcome {
            WorkerOutcome::Exited(exit) => {
                assert_eq!(exit.code, Some(0));
                assert!(!exit.is_success());
            }
            other => panic!("expected Exited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_kills_the_worker() {
        let supervisor = WorkerSupervisor::new(Duration::from_millis(100));
        let start = std::time::Instant::now();
        let outcome = supervisor.run(sh("sleep 30")).await;

        assert!(matches!(outcome, WorkerOutcome::TimedOut));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let supervisor = WorkerSupervisor::new(Duration::from_secs(5));
        let mut cmd = Command::new("/nonexistent/worker-binary");
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        match supervisor.run(cmd).await {
            WorkerOutcome::SpawnFailed { message } => {
                assert!(message.contains("Failed to start worker"));
            }
            other => panic!("expected SpawnFailed, got {other:?}"),
        }
    }
}
