//! Worker command construction.
//!
//! The worker is invoked with four positional arguments:
//! `<operation> <payload> <job_id> <model>`, where the payload is a
//! URL, a staged file path, or inline text depending on the operation.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use vpost_models::{JobId, WorkerOperation};

/// Default wall-clock timeout for one worker invocation: 30 minutes.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Configuration for spawning the worker executable.
///
/// Owned by the surrounding deployment; the orchestration core only
/// consumes it.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Program to execute (an interpreter or the worker binary itself)
    pub program: String,
    /// Leading arguments placed before the positional contract
    /// (typically the worker script path)
    pub args: Vec<String>,
    /// Wall-clock timeout for a single invocation
    pub timeout: Duration,
    /// Directory where the worker writes generated and intermediate files
    pub generated_dir: PathBuf,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["scripts/main.py".to_string()],
            timeout: DEFAULT_TIMEOUT,
            generated_dir: PathBuf::from("public/generated"),
        }
    }
}

impl WorkerConfig {
    /// Build the command for one invocation, with stdio piped for capture.
    pub fn command(&self, invocation: &WorkerInvocation) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .args(invocation.positional_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Display string for log and error messages.
    pub fn program_display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// One concrete worker invocation.
#[derive(Debug, Clone)]
pub struct WorkerInvocation {
    pub operation: WorkerOperation,
    pub payload: String,
    pub job_id: JobId,
    pub model: String,
}

impl WorkerInvocation {
    pub fn new(
        operation: WorkerOperation,
        payload: impl Into<String>,
        job_id: JobId,
        model: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            payload: payload.into(),
            job_id,
            model: model.into(),
        }
    }

    /// The positional arguments in contract order.
    pub fn positional_args(&self) -> [String; 4] {
        [
            self.operation.as_str().to_string(),
            self.payload.clone(),
            self.job_id.to_string(),
            self.model.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_argument_order() {
        let invocation = WorkerInvocation::new(
            WorkerOperation::RemoteMedia,
            "https://youtube.com/watch?v=abc",
            JobId::from_string("job-1"),
            "phi",
        );

        let args = invocation.positional_args();
        assert_eq!(args[0], "remote-media");
        assert_eq!(args[1], "https://youtube.com/watch?v=abc");
        assert_eq!(args[2], "job-1");
        assert_eq!(args[3], "phi");
    }

    #[test]
    fn test_program_display() {
        let config = WorkerConfig::default();
        assert_eq!(config.program_display(), "python3 scripts/main.py");
    }
}
