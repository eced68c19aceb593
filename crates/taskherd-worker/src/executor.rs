use std::path::Path;
use std::time::Instant;

use taskherd_core::TaskStatus;
use tokio::process::Command;

/// Why a command execution was classified as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionFault {
    /// The command (or the shared working directory) could not be found at
    /// spawn time.
    CommandNotFound,
    /// The command ran but exited non-zero. Signal-terminated processes have
    /// no exit code and report -1.
    NonZeroExit(i32),
    /// Any other execution fault.
    Unexpected,
}

/// Closed outcome of one command execution, consumed uniformly by the
/// result-reporting step. There is no timeout or cancellation path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Success { output: String },
    Error { fault: ExecutionFault, detail: String },
}

impl CommandOutcome {
    pub fn status(&self) -> TaskStatus {
        match self {
            CommandOutcome::Success { .. } => TaskStatus::Success,
            CommandOutcome::Error { .. } => TaskStatus::Error,
        }
    }

    /// Render the output string reported back to the coordinator.
    pub fn into_output(self) -> String {
        match self {
            CommandOutcome::Success { output } => output,
            CommandOutcome::Error { fault: ExecutionFault::CommandNotFound, .. } => {
                "Command not found or shared directory not mounted.".to_string()
            }
            CommandOutcome::Error { fault: ExecutionFault::NonZeroExit(code), detail } => {
                format!("Command failed with error code {}:\n{}", code, detail)
            }
            CommandOutcome::Error { fault: ExecutionFault::Unexpected, detail } => {
                format!("An unexpected error occurred: {}", detail)
            }
        }
    }
}

/// Run a shell-interpreted command with the working directory fixed to the
/// shared directory, capturing stdout/stderr and wall-clock duration.
pub async fn execute(command: &str, shared_dir: &Path) -> (CommandOutcome, f64) {
    let started = Instant::now();

    let outcome = match Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(shared_dir)
        .output()
        .await
    {
        Ok(output) if output.status.success() => {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.is_empty() {
                combined.push_str("\n[STDERR]\n");
                combined.push_str(&stderr);
            }
            CommandOutcome::Success { output: combined }
        }
        Ok(output) => CommandOutcome::Error {
            fault: ExecutionFault::NonZeroExit(output.status.code().unwrap_or(-1)),
            detail: String::from_utf8_lossy(&output.stderr).into_owned(),
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => CommandOutcome::Error {
            fault: ExecutionFault::CommandNotFound,
            detail: e.to_string(),
        },
        Err(e) => CommandOutcome::Error {
            fault: ExecutionFault::Unexpected,
            detail: e.to_string(),
        },
    };

    (outcome, started.elapsed().as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_success_captures_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let (outcome, duration) = execute("echo hello", dir.path()).await;

        assert_eq!(outcome.status(), TaskStatus::Success);
        assert_eq!(outcome.into_output(), "hello\n");
        assert!(duration >= 0.0);
    }

    #[tokio::test]
    async fn test_stderr_appended_under_marker() {
        let dir = tempfile::tempdir().unwrap();
        let (outcome, _) = execute("echo out; echo oops 1>&2", dir.path()).await;

        assert_eq!(outcome.status(), TaskStatus::Success);
        let output = outcome.into_output();
        assert!(output.starts_with("out\n"));
        assert!(output.contains("[STDERR]"));
        assert!(output.contains("oops"));
    }

    #[tokio::test]
    async fn test_runs_in_shared_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "present").unwrap();

        let (outcome, _) = execute("cat marker.txt", dir.path()).await;
        assert_eq!(outcome.into_output(), "present");
    }

    #[tokio::test]
    async fn test_shell_metacharacters_supported() {
        let dir = tempfile::tempdir().unwrap();
        let (outcome, _) = execute("echo a && echo b | tr 'b' 'c'", dir.path()).await;

        assert_eq!(outcome.into_output(), "a\nc\n");
    }

    #[tokio::test]
    async fn test_nonzero_exit_reports_code() {
        let dir = tempfile::tempdir().unwrap();
        let (outcome, _) = execute("false", dir.path()).await;

        assert_eq!(outcome.status(), TaskStatus::Error);
        assert!(matches!(
            outcome,
            CommandOutcome::Error { fault: ExecutionFault::NonZeroExit(1), .. }
        ));
        assert!(outcome.into_output().contains("error code 1"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_includes_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let (outcome, _) = execute("echo broken 1>&2; exit 7", dir.path()).await;

        let output = outcome.into_output();
        assert!(output.contains("error code 7"));
        assert!(output.contains("broken"));
    }

    #[tokio::test]
    async fn test_missing_shared_directory() {
        let (outcome, _) = execute("echo hi", Path::new("/nonexistent/taskherd/shared")).await;

        assert_eq!(outcome.status(), TaskStatus::Error);
        assert!(matches!(
            outcome,
            CommandOutcome::Error { fault: ExecutionFault::CommandNotFound, .. }
        ));
        assert_eq!(
            outcome.into_output(),
            "Command not found or shared directory not mounted."
        );
    }
}
