//! Subprocess execution.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Combined result of one subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process never ran or was killed by a signal.
    pub exit_code: Option<i32>,
    /// stdout followed by stderr.
    pub text: String,
    /// Whether the process could be spawned at all.
    pub launched: bool,
}

impl CommandOutput {
    pub fn new(exit_code: i32, text: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            text: text.into(),
            launched: true,
        }
    }

    /// Output of a process that could not be started.
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs a program with an argument vector. Never fails: launch errors are
/// reported as [`CommandOutput::unavailable`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String]) -> CommandOutput;
}

/// Runs real processes on the tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill the child if it runs longer than `limit`.
    pub fn with_timeout(limit: Duration) -> Self {
        Self { timeout: Some(limit) }
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[String]) -> CommandOutput {
        debug!("Running: {} {}", program, args.join(" "));

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // output() drains both pipes before waiting.
        let result = match self.timeout {
            Some(limit) => match timeout(limit, cmd.output()).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("{} timed out after {:?}", program, limit);
                    return CommandOutput::unavailable();
                }
            },
            None => cmd.output().await,
        };

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                warn!("Failed to launch {}: {}", program, e);
                return CommandOutput::unavailable();
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut text = stdout.into_owned();
        if !stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&stderr);
        }

        CommandOutput {
            exit_code: output.status.code(),
            text,
            launched: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_constructors() {
        let out = CommandOutput::new(0, "ok");
        assert!(out.success());
        assert!(out.launched);

        let out = CommandOutput::unavailable();
        assert!(!out.success());
        assert!(!out.launched);
        assert!(out.text.is_empty());
    }

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let runner = SystemRunner::new();
        let out = runner.run("/nonexistent/launchwarden-test-binary", &[]).await;
        assert_eq!(out, CommandOutput::unavailable());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_combines_stdout_and_stderr() {
        let runner = SystemRunner::new();
        let args = vec!["-c".to_string(), "echo out; echo err >&2; exit 3".to_string()];
        let out = runner.run("sh", &args).await;
        assert_eq!(out.exit_code, Some(3));
        assert!(out.text.contains("out"));
        assert!(out.text.contains("err"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_reports_unavailable() {
        let runner = SystemRunner::with_timeout(Duration::from_millis(50));
        let args = vec!["5".to_string()];
        let out = runner.run("sleep", &args).await;
        assert!(!out.launched);
    }
}
