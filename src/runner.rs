//! Script runner
//!
//! Executes opaque script text by spawning a shell process and capturing
//! its output streams. Script content is never inspected or validated.

use async_trait::async_trait;
use std::io;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::debug;

/// Errors that can occur while running a script
///
/// These are runner-level faults (the process could not be run at all),
/// distinct from a script that runs and reports errors of its own.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The shell process could not be started
    #[error("failed to spawn script process: {0}")]
    Spawn(#[source] io::Error),

    /// Reading the process output or waiting for exit failed
    #[error("script i/o failed: {0}")]
    Io(#[from] io::Error),

    /// Process output could not be decoded as UTF-8
    #[error("invalid output encoding: {0}")]
    InvalidEncoding(String),

    /// Script execution exceeded the timeout limit
    #[error("script execution timed out after {0} seconds")]
    Timeout(u64),
}

/// Captured result of one script run
#[derive(Debug, Clone)]
pub struct ScriptOutput {
    /// Lines the script wrote to its output stream, in order
    pub output_lines: Vec<String>,
    /// Whether the run produced one or more errors
    pub had_errors: bool,
}

/// Executes an opaque script string and reports captured output plus a
/// success/failure indicator
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Run `script` to completion
    async fn run(&self, script: &str) -> Result<ScriptOutput, ExecutionError>;
}

/// Script runner backed by the system shell
///
/// Spawns `sh -c <script>` with both output streams piped. `output_lines`
/// carries the stdout lines; anything on stderr, or a non-success exit
/// status, flips `had_errors`. The error stream is kept separate from
/// ordinary output.
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    /// Create a runner using `sh`
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }

    #[cfg(test)]
    fn with_shell(shell: &str) -> Self {
        Self {
            shell: shell.to_string(),
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScriptRunner for ShellRunner {
    async fn run(&self, script: &str) -> Result<ScriptOutput, ExecutionError> {
        debug!(script_len = script.len(), "spawning script process");

        let mut child = Command::new(&self.shell)
            .arg("-c")
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // If the caller drops this future (timeout), the process must
            // not outlive it.
            .kill_on_drop(true)
            .spawn()
            .map_err(ExecutionError::Spawn)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExecutionError::Io(io::Error::other("failed to capture stdout")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExecutionError::Io(io::Error::other("failed to capture stderr")))?;

        // Drain both pipes concurrently so neither side can fill up and
        // stall the child.
        let (output_lines, error_lines) =
            tokio::try_join!(collect_lines(stdout), collect_lines(stderr))?;

        let status = child.wait().await?;

        debug!(
            exit_code = status.code().unwrap_or(-1),
            stdout_lines = output_lines.len(),
            stderr_lines = error_lines.len(),
            "script process finished"
        );

        Ok(ScriptOutput {
            output_lines,
            had_errors: !status.success() || !error_lines.is_empty(),
        })
    }
}

async fn collect_lines<R>(stream: R) -> Result<Vec<String>, ExecutionError>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    let mut collected = Vec::new();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => collected.push(line),
            Ok(None) => return Ok(collected),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(ExecutionError::InvalidEncoding(e.to_string()))
            }
            Err(e) => return Err(ExecutionError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout_lines() {
        let runner = ShellRunner::new();
        let output = runner.run("echo one; echo two").await.unwrap();

        assert_eq!(output.output_lines, vec!["one", "two"]);
        assert!(!output.had_errors);
    }

    #[tokio::test]
    async fn test_stderr_flags_errors_without_polluting_output() {
        let runner = ShellRunner::new();
        let output = runner
            .run("echo visible; echo hidden >&2")
            .await
            .unwrap();

        assert_eq!(output.output_lines, vec!["visible"]);
        assert!(output.had_errors);
    }

    #[tokio::test]
    async fn test_nonzero_exit_flags_errors() {
        let runner = ShellRunner::new();
        let output = runner.run("exit 3").await.unwrap();

        assert!(output.output_lines.is_empty());
        assert!(output.had_errors);
    }

    #[tokio::test]
    async fn test_missing_shell_is_a_spawn_error() {
        let runner = ShellRunner::with_shell("no-such-shell-9f2d1c");
        let result = runner.run("echo unreachable").await;

        match result {
            Err(ExecutionError::Spawn(_)) => {}
            other => panic!("expected Spawn error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_script_text_is_passed_verbatim() {
        let runner = ShellRunner::new();
        // Shell metacharacters must reach the shell untouched.
        let output = runner.run("printf '%s\\n' \"a b\" 'c|d'").await.unwrap();

        assert_eq!(output.output_lines, vec!["a b", "c|d"]);
        assert!(!output.had_errors);
    }
}
