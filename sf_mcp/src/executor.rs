//! # Process Executor
//!
//! Runs one [`CommandInvocation`] as a child process and captures its output.
//!
//! The child is spawned directly from an argument vector, never through a shell, with
//! stdin closed. Two bounds apply to every run:
//!
//! - a wall-clock timeout ([`ExecutorConfig::timeout`], 300 s by default);
//! - a combined stdout + stderr ceiling ([`ExecutorConfig::max_output_bytes`],
//!   10 MiB by default).
//!
//! Breaching either kills the child and yields an [`ExecutionError`]; a partial
//! result is never reported as success. A non-zero exit status is an error too. Each
//! call spawns exactly one process: there is no retry and no process reuse.

use std::fmt;
use std::process::{ExitStatus, Stdio};
use std::time::Instant;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::config::ExecutorConfig;

const READ_CHUNK: usize = 8 * 1024;

/// Longest stderr excerpt carried in an error message.
const MAX_DIAGNOSTIC_CHARS: usize = 4 * 1024;

/// A program plus its argument vector. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    program: String,
    args: Vec<String>,
}

impl CommandInvocation {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for CommandInvocation {
    /// Shell-quoted rendering, suitable for logs and copy-paste.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words = std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str));
        match shlex::try_join(words) {
            Ok(joined) => f.write_str(&joined),
            Err(_) => {
                // Only reachable with embedded NUL bytes.
                let mut first = true;
                for word in std::iter::once(&self.program).chain(self.args.iter()) {
                    if !first {
                        f.write_str(" ")?;
                    }
                    f.write_str(word)?;
                    first = false;
                }
                Ok(())
            }
        }
    }
}

/// Output of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Why a run did not produce a usable result.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` timed out after {seconds}s{}", diagnostic_suffix(.diagnostic))]
    Timeout {
        command: String,
        seconds: u64,
        diagnostic: String,
    },

    #[error("`{command}` produced more than {limit} bytes of output{}", diagnostic_suffix(.diagnostic))]
    OutputLimit {
        command: String,
        limit: usize,
        diagnostic: String,
    },

    #[error("`{command}` exited with {status}{}", diagnostic_suffix(.diagnostic))]
    ExitStatus {
        command: String,
        status: ExitStatus,
        diagnostic: String,
    },

    #[error("I/O error while running `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

fn diagnostic_suffix(diagnostic: &str) -> String {
    if diagnostic.is_empty() {
        String::new()
    } else {
        format!(": {diagnostic}")
    }
}

/// Trims and bounds captured text for use in an error message.
fn diagnostic_from(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    if text.chars().count() <= MAX_DIAGNOSTIC_CHARS {
        return text.to_string();
    }
    let tail: String = text
        .chars()
        .rev()
        .take(MAX_DIAGNOSTIC_CHARS)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("...{tail}")
}

#[derive(Default)]
struct Captured {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl Captured {
    fn total(&self) -> usize {
        self.stdout.len() + self.stderr.len()
    }

    /// stderr if there is any, otherwise stdout (`sf --json` reports failures on stdout).
    fn diagnostic(&self) -> String {
        let stderr = diagnostic_from(&self.stderr);
        if stderr.is_empty() {
            diagnostic_from(&self.stdout)
        } else {
            stderr
        }
    }
}

enum CaptureError {
    LimitExceeded,
    Io(std::io::Error),
}

/// Drains both pipes concurrently until EOF or until `limit` bytes have been read.
async fn capture<O, E>(
    mut stdout: O,
    mut stderr: E,
    captured: &mut Captured,
    limit: usize,
) -> Result<(), CaptureError>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut out_buf = [0u8; READ_CHUNK];
    let mut err_buf = [0u8; READ_CHUNK];
    let (mut out_open, mut err_open) = (true, true);

    while out_open || err_open {
        tokio::select! {
            read = stdout.read(&mut out_buf), if out_open => {
                let n = read.map_err(CaptureError::Io)?;
                if n == 0 {
                    out_open = false;
                } else {
                    captured.stdout.extend_from_slice(&out_buf[..n]);
                }
            }
            read = stderr.read(&mut err_buf), if err_open => {
                let n = read.map_err(CaptureError::Io)?;
                if n == 0 {
                    err_open = false;
                } else {
                    captured.stderr.extend_from_slice(&err_buf[..n]);
                }
            }
        }
        if captured.total() > limit {
            return Err(CaptureError::LimitExceeded);
        }
    }
    Ok(())
}

enum RunOutcome {
    Exited(ExitStatus),
    LimitExceeded,
    Io(std::io::Error),
}

/// Runs CLI invocations under the configured bounds. Cheap to clone; holds no state
/// beyond its configuration.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    config: ExecutorConfig,
}

impl ProcessExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Builds an invocation of the configured program with `args`.
    pub fn invocation(&self, args: Vec<String>) -> CommandInvocation {
        CommandInvocation::new(self.config.program.clone(), args)
    }

    /// Runs `invocation` to completion.
    pub async fn run(&self, invocation: &CommandInvocation) -> Result<ExecutionResult, ExecutionError> {
        let command = invocation.to_string();
        tracing::info!(%command, "Executing CLI command");
        let started = Instant::now();

        let mut child = Command::new(invocation.program())
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExecutionError::Spawn {
                command: command.clone(),
                source,
            })?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(ExecutionError::Io {
                command,
                source: std::io::Error::other("child stdio was not captured"),
            });
        };

        let limit = self.config.max_output_bytes;
        let mut captured = Captured::default();
        let outcome = tokio::time::timeout(self.config.timeout, async {
            match capture(stdout, stderr, &mut captured, limit).await {
                Ok(()) => match child.wait().await {
                    Ok(status) => RunOutcome::Exited(status),
                    Err(e) => RunOutcome::Io(e),
                },
                Err(CaptureError::LimitExceeded) => RunOutcome::LimitExceeded,
                Err(CaptureError::Io(e)) => RunOutcome::Io(e),
            }
        })
        .await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let status = match outcome {
            Ok(RunOutcome::Exited(status)) => status,
            Ok(RunOutcome::LimitExceeded) => {
                terminate(&mut child, &command).await;
                tracing::warn!(%command, limit, elapsed_ms, "CLI output exceeded limit; process killed");
                return Err(ExecutionError::OutputLimit {
                    command,
                    limit,
                    diagnostic: captured.diagnostic(),
                });
            }
            Ok(RunOutcome::Io(source)) => {
                terminate(&mut child, &command).await;
                return Err(ExecutionError::Io { command, source });
            }
            Err(_) => {
                terminate(&mut child, &command).await;
                let seconds = self.config.timeout.as_secs();
                tracing::warn!(%command, seconds, "CLI command timed out; process killed");
                return Err(ExecutionError::Timeout {
                    command,
                    seconds,
                    diagnostic: captured.diagnostic(),
                });
            }
        };

        if !status.success() {
            tracing::error!(%command, %status, elapsed_ms, "CLI command failed");
            return Err(ExecutionError::ExitStatus {
                command,
                status,
                diagnostic: captured.diagnostic(),
            });
        }

        tracing::debug!(
            %command,
            elapsed_ms,
            stdout_bytes = captured.stdout.len(),
            stderr_bytes = captured.stderr.len(),
            "CLI command completed"
        );

        Ok(ExecutionResult {
            stdout: String::from_utf8_lossy(&captured.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&captured.stderr).into_owned(),
            exit_code: status.code(),
        })
    }
}

async fn terminate(child: &mut tokio::process::Child, command: &str) {
    if let Err(e) = child.kill().await {
        tracing::debug!(%command, "kill after abort failed (process likely exited): {}", e);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_utils::FakeCli;
    use std::time::Duration;

    fn executor_for(cli: &FakeCli) -> ProcessExecutor {
        ProcessExecutor::new(cli.executor_config())
    }

    #[tokio::test]
    async fn captures_stdout_and_stderr_verbatim() {
        let cli = FakeCli::new("printf '  out  \\n'; printf 'warn\\n' >&2");
        let result = executor_for(&cli)
            .run(&cli.invocation(&[]))
            .await
            .unwrap();
        assert_eq!(result.stdout, "  out  \n");
        assert_eq!(result.stderr, "warn\n");
        assert_eq!(result.exit_code, Some(0));
    }

    #[tokio::test]
    async fn arguments_reach_the_child_unsplit() {
        let cli = FakeCli::echo_args();
        let result = executor_for(&cli)
            .run(&cli.invocation(&["--query", "SELECT Id FROM Account; rm -rf /"]))
            .await
            .unwrap();
        assert_eq!(result.stdout, "--query\nSELECT Id FROM Account; rm -rf /\n");
    }

    #[tokio::test]
    async fn non_zero_exit_is_an_error_with_diagnostic() {
        let cli = FakeCli::new("echo 'No authorization found' >&2; exit 3");
        let err = executor_for(&cli)
            .run(&cli.invocation(&[]))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::ExitStatus { .. }));
        assert!(err.to_string().contains("No authorization found"));
    }

    #[tokio::test]
    async fn non_zero_exit_falls_back_to_stdout_diagnostic() {
        let cli = FakeCli::new("echo '{\"status\":1,\"message\":\"bad org\"}'; exit 1");
        let err = executor_for(&cli)
            .run(&cli.invocation(&[]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("bad org"), "{err}");
    }

    #[tokio::test]
    async fn timeout_kills_the_child_and_reports_an_error() {
        let cli = FakeCli::new("echo started >&2; exec sleep 30");
        let executor = ProcessExecutor::new(cli.executor_config().timeout(Duration::from_millis(300)));
        let started = Instant::now();
        let err = executor.run(&cli.invocation(&[])).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(10));
        match err {
            ExecutionError::Timeout { diagnostic, .. } => assert_eq!(diagnostic, "started"),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn output_over_the_limit_is_an_error_not_a_truncated_success() {
        let cli = FakeCli::new("yes sfdx | head -c 65536");
        let executor = ProcessExecutor::new(cli.executor_config().max_output_bytes(1024));
        let err = executor.run(&cli.invocation(&[])).await.unwrap_err();
        assert!(matches!(err, ExecutionError::OutputLimit { limit: 1024, .. }));
    }

    #[tokio::test]
    async fn output_exactly_at_the_limit_succeeds() {
        let cli = FakeCli::new("head -c 1024 /dev/zero");
        let executor = ProcessExecutor::new(cli.executor_config().max_output_bytes(1024));
        let result = executor.run(&cli.invocation(&[])).await.unwrap();
        assert_eq!(result.stdout.len(), 1024);
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let executor = ProcessExecutor::new(ExecutorConfig::with_program(
            "/nonexistent/path/to/sf-cli-binary",
        ));
        let err = executor
            .run(&executor.invocation(vec!["org".into(), "list".into()]))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Spawn { .. }));
    }

    #[test]
    fn invocation_display_quotes_words_with_spaces() {
        let invocation = CommandInvocation::new(
            "sf",
            vec!["data".into(), "query".into(), "--query".into(), "SELECT Id FROM Account".into()],
        );
        let display = invocation.to_string();
        assert!(display.starts_with("sf data query --query "), "{display}");
        assert_eq!(
            shlex::split(&display).unwrap(),
            vec!["sf", "data", "query", "--query", "SELECT Id FROM Account"]
        );
    }
}
