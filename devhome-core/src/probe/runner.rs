//! External process execution for version probes.
//!
//! Every process is spawned with a null stdin, a cleared environment
//! (only `PATH` and `LC_ALL=C` are passed through), captured and capped
//! output, and a hard deadline. A process still running at the deadline is
//! killed when its handle is dropped.

use crate::error::DevhomeError;
use crate::Result;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{instrument, trace, warn};

/// Default cap for each of stdout and stderr (64 KiB). Version banners are
/// a few hundred bytes at most.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 64 * 1024;

/// `PATH` used when the parent process has none.
const FALLBACK_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// Captured result of one process run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Captured standard output, lossily decoded
    pub stdout: String,
    /// Captured standard error, lossily decoded
    pub stderr: String,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    /// Whether either stream hit the output cap
    pub truncated: bool,
}

impl CommandOutput {
    /// Output with only stdout set, exit code 0.
    pub fn from_stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            exit_code: Some(0),
            ..Default::default()
        }
    }

    /// Whether the process exited with status 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout followed by stderr, trimmed.
    pub fn text(&self) -> String {
        let mut text = self.stdout.trim().to_string();
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(stderr);
        }
        text
    }
}

/// Runs external programs on behalf of the probes.
///
/// Implementations must bound every call by `timeout` and must never
/// panic on spawn failure; failures are reported as
/// [`DevhomeError::StrategyUnavailable`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Whether process execution is permitted at all.
    fn available(&self) -> bool;

    /// Runs `program` with `args`, waiting at most `timeout`.
    ///
    /// # Errors
    /// Returns [`DevhomeError::StrategyUnavailable`] when the process cannot
    /// be spawned, times out, or execution is disabled.
    async fn run(&self, program: &str, args: &[String], timeout: Duration)
    -> Result<CommandOutput>;
}

/// [`CommandRunner`] backed by `tokio::process`.
#[derive(Debug, Clone)]
pub struct TokioCommandRunner {
    max_output_bytes: usize,
}

impl Default for TokioCommandRunner {
    fn default() -> Self {
        Self {
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

impl TokioCommandRunner {
    /// Runner with the default output cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-stream output cap.
    pub fn with_max_output(mut self, max_output_bytes: usize) -> Self {
        self.max_output_bytes = max_output_bytes;
        self
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    fn available(&self) -> bool {
        true
    }

    #[instrument(skip(self, args, timeout))]
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandOutput> {
        let path = std::env::var_os("PATH").unwrap_or_else(|| FALLBACK_PATH.into());

        let mut child = Command::new(program)
            .args(args)
            .env_clear()
            .env("PATH", path)
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DevhomeError::strategy_unavailable(program, format!("spawn failed: {}", e)))?;

        let cap = self.max_output_bytes;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let collect = async {
            let (out, err) = tokio::join!(read_capped(stdout, cap), read_capped(stderr, cap));
            let (out, out_truncated) = out?;
            let (err, err_truncated) = err?;
            let truncated = out_truncated || err_truncated;
            if truncated {
                // The child may block on a full pipe once we stop reading.
                let _ = child.start_kill();
            }
            let status = child.wait().await?;
            Ok::<_, std::io::Error>(CommandOutput {
                stdout: String::from_utf8_lossy(&out).into_owned(),
                stderr: String::from_utf8_lossy(&err).into_owned(),
                exit_code: status.code(),
                truncated,
            })
        };

        match tokio::time::timeout(timeout, collect).await {
            Ok(Ok(output)) => {
                if output.truncated {
                    warn!(limit = cap, "command output truncated");
                }
                trace!(exit_code = ?output.exit_code, "command finished");
                Ok(output)
            }
            Ok(Err(e)) => Err(DevhomeError::strategy_unavailable(
                program,
                format!("failed to collect output: {}", e),
            )),
            Err(_) => Err(DevhomeError::strategy_unavailable(
                program,
                format!("timed out after {:?}", timeout),
            )),
        }
    }
}

async fn read_capped<R>(reader: Option<R>, cap: usize) -> std::io::Result<(Vec<u8>, bool)>
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return Ok((Vec::new(), false));
    };
    let mut buf = Vec::new();
    let limit = u64::try_from(cap).unwrap_or(u64::MAX).saturating_add(1);
    reader.take(limit).read_to_end(&mut buf).await?;
    let truncated = buf.len() > cap;
    buf.truncate(cap);
    Ok((buf, truncated))
}

/// Runner used when process execution is disabled by policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCommandRunner;

#[async_trait]
impl CommandRunner for DisabledCommandRunner {
    fn available(&self) -> bool {
        false
    }

    async fn run(
        &self,
        program: &str,
        _args: &[String],
        _timeout: Duration,
    ) -> Result<CommandOutput> {
        Err(DevhomeError::strategy_unavailable(
            program,
            "process execution disabled",
        ))
    }
}
