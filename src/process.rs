// src/process.rs

//! One-shot execution of an external program under time and memory limits.
//!
//! The child is never run interactively: stdin is written in full, stdout
//! and stderr are drained concurrently (so neither side can fill a pipe
//! and deadlock), and the call returns once the child has exited or the
//! watchdog has killed it.
//!
//! Failures to start or talk to the child never surface as errors. They
//! come back as an [`ExecutionResult`] with [`SPAWN_FAILURE_EXIT_CODE`] so
//! a judging session keeps making progress across many test cases.

use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command as TokioCommand;

use crate::config::Config;
use crate::util::decode_text;
use crate::watchdog::{Breach, Watchdog};

/// Exit code reported when the child could not be started or waited on.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = -1;

const READ_CHUNK: usize = 8 * 1024;

/// Per-call ceilings. Zero means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLimits {
    pub time_limit_ms: u64,
    pub memory_limit_bytes: u64,
}

impl ExecutionLimits {
    pub const UNLIMITED: ExecutionLimits = ExecutionLimits {
        time_limit_ms: 0,
        memory_limit_bytes: 0,
    };

    pub fn new(time_limit_ms: u64, memory_limit_bytes: u64) -> Self {
        Self {
            time_limit_ms,
            memory_limit_bytes,
        }
    }

    /// `observed >= limit`, only when the time limit is set.
    pub fn time_exceeded(&self, wall_time_ms: u64) -> bool {
        self.time_limit_ms > 0 && wall_time_ms >= self.time_limit_ms
    }

    /// `observed >= limit`, only when the memory limit is set.
    pub fn memory_exceeded(&self, peak_memory_bytes: u64) -> bool {
        self.memory_limit_bytes > 0 && peak_memory_bytes >= self.memory_limit_bytes
    }
}

/// Outcome of one program run.
///
/// Text fields are decoded permissively (invalid UTF-8 dropped) with
/// carriage returns removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub wall_time_ms: u64,
    pub peak_memory_bytes: u64,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,

    /// Set when stdout or stderr hit the output ceiling and the rest was
    /// discarded.
    #[serde(default)]
    pub output_truncated: bool,
}

impl ExecutionResult {
    /// Result for a child that never ran.
    pub fn spawn_failure() -> Self {
        Self {
            wall_time_ms: 0,
            peak_memory_bytes: 0,
            exit_code: SPAWN_FAILURE_EXIT_CODE,
            stdout: String::new(),
            stderr: String::new(),
            output_truncated: false,
        }
    }

    /// Zero-cost successful result carrying `stdout` (used by file-backed
    /// adapters).
    pub fn from_stdout(stdout: String) -> Self {
        Self {
            wall_time_ms: 0,
            peak_memory_bytes: 0,
            exit_code: 0,
            stdout,
            stderr: String::new(),
            output_truncated: false,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs external programs. Cheap to clone; holds only read-only settings.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    output_limit_bytes: u64,
    sample_every: Duration,
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ProcessExecutor {
    /// `output_limit_bytes` caps what is kept of each stream (0 keeps all).
    pub fn new(output_limit_bytes: u64, sample_every: Duration) -> Self {
        Self {
            output_limit_bytes,
            sample_every,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            cfg.max_output,
            Duration::from_millis(cfg.sample_interval_ms.max(1)),
        )
    }

    /// Run `args[0]` with `args[1..]`, feeding `stdin`, under `limits`.
    pub async fn run(&self, args: &[String], stdin: &[u8], limits: ExecutionLimits) -> ExecutionResult {
        let Some((program, rest)) = args.split_first() else {
            tracing::warn!("empty command line, nothing to run");
            return ExecutionResult::spawn_failure();
        };

        let mut cmd = TokioCommand::new(program);
        cmd.args(rest)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group: a breach kills every descendant, and with
        // them every writer of our pipes.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(program = %program, error = %e, "failed to spawn child");
                return ExecutionResult::spawn_failure();
            }
        };

        let started = Instant::now();
        let watchdog = child
            .id()
            .map(|pid| Watchdog::start(pid, started, limits, self.sample_every));

        tracing::debug!(
            program = %program,
            pid = ?child.id(),
            time_limit_ms = limits.time_limit_ms,
            memory_limit_bytes = limits.memory_limit_bytes,
            "child spawned"
        );

        let stdin_pipe = child.stdin.take();
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        let feed = async move {
            let Some(mut pipe) = stdin_pipe else {
                return;
            };
            // A child may close stdin early; that is its business.
            if let Err(e) = pipe.write_all(stdin).await {
                tracing::debug!(error = %e, "stdin write failed, treating as consumed");
            }
            if let Err(e) = pipe.shutdown().await {
                tracing::debug!(error = %e, "stdin close failed");
            }
        };

        let (_, stdout, stderr) = tokio::join!(
            feed,
            drain(stdout_pipe, self.output_limit_bytes),
            drain(stderr_pipe, self.output_limit_bytes),
        );

        let exit_code = match child.wait().await {
            Ok(status) => exit_code_of(status),
            Err(e) => {
                tracing::warn!(error = %e, "failed while waiting for child");
                SPAWN_FAILURE_EXIT_CODE
            }
        };

        let elapsed = started.elapsed();
        let report = watchdog.map(Watchdog::stop_and_take).unwrap_or_default();

        let mut wall_time_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let mut peak_memory_bytes = report.peak_memory_bytes;

        // Breached runs report exactly the configured threshold.
        match report.breach {
            Some(Breach::Time) => wall_time_ms = limits.time_limit_ms,
            Some(Breach::Memory) => peak_memory_bytes = limits.memory_limit_bytes,
            None => {}
        }

        ExecutionResult {
            wall_time_ms,
            peak_memory_bytes,
            exit_code,
            stdout: decode_text(&stdout.bytes),
            stderr: decode_text(&stderr.bytes),
            output_truncated: stdout.truncated || stderr.truncated,
        }
    }
}

#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    truncated: bool,
}

/// Read a pipe to EOF, keeping at most `cap` bytes (0 keeps everything).
async fn drain<R>(pipe: Option<R>, cap: u64) -> Captured
where
    R: AsyncRead + Unpin,
{
    let mut captured = Captured::default();
    let Some(mut pipe) = pipe else {
        return captured;
    };

    let cap = if cap == 0 {
        usize::MAX
    } else {
        usize::try_from(cap).unwrap_or(usize::MAX)
    };
    let mut chunk = vec![0u8; READ_CHUNK];

    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                let room = cap.saturating_sub(captured.bytes.len());
                if n > room {
                    captured.truncated = true;
                }
                captured.bytes.extend_from_slice(&chunk[..n.min(room)]);
            }
            Err(e) => {
                tracing::warn!(error = %e, "pipe read failed, keeping partial output");
                break;
            }
        }
    }

    captured
}

fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    SPAWN_FAILURE_EXIT_CODE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_limits_never_breach() {
        let limits = ExecutionLimits::UNLIMITED;
        assert!(!limits.time_exceeded(u64::MAX));
        assert!(!limits.memory_exceeded(u64::MAX));
    }

    #[test]
    fn limit_boundary_is_inclusive() {
        let limits = ExecutionLimits::new(1000, 4096);
        assert!(limits.time_exceeded(1000));
        assert!(!limits.time_exceeded(999));
        assert!(limits.memory_exceeded(4096));
        assert!(!limits.memory_exceeded(4095));
    }

    #[tokio::test]
    async fn drain_caps_retained_bytes() {
        let data: &[u8] = b"0123456789";
        let captured = drain(Some(data), 4).await;
        assert_eq!(captured.bytes, b"0123");
        assert!(captured.truncated);

        let captured = drain(Some(data), 0).await;
        assert_eq!(captured.bytes, data);
        assert!(!captured.truncated);
    }

    #[tokio::test]
    async fn empty_command_is_a_spawn_failure() {
        let result = ProcessExecutor::default()
            .run(&[], b"", ExecutionLimits::UNLIMITED)
            .await;
        assert_eq!(result.exit_code, SPAWN_FAILURE_EXIT_CODE);
        assert!(result.stdout.is_empty());
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_failure() {
        let args = vec!["/definitely/not/a/real/program-oijudge".to_string()];
        let result = ProcessExecutor::default()
            .run(&args, b"", ExecutionLimits::UNLIMITED)
            .await;
        assert_eq!(result.exit_code, SPAWN_FAILURE_EXIT_CODE);
        assert!(!result.succeeded());
    }
}
