//! External command execution.
//!
//! Runs ffmpeg/ffprobe invocations with a hard timeout, capturing stdout and
//! stderr as two independent streams. Failures never escape as errors; every
//! outcome is materialized as a [`ConversionResult`].

use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;

/// Default per-invocation timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Outcome of a single external command invocation.
///
/// Produced only after the process has fully terminated (or been killed);
/// there is no partial/streaming variant.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// True when the process exited with code 0.
    pub success: bool,
    /// Process exit code. `-1` when the process never produced a normal
    /// exit: timeout, kill-by-signal, or launch failure.
    pub exit_code: i32,
    /// Captured standard output, newline-joined.
    pub stdout: String,
    /// Captured standard error. ffmpeg writes its diagnostics here.
    pub stderr: String,
}

impl ConversionResult {
    fn launch_failure(message: String) -> Self {
        Self {
            success: false,
            exit_code: -1,
            stdout: String::new(),
            stderr: message,
        }
    }
}

/// Drain one pipe line-by-line on its own task.
///
/// Both pipes must be drained concurrently while the process runs: ffmpeg
/// blocks once a pipe buffer fills, and verbose encoder logging routinely
/// exceeds the OS buffer size.
///
/// Capture is lossy UTF-8. ffmpeg echoes raw input metadata (ID3/EXIF tags
/// in arbitrary encodings) to stderr, so the drain must survive invalid
/// bytes; dropping the reader mid-stream would kill the child with SIGPIPE.
fn drain_lines<R>(reader: R) -> JoinHandle<Vec<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut collected = Vec::new();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    while matches!(buf.last(), Some(b'\n') | Some(b'\r')) {
                        buf.pop();
                    }
                    collected.push(String::from_utf8_lossy(&buf).into_owned());
                }
                Err(e) => {
                    tracing::debug!("stream read error: {}", e);
                    break;
                }
            }
        }
        collected
    })
}

fn join_lines(joined: Result<Vec<String>, tokio::task::JoinError>) -> String {
    joined.map(|lines| lines.join("\n")).unwrap_or_default()
}

/// Run `command[0]` with `command[1..]` as arguments, without a shell.
///
/// Waits up to `timeout_secs` for the process to exit. On timeout the
/// process is killed, the stream readers are still joined so whatever was
/// captured is preserved, and a timeout notice is appended to stderr.
/// A launch failure (missing executable, permission denied) is reported the
/// same way, with exit code -1.
pub async fn run_command(command: &[String], timeout_secs: u64) -> ConversionResult {
    let Some((program, args)) = command.split_first() else {
        return ConversionResult::launch_failure("empty command".to_string());
    };

    let mut child = match Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            tracing::error!("failed to launch {}: {}", program, e);
            return ConversionResult::launch_failure(format!(
                "failed to launch {}: {}",
                program, e
            ));
        }
    };

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        let _ = child.kill().await;
        return ConversionResult::launch_failure("child stdio pipes unavailable".to_string());
    };

    let stdout_task = drain_lines(stdout);
    let stderr_task = drain_lines(stderr);

    match tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait()).await {
        Ok(Ok(status)) => {
            let stdout = join_lines(stdout_task.await);
            let stderr = join_lines(stderr_task.await);
            ConversionResult {
                success: status.success(),
                exit_code: status.code().unwrap_or(-1),
                stdout,
                stderr,
            }
        }
        Ok(Err(e)) => {
            let _ = child.kill().await;
            let stdout = join_lines(stdout_task.await);
            let mut stderr = join_lines(stderr_task.await);
            if !stderr.is_empty() {
                stderr.push('\n');
            }
            stderr.push_str(&format!("failed to wait for {}: {}", program, e));
            ConversionResult {
                success: false,
                exit_code: -1,
                stdout,
                stderr,
            }
        }
        Err(_) => {
            tracing::warn!("{} timed out after {} seconds, killing", program, timeout_secs);
            // Killing the process closes its pipes, which unblocks the readers.
            let _ = child.kill().await;
            let stdout = join_lines(stdout_task.await);
            let mut stderr = join_lines(stderr_task.await);
            if !stderr.is_empty() {
                stderr.push('\n');
            }
            stderr.push_str(&format!("Process timed out after {} seconds.", timeout_secs));
            ConversionResult {
                success: false,
                exit_code: -1,
                stdout,
                stderr,
            }
        }
    }
}
