//! Interruptible external process execution.

use std::collections::VecDeque;
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::ActionError;

/// Stderr lines kept for failure messages.
const STDERR_TAIL_LINES: usize = 20;

/// A spawnable engine binary plus how long it may take to honor a termination request.
#[derive(Debug, Clone)]
pub(crate) struct ExternalProcess<'a> {
    pub engine: &'a str,
    pub program: &'a Path,
    pub grace: Duration,
}

impl ExternalProcess<'_> {
    /// Runs the process to completion, feeding each stderr line to `on_line`.
    ///
    /// If `cancel` fires first the process is asked to terminate, given the
    /// grace period, then killed, and `ActionError::Cancelled` is returned.
    pub async fn run<I, S>(
        &self,
        args: I,
        cancel: &CancellationToken,
        mut on_line: impl FnMut(&str) + Send,
    ) -> Result<(), ActionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut child = Command::new(self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        debug!(engine = self.engine, pid = ?child.id(), "Spawned external process");

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ActionError::process_failed("stderr was not captured", None))?;
        let mut lines = BufReader::new(stderr).lines();
        let mut tail = StderrTail::default();

        let mut interrupted = false;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    interrupted = true;
                    break;
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        on_line(&line);
                        tail.push(line);
                    }
                    Ok(None) => break,
                    Err(e) => {
                        debug!(engine = self.engine, error = %e, "Stopped reading stderr");
                        break;
                    }
                }
            }
        }

        let status = if interrupted {
            None
        } else {
            tokio::select! {
                status = child.wait() => Some(status?),
                _ = cancel.cancelled() => None,
            }
        };

        let Some(status) = status else {
            self.terminate(&mut child).await;
            return Err(ActionError::Cancelled);
        };

        if !status.success() {
            return Err(ActionError::process_failed(
                format!("{} exited with code: {:?}", self.engine, status.code()),
                tail.into_string(),
            ));
        }
        Ok(())
    }

    /// Requests termination, then kills the process once the grace period lapses.
    async fn terminate(&self, child: &mut Child) {
        request_termination(child);
        match timeout(self.grace, child.wait()).await {
            Ok(Ok(status)) => {
                debug!(engine = self.engine, ?status, "External process terminated");
            }
            Ok(Err(e)) => {
                warn!(engine = self.engine, error = %e, "Failed waiting for terminated process");
                let _ = child.kill().await;
            }
            Err(_) => {
                warn!(
                    engine = self.engine,
                    grace_ms = self.grace.as_millis() as u64,
                    "External process ignored termination request, killing"
                );
                let _ = child.kill().await;
            }
        }
    }

    fn spawn_error(&self, e: std::io::Error) -> ActionError {
        if e.kind() == std::io::ErrorKind::NotFound {
            ActionError::engine_not_found(self.engine, self.program)
        } else {
            ActionError::Io(e)
        }
    }
}

/// Checks that `program` can be spawned with `version_arg`.
pub(crate) async fn probe_engine(
    engine: &str,
    program: &Path,
    version_arg: &str,
) -> Result<(), ActionError> {
    match Command::new(program)
        .arg(version_arg)
        .stdin(Stdio::null())
        .output()
        .await
    {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ActionError::engine_not_found(engine, program))
        }
        Err(e) => Err(ActionError::Io(e)),
    }
}

#[cfg(unix)]
fn request_termination(child: &mut Child) {
    let Some(pid) = child.id() else {
        return;
    };
    // SAFETY: `pid` is our own child and has not been reaped, so it cannot
    // have been recycled for another process.
    let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if rc != 0 {
        debug!(pid, "SIGTERM delivery failed");
    }
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child) {
    let _ = child.start_kill();
}

/// Ring buffer of the last stderr lines.
#[derive(Debug, Default)]
struct StderrTail {
    lines: VecDeque<String>,
}

impl StderrTail {
    fn push(&mut self, line: String) {
        if self.lines.len() == STDERR_TAIL_LINES {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    fn into_string(self) -> Option<String> {
        if self.lines.is_empty() {
            None
        } else {
            Some(Vec::from(self.lines).join("\n"))
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sh(grace_ms: u64) -> ExternalProcess<'static> {
        ExternalProcess {
            engine: "sh",
            program: Path::new("sh"),
            grace: Duration::from_millis(grace_ms),
        }
    }

    #[tokio::test]
    async fn test_successful_process_streams_lines() {
        let mut seen = Vec::new();
        sh(1000)
            .run(
                ["-c", "echo one >&2; echo two >&2"],
                &CancellationToken::new(),
                |line| seen.push(line.to_string()),
            )
            .await
            .unwrap();
        assert_eq!(seen, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_failing_process_keeps_stderr_tail() {
        let err = sh(1000)
            .run(
                ["-c", "echo boom >&2; exit 3"],
                &CancellationToken::new(),
                |_| {},
            )
            .await
            .unwrap_err();
        match err {
            ActionError::ProcessFailed { reason, stderr } => {
                assert!(reason.contains("Some(3)"));
                assert_eq!(stderr.as_deref(), Some("boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_terminates_process() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let started = Instant::now();
        let err = sh(2000)
            .run(["-c", "sleep 30"], &token, |_| {})
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_ignored_sigterm_escalates_to_kill() {
        let token = CancellationToken::new();
        token.cancel();

        let started = Instant::now();
        let err = sh(200)
            .run(["-c", "trap '' TERM; sleep 30"], &token, |_| {})
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_missing_engine() {
        let process = ExternalProcess {
            engine: "ffmpeg",
            program: Path::new("/nonexistent/bin/ffmpeg"),
            grace: Duration::from_millis(100),
        };
        let err = process
            .run(["-version"], &CancellationToken::new(), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::EngineNotFound { .. }));

        let err = probe_engine("ffmpeg", Path::new("/nonexistent/bin/ffmpeg"), "-version")
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::EngineNotFound { .. }));
    }

    #[test]
    fn test_stderr_tail_is_bounded() {
        let mut tail = StderrTail::default();
        for i in 0..50 {
            tail.push(format!("line {i}"));
        }
        let text = tail.into_string().unwrap();
        assert_eq!(text.lines().count(), STDERR_TAIL_LINES);
        assert!(text.starts_with("line 30"));
        assert!(StderrTail::default().into_string().is_none());
    }
}
