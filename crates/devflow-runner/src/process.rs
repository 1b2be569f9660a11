use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::buffer::BoundedBuffer;
use crate::{RunnerError, Result, DEFAULT_MAX_OUTPUT_BYTES};

/// How long to wait for the output readers once the child is gone. A
/// detached grandchild can hold the pipes open indefinitely.
const READER_GRACE: Duration = Duration::from_secs(2);

/// Capture buffer shared between a reader task and the runner, so bytes
/// already read survive an aborted reader.
type SharedBuffer = Arc<Mutex<BoundedBuffer>>;

// ─── CommandSpec ──────────────────────────────────────────────────────────

/// One external command, as an explicit argument vector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub argv: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }
}

// ─── Output types ─────────────────────────────────────────────────────────

/// Captured stdout/stderr of a process, possibly partial.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    /// True if either stream exceeded the capture limit.
    pub truncated: bool,
}

/// Result of a process that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutput {
    pub pid: Option<u32>,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub truncated: bool,
    pub duration: Duration,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn signalled(&self) -> bool {
        self.exit_code.is_none()
    }
}

// ─── ProcessRunner ────────────────────────────────────────────────────────

/// Launches and supervises external commands.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    max_output_bytes: usize,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_OUTPUT_BYTES)
    }
}

enum Exit {
    Status(std::process::ExitStatus),
    WaitFailed(std::io::Error),
    TimedOut(Duration),
    Cancelled,
}

impl ProcessRunner {
    pub fn new(max_output_bytes: usize) -> Self {
        Self { max_output_bytes }
    }

    pub fn max_output_bytes(&self) -> usize {
        self.max_output_bytes
    }

    /// Run `spec` to completion, timeout, or cancellation.
    ///
    /// The child is spawned with `kill_on_drop`, so dropping the returned
    /// future also terminates the process. On Unix the child leads its own
    /// process group and the whole group is killed on timeout/cancel.
    pub async fn run(&self, spec: &CommandSpec, cancel: &CancellationToken) -> Result<ProcessOutput> {
        let Some((program, args)) = spec.argv.split_first() else {
            return Err(RunnerError::Launch {
                program: String::new(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
            });
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }
        for (k, v) in &spec.env {
            cmd.env(k, v);
        }
        #[cfg(unix)]
        cmd.process_group(0);

        tracing::debug!(program = %program, args = ?args, cwd = ?spec.cwd, "spawning process");

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|source| RunnerError::Launch {
            program: program.clone(),
            source,
        })?;
        let pid = child.id();

        let limit = self.max_output_bytes;
        let stdout = shared(limit);
        let stderr = shared(limit);
        let stdout_task = child
            .stdout
            .take()
            .map(|s| tokio::spawn(drain(s, Arc::clone(&stdout))));
        let stderr_task = child
            .stderr
            .take()
            .map(|s| tokio::spawn(drain(s, Arc::clone(&stderr))));

        let exit = tokio::select! {
            status = child.wait() => match status {
                Ok(s) => Exit::Status(s),
                Err(e) => Exit::WaitFailed(e),
            },
            after = deadline(spec.timeout) => Exit::TimedOut(after),
            _ = cancel.cancelled() => Exit::Cancelled,
        };

        if !matches!(exit, Exit::Status(_)) {
            terminate(&mut child, pid).await;
        }
        let duration = start.elapsed();

        let (stdout_open, stderr_open) = tokio::join!(settle(stdout_task), settle(stderr_task));
        let lingering: Vec<_> = stdout_open.into_iter().chain(stderr_open).collect();
        if !lingering.is_empty() {
            // A descendant still holds the pipes; reclaim the group.
            tracing::debug!(pid = ?pid, "output still open after exit; killing process group");
            kill_group(pid);
            for task in lingering {
                task.abort();
            }
        }

        let stdout = take(&stdout);
        let stderr = take(&stderr);
        let captured = CapturedOutput {
            truncated: stdout.is_truncated() || stderr.is_truncated(),
            stdout: stdout.to_string_lossy(),
            stderr: stderr.to_string_lossy(),
        };

        match exit {
            Exit::Status(status) => {
                tracing::debug!(program = %program, code = ?status.code(), ?duration, "process exited");
                Ok(ProcessOutput {
                    pid,
                    exit_code: status.code(),
                    stdout: captured.stdout,
                    stderr: captured.stderr,
                    truncated: captured.truncated,
                    duration,
                })
            }
            Exit::TimedOut(after) => Err(RunnerError::Timeout {
                after,
                output: Box::new(captured),
            }),
            Exit::Cancelled => Err(RunnerError::Cancelled {
                output: Box::new(captured),
            }),
            Exit::WaitFailed(e) => Err(RunnerError::Io(e)),
        }
    }
}

/// Resolve `program` against `PATH`.
pub fn locate(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}

async fn deadline(timeout: Option<Duration>) -> Duration {
    match timeout {
        Some(after) => {
            tokio::time::sleep(after).await;
            after
        }
        None => std::future::pending().await,
    }
}

fn shared(limit: usize) -> SharedBuffer {
    Arc::new(Mutex::new(BoundedBuffer::new(limit)))
}

fn lock(buffer: &SharedBuffer) -> MutexGuard<'_, BoundedBuffer> {
    buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn take(buffer: &SharedBuffer) -> BoundedBuffer {
    std::mem::take(&mut *lock(buffer))
}

async fn drain<R: AsyncRead + Unpin>(mut reader: R, buffer: SharedBuffer) {
    let mut chunk = [0u8; 8192];
    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        lock(&buffer).push(&chunk[..n]);
    }
}

/// Wait up to [`READER_GRACE`] for a reader to hit end of stream. Returns the
/// task if it is still running.
async fn settle(task: Option<JoinHandle<()>>) -> Option<JoinHandle<()>> {
    let mut task = task?;
    match tokio::time::timeout(READER_GRACE, &mut task).await {
        Ok(_) => None,
        Err(_) => Some(task),
    }
}

/// Kill the child (and its process group) and wait for it to be reaped.
async fn terminate(child: &mut Child, pid: Option<u32>) {
    tracing::warn!(pid = ?pid, "terminating process");
    kill_group(pid);
    // `kill` waits after signalling, which reaps the child.
    let _ = child.kill().await;
    let _ = child.wait().await;
}

#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Some(raw) = pid.and_then(|p| i32::try_from(p).ok()) {
        let _ = killpg(Pid::from_raw(raw), Signal::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}
