//! Running RUN steps through `sh -c` with a timeout.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Suite-wide cancellation flag, set from the Ctrl-C handler.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Signals that mean the program crashed: ILL, TRAP, ABRT, BUS, FPE,
/// KILL, SEGV.
const CRASH_SIGNALS: [i32; 7] = [4, 5, 6, 7, 8, 9, 11];

/// How a finished process ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Exit {
    Code(i32),
    /// Killed by a signal, either directly or as reported by `sh` (128+N).
    Signal(i32),
}

impl Exit {
    fn from_status(status: std::process::ExitStatus) -> Self {
        if let Some(code) = status.code() {
            // sh reports a child killed by signal N as 128+N. Only crash
            // signals are decoded; 130 or 143 stay ordinary exit codes a
            // program may return on purpose.
            return match code - 128 {
                signal if CRASH_SIGNALS.contains(&signal) => Exit::Signal(signal),
                _ => Exit::Code(code),
            };
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Exit::Signal(signal);
            }
        }
        Exit::Code(-1)
    }

    pub fn success(self) -> bool {
        self == Exit::Code(0)
    }
}

impl std::fmt::Display for Exit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Exit::Code(code) => write!(f, "exit code {code}"),
            Exit::Signal(signal) => write!(f, "signal {signal}"),
        }
    }
}

/// Captured output of a finished process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit: Exit,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Errors that prevent a process from finishing normally.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to spawn shell: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("failed waiting for process: {0}")]
    Wait(#[source] std::io::Error),
    #[error("timed out after {}s", after.as_secs_f64())]
    TimedOut {
        after: Duration,
        /// Output read before the process was killed.
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    },
    #[error("cancelled")]
    Cancelled,
}

type Capture = Arc<Mutex<Vec<u8>>>;

/// Drain `pipe` on a background thread into a shared buffer.
fn drain(pipe: Option<impl Read + Send + 'static>) -> (Capture, thread::JoinHandle<()>) {
    let buffer: Capture = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&buffer);
    let handle = thread::spawn(move || {
        let Some(mut pipe) = pipe else { return };
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => sink.lock().extend_from_slice(&chunk[..n]),
            }
        }
    });
    (buffer, handle)
}

/// Kill every process left in the group led by `pid`.
fn kill_group(pid: u32) {
    #[cfg(unix)]
    {
        let _ = Command::new("kill")
            .arg("-KILL")
            .arg("--")
            .arg(format!("-{pid}"))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
    }
    #[cfg(not(unix))]
    let _ = pid;
}

/// Kill the shell and everything in its process group.
fn kill_tree(child: &mut Child) {
    kill_group(child.id());
    let _ = child.kill();
    let _ = child.wait();
}

/// Run `command` with `sh -c` in `cwd`.
///
/// Fails with [`ProcessError::TimedOut`] if the process outlives
/// `timeout`, and with [`ProcessError::Cancelled`] as soon as `cancel` is
/// set. A non-zero exit is not an error here; callers decide what it means.
pub fn run_shell(
    command: &str,
    cwd: &Path,
    timeout: Duration,
    cancel: &CancelToken,
) -> Result<ProcessOutput, ProcessError> {
    if cancel.is_cancelled() {
        return Err(ProcessError::Cancelled);
    }

    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let mut child = cmd.spawn().map_err(ProcessError::Spawn)?;
    tracing::trace!(pid = child.id(), "spawned step");

    let (stdout, stdout_reader) = drain(child.stdout.take());
    let (stderr, stderr_reader) = drain(child.stderr.take());
    let start = Instant::now();

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => {
                kill_tree(&mut child);
                return Err(ProcessError::Wait(e));
            }
        }
        if cancel.is_cancelled() {
            kill_tree(&mut child);
            return Err(ProcessError::Cancelled);
        }
        if start.elapsed() >= timeout {
            tracing::debug!(pid = child.id(), "step timed out, killing");
            kill_tree(&mut child);
            // Readers may still be blocked on a pipe held by an orphan;
            // take what they have without joining.
            return Err(ProcessError::TimedOut {
                after: timeout,
                stdout: stdout.lock().clone(),
                stderr: stderr.lock().clone(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    // Background jobs started by the step still hold the pipes open.
    kill_group(child.id());

    // A job that left the group can keep a pipe open; the deadline still
    // applies while the readers drain.
    while !(stdout_reader.is_finished() && stderr_reader.is_finished()) {
        if cancel.is_cancelled() {
            return Err(ProcessError::Cancelled);
        }
        if start.elapsed() >= timeout {
            tracing::debug!(pid = child.id(), "step output still open at deadline");
            return Err(ProcessError::TimedOut {
                after: timeout,
                stdout: stdout.lock().clone(),
                stderr: stderr.lock().clone(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
    let _ = stdout_reader.join();
    let _ = stderr_reader.join();
    let exit = Exit::from_status(status);
    tracing::trace!(%exit, "step finished");

    let stdout = std::mem::take(&mut *stdout.lock());
    let stderr = std::mem::take(&mut *stderr.lock());
    Ok(ProcessOutput {
        exit,
        stdout,
        stderr,
    })
}
