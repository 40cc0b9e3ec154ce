//! Child process execution with cancellation and deadlines.
//!
//! `std::process::Command::output` blocks until the child exits and offers no
//! way to interrupt it. [`ProcessHandle::run`] keeps the running child where
//! [`ProcessHandle::cancel`] can reach it from another thread.
//!
//! A handle built with [`ProcessHandle::with_process_group`] starts each
//! child as the leader of a new process group on unix, and cancellation or
//! a timeout kills the whole group, including anything the child spawned.

use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("process cancelled")]
    Cancelled,

    #[error("process timed out after {0:?}")]
    TimedOut(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Captured output of a finished child.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

struct Tracked {
    child: Mutex<Child>,
    cancelled: AtomicBool,
    group: bool,
}

impl Tracked {
    fn kill(&self, child: &mut Child) {
        #[cfg(unix)]
        if self.group {
            // The child leads its group, so its pid is the group id.
            let pgid = child.id() as libc::pid_t;
            // SAFETY: kill(2) takes no pointers; a negative pid targets a group.
            if unsafe { libc::kill(-pgid, libc::SIGKILL) } == 0 {
                return;
            }
        }
        if let Err(e) = child.kill() {
            debug!("kill of pid {} failed: {}", child.id(), e);
        }
    }
}

/// Runs child processes and lets another thread kill the latest one.
#[derive(Default)]
pub struct ProcessHandle {
    current: Mutex<Option<Arc<Tracked>>>,
    group: bool,
}

impl ProcessHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle whose children are killed together with their descendants.
    pub fn with_process_group() -> Self {
        Self {
            current: Mutex::default(),
            group: true,
        }
    }

    /// Kill the running child, if any. Returns whether a child was signalled.
    pub fn cancel(&self) -> bool {
        let current = lock(&self.current).clone();
        match current {
            Some(tracked) => {
                tracked.cancelled.store(true, Ordering::SeqCst);
                let mut child = lock(&tracked.child);
                tracked.kill(&mut child);
                true
            }
            None => false,
        }
    }

    /// Whether a child is currently running.
    pub fn is_running(&self) -> bool {
        lock(&self.current).is_some()
    }

    /// Spawn `command`, feed it `input`, and wait for it to exit.
    ///
    /// Stdout and stderr are always captured. With a `timeout` the child is
    /// killed once the deadline passes.
    pub fn run(
        &self,
        mut command: Command,
        input: Option<Vec<u8>>,
        timeout: Option<Duration>,
    ) -> Result<ProcessOutput, ProcessError> {
        let program = command.get_program().to_string_lossy().to_string();
        command
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        if self.group {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProcessError::NotFound(program));
            }
            Err(e) => return Err(ProcessError::Io(e)),
        };
        debug!("spawned {} (pid {})", program, child.id());

        let writer = match (input, child.stdin.take()) {
            (Some(bytes), Some(mut stdin)) => Some(thread::spawn(move || {
                // Dropping stdin closes the pipe so the child sees EOF.
                stdin.write_all(&bytes)
            })),
            _ => None,
        };
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let tracked = Arc::new(Tracked {
            child: Mutex::new(child),
            cancelled: AtomicBool::new(false),
            group: self.group,
        });
        *lock(&self.current) = Some(Arc::clone(&tracked));

        let waited = wait_for_exit(&tracked, timeout);

        {
            let mut current = lock(&self.current);
            if current
                .as_ref()
                .is_some_and(|c| Arc::ptr_eq(c, &tracked))
            {
                *current = None;
            }
        }

        let status = waited?;
        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                // The child may exit without reading all input.
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => return Err(ProcessError::Io(e)),
                Err(_) => return Err(thread_panicked("stdin writer")),
            }
        }
        let stdout = join_reader(stdout)?;
        let stderr = join_reader(stderr)?;

        finish(
            ProcessOutput {
                status,
                stdout,
                stderr,
            },
            tracked.cancelled.load(Ordering::SeqCst),
        )
    }
}

/// A cancel that lands after the child exited on its own does not count.
fn finish(output: ProcessOutput, cancelled: bool) -> Result<ProcessOutput, ProcessError> {
    if cancelled && killed_by_signal(&output.status) {
        Err(ProcessError::Cancelled)
    } else {
        Ok(output)
    }
}

#[cfg(unix)]
fn killed_by_signal(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    status.signal().is_some()
}

#[cfg(not(unix))]
fn killed_by_signal(status: &ExitStatus) -> bool {
    !status.success()
}

fn wait_for_exit(tracked: &Tracked, timeout: Option<Duration>) -> Result<ExitStatus, ProcessError> {
    let deadline = timeout.map(|t| (Instant::now() + t, t));
    loop {
        {
            let mut child = lock(&tracked.child);
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if let Some((at, limit)) = deadline {
                if Instant::now() >= at {
                    tracked.kill(&mut child);
                    let _ = child.wait();
                    return Err(ProcessError::TimedOut(limit));
                }
            }
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<std::io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn join_reader(
    handle: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
) -> Result<Vec<u8>, ProcessError> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| thread_panicked("output reader"))?
            .map_err(ProcessError::Io),
        None => Ok(Vec::new()),
    }
}

fn thread_panicked(what: &str) -> ProcessError {
    ProcessError::Io(std::io::Error::other(format!("{} thread panicked", what)))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
