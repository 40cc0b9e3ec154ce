//! Isolated execution of recognition jobs.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use tracing::debug;

use super::job::{RecognitionJob, WorkerReply};
use crate::ocr::{OcrError, OcrResult};
use crate::utils::{ProcessError, ProcessHandle};

/// Runs a job outside the caller's process.
pub trait IsolatedExecutor: Send + Sync {
    fn execute(&self, job: &RecognitionJob) -> Result<OcrResult, OcrError>;
}

/// Runs each job in a fresh child process speaking the worker protocol.
///
/// The child receives the job as JSON on stdin and answers with one
/// [`WorkerReply`] on stdout. Each worker leads its own process group, so a
/// cancel or timeout also stops the OCR binary the worker started.
pub struct SubprocessExecutor {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
    process: ProcessHandle,
}

impl SubprocessExecutor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: vec!["worker".to_string()],
            timeout: None,
            process: ProcessHandle::with_process_group(),
        }
    }

    /// Executor that re-runs the current binary in worker mode.
    pub fn current_exe() -> Result<Self, OcrError> {
        Ok(Self::new(std::env::current_exe()?))
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Kill the running worker and its children, if any.
    pub fn cancel(&self) -> bool {
        self.process.cancel()
    }
}

impl IsolatedExecutor for SubprocessExecutor {
    fn execute(&self, job: &RecognitionJob) -> Result<OcrResult, OcrError> {
        let payload = serde_json::to_vec(job)
            .map_err(|e| OcrError::Worker(format!("could not encode job: {}", e)))?;

        let mut command = Command::new(&self.program);
        command.args(&self.args);
        debug!(
            "dispatching {} job for {} to {}",
            job.engine,
            job.image_path.display(),
            self.program.display()
        );

        let output = self
            .process
            .run(command, Some(payload), self.timeout)
            .map_err(|e| match e {
                ProcessError::Cancelled => OcrError::Cancelled,
                ProcessError::Io(e) => OcrError::Io(e),
                other => OcrError::Worker(other.to_string()),
            })?;

        if !output.status.success() {
            return Err(OcrError::Worker(format!(
                "worker exited with {}: {}",
                output.status,
                output.stderr_lossy()
            )));
        }

        let reply: WorkerReply = serde_json::from_slice(&output.stdout)
            .map_err(|e| OcrError::Worker(format!("unreadable worker reply: {}", e)))?;
        reply.into_result()
    }
}
