//! Shared helpers for command-line OCR engines.

use std::path::PathBuf;
use std::time::Instant;

use super::backend::{EngineKind, OcrError, OcrResult};
use crate::utils::{ProcessError, ProcessOutput};

/// Check if a binary is available in PATH.
pub fn check_binary(name: &str) -> bool {
    which::which(name).is_ok()
}

/// Resolve a binary in PATH, reporting a missing one as an unavailable engine.
pub fn find_binary(name: &str, install_hint: &str) -> Result<PathBuf, OcrError> {
    which::which(name).map_err(|_| {
        OcrError::EngineUnavailable(format!("{} not found ({})", name, install_hint))
    })
}

/// Map a failed engine process run to an OCR error.
pub fn process_error(err: ProcessError, binary: &str, install_hint: &str) -> OcrError {
    match err {
        ProcessError::NotFound(_) => {
            OcrError::EngineUnavailable(format!("{} not found ({})", binary, install_hint))
        }
        ProcessError::Cancelled => OcrError::Cancelled,
        ProcessError::TimedOut(limit) => {
            OcrError::RecognitionFailed(format!("{} timed out after {:?}", binary, limit))
        }
        ProcessError::Io(e) => OcrError::Io(e),
    }
}

/// Fail on a non-zero exit, carrying stderr in the error.
pub fn check_status(output: &ProcessOutput, binary: &str) -> Result<(), OcrError> {
    if output.status.success() {
        Ok(())
    } else {
        Err(OcrError::RecognitionFailed(format!(
            "{} failed ({}): {}",
            binary,
            output.status,
            output.stderr_lossy()
        )))
    }
}

/// Build a timed result.
pub fn build_ocr_result(
    text: String,
    engine: EngineKind,
    languages: Vec<String>,
    start: Instant,
) -> OcrResult {
    OcrResult {
        text,
        engine,
        languages,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }
}
