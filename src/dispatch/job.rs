//! Wire types exchanged with isolated workers.
//!
//! A job carries only data (engine kind, language selection, options, image
//! path), so a worker can rebuild the engine itself.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ocr::{
    create_engine, EngineKind, EngineOptions, LanguageSelection, OcrEngine, OcrError, OcrResult,
};

/// One recognition request for a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionJob {
    pub engine: EngineKind,
    pub selection: LanguageSelection,
    #[serde(default)]
    pub options: EngineOptions,
    pub image_path: PathBuf,
}

impl RecognitionJob {
    /// Capture everything needed to repeat `engine.recognize(image_path)`.
    pub fn from_engine(engine: &dyn OcrEngine, image_path: &Path) -> Self {
        Self {
            engine: engine.kind(),
            selection: engine.languages().clone(),
            options: engine.options(),
            image_path: image_path.to_path_buf(),
        }
    }

    /// Rebuild the engine and recognize.
    pub fn run(&self) -> Result<OcrResult, OcrError> {
        let engine = create_engine(self.engine, self.selection.clone(), &self.options);
        engine.recognize(&self.image_path)
    }
}

/// Error reported by a worker, mirroring [`OcrError`] without I/O payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkerFailure {
    EngineUnavailable { message: String },
    RecognitionFailed { message: String },
    Cancelled,
    MultipleLanguagesUnsupported { engine: EngineKind, requested: usize },
    Other { message: String },
}

impl From<OcrError> for WorkerFailure {
    fn from(err: OcrError) -> Self {
        match err {
            OcrError::EngineUnavailable(message) => WorkerFailure::EngineUnavailable { message },
            OcrError::RecognitionFailed(message) => WorkerFailure::RecognitionFailed { message },
            OcrError::Cancelled => WorkerFailure::Cancelled,
            OcrError::MultipleLanguagesUnsupported { engine, requested } => {
                WorkerFailure::MultipleLanguagesUnsupported { engine, requested }
            }
            other => WorkerFailure::Other {
                message: other.to_string(),
            },
        }
    }
}

impl From<WorkerFailure> for OcrError {
    fn from(failure: WorkerFailure) -> Self {
        match failure {
            WorkerFailure::EngineUnavailable { message } => OcrError::EngineUnavailable(message),
            WorkerFailure::RecognitionFailed { message } => OcrError::RecognitionFailed(message),
            WorkerFailure::Cancelled => OcrError::Cancelled,
            WorkerFailure::MultipleLanguagesUnsupported { engine, requested } => {
                OcrError::MultipleLanguagesUnsupported { engine, requested }
            }
            WorkerFailure::Other { message } => OcrError::Worker(message),
        }
    }
}

/// A worker's single reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkerReply {
    Ok { result: OcrResult },
    Err { error: WorkerFailure },
}

impl WorkerReply {
    pub fn into_result(self) -> Result<OcrResult, OcrError> {
        match self {
            WorkerReply::Ok { result } => Ok(result),
            WorkerReply::Err { error } => Err(error.into()),
        }
    }
}

impl From<Result<OcrResult, OcrError>> for WorkerReply {
    fn from(result: Result<OcrResult, OcrError>) -> Self {
        match result {
            Ok(result) => WorkerReply::Ok { result },
            Err(e) => WorkerReply::Err { error: e.into() },
        }
    }
}

/// Worker side of the protocol: read one job, write one reply.
///
/// A malformed job is answered with an error reply; only failures to read
/// or write the streams are returned.
pub fn serve_job<R: Read, W: Write>(mut input: R, mut output: W) -> std::io::Result<()> {
    let mut raw = String::new();
    input.read_to_string(&mut raw)?;

    let reply = match serde_json::from_str::<RecognitionJob>(&raw) {
        Ok(job) => {
            debug!(
                "worker: {} job for {}",
                job.engine,
                job.image_path.display()
            );
            WorkerReply::from(job.run())
        }
        Err(e) => WorkerReply::Err {
            error: WorkerFailure::Other {
                message: format!("invalid job: {}", e),
            },
        },
    };

    serde_json::to_writer(&mut output, &reply)?;
    writeln!(output)?;
    output.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_from_engine_captures_selection() {
        let mut engine = crate::ocr::TesseractEngine::new(Some("eng"));
        engine.set_language_2("xx");
        let job = RecognitionJob::from_engine(&engine, Path::new("/scans/1.png"));

        assert_eq!(job.engine, EngineKind::Tesseract);
        assert_eq!(job.selection, *engine.languages());
        assert_eq!(job.image_path, PathBuf::from("/scans/1.png"));
    }

    #[test]
    fn test_failure_kinds_survive_the_reply() {
        let reply = WorkerReply::from(Err(OcrError::MultipleLanguagesUnsupported {
            engine: EngineKind::Cuneiform,
            requested: 3,
        }));
        let json = serde_json::to_string(&reply).unwrap();
        let decoded: WorkerReply = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            decoded.into_result(),
            Err(OcrError::MultipleLanguagesUnsupported { requested: 3, .. })
        ));
    }

    #[test]
    fn test_io_errors_become_worker_errors() {
        let failure = WorkerFailure::from(OcrError::Io(std::io::Error::other("disk gone")));
        assert!(matches!(
            OcrError::from(failure),
            OcrError::Worker(message) if message.contains("disk gone")
        ));
    }

    #[test]
    fn test_serve_answers_malformed_job() {
        let mut out = Vec::new();
        serve_job(&b"not json"[..], &mut out).unwrap();
        let reply: WorkerReply = serde_json::from_slice(&out).unwrap();
        assert!(matches!(
            reply,
            WorkerReply::Err {
                error: WorkerFailure::Other { .. }
            }
        ));
    }

    #[test]
    fn test_serve_runs_job() {
        let caps = EngineKind::Cuneiform.capabilities();
        let mut selection = LanguageSelection::with_primary(caps, Some("eng"));
        selection.select_tertiary(caps, "rus");
        let job = RecognitionJob {
            engine: EngineKind::Cuneiform,
            selection,
            options: EngineOptions::default(),
            image_path: PathBuf::from("page.png"),
        };

        let mut out = Vec::new();
        serve_job(serde_json::to_string(&job).unwrap().as_bytes(), &mut out).unwrap();
        let reply: WorkerReply = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            reply,
            WorkerReply::Err {
                error: WorkerFailure::MultipleLanguagesUnsupported {
                    engine: EngineKind::Cuneiform,
                    requested: 2,
                }
            }
        );
    }
}
