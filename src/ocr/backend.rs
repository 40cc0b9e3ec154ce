//! OCR engine contract.
//!
//! Every concrete engine implements [`OcrEngine`]. Callers depend only on the
//! trait: availability probing, language negotiation, single-image
//! recognition and best-effort cancellation. Static capability metadata lives
//! in [`super::capabilities`] so it can be queried before an engine exists.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::capabilities::Capabilities;
use super::language::LanguageSelection;

/// Errors from OCR engines.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Engine not available: {0}")]
    EngineUnavailable(String),

    #[error("Recognition failed: {0}")]
    RecognitionFailed(String),

    #[error("Recognition was cancelled")]
    Cancelled,

    #[error("{engine} recognizes one language at a time, {requested} were selected")]
    MultipleLanguagesUnsupported { engine: EngineKind, requested: usize },

    #[error("Worker failed: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of recognizing one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    /// Extracted text content.
    pub text: String,
    /// Which engine produced this result.
    pub engine: EngineKind,
    /// Languages handed to the engine, in slot order.
    pub languages: Vec<String>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Known OCR engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Tesseract OCR via command-line.
    Tesseract,
    /// Cuneiform OCR via command-line.
    Cuneiform,
}

impl EngineKind {
    /// Every engine kind, in the order front ends should list them.
    pub const ALL: [EngineKind; 2] = [EngineKind::Tesseract, EngineKind::Cuneiform];

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Tesseract => "tesseract",
            EngineKind::Cuneiform => "cuneiform",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "tesseract" | "tesseract-ocr" => Some(EngineKind::Tesseract),
            "cuneiform" => Some(EngineKind::Cuneiform),
            _ => None,
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Engine settings that are not part of the language selection.
///
/// Travels with a worker job so the worker can rebuild the same engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Explicit Tesseract data directory (`--tessdata-dir`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tessdata_dir: Option<PathBuf>,
}

/// Trait for OCR engines.
///
/// Language selection calls and `recognize` may run on different threads,
/// but selections must happen before the recognition that depends on them.
pub trait OcrEngine: Send + Sync {
    /// Get the engine kind.
    fn kind(&self) -> EngineKind;

    /// Static capability metadata for this engine.
    fn capabilities(&self) -> &'static Capabilities {
        self.kind().capabilities()
    }

    /// Check if the engine's external dependency is installed and usable.
    /// Probes every time; never fails.
    fn is_available(&self) -> bool;

    /// Get a description of what's needed to make this engine available.
    fn availability_hint(&self) -> String;

    /// Whether `cancel` can actually interrupt a running recognition.
    fn supports_cancellation(&self) -> bool {
        self.capabilities().supports_cancellation
    }

    /// Settings a worker needs to rebuild this engine.
    fn options(&self) -> EngineOptions {
        EngineOptions::default()
    }

    fn languages(&self) -> &LanguageSelection;

    fn languages_mut(&mut self) -> &mut LanguageSelection;

    /// Select the primary language. An unsupported language leaves the
    /// previous primary in place.
    fn set_language(&mut self, language: &str) -> bool {
        let caps = self.capabilities();
        self.languages_mut().select_primary(caps, language)
    }

    /// Select the secondary language. An unsupported language marks the slot
    /// as rejected.
    fn set_language_2(&mut self, language: &str) -> bool {
        let caps = self.capabilities();
        self.languages_mut().select_secondary(caps, language)
    }

    /// Select the tertiary language. An unsupported language marks the slot
    /// as rejected.
    fn set_language_3(&mut self, language: &str) -> bool {
        let caps = self.capabilities();
        self.languages_mut().select_tertiary(caps, language)
    }

    /// Languages to pass to the backend for the next recognition.
    ///
    /// Refuses more than one language on engines without multi-language
    /// support.
    fn recognition_languages(&self) -> Result<Vec<String>, OcrError> {
        let caps = self.capabilities();
        let languages = self.languages().resolved(caps);
        if !caps.supports_multiple_languages && languages.len() > 1 {
            return Err(OcrError::MultipleLanguagesUnsupported {
                engine: self.kind(),
                requested: languages.len(),
            });
        }
        Ok(languages)
    }

    /// Recognize text in one image using the current language selection.
    fn recognize(&self, image_path: &Path) -> Result<OcrResult, OcrError>;

    /// Ask a running recognition to stop. Advisory only.
    fn cancel(&self) {}
}
