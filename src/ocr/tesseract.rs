//! Tesseract OCR engine.
//!
//! Runs the `tesseract` command-line tool. Multiple languages are joined with
//! `+`, and a running recognition can be cancelled by killing the child.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use tracing::debug;

use super::backend::{EngineKind, EngineOptions, OcrEngine, OcrError, OcrResult};
use super::capabilities::EngineCapabilities;
use super::language::LanguageSelection;
use super::tools::{build_ocr_result, check_binary, check_status, process_error};
use crate::utils::ProcessHandle;

const BINARY: &str = "tesseract";
const INSTALL_HINT: &str = "install tesseract-ocr";

/// Tesseract OCR engine.
pub struct TesseractEngine {
    selection: LanguageSelection,
    tessdata_dir: Option<PathBuf>,
    process: ProcessHandle,
}

impl TesseractEngine {
    /// Create an engine, selecting `language` as primary if it is supported.
    pub fn new(language: Option<&str>) -> Self {
        Self::with_selection(LanguageSelection::with_primary(
            EngineKind::Tesseract.capabilities(),
            language,
        ))
    }

    pub fn with_selection(selection: LanguageSelection) -> Self {
        Self {
            selection,
            tessdata_dir: None,
            process: ProcessHandle::new(),
        }
    }

    pub fn with_options(mut self, options: &EngineOptions) -> Self {
        self.tessdata_dir = options.tessdata_dir.clone();
        self
    }

    fn build_command(&self, image_path: &Path, languages: &[String]) -> Command {
        let mut command = Command::new(BINARY);
        command
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &languages.join("+")]);
        if let Some(dir) = &self.tessdata_dir {
            command.arg("--tessdata-dir").arg(dir);
        }
        command
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new(None)
    }
}

impl EngineCapabilities for TesseractEngine {
    const KIND: EngineKind = EngineKind::Tesseract;
}

impl OcrEngine for TesseractEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Tesseract
    }

    fn is_available(&self) -> bool {
        check_binary(BINARY)
    }

    fn availability_hint(&self) -> String {
        if check_binary(BINARY) {
            "Tesseract is available".to_string()
        } else {
            "Tesseract not installed. Install with: apt install tesseract-ocr".to_string()
        }
    }

    fn options(&self) -> EngineOptions {
        EngineOptions {
            tessdata_dir: self.tessdata_dir.clone(),
        }
    }

    fn languages(&self) -> &LanguageSelection {
        &self.selection
    }

    fn languages_mut(&mut self) -> &mut LanguageSelection {
        &mut self.selection
    }

    fn recognize(&self, image_path: &Path) -> Result<OcrResult, OcrError> {
        let languages = self.recognition_languages()?;
        let start = Instant::now();
        debug!(
            "tesseract: recognizing {} with {}",
            image_path.display(),
            languages.join("+")
        );

        let output = self
            .process
            .run(self.build_command(image_path, &languages), None, None)
            .map_err(|e| process_error(e, BINARY, INSTALL_HINT))?;
        check_status(&output, BINARY)?;

        Ok(build_ocr_result(
            output.stdout_lossy(),
            EngineKind::Tesseract,
            languages,
            start,
        ))
    }

    fn cancel(&self) {
        if self.process.cancel() {
            debug!("tesseract: cancellation requested");
        }
    }
}
