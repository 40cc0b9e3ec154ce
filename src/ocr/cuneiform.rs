//! Cuneiform OCR engine.
//!
//! Runs the `cuneiform` command-line tool, which writes its result to a file
//! rather than stdout. Cuneiform reads one language per run and has no
//! cancellation hook.

use std::path::Path;
use std::process::Command;
use std::time::Instant;

use tempfile::TempDir;
use tracing::debug;

use super::backend::{EngineKind, OcrEngine, OcrError, OcrResult};
use super::capabilities::EngineCapabilities;
use super::language::LanguageSelection;
use super::tools::{build_ocr_result, check_binary, check_status, process_error};
use crate::utils::ProcessHandle;

const BINARY: &str = "cuneiform";
const INSTALL_HINT: &str = "install cuneiform";
const OUTPUT_FILE: &str = "output.txt";

/// Cuneiform OCR engine.
pub struct CuneiformEngine {
    selection: LanguageSelection,
}

impl CuneiformEngine {
    /// Create an engine, selecting `language` as primary if it is supported.
    pub fn new(language: Option<&str>) -> Self {
        Self::with_selection(LanguageSelection::with_primary(
            EngineKind::Cuneiform.capabilities(),
            language,
        ))
    }

    pub fn with_selection(selection: LanguageSelection) -> Self {
        Self { selection }
    }

    fn build_command(image_path: &Path, language: &str, output_path: &Path) -> Command {
        let mut command = Command::new(BINARY);
        command
            .args(["-l", language, "-f", "text", "-o"])
            .arg(output_path)
            .arg(image_path);
        command
    }
}

impl Default for CuneiformEngine {
    fn default() -> Self {
        Self::new(None)
    }
}

impl EngineCapabilities for CuneiformEngine {
    const KIND: EngineKind = EngineKind::Cuneiform;
}

impl OcrEngine for CuneiformEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Cuneiform
    }

    fn is_available(&self) -> bool {
        check_binary(BINARY)
    }

    fn availability_hint(&self) -> String {
        if check_binary(BINARY) {
            "Cuneiform is available".to_string()
        } else {
            "Cuneiform not installed. Install with: apt install cuneiform".to_string()
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
        let language = languages
            .first()
            .cloned()
            .unwrap_or_else(|| self.capabilities().default_language.to_string());
        let start = Instant::now();

        let temp_dir = TempDir::new()?;
        let output_path = temp_dir.path().join(OUTPUT_FILE);
        debug!(
            "cuneiform: recognizing {} with {}",
            image_path.display(),
            language
        );

        let output = ProcessHandle::new()
            .run(
                Self::build_command(image_path, &language, &output_path),
                None,
                None,
            )
            .map_err(|e| process_error(e, BINARY, INSTALL_HINT))?;
        check_status(&output, BINARY)?;

        let text = std::fs::read_to_string(&output_path).map_err(|e| {
            OcrError::RecognitionFailed(format!("cuneiform produced no output: {}", e))
        })?;

        Ok(build_ocr_result(
            text,
            EngineKind::Cuneiform,
            vec![language],
            start,
        ))
    }
}
