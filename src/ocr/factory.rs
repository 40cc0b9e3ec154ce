//! Construct engines from a kind, for callers that only hold data.

use super::backend::{EngineKind, EngineOptions, OcrEngine};
use super::cuneiform::CuneiformEngine;
use super::language::LanguageSelection;
use super::tesseract::TesseractEngine;

/// Create an engine with an existing language selection.
pub fn create_engine(
    kind: EngineKind,
    selection: LanguageSelection,
    options: &EngineOptions,
) -> Box<dyn OcrEngine> {
    match kind {
        EngineKind::Tesseract => {
            Box::new(TesseractEngine::with_selection(selection).with_options(options))
        }
        EngineKind::Cuneiform => Box::new(CuneiformEngine::with_selection(selection)),
    }
}

/// Create an engine by name with an optional primary language.
pub fn create_engine_by_name(
    name: &str,
    language: Option<&str>,
    options: &EngineOptions,
) -> Option<Box<dyn OcrEngine>> {
    let kind = EngineKind::from_str(name)?;
    let selection = LanguageSelection::with_primary(kind.capabilities(), language);
    Some(create_engine(kind, selection, options))
}
