//! OCR engines and language negotiation.
//!
//! Engines are selected at runtime and driven through the [`OcrEngine`]
//! trait:
//!
//! - **Tesseract**: command-line OCR, several languages per run, cancellable
//! - **Cuneiform**: command-line OCR, one language per run
//!
//! Capability metadata (supported languages, multi-language support) is
//! available from [`EngineKind::capabilities`] without constructing an engine.

mod backend;
pub mod capabilities;
mod cuneiform;
mod factory;
mod language;
mod tesseract;
pub mod tools;

pub use backend::{EngineKind, EngineOptions, OcrEngine, OcrError, OcrResult};
pub use capabilities::{Capabilities, EngineCapabilities};
pub use cuneiform::CuneiformEngine;
pub use factory::{create_engine, create_engine_by_name};
pub use language::{LanguageSelection, SlotState};
pub use tesseract::TesseractEngine;
