//! lios - OCR engine contract and isolation-aware dispatch.
//!
//! - [`ocr`]: engine trait, capability registry, language selection, engines
//! - [`compat`]: per-process decision on whether worker isolation is safe
//! - [`dispatch`]: runs recognition inline or in a worker accordingly
//! - [`config`]: configuration discovery and resolved settings

pub mod compat;
pub mod config;
pub mod dispatch;
pub mod ocr;
pub mod utils;

pub use compat::{CompatibilityController, CompatibilityStatus, ProcessContext, RuntimeVersion};
pub use dispatch::{DispatchMode, Dispatcher, SubprocessExecutor};
pub use ocr::{EngineKind, OcrEngine, OcrError, OcrResult};
