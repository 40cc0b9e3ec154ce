//! The single call surface for "recognize, isolated when safe".

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::executor::IsolatedExecutor;
use super::job::RecognitionJob;
use crate::compat::CompatibilityController;
use crate::ocr::{OcrEngine, OcrError, OcrResult};

/// Where a recognition call runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// On the caller's thread, in the caller's process.
    Inline,
    /// In a worker process.
    Isolated,
}

impl DispatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchMode::Inline => "inline",
            DispatchMode::Isolated => "isolated",
        }
    }
}

impl std::fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Routes recognition through the compatibility decision.
///
/// Isolation is used only when the controller reports the runtime
/// compatible and an executor is configured. Otherwise the engine runs on
/// the caller's stack.
pub struct Dispatcher {
    controller: Arc<CompatibilityController>,
    executor: Option<Arc<dyn IsolatedExecutor>>,
}

impl Dispatcher {
    pub fn new(controller: Arc<CompatibilityController>, executor: Arc<dyn IsolatedExecutor>) -> Self {
        Self {
            controller,
            executor: Some(executor),
        }
    }

    /// Dispatcher that never leaves the caller's process.
    pub fn inline_only(controller: Arc<CompatibilityController>) -> Self {
        Self {
            controller,
            executor: None,
        }
    }

    pub fn controller(&self) -> &Arc<CompatibilityController> {
        &self.controller
    }

    /// How the next call would run.
    pub fn mode(&self) -> DispatchMode {
        if self.isolation().is_some() {
            DispatchMode::Isolated
        } else {
            DispatchMode::Inline
        }
    }

    /// Recognize one image with the engine's current language selection.
    pub fn recognize(&self, engine: &dyn OcrEngine, image_path: &Path) -> Result<OcrResult, OcrError> {
        self.recognize_with_mode(engine, image_path)
            .map(|(result, _)| result)
    }

    /// Like [`recognize`](Self::recognize), also reporting where it ran.
    pub fn recognize_with_mode(
        &self,
        engine: &dyn OcrEngine,
        image_path: &Path,
    ) -> Result<(OcrResult, DispatchMode), OcrError> {
        match self.isolation() {
            Some(executor) => {
                let job = RecognitionJob::from_engine(engine, image_path);
                self.controller.runtime().commit();
                debug!("{}: isolated recognition of {}", job.engine, image_path.display());
                Ok((executor.execute(&job)?, DispatchMode::Isolated))
            }
            None => {
                debug!(
                    "{}: inline recognition of {}",
                    engine.kind(),
                    image_path.display()
                );
                Ok((engine.recognize(image_path)?, DispatchMode::Inline))
            }
        }
    }

    /// The executor, if isolation is both configured and safe right now.
    ///
    /// The controller is initialized on every call, whether or not an
    /// executor is configured.
    fn isolation(&self) -> Option<&Arc<dyn IsolatedExecutor>> {
        self.controller.ensure_initialized();
        let executor = self.executor.as_ref()?;
        if self.controller.is_compatible() {
            Some(executor)
        } else {
            None
        }
    }
}
