//! Dispatch decisions observed from outside the crate.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use lios::compat::{
    CompatibilityController, ProcessContext, ProcessRuntime, RuntimeVersion, StartMethod,
    WorkaroundPolicy,
};
use lios::dispatch::{
    DispatchMode, Dispatcher, IsolatedExecutor, RecognitionJob, SubprocessExecutor,
};
use lios::ocr::{
    create_engine, EngineKind, EngineOptions, LanguageSelection, OcrEngine, OcrError, OcrResult,
};

/// Engine that records which thread recognized each image.
struct ThreadRecordingEngine {
    selection: LanguageSelection,
    threads: Mutex<Vec<ThreadId>>,
}

impl ThreadRecordingEngine {
    fn new() -> Self {
        Self {
            selection: LanguageSelection::new(),
            threads: Mutex::new(Vec::new()),
        }
    }
}

impl OcrEngine for ThreadRecordingEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Tesseract
    }

    fn is_available(&self) -> bool {
        true
    }

    fn availability_hint(&self) -> String {
        String::new()
    }

    fn languages(&self) -> &LanguageSelection {
        &self.selection
    }

    fn languages_mut(&mut self) -> &mut LanguageSelection {
        &mut self.selection
    }

    fn recognize(&self, _image_path: &Path) -> Result<OcrResult, OcrError> {
        self.threads.lock().unwrap().push(thread::current().id());
        Ok(OcrResult {
            text: "inline".to_string(),
            engine: EngineKind::Tesseract,
            languages: self.recognition_languages()?,
            processing_time_ms: 0,
        })
    }
}

#[derive(Default)]
struct CountingExecutor {
    calls: AtomicUsize,
}

impl IsolatedExecutor for CountingExecutor {
    fn execute(&self, _job: &RecognitionJob) -> Result<OcrResult, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(OcrError::Worker("isolation must not be used".to_string()))
    }
}

fn controller(context: ProcessContext) -> Arc<CompatibilityController> {
    Arc::new(CompatibilityController::new(
        Arc::new(context),
        WorkaroundPolicy::default(),
    ))
}

#[test]
fn incompatible_runtime_stays_on_callers_thread() {
    let executor = Arc::new(CountingExecutor::default());
    let dispatcher = Dispatcher::new(
        controller(ProcessContext::with_method(
            RuntimeVersion::new(3, 14, 0),
            StartMethod::Spawn,
        )),
        executor.clone(),
    );
    let engine = ThreadRecordingEngine::new();

    for page in ["1.png", "2.png", "3.png"] {
        let (result, mode) = dispatcher
            .recognize_with_mode(&engine, Path::new(page))
            .unwrap();
        assert_eq!(mode, DispatchMode::Inline);
        assert_eq!(result.text, "inline");
    }

    let caller = thread::current().id();
    let threads = engine.threads.lock().unwrap();
    assert_eq!(threads.len(), 3);
    assert!(threads.iter().all(|id| *id == caller));
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    assert!(!dispatcher.controller().is_compatible());
}

#[test]
fn dispatcher_initializes_controller_on_first_use() {
    let controller = controller(ProcessContext::new(RuntimeVersion::new(3, 13, 0)));
    assert!(!controller.is_initialized());

    let dispatcher = Dispatcher::inline_only(controller.clone());
    dispatcher
        .recognize(&ThreadRecordingEngine::new(), Path::new("a.png"))
        .unwrap();

    assert!(controller.is_initialized());
    assert!(controller.status().compatible);
    assert_eq!(dispatcher.mode(), DispatchMode::Inline);

    let isolated = Dispatcher::new(controller, Arc::new(CountingExecutor::default()));
    assert_eq!(isolated.mode(), DispatchMode::Isolated);
}

#[test]
fn inline_only_dispatch_still_derives_the_method() {
    let context = Arc::new(ProcessContext::new(RuntimeVersion::new(3, 14, 0)));
    let controller = Arc::new(CompatibilityController::new(
        context.clone(),
        WorkaroundPolicy::default(),
    ));

    Dispatcher::inline_only(controller.clone())
        .recognize(&ThreadRecordingEngine::new(), Path::new("b.png"))
        .unwrap();

    assert!(controller.is_initialized());
    assert!(controller.status().needs_workaround);
    #[cfg(unix)]
    assert_eq!(context.start_method(), Some(StartMethod::Fork));
}

#[cfg(unix)]
#[test]
fn worker_binary_answers_over_the_protocol() {
    let executor = Arc::new(SubprocessExecutor::new(env!("CARGO_BIN_EXE_lios")));
    let dispatcher = Dispatcher::new(
        controller(ProcessContext::new(RuntimeVersion::new(3, 12, 0))),
        executor,
    );

    let caps = EngineKind::Cuneiform.capabilities();
    let mut selection = LanguageSelection::with_primary(caps, Some("ger"));
    assert!(selection.select_secondary(caps, "rus"));
    let engine = create_engine(EngineKind::Cuneiform, selection, &EngineOptions::default());

    assert_eq!(dispatcher.mode(), DispatchMode::Isolated);
    let err = dispatcher
        .recognize(engine.as_ref(), Path::new("missing.png"))
        .unwrap_err();
    assert!(matches!(
        err,
        OcrError::MultipleLanguagesUnsupported {
            engine: EngineKind::Cuneiform,
            requested: 2,
        }
    ));
}
