//! Recognize command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use console::style;

use crate::cli::icons::{dim_arrow, info, success, warn};
use lios::config::Settings;
use lios::ocr::{create_engine, EngineKind, LanguageSelection, OcrEngine};
use lios::{Dispatcher, SubprocessExecutor};

pub struct RecognizeRequest {
    pub image: PathBuf,
    pub engine: Option<String>,
    pub language: Option<String>,
    pub language_2: Option<String>,
    pub language_3: Option<String>,
    pub inline: bool,
}

pub async fn cmd_recognize(settings: &Settings, request: RecognizeRequest) -> anyhow::Result<()> {
    if !request.image.exists() {
        anyhow::bail!("Image not found: {}", request.image.display());
    }

    let kind = match request.engine.as_deref() {
        Some(name) => EngineKind::from_str(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown engine '{}'", name))?,
        None => settings.engine,
    };

    let mut engine = create_engine(kind, LanguageSelection::new(), &settings.engine_options());
    if !engine.is_available() {
        anyhow::bail!("{} is not available: {}", kind, engine.availability_hint());
    }
    select_languages(engine.as_mut(), settings, &request);

    let controller = settings.compatibility_controller();
    let executor = if request.inline || !settings.isolation {
        None
    } else {
        let executor = SubprocessExecutor::current_exe()
            .context("cannot locate the lios binary for worker processes")?;
        Some(Arc::new(executor.with_timeout(settings.worker_timeout)))
    };
    let dispatcher = match executor {
        Some(ref executor) => Dispatcher::new(controller, executor.clone()),
        None => Dispatcher::inline_only(controller),
    };

    let engine: Arc<dyn OcrEngine> = Arc::from(engine);
    eprintln!(
        "{} Recognizing {} with {}",
        info(),
        request.image.display(),
        kind
    );

    let mut task = {
        let engine = engine.clone();
        let image = request.image.clone();
        tokio::task::spawn_blocking(move || dispatcher.recognize_with_mode(engine.as_ref(), &image))
    };

    let outcome = tokio::select! {
        joined = &mut task => joined.context("recognition task failed")?,
        _ = tokio::signal::ctrl_c() => {
            if !engine.supports_cancellation() && executor.is_none() {
                eprintln!("{} {} cannot be cancelled; waiting for it to finish", warn(), kind);
            } else {
                eprintln!("{} Cancelling recognition", warn());
            }
            engine.cancel();
            if let Some(ref executor) = executor {
                executor.cancel();
            }
            task.await.context("recognition task failed")?
        }
    };

    let (result, mode) = outcome?;
    print!("{}", result.text);
    if !result.text.ends_with('\n') {
        println!();
    }
    eprintln!(
        "{} {} ({}, {}, {} ms)",
        success(),
        style("Done").bold(),
        result.languages.join("+"),
        mode,
        result.processing_time_ms
    );
    Ok(())
}

/// Apply CLI languages, falling back to configured ones.
fn select_languages(engine: &mut dyn OcrEngine, settings: &Settings, request: &RecognizeRequest) {
    let primary = request.language.as_ref().or(settings.language.as_ref());
    let secondary = request.language_2.as_ref().or(settings.language_2.as_ref());
    let tertiary = request.language_3.as_ref().or(settings.language_3.as_ref());

    if let Some(language) = primary {
        if !engine.set_language(language) {
            eprintln!(
                "{} {} does not support '{}'; using {}",
                warn(),
                engine.kind(),
                language,
                engine.capabilities().default_language
            );
        }
    }
    if let Some(language) = secondary {
        if !engine.set_language_2(language) {
            eprintln!("  {} secondary language '{}' ignored", dim_arrow(), language);
        }
    }
    if let Some(language) = tertiary {
        if !engine.set_language_3(language) {
            eprintln!("  {} tertiary language '{}' ignored", dim_arrow(), language);
        }
    }
}
