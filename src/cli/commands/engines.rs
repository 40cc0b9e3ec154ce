//! Engine listing command.

use console::style;
use serde_json::json;

use crate::cli::icons::{dim_arrow, error, flag, success};
use lios::config::Settings;
use lios::ocr::{create_engine, EngineKind, LanguageSelection};

pub fn cmd_engines(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let options = settings.engine_options();
    let engines: Vec<_> = EngineKind::ALL
        .iter()
        .map(|&kind| create_engine(kind, LanguageSelection::new(), &options))
        .collect();

    if json {
        let report: Vec<_> = engines
            .iter()
            .map(|engine| {
                let caps = engine.capabilities();
                json!({
                    "engine": engine.kind(),
                    "available": engine.is_available(),
                    "default": engine.kind() == settings.engine,
                    "supports_multiple_languages": caps.supports_multiple_languages,
                    "supports_cancellation": caps.supports_cancellation,
                    "default_language": caps.default_language,
                    "languages": caps.languages,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\n{}", style("OCR Engines").bold());
    println!("{}", "-".repeat(50));
    for engine in &engines {
        let caps = engine.capabilities();
        let name = if engine.kind() == settings.engine {
            format!("{} (default)", engine.kind())
        } else {
            engine.kind().to_string()
        };
        if engine.is_available() {
            println!("{} {}", success(), style(name).cyan());
        } else {
            println!("{} {}", error(), style(name).cyan());
            println!("    {}", style(engine.availability_hint()).dim());
        }
        println!(
            "  {} multiple languages: {}  cancellation: {}",
            dim_arrow(),
            flag(caps.supports_multiple_languages),
            flag(caps.supports_cancellation)
        );
        println!(
            "  {} languages ({}): {}",
            dim_arrow(),
            caps.languages.len(),
            caps.languages.join(" ")
        );
    }
    println!();
    Ok(())
}
