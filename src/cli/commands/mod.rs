//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod engines;
mod recognize;
mod status;
mod worker;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use lios::config::{load_settings, LoadOptions};
use lios::RuntimeVersion;

#[derive(Parser)]
#[command(name = "lios")]
#[command(about = "Optical character recognition front end for Tesseract and Cuneiform")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Version of the hosting runtime (overrides config file)
    #[arg(long, global = true, env = "LIOS_RUNTIME_VERSION")]
    runtime_version: Option<RuntimeVersion>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Show process compatibility status
    Status {
        /// Re-derive the process-creation method even if already initialized
        #[arg(long)]
        force: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List engines, their availability and languages
    Engines {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Recognize text in an image
    Recognize {
        /// Image file to recognize
        image: PathBuf,

        /// Engine to use (tesseract, cuneiform)
        #[arg(short, long)]
        engine: Option<String>,

        /// Primary language
        #[arg(short, long)]
        language: Option<String>,

        /// Secondary language
        #[arg(long)]
        lang2: Option<String>,

        /// Tertiary language
        #[arg(long)]
        lang3: Option<String>,

        /// Always run in this process, never in a worker
        #[arg(long)]
        inline: bool,
    },

    /// Serve one recognition job on stdin/stdout
    #[command(hide = true)]
    Worker,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let command = match cli.command {
        // Workers get everything they need from the job itself.
        Commands::Worker => return worker::cmd_worker(),
        command => command,
    };

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
    };
    let (mut settings, _config) = load_settings(options)
        .await
        .context("failed to load configuration")?;
    if let Some(version) = cli.runtime_version {
        settings.runtime_version = version;
    }

    match command {
        Commands::Status { force, json } => status::cmd_status(&settings, force, json),
        Commands::Engines { json } => engines::cmd_engines(&settings, json),
        Commands::Recognize {
            image,
            engine,
            language,
            lang2,
            lang3,
            inline,
        } => {
            let request = recognize::RecognizeRequest {
                image,
                engine,
                language,
                language_2: lang2,
                language_3: lang3,
                inline,
            };
            recognize::cmd_recognize(&settings, request).await
        }
        Commands::Worker => worker::cmd_worker(),
    }
}
