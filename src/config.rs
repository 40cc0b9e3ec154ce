//! Configuration management for lios using the prefer crate.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compat::{
    CompatibilityController, ParseVersionError, ProcessContext, RuntimeVersion, WorkaroundPolicy,
};
use crate::ocr::{EngineKind, EngineOptions};

/// Default worker timeout in seconds (5 minutes).
pub const DEFAULT_WORKER_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse {format} config: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    #[error("Unknown engine '{0}'")]
    UnknownEngine(String),

    #[error(transparent)]
    InvalidVersion(#[from] ParseVersionError),
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Engine name ("tesseract", "cuneiform").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    /// Primary recognition language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Secondary recognition language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_2: Option<String>,
    /// Tertiary recognition language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_3: Option<String>,
    /// Tesseract data directory; `~` is expanded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tessdata_dir: Option<String>,
    /// Version of the hosting runtime, e.g. "3.14.0".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_version: Option<String>,
    /// First runtime version that needs the process-creation workaround.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_since: Option<String>,
    /// Allow recognition in worker processes when safe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isolation: Option<bool>,
    /// Seconds before a worker is killed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_timeout_secs: Option<u64>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers lios config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("lios").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!("Ignoring config file {}: {}", path.display(), e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path).await?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse configuration text in the format named by `ext`.
    pub fn parse(contents: &str, ext: &str) -> Result<Self, ConfigError> {
        match ext {
            "toml" => toml::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "TOML",
                message: e.to_string(),
            }),
            "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "YAML",
                message: e.to_string(),
            }),
            _ => serde_json::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "JSON",
                message: e.to_string(),
            }),
        }
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }
}

/// Resolved application settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub engine: EngineKind,
    pub language: Option<String>,
    pub language_2: Option<String>,
    pub language_3: Option<String>,
    pub tessdata_dir: Option<PathBuf>,
    /// Host runtime version; `0.0.0` when the host did not say.
    pub runtime_version: RuntimeVersion,
    pub affected_since: RuntimeVersion,
    pub isolation: bool,
    pub worker_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            engine: EngineKind::Tesseract,
            language: None,
            language_2: None,
            language_3: None,
            tessdata_dir: None,
            runtime_version: RuntimeVersion::default(),
            affected_since: WorkaroundPolicy::default().affected_since,
            isolation: true,
            worker_timeout: Duration::from_secs(DEFAULT_WORKER_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    /// Apply a config file on top of the defaults.
    /// `base_dir` resolves relative paths (config file dir or CWD).
    pub fn from_config(config: &Config, base_dir: &Path) -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        if let Some(ref engine) = config.engine {
            settings.engine = EngineKind::from_str(engine)
                .ok_or_else(|| ConfigError::UnknownEngine(engine.clone()))?;
        }
        settings.language = config.language.clone();
        settings.language_2 = config.language_2.clone();
        settings.language_3 = config.language_3.clone();
        if let Some(ref dir) = config.tessdata_dir {
            settings.tessdata_dir = Some(config.resolve_path(dir, base_dir));
        }
        if let Some(ref version) = config.runtime_version {
            settings.runtime_version = version.parse()?;
        }
        if let Some(ref version) = config.affected_since {
            settings.affected_since = version.parse()?;
        }
        if let Some(isolation) = config.isolation {
            settings.isolation = isolation;
        }
        if let Some(secs) = config.worker_timeout_secs {
            settings.worker_timeout = Duration::from_secs(secs);
        }
        Ok(settings)
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            tessdata_dir: self.tessdata_dir.clone(),
        }
    }

    pub fn workaround_policy(&self) -> WorkaroundPolicy {
        WorkaroundPolicy::new(self.affected_since)
    }

    /// Build the process-wide compatibility controller for these settings.
    pub fn compatibility_controller(&self) -> Arc<CompatibilityController> {
        Arc::new(CompatibilityController::new(
            Arc::new(ProcessContext::new(self.runtime_version)),
            self.workaround_policy(),
        ))
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (skips auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Resolve relative paths from CWD instead of the config file location.
    pub use_cwd: bool,
}

/// Load configuration and build settings.
pub async fn load_settings(options: LoadOptions) -> Result<(Settings, Config), ConfigError> {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };
    if let Some(ref path) = config.source_path {
        tracing::debug!("Loaded config from {}", path.display());
    }

    let cwd = || std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let base_dir = if options.use_cwd {
        cwd()
    } else {
        config.base_dir().unwrap_or_else(cwd)
    };

    let settings = Settings::from_config(&config, &base_dir)?;
    Ok((settings, config))
}
