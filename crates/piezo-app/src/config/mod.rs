//! Configuration loading (defaults → file → environment).

use std::path::PathBuf;

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

use crate::options::{DEFAULT_DOWNSAMPLE_THRESHOLD, DEFAULT_RESOLUTION_DPI};

const CONFIG_FILE: &str = "config/piezo";

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("unable to resolve project directories")]
    MissingProjectDirs,
    #[error(transparent)]
    Build(#[from] config::ConfigError),
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub compress: CompressConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Explicit engine binary; discovery runs when unset.
    pub binary: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CompressConfig {
    pub preset: String,
    pub resolution_dpi: f64,
    pub downsample_threshold: f64,
    pub grayscale: bool,
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            preset: "ebook".to_string(),
            resolution_dpi: DEFAULT_RESOLUTION_DPI,
            downsample_threshold: DEFAULT_DOWNSAMPLE_THRESHOLD,
            grayscale: false,
        }
    }
}

/// Load configuration: built-in defaults, then the user config file, then a
/// project-local `config/piezo.*`, then `PIEZO__`-prefixed environment
/// variables (e.g. `PIEZO__COMPRESS__RESOLUTION_DPI=150`).
pub fn load() -> Result<AppConfig, AppConfigError> {
    let mut builder = Config::builder()
        .set_default("compress.preset", "ebook")?
        .set_default("compress.resolution_dpi", DEFAULT_RESOLUTION_DPI)?
        .set_default("compress.downsample_threshold", DEFAULT_DOWNSAMPLE_THRESHOLD)?
        .set_default("compress.grayscale", false)?;

    if let Ok(dirs) = project_dirs() {
        let user_file = dirs.config_dir().join("piezo");
        builder = builder.add_source(
            File::with_name(&user_file.to_string_lossy()).required(false),
        );
    }

    let cfg = builder
        .add_source(File::with_name(CONFIG_FILE).required(false))
        .add_source(
            Environment::with_prefix("PIEZO")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;
    Ok(cfg)
}

pub fn project_dirs() -> Result<ProjectDirs, AppConfigError> {
    ProjectDirs::from("dev", "piezo", "piezo").ok_or(AppConfigError::MissingProjectDirs)
}
