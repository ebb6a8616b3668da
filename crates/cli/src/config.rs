//! Configuration management for the CLI
//!
//! Flags and environment variables win over the config file, which wins over
//! built-in defaults.

use crate::output::OutputFormat;
use crate::Cli;
use anyhow::{Context, Result};
use clap::ValueEnum;
use predictor_lib::predictor::{
    OnnxModelConfig, OutputConfig, OutputFormatter, DEFAULT_CONFIDENCE_THRESHOLD,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_MODEL_PATH: &str = "models/attendance.onnx";
const DEFAULT_API_URL: &str = "http://localhost:8080";

/// CLI configuration file contents
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub model_path: Option<PathBuf>,
    pub metadata_path: Option<PathBuf>,
    pub api_url: Option<String>,
    pub default_format: Option<String>,
    pub confidence_threshold: Option<f32>,
}

impl Config {
    /// Load configuration from file; a missing file yields defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file {:?}", config_path))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", config_path))
    }

    /// `FAP_CONFIG` if set, else `~/.config/fap/config.json`
    fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("FAP_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("fap").join("config.json"))
    }
}

/// Effective settings for one invocation
#[derive(Debug, Clone)]
pub struct Settings {
    pub model: OnnxModelConfig,
    pub api_url: String,
    pub format: OutputFormat,
    pub confidence_threshold: f32,
}

impl Settings {
    pub fn resolve(cli: &Cli) -> Result<Self> {
        Self::merge(cli, Config::load()?)
    }

    fn merge(cli: &Cli, file: Config) -> Result<Self> {
        let format = match (cli.format, file.default_format.as_deref()) {
            (Some(format), _) => format,
            (None, Some(name)) => OutputFormat::from_str(name, true)
                .map_err(|e| anyhow::anyhow!("Invalid default_format in config: {}", e))?,
            (None, None) => OutputFormat::default(),
        };

        let confidence_threshold = file
            .confidence_threshold
            .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD);
        anyhow::ensure!(
            (0.0..=1.0).contains(&confidence_threshold),
            "confidence_threshold must be within [0, 1], got {}",
            confidence_threshold
        );

        Ok(Self {
            model: OnnxModelConfig {
                model_path: cli
                    .model
                    .clone()
                    .or(file.model_path)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
                metadata_path: cli.metadata.clone().or(file.metadata_path),
                sha256: cli.model_sha256.clone(),
            },
            api_url: cli
                .api_url
                .clone()
                .or(file.api_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            format,
            confidence_threshold,
        })
    }

    pub fn formatter(&self) -> OutputFormatter {
        OutputFormatter::with_config(OutputConfig {
            confidence_threshold: self.confidence_threshold,
        })
    }
}
