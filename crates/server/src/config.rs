//! Server configuration

use anyhow::{Context, Result};
use predictor_lib::predictor::{OnnxModelConfig, DEFAULT_CONFIDENCE_THRESHOLD};
use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Instance name attached to structured log events
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// Port for the prediction, health and metrics API
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Path to the ONNX attendance classifier
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Model metadata; defaults to the `.meta.json` sidecar of `model_path`
    #[serde(default)]
    pub metadata_path: Option<PathBuf>,

    /// Expected hex SHA-256 of the model file
    #[serde(default)]
    pub model_sha256: Option<String>,

    /// Attend probability above which a prediction is reported as high probability
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
}

fn default_node_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/attendance.onnx")
}

fn default_confidence_threshold() -> f32 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

impl ServerConfig {
    /// Load from `attendance.{toml,json,yaml}` (optional) overlaid with `ATTENDANCE_*` env vars
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("attendance").required(false))
            .add_source(config::Environment::with_prefix("ATTENDANCE").try_parsing(true))
            .build()
            .context("Failed to build configuration")?;
        Self::from_config(config)
    }

    pub fn from_config(config: config::Config) -> Result<Self> {
        let parsed: ServerConfig = config
            .try_deserialize()
            .context("Invalid server configuration")?;
        anyhow::ensure!(
            (0.0..=1.0).contains(&parsed.confidence_threshold),
            "confidence_threshold must be within [0, 1], got {}",
            parsed.confidence_threshold
        );
        Ok(parsed)
    }

    pub fn model_config(&self) -> OnnxModelConfig {
        OnnxModelConfig {
            model_path: self.model_path.clone(),
            metadata_path: self.metadata_path.clone(),
            sha256: self.model_sha256.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_config(config::Config::builder().build().unwrap()).unwrap();
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.model_path, PathBuf::from("models/attendance.onnx"));
        assert!(config.metadata_path.is_none());
        assert!((config.confidence_threshold - 0.7).abs() < f32::EPSILON);
        assert_eq!(
            config.model_config().resolved_metadata_path(),
            PathBuf::from("models/attendance.meta.json")
        );
    }

    #[test]
    fn test_overrides() {
        let built = config::Config::builder()
            .set_override("api_port", 9090)
            .unwrap()
            .set_override("model_path", "/srv/models/v2.onnx")
            .unwrap()
            .set_override("model_sha256", "abc123")
            .unwrap()
            .build()
            .unwrap();
        let config = ServerConfig::from_config(built).unwrap();
        assert_eq!(config.api_port, 9090);
        assert_eq!(config.model_config().sha256.as_deref(), Some("abc123"));
        assert_eq!(
            config.model_config().resolved_metadata_path(),
            PathBuf::from("/srv/models/v2.meta.json")
        );
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let built = config::Config::builder()
            .set_override("confidence_threshold", 1.5)
            .unwrap()
            .build()
            .unwrap();
        assert!(ServerConfig::from_config(built).is_err());
    }
}
