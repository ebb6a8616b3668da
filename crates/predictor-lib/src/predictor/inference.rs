//! ONNX inference using tract
//!
//! Loads the attendance classifier exported to ONNX (sklearn-onnx with
//! `zipmap=False`) together with its sidecar metadata, and exposes it as an
//! [`AttendanceModel`].

use super::AttendanceModel;
use crate::models::{FeatureVector, FEATURE_SCHEMA, NUM_FEATURES};
use crate::observability::PredictorMetrics;
use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, info, warn};

/// Output index of the predicted label tensor
const LABEL_OUTPUT: usize = 0;

/// Output index of the class probability tensor
const PROBABILITY_OUTPUT: usize = 1;

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Sidecar description of a trained artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub version: String,
    /// Column order the model was fit on
    pub feature_names: Vec<String>,
    /// Class labels in probability-output order
    pub classes: Vec<i64>,
    #[serde(default = "default_positive_class")]
    pub positive_class: i64,
    #[serde(default)]
    pub feature_importances: Option<Vec<f32>>,
}

fn default_positive_class() -> i64 {
    super::DEFAULT_POSITIVE_CLASS
}

impl ModelMetadata {
    /// Metadata matching the current feature schema and a `[0, 1]` class list
    pub fn for_schema(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            feature_names: FEATURE_SCHEMA.iter().map(|s| s.to_string()).collect(),
            classes: vec![0, 1],
            positive_class: super::DEFAULT_POSITIVE_CLASS,
            feature_importances: None,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model metadata {:?}", path))?;
        let metadata: ModelMetadata = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse model metadata {:?}", path))?;
        metadata.validate()?;
        Ok(metadata)
    }

    /// Reject artifacts whose schema or class list cannot be served safely
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.feature_names.len() == NUM_FEATURES,
            "Model expects {} features, encoder produces {}",
            self.feature_names.len(),
            NUM_FEATURES
        );
        for (idx, (got, want)) in self.feature_names.iter().zip(FEATURE_SCHEMA).enumerate() {
            ensure!(
                got == want,
                "Feature schema mismatch at slot {}: model has {:?}, encoder produces {:?}",
                idx,
                got,
                want
            );
        }

        ensure!(!self.classes.is_empty(), "Model metadata lists no classes");
        let mut sorted = self.classes.clone();
        sorted.sort_unstable();
        sorted.dedup();
        ensure!(sorted.len() == self.classes.len(), "Duplicate class labels in {:?}", self.classes);
        ensure!(
            self.classes.contains(&self.positive_class),
            "Positive class {} not among classes {:?}",
            self.positive_class,
            self.classes
        );

        if let Some(importances) = &self.feature_importances {
            ensure!(
                importances.len() == NUM_FEATURES,
                "Expected {} feature importances, got {}",
                NUM_FEATURES,
                importances.len()
            );
            ensure!(
                importances.iter().all(|v| v.is_finite()),
                "Feature importances must be finite"
            );
        }
        Ok(())
    }
}

/// Default sidecar location: `model.onnx` -> `model.meta.json`
pub fn metadata_path_for(model_path: &Path) -> PathBuf {
    model_path.with_extension("meta.json")
}

/// Where to find the artifact and how to verify it
#[derive(Debug, Clone)]
pub struct OnnxModelConfig {
    pub model_path: PathBuf,
    pub metadata_path: Option<PathBuf>,
    /// Hex-encoded SHA-256 of the model file
    pub sha256: Option<String>,
}

impl OnnxModelConfig {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            metadata_path: None,
            sha256: None,
        }
    }

    pub fn resolved_metadata_path(&self) -> PathBuf {
        self.metadata_path
            .clone()
            .unwrap_or_else(|| metadata_path_for(&self.model_path))
    }
}

/// ONNX-based attendance classifier
pub struct OnnxModel {
    plan: TractModel,
    metadata: ModelMetadata,
    metrics: PredictorMetrics,
}

impl OnnxModel {
    /// Load, verify and optimize the artifact described by `config`
    pub fn load(config: &OnnxModelConfig) -> Result<Self> {
        let bytes = std::fs::read(&config.model_path)
            .with_context(|| format!("Failed to read model file {:?}", config.model_path))?;

        if let Some(expected) = &config.sha256 {
            verify_checksum(&bytes, expected)
                .with_context(|| format!("Model file {:?} failed verification", config.model_path))?;
        }

        let metadata = ModelMetadata::from_path(&config.resolved_metadata_path())?;
        let model = Self::from_bytes(&bytes, metadata)?;

        info!(
            path = ?config.model_path,
            version = %model.metadata.version,
            classes = ?model.metadata.classes,
            "Loaded attendance model"
        );
        Ok(model)
    }

    /// Build from in-memory model bytes and already-read metadata
    pub fn from_bytes(model_bytes: &[u8], metadata: ModelMetadata) -> Result<Self> {
        metadata.validate()?;
        let plan = Self::load_plan(model_bytes)?;
        Ok(Self {
            plan,
            metadata,
            metrics: PredictorMetrics::new(),
        })
    }

    fn load_plan(model_bytes: &[u8]) -> Result<TractModel> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, NUM_FEATURES]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    fn run(&self, features: &FeatureVector) -> Result<TVec<TValue>> {
        let start = Instant::now();
        let input = Tensor::from_shape(&[1, NUM_FEATURES], features.as_slice())?;
        let outputs = self.plan.run(tvec!(input.into()))?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            self.metrics.inc_slow_inferences();
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }
        Ok(outputs)
    }

    fn label(outputs: &[TValue]) -> Result<i64> {
        let label = outputs
            .get(LABEL_OUTPUT)
            .context("Model produced no label output")?
            .cast_to::<i64>()?;
        match label.as_slice::<i64>()? {
            [value] => Ok(*value),
            other => bail!("Expected a single label, got {} values", other.len()),
        }
    }

    fn probabilities(&self, outputs: &[TValue]) -> Result<Vec<f32>> {
        let probabilities = outputs
            .get(PROBABILITY_OUTPUT)
            .context("Model produced no probability output (export with zipmap disabled)")?
            .cast_to::<f32>()?;
        let values: Vec<f32> = probabilities.as_slice::<f32>()?.to_vec();
        if values.len() != self.metadata.classes.len() {
            bail!(
                "Model output has {} probabilities, metadata lists {} classes",
                values.len(),
                self.metadata.classes.len()
            );
        }
        Ok(values)
    }
}

impl AttendanceModel for OnnxModel {
    fn predict(&self, features: &FeatureVector) -> Result<i64> {
        Self::label(&self.run(features)?)
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f32>> {
        self.probabilities(&self.run(features)?)
    }

    fn predict_with_proba(&self, features: &FeatureVector) -> Result<(i64, Vec<f32>)> {
        let outputs = self.run(features)?;
        Ok((Self::label(&outputs)?, self.probabilities(&outputs)?))
    }

    fn classes(&self) -> Option<&[i64]> {
        Some(&self.metadata.classes)
    }

    fn positive_class(&self) -> i64 {
        self.metadata.positive_class
    }

    fn version(&self) -> &str {
        &self.metadata.version
    }

    fn feature_importances(&self) -> Option<&[f32]> {
        self.metadata.feature_importances.as_deref()
    }
}

fn verify_checksum(bytes: &[u8], expected: &str) -> Result<()> {
    let actual = hex::encode(Sha256::digest(bytes));
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        bail!("Checksum mismatch: expected {}, got {}", expected, actual);
    }
    Ok(())
}
