//! Prediction pipeline: encode, infer, normalize
//!
//! The model capability is injected at construction. A model that failed to
//! load is kept as [`ModelState::Unavailable`] so every request fails fast
//! with the same reason instead of reloading or guessing.

use super::features::{FeatureEncoder, RecordEncoder};
use super::AttendanceModel;
use crate::error::{PredictionError, Result};
use crate::models::{AttendanceLabel, FeatureVector, PredictionResult, RawAttributeRecord};
use std::sync::Arc;
use tracing::{debug, error};

/// Class label of "will attend" in the training data
pub const DEFAULT_POSITIVE_CLASS: i64 = 1;

/// Index of the positive class when the model does not report its classes
const FALLBACK_POSITIVE_INDEX: usize = 1;

/// Outcome of the one-time model load
#[derive(Clone)]
pub enum ModelState {
    Ready(Arc<dyn AttendanceModel>),
    Unavailable { reason: String },
}

impl ModelState {
    /// Record a load attempt; failures are logged here, once
    pub fn from_load<M>(result: anyhow::Result<M>) -> Self
    where
        M: AttendanceModel + 'static,
    {
        match result {
            Ok(model) => ModelState::Ready(Arc::new(model)),
            Err(e) => {
                let reason = format!("{:#}", e);
                error!(reason = %reason, "Attendance model failed to load");
                ModelState::Unavailable { reason }
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ModelState::Ready(_))
    }

    pub fn model(&self) -> Option<&Arc<dyn AttendanceModel>> {
        match self {
            ModelState::Ready(model) => Some(model),
            ModelState::Unavailable { .. } => None,
        }
    }
}

/// Encodes records and runs them through the injected classifier
#[derive(Clone)]
pub struct AttendancePredictor<E = FeatureEncoder> {
    encoder: E,
    model: ModelState,
}

impl AttendancePredictor<FeatureEncoder> {
    pub fn new(model: ModelState) -> Self {
        Self::with_encoder(FeatureEncoder::new(), model)
    }

    pub fn from_model<M: AttendanceModel + 'static>(model: M) -> Self {
        Self::new(ModelState::Ready(Arc::new(model)))
    }
}

impl<E: RecordEncoder> AttendancePredictor<E> {
    pub fn with_encoder(encoder: E, model: ModelState) -> Self {
        Self { encoder, model }
    }

    pub fn model_state(&self) -> &ModelState {
        &self.model
    }

    pub fn model_version(&self) -> Option<&str> {
        self.model.model().map(|m| m.version())
    }

    /// Encode without running inference
    pub fn encode(&self, record: &RawAttributeRecord) -> Result<FeatureVector> {
        Ok(self.encoder.encode(record)?)
    }

    /// Predict attendance for one booking record
    pub fn predict(&self, record: &RawAttributeRecord) -> Result<PredictionResult> {
        let model = match &self.model {
            ModelState::Ready(model) => model,
            ModelState::Unavailable { reason } => {
                return Err(PredictionError::ModelUnavailable {
                    reason: reason.clone(),
                })
            }
        };

        let features = self.encoder.encode(record)?;
        let result = infer(model.as_ref(), &features)?;

        debug!(
            label = %result.label,
            probability = result.probability,
            model_version = %model.version(),
            "Prediction completed"
        );
        Ok(result)
    }
}

fn infer(model: &dyn AttendanceModel, features: &FeatureVector) -> Result<PredictionResult> {
    let (raw_label, distribution) = model
        .predict_with_proba(features)
        .map_err(PredictionError::inference)?;

    let positive = model.positive_class();
    let index = positive_index(model.classes(), positive, distribution.len())?;
    let probability = distribution[index];
    if !(0.0..=1.0).contains(&probability) {
        return Err(PredictionError::inference(format!(
            "attend probability {} outside [0, 1]",
            probability
        )));
    }

    let label = map_label(model.classes(), positive, raw_label)?;
    Ok(PredictionResult { label, probability })
}

/// Resolve which entry of the distribution belongs to the positive class
fn positive_index(classes: Option<&[i64]>, positive: i64, distribution_len: usize) -> Result<usize> {
    match classes {
        Some(classes) => {
            if classes.len() != distribution_len {
                return Err(PredictionError::inference(format!(
                    "probability distribution has {} entries for {} classes",
                    distribution_len,
                    classes.len()
                )));
            }
            classes.iter().position(|c| *c == positive).ok_or_else(|| {
                PredictionError::inference(format!(
                    "positive class {} not among model classes {:?}",
                    positive, classes
                ))
            })
        }
        None if distribution_len == 2 => Ok(FALLBACK_POSITIVE_INDEX),
        None => Err(PredictionError::inference(format!(
            "cannot locate positive class in a {}-way distribution without class labels",
            distribution_len
        ))),
    }
}

fn map_label(classes: Option<&[i64]>, positive: i64, raw_label: i64) -> Result<AttendanceLabel> {
    if raw_label == positive {
        return Ok(AttendanceLabel::Attend);
    }
    let known = match classes {
        Some(classes) => classes.contains(&raw_label),
        None => raw_label == 0,
    };
    if known {
        Ok(AttendanceLabel::NotAttend)
    } else {
        Err(PredictionError::inference(format!(
            "model returned unknown class label {}",
            raw_label
        )))
    }
}
