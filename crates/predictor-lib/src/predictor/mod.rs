//! ML prediction engine

mod engine;
mod features;
mod inference;
mod output;

pub use engine::{AttendancePredictor, ModelState, DEFAULT_POSITIVE_CLASS};
pub use features::{FeatureEncoder, RecordEncoder};
pub use inference::{metadata_path_for, ModelMetadata, OnnxModel, OnnxModelConfig};
pub use output::{
    feature_importance_report, ConfidenceBand, FeatureImportance, OutputConfig, OutputFormatter,
    PredictionView, DEFAULT_CONFIDENCE_THRESHOLD,
};

use crate::models::FeatureVector;
use anyhow::Result;

/// Trained classifier capability consumed by the predictor.
///
/// Implementations are loaded once and shared read-only between requests.
pub trait AttendanceModel: Send + Sync {
    /// Class label the model assigns to `features`
    fn predict(&self, features: &FeatureVector) -> Result<i64>;

    /// Probability distribution over classes, ordered like [`classes`](Self::classes)
    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f32>>;

    /// Label and distribution from one evaluation of the model
    fn predict_with_proba(&self, features: &FeatureVector) -> Result<(i64, Vec<f32>)> {
        Ok((self.predict(features)?, self.predict_proba(features)?))
    }

    /// Class labels in the order `predict_proba` reports them, when known
    fn classes(&self) -> Option<&[i64]> {
        None
    }

    /// Label of the class whose probability is reported as confidence
    fn positive_class(&self) -> i64 {
        DEFAULT_POSITIVE_CLASS
    }

    fn version(&self) -> &str;

    /// Per-slot importances in schema order, if the artifact ships them
    fn feature_importances(&self) -> Option<&[f32]> {
        None
    }
}
