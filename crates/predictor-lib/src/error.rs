//! Error taxonomy for encoding and prediction

use thiserror::Error;

/// Boxed cause carried by inference failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Caller supplied a value outside the recognized domain
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EncodingError {
    #[error("invalid value for `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("unknown day of week {0:?}")]
    UnknownDay(String),
}

impl EncodingError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        EncodingError::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            EncodingError::InvalidField { .. } => "invalid_field",
            EncodingError::UnknownDay(_) => "unknown_day",
        }
    }
}

/// Failure of a prediction request
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("model unavailable: {reason}")]
    ModelUnavailable { reason: String },

    #[error("inference failed: {source}")]
    Inference {
        #[source]
        source: BoxError,
    },
}

impl PredictionError {
    pub(crate) fn inference(source: impl Into<BoxError>) -> Self {
        PredictionError::Inference {
            source: source.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PredictionError::Encoding(e) => e.kind(),
            PredictionError::ModelUnavailable { .. } => "model_unavailable",
            PredictionError::Inference { .. } => "inference_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, PredictionError>;
