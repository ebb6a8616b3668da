//! Attendance prediction library
//!
//! This crate provides the core functionality for:
//! - Encoding booking records into the trained feature schema
//! - ONNX model loading and inference
//! - Prediction output formatting
//! - Health checks and observability

pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;

pub use error::{EncodingError, PredictionError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{PredictorMetrics, StructuredLogger};
pub use predictor::{AttendanceModel, AttendancePredictor, FeatureEncoder, ModelState};
