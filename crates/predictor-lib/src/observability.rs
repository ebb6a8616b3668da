//! Observability infrastructure for the attendance predictor
//!
//! Provides:
//! - Prometheus metrics (prediction latency, outcomes by label, errors by kind, model info)
//! - Structured logging of prediction lifecycle events with tracing

use crate::error::PredictionError;
use crate::models::PredictionResult;
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, GaugeVec, Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Histogram buckets for prediction latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<PredictorMetricsInner> = OnceLock::new();

struct PredictorMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    prediction_errors_total: IntCounterVec,
    model_version_info: GaugeVec,
    model_ready: IntGauge,
    slow_inferences_total: IntCounter,
}

impl PredictorMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "attendance_prediction_latency_seconds",
                "Time spent encoding and running inference for one request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "attendance_predictions_total",
                "Predictions served, by predicted label",
                &["label"]
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter_vec!(
                "attendance_prediction_errors_total",
                "Failed prediction requests, by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_errors_total"),

            model_version_info: register_gauge_vec!(
                "attendance_model_version_info",
                "Information about the loaded attendance model",
                &["version"]
            )
            .expect("Failed to register model_version_info"),

            model_ready: register_int_gauge!(
                "attendance_model_ready",
                "1 when the attendance model loaded successfully"
            )
            .expect("Failed to register model_ready"),

            slow_inferences_total: register_int_counter!(
                "attendance_slow_inferences_total",
                "Model evaluations that exceeded the inference latency target"
            )
            .expect("Failed to register slow_inferences_total"),
        }
    }
}

/// Handle to the process-wide predictor metrics.
///
/// Clones share the same underlying Prometheus collectors.
#[derive(Clone)]
pub struct PredictorMetrics {
    _private: (),
}

impl Default for PredictorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictorMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PredictorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PredictorMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self, result: &PredictionResult) {
        self.inner()
            .predictions_total
            .with_label_values(&[result.label.as_str()])
            .inc();
    }

    pub fn inc_prediction_errors(&self, error: &PredictionError) {
        self.inner()
            .prediction_errors_total
            .with_label_values(&[error.kind()])
            .inc();
    }

    pub fn inc_slow_inferences(&self) {
        self.inner().slow_inferences_total.inc();
    }

    /// Publish the loaded model version, or mark the model as not ready
    pub fn set_model_version(&self, version: Option<&str>) {
        self.inner().model_version_info.reset();
        match version {
            Some(version) => {
                self.inner()
                    .model_version_info
                    .with_label_values(&[version])
                    .set(1.0);
                self.inner().model_ready.set(1);
            }
            None => self.inner().model_ready.set(0),
        }
    }
}

/// Structured logger for predictor events
#[derive(Clone)]
pub struct StructuredLogger {
    node_name: String,
}

impl StructuredLogger {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    pub fn log_prediction(&self, result: &PredictionResult, model_version: &str, elapsed_us: u64) {
        info!(
            event = "prediction_generated",
            node = %self.node_name,
            label = %result.label,
            probability = result.probability,
            model_version = %model_version,
            elapsed_us = elapsed_us,
            "Generated attendance prediction"
        );
    }

    pub fn log_prediction_failure(&self, error: &PredictionError) {
        match error {
            PredictionError::Encoding(_) => {
                info!(
                    event = "prediction_failed",
                    node = %self.node_name,
                    kind = error.kind(),
                    error = %error,
                    "Rejected booking record"
                );
            }
            PredictionError::ModelUnavailable { .. } => {
                warn!(
                    event = "prediction_failed",
                    node = %self.node_name,
                    kind = error.kind(),
                    error = %error,
                    "Prediction requested while model unavailable"
                );
            }
            PredictionError::Inference { .. } => {
                error!(
                    event = "prediction_failed",
                    node = %self.node_name,
                    kind = error.kind(),
                    error = %error,
                    "Model inference failed"
                );
            }
        }
    }

    pub fn log_model_loaded(&self, version: &str, path: &str) {
        info!(
            event = "model_loaded",
            node = %self.node_name,
            model_version = %version,
            path = %path,
            "Attendance model loaded"
        );
    }

    pub fn log_model_unavailable(&self, path: &str, reason: &str) {
        error!(
            event = "model_unavailable",
            node = %self.node_name,
            path = %path,
            reason = %reason,
            "Attendance model unavailable, predictions will be refused"
        );
    }

    pub fn log_startup(&self, version: &str, model_version: Option<&str>) {
        info!(
            event = "service_started",
            node = %self.node_name,
            service_version = %version,
            model_version = model_version.unwrap_or("unavailable"),
            "Attendance predictor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            node = %self.node_name,
            reason = %reason,
            "Attendance predictor shutting down"
        );
    }
}
