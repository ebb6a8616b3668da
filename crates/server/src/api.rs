//! HTTP API for predictions, health checks and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use predictor_lib::{
    health::{ComponentStatus, HealthRegistry},
    models::{FeatureVector, RawAttributeRecord, FEATURE_LABELS, FEATURE_SCHEMA},
    observability::{PredictorMetrics, StructuredLogger},
    predictor::{
        feature_importance_report, AttendancePredictor, FeatureImportance, OutputFormatter,
        PredictionView,
    },
    EncodingError, ModelState, PredictionError,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub predictor: AttendancePredictor,
    pub formatter: OutputFormatter,
    pub health_registry: HealthRegistry,
    pub metrics: PredictorMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        predictor: AttendancePredictor,
        formatter: OutputFormatter,
        health_registry: HealthRegistry,
        metrics: PredictorMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            predictor,
            formatter,
            health_registry,
            metrics,
            logger,
        }
    }
}

/// Body returned for every failed request
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    #[serde(flatten)]
    pub prediction: PredictionView,
    pub model_version: String,
    pub generated_at: i64,
}

#[derive(Debug, Serialize)]
pub struct SchemaSlot {
    pub index: usize,
    pub name: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positive_class: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_importances: Option<Vec<FeatureImportance>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

fn error_status(err: &PredictionError) -> StatusCode {
    match err {
        PredictionError::Encoding(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PredictionError::ModelUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        PredictionError::Inference { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &PredictionError) -> Response {
    let field = match err {
        PredictionError::Encoding(EncodingError::InvalidField { field, .. }) => Some(*field),
        PredictionError::Encoding(EncodingError::UnknownDay(_)) => Some("day_of_week"),
        _ => None,
    };
    let body = ErrorBody {
        error: err.kind(),
        message: err.to_string(),
        field,
    };
    (error_status(err), Json(body)).into_response()
}

fn rejection_response(rejection: JsonRejection) -> Response {
    let body = ErrorBody {
        error: "invalid_body",
        message: rejection.body_text(),
        field: None,
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

/// Predict attendance for one booking record
async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RawAttributeRecord>, JsonRejection>,
) -> Response {
    let Json(record) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };

    let start = Instant::now();
    match state.predictor.predict(&record) {
        Ok(result) => {
            let elapsed = start.elapsed();
            let model_version = state.predictor.model_version().unwrap_or_default().to_string();
            state.metrics.observe_prediction_latency(elapsed.as_secs_f64());
            state.metrics.inc_predictions(&result);
            state
                .logger
                .log_prediction(&result, &model_version, elapsed.as_micros() as u64);

            let response = PredictResponse {
                prediction: state.formatter.format(&result),
                model_version,
                generated_at: chrono::Utc::now().timestamp(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => {
            state.metrics.inc_prediction_errors(&err);
            state.logger.log_prediction_failure(&err);
            error_response(&err)
        }
    }
}

/// Show the feature vector a record encodes to, without inference
async fn encode(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RawAttributeRecord>, JsonRejection>,
) -> Response {
    let Json(record) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    match state.predictor.encode(&record) {
        Ok(features) => (StatusCode::OK, Json::<FeatureVector>(features)).into_response(),
        Err(err) => error_response(&err),
    }
}

async fn schema() -> Json<Vec<SchemaSlot>> {
    let slots = FEATURE_SCHEMA
        .iter()
        .zip(FEATURE_LABELS)
        .enumerate()
        .map(|(index, (name, label))| SchemaSlot {
            index,
            name: *name,
            label,
        })
        .collect();
    Json(slots)
}

async fn model_info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let info = match state.predictor.model_state().model() {
        Some(model) => ModelInfo {
            ready: true,
            version: Some(model.version().to_string()),
            classes: model.classes().map(|c| c.to_vec()),
            positive_class: Some(model.positive_class()),
            feature_importances: model.feature_importances().and_then(feature_importance_report),
            reason: None,
        },
        None => {
            let reason = match state.predictor.model_state() {
                ModelState::Unavailable { reason } => Some(reason.clone()),
                ModelState::Ready(_) => None,
            };
            ModelInfo {
                ready: false,
                version: None,
                classes: None,
                positive_class: None,
                feature_importances: None,
                reason,
            }
        }
    };
    Json(info)
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;
    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;
    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/predict", post(predict))
        .route("/v1/encode", post(encode))
        .route("/v1/schema", get(schema))
        .route("/v1/model", get(model_info))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
