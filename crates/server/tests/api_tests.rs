//! Integration tests for the prediction API endpoints

use attendance_server::api::{create_router, AppState};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use predictor_lib::{
    health::HealthRegistry,
    models::FeatureVector,
    observability::{PredictorMetrics, StructuredLogger},
    predictor::{AttendanceModel, AttendancePredictor, ModelState, OutputFormatter},
};
use std::sync::Arc;
use tower::ServiceExt;

static CLASSES: &[i64] = &[0, 1];
static IMPORTANCES: &[f32] = &[0.3, 0.25, 0.05, 0.1, 0.02, 0.08, 0.04, 0.06, 0.01, 0.09];

/// Answers with a fixed attend probability; label follows a 0.5 cut
struct FixedModel {
    attend_probability: f32,
    fail: bool,
}

impl AttendanceModel for FixedModel {
    fn predict(&self, _features: &FeatureVector) -> anyhow::Result<i64> {
        if self.fail {
            anyhow::bail!("graph execution failed");
        }
        Ok(if self.attend_probability > 0.5 { 1 } else { 0 })
    }

    fn predict_proba(&self, _features: &FeatureVector) -> anyhow::Result<Vec<f32>> {
        Ok(vec![1.0 - self.attend_probability, self.attend_probability])
    }

    fn classes(&self) -> Option<&[i64]> {
        Some(CLASSES)
    }

    fn version(&self) -> &str {
        "test-v1"
    }

    fn feature_importances(&self) -> Option<&[f32]> {
        Some(IMPORTANCES)
    }
}

async fn setup_app(model_state: ModelState) -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry.record_model_state(&model_state).await;
    health_registry.set_ready(true).await;

    let state = Arc::new(AppState::new(
        AttendancePredictor::new(model_state),
        OutputFormatter::new(),
        health_registry,
        PredictorMetrics::new(),
        StructuredLogger::new("test-node"),
    ));
    (create_router(state.clone()), state)
}

async fn setup_ready_app(attend_probability: f32) -> Router {
    let model = FixedModel {
        attend_probability,
        fail: false,
    };
    setup_app(ModelState::Ready(Arc::new(model))).await.0
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn booking() -> serde_json::Value {
    serde_json::json!({
        "months_as_member": 12,
        "weight": 70.0,
        "days_before": 7,
        "day_of_week": "Wed",
        "time": "PM",
        "category": "HIIT"
    })
}

#[tokio::test]
async fn test_predict_returns_view() {
    let app = setup_ready_app(0.83).await;
    let response = app.oneshot(post_json("/v1/predict", booking())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["label"], "attend");
    assert_eq!(body["headline"], "Will Attend");
    assert_eq!(body["confidence_band"], "high");
    assert_eq!(body["probability_percent"], "83.00%");
    assert_eq!(body["model_version"], "test-v1");
    let p = body["probability"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&p));
}

#[tokio::test]
async fn test_predict_accepts_camel_case_fields() {
    let app = setup_ready_app(0.2).await;
    let body = serde_json::json!({
        "monthsAsMember": "3",
        "weight": "81.5",
        "daysBefore": 2,
        "dayOfWeek": "Sunday",
        "time": "Morning",
        "category": "Aqua"
    });
    let response = app.oneshot(post_json("/v1/predict", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["label"], "not_attend");
    assert_eq!(body["confidence_band"], "low");
}

#[tokio::test]
async fn test_unknown_day_is_unprocessable() {
    let app = setup_ready_app(0.8).await;
    let mut record = booking();
    record["day_of_week"] = "Funday".into();
    let response = app.oneshot(post_json("/v1/predict", record)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["error"], "unknown_day");
    assert_eq!(body["field"], "day_of_week");
}

#[tokio::test]
async fn test_negative_weight_is_invalid_field() {
    let app = setup_ready_app(0.8).await;
    let mut record = booking();
    record["weight"] = (-5.0).into();
    let response = app.oneshot(post_json("/v1/predict", record)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["error"], "invalid_field");
    assert_eq!(body["field"], "weight");
}

#[tokio::test]
async fn test_mistyped_numeric_fields_are_invalid_field() {
    for (field, value) in [
        ("months_as_member", serde_json::json!(true)),
        ("weight", serde_json::json!({"kg": 70})),
        ("days_before", serde_json::json!([7])),
    ] {
        let app = setup_ready_app(0.8).await;
        let mut record = booking();
        record[field] = value;
        let response = app.oneshot(post_json("/v1/encode", record)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{}", field);
        let body = json_body(response).await;
        assert_eq!(body["error"], "invalid_field");
        assert_eq!(body["field"], field);
    }
}

#[tokio::test]
async fn test_numeric_day_is_unknown_day() {
    let app = setup_ready_app(0.8).await;
    let mut record = booking();
    record["day_of_week"] = 5.into();
    let response = app.oneshot(post_json("/v1/predict", record)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["error"], "unknown_day");
    assert_eq!(body["field"], "day_of_week");
}

#[tokio::test]
async fn test_mistyped_time_and_category_are_invalid_field() {
    for (field, value) in [("time", serde_json::json!(false)), ("category", serde_json::json!(2))] {
        let app = setup_ready_app(0.8).await;
        let mut record = booking();
        record[field] = value;
        let response = app.oneshot(post_json("/v1/predict", record)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{}", field);
        let body = json_body(response).await;
        assert_eq!(body["error"], "invalid_field");
        assert_eq!(body["field"], field);
    }
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = setup_ready_app(0.8).await;
    let request = Request::builder()
        .method("POST")
        .uri("/v1/predict")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "invalid_body");
}

#[tokio::test]
async fn test_unavailable_model_returns_503() {
    let state = ModelState::Unavailable {
        reason: "Failed to read model file".to_string(),
    };
    let (app, _state) = setup_app(state).await;
    let response = app
        .clone()
        .oneshot(post_json("/v1/predict", booking()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["error"], "model_unavailable");
    assert!(body["message"].as_str().unwrap().contains("Failed to read model file"));

    let readiness = app.oneshot(get("/readyz")).await.unwrap();
    assert_eq!(readiness.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_inference_failure_returns_500() {
    let model = FixedModel {
        attend_probability: 0.9,
        fail: true,
    };
    let (app, _state) = setup_app(ModelState::Ready(Arc::new(model))).await;
    let response = app.oneshot(post_json("/v1/predict", booking())).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["error"], "inference_error");
    assert!(body["message"].as_str().unwrap().contains("graph execution failed"));
}

#[tokio::test]
async fn test_encode_returns_schema_ordered_vector() {
    let app = setup_ready_app(0.5).await;
    let response = app.oneshot(post_json("/v1/encode", booking())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let values: Vec<f64> = body
        .as_object()
        .unwrap()
        .values()
        .map(|v| v.as_f64().unwrap())
        .collect();
    assert_eq!(body["day_of_week"], 3.0);
    assert_eq!(body["category_HIIT"], 1.0);
    assert_eq!(body["time_PM"], 1.0);
    assert_eq!(values.len(), 10);
}

#[tokio::test]
async fn test_schema_lists_slots_in_order() {
    let app = setup_ready_app(0.5).await;
    let response = app.oneshot(get("/v1/schema")).await.unwrap();
    let body = json_body(response).await;
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|slot| slot["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.first(), Some(&"months_as_member"));
    assert_eq!(names.last(), Some(&"time_PM"));
    assert_eq!(names.len(), 10);
}

#[tokio::test]
async fn test_model_info_reports_importances() {
    let app = setup_ready_app(0.5).await;
    let response = app.oneshot(get("/v1/model")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["ready"], true);
    assert_eq!(body["positive_class"], 1);
    assert_eq!(body["feature_importances"][0]["feature"], "months_as_member");
}

#[tokio::test]
async fn test_healthz_reports_model_load() {
    let app = setup_ready_app(0.5).await;
    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let health = json_body(response).await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["components"].as_object().unwrap().len(), 1);
    assert_eq!(health["components"]["model"]["status"], "healthy");
}

#[tokio::test]
async fn test_healthz_reports_failed_model_load() {
    let state = ModelState::Unavailable {
        reason: "Failed to read model file".to_string(),
    };
    let (app, _state) = setup_app(state).await;
    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let health = json_body(response).await;
    assert_eq!(health["status"], "unhealthy");
    assert_eq!(health["components"]["model"]["message"], "Failed to read model file");
}

#[tokio::test]
async fn test_metrics_endpoint_after_prediction() {
    let app = setup_ready_app(0.9).await;
    let response = app
        .clone()
        .oneshot(post_json("/v1/predict", booking()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();
    assert!(metrics_text.contains("attendance_prediction_latency_seconds_bucket"));
    assert!(metrics_text.contains("attendance_predictions_total"));
}
