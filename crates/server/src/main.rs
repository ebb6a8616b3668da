//! Attendance Server - fitness class attendance prediction service
//!
//! Loads the trained classifier once at startup and serves predictions,
//! health checks and Prometheus metrics over HTTP.

use anyhow::Result;
use attendance_server::{api, config::ServerConfig};
use predictor_lib::{
    health::HealthRegistry,
    observability::{PredictorMetrics, StructuredLogger},
    predictor::{AttendancePredictor, ModelState, OnnxModel, OutputConfig, OutputFormatter},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting attendance-server");

    let config = ServerConfig::load()?;
    info!(node_name = %config.node_name, model_path = ?config.model_path, "Server configured");

    let logger = StructuredLogger::new(&config.node_name);
    let metrics = PredictorMetrics::new();

    // The model is loaded exactly once; a failure is reported here and every
    // prediction request is refused until the process is redeployed.
    let model_path = config.model_path.display().to_string();
    let model_state = ModelState::from_load(OnnxModel::load(&config.model_config()));
    match &model_state {
        ModelState::Ready(model) => logger.log_model_loaded(model.version(), &model_path),
        ModelState::Unavailable { reason } => logger.log_model_unavailable(&model_path, reason),
    }
    metrics.set_model_version(model_state.model().map(|m| m.version()));

    let health_registry = HealthRegistry::new();
    health_registry.record_model_state(&model_state).await;

    let predictor = AttendancePredictor::new(model_state);
    logger.log_startup(SERVICE_VERSION, predictor.model_version());

    let formatter = OutputFormatter::with_config(OutputConfig {
        confidence_threshold: config.confidence_threshold,
    });
    let app_state = Arc::new(api::AppState::new(
        predictor,
        formatter,
        health_registry.clone(),
        metrics,
        logger.clone(),
    ));

    health_registry.set_ready(true).await;

    tokio::select! {
        result = api::serve(config.api_port, app_state) => result?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
