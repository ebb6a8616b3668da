//! Health and readiness for the prediction service
//!
//! The model is loaded once at startup. A failed load keeps the process live
//! so it can report why, but the service never becomes ready.

use crate::predictor::ModelState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Unhealthy,
}

/// Outcome of the model load, as reported on `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn from_state(state: &ModelState) -> Self {
        let (status, message) = match state {
            ModelState::Ready(_) => (ComponentStatus::Healthy, None),
            ModelState::Unavailable { reason } => {
                (ComponentStatus::Unhealthy, Some(reason.clone()))
            }
        };
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub mod components {
    pub const MODEL: &str = "model";
}

/// Shared view of the model load and startup progress
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    model: Arc<RwLock<Option<ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_model_state(&self, state: &ModelState) {
        *self.model.write().await = Some(ComponentHealth::from_state(state));
    }

    /// Mark startup as finished; readiness still requires a loaded model
    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let mut status = ComponentStatus::Healthy;
        let mut loaded = HashMap::new();
        if let Some(model) = self.model.read().await.clone() {
            status = model.status;
            loaded.insert(components::MODEL.to_string(), model);
        }
        HealthResponse {
            status,
            components: loaded,
        }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let not_ready = |reason: String| ReadinessResponse {
            ready: false,
            reason: Some(reason),
        };

        if !*self.ready.read().await {
            return not_ready("Service not yet initialized".to_string());
        }

        match self.model.read().await.as_ref() {
            None => not_ready("Model not loaded".to_string()),
            Some(model) if model.status == ComponentStatus::Unhealthy => {
                let detail = model.message.as_deref().unwrap_or("unknown error");
                not_ready(format!("Model unavailable: {}", detail))
            }
            Some(_) => ReadinessResponse {
                ready: true,
                reason: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeatureVector;
    use crate::predictor::AttendanceModel;

    struct StubModel;

    impl AttendanceModel for StubModel {
        fn predict(&self, _features: &FeatureVector) -> anyhow::Result<i64> {
            Ok(1)
        }

        fn predict_proba(&self, _features: &FeatureVector) -> anyhow::Result<Vec<f32>> {
            Ok(vec![0.4, 0.6])
        }

        fn version(&self) -> &str {
            "stub"
        }
    }

    fn loaded() -> ModelState {
        ModelState::Ready(Arc::new(StubModel))
    }

    #[tokio::test]
    async fn test_health_registry_initial_state() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());
    }

    #[tokio::test]
    async fn test_readiness_not_ready_initially() {
        let registry = HealthRegistry::new();
        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());
    }

    #[tokio::test]
    async fn test_ready_flag_without_model_is_not_ready() {
        let registry = HealthRegistry::new();
        registry.set_ready(true).await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Model not loaded"));
    }

    #[tokio::test]
    async fn test_ready_with_loaded_model() {
        let registry = HealthRegistry::new();
        registry.record_model_state(&loaded()).await;
        registry.set_ready(true).await;

        assert!(registry.readiness().await.ready);
        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Healthy);
        assert_eq!(health.components.len(), 1);
        assert!(health.components[components::MODEL].message.is_none());
    }

    #[tokio::test]
    async fn test_unavailable_model_blocks_readiness() {
        let registry = HealthRegistry::new();
        let state = ModelState::Unavailable {
            reason: "Failed to read model file".to_string(),
        };
        registry.record_model_state(&state).await;
        registry.set_ready(true).await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert!(readiness.reason.unwrap().contains("Failed to read model file"));
        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);
    }
}
