//! API client for communicating with the attendance server

use anyhow::{Context, Result};
use predictor_lib::predictor::PredictionView;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Error reported by the server in its JSON error body
#[derive(Debug, Error)]
#[error("server rejected request ({status}, {kind}): {message}")]
pub struct ApiError {
    pub status: u16,
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    message: String,
}

/// API client for the attendance server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<ErrorBody>(&text) {
                Ok(body) => ApiError {
                    status: status.as_u16(),
                    kind: body.error,
                    message: body.message,
                }
                .into(),
                Err(_) => anyhow::anyhow!("API error ({}): {}", status, text),
            });
        }

        response.json().await.context("Failed to parse response")
    }
}

/// A prediction and the model version that produced it.
///
/// Same shape as the `POST /v1/predict` response body, so local and remote
/// JSON output are interchangeable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionReport {
    #[serde(flatten)]
    pub prediction: PredictionView,
    pub model_version: String,
    pub generated_at: i64,
}

impl PredictionReport {
    /// Stamp a locally computed prediction with the current time
    pub fn new(prediction: PredictionView, model_version: impl Into<String>) -> Self {
        Self {
            prediction,
            model_version: model_version.into(),
            generated_at: chrono::Utc::now().timestamp(),
        }
    }
}
