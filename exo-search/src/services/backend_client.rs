//! Prediction service HTTP client
//!
//! Endpoints:
//! - `GET  /api/autocomplete/<catalog>` → `{ suggestions: [string] }`
//! - `POST /api/predict/<catalog>` with `{ <koi_name|toi_name>: string }`
//! - `POST /api/lightcurve/generate` with `{ koi_name: string }`
//! - `POST /api/predictions/save` with the normalized result
//!
//! Non-2xx responses carry `{ error: string }`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use super::{PredictionBackend, ResultSink};
use crate::catalog::{Candidate, Catalog};
use crate::prediction::PredictionResult;

const USER_AGENT: &str = concat!("exo-search/", env!("CARGO_PKG_VERSION"));
const LIGHTCURVE_PATH: &str = "/api/lightcurve/generate";
const SAVE_PATH: &str = "/api/predictions/save";

/// Backend client errors
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid backend URL {0}: {1}")]
    InvalidUrl(String, String),
}

/// Candidate list response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SuggestionsResponse {
    #[serde(default)]
    pub suggestions: Vec<String>,
    /// Catalog echoed back by the service
    pub dataset: Option<String>,
    pub total_count: Option<usize>,
}

/// Prediction response, shared by both catalog endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PredictionResponse {
    pub prediction: Option<RawPrediction>,
    pub nasa_classification: Option<String>,
    pub message: Option<String>,
}

/// Raw model output; `confidence` is a fraction in [0, 1]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawPrediction {
    pub confidence: f64,
    pub is_exoplanet: bool,
    pub model_version: String,
    /// Echo from the Kepler endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub koi_name: Option<String>,
    /// Echo from the TESS endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toi_name: Option<String>,
}

/// Lightcurve generation response
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LightcurveResponse {
    #[serde(default)]
    pub success: bool,
    pub url: Option<String>,
    pub filename: Option<String>,
    pub title: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Save payload understood by `/api/predictions/save`
#[derive(Debug, Serialize)]
struct SavePredictionRequest<'a> {
    exoplanet_id: &'a str,
    dataset: &'a str,
    prediction: SavedPrediction<'a>,
    nasa_classification: &'a str,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct SavedPrediction<'a> {
    confidence: f64,
    is_exoplanet: bool,
    model_version: &'a str,
}

/// HTTP implementation of the backend and the result sink
pub struct HttpBackend {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let base_url = base_url.trim_end_matches('/');
        let parsed = reqwest::Url::parse(base_url)
            .map_err(|e| BackendError::InvalidUrl(base_url.to_string(), e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(BackendError::InvalidUrl(
                base_url.to_string(),
                format!("unsupported scheme {}", parsed.scheme()),
            ));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Absolute URL for a path the service hands back
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            self.endpoint(url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }

    /// Send a request and decode the JSON body, mapping non-2xx to `ApiError`
    async fn send_json<T>(&self, request: reqwest::RequestBuilder) -> Result<T, BackendError>
    where
        T: for<'de> Deserialize<'de>,
    {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| BackendError::ParseError(e.to_string()))
    }

    /// Send a request; any non-2xx status becomes `ApiError`
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, BackendError> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::ApiError(status.as_u16(), error_message(status, &body)));
        }
        Ok(response)
    }
}

/// `{ "error": ... }` if present, else the raw body, else the status reason
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.error;
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("Request failed")
        .to_string()
}

#[async_trait]
impl PredictionBackend for HttpBackend {
    async fn fetch_candidates(&self, catalog: Catalog) -> Result<Vec<Candidate>, BackendError> {
        let url = self.endpoint(&catalog.candidates_path());
        tracing::debug!(catalog = %catalog, url = %url, "Fetching candidate list");

        let body: SuggestionsResponse = self.send_json(self.http_client.get(&url)).await?;

        tracing::info!(
            catalog = %catalog,
            count = body.suggestions.len(),
            "Retrieved candidate list"
        );

        Ok(body
            .suggestions
            .into_iter()
            .map(Candidate::from)
            .filter(|c| !c.is_empty())
            .collect())
    }

    async fn predict(
        &self,
        catalog: Catalog,
        candidate: &Candidate,
    ) -> Result<PredictionResponse, BackendError> {
        let url = self.endpoint(&catalog.prediction_path());
        let mut body = serde_json::Map::new();
        body.insert(catalog.candidate_field().to_string(), json!(candidate.as_str()));

        tracing::debug!(catalog = %catalog, candidate = %candidate, "Requesting prediction");

        self.send_json(self.http_client.post(&url).json(&body)).await
    }

    async fn generate_lightcurve(
        &self,
        candidate: &Candidate,
    ) -> Result<LightcurveResponse, BackendError> {
        let url = self.endpoint(LIGHTCURVE_PATH);
        tracing::debug!(candidate = %candidate, "Requesting lightcurve");

        let mut response: LightcurveResponse = self
            .send_json(self.http_client.post(&url).json(&json!({ "koi_name": candidate.as_str() })))
            .await?;

        response.url = response.url.map(|u| self.resolve_url(&u));
        Ok(response)
    }
}

#[async_trait]
impl ResultSink for HttpBackend {
    async fn save_prediction(&self, result: &PredictionResult) -> Result<(), BackendError> {
        let payload = SavePredictionRequest {
            exoplanet_id: result.candidate.as_str(),
            dataset: result.catalog.as_str(),
            prediction: SavedPrediction {
                confidence: result.confidence_percent,
                is_exoplanet: result.is_exoplanet,
                model_version: &result.model_version,
            },
            nasa_classification: &result.external_classification,
            timestamp: result.requested_at.to_rfc3339(),
        };

        self.send(self.http_client.post(self.endpoint(SAVE_PATH)).json(&payload))
            .await?;

        tracing::debug!(candidate = %result.candidate, "Prediction saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HttpBackend {
        HttpBackend::new("http://localhost:5000/", Duration::from_secs(30)).unwrap()
    }

    #[test]
    fn test_client_creation_strips_trailing_slash() {
        assert_eq!(client().base_url(), "http://localhost:5000");
    }

    #[test]
    fn test_client_rejects_invalid_base_url() {
        assert!(matches!(
            HttpBackend::new("not a url", Duration::from_secs(1)),
            Err(BackendError::InvalidUrl(..))
        ));
        assert!(matches!(
            HttpBackend::new("ftp://example.com", Duration::from_secs(1)),
            Err(BackendError::InvalidUrl(..))
        ));
    }

    #[test]
    fn test_resolve_url() {
        let backend = client();
        assert_eq!(
            backend.resolve_url("/api/lightcurve/K00752_01.png"),
            "http://localhost:5000/api/lightcurve/K00752_01.png"
        );
        assert_eq!(
            backend.resolve_url("files/a.png"),
            "http://localhost:5000/files/a.png"
        );
        assert_eq!(backend.resolve_url("https://cdn.example/a.png"), "https://cdn.example/a.png");
    }

    #[test]
    fn test_error_message_prefers_error_field() {
        let status = reqwest::StatusCode::NOT_FOUND;
        assert_eq!(
            error_message(status, r#"{"error": "KOI name X not found in dataset"}"#),
            "KOI name X not found in dataset"
        );
        assert_eq!(error_message(status, "plain text"), "plain text");
        assert_eq!(error_message(status, ""), "Not Found");
    }

    #[test]
    fn test_prediction_response_parses_tess_echo() {
        let body = r#"{
            "message": "TESS prediction completed",
            "prediction": {
                "is_exoplanet": true,
                "confidence": 0.87,
                "toi_name": "1000.01",
                "model_version": "v2.1"
            }
        }"#;
        let parsed: PredictionResponse = serde_json::from_str(body).unwrap();
        let raw = parsed.prediction.unwrap();
        assert_eq!(raw.toi_name.as_deref(), Some("1000.01"));
        assert!(raw.koi_name.is_none());
        assert!(parsed.nasa_classification.is_none());
    }
}
