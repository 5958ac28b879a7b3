//! Remote collaborators: the prediction backend and the result sink
//!
//! The orchestrators only see these traits. `HttpBackend` implements both
//! against the prediction service; tests substitute in-process fakes.

pub mod backend_client;

use async_trait::async_trait;

use crate::catalog::{Candidate, Catalog};
use crate::prediction::PredictionResult;

pub use backend_client::{
    BackendError, HttpBackend, LightcurveResponse, PredictionResponse, RawPrediction,
};

/// Transport for candidate lists, predictions and lightcurves
///
/// Implementations own timeouts; a call that never resolves leaves the
/// caller's lifecycle in Loading.
#[async_trait]
pub trait PredictionBackend: Send + Sync {
    /// `GET /api/autocomplete/<catalog>`
    async fn fetch_candidates(&self, catalog: Catalog) -> Result<Vec<Candidate>, BackendError>;

    /// `POST /api/predict/<catalog>`
    async fn predict(
        &self,
        catalog: Catalog,
        candidate: &Candidate,
    ) -> Result<PredictionResponse, BackendError>;

    /// `POST /api/lightcurve/generate`; the returned `url` is absolute
    async fn generate_lightcurve(
        &self,
        candidate: &Candidate,
    ) -> Result<LightcurveResponse, BackendError>;
}

/// External persistence for successful predictions
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn save_prediction(&self, result: &PredictionResult) -> Result<(), BackendError>;
}
