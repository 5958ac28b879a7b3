//! Prediction orchestration
//!
//! Turns the current selection into one prediction request, normalizes the
//! backend payload into a `PredictionResult` and tracks the request
//! lifecycle. Only the response to the most recently issued request is
//! applied; earlier responses (success or failure) are dropped silently.
//!
//! Successful results are handed to the result sink on a spawned task. A
//! failed save is logged and reported as an event; it never touches the
//! lifecycle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use exo_common::time;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::catalog::{Candidate, Catalog};
use crate::error::PreconditionError;
use crate::lifecycle::{RequestLifecycle, RequestSequence, RequestTicket};
use crate::notify::Notifier;
use crate::selection::SelectionContext;
use crate::services::{PredictionBackend, PredictionResponse, RawPrediction, ResultSink};

/// Classification placeholder when the service sends none
pub const UNKNOWN_CLASSIFICATION: &str = "UNKNOWN";

/// Canonical, immutable prediction result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub candidate: Candidate,
    pub catalog: Catalog,
    /// Percentage in [0, 100], rounded to two decimals
    pub confidence_percent: f64,
    pub is_exoplanet: bool,
    pub model_version: String,
    /// Archive disposition, or `UNKNOWN`
    pub external_classification: String,
    pub requested_at: DateTime<Utc>,
}

/// Fraction in [0, 1] → percentage with two decimals
pub fn confidence_percent(fraction: f64) -> f64 {
    (fraction * 10000.0).round() / 100.0
}

/// One adapter per prediction endpoint
///
/// Both endpoints share the payload shape but echo the candidate under
/// their own field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseAdapter {
    Kepler,
    Tess,
}

impl ResponseAdapter {
    pub fn for_catalog(catalog: Catalog) -> Self {
        match catalog {
            Catalog::Kepler => ResponseAdapter::Kepler,
            Catalog::Tess => ResponseAdapter::Tess,
        }
    }

    fn catalog(&self) -> Catalog {
        match self {
            ResponseAdapter::Kepler => Catalog::Kepler,
            ResponseAdapter::Tess => Catalog::Tess,
        }
    }

    fn echoed_name<'a>(&self, raw: &'a RawPrediction) -> Option<&'a str> {
        match self {
            ResponseAdapter::Kepler => raw.koi_name.as_deref(),
            ResponseAdapter::Tess => raw.toi_name.as_deref(),
        }
    }

    /// Validate and normalize a raw payload
    pub fn adapt(
        &self,
        candidate: &Candidate,
        requested_at: DateTime<Utc>,
        response: PredictionResponse,
    ) -> Result<PredictionResult, String> {
        let raw = response
            .prediction
            .ok_or_else(|| "Invalid response from prediction API".to_string())?;

        if !raw.confidence.is_finite() || !(0.0..=1.0).contains(&raw.confidence) {
            return Err(format!("confidence {} outside [0, 1]", raw.confidence));
        }

        if let Some(echoed) = self.echoed_name(&raw) {
            if echoed != candidate.as_str() {
                return Err(format!(
                    "response names {} but {} was requested",
                    echoed, candidate
                ));
            }
        }

        let external_classification = response
            .nasa_classification
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_CLASSIFICATION.to_string());

        Ok(PredictionResult {
            candidate: candidate.clone(),
            catalog: self.catalog(),
            confidence_percent: confidence_percent(raw.confidence),
            is_exoplanet: raw.is_exoplanet,
            model_version: raw.model_version,
            external_classification,
            requested_at,
        })
    }
}

/// What a dispatched prediction ended with
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionOutcome {
    Succeeded(PredictionResult),
    /// Human-readable reason
    Failed(String),
    /// A newer request was issued before this one resolved
    Superseded,
}

/// Request that holds a ticket but has not been sent yet
#[derive(Debug)]
pub struct PendingPrediction {
    catalog: Catalog,
    candidate: Candidate,
    requested_at: DateTime<Utc>,
    ticket: RequestTicket,
}

#[derive(Debug, Default)]
struct PredictionState {
    sequence: RequestSequence,
    lifecycle: RequestLifecycle<PredictionResult>,
}

pub struct PredictionOrchestrator {
    backend: Arc<dyn PredictionBackend>,
    sink: Option<Arc<dyn ResultSink>>,
    notifier: Notifier,
    state: Mutex<PredictionState>,
}

impl PredictionOrchestrator {
    pub fn new(
        backend: Arc<dyn PredictionBackend>,
        sink: Option<Arc<dyn ResultSink>>,
        notifier: Notifier,
    ) -> Self {
        Self {
            backend,
            sink,
            notifier,
            state: Mutex::new(PredictionState::default()),
        }
    }

    pub async fn lifecycle(&self) -> RequestLifecycle<PredictionResult> {
        self.state.lock().await.lifecycle.clone()
    }

    /// Result currently displayed, if the last request succeeded
    pub async fn current_result(&self) -> Option<PredictionResult> {
        self.state.lock().await.lifecycle.succeeded().cloned()
    }

    /// Back to Idle; any in-flight response becomes stale
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.sequence.invalidate();
        state.lifecycle = RequestLifecycle::Idle;
    }

    /// Issue a ticket for the selected candidate
    ///
    /// Fails with `InvalidSelection` before any network activity when no
    /// candidate is committed. From here on the lifecycle is Loading and
    /// any earlier request is stale.
    pub async fn issue(
        &self,
        selection: &SelectionContext,
    ) -> Result<PendingPrediction, PreconditionError> {
        let (catalog, candidate) = match selection.resolved() {
            Some((catalog, candidate)) if !candidate.is_empty() => (catalog, candidate.clone()),
            _ => return Err(PreconditionError::InvalidSelection),
        };

        let mut state = self.state.lock().await;
        state.lifecycle = RequestLifecycle::Loading;
        Ok(PendingPrediction {
            catalog,
            candidate,
            requested_at: time::now(),
            ticket: state.sequence.issue(),
        })
    }

    /// Send an issued request and apply the response if it is still current
    ///
    /// Transport and payload problems come back as `PredictionOutcome::Failed`.
    pub async fn dispatch(&self, pending: PendingPrediction) -> PredictionOutcome {
        let PendingPrediction {
            catalog,
            candidate,
            requested_at,
            ticket,
        } = pending;

        debug!(catalog = %catalog, candidate = %candidate, seq = ticket.seq(), "Dispatching prediction");
        self.notifier.prediction_started(&candidate);

        let outcome = match self.backend.predict(catalog, &candidate).await {
            Ok(response) => {
                ResponseAdapter::for_catalog(catalog).adapt(&candidate, requested_at, response)
            }
            Err(e) => Err(e.to_string()),
        }
        .map_err(|reason| format!("Prediction failed: {}", reason));

        let mut state = self.state.lock().await;
        if !state.sequence.is_current(ticket) {
            debug!(candidate = %candidate, seq = ticket.seq(), "Dropping stale prediction response");
            return PredictionOutcome::Superseded;
        }

        match outcome {
            Ok(result) => {
                state.lifecycle = RequestLifecycle::Succeeded(result.clone());
                drop(state);

                info!(
                    candidate = %candidate,
                    confidence = result.confidence_percent,
                    is_exoplanet = result.is_exoplanet,
                    "Prediction complete"
                );
                self.notifier.prediction_succeeded(&result);
                self.persist(result.clone());
                PredictionOutcome::Succeeded(result)
            }
            Err(reason) => {
                state.lifecycle = RequestLifecycle::Failed(reason.clone());
                drop(state);

                warn!(candidate = %candidate, "{}", reason);
                self.notifier.prediction_failed(&candidate, &reason);
                PredictionOutcome::Failed(reason)
            }
        }
    }

    /// Fire-and-forget save
    fn persist(&self, result: PredictionResult) {
        let Some(sink) = self.sink.as_ref().map(Arc::clone) else {
            return;
        };
        let notifier = self.notifier.clone();

        tokio::spawn(async move {
            if let Err(e) = sink.save_prediction(&result).await {
                warn!(candidate = %result.candidate, error = %e, "Failed to save prediction");
                notifier.result_save_failed(&result.candidate, &e.to_string());
            }
        });
    }
}
