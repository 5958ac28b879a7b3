//! Lightcurve generation for a predicted candidate
//!
//! A secondary, user-initiated request with its own lifecycle. It requires
//! an existing prediction for the same candidate, and is reset to Idle as
//! soon as the session moves on to another candidate.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::catalog::Candidate;
use crate::error::PreconditionError;
use crate::lifecycle::{RequestLifecycle, RequestSequence};
use crate::notify::Notifier;
use crate::prediction::PredictionResult;
use crate::services::{LightcurveResponse, PredictionBackend};

/// Retrievable lightcurve image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LightcurveArtifact {
    pub candidate: Candidate,
    /// Absolute URL of the image
    pub url: String,
    pub filename: String,
    pub title: String,
}

impl LightcurveArtifact {
    fn from_response(candidate: &Candidate, response: LightcurveResponse) -> Result<Self, String> {
        if !response.success {
            return Err(response
                .error
                .unwrap_or_else(|| "service reported failure".to_string()));
        }

        let url = response
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| "response has no url".to_string())?;

        let filename = response.filename.unwrap_or_else(|| {
            url.rsplit('/').next().unwrap_or_default().to_string()
        });

        Ok(Self {
            candidate: candidate.clone(),
            title: response
                .title
                .unwrap_or_else(|| format!("Lightcurve for {}", candidate)),
            url,
            filename,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LightcurveOutcome {
    Succeeded(LightcurveArtifact),
    Failed(String),
    Superseded,
}

#[derive(Debug, Default)]
struct LightcurveState {
    sequence: RequestSequence,
    lifecycle: RequestLifecycle<LightcurveArtifact>,
    /// Candidate the lifecycle belongs to
    candidate: Option<Candidate>,
}

pub struct LightcurveOrchestrator {
    backend: Arc<dyn PredictionBackend>,
    notifier: Notifier,
    state: Mutex<LightcurveState>,
}

impl LightcurveOrchestrator {
    pub fn new(backend: Arc<dyn PredictionBackend>, notifier: Notifier) -> Self {
        Self {
            backend,
            notifier,
            state: Mutex::new(LightcurveState::default()),
        }
    }

    pub async fn lifecycle(&self) -> RequestLifecycle<LightcurveArtifact> {
        self.state.lock().await.lifecycle.clone()
    }

    pub async fn candidate(&self) -> Option<Candidate> {
        self.state.lock().await.candidate.clone()
    }

    /// Back to Idle; any in-flight response becomes stale
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.sequence.invalidate();
        state.lifecycle = RequestLifecycle::Idle;
        state.candidate = None;
    }

    /// Reset unless the lifecycle already belongs to `candidate`
    pub async fn retain_for(&self, candidate: &Candidate) {
        let mut state = self.state.lock().await;
        if state.candidate.as_ref() != Some(candidate) {
            state.sequence.invalidate();
            state.lifecycle = RequestLifecycle::Idle;
            state.candidate = None;
        }
    }

    /// Generate the lightcurve for `candidate`
    ///
    /// `prediction` is the currently displayed prediction; it must belong to
    /// the same candidate, otherwise `NoPrediction` is returned and nothing
    /// is sent.
    pub async fn request_artifact(
        &self,
        candidate: &Candidate,
        prediction: Option<&PredictionResult>,
    ) -> Result<LightcurveOutcome, PreconditionError> {
        if prediction.map_or(true, |p| p.candidate != *candidate) {
            return Err(PreconditionError::NoPrediction(candidate.to_string()));
        }

        let ticket = {
            let mut state = self.state.lock().await;
            state.lifecycle = RequestLifecycle::Loading;
            state.candidate = Some(candidate.clone());
            state.sequence.issue()
        };

        debug!(candidate = %candidate, seq = ticket.seq(), "Dispatching lightcurve request");

        let outcome = match self.backend.generate_lightcurve(candidate).await {
            Ok(response) => LightcurveArtifact::from_response(candidate, response),
            Err(e) => Err(e.to_string()),
        }
        .map_err(|reason| format!("Lightcurve generation failed: {}", reason));

        let mut state = self.state.lock().await;
        if !state.sequence.is_current(ticket) {
            debug!(candidate = %candidate, seq = ticket.seq(), "Dropping stale lightcurve response");
            return Ok(LightcurveOutcome::Superseded);
        }

        match outcome {
            Ok(artifact) => {
                state.lifecycle = RequestLifecycle::Succeeded(artifact.clone());
                drop(state);
                info!(candidate = %candidate, url = %artifact.url, "Lightcurve ready");
                self.notifier.lightcurve_ready(&artifact);
                Ok(LightcurveOutcome::Succeeded(artifact))
            }
            Err(reason) => {
                state.lifecycle = RequestLifecycle::Failed(reason.clone());
                drop(state);
                warn!(candidate = %candidate, "{}", reason);
                self.notifier.lightcurve_failed(candidate, &reason);
                Ok(LightcurveOutcome::Failed(reason))
            }
        }
    }
}
