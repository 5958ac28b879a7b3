//! Session-scoped event emission
//!
//! Wraps the shared EventBus with the session id so every component of one
//! session tags its events the same way.

use exo_common::events::{EventBus, SessionEvent};
use exo_common::time;
use uuid::Uuid;

use crate::catalog::{Candidate, Catalog};
use crate::lightcurve::LightcurveArtifact;
use crate::prediction::PredictionResult;

#[derive(Clone)]
pub struct Notifier {
    bus: EventBus,
    session_id: Uuid,
}

impl Notifier {
    pub fn new(bus: EventBus, session_id: Uuid) -> Self {
        Self { bus, session_id }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn catalog_loaded(&self, catalog: Catalog, count: usize) {
        self.bus.emit_lossy(SessionEvent::CatalogLoaded {
            session_id: self.session_id,
            catalog: catalog.to_string(),
            count,
            timestamp: time::now(),
        });
    }

    pub fn catalog_load_failed(&self, catalog: Catalog, message: &str) {
        self.bus.emit_lossy(SessionEvent::CatalogLoadFailed {
            session_id: self.session_id,
            catalog: catalog.to_string(),
            message: message.to_string(),
            timestamp: time::now(),
        });
    }

    pub fn candidate_committed(&self, catalog: Catalog, candidate: &Candidate) {
        self.bus.emit_lossy(SessionEvent::CandidateCommitted {
            session_id: self.session_id,
            catalog: catalog.to_string(),
            candidate: candidate.to_string(),
            timestamp: time::now(),
        });
    }

    pub fn prediction_started(&self, candidate: &Candidate) {
        self.bus.emit_lossy(SessionEvent::PredictionStarted {
            session_id: self.session_id,
            candidate: candidate.to_string(),
            timestamp: time::now(),
        });
    }

    pub fn prediction_succeeded(&self, result: &PredictionResult) {
        self.bus.emit_lossy(SessionEvent::PredictionSucceeded {
            session_id: self.session_id,
            candidate: result.candidate.to_string(),
            confidence_percent: result.confidence_percent,
            is_exoplanet: result.is_exoplanet,
            timestamp: time::now(),
        });
    }

    pub fn prediction_failed(&self, candidate: &Candidate, message: &str) {
        self.bus.emit_lossy(SessionEvent::PredictionFailed {
            session_id: self.session_id,
            candidate: candidate.to_string(),
            message: message.to_string(),
            timestamp: time::now(),
        });
    }

    pub fn lightcurve_ready(&self, artifact: &LightcurveArtifact) {
        self.bus.emit_lossy(SessionEvent::LightcurveReady {
            session_id: self.session_id,
            candidate: artifact.candidate.to_string(),
            url: artifact.url.clone(),
            timestamp: time::now(),
        });
    }

    pub fn lightcurve_failed(&self, candidate: &Candidate, message: &str) {
        self.bus.emit_lossy(SessionEvent::LightcurveFailed {
            session_id: self.session_id,
            candidate: candidate.to_string(),
            message: message.to_string(),
            timestamp: time::now(),
        });
    }

    pub fn result_save_failed(&self, candidate: &Candidate, message: &str) {
        self.bus.emit_lossy(SessionEvent::ResultSaveFailed {
            session_id: self.session_id,
            candidate: candidate.to_string(),
            message: message.to_string(),
            timestamp: time::now(),
        });
    }
}
