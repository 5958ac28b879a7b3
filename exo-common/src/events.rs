//! Event types for the search session
//!
//! Provides the session event definitions and the EventBus that carries them
//! to whatever presents notifications (toasts, logs, SSE).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Session event types
///
/// Emitted by a search session whenever a user-visible state change happens.
/// Responses discarded as stale never produce an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// Candidate list for a catalog finished loading
    CatalogLoaded {
        session_id: Uuid,
        catalog: String,
        /// Number of candidates now available
        count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Candidate list fetch failed; the typeahead stays usable with an empty list
    CatalogLoadFailed {
        session_id: Uuid,
        catalog: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// User committed a candidate (option click, Enter, or exact text match)
    CandidateCommitted {
        session_id: Uuid,
        catalog: String,
        candidate: String,
        timestamp: DateTime<Utc>,
    },

    /// Prediction request dispatched
    PredictionStarted {
        session_id: Uuid,
        candidate: String,
        timestamp: DateTime<Utc>,
    },

    /// Prediction completed for the current selection
    PredictionSucceeded {
        session_id: Uuid,
        candidate: String,
        /// Percentage in [0, 100], two decimals
        confidence_percent: f64,
        is_exoplanet: bool,
        timestamp: DateTime<Utc>,
    },

    /// Prediction failed for the current selection
    PredictionFailed {
        session_id: Uuid,
        candidate: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Lightcurve image is available
    LightcurveReady {
        session_id: Uuid,
        candidate: String,
        url: String,
        timestamp: DateTime<Utc>,
    },

    /// Lightcurve generation failed
    LightcurveFailed {
        session_id: Uuid,
        candidate: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Persisting a prediction failed (the displayed result is unaffected)
    ResultSaveFailed {
        session_id: Uuid,
        candidate: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// Session that produced this event
    pub fn session_id(&self) -> Uuid {
        match self {
            SessionEvent::CatalogLoaded { session_id, .. }
            | SessionEvent::CatalogLoadFailed { session_id, .. }
            | SessionEvent::CandidateCommitted { session_id, .. }
            | SessionEvent::PredictionStarted { session_id, .. }
            | SessionEvent::PredictionSucceeded { session_id, .. }
            | SessionEvent::PredictionFailed { session_id, .. }
            | SessionEvent::LightcurveReady { session_id, .. }
            | SessionEvent::LightcurveFailed { session_id, .. }
            | SessionEvent::ResultSaveFailed { session_id, .. } => *session_id,
        }
    }

    /// Whether this event reports a failure the user should be told about
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            SessionEvent::CatalogLoadFailed { .. }
                | SessionEvent::PredictionFailed { .. }
                | SessionEvent::LightcurveFailed { .. }
                | SessionEvent::ResultSaveFailed { .. }
        )
    }
}

/// Broadcast channel for session events
///
/// Cloning an EventBus yields another handle to the same channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// `capacity` is the number of events buffered before slow receivers
    /// start missing the oldest ones. A capacity of 0 is raised to 1.
    ///
    /// # Examples
    ///
    /// ```
    /// use exo_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: SessionEvent,
    ) -> Result<usize, broadcast::error::SendError<SessionEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the channel capacity actually in use
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
