//! Search session: one user's typeahead, selection and request lifecycles
//!
//! A session is constructed per user (or per UI component) and passed by
//! reference to whatever needs it; nothing is shared between sessions.
//! `SearchSession` is a cheap handle: clones refer to the same session, so
//! a prediction can be awaited on one task while keystrokes keep arriving
//! on another. Locks are never held across a backend call.

use std::sync::Arc;
use std::time::{Duration, Instant};

use exo_common::config::TomlConfig;
use exo_common::events::{EventBus, SessionEvent};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::{Candidate, Catalog};
use crate::error::{LoadError, PreconditionError, SearchError, SearchResult};
use crate::lifecycle::RequestLifecycle;
use crate::lightcurve::{LightcurveArtifact, LightcurveOrchestrator, LightcurveOutcome};
use crate::notify::Notifier;
use crate::prediction::{PredictionOrchestrator, PredictionOutcome, PredictionResult};
use crate::selection::SelectionContext;
use crate::services::{BackendError, HttpBackend, PredictionBackend, ResultSink};
use crate::typeahead::{KeyEvent, LoadOutcome, TypeaheadController, TypeaheadView};

/// Everything a front end needs to render the session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub session_id: Uuid,
    pub typeahead: TypeaheadView,
    pub selection: SelectionContext,
    pub prediction: RequestLifecycle<PredictionResult>,
    pub lightcurve: RequestLifecycle<LightcurveArtifact>,
}

#[derive(Clone)]
pub struct SearchSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    notifier: Notifier,
    backend: Arc<dyn PredictionBackend>,
    typeahead: Mutex<TypeaheadController>,
    selection: RwLock<SelectionContext>,
    predictions: PredictionOrchestrator,
    lightcurves: LightcurveOrchestrator,
}

impl SearchSession {
    pub fn new(
        backend: Arc<dyn PredictionBackend>,
        sink: Option<Arc<dyn ResultSink>>,
        event_bus: EventBus,
        blur_grace: Duration,
    ) -> Self {
        let notifier = Notifier::new(event_bus, Uuid::new_v4());

        Self {
            inner: Arc::new(SessionInner {
                predictions: PredictionOrchestrator::new(
                    Arc::clone(&backend),
                    sink,
                    notifier.clone(),
                ),
                lightcurves: LightcurveOrchestrator::new(Arc::clone(&backend), notifier.clone()),
                typeahead: Mutex::new(TypeaheadController::new(blur_grace)),
                selection: RwLock::new(SelectionContext::new()),
                backend,
                notifier,
            }),
        }
    }

    /// Session against the HTTP backend, which also serves as result sink
    pub fn connect(backend_url: &str, config: &TomlConfig) -> Result<Self, BackendError> {
        let http = Arc::new(HttpBackend::new(
            backend_url,
            Duration::from_secs(config.request_timeout_secs),
        )?);

        Ok(Self::new(
            Arc::clone(&http) as Arc<dyn PredictionBackend>,
            Some(http as Arc<dyn ResultSink>),
            EventBus::new(config.event_capacity),
            Duration::from_millis(config.typeahead.blur_grace_ms),
        ))
    }

    pub fn id(&self) -> Uuid {
        self.inner.notifier.session_id()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.notifier.bus().subscribe()
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    /// Switch to `catalog` and load its candidate list
    ///
    /// The selection is cleared and both request lifecycles return to Idle
    /// immediately. If another switch starts before this load resolves, this
    /// load is dropped and `Ok(LoadOutcome::Superseded)` is returned.
    pub async fn switch_catalog(&self, catalog: Catalog) -> Result<LoadOutcome, LoadError> {
        let ticket = self.inner.typeahead.lock().await.begin_load(catalog);
        self.inner.selection.write().await.switch_catalog(catalog);
        self.inner.predictions.reset().await;
        self.inner.lightcurves.reset().await;

        let fetched = self
            .inner
            .backend
            .fetch_candidates(catalog)
            .await
            .map_err(|e| LoadError {
                catalog,
                reason: e.to_string(),
            });

        let applied = self.inner.typeahead.lock().await.finish_load(ticket, fetched);

        match &applied {
            Ok(LoadOutcome::Loaded { count }) => {
                info!(catalog = %catalog, count, "Candidate list loaded");
                self.inner.notifier.catalog_loaded(catalog, *count);
            }
            Ok(LoadOutcome::Superseded) => {}
            Err(e) => {
                warn!(catalog = %catalog, "{}", e);
                self.inner.notifier.catalog_load_failed(catalog, &e.to_string());
            }
        }
        applied
    }

    // ------------------------------------------------------------------
    // Typeahead
    // ------------------------------------------------------------------

    pub async fn focus(&self) {
        self.inner.typeahead.lock().await.focus();
    }

    pub async fn input(&self, text: &str) {
        self.inner.typeahead.lock().await.input(text);
    }

    pub async fn blur(&self, now: Instant) {
        self.inner.typeahead.lock().await.blur(now);
    }

    /// Apply an expired blur close; returns true if the dropdown closed
    pub async fn poll(&self, now: Instant) -> bool {
        self.inner.typeahead.lock().await.poll(now)
    }

    /// Key or wheel event; Enter may commit
    pub async fn key(&self, event: KeyEvent, now: Instant) -> SearchResult<Option<Candidate>> {
        let committed = {
            let mut typeahead = self.inner.typeahead.lock().await;
            typeahead
                .key(event, now)
                .map(|candidate| (typeahead.catalog(), candidate))
        };
        self.forward_commit(committed).await
    }

    /// Option click
    pub async fn select_option(
        &self,
        candidate: &Candidate,
        now: Instant,
    ) -> SearchResult<Option<Candidate>> {
        let committed = {
            let mut typeahead = self.inner.typeahead.lock().await;
            typeahead
                .select_option(candidate, now)
                .map(|candidate| (typeahead.catalog(), candidate))
        };
        self.forward_commit(committed).await
    }

    /// Commit the query if it names a candidate exactly
    pub async fn commit_exact(&self) -> SearchResult<Option<Candidate>> {
        let committed = {
            let mut typeahead = self.inner.typeahead.lock().await;
            typeahead
                .commit_exact()
                .map(|candidate| (typeahead.catalog(), candidate))
        };
        self.forward_commit(committed).await
    }

    /// Commit an explicit candidate name
    ///
    /// Empty names are rejected before any state changes. The name is not
    /// checked against the list; the backend rejects unknown candidates.
    pub async fn commit(&self, candidate: Candidate) -> SearchResult<Candidate> {
        if candidate.is_empty() {
            return Err(SearchError::EmptyCandidate);
        }
        let committed = {
            let mut typeahead = self.inner.typeahead.lock().await;
            let catalog = typeahead.catalog().ok_or(SearchError::NoCatalog)?;
            (Some(catalog), typeahead.commit(candidate))
        };
        self.forward_commit(Some(committed))
            .await?
            .ok_or(SearchError::NoCatalog)
    }

    pub async fn view(&self) -> TypeaheadView {
        self.inner.typeahead.lock().await.view()
    }

    async fn forward_commit(
        &self,
        committed: Option<(Option<Catalog>, Candidate)>,
    ) -> SearchResult<Option<Candidate>> {
        let Some((catalog, candidate)) = committed else {
            return Ok(None);
        };
        let catalog = catalog.ok_or(SearchError::NoCatalog)?;

        self.inner
            .selection
            .write()
            .await
            .set(catalog, candidate.clone())?;
        self.inner.lightcurves.retain_for(&candidate).await;

        info!(catalog = %catalog, candidate = %candidate, "Candidate committed");
        self.inner.notifier.candidate_committed(catalog, &candidate);
        Ok(Some(candidate))
    }

    // ------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------

    pub async fn selection(&self) -> SelectionContext {
        self.inner.selection.read().await.clone()
    }

    /// Predict for the committed candidate
    ///
    /// The ticket is issued while the selection is read-locked, so a catalog
    /// switch either clears the selection first or supersedes the ticket.
    pub async fn predict(&self) -> Result<PredictionOutcome, PreconditionError> {
        let pending = {
            let selection = self.inner.selection.read().await;
            if let Some(candidate) = selection.candidate() {
                self.inner.lightcurves.retain_for(candidate).await;
            }
            self.inner.predictions.issue(&selection).await?
        };
        Ok(self.inner.predictions.dispatch(pending).await)
    }

    /// Generate the lightcurve for the committed, already predicted candidate
    pub async fn generate_lightcurve(&self) -> Result<LightcurveOutcome, PreconditionError> {
        let selection = self.selection().await;
        let candidate = selection
            .candidate()
            .cloned()
            .ok_or(PreconditionError::InvalidSelection)?;

        let prediction = self.inner.predictions.current_result().await;
        self.inner
            .lightcurves
            .request_artifact(&candidate, prediction.as_ref())
            .await
    }

    pub async fn prediction(&self) -> RequestLifecycle<PredictionResult> {
        self.inner.predictions.lifecycle().await
    }

    pub async fn lightcurve(&self) -> RequestLifecycle<LightcurveArtifact> {
        self.inner.lightcurves.lifecycle().await
    }

    pub async fn status(&self) -> SessionStatus {
        SessionStatus {
            session_id: self.id(),
            typeahead: self.view().await,
            selection: self.selection().await,
            prediction: self.prediction().await,
            lightcurve: self.lightcurve().await,
        }
    }
}
