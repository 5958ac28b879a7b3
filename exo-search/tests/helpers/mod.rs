//! Test Helper Utilities
//!
//! In-process backend and sink fakes. Every backend call is recorded; calls
//! are either answered immediately by a responder function or parked until
//! the test resolves them, so tests control completion order.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use exo_common::events::{EventBus, SessionEvent};
use exo_search::services::{
    BackendError, LightcurveResponse, PredictionBackend, PredictionResponse, RawPrediction,
    ResultSink,
};
use exo_search::{Candidate, Catalog, PredictionResult, SearchSession};
use tokio::sync::{broadcast, mpsc, oneshot};

type Reply<T> = Result<T, BackendError>;
type Responder<T> = Box<dyn Fn(&str) -> Reply<T> + Send + Sync>;

/// One backend operation: recorded calls plus auto or gated replies
pub struct Endpoint<T> {
    responder: Mutex<Option<Responder<T>>>,
    parked: Mutex<Vec<(String, oneshot::Sender<Reply<T>>)>>,
    calls: Mutex<Vec<String>>,
}

impl<T> Endpoint<T> {
    fn gated() -> Self {
        Self {
            responder: Mutex::new(None),
            parked: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer every future call immediately
    pub fn respond_with(&self, f: impl Fn(&str) -> Reply<T> + Send + Sync + 'static) {
        *self.responder.lock().unwrap() = Some(Box::new(f));
    }

    /// Park every future call until `resolve`
    pub fn gate(&self) {
        *self.responder.lock().unwrap() = None;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn parked(&self) -> usize {
        self.parked.lock().unwrap().len()
    }

    /// Wait until `n` calls are parked
    pub async fn wait_parked(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.parked() < n {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("expected {} parked calls, have {}", n, self.parked()));
    }

    /// Complete the oldest parked call for `key`
    pub fn resolve(&self, key: &str, reply: Reply<T>) {
        let mut parked = self.parked.lock().unwrap();
        let pos = parked
            .iter()
            .position(|(k, _)| k == key)
            .unwrap_or_else(|| panic!("no parked call for {}", key));
        let (_, tx) = parked.remove(pos);
        let _ = tx.send(reply);
    }

    async fn call(&self, key: &str) -> Reply<T> {
        self.calls.lock().unwrap().push(key.to_string());

        let immediate = self.responder.lock().unwrap().as_ref().map(|f| f(key));
        if let Some(reply) = immediate {
            return reply;
        }

        let (tx, rx) = oneshot::channel();
        self.parked.lock().unwrap().push((key.to_string(), tx));
        rx.await
            .unwrap_or_else(|_| Err(BackendError::NetworkError("fake dropped".to_string())))
    }
}

/// Fake prediction service; all endpoints start gated
pub struct FakeBackend {
    pub candidates: Endpoint<Vec<Candidate>>,
    pub predictions: Endpoint<PredictionResponse>,
    pub lightcurves: Endpoint<LightcurveResponse>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            candidates: Endpoint::gated(),
            predictions: Endpoint::gated(),
            lightcurves: Endpoint::gated(),
        })
    }

    /// Candidate lists answered immediately
    pub fn with_catalogs(kepler: &[&str], tess: &[&str]) -> Arc<Self> {
        let backend = Self::new();
        let kepler = names(kepler);
        let tess = names(tess);
        backend.candidates.respond_with(move |catalog| match catalog {
            "kepler" => Ok(kepler.clone()),
            _ => Ok(tess.clone()),
        });
        backend
    }

    /// Total network calls issued
    pub fn call_count(&self) -> usize {
        self.candidates.calls().len() + self.predictions.calls().len() + self.lightcurves.calls().len()
    }
}

#[async_trait]
impl PredictionBackend for FakeBackend {
    async fn fetch_candidates(&self, catalog: Catalog) -> Result<Vec<Candidate>, BackendError> {
        self.candidates.call(catalog.as_str()).await
    }

    async fn predict(
        &self,
        _catalog: Catalog,
        candidate: &Candidate,
    ) -> Result<PredictionResponse, BackendError> {
        self.predictions.call(candidate.as_str()).await
    }

    async fn generate_lightcurve(
        &self,
        candidate: &Candidate,
    ) -> Result<LightcurveResponse, BackendError> {
        self.lightcurves.call(candidate.as_str()).await
    }
}

/// Sink that forwards saved results to the test, or fails every save
pub struct FakeSink {
    saved: mpsc::UnboundedSender<PredictionResult>,
    fail: bool,
}

impl FakeSink {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<PredictionResult>) {
        let (saved, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { saved, fail: false }), rx)
    }

    pub fn failing() -> Arc<Self> {
        let (saved, _) = mpsc::unbounded_channel();
        Arc::new(Self { saved, fail: true })
    }
}

#[async_trait]
impl ResultSink for FakeSink {
    async fn save_prediction(&self, result: &PredictionResult) -> Result<(), BackendError> {
        if self.fail {
            return Err(BackendError::ApiError(500, "database unavailable".to_string()));
        }
        let _ = self.saved.send(result.clone());
        Ok(())
    }
}

pub fn names(list: &[&str]) -> Vec<Candidate> {
    list.iter().map(|n| Candidate::from(*n)).collect()
}

pub fn session(backend: &Arc<FakeBackend>, sink: Option<Arc<dyn ResultSink>>) -> SearchSession {
    SearchSession::new(
        Arc::clone(backend) as Arc<dyn PredictionBackend>,
        sink,
        EventBus::new(100),
        Duration::from_millis(200),
    )
}

pub fn prediction(confidence: f64, is_exoplanet: bool) -> PredictionResponse {
    PredictionResponse {
        prediction: Some(RawPrediction {
            confidence,
            is_exoplanet,
            model_version: "v1.0".to_string(),
            koi_name: None,
            toi_name: None,
        }),
        nasa_classification: Some("CANDIDATE".to_string()),
        message: None,
    }
}

pub fn lightcurve(candidate: &str) -> LightcurveResponse {
    LightcurveResponse {
        success: true,
        url: Some(format!("http://fake/api/lightcurve/{}.png", candidate)),
        filename: Some(format!("{}.png", candidate)),
        title: None,
        error: None,
    }
}

/// Everything emitted so far
pub fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

/// Wait for the next event matching `pred`
pub async fn next_matching(
    events: &mut broadcast::Receiver<SessionEvent>,
    pred: impl Fn(&SessionEvent) -> bool,
) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.unwrap();
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}
