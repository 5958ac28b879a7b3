//! exo-search library
//!
//! Candidate typeahead plus prediction and lightcurve request orchestration
//! for the exoplanet prediction service.
//!
//! **Staleness:** every asynchronous request (catalog load, prediction,
//! lightcurve) is tagged with a sequence number. A response is applied only
//! if it belongs to the most recently issued request of its kind; anything
//! older is dropped without a notification.

pub mod catalog;
pub mod error;
pub mod index;
pub mod lifecycle;
pub mod lightcurve;
pub mod notify;
pub mod prediction;
pub mod selection;
pub mod services;
pub mod session;
pub mod typeahead;

pub use catalog::{Candidate, Catalog};
pub use error::{LoadError, PreconditionError, SearchError, SearchResult};
pub use lifecycle::RequestLifecycle;
pub use lightcurve::{LightcurveArtifact, LightcurveOutcome};
pub use prediction::{PredictionOutcome, PredictionResult};
pub use session::{SearchSession, SessionStatus};
pub use typeahead::{KeyEvent, LoadOutcome, TypeaheadView, WINDOW_SIZE};
