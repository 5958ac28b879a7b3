//! Error types for exo-search
//!
//! Transport failures never show up here: the orchestrators fold them into
//! `RequestLifecycle::Failed`. These types cover input errors, contract
//! (precondition) violations and candidate-list load failures.

use thiserror::Error;

use crate::catalog::Catalog;

/// Input errors
#[derive(Debug, Error)]
pub enum SearchError {
    /// Catalog name not served by the backend
    #[error("Unknown catalog: {0}")]
    UnknownCatalog(String),

    /// Commit attempted with an empty candidate id
    #[error("Candidate id must not be empty")]
    EmptyCandidate,

    /// Commit attempted before any catalog was chosen
    #[error("No catalog selected")]
    NoCatalog,
}

/// Orchestrator preconditions; reported before any network activity
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    /// Prediction requested without a committed candidate
    #[error("No candidate selected")]
    InvalidSelection,

    /// Lightcurve requested before a prediction exists for the candidate
    #[error("No prediction available for {0}")]
    NoPrediction(String),
}

/// Candidate-list fetch failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to load {catalog} candidates: {reason}")]
pub struct LoadError {
    pub catalog: Catalog,
    pub reason: String,
}

/// Result type for session operations
pub type SearchResult<T> = Result<T, SearchError>;
