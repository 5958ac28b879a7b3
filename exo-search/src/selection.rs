//! Current catalog + candidate binding consumed by downstream requests
//!
//! Existence of the candidate is not checked here; the prediction backend
//! answers 404 for unknown names.

use serde::Serialize;

use crate::catalog::{Candidate, Catalog};
use crate::error::{SearchError, SearchResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionContext {
    catalog: Option<Catalog>,
    candidate: Option<Candidate>,
}

impl SelectionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn catalog(&self) -> Option<Catalog> {
        self.catalog
    }

    pub fn candidate(&self) -> Option<&Candidate> {
        self.candidate.as_ref()
    }

    /// Overwrite the binding; rejects an empty candidate id
    pub fn set(&mut self, catalog: Catalog, candidate: Candidate) -> SearchResult<()> {
        if candidate.is_empty() {
            return Err(SearchError::EmptyCandidate);
        }
        self.catalog = Some(catalog);
        self.candidate = Some(candidate);
        Ok(())
    }

    /// Catalog switch: keep the catalog, forget the candidate
    pub fn switch_catalog(&mut self, catalog: Catalog) {
        self.catalog = Some(catalog);
        self.candidate = None;
    }

    pub fn clear(&mut self) {
        self.catalog = None;
        self.candidate = None;
    }

    /// Both halves set
    pub fn resolved(&self) -> Option<(Catalog, &Candidate)> {
        match (self.catalog, self.candidate.as_ref()) {
            (Some(catalog), Some(candidate)) => Some((catalog, candidate)),
            _ => None,
        }
    }
}
