//! Catalog identifiers and candidate names
//!
//! A catalog is the source dataset a candidate belongs to. Each catalog has
//! its own candidate-list and prediction endpoints and names the candidate
//! with its own request field.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SearchError;

/// Source dataset served by the prediction backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Catalog {
    /// Kepler Objects of Interest (e.g. "K00752.01")
    Kepler,
    /// TESS Objects of Interest
    Tess,
}

impl Catalog {
    pub const ALL: [Catalog; 2] = [Catalog::Kepler, Catalog::Tess];

    pub fn as_str(&self) -> &'static str {
        match self {
            Catalog::Kepler => "kepler",
            Catalog::Tess => "tess",
        }
    }

    /// Human label for the candidate field
    pub fn candidate_label(&self) -> &'static str {
        match self {
            Catalog::Kepler => "KOI Name",
            Catalog::Tess => "TESS Object of Interest",
        }
    }

    /// Path of the candidate-list endpoint
    pub fn candidates_path(&self) -> String {
        format!("/api/autocomplete/{}", self.as_str())
    }

    /// Path of the prediction endpoint
    pub fn prediction_path(&self) -> String {
        format!("/api/predict/{}", self.as_str())
    }

    /// Request/response field that carries the candidate name
    pub fn candidate_field(&self) -> &'static str {
        match self {
            Catalog::Kepler => "koi_name",
            Catalog::Tess => "toi_name",
        }
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Catalog {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kepler" => Ok(Catalog::Kepler),
            "tess" => Ok(Catalog::Tess),
            other => Err(SearchError::UnknownCatalog(other.to_string())),
        }
    }
}

/// Catalog-scoped candidate name, displayed and sent verbatim
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Candidate(String);

impl Candidate {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Candidate {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Candidate {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Candidate {
    fn from(s: String) -> Self {
        Self(s)
    }
}
