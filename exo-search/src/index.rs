//! Candidate index: the full candidate list of the active catalog
//!
//! Filtering is a case-insensitive substring test against the loaded list,
//! preserving load order. No ranking, no fuzzy matching, no result cap.

use crate::catalog::{Candidate, Catalog};

/// Candidate list for one catalog
#[derive(Debug, Clone, Default)]
pub struct CandidateIndex {
    catalog: Option<Catalog>,
    /// Candidates in load order
    candidates: Vec<Candidate>,
    /// Lowercased names, parallel to `candidates`
    folded: Vec<String>,
}

impl CandidateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn catalog(&self) -> Option<Catalog> {
        self.catalog
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Replace the whole list (wholesale, never incremental)
    pub fn replace(&mut self, catalog: Catalog, candidates: Vec<Candidate>) {
        self.folded = candidates.iter().map(|c| c.as_str().to_lowercase()).collect();
        self.candidates = candidates;
        self.catalog = Some(catalog);
    }

    /// Drop every candidate and bind the index to `catalog`
    pub fn clear(&mut self, catalog: Catalog) {
        self.candidates.clear();
        self.folded.clear();
        self.catalog = Some(catalog);
    }

    /// Candidates whose lowercase form contains `query.to_lowercase()`
    ///
    /// An empty query returns the full list unchanged.
    pub fn filter(&self, query: &str) -> Vec<Candidate> {
        if query.is_empty() {
            return self.candidates.clone();
        }

        let needle = query.to_lowercase();
        self.candidates
            .iter()
            .zip(&self.folded)
            .filter(|(_, folded)| folded.contains(&needle))
            .map(|(candidate, _)| candidate.clone())
            .collect()
    }

    /// Candidate equal to `text` ignoring case
    pub fn find_exact(&self, text: &str) -> Option<&Candidate> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.candidates
            .iter()
            .zip(&self.folded)
            .find(|(_, folded)| **folded == needle)
            .map(|(candidate, _)| candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(names: &[&str]) -> CandidateIndex {
        let mut index = CandidateIndex::new();
        index.replace(Catalog::Kepler, names.iter().map(|n| Candidate::from(*n)).collect());
        index
    }

    fn names(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.as_str()).collect()
    }

    #[test]
    fn test_filter_case_insensitive_substring() {
        let index = index(&["K-1", "K-2", "K-20"]);
        assert_eq!(names(&index.filter("k-2")), vec!["K-2", "K-20"]);
    }

    #[test]
    fn test_filter_preserves_load_order() {
        let index = index(&["TOI-900", "toi-100", "K-9", "Toi-500"]);
        assert_eq!(names(&index.filter("TOI")), vec!["TOI-900", "toi-100", "Toi-500"]);
    }

    #[test]
    fn test_empty_query_returns_everything() {
        let index = index(&["b", "a", "c"]);
        assert_eq!(names(&index.filter("")), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_filter_matches_reference_definition() {
        let all = ["K00752.01", "k00752.02", "K00753.01", "Kepler-227 b", "ÄSTRO-1", "ästro-2"];
        let index = index(&all);

        for query in ["", "k", "752", ".01", "KEPLER", "äs", "ÄS", "zzz", " "] {
            let expected: Vec<&str> = all
                .iter()
                .copied()
                .filter(|c| c.to_lowercase().contains(&query.to_lowercase()))
                .collect();
            assert_eq!(names(&index.filter(query)), expected, "query {:?}", query);
        }
    }

    #[test]
    fn test_filter_is_idempotent() {
        let index = index(&["K-1", "K-2", "K-20"]);
        assert_eq!(index.filter("2"), index.filter("2"));
    }

    #[test]
    fn test_replace_discards_previous_list() {
        let mut index = index(&["K-1", "K-2"]);
        index.replace(Catalog::Tess, vec![Candidate::from("TOI-1")]);

        assert_eq!(index.catalog(), Some(Catalog::Tess));
        assert_eq!(names(&index.filter("")), vec!["TOI-1"]);
        assert!(index.filter("K-").is_empty());
    }

    #[test]
    fn test_find_exact_ignores_case() {
        let index = index(&["K-1", "K-10"]);
        assert_eq!(index.find_exact("k-1").map(|c| c.as_str()), Some("K-1"));
        assert_eq!(index.find_exact(" K-10 ").map(|c| c.as_str()), Some("K-10"));
        assert!(index.find_exact("K-").is_none());
        assert!(index.find_exact("").is_none());
    }
}
