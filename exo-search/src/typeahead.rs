//! Typeahead controller: query text, dropdown state and the scroll window
//!
//! Dropdown state machine over {Closed, Open}:
//! - Closed → Open on focus, or on any non-empty query edit
//! - Open → Closed on Escape, on commit, or when a blur close intent expires
//!
//! Every query edit refilters synchronously and resets the scroll offset.
//! Navigation only moves `scroll_offset`, clamped to
//! `0..=max(0, filtered.len() - WINDOW_SIZE)`.
//!
//! Blur does not close immediately: it records a close intent with a
//! deadline, so an option click landing inside the grace window still
//! commits. Focus, commit and Escape cancel the intent; `poll` applies it.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::catalog::{Candidate, Catalog};
use crate::error::LoadError;
use crate::index::CandidateIndex;
use crate::lifecycle::{RequestSequence, RequestTicket};

/// Number of options visible at once
pub const WINDOW_SIZE: usize = 8;

/// Logical keyboard / pointer events understood by the typeahead
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    ArrowDown,
    ArrowUp,
    WheelDown,
    WheelUp,
    /// Commit the first visible option
    Enter,
    /// Dismiss the dropdown
    Escape,
}

/// Handle for an in-flight candidate-list load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub catalog: Catalog,
    ticket: RequestTicket,
}

/// Result of applying a finished load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { count: usize },
    /// A newer load was started; this one was dropped
    Superseded,
}

/// Read-only snapshot for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeaheadView {
    pub catalog: Option<Catalog>,
    pub query: String,
    pub is_open: bool,
    pub scroll_offset: usize,
    /// `filtered[scroll_offset .. scroll_offset + WINDOW_SIZE]`
    pub window: Vec<Candidate>,
    pub total_matches: usize,
    /// Open with a non-empty query and nothing matching
    pub no_match: bool,
    pub loading: bool,
    pub last_error: Option<String>,
}

#[derive(Debug)]
pub struct TypeaheadController {
    index: CandidateIndex,
    query: String,
    filtered: Vec<Candidate>,
    is_open: bool,
    scroll_offset: usize,
    blur_grace: Duration,
    /// Deadline of a pending blur close
    close_at: Option<Instant>,
    loads: RequestSequence,
    loading: Option<LoadTicket>,
    last_error: Option<String>,
}

impl TypeaheadController {
    pub fn new(blur_grace: Duration) -> Self {
        Self {
            index: CandidateIndex::new(),
            query: String::new(),
            filtered: Vec::new(),
            is_open: false,
            scroll_offset: 0,
            blur_grace,
            close_at: None,
            loads: RequestSequence::new(),
            loading: None,
            last_error: None,
        }
    }

    pub fn catalog(&self) -> Option<Catalog> {
        self.index.catalog()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn filtered(&self) -> &[Candidate] {
        &self.filtered
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    /// Visible slice of the filtered list
    pub fn window(&self) -> &[Candidate] {
        let end = (self.scroll_offset + WINDOW_SIZE).min(self.filtered.len());
        &self.filtered[self.scroll_offset.min(end)..end]
    }

    pub fn max_scroll_offset(&self) -> usize {
        self.filtered.len().saturating_sub(WINDOW_SIZE)
    }

    // ------------------------------------------------------------------
    // Catalog loading
    // ------------------------------------------------------------------

    /// Start loading `catalog`; any earlier load becomes stale
    ///
    /// The old list, the query and the scroll position are dropped right
    /// away so nothing from the previous catalog stays visible.
    pub fn begin_load(&mut self, catalog: Catalog) -> LoadTicket {
        let ticket = LoadTicket {
            catalog,
            ticket: self.loads.issue(),
        };
        self.loading = Some(ticket);
        self.last_error = None;
        self.index.clear(catalog);
        self.query.clear();
        self.close();
        self.refilter();
        ticket
    }

    /// Apply a finished load if it is still the latest one
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<Candidate>, LoadError>,
    ) -> Result<LoadOutcome, LoadError> {
        if !self.loads.is_current(ticket.ticket) {
            debug!(catalog = %ticket.catalog, seq = ticket.ticket.seq(), "Dropping stale candidate list");
            return Ok(LoadOutcome::Superseded);
        }
        self.loading = None;

        match result {
            Ok(candidates) => {
                let count = candidates.len();
                self.index.replace(ticket.catalog, candidates);
                self.refilter();
                Ok(LoadOutcome::Loaded { count })
            }
            Err(e) => {
                self.index.clear(ticket.catalog);
                self.refilter();
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // Focus / editing
    // ------------------------------------------------------------------

    pub fn focus(&mut self) {
        self.close_at = None;
        self.is_open = true;
    }

    /// Replace the query text
    pub fn input(&mut self, text: &str) {
        self.query = text.to_string();
        self.refilter();
        if !self.query.is_empty() {
            self.close_at = None;
            self.is_open = true;
        }
    }

    /// Schedule a close after the grace delay
    pub fn blur(&mut self, now: Instant) {
        if self.is_open {
            self.close_at = Some(now + self.blur_grace);
        }
    }

    /// Apply an expired close intent; returns true if the dropdown closed
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.close_at {
            Some(deadline) if now >= deadline => {
                self.close();
                true
            }
            _ => false,
        }
    }

    pub fn escape(&mut self) {
        self.close();
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn scroll_down(&mut self) {
        if self.scroll_offset < self.max_scroll_offset() {
            self.scroll_offset += 1;
        }
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
    }

    /// Handle a key or wheel event; returns the committed candidate, if any
    pub fn key(&mut self, event: KeyEvent, now: Instant) -> Option<Candidate> {
        self.poll(now);
        match event {
            KeyEvent::ArrowDown | KeyEvent::WheelDown => {
                self.scroll_down();
                None
            }
            KeyEvent::ArrowUp | KeyEvent::WheelUp => {
                self.scroll_up();
                None
            }
            KeyEvent::Enter => self.commit_first_visible(),
            KeyEvent::Escape => {
                self.escape();
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Commit
    // ------------------------------------------------------------------

    /// Commit `candidate`: it becomes the query and the dropdown closes
    pub fn commit(&mut self, candidate: Candidate) -> Candidate {
        self.query = candidate.as_str().to_string();
        self.refilter();
        self.close();
        candidate
    }

    /// Enter: commit the first entry of the visible window
    ///
    /// No-op while closed or when the window is empty.
    pub fn commit_first_visible(&mut self) -> Option<Candidate> {
        if !self.is_open {
            return None;
        }
        let first = self.window().first().cloned()?;
        Some(self.commit(first))
    }

    /// Option click; only accepted while the dropdown is still open
    pub fn select_option(&mut self, candidate: &Candidate, now: Instant) -> Option<Candidate> {
        self.poll(now);
        if !self.is_open || !self.filtered.contains(candidate) {
            return None;
        }
        Some(self.commit(candidate.clone()))
    }

    /// Direct text match: the query names a candidate exactly (ignoring case)
    pub fn commit_exact(&mut self) -> Option<Candidate> {
        let candidate = self.index.find_exact(&self.query).cloned()?;
        Some(self.commit(candidate))
    }

    pub fn view(&self) -> TypeaheadView {
        TypeaheadView {
            catalog: self.index.catalog(),
            query: self.query.clone(),
            is_open: self.is_open,
            scroll_offset: self.scroll_offset,
            window: self.window().to_vec(),
            total_matches: self.filtered.len(),
            no_match: self.is_open
                && !self.query.is_empty()
                && self.filtered.is_empty()
                && self.loading.is_none(),
            loading: self.is_loading(),
            last_error: self.last_error.clone(),
        }
    }

    fn close(&mut self) {
        self.is_open = false;
        self.close_at = None;
    }

    fn refilter(&mut self) {
        self.filtered = self.index.filter(&self.query);
        self.scroll_offset = 0;
    }
}
