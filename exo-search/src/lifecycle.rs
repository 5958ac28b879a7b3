//! Request lifecycle and staleness tracking
//!
//! Each orchestrator owns one `RequestLifecycle` and one `RequestSequence`.
//! Issuing a request takes a ticket; a response is applied only while its
//! ticket is still the latest one issued. Anything else is stale and dropped.

use serde::Serialize;

/// State of the current request of one kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum RequestLifecycle<T> {
    Idle,
    Loading,
    Succeeded(T),
    /// Human-readable reason
    Failed(String),
}

impl<T> Default for RequestLifecycle<T> {
    fn default() -> Self {
        RequestLifecycle::Idle
    }
}

impl<T> RequestLifecycle<T> {
    pub fn succeeded(&self) -> Option<&T> {
        match self {
            RequestLifecycle::Succeeded(value) => Some(value),
            _ => None,
        }
    }
}

/// Proof that a request was issued; compared against the sequence on completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub fn seq(&self) -> u64 {
        self.0
    }
}

/// Monotonic request counter
#[derive(Debug, Default)]
pub struct RequestSequence {
    latest: u64,
}

impl RequestSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new ticket, superseding every earlier one
    pub fn issue(&mut self) -> RequestTicket {
        self.latest += 1;
        RequestTicket(self.latest)
    }

    /// Supersede outstanding tickets without issuing a new request
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        ticket.0 == self.latest
    }
}
