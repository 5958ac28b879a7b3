//! # Exo Common Library
//!
//! Shared code for the exoplanet candidate search tools including:
//! - Error types
//! - Bootstrap configuration loading (TOML + environment)
//! - Session event types and the EventBus
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
pub use events::{EventBus, SessionEvent};
