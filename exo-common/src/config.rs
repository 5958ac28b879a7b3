//! Configuration loading and backend URL resolution
//!
//! Bootstrap configuration comes from a TOML file. Every field has a built-in
//! default, so a missing or unreadable file is never fatal: a warning is
//! logged and the defaults are used.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (--backend-url, --config)
//! 2. Environment variables (EXO_BACKEND_URL, EXO_CONFIG)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Prediction service used when nothing else is configured
pub const DEFAULT_BACKEND_URL: &str = "https://nasa-space-apps-challenge-frqb.onrender.com";

/// Environment variable overriding the backend base URL
pub const BACKEND_URL_ENV: &str = "EXO_BACKEND_URL";

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "EXO_CONFIG";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Base URL of the prediction service (optional)
    #[serde(default)]
    pub backend_url: Option<String>,

    /// Transport timeout for every backend request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Capacity of the session event channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Typeahead tuning (optional)
    #[serde(default)]
    pub typeahead: TypeaheadConfig,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Typeahead configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeaheadConfig {
    /// Delay between losing focus and closing the dropdown
    #[serde(default = "default_blur_grace_ms")]
    pub blur_grace_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional); stderr output is always on
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_event_capacity() -> usize {
    100
}

fn default_blur_grace_ms() -> u64 {
    200
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            request_timeout_secs: default_request_timeout_secs(),
            event_capacity: default_event_capacity(),
            typeahead: TypeaheadConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for TypeaheadConfig {
    fn default() -> Self {
        Self {
            blur_grace_ms: default_blur_grace_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Where a resolved setting came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine,
    Environment,
    TomlFile,
    Default,
}

impl ConfigSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigSource::CommandLine => "command line",
            ConfigSource::Environment => "environment",
            ConfigSource::TomlFile => "TOML",
            ConfigSource::Default => "built-in default",
        }
    }
}

/// Locate the config file: CLI argument, then `EXO_CONFIG`, then the
/// platform config directory (`<config_dir>/exo/exo-search.toml`)
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir().map(|d| d.join("exo").join("exo-search.toml"))
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Load the config file if present, falling back to defaults on any problem
pub fn load_or_default(path: Option<&Path>) -> TomlConfig {
    let Some(path) = path else {
        return TomlConfig::default();
    };

    if !path.exists() {
        info!("No config file at {}, using defaults", path.display());
        return TomlConfig::default();
    }

    match load_toml_config(path) {
        Ok(config) => {
            info!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{}; using defaults", e);
            TomlConfig::default()
        }
    }
}

/// Write config to disk atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}

/// Resolve the backend base URL
///
/// **Priority:** CLI → ENV → TOML → compiled default
///
/// Trailing slashes are stripped so paths can be appended directly.
pub fn resolve_backend_url(cli_arg: Option<&str>, toml_config: &TomlConfig) -> (String, ConfigSource) {
    let cli = cli_arg.filter(|v| is_set(v));
    let env = std::env::var(BACKEND_URL_ENV).ok().filter(|v| is_set(v));
    let toml = toml_config.backend_url.as_deref().filter(|v| is_set(v));

    let sources: Vec<&str> = [
        cli.map(|_| ConfigSource::CommandLine),
        env.as_ref().map(|_| ConfigSource::Environment),
        toml.map(|_| ConfigSource::TomlFile),
    ]
    .iter()
    .flatten()
    .map(|s| s.as_str())
    .collect();

    if sources.len() > 1 {
        warn!(
            "Backend URL found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    let (url, source) = if let Some(url) = cli {
        (url.to_string(), ConfigSource::CommandLine)
    } else if let Some(url) = env {
        (url, ConfigSource::Environment)
    } else if let Some(url) = toml {
        (url.to_string(), ConfigSource::TomlFile)
    } else {
        (DEFAULT_BACKEND_URL.to_string(), ConfigSource::Default)
    };

    info!("Backend URL {} loaded from {}", url, source.as_str());
    (url.trim().trim_end_matches('/').to_string(), source)
}

fn is_set(value: &str) -> bool {
    !value.trim().is_empty()
}
