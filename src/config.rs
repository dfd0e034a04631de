//! Configuration management for the budget estimator
//!
//! Handles loading configuration from files and environment variables,
//! resolves API keys once at startup, and validates all settings.

use crate::TravelBudgetError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable consulted when no places key is configured
pub const PLACES_KEY_ENV: &str = "GOOGLE_PLACES_API_KEY";
/// Environment variable consulted when no generative-text key is configured
pub const GENERATIVE_KEY_ENV: &str = "GEMINI_API_KEY";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TravelBudgetConfig {
    /// Places search/details API
    #[serde(default)]
    pub places: PlacesConfig,
    /// Generative-text API
    #[serde(default)]
    pub generative: GenerativeConfig,
    /// Rate-rule store
    #[serde(default)]
    pub store: StoreConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// HTTP server
    #[serde(default)]
    pub server: ServerConfig,
}

/// Places API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacesConfig {
    /// API key; place data is skipped entirely when unset
    pub api_key: Option<String>,
    #[serde(default = "default_places_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_places_timeout")]
    pub timeout_seconds: u32,
    /// Candidates returned per category
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Candidates considered for price-tier backfill
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

/// Generative-text API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerativeConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_generative_base_url")]
    pub base_url: String,
    /// Model identifiers, tried in order
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    #[serde(default = "default_hybrid_timeout")]
    pub hybrid_timeout_seconds: u32,
    #[serde(default = "default_generic_timeout")]
    pub generic_timeout_seconds: u32,
}

/// Rate-rule store settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory of the persistent store; in-memory when unset
    pub location: Option<String>,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// OTLP/HTTP collector endpoint; export disabled when unset
    pub otlp_endpoint: Option<String>,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u32,
    #[serde(default = "default_body_limit_kb")]
    pub body_limit_kb: usize,
    pub tls_cert_path: Option<String>,
    pub tls_key_path: Option<String>,
}

// Default value functions
fn default_places_base_url() -> String {
    "https://maps.googleapis.com/maps/api/place".to_string()
}

fn default_places_timeout() -> u32 {
    10
}

fn default_top_n() -> usize {
    3
}

fn default_pool_size() -> usize {
    6
}

fn default_generative_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_models() -> Vec<String> {
    ["gemini-2.0-flash", "gemini-1.5-flash", "gemini-1.5-pro", "gemini-pro"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_hybrid_timeout() -> u32 {
    30
}

fn default_generic_timeout() -> u32 {
    20
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u32 {
    300
}

fn default_body_limit_kb() -> usize {
    64
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_places_base_url(),
            timeout_seconds: default_places_timeout(),
            top_n: default_top_n(),
            pool_size: default_pool_size(),
        }
    }
}

impl Default for GenerativeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_generative_base_url(),
            models: default_models(),
            hybrid_timeout_seconds: default_hybrid_timeout(),
            generic_timeout_seconds: default_generic_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            otlp_endpoint: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
            body_limit_kb: default_body_limit_kb(),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl PlacesConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.into())
    }
}

impl GenerativeConfig {
    #[must_use]
    pub fn hybrid_timeout(&self) -> Duration {
        Duration::from_secs(self.hybrid_timeout_seconds.into())
    }

    #[must_use]
    pub fn generic_timeout(&self) -> Duration {
        Duration::from_secs(self.generic_timeout_seconds.into())
    }
}

impl TravelBudgetConfig {
    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides, e.g. TRAVELBUDGET_PLACES__TOP_N=5
        builder = builder.add_source(
            Environment::with_prefix("TRAVELBUDGET")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("generative.models")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: TravelBudgetConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.resolve_api_keys(|name| std::env::var(name).ok());
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("travelbudget").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.places.base_url.is_empty() {
            self.places.base_url = default_places_base_url();
        }
        if self.places.timeout_seconds == 0 {
            self.places.timeout_seconds = default_places_timeout();
        }
        if self.places.top_n == 0 {
            self.places.top_n = default_top_n();
        }
        if self.generative.base_url.is_empty() {
            self.generative.base_url = default_generative_base_url();
        }
        if self.generative.models.is_empty() {
            self.generative.models = default_models();
        }
        if self.generative.hybrid_timeout_seconds == 0 {
            self.generative.hybrid_timeout_seconds = default_hybrid_timeout();
        }
        if self.generative.generic_timeout_seconds == 0 {
            self.generative.generic_timeout_seconds = default_generic_timeout();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.server.request_timeout_seconds == 0 {
            self.server.request_timeout_seconds = default_request_timeout();
        }
        if self.server.body_limit_kb == 0 {
            self.server.body_limit_kb = default_body_limit_kb();
        }
    }

    /// Fill unset API keys from the given lookup (the process environment
    /// in production). Blank keys count as unset.
    pub fn resolve_api_keys(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fn resolve(slot: &mut Option<String>, fallback: Option<String>) {
            if slot.as_deref().is_none_or(|k| k.trim().is_empty()) {
                *slot = fallback.filter(|k| !k.trim().is_empty());
            }
        }
        resolve(&mut self.places.api_key, lookup(PLACES_KEY_ENV));
        resolve(&mut self.generative.api_key, lookup(GENERATIVE_KEY_ENV));
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.places.timeout_seconds > 60 {
            return Err(TravelBudgetError::config("Places API timeout cannot exceed 60 seconds").into());
        }

        for timeout in [
            self.generative.hybrid_timeout_seconds,
            self.generative.generic_timeout_seconds,
        ] {
            if timeout > 120 {
                return Err(TravelBudgetError::config(
                    "Generative API timeout cannot exceed 120 seconds",
                )
                .into());
            }
        }

        if self.places.top_n > 20 {
            return Err(TravelBudgetError::config("Places top_n cannot exceed 20").into());
        }

        if self.places.pool_size > 20 {
            return Err(TravelBudgetError::config("Places pool_size cannot exceed 20").into());
        }

        if self.server.request_timeout_seconds > 900 {
            return Err(TravelBudgetError::config(
                "Server request timeout cannot exceed 900 seconds",
            )
            .into());
        }

        if self.server.body_limit_kb > 10 * 1024 {
            return Err(TravelBudgetError::config("Server body_limit_kb cannot exceed 10240").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(TravelBudgetError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(TravelBudgetError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("Places", &self.places.base_url),
            ("Generative", &self.generative.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(TravelBudgetError::config(format!(
                    "{name} API base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        if self.generative.models.iter().any(|m| m.trim().is_empty()) {
            return Err(TravelBudgetError::config("Model identifiers cannot be empty").into());
        }

        if self.server.tls_cert_path.is_some() != self.server.tls_key_path.is_some() {
            return Err(TravelBudgetError::config(
                "TLS requires both tls_cert_path and tls_key_path",
            )
            .into());
        }

        Ok(())
    }
}
