use std::path::PathBuf;

use crate::validation::ValidationLimits;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    /// Tracing filter used when `COURSEKIT_LOG_LEVEL` is not set.
    #[must_use]
    pub fn default_log_level(&self) -> &'static str {
        match self {
            Environment::Development => "debug",
            Environment::Test => "warn",
            Environment::Production => "info",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    /// Directory holding one JSON file per draft key.
    pub draft_dir: PathBuf,
    pub draft_debounce_ms: u64,
    /// Only needed to publish; drafting works without a database.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub image_max_size_mb: f64,
    pub image_max_dimension: u32,
    pub title_max_chars: usize,
    pub description_max_chars: usize,
    pub max_locations: usize,
}

impl AppConfig {
    /// Validation limits derived from the configured maxima.
    #[must_use]
    pub fn validation_limits(&self) -> ValidationLimits {
        ValidationLimits {
            max_title_chars: self.title_max_chars,
            max_description_chars: self.description_max_chars,
            max_locations: self.max_locations,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("draft_dir", &self.draft_dir)
            .field("draft_debounce_ms", &self.draft_debounce_ms)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("image_max_size_mb", &self.image_max_size_mb)
            .field("image_max_dimension", &self.image_max_dimension)
            .field("title_max_chars", &self.title_max_chars)
            .field("description_max_chars", &self.description_max_chars)
            .field("max_locations", &self.max_locations)
            .finish()
    }
}
