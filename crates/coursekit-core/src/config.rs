use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid, or if a variable
/// required in production is missing.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can pass a `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;
    use std::str::FromStr;

    fn parse_as<T>(var: &str, raw: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    }

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let env = parse_environment(&or_default("COURSEKIT_ENV", "development"))?;
    let log_level = or_default("COURSEKIT_LOG_LEVEL", env.default_log_level());
    // Production must not fall back to a directory relative to the working dir.
    let draft_dir = match (lookup("COURSEKIT_DRAFT_DIR"), &env) {
        (Ok(dir), _) => PathBuf::from(dir),
        (Err(_), Environment::Production) => {
            return Err(ConfigError::MissingEnvVar("COURSEKIT_DRAFT_DIR".to_string()));
        }
        (Err(_), _) => PathBuf::from("./.coursekit/drafts"),
    };
    let draft_debounce_ms = parse_as::<u64>(
        "COURSEKIT_DRAFT_DEBOUNCE_MS",
        &or_default("COURSEKIT_DRAFT_DEBOUNCE_MS", "500"),
    )?;

    let database_url = lookup("DATABASE_URL").ok().filter(|v| !v.trim().is_empty());
    let db_max_connections = parse_as::<u32>(
        "COURSEKIT_DB_MAX_CONNECTIONS",
        &or_default("COURSEKIT_DB_MAX_CONNECTIONS", "10"),
    )?;
    let db_min_connections = parse_as::<u32>(
        "COURSEKIT_DB_MIN_CONNECTIONS",
        &or_default("COURSEKIT_DB_MIN_CONNECTIONS", "1"),
    )?;
    let db_acquire_timeout_secs = parse_as::<u64>(
        "COURSEKIT_DB_ACQUIRE_TIMEOUT_SECS",
        &or_default("COURSEKIT_DB_ACQUIRE_TIMEOUT_SECS", "10"),
    )?;

    let image_max_size_mb = parse_as::<f64>(
        "COURSEKIT_IMAGE_MAX_SIZE_MB",
        &or_default("COURSEKIT_IMAGE_MAX_SIZE_MB", "1.0"),
    )?;
    if !(image_max_size_mb.is_finite() && image_max_size_mb > 0.0) {
        return Err(ConfigError::InvalidEnvVar {
            var: "COURSEKIT_IMAGE_MAX_SIZE_MB".to_string(),
            reason: "must be a positive number".to_string(),
        });
    }
    let image_max_dimension = parse_as::<u32>(
        "COURSEKIT_IMAGE_MAX_DIMENSION",
        &or_default("COURSEKIT_IMAGE_MAX_DIMENSION", "1920"),
    )?;

    let title_max_chars = parse_as::<usize>(
        "COURSEKIT_TITLE_MAX_CHARS",
        &or_default("COURSEKIT_TITLE_MAX_CHARS", "100"),
    )?;
    let description_max_chars = parse_as::<usize>(
        "COURSEKIT_DESCRIPTION_MAX_CHARS",
        &or_default("COURSEKIT_DESCRIPTION_MAX_CHARS", "2000"),
    )?;
    let max_locations = parse_as::<usize>(
        "COURSEKIT_MAX_LOCATIONS",
        &or_default("COURSEKIT_MAX_LOCATIONS", "30"),
    )?;

    Ok(AppConfig {
        env,
        log_level,
        draft_dir,
        draft_debounce_ms,
        database_url,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        image_max_size_mb,
        image_max_dimension,
        title_max_chars,
        description_max_chars,
        max_locations,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s.trim() {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "COURSEKIT_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
