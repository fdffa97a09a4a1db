use coursekit_core::{AppConfig, RepositoryError};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/coursekit-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("DATABASE_URL is not set")]
    MissingDatabaseUrl,
    #[error("course {0} not found")]
    NotFound(Uuid),
    #[error("value out of range for column {column}: {value}")]
    OutOfRange { column: &'static str, value: usize },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<DbError> for RepositoryError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Sqlx(
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_),
            )
            | DbError::MissingDatabaseUrl => RepositoryError::Unavailable(err.to_string()),
            DbError::Sqlx(sqlx::Error::Database(ref db))
                if is_constraint_violation(db.code().as_deref()) =>
            {
                RepositoryError::Rejected(db.message().to_string())
            }
            DbError::OutOfRange { .. } => RepositoryError::Rejected(err.to_string()),
            other => RepositoryError::Other(Box::new(other)),
        }
    }
}

/// SQLSTATE class 23 is "integrity constraint violation".
fn is_constraint_violation(code: Option<&str>) -> bool {
    code.is_some_and(|c| c.starts_with("23"))
}

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Connect using the database settings of an [`AppConfig`].
///
/// # Errors
///
/// Returns [`DbError::MissingDatabaseUrl`] if no `DATABASE_URL` was configured,
/// or [`DbError::Sqlx`] if the connection cannot be established.
pub async fn connect_pool_from_config(config: &AppConfig) -> Result<PgPool, DbError> {
    let database_url = config
        .database_url
        .as_deref()
        .ok_or(DbError::MissingDatabaseUrl)?;
    connect_pool(database_url, PoolConfig::from_app_config(config))
        .await
        .map_err(DbError::from)
}

/// Run all pending migrations against the pool.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Send a `SELECT 1` to verify the pool has a live connection.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

/// Run a full health check: ping the pool and return a typed error on failure.
///
/// # Errors
///
/// Returns [`DbError`] if the ping fails.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    ping(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_config_has_sane_defaults() {
        let config = PoolConfig::default();

        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.min_connections, DEFAULT_MIN_CONNECTIONS);
        assert_eq!(config.acquire_timeout_secs, DEFAULT_ACQUIRE_TIMEOUT_SECS);
    }

    #[test]
    fn constraint_violation_codes() {
        assert!(is_constraint_violation(Some("23505")));
        assert!(is_constraint_violation(Some("23514")));
        assert!(!is_constraint_violation(Some("42P01")));
        assert!(!is_constraint_violation(None));
    }

    #[test]
    fn pool_timeout_maps_to_unavailable() {
        let err = RepositoryError::from(DbError::Sqlx(sqlx::Error::PoolTimedOut));
        assert!(matches!(err, RepositoryError::Unavailable(_)));
    }

    #[test]
    fn missing_url_maps_to_unavailable() {
        let err = RepositoryError::from(DbError::MissingDatabaseUrl);
        assert!(matches!(err, RepositoryError::Unavailable(_)));
    }

    #[test]
    fn missing_course_names_its_id() {
        let id = Uuid::nil();
        let err = DbError::NotFound(id);
        assert_eq!(err.to_string(), format!("course {id} not found"));
        assert!(matches!(RepositoryError::from(err), RepositoryError::Other(_)));
    }

    #[test]
    fn row_not_found_maps_to_other() {
        let err = RepositoryError::from(DbError::Sqlx(sqlx::Error::RowNotFound));
        assert!(matches!(err, RepositoryError::Other(_)));
    }
}

pub mod courses;

pub use courses::{
    get_course, insert_course, require_course, CourseLocationRow, CourseRow, PgCourseRepository,
};
