//! Domain model and pure rules for building and publishing walking courses.
//!
//! Everything in this crate is synchronous and side-effect free except the
//! [`CourseRepository`] trait, which describes the persistence boundary the
//! publish pipeline consumes.

pub mod app_config;
pub mod config;
pub mod draft;
pub mod geometry;
pub mod outcome;
pub mod repository;
pub mod validation;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use draft::{CourseDraft, DraftEditError, Location, PersistedCourse, Position};
pub use geometry::{compute_geometry, Bounds, Geometry};
pub use outcome::{ErrorKind, Failure, Outcome};
pub use repository::{
    AssetRole, CompressedAsset, CourseRepository, CourseSubmission, RepositoryError,
};
pub use validation::{validate, ValidationLimits};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
