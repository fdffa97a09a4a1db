//! Persistence boundary for published courses.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::draft::{CourseDraft, PersistedCourse};

/// Which part of the course an uploaded image belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", content = "location_id", rename_all = "snake_case")]
pub enum AssetRole {
    Hero,
    Location(String),
}

impl std::fmt::Display for AssetRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetRole::Hero => write!(f, "hero"),
            AssetRole::Location(id) => write!(f, "location:{id}"),
        }
    }
}

/// An image ready for upload, keyed by the draft reference it replaces.
#[derive(Debug, Clone)]
pub struct CompressedAsset {
    pub role: AssetRole,
    /// The draft's original local reference.
    pub source_ref: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    /// `true` when compression failed and `bytes` are the original file.
    pub degraded: bool,
}

/// Everything the repository needs to create a course.
#[derive(Debug, Clone)]
pub struct CourseSubmission {
    pub draft: CourseDraft,
    pub assets: Vec<CompressedAsset>,
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("backing store unavailable: {0}")]
    Unavailable(String),

    #[error("backing store rejected the course: {0}")]
    Rejected(String),

    #[error("storage quota exceeded")]
    QuotaExceeded,

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Store that turns a submission into a [`PersistedCourse`].
///
/// Implementations are not retried by callers; a failed `create` may be
/// repeated by the user.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn create(
        &self,
        submission: &CourseSubmission,
        author_id: &str,
    ) -> Result<PersistedCourse, RepositoryError>;
}
