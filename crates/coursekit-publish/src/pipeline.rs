//! Publish orchestration: validate, prepare images, persist, clear the draft.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use coursekit_core::{
    validate, CourseDraft, CourseRepository, CourseSubmission, ErrorKind, Failure, Outcome,
    ValidationLimits,
};
use coursekit_draft::{DraftStore, COURSE_DRAFT_KEY};
use futures::FutureExt;
use uuid::Uuid;

use crate::assets::prepare_assets;
use crate::compress::{AssetCompressor, CompressionOptions};

/// Message returned for every persistence failure. The cause is only logged.
pub const PERSISTENCE_FAILURE_MESSAGE: &str =
    "The course could not be published right now. Please try again.";

/// Where a publish attempt currently is, for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStage {
    Validating,
    PreparingAssets,
    Publishing,
    PublishFailed,
    Published,
}

impl fmt::Display for PublishStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishStage::Validating => write!(f, "validating"),
            PublishStage::PreparingAssets => write!(f, "preparing_assets"),
            PublishStage::Publishing => write!(f, "publishing"),
            PublishStage::PublishFailed => write!(f, "publish_failed"),
            PublishStage::Published => write!(f, "published"),
        }
    }
}

/// Turns a [`CourseDraft`] into a persisted course.
///
/// Either the repository accepts the course and the saved draft is cleared,
/// or nothing is committed and the saved draft stays for a later retry.
pub struct PublishPipeline {
    repository: Arc<dyn CourseRepository>,
    compressor: Arc<dyn AssetCompressor>,
    store: DraftStore,
    draft_key: String,
    limits: ValidationLimits,
    compression: CompressionOptions,
}

impl PublishPipeline {
    #[must_use]
    pub fn new(
        repository: Arc<dyn CourseRepository>,
        compressor: Arc<dyn AssetCompressor>,
        store: DraftStore,
    ) -> Self {
        Self {
            repository,
            compressor,
            store,
            draft_key: COURSE_DRAFT_KEY.to_string(),
            limits: ValidationLimits::default(),
            compression: CompressionOptions::default(),
        }
    }

    #[must_use]
    pub fn with_draft_key(mut self, key: impl Into<String>) -> Self {
        self.draft_key = key.into();
        self
    }

    #[must_use]
    pub fn with_limits(mut self, limits: ValidationLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn with_compression(mut self, options: CompressionOptions) -> Self {
        self.compression = options;
        self
    }

    /// Publish `draft` on behalf of `author_id` and return the new course id.
    ///
    /// Steps short-circuit on the first failure:
    /// 1. validation (failure returned unchanged),
    /// 2. image preparation (compression errors fall back to originals),
    /// 3. `CourseRepository::create`, not retried,
    /// 4. clearing the saved draft.
    ///
    /// # Errors
    ///
    /// Returns a [`Failure`] of kind [`ErrorKind::Validation`] for an
    /// unpublishable draft or unreadable image, and [`ErrorKind::Persistence`]
    /// when the repository fails or panics.
    pub async fn publish(&self, draft: &CourseDraft, author_id: &str) -> Outcome<Uuid> {
        tracing::debug!(author_id, stage = %PublishStage::Validating, "publish requested");
        if let Err(failure) = validate(draft, &self.limits) {
            return Err(self.failed(failure));
        }

        tracing::debug!(author_id, stage = %PublishStage::PreparingAssets, "draft valid");
        let assets = prepare_assets(draft, self.compressor.as_ref(), &self.compression)
            .await
            .map_err(|failure| self.failed(failure))?;
        let degraded = assets.iter().filter(|a| a.degraded).count();

        let submission = CourseSubmission {
            draft: draft.clone(),
            assets,
        };

        tracing::debug!(
            author_id,
            stage = %PublishStage::Publishing,
            assets = submission.assets.len(),
            degraded,
            "submitting course"
        );
        let created = AssertUnwindSafe(self.repository.create(&submission, author_id))
            .catch_unwind()
            .await;
        let course = match created {
            Ok(Ok(course)) => course,
            Ok(Err(e)) => {
                tracing::error!(author_id, error = %e, "course repository failed");
                return Err(self.failed(Failure::persistence(PERSISTENCE_FAILURE_MESSAGE)));
            }
            Err(panic) => {
                tracing::error!(
                    author_id,
                    panic = %panic_message(panic.as_ref()),
                    "course repository panicked"
                );
                return Err(self.failed(Failure::persistence(PERSISTENCE_FAILURE_MESSAGE)));
            }
        };

        if !self.store.remove(&self.draft_key) {
            tracing::warn!(
                key = %self.draft_key,
                course_id = %course.id,
                kind = %ErrorKind::StorageUnavailable,
                "course published but the saved draft could not be cleared"
            );
        }

        tracing::info!(
            author_id,
            course_id = %course.id,
            stage = %PublishStage::Published,
            "course published"
        );
        Ok(course.id)
    }

    /// Publish whatever draft is currently saved under the pipeline's key.
    ///
    /// Pending autosaves are flushed first so the latest edits are included.
    ///
    /// # Errors
    ///
    /// Returns a validation [`Failure`] when no saved draft exists, otherwise
    /// the same failures as [`PublishPipeline::publish`].
    pub async fn publish_saved(&self, author_id: &str) -> Outcome<Uuid> {
        self.store.flush();
        let Some(draft) = self.store.get::<CourseDraft>(&self.draft_key) else {
            return Err(self.failed(Failure::validation(
                "draft: there is no saved draft to publish",
            )));
        };
        self.publish(&draft, author_id).await
    }

    fn failed(&self, failure: Failure) -> Failure {
        tracing::info!(
            key = %self.draft_key,
            stage = %PublishStage::PublishFailed,
            kind = %failure.kind,
            message = %failure.message,
            "publish failed, draft kept"
        );
        failure
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
