//! `publish` command: wires the Postgres repository and the JPEG compressor
//! into a [`PublishPipeline`]. `show-course` reads a published course back.

use std::fmt::Write as _;
use std::sync::Arc;

use coursekit_core::{AppConfig, CourseRepository, PersistedCourse};
use coursekit_db::PgCourseRepository;
use coursekit_draft::DraftStore;
use coursekit_publish::{AssetCompressor, CompressionOptions, ImageCompressor, PublishPipeline};
use uuid::Uuid;

#[must_use]
pub fn compression_options(config: &AppConfig) -> CompressionOptions {
    CompressionOptions {
        max_size_mb: Some(config.image_max_size_mb),
        max_dimension: Some(config.image_max_dimension),
    }
}

/// Publish the draft saved under `key`.
///
/// # Errors
///
/// Returns an error if the database is not configured or unreachable, or
/// the publish [`coursekit_core::Failure`] when the pipeline rejects the draft.
pub async fn run_publish(
    config: &AppConfig,
    store: &DraftStore,
    key: &str,
    author_id: &str,
) -> anyhow::Result<Uuid> {
    let pool = coursekit_db::connect_pool_from_config(config).await?;
    coursekit_db::run_migrations(&pool).await?;

    let repository: Arc<dyn CourseRepository> = Arc::new(PgCourseRepository::new(pool));
    let compressor: Arc<dyn AssetCompressor> = Arc::new(ImageCompressor::default());
    let pipeline = PublishPipeline::new(repository, compressor, store.clone())
        .with_draft_key(key)
        .with_limits(config.validation_limits())
        .with_compression(compression_options(config));

    let course_id = pipeline.publish_saved(author_id).await?;
    Ok(course_id)
}

/// Load a published course by its public id.
///
/// # Errors
///
/// Returns an error if the database is not configured or unreachable, or
/// [`coursekit_db::DbError::NotFound`] if no course has that id.
pub async fn run_show_course(config: &AppConfig, id: Uuid) -> anyhow::Result<String> {
    let pool = coursekit_db::connect_pool_from_config(config).await?;
    let course = coursekit_db::require_course(&pool, id).await?;
    Ok(render_course(&course))
}

pub fn render_course(course: &PersistedCourse) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", course.title, course.id);
    let _ = writeln!(
        out,
        "by {} on {}",
        course.author_id,
        course.created_at.format("%Y-%m-%d %H:%M UTC")
    );
    if !course.tags.is_empty() {
        let _ = writeln!(out, "tags: {}", course.tags.join(", "));
    }
    for (i, loc) in course.locations.iter().enumerate() {
        let image = loc.image_ref.as_deref().unwrap_or("no image");
        let _ = writeln!(out, "  {}. {} [{}] ({image})", i + 1, loc.name, loc.id);
    }
    out.trim_end().to_string()
}
