//! Database operations for the `courses`, `course_locations` and
//! `course_assets` tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coursekit_core::{
    AssetRole, CourseRepository, CourseSubmission, Location, PersistedCourse, Position,
    RepositoryError,
};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `courses` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CourseRow {
    pub id: i64,
    pub public_id: Uuid,
    pub author_id: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub duration: String,
    pub budget: String,
    pub season: String,
    pub hero_image_ref: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A row from the `course_locations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CourseLocationRow {
    pub position: i32,
    pub location_key: String,
    pub name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image_ref: Option<String>,
}

impl CourseLocationRow {
    fn into_location(self) -> Location {
        let position = match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(Position::new(lat, lng)),
            _ => None,
        };
        Location {
            id: self.location_key,
            name: self.name,
            address: self.address,
            position,
            image_ref: self.image_ref,
        }
    }
}

impl CourseRow {
    /// Combine the course row with its ordered locations.
    #[must_use]
    pub fn into_persisted(self, locations: Vec<CourseLocationRow>) -> PersistedCourse {
        PersistedCourse {
            id: self.public_id,
            author_id: self.author_id,
            created_at: self.created_at,
            title: self.title,
            description: self.description,
            tags: self.tags,
            duration: self.duration,
            budget: self.budget,
            season: self.season,
            hero_image_ref: self.hero_image_ref,
            locations: locations
                .into_iter()
                .map(CourseLocationRow::into_location)
                .collect(),
            content: self.content,
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Insert a course with its locations and assets in a single transaction.
///
/// Nothing is committed unless every row is written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails, or
/// [`DbError::OutOfRange`] if the course has more stops than fit in an `INTEGER`.
pub async fn insert_course(
    pool: &PgPool,
    submission: &CourseSubmission,
    author_id: &str,
) -> Result<PersistedCourse, DbError> {
    let draft = &submission.draft;
    let mut tx = pool.begin().await?;

    let course = sqlx::query_as::<_, CourseRow>(
        "INSERT INTO courses \
             (public_id, author_id, title, description, tags, duration, budget, season, \
              hero_image_ref, content) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING id, public_id, author_id, title, description, tags, duration, budget, \
                   season, hero_image_ref, content, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(author_id)
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(&draft.tags)
    .bind(&draft.duration)
    .bind(&draft.budget)
    .bind(&draft.season)
    .bind(&draft.hero_image_ref)
    .bind(&draft.content)
    .fetch_one(&mut *tx)
    .await?;

    insert_locations(&mut tx, course.id, &draft.locations).await?;

    for asset in &submission.assets {
        let location_key = match &asset.role {
            AssetRole::Hero => None,
            AssetRole::Location(id) => Some(id.as_str()),
        };
        sqlx::query(
            "INSERT INTO course_assets \
                 (course_id, role, location_key, source_ref, file_name, content_type, bytes, degraded) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(course.id)
        .bind(if location_key.is_some() { "location" } else { "hero" })
        .bind(location_key)
        .bind(&asset.source_ref)
        .bind(&asset.file_name)
        .bind(&asset.content_type)
        .bind(&asset.bytes)
        .bind(asset.degraded)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        course_id = %course.public_id,
        author_id,
        locations = draft.locations.len(),
        assets = submission.assets.len(),
        "course inserted"
    );

    Ok(PersistedCourse::from_draft(
        course.public_id,
        course.author_id,
        course.created_at,
        draft,
    ))
}

async fn insert_locations(
    tx: &mut Transaction<'_, Postgres>,
    course_id: i64,
    locations: &[Location],
) -> Result<(), DbError> {
    if locations.is_empty() {
        return Ok(());
    }

    // Parallel column vectors for UNNEST binding.
    let mut positions: Vec<i32> = Vec::with_capacity(locations.len());
    let mut keys: Vec<String> = Vec::with_capacity(locations.len());
    let mut names: Vec<String> = Vec::with_capacity(locations.len());
    let mut addresses: Vec<String> = Vec::with_capacity(locations.len());
    let mut latitudes: Vec<Option<f64>> = Vec::with_capacity(locations.len());
    let mut longitudes: Vec<Option<f64>> = Vec::with_capacity(locations.len());
    let mut image_refs: Vec<Option<String>> = Vec::with_capacity(locations.len());

    for (index, loc) in locations.iter().enumerate() {
        let position = i32::try_from(index).map_err(|_| DbError::OutOfRange {
            column: "course_locations.position",
            value: index,
        })?;
        positions.push(position);
        keys.push(loc.id.clone());
        names.push(loc.name.clone());
        addresses.push(loc.address.clone());
        latitudes.push(loc.position.map(|p| p.lat));
        longitudes.push(loc.position.map(|p| p.lng));
        image_refs.push(loc.image_ref.clone());
    }

    sqlx::query(
        "INSERT INTO course_locations \
             (course_id, position, location_key, name, address, latitude, longitude, image_ref) \
         SELECT $1, * FROM UNNEST(\
              $2::int4[], $3::text[], $4::text[], $5::text[], \
              $6::float8[], $7::float8[], $8::text[])",
    )
    .bind(course_id)
    .bind(&positions)
    .bind(&keys)
    .bind(&names)
    .bind(&addresses)
    .bind(&latitudes)
    .bind(&longitudes)
    .bind(&image_refs)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Returns a course with its locations in visit order, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either query fails.
pub async fn get_course(pool: &PgPool, public_id: Uuid) -> Result<Option<PersistedCourse>, DbError> {
    let Some(course) = sqlx::query_as::<_, CourseRow>(
        "SELECT id, public_id, author_id, title, description, tags, duration, budget, \
                season, hero_image_ref, content, created_at \
         FROM courses \
         WHERE public_id = $1",
    )
    .bind(public_id)
    .fetch_optional(pool)
    .await?
    else {
        return Ok(None);
    };

    let locations = sqlx::query_as::<_, CourseLocationRow>(
        "SELECT position, location_key, name, address, latitude, longitude, image_ref \
         FROM course_locations \
         WHERE course_id = $1 \
         ORDER BY position",
    )
    .bind(course.id)
    .fetch_all(pool)
    .await?;

    Ok(Some(course.into_persisted(locations)))
}

/// Like [`get_course`], but a missing course is an error.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no course has `public_id`, or
/// [`DbError::Sqlx`] if a query fails.
pub async fn require_course(pool: &PgPool, public_id: Uuid) -> Result<PersistedCourse, DbError> {
    get_course(pool, public_id)
        .await?
        .ok_or(DbError::NotFound(public_id))
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// [`CourseRepository`] backed by Postgres.
#[derive(Debug, Clone)]
pub struct PgCourseRepository {
    pool: PgPool,
}

impl PgCourseRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CourseRepository for PgCourseRepository {
    async fn create(
        &self,
        submission: &CourseSubmission,
        author_id: &str,
    ) -> Result<PersistedCourse, RepositoryError> {
        insert_course(&self.pool, submission, author_id)
            .await
            .map_err(RepositoryError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location_row(lat: Option<f64>, lng: Option<f64>) -> CourseLocationRow {
        CourseLocationRow {
            position: 0,
            location_key: "bridge".to_string(),
            name: "Banpo Bridge".to_string(),
            address: String::new(),
            latitude: lat,
            longitude: lng,
            image_ref: None,
        }
    }

    #[test]
    fn location_row_with_both_coordinates_has_position() {
        let loc = location_row(Some(37.5), Some(127.0)).into_location();
        assert_eq!(loc.position, Some(Position::new(37.5, 127.0)));
        assert_eq!(loc.id, "bridge");
    }

    #[test]
    fn location_row_with_missing_coordinate_has_no_position() {
        assert_eq!(location_row(Some(37.5), None).into_location().position, None);
        assert_eq!(location_row(None, None).into_location().position, None);
    }
}
