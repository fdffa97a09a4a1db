//! Course draft model and the in-place edits the wizard steps apply to it.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
}

impl Position {
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// One stop of a course, in visit order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Unique within a course.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    /// `None` until geocoding succeeds. A missing position is a valid state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Local path or remote URL of the stop's photo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

impl Location {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: String::new(),
            position: None,
            image_ref: None,
        }
    }

    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    #[must_use]
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    #[must_use]
    pub fn with_image(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }
}

/// Errors from structural edits on a [`CourseDraft`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftEditError {
    #[error("a location with id '{0}' already exists in this course")]
    DuplicateLocationId(String),

    #[error("no location with id '{0}'")]
    LocationNotFound(String),

    #[error("index {index} is out of range for {len} locations")]
    IndexOutOfRange { index: usize, len: usize },
}

/// In-progress course state accumulated by the wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Deduplicated case-sensitively, insertion order kept.
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub budget: String,
    #[serde(default)]
    pub season: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_image_ref: Option<String>,
    /// Visit order. Never re-sorted implicitly.
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub content: String,
    #[serde(default = "Utc::now")]
    pub last_saved_at: DateTime<Utc>,
}

impl Default for CourseDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl CourseDraft {
    /// An empty draft, as created when the wizard starts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            tags: Vec::new(),
            duration: String::new(),
            budget: String::new(),
            season: String::new(),
            hero_image_ref: None,
            locations: Vec::new(),
            content: String::new(),
            last_saved_at: Utc::now(),
        }
    }

    /// Appends `tag` unless an identical tag is already present.
    ///
    /// Returns `true` if the tag was added.
    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if self.tags.contains(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    /// Drops repeated tags, keeping the first occurrence of each.
    ///
    /// Returns `true` if anything was removed.
    pub fn dedupe_tags(&mut self) -> bool {
        let before = self.tags.len();
        self.tags = dedupe(std::mem::take(&mut self.tags));
        self.tags.len() != before
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }

    /// Appends a stop at the end of the visit order.
    ///
    /// # Errors
    ///
    /// Returns [`DraftEditError::DuplicateLocationId`] if the id is taken.
    pub fn push_location(&mut self, location: Location) -> Result<(), DraftEditError> {
        let len = self.locations.len();
        self.insert_location(len, location)
    }

    /// Inserts a stop at `index`, shifting later stops back by one.
    ///
    /// # Errors
    ///
    /// Returns [`DraftEditError::IndexOutOfRange`] when `index > len` and
    /// [`DraftEditError::DuplicateLocationId`] if the id is taken.
    pub fn insert_location(
        &mut self,
        index: usize,
        location: Location,
    ) -> Result<(), DraftEditError> {
        let len = self.locations.len();
        if index > len {
            return Err(DraftEditError::IndexOutOfRange { index, len });
        }
        if self.location(&location.id).is_some() {
            return Err(DraftEditError::DuplicateLocationId(location.id));
        }
        self.locations.insert(index, location);
        Ok(())
    }

    /// Removes the stop with `id`; the remaining stops keep their order.
    ///
    /// # Errors
    ///
    /// Returns [`DraftEditError::LocationNotFound`] if no stop has that id.
    pub fn remove_location(&mut self, id: &str) -> Result<Location, DraftEditError> {
        let index = self
            .locations
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| DraftEditError::LocationNotFound(id.to_string()))?;
        Ok(self.locations.remove(index))
    }

    /// Moves the stop at `from` so it ends up at `to`.
    ///
    /// # Errors
    ///
    /// Returns [`DraftEditError::IndexOutOfRange`] if either index is invalid.
    pub fn move_location(&mut self, from: usize, to: usize) -> Result<(), DraftEditError> {
        let len = self.locations.len();
        for index in [from, to] {
            if index >= len {
                return Err(DraftEditError::IndexOutOfRange { index, len });
            }
        }
        let location = self.locations.remove(from);
        self.locations.insert(to, location);
        Ok(())
    }

    /// Attaches (or clears) the geocoded position of a stop.
    ///
    /// # Errors
    ///
    /// Returns [`DraftEditError::LocationNotFound`] if no stop has that id.
    pub fn set_position(
        &mut self,
        id: &str,
        position: Option<Position>,
    ) -> Result<(), DraftEditError> {
        let location = self
            .locations
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| DraftEditError::LocationNotFound(id.to_string()))?;
        location.position = position;
        Ok(())
    }

    #[must_use]
    pub fn location(&self, id: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_saved_at = now;
    }
}

fn dedupe(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(tags.len());
    tags.into_iter().filter(|t| seen.insert(t.clone())).collect()
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<String>::deserialize(deserializer).map(dedupe)
}

/// A course as stored by the repository after a successful publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedCourse {
    pub id: Uuid,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub duration: String,
    pub budget: String,
    pub season: String,
    pub hero_image_ref: Option<String>,
    pub locations: Vec<Location>,
    pub content: String,
}

impl PersistedCourse {
    /// Builds the stored record from a draft's fields.
    #[must_use]
    pub fn from_draft(
        id: Uuid,
        author_id: impl Into<String>,
        created_at: DateTime<Utc>,
        draft: &CourseDraft,
    ) -> Self {
        Self {
            id,
            author_id: author_id.into(),
            created_at,
            title: draft.title.clone(),
            description: draft.description.clone(),
            tags: draft.tags.clone(),
            duration: draft.duration.clone(),
            budget: draft.budget.clone(),
            season: draft.season.clone(),
            hero_image_ref: draft.hero_image_ref.clone(),
            locations: draft.locations.clone(),
            content: draft.content.clone(),
        }
    }
}
