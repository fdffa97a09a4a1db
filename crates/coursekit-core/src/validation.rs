//! Publishability rules for a [`CourseDraft`].

use std::collections::HashSet;

use crate::draft::CourseDraft;
use crate::outcome::{Failure, Outcome};

pub const DEFAULT_MAX_TITLE_CHARS: usize = 100;
pub const DEFAULT_MAX_DESCRIPTION_CHARS: usize = 2000;
pub const DEFAULT_MAX_LOCATIONS: usize = 30;

/// Upper bounds enforced by [`validate`]. Lengths count Unicode scalar values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationLimits {
    pub max_title_chars: usize,
    pub max_description_chars: usize,
    pub max_locations: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_title_chars: DEFAULT_MAX_TITLE_CHARS,
            max_description_chars: DEFAULT_MAX_DESCRIPTION_CHARS,
            max_locations: DEFAULT_MAX_LOCATIONS,
        }
    }
}

/// Check that `draft` can be published.
///
/// Rules run in a fixed order and the first violation is returned:
/// title, description, at least one location, location count, unique
/// location ids, tags.
///
/// # Errors
///
/// Returns a [`Failure`] with [`crate::ErrorKind::Validation`] whose message
/// names the offending field.
pub fn validate(draft: &CourseDraft, limits: &ValidationLimits) -> Outcome<()> {
    check_text("title", &draft.title, limits.max_title_chars)?;
    check_text("description", &draft.description, limits.max_description_chars)?;

    if draft.locations.is_empty() {
        return Err(Failure::validation("locations: add at least one location"));
    }
    if draft.locations.len() > limits.max_locations {
        return Err(Failure::validation(format!(
            "locations: at most {} locations are allowed (got {})",
            limits.max_locations,
            draft.locations.len()
        )));
    }

    let mut ids = HashSet::with_capacity(draft.locations.len());
    if let Some(dup) = draft.locations.iter().find(|l| !ids.insert(l.id.as_str())) {
        return Err(Failure::validation(format!(
            "locations: duplicate id '{}'",
            dup.id
        )));
    }

    if let Some(index) = draft.tags.iter().position(|t| t.trim().is_empty()) {
        return Err(Failure::validation(format!(
            "tags: tag #{} is empty",
            index + 1
        )));
    }

    Ok(())
}

fn check_text(field: &str, value: &str, max_chars: usize) -> Outcome<()> {
    if value.trim().is_empty() {
        return Err(Failure::validation(format!("{field}: must not be empty")));
    }
    let len = value.chars().count();
    if len > max_chars {
        return Err(Failure::validation(format!(
            "{field}: must be at most {max_chars} characters (got {len})"
        )));
    }
    Ok(())
}
