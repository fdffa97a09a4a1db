//! A wizard session: one [`CourseDraft`] bound to one draft-store key.

use chrono::Utc;
use coursekit_core::{compute_geometry, CourseDraft, Geometry};

use crate::store::DraftStore;

/// Storage key of the single in-progress course draft.
pub const COURSE_DRAFT_KEY: &str = "course-draft";

#[derive(Debug)]
pub struct DraftSession {
    store: DraftStore,
    key: String,
    draft: CourseDraft,
    restored: bool,
}

impl DraftSession {
    /// Rehydrate the draft saved under `key`, or start an empty one.
    ///
    /// An unreadable saved draft is treated as absent.
    #[must_use]
    pub fn resume(store: DraftStore, key: impl Into<String>) -> Self {
        let key = key.into();
        let saved: Option<CourseDraft> = store.get(&key);
        let restored = saved.is_some();
        let draft = match saved {
            Some(draft) => {
                tracing::info!(
                    key = %key,
                    locations = draft.locations.len(),
                    last_saved_at = %draft.last_saved_at,
                    "restored course draft"
                );
                draft
            }
            None => {
                tracing::debug!(key = %key, "starting an empty course draft");
                CourseDraft::new()
            }
        };
        Self {
            store,
            key,
            draft,
            restored,
        }
    }

    /// Whether the session picked up a previously saved draft.
    #[must_use]
    pub fn was_restored(&self) -> bool {
        self.restored
    }

    #[must_use]
    pub fn draft(&self) -> &CourseDraft {
        &self.draft
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn store(&self) -> &DraftStore {
        &self.store
    }

    /// Apply one wizard edit and schedule an autosave.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut CourseDraft) -> R) -> R {
        let out = f(&mut self.draft);
        self.draft.touch(Utc::now());
        self.store.save_debounced(&self.key, &self.draft);
        out
    }

    /// Replace the whole draft, e.g. from an imported file.
    ///
    /// Repeated tags in `draft` are dropped.
    pub fn replace(&mut self, mut draft: CourseDraft) {
        draft.dedupe_tags();
        self.edit(|current| *current = draft);
    }

    #[must_use]
    pub fn geometry(&self) -> Geometry {
        compute_geometry(&self.draft.locations)
    }

    /// Write the draft immediately, bypassing the debounce window.
    pub fn save_now(&mut self) -> bool {
        self.draft.touch(Utc::now());
        self.store.save(&self.key, &self.draft)
    }

    /// Abandon the draft and delete its saved copy.
    pub fn discard(self) -> bool {
        self.store.remove(&self.key)
    }

    #[must_use]
    pub fn into_draft(self) -> CourseDraft {
        self.draft
    }
}
