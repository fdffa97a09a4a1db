//! Client-local draft persistence for the course wizard.
//!
//! [`DraftStore`] caches JSON values per key over a [`KeyValueStorage`]
//! medium with debounced writes; [`DraftSession`] binds one course draft to a
//! key and autosaves every edit.

pub mod error;
pub mod session;
pub mod storage;
pub mod store;

pub use error::StorageError;
pub use session::{DraftSession, COURSE_DRAFT_KEY};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use store::{DraftStore, DEFAULT_DEBOUNCE};
