//! Debounced, key-scoped JSON cache over a [`KeyValueStorage`] medium.
//!
//! Every write for a key, immediate or debounced, happens while holding the
//! pending-writes lock. A debounced write only commits if its generation is
//! still the latest one scheduled for that key, so an older value can never
//! land after a newer one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use coursekit_core::ErrorKind;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::storage::KeyValueStorage;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Client-local draft cache.
///
/// Cheap to clone; clones share the medium and the pending-write table.
#[derive(Clone)]
pub struct DraftStore {
    inner: Arc<Inner>,
}

struct Inner {
    storage: Option<Arc<dyn KeyValueStorage>>,
    debounce: Duration,
    pending: Mutex<HashMap<String, PendingWrite>>,
    next_generation: AtomicU64,
}

struct PendingWrite {
    generation: u64,
    payload: String,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for DraftStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftStore")
            .field("available", &self.is_available())
            .field("debounce", &self.inner.debounce)
            .finish_non_exhaustive()
    }
}

impl DraftStore {
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::build(Some(storage), DEFAULT_DEBOUNCE)
    }

    #[must_use]
    pub fn with_debounce(storage: Arc<dyn KeyValueStorage>, debounce: Duration) -> Self {
        Self::build(Some(storage), debounce)
    }

    /// A store with no persistent medium. Writes report `false`, reads `None`.
    #[must_use]
    pub fn unavailable() -> Self {
        Self::build(None, DEFAULT_DEBOUNCE)
    }

    fn build(storage: Option<Arc<dyn KeyValueStorage>>, debounce: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                storage,
                debounce,
                pending: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.inner.storage.is_some()
    }

    #[must_use]
    pub fn debounce(&self) -> Duration {
        self.inner.debounce
    }

    /// Serialize `value` and write it now, replacing any pending debounced
    /// write for `key`.
    ///
    /// Returns `false` when the value does not serialize or the medium is
    /// absent or failing. A `false` means the draft is not guaranteed durable.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        let Some(payload) = serialize(key, value) else {
            return false;
        };
        let Some(mut pending) = self.inner.lock_pending() else {
            return self.inner.write(key, &payload);
        };
        if let Some(previous) = pending.remove(key) {
            previous.task.abort();
        }
        self.inner.write(key, &payload)
    }

    /// Schedule a write of `value` once `key` has been quiet for the debounce
    /// window. A later call for the same key within the window replaces this
    /// value and restarts the window.
    ///
    /// Returns `false` only if the value does not serialize. Outside a tokio
    /// runtime the value is written immediately instead.
    pub fn save_debounced<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        let Some(payload) = serialize(key, value) else {
            return false;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(key, "no async runtime, saving draft immediately");
            self.inner.write(key, &payload);
            return true;
        };
        let Some(mut pending) = self.inner.lock_pending() else {
            self.inner.write(key, &payload);
            return true;
        };

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::clone(&self.inner);
        let task_key = key.to_string();
        let delay = self.inner.debounce;
        // The task blocks on the pending lock until the entry below is inserted.
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            inner.commit_if_current(&task_key, generation);
        });

        let write = PendingWrite {
            generation,
            payload,
            task,
        };
        if let Some(previous) = pending.insert(key.to_string(), write) {
            previous.task.abort();
        }
        true
    }

    /// Read and deserialize the value stored under `key`.
    ///
    /// Absent keys, an absent medium, read errors and undeserializable data
    /// all yield `None`.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let storage = self.inner.storage.as_ref()?;
        let raw = match storage.get_item(key) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key, kind = %ErrorKind::StorageUnavailable, error = %e, "draft read failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "stored draft could not be deserialized, ignoring it");
                None
            }
        }
    }

    #[must_use]
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Delete `key` and cancel its pending debounced write, if any.
    pub fn remove(&self, key: &str) -> bool {
        if let Some(mut pending) = self.inner.lock_pending() {
            if let Some(previous) = pending.remove(key) {
                previous.task.abort();
            }
        }
        let Some(storage) = self.inner.storage.as_ref() else {
            return false;
        };
        match storage.remove_item(key) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, kind = %ErrorKind::StorageUnavailable, error = %e, "draft remove failed");
                false
            }
        }
    }

    /// Delete every entry and cancel all pending debounced writes.
    pub fn clear(&self) -> bool {
        if let Some(mut pending) = self.inner.lock_pending() {
            for (_, previous) in pending.drain() {
                previous.task.abort();
            }
        }
        let Some(storage) = self.inner.storage.as_ref() else {
            return false;
        };
        match storage.clear() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(kind = %ErrorKind::StorageUnavailable, error = %e, "draft clear failed");
                false
            }
        }
    }

    /// Commit every pending debounced write now.
    ///
    /// Returns `true` if all of them reached storage.
    pub fn flush(&self) -> bool {
        let Some(mut pending) = self.inner.lock_pending() else {
            return false;
        };
        let mut all_ok = true;
        for (key, write) in pending.drain() {
            write.task.abort();
            all_ok &= self.inner.write(&key, &write.payload);
        }
        all_ok
    }

    /// Keys with a debounced write still waiting for its window, sorted.
    #[must_use]
    pub fn pending_keys(&self) -> Vec<String> {
        let Some(pending) = self.inner.lock_pending() else {
            return Vec::new();
        };
        let mut keys: Vec<String> = pending.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Inner {
    fn lock_pending(&self) -> Option<MutexGuard<'_, HashMap<String, PendingWrite>>> {
        match self.pending.lock() {
            Ok(guard) => Some(guard),
            Err(_) => {
                tracing::error!("draft pending-write table poisoned");
                None
            }
        }
    }

    fn commit_if_current(&self, key: &str, generation: u64) {
        let Some(mut pending) = self.lock_pending() else {
            return;
        };
        if pending.get(key).map(|w| w.generation) != Some(generation) {
            return;
        }
        if let Some(write) = pending.remove(key) {
            self.write(key, &write.payload);
        }
    }

    fn write(&self, key: &str, payload: &str) -> bool {
        let Some(storage) = self.storage.as_ref() else {
            tracing::debug!(key, kind = %ErrorKind::StorageUnavailable, "no persistent storage, draft not saved");
            return false;
        };
        match storage.set_item(key, payload) {
            Ok(()) => {
                tracing::trace!(key, bytes = payload.len(), "draft saved");
                true
            }
            Err(e) => {
                tracing::warn!(key, kind = %ErrorKind::StorageUnavailable, error = %e, "draft save failed");
                false
            }
        }
    }
}

fn serialize<T: Serialize + ?Sized>(key: &str, value: &T) -> Option<String> {
    match serde_json::to_string(value) {
        Ok(payload) => Some(payload),
        Err(e) => {
            tracing::warn!(key, error = %e, "draft value is not serializable");
            None
        }
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
