use std::path::PathBuf;

use thiserror::Error;

/// Failures of a [`crate::KeyValueStorage`] medium.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage lock poisoned")]
    Poisoned,
}
