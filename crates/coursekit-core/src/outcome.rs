//! Typed success/failure results shared by every fallible course operation.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Category of a failed operation.
///
/// `Validation` and `Persistence` reach the caller as [`Failure`]s.
/// `StorageUnavailable` and `AssetDegraded` are recovered where they occur and
/// only show up in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Persistence,
    StorageUnavailable,
    AssetDegraded,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation_error"),
            ErrorKind::Persistence => write!(f, "persistence_error"),
            ErrorKind::StorageUnavailable => write!(f, "storage_unavailable"),
            ErrorKind::AssetDegraded => write!(f, "asset_degraded"),
        }
    }
}

/// Failure side of an [`Outcome`]: a kind plus a message fit for the user.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind}: {message}")]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl Failure {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    #[must_use]
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Persistence, message)
    }
}

pub type Outcome<T> = Result<T, Failure>;
