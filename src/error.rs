use std::path::{Path, PathBuf};

use thiserror::Error;

/// Why a script descriptor was refused by the registry.
///
/// The framework logs these and leaves the registry untouched; callers are
/// free to ignore the value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("Script registration failed: {0} is required")]
    MissingField(&'static str),

    #[error("Script with id \"{0}\" already registered")]
    DuplicateId(String),

    #[error("Script \"{script}\": select setting \"{key}\" declares no options")]
    EmptySelectOptions { script: String, key: String },
}

/// Failure of a dependency load. `Clone` because one in-flight fetch is
/// shared by every caller waiting on the same name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    #[error("Unknown dependency: {0}")]
    Unknown(String),

    #[error("Network error loading {name}: {reason}")]
    Network { name: String, reason: String },

    #[error("Failed to load {name}: {reason}")]
    Evaluation { name: String, reason: String },

    #[error("Checksum mismatch for {name}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        name: String,
        expected: String,
        actual: String,
    },
}

/// Config and file-store I/O errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{path}: {reason}")]
    InvalidFile { path: PathBuf, reason: String },
}

impl Error {
    #[must_use]
    pub fn invalid_file(path: &Path, reason: impl Into<String>) -> Self {
        Self::InvalidFile {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
