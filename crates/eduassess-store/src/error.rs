//! Error types for assessment persistence.

use thiserror::Error;

/// Errors from the assessment store backends.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Record (de)serialization failure.
    #[error("store serialization failed: {0}")]
    Serialization(String),

    /// No record with the given id.
    #[error("assessment not found: {id}")]
    NotFound { id: String },
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
