use thiserror::Error;

/// Errors that can occur within the schedule store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A nested JSON column failed to round-trip.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Asset file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No schedule with the given ID exists in the store.
    #[error("Schedule not found: {id}")]
    NotFound { id: String },

    /// The record is malformed and was rejected before reaching the loop.
    #[error("Invalid schedule: {0}")]
    Validation(String),

    /// An asset path pointing outside the announcements directory.
    #[error("Invalid asset path: {path}")]
    InvalidAssetPath { path: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;
