/// Core error types for Cadence
use thiserror::Error;

use crate::types::{PlaylistId, TrackId};
use crate::validation::FieldErrors;

/// Result type alias using `CadenceError`
pub type Result<T> = std::result::Result<T, CadenceError>;

/// Core error type for Cadence
#[derive(Error, Debug)]
pub enum CadenceError {
    /// A uniqueness or foreign-key constraint rejected the write
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Malformed input, rejected before any I/O
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Referenced entity is absent
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A track with the same file URI is already imported
    #[error("Track already imported: {file_uri}")]
    DuplicateTrack { file_uri: String },

    /// The track is already linked to the playlist
    #[error("Track {track_id} is already in playlist {playlist_id}")]
    DuplicateLink {
        playlist_id: PlaylistId,
        track_id: TrackId,
    },

    /// A destructive operation was invoked without the caller confirming it
    #[error("Confirmation required for {0}")]
    ConfirmationRequired(&'static str),

    /// Field-level validation failures
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// Storage-layer failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database engine failure
    #[error("Database error: {0}")]
    Database(String),

    /// Playback engine failure
    #[error("Engine error: {0}")]
    Engine(String),

    /// Persisted data could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The queue manager task is no longer running
    #[error("Queue manager is not running")]
    QueueUnavailable,
}

impl CadenceError {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create an engine error
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Whether this error means the referenced entity does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for CadenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "sqlx-support")]
impl From<sqlx::Error> for CadenceError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db)
                if db.is_unique_violation()
                    || db.is_foreign_key_violation()
                    || db.is_check_violation() =>
            {
                Self::ConstraintViolation(db.message().to_string())
            }
            _ => Self::Database(err.to_string()),
        }
    }
}
