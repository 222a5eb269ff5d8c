/// Storage-specific errors
use thiserror::Error;

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database connection error
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Schema creation error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Database error from `SQLx`
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// Domain-level failure while opening the store
    #[error(transparent)]
    Core(#[from] cadence_core::CadenceError),
}

impl From<StorageError> for cadence_core::CadenceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Core(inner) => inner,
            StorageError::Database(inner) => inner.into(),
            other => cadence_core::CadenceError::storage(other.to_string()),
        }
    }
}
