//! Outcome types for queue operations

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a reorder request was refused
///
/// These are user-facing warnings, not failures: the queue is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum QueueWarning {
    #[error("Nothing is loaded in the queue")]
    NotLoaded,

    #[error("Position {position} is outside the queue (length {len})")]
    OutOfRange { position: usize, len: usize },

    #[error("The currently playing track cannot be moved")]
    CurrentTrackImmovable,

    #[error("Tracks cannot be moved across the currently playing track")]
    CrossesCurrentTrack,
}

/// Result of a reorder request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReorderOutcome {
    /// The move was persisted and published
    Applied,

    /// The move was refused and nothing changed
    Rejected(QueueWarning),
}

impl ReorderOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}
