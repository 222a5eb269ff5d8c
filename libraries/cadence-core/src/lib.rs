//! Cadence Core
//!
//! Platform-agnostic types, traits, and error handling for the Cadence
//! playback-queue and persistence core.
//!
//! This crate provides the building blocks shared by the storage, playback
//! and library crates.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `Playlist`, `PlaylistConfig`, `QueueCursor`, etc.
//! - **Order Maps**: the persisted play order of a playlist config and its
//!   packed text encoding
//! - **Collaborator Traits**: `QueueStore`, `PlaybackCatalog`, `PlaybackEngine`,
//!   `QuoteSource`
//! - **Reactive Projection**: subscribable snapshots for the UI layer
//! - **Error Handling**: unified `CadenceError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use cadence_core::OrderMap;
//!
//! let map: OrderMap = "3,1,2".parse().unwrap();
//! assert_eq!(map.as_slice(), &[3, 1, 2]);
//! assert_eq!(map.to_string(), "3,1,2");
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod order_map;
pub mod projection;
pub mod traits;
pub mod types;
pub mod validation;

pub use error::{CadenceError, Result};
pub use order_map::OrderMap;
pub use projection::{Projection, Subscription};
pub use traits::{
    EngineEvent, EnginePlaybackState, EngineTrack, PlaybackCatalog, PlaybackEngine, QueueCommit,
    QueueStore, QuoteSource,
};
pub use validation::{FieldErrors, Validate};

pub use types::{
    is_reserved_title, Artist, ArtistId, ConfigFlags, CreatePlaylist, NewTrack, PlayMode,
    Platform, Playlist, PlaylistConfig, PlaylistConfigId, PlaylistContent, PlaylistContentId,
    PlaylistId, QueueCursor, QueueSnapshot, QueueStatus, Quote, Track, TrackId, UpdatePlaylist,
    UpdateTrack, FAVORITES_PLAYLIST_TITLE, HISTORY_PLAYLIST_TITLE, NO_CONFIG,
    RESERVED_PLAYLIST_TITLES,
};
