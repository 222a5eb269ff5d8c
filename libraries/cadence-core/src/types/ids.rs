//! Row identifiers
//!
//! All entities use SQLite `INTEGER PRIMARY KEY AUTOINCREMENT` ids.

pub type ArtistId = i64;
pub type TrackId = i64;
pub type PlaylistId = i64;
pub type PlaylistConfigId = i64;
pub type PlaylistContentId = i64;

/// Persisted `playlist_config_id` of a queue with nothing loaded
pub const NO_CONFIG: PlaylistConfigId = -1;
