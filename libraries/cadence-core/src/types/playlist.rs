//! Playlist, playlist config and link types

use serde::{Deserialize, Serialize};

use super::ids::{PlaylistConfigId, PlaylistContentId, PlaylistId, TrackId};
use crate::order_map::OrderMap;

/// Title of the hidden playlist that records listening history
pub const HISTORY_PLAYLIST_TITLE: &str = "__history__";

/// Title of the hidden playlist reserved for favorites
pub const FAVORITES_PLAYLIST_TITLE: &str = "__favorites__";

/// System playlist titles, excluded from user-facing listings
pub const RESERVED_PLAYLIST_TITLES: [&str; 2] = [HISTORY_PLAYLIST_TITLE, FAVORITES_PLAYLIST_TITLE];

/// Whether `title` names a system playlist
pub fn is_reserved_title(title: &str) -> bool {
    RESERVED_PLAYLIST_TITLES.contains(&title)
}

/// A playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: PlaylistId,
    pub title: String,
    pub description: String,
    pub cover_uri: Option<String>,
    pub favorite: bool,
}

/// Data for creating a new playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePlaylist {
    pub title: String,
    pub description: String,
    pub cover_uri: Option<String>,
}

impl CreatePlaylist {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            cover_uri: None,
        }
    }
}

/// Edit for an existing playlist (only provided fields change)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePlaylist {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_uri: Option<Option<String>>,
}

/// Playback flags of a playlist config
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFlags {
    pub is_looping: bool,
    pub is_shuffling: bool,
    pub is_reversing: bool,
}

/// Per-playlist playback configuration, 1:1 with [`Playlist`]
///
/// `order_map` is the source of truth for play order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistConfig {
    pub id: PlaylistConfigId,
    pub playlist_id: PlaylistId,
    pub order_map: OrderMap,
    pub flags: ConfigFlags,
}

/// Track membership in a playlist, independent of order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistContent {
    pub id: PlaylistContentId,
    pub playlist_id: PlaylistId,
    pub track_id: TrackId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_titles() {
        assert!(is_reserved_title(HISTORY_PLAYLIST_TITLE));
        assert!(is_reserved_title(FAVORITES_PLAYLIST_TITLE));
        assert!(!is_reserved_title("Road trip"));
        assert!(!is_reserved_title("__History__"));
    }
}
