//! Track types

use serde::{Deserialize, Serialize};

use super::ids::{ArtistId, TrackId};

/// Where an imported track came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Platform {
    #[default]
    None,
    Spotify,
    Soundcloud,
    Youtube,
}

impl Platform {
    /// Convert to the persisted string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Spotify => "SPOTIFY",
            Self::Soundcloud => "SOUNDCLOUD",
            Self::Youtube => "YOUTUBE",
        }
    }

    /// Parse from the persisted string representation
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "NONE" => Some(Self::None),
            "SPOTIFY" => Some(Self::Spotify),
            "SOUNDCLOUD" => Some(Self::Soundcloud),
            "YOUTUBE" => Some(Self::Youtube),
            _ => None,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An imported track
///
/// `file_uri` is a natural key: the same audio source is never imported twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub cover_uri: Option<String>,
    pub file_uri: String,
    /// Duration in milliseconds
    pub millis: i64,
    pub favorite: bool,
    pub platform: Platform,
    pub artist_id: ArtistId,
}

/// Data for importing a new track
///
/// The artist is referenced by name and resolved (or created) on import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTrack {
    pub title: String,
    pub file_uri: String,
    pub artist_name: String,
    pub platform: Platform,
    pub millis: i64,
    pub cover_uri: Option<String>,
}

/// Metadata edit for an existing track (only provided fields change)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTrack {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// `Some(None)` clears the cover
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_uri: Option<Option<String>>,

    /// Re-resolves the artist by name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub millis: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
}

impl UpdateTrack {
    /// Whether the edit changes nothing
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.cover_uri.is_none()
            && self.artist_name.is_none()
            && self.millis.is_none()
            && self.platform.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_string_round_trip() {
        for platform in [
            Platform::None,
            Platform::Spotify,
            Platform::Soundcloud,
            Platform::Youtube,
        ] {
            assert_eq!(Platform::from_str(platform.as_str()), Some(platform));
        }
        assert_eq!(Platform::from_str("bandcamp"), None);
    }

    #[test]
    fn empty_update_detected() {
        assert!(UpdateTrack::default().is_empty());
        let update = UpdateTrack {
            cover_uri: Some(None),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
