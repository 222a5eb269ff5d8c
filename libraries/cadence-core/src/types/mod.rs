mod artist;
mod ids;
mod playlist;
mod queue;
mod quote;
mod track;

pub use artist::Artist;
pub use ids::{
    ArtistId, PlaylistConfigId, PlaylistContentId, PlaylistId, TrackId, NO_CONFIG,
};
pub use playlist::{
    is_reserved_title, ConfigFlags, CreatePlaylist, Playlist, PlaylistConfig, PlaylistContent,
    UpdatePlaylist, FAVORITES_PLAYLIST_TITLE, HISTORY_PLAYLIST_TITLE, RESERVED_PLAYLIST_TITLES,
};
pub use queue::{PlayMode, QueueCursor, QueueSnapshot, QueueStatus};
pub use quote::Quote;
pub use track::{NewTrack, Platform, Track, UpdateTrack};
