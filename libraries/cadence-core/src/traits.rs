//! Collaborator traits
//!
//! The playback crate talks to storage and to the platform audio engine only
//! through these traits, so it has no dependency on SQLite or on any
//! particular player implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::order_map::OrderMap;
use crate::types::{ConfigFlags, PlaylistConfig, PlaylistConfigId, QueueCursor, TrackId};

/// A single atomic write issued by the queue manager
///
/// Everything present in the commit is written in one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueCommit {
    pub cursor: Option<QueueCursor>,
    pub order_map: Option<(PlaylistConfigId, OrderMap)>,
    pub flags: Option<(PlaylistConfigId, ConfigFlags)>,
}

impl QueueCommit {
    pub fn cursor(cursor: QueueCursor) -> Self {
        Self {
            cursor: Some(cursor),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_order_map(mut self, config_id: PlaylistConfigId, order_map: OrderMap) -> Self {
        self.order_map = Some((config_id, order_map));
        self
    }

    #[must_use]
    pub fn with_flags(mut self, config_id: PlaylistConfigId, flags: ConfigFlags) -> Self {
        self.flags = Some((config_id, flags));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.is_none() && self.order_map.is_none() && self.flags.is_none()
    }
}

/// Durable backing of the queue state machine
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Read the singleton cursor row
    async fn load_cursor(&self) -> Result<QueueCursor>;

    /// Read a playlist config, `None` if it does not exist
    async fn load_config(&self, id: PlaylistConfigId) -> Result<Option<PlaylistConfig>>;

    /// Apply a commit atomically
    async fn commit(&self, commit: QueueCommit) -> Result<()>;
}

/// Track descriptor handed to the playback engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineTrack {
    pub id: TrackId,
    pub url: String,
    pub title: String,
    pub artist: String,
    pub duration_ms: i64,
    pub artwork: Option<String>,
}

/// Library lookups needed while driving the engine
#[async_trait]
pub trait PlaybackCatalog: Send + Sync {
    /// Resolve ids to engine descriptors, preserving order
    ///
    /// # Errors
    /// Returns `NotFound` if any id no longer exists
    async fn resolve_tracks(&self, ids: &[TrackId]) -> Result<Vec<EngineTrack>>;

    /// Append `track_id` to the listening history
    ///
    /// `active_config` is the config currently loaded in the queue.
    async fn record_history(
        &self,
        track_id: TrackId,
        active_config: Option<PlaylistConfigId>,
    ) -> Result<()>;
}

/// Engine-reported playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnginePlaybackState {
    None,
    Ready,
    Playing,
    Paused,
    Stopped,
    Buffering,
    Error,
}

/// Inbound notifications from the playback engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// The engine moved to the track at `index` of its own queue
    TrackChanged { index: usize },

    /// The engine played past its last track
    QueueEnded,

    /// Play/pause/buffering transitions
    PlaybackStateChanged(EnginePlaybackState),

    /// Periodic position report for the current track
    Progress { millis: u64 },
}

/// The external audio player
///
/// Decoding and output live behind this trait; the core only issues commands.
#[async_trait]
pub trait PlaybackEngine: Send + Sync {
    /// Drop every queued track
    async fn reset(&self) -> Result<()>;

    /// Append tracks to the engine queue
    async fn load(&self, tracks: Vec<EngineTrack>) -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn seek_to(&self, millis: u64) -> Result<()>;

    async fn skip_to(&self, index: usize) -> Result<()>;

    async fn remove(&self, index: usize) -> Result<()>;
}

/// Opaque daily-quote fetcher, returns `(text, author)`
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_quote(&self) -> Result<(String, String)>;
}
