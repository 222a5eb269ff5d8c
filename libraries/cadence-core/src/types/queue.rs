//! Queue cursor and queue read-model types

use serde::{Deserialize, Serialize};

use super::ids::{PlaylistConfigId, TrackId};
use super::playlist::ConfigFlags;
use crate::order_map::OrderMap;

/// How a playlist should be started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    /// Play the persisted order as is
    #[default]
    Simple,

    /// Randomize the order
    Shuffle,

    /// Play the order backwards
    Reverse,
}

/// The durable playback cursor (the singleton `queue` row)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCursor {
    pub current_index: usize,
    pub current_millis: u64,
    /// `None` when nothing is loaded (persisted as `-1`)
    pub playlist_config_id: Option<PlaylistConfigId>,
}

impl QueueCursor {
    /// The cursor of an empty queue
    pub const fn initial() -> Self {
        Self {
            current_index: 0,
            current_millis: 0,
            playlist_config_id: None,
        }
    }
}

impl Default for QueueCursor {
    fn default() -> Self {
        Self::initial()
    }
}

/// Queue state machine status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueStatus {
    /// No config loaded, empty order map
    Empty,

    /// Config loaded, non-empty order map, valid index
    Loaded,
}

/// Queue state as published to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub playlist_config_id: Option<PlaylistConfigId>,
    pub order_map: OrderMap,
    pub current_index: usize,
    pub current_millis: u64,
    pub flags: ConfigFlags,
    /// Bumped whenever the engine must be reloaded from scratch
    pub epoch: u64,
}

impl QueueSnapshot {
    /// Snapshot of an empty queue
    pub fn empty() -> Self {
        Self {
            playlist_config_id: None,
            order_map: OrderMap::new(),
            current_index: 0,
            current_millis: 0,
            flags: ConfigFlags::default(),
            epoch: 0,
        }
    }

    pub fn status(&self) -> QueueStatus {
        if self.playlist_config_id.is_some() && !self.order_map.is_empty() {
            QueueStatus::Loaded
        } else {
            QueueStatus::Empty
        }
    }

    /// Id of the track under the cursor
    pub fn current_track(&self) -> Option<TrackId> {
        match self.status() {
            QueueStatus::Loaded => self.order_map.get(self.current_index),
            QueueStatus::Empty => None,
        }
    }

    pub fn cursor(&self) -> QueueCursor {
        QueueCursor {
            current_index: self.current_index,
            current_millis: self.current_millis,
            playlist_config_id: self.playlist_config_id,
        }
    }
}

impl Default for QueueSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}
