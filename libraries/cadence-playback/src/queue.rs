//! Queue state machine
//!
//! `QueueMachine` owns the working order map and cursor. It never performs
//! I/O: every operation *plans* a transition, returning the next snapshot and
//! the [`QueueCommit`] that must be persisted before the snapshot is applied.
//! Operations that would change nothing plan nothing.
//!
//! States:
//! - `EMPTY`: no config, empty order map, cursor at the initial position
//! - `LOADED`: config set, non-empty order map, `current_index < len`

use cadence_core::{
    OrderMap, PlayMode, PlaylistConfig, PlaylistConfigId, QueueCommit, QueueCursor, QueueSnapshot,
    QueueStatus, TrackId,
};

use crate::shuffle::{reversed, shuffled};
use crate::types::QueueWarning;

/// A planned transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub next: QueueSnapshot,
    pub commit: QueueCommit,
}

#[derive(Debug, Clone, Default)]
pub struct QueueMachine {
    state: QueueSnapshot,
}

impl QueueMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &QueueSnapshot {
        &self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state.status() == QueueStatus::Loaded
    }

    /// Whether `config_id` is the loaded config
    pub fn is_active(&self, config_id: PlaylistConfigId) -> bool {
        self.is_loaded() && self.state.playlist_config_id == Some(config_id)
    }

    /// Commit a planned transition to memory
    pub fn apply(&mut self, plan: Plan) {
        self.state = plan.next;
    }

    fn plan_cursor(&self, next: QueueSnapshot) -> Plan {
        Plan {
            commit: QueueCommit::cursor(next.cursor()),
            next,
        }
    }

    /// Transition to `EMPTY`, forcing the engine to drop its queue
    pub fn plan_empty(&self) -> Plan {
        self.plan_cursor(QueueSnapshot {
            epoch: self.state.epoch + 1,
            ..QueueSnapshot::empty()
        })
    }

    /// Load `config` as persisted
    ///
    /// `position` restores an index and offset; an out-of-range index starts
    /// from the top instead. An empty order map leaves nothing to play and
    /// plans `EMPTY`.
    pub fn plan_load(&self, config: &PlaylistConfig, position: Option<(usize, u64)>) -> Plan {
        if config.order_map.is_empty() {
            return self.plan_empty();
        }

        let (current_index, current_millis) = match position {
            Some((index, millis)) if index < config.order_map.len() => (index, millis),
            Some((index, _)) => {
                tracing::warn!(
                    config_id = config.id,
                    index,
                    len = config.order_map.len(),
                    "restored index out of range, starting from the top"
                );
                (0, 0)
            }
            None => (0, 0),
        };

        self.plan_cursor(QueueSnapshot {
            playlist_config_id: Some(config.id),
            order_map: config.order_map.clone(),
            current_index,
            current_millis,
            flags: config.flags,
            epoch: self.state.epoch + 1,
        })
    }

    /// Start `config` in `mode`
    ///
    /// Shuffle and reverse orders are persisted to the config. When `config`
    /// is already playing, the current track and its offset carry over.
    pub fn plan_play(&self, config: &PlaylistConfig, mode: PlayMode) -> Plan {
        if config.order_map.is_empty() {
            return self.plan_empty();
        }

        let continuing = if self.is_active(config.id) {
            self.state.current_track()
        } else {
            None
        };

        let order_map = match mode {
            PlayMode::Simple => config.order_map.clone(),
            PlayMode::Shuffle => shuffled(&config.order_map, continuing),
            PlayMode::Reverse => reversed(&config.order_map, continuing),
        };

        let (current_index, current_millis) = continuing
            .and_then(|id| order_map.position(id))
            .map_or((0, 0), |index| (index, self.state.current_millis));

        let mut flags = config.flags;
        flags.is_shuffling = mode == PlayMode::Shuffle;
        flags.is_reversing = mode == PlayMode::Reverse;

        let next = QueueSnapshot {
            playlist_config_id: Some(config.id),
            order_map: order_map.clone(),
            current_index,
            current_millis,
            flags,
            epoch: self.state.epoch + 1,
        };

        let mut commit = QueueCommit::cursor(next.cursor()).with_flags(config.id, flags);
        if order_map != config.order_map {
            commit = commit.with_order_map(config.id, order_map);
        }

        Plan { next, commit }
    }

    /// Move the cursor to `index`
    ///
    /// Ignored (with a debug log) unless `LOADED` and in range.
    pub fn plan_set_index(&self, index: usize) -> Option<Plan> {
        if !self.is_loaded() || index >= self.state.order_map.len() {
            tracing::debug!(
                index,
                len = self.state.order_map.len(),
                "ignoring out-of-range index"
            );
            return None;
        }
        if index == self.state.current_index {
            return None;
        }

        Some(self.plan_cursor(QueueSnapshot {
            current_index: index,
            current_millis: 0,
            ..self.state.clone()
        }))
    }

    /// Natural completion of the current track
    pub fn plan_advance(&self) -> Option<Plan> {
        self.plan_set_index(self.state.current_index + 1)
    }

    /// Back to index 0 of the same order (never reshuffled), reloading the
    /// engine
    pub fn plan_loop_back(&self) -> Option<Plan> {
        if !self.is_loaded() {
            return None;
        }
        Some(self.plan_cursor(QueueSnapshot {
            current_index: 0,
            current_millis: 0,
            epoch: self.state.epoch + 1,
            ..self.state.clone()
        }))
    }

    /// The engine ran out of tracks: loop back when looping, otherwise stay
    /// at the terminal index
    pub fn plan_queue_ended(&self) -> Option<Plan> {
        if self.state.flags.is_looping {
            self.plan_loop_back()
        } else {
            None
        }
    }

    /// Drag-reorder within the played prefix or within the upcoming suffix
    ///
    /// The current slot is immovable and nothing may cross it.
    pub fn plan_reorder(&self, from: usize, to: usize) -> Result<Option<Plan>, QueueWarning> {
        if !self.is_loaded() {
            return Err(QueueWarning::NotLoaded);
        }

        let len = self.state.order_map.len();
        for position in [from, to] {
            if position >= len {
                return Err(QueueWarning::OutOfRange { position, len });
            }
        }

        let current = self.state.current_index;
        if from == current || to == current {
            return Err(QueueWarning::CurrentTrackImmovable);
        }
        let same_side = (from < current && to < current) || (from > current && to > current);
        if !same_side {
            return Err(QueueWarning::CrossesCurrentTrack);
        }
        if from == to {
            return Ok(None);
        }

        let order_map = self
            .state
            .order_map
            .moved(from, to)
            .ok_or(QueueWarning::OutOfRange { position: from, len })?;
        Ok(Some(self.plan_order_map(order_map, true)))
    }

    /// Replace the working order
    ///
    /// The current track keeps playing if it is still in `order_map`;
    /// otherwise the cursor restarts at 0. `persist` also rewrites the
    /// config's stored order.
    pub fn plan_set_order_map(&self, order_map: OrderMap, persist: bool) -> Option<Plan> {
        if self.state.playlist_config_id.is_none() {
            tracing::warn!("no config loaded, ignoring order map replacement");
            return None;
        }
        if order_map.is_empty() {
            return Some(self.plan_empty());
        }
        if order_map == self.state.order_map {
            return None;
        }
        Some(self.plan_order_map(order_map, persist))
    }

    fn plan_order_map(&self, order_map: OrderMap, persist: bool) -> Plan {
        let (current_index, current_millis) = self
            .state
            .current_track()
            .and_then(|id| order_map.position(id))
            .map_or((0, 0), |index| (index, self.state.current_millis));

        let next = QueueSnapshot {
            order_map: order_map.clone(),
            current_index,
            current_millis,
            ..self.state.clone()
        };

        let mut commit = QueueCommit::cursor(next.cursor());
        if persist {
            if let Some(config_id) = next.playlist_config_id {
                commit = commit.with_order_map(config_id, order_map);
            }
        }
        Plan { next, commit }
    }

    pub fn plan_set_looping(&self, looping: bool) -> Option<Plan> {
        let config_id = self.state.playlist_config_id?;
        if self.state.flags.is_looping == looping {
            return None;
        }

        let mut next = self.state.clone();
        next.flags.is_looping = looping;
        Some(Plan {
            commit: QueueCommit::default().with_flags(config_id, next.flags),
            next,
        })
    }

    pub fn plan_set_millis(&self, millis: u64) -> Option<Plan> {
        if !self.is_loaded() || self.state.current_millis == millis {
            return None;
        }
        Some(self.plan_cursor(QueueSnapshot {
            current_millis: millis,
            ..self.state.clone()
        }))
    }

    /// Drop deleted or unlinked tracks from the live queue
    ///
    /// `config_id = None` prunes whatever is loaded. When the current track
    /// is removed the cursor moves to the track that slid into its slot (or
    /// the new last track); an emptied map plans `EMPTY`.
    pub fn plan_prune(
        &self,
        config_id: Option<PlaylistConfigId>,
        track_ids: &[TrackId],
    ) -> Option<Plan> {
        let loaded = self.state.playlist_config_id?;
        if config_id.is_some_and(|id| id != loaded) {
            return None;
        }

        let order_map = self.state.order_map.without_all(track_ids);
        if order_map.len() == self.state.order_map.len() {
            return None;
        }
        if order_map.is_empty() {
            return Some(self.plan_empty());
        }

        let (current_index, current_millis) = match self.state.current_track() {
            Some(id) if !track_ids.contains(&id) => (
                order_map.position(id).unwrap_or(0),
                self.state.current_millis,
            ),
            _ => {
                let kept_before = self.state.order_map.as_slice()[..self.state.current_index]
                    .iter()
                    .filter(|id| !track_ids.contains(id))
                    .count();
                (kept_before.min(order_map.len() - 1), 0)
            }
        };

        let next = QueueSnapshot {
            order_map: order_map.clone(),
            current_index,
            current_millis,
            ..self.state.clone()
        };
        Some(Plan {
            commit: QueueCommit::cursor(next.cursor()).with_order_map(loaded, order_map),
            next,
        })
    }

    /// Append newly linked tracks to the live queue of `config_id`
    pub fn plan_extend(&self, config_id: PlaylistConfigId, track_ids: &[TrackId]) -> Option<Plan> {
        if !self.is_active(config_id) {
            return None;
        }

        let (order_map, appended) = self.state.order_map.append_missing(track_ids);
        if appended.is_empty() {
            return None;
        }

        let next = QueueSnapshot {
            order_map: order_map.clone(),
            ..self.state.clone()
        };
        Some(Plan {
            commit: QueueCommit::default().with_order_map(config_id, order_map),
            next,
        })
    }

    /// Reset to `EMPTY` if `config_id` is the loaded config
    pub fn plan_invalidate(&self, config_id: PlaylistConfigId) -> Option<Plan> {
        (self.state.playlist_config_id == Some(config_id)).then(|| self.plan_empty())
    }

    /// The persisted cursor this state corresponds to
    pub fn cursor(&self) -> QueueCursor {
        self.state.cursor()
    }
}
