//! `LocalStore`: the SQLite-backed implementation of the core collaborator
//! traits
//!
//! Wraps the pool together with the row-lock registry and the listening
//! history policy, and bootstraps the singleton rows on open.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};

use cadence_core::{
    CadenceError, CreatePlaylist, EngineTrack, OrderMap, PlaybackCatalog, PlaylistConfig,
    PlaylistConfigId, PlaylistId, Projection, QueueCommit, QueueCursor, QueueStore, Result,
    Subscription, TrackId, HISTORY_PLAYLIST_TITLE, RESERVED_PLAYLIST_TITLES,
};

use crate::error::StorageError;
use crate::locks::{RowKey, RowLocks};
use crate::schema::Table;
use crate::{artists, playlist_configs, playlist_content, playlists, queue_state, tracks};

/// Where listening history goes and how much of it is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryPolicy {
    pub playlist_id: PlaylistId,
    pub config_id: PlaylistConfigId,
    /// Maximum entries kept; 0 keeps everything
    pub limit: usize,
}

impl HistoryPolicy {
    /// New history order after playing `track_id`
    ///
    /// An earlier occurrence moves to the end instead of being duplicated.
    /// Returns the new map and the evicted (oldest) ids.
    pub fn apply(&self, history: &OrderMap, track_id: TrackId) -> (OrderMap, Vec<TrackId>) {
        let appended = history.move_to_end(track_id);
        if self.limit == 0 {
            (appended, Vec::new())
        } else {
            appended.keep_last(self.limit)
        }
    }
}

/// SQLite-backed store shared by the library and the queue manager
pub struct LocalStore {
    pool: SqlitePool,
    locks: RowLocks,
    history: HistoryPolicy,
    revision: AtomicU64,
    changes: Projection<u64>,
}

impl LocalStore {
    /// Open the store: create the schema, the queue row and the system
    /// playlists if they are missing
    ///
    /// `history_limit = 0` keeps unlimited history.
    pub async fn open(pool: SqlitePool, history_limit: usize) -> std::result::Result<Self, StorageError> {
        crate::run_migrations(&pool).await?;

        let mut conn = pool.acquire().await?;
        queue_state::ensure(&mut conn).await?;
        drop(conn);

        let mut history = None;
        for title in RESERVED_PLAYLIST_TITLES {
            let config = ensure_system_playlist(&pool, title).await?;
            if title == HISTORY_PLAYLIST_TITLE {
                history = Some(config);
            }
        }
        let history = history
            .ok_or_else(|| StorageError::Migration("history playlist missing".to_string()))?;

        tracing::info!(
            history_config_id = history.id,
            history_limit,
            "local store opened"
        );

        Ok(Self {
            pool,
            locks: RowLocks::new(),
            history: HistoryPolicy {
                playlist_id: history.playlist_id,
                config_id: history.id,
                limit: history_limit,
            },
            revision: AtomicU64::new(0),
            changes: Projection::new(0),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn locks(&self) -> &RowLocks {
        &self.locks
    }

    pub fn history(&self) -> HistoryPolicy {
        self.history
    }

    /// Revision counter bumped by writes made outside the library's own
    /// mutators (history recording)
    pub fn changes(&self) -> Subscription<u64> {
        self.changes.subscribe()
    }

    /// Start a write transaction
    ///
    /// See [`begin_write`](crate::begin_write). Take row locks before
    /// calling this.
    pub async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(crate::begin_write(&self.pool).await?)
    }

    fn bump_revision(&self) {
        let next = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        self.changes.publish(next);
    }
}

async fn ensure_system_playlist(pool: &SqlitePool, title: &str) -> Result<PlaylistConfig> {
    let mut tx = crate::begin_write(pool).await?;

    let playlist = match playlists::find_by_title(&mut *tx, title).await? {
        Some(playlist) => playlist,
        None => playlists::create(&mut *tx, &CreatePlaylist::new(title)).await?,
    };
    let config = match playlist_configs::get_by_playlist(&mut *tx, playlist.id).await? {
        Some(config) => config,
        None => playlist_configs::create(&mut *tx, playlist.id).await?,
    };

    tx.commit().await?;
    Ok(config)
}

#[async_trait]
impl QueueStore for LocalStore {
    async fn load_cursor(&self) -> Result<QueueCursor> {
        let mut conn = self.pool.acquire().await?;
        queue_state::get(&mut conn).await
    }

    async fn load_config(&self, id: PlaylistConfigId) -> Result<Option<PlaylistConfig>> {
        let mut conn = self.pool.acquire().await?;
        playlist_configs::get_by_id(&mut conn, id).await
    }

    async fn commit(&self, commit: QueueCommit) -> Result<()> {
        if commit.is_empty() {
            return Ok(());
        }

        let mut keys = Vec::new();
        if commit.cursor.is_some() {
            keys.push(RowKey::Row(Table::Queue, 1));
        }
        if let Some((id, _)) = &commit.order_map {
            keys.push(RowKey::Row(Table::PlaylistConfigs, *id));
        }
        if let Some((id, _)) = &commit.flags {
            keys.push(RowKey::Row(Table::PlaylistConfigs, *id));
        }
        let _guards = self.locks.lock_all(keys).await;
        let mut tx = self.begin_write().await?;
        if let Some((id, order_map)) = &commit.order_map {
            playlist_configs::set_order_map(&mut *tx, *id, order_map).await?;
        }
        if let Some((id, flags)) = commit.flags {
            playlist_configs::set_flags(&mut *tx, id, flags).await?;
        }
        if let Some(cursor) = &commit.cursor {
            queue_state::save(&mut *tx, cursor).await?;
        }
        tx.commit().await?;

        Ok(())
    }
}

#[async_trait]
impl PlaybackCatalog for LocalStore {
    async fn resolve_tracks(&self, ids: &[TrackId]) -> Result<Vec<EngineTrack>> {
        let mut conn = self.pool.acquire().await?;
        let found = tracks::get_many(&mut conn, ids).await?;
        if found.len() != ids.len() {
            let missing = ids
                .iter()
                .find(|id| !found.iter().any(|track| track.id == **id))
                .copied()
                .unwrap_or_default();
            return Err(CadenceError::not_found("Track", missing));
        }

        let names: HashMap<_, _> = artists::get_all(&mut conn)
            .await?
            .into_iter()
            .map(|artist| (artist.id, artist.name))
            .collect();

        Ok(found
            .into_iter()
            .map(|track| EngineTrack {
                id: track.id,
                artist: names.get(&track.artist_id).cloned().unwrap_or_default(),
                url: track.file_uri,
                title: track.title,
                duration_ms: track.millis,
                artwork: track.cover_uri,
            })
            .collect())
    }

    async fn record_history(
        &self,
        track_id: TrackId,
        active_config: Option<PlaylistConfigId>,
    ) -> Result<()> {
        let policy = self.history;
        if active_config == Some(policy.config_id) {
            tracing::debug!(track_id, "history playlist is playing, not recording");
            return Ok(());
        }

        let _guard = self
            .locks
            .lock(RowKey::Row(Table::PlaylistConfigs, policy.config_id))
            .await;
        let mut tx = self.begin_write().await?;
        if !playlist_content::is_linked(&mut *tx, policy.playlist_id, track_id).await? {
            playlist_content::link(&mut *tx, policy.playlist_id, track_id).await?;
        }

        let config = playlist_configs::get_by_id(&mut *tx, policy.config_id)
            .await?
            .ok_or_else(|| CadenceError::not_found("PlaylistConfig", policy.config_id))?;
        let (order_map, evicted) = policy.apply(&config.order_map, track_id);
        playlist_configs::set_order_map(&mut *tx, policy.config_id, &order_map).await?;
        for old in &evicted {
            playlist_content::unlink(&mut *tx, policy.playlist_id, *old).await?;
        }
        tx.commit().await?;

        tracing::debug!(track_id, evicted = evicted.len(), "recorded history");
        self.bump_revision();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(limit: usize) -> HistoryPolicy {
        HistoryPolicy {
            playlist_id: 1,
            config_id: 1,
            limit,
        }
    }

    #[test]
    fn replay_moves_to_end() {
        let (map, evicted) = policy(10).apply(&OrderMap::from(vec![1, 2, 3]), 1);
        assert_eq!(map.as_slice(), &[2, 3, 1]);
        assert!(evicted.is_empty());
    }

    #[test]
    fn cap_evicts_oldest() {
        let (map, evicted) = policy(3).apply(&OrderMap::from(vec![1, 2, 3]), 4);
        assert_eq!(map.as_slice(), &[2, 3, 4]);
        assert_eq!(evicted, vec![1]);
    }

    #[test]
    fn replay_at_cap_evicts_nothing() {
        let (map, evicted) = policy(3).apply(&OrderMap::from(vec![1, 2, 3]), 2);
        assert_eq!(map.as_slice(), &[1, 3, 2]);
        assert!(evicted.is_empty());
    }

    #[test]
    fn zero_limit_is_uncapped() {
        let history: OrderMap = (1..=100).collect();
        let (map, evicted) = policy(0).apply(&history, 101);
        assert_eq!(map.len(), 101);
        assert!(evicted.is_empty());
    }
}
