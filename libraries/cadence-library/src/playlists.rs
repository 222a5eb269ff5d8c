//! Playlist mutators
//!
//! A playlist and its config are created and deleted together. Link changes
//! rewrite the config's order map in the same transaction. The live queue is
//! only called while no row lock is held.

use serde::{Deserialize, Serialize};

use cadence_core::{
    is_reserved_title, CadenceError, CreatePlaylist, Playlist, PlaylistId, Result, Track, TrackId,
    UpdatePlaylist, Validate,
};
use cadence_playback::QueueHandle;
use cadence_storage::{
    playlist_configs, playlist_content, playlists, tracks, LocalStore, RowKey, Table,
};

/// Result of linking one track in a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LinkOutcome {
    Linked { track_id: TrackId },
    AlreadyLinked { track_id: TrackId },
    Failed { track_id: TrackId, reason: String },
}

impl LinkOutcome {
    pub fn track_id(&self) -> TrackId {
        match self {
            Self::Linked { track_id }
            | Self::AlreadyLinked { track_id }
            | Self::Failed { track_id, .. } => *track_id,
        }
    }

    pub fn is_linked(&self) -> bool {
        matches!(self, Self::Linked { .. })
    }
}

/// Create a playlist together with its empty config
pub async fn create_playlist(store: &LocalStore, playlist: &CreatePlaylist) -> Result<Playlist> {
    playlist.validate()?;

    let mut tx = store.begin_write().await?;
    let created = playlists::create(&mut *tx, playlist).await?;
    let config = playlist_configs::create(&mut *tx, created.id).await?;
    tx.commit().await?;

    tracing::info!(
        playlist_id = created.id,
        config_id = config.id,
        title = %created.title,
        "created playlist"
    );
    Ok(created)
}

pub async fn update_playlist(
    store: &LocalStore,
    id: PlaylistId,
    changes: &UpdatePlaylist,
) -> Result<Playlist> {
    changes.validate()?;

    let _guard = store.locks().lock(RowKey::Row(Table::Playlists, id)).await;
    let mut conn = store.pool().acquire().await?;
    let playlist = playlists::update(&mut conn, id, changes).await?;
    tracing::debug!(playlist_id = id, "updated playlist");
    Ok(playlist)
}

/// Delete a playlist, its links and its config
///
/// The queue is invalidated first, while the config still exists; the rows
/// then go in one transaction.
///
/// # Errors
///
/// `ConfirmationRequired` unless `confirmed` is set, `NotFound` for an
/// unknown playlist, `InvalidArgument` for a system playlist.
pub async fn delete_playlist(
    store: &LocalStore,
    queue: &QueueHandle,
    id: PlaylistId,
    confirmed: bool,
) -> Result<()> {
    if !confirmed {
        return Err(CadenceError::ConfirmationRequired("playlist deletion"));
    }

    let (playlist, config) = {
        let mut conn = store.pool().acquire().await?;
        let playlist = playlists::get_by_id(&mut conn, id)
            .await?
            .ok_or_else(|| CadenceError::not_found("Playlist", id))?;
        let config = playlist_configs::require_by_playlist(&mut conn, id).await?;
        (playlist, config)
    };
    if is_reserved_title(&playlist.title) {
        return Err(CadenceError::invalid_argument(format!(
            "system playlist `{}` cannot be deleted",
            playlist.title
        )));
    }

    if queue.invalidate(config.id).await? {
        tracing::info!(config_id = config.id, "deleted playlist was playing, queue reset");
    }

    let _guards = store
        .locks()
        .lock_all([
            RowKey::Row(Table::Playlists, id),
            RowKey::Row(Table::PlaylistConfigs, config.id),
        ])
        .await;
    let mut tx = store.begin_write().await?;
    let unlinked = playlist_content::unlink_playlist(&mut *tx, id).await?;
    playlist_configs::delete_by_playlist(&mut *tx, id).await?;
    playlists::delete(&mut *tx, id).await?;
    tx.commit().await?;

    tracing::info!(playlist_id = id, links = unlinked, "deleted playlist");
    Ok(())
}

/// Link tracks to a playlist and append the new ones to its order map
///
/// Each track is reported on its own; an already linked or missing track
/// does not stop the rest of the batch.
pub async fn link_tracks(
    store: &LocalStore,
    queue: &QueueHandle,
    playlist_id: PlaylistId,
    track_ids: &[TrackId],
) -> Result<Vec<LinkOutcome>> {
    let config = {
        let mut conn = store.pool().acquire().await?;
        playlist_configs::require_by_playlist(&mut conn, playlist_id).await?
    };

    let (outcomes, appended) = {
        let _guard = store
            .locks()
            .lock(RowKey::Row(Table::PlaylistConfigs, config.id))
            .await;
        let mut tx = store.begin_write().await?;
        let mut outcomes = Vec::with_capacity(track_ids.len());
        let mut linked = Vec::new();

        for &track_id in track_ids {
            let outcome = match playlist_content::link(&mut *tx, playlist_id, track_id).await {
                Ok(_) => {
                    linked.push(track_id);
                    LinkOutcome::Linked { track_id }
                }
                Err(CadenceError::DuplicateLink { .. }) => LinkOutcome::AlreadyLinked { track_id },
                Err(e @ CadenceError::ConstraintViolation(_)) => LinkOutcome::Failed {
                    track_id,
                    reason: e.to_string(),
                },
                Err(e) => return Err(e),
            };
            outcomes.push(outcome);
        }

        // Re-read under the lock; the queue may have reordered it
        let current = playlist_configs::get_by_id(&mut *tx, config.id)
            .await?
            .ok_or_else(|| CadenceError::not_found("PlaylistConfig", config.id))?;
        let (order_map, appended) = current.order_map.append_missing(&linked);
        if !appended.is_empty() {
            playlist_configs::set_order_map(&mut *tx, config.id, &order_map).await?;
        }
        tx.commit().await?;

        (outcomes, appended)
    };

    let failed = outcomes.iter().filter(|o| !o.is_linked()).count();
    tracing::info!(
        playlist_id,
        linked = appended.len(),
        skipped = failed,
        "linked tracks"
    );

    if !appended.is_empty() {
        queue.extend(config.id, appended).await?;
    }
    Ok(outcomes)
}

/// Remove one track from one playlist
///
/// The live queue is pruned before the link goes, so a queued reorder of
/// this playlist cannot write the track back into its order map. Returns
/// `false` if it was not linked.
pub async fn delete_from_playlist(
    store: &LocalStore,
    queue: &QueueHandle,
    playlist_id: PlaylistId,
    track_id: TrackId,
    confirmed: bool,
) -> Result<bool> {
    if !confirmed {
        return Err(CadenceError::ConfirmationRequired("removal from playlist"));
    }

    let config = {
        let mut conn = store.pool().acquire().await?;
        playlist_configs::require_by_playlist(&mut conn, playlist_id).await?
    };

    if queue.prune(Some(config.id), vec![track_id]).await? {
        tracing::debug!(playlist_id, track_id, "removed track from live queue");
    }

    {
        let _guard = store
            .locks()
            .lock(RowKey::Row(Table::PlaylistConfigs, config.id))
            .await;
        let mut tx = store.begin_write().await?;
        if !playlist_content::unlink(&mut *tx, playlist_id, track_id).await? {
            return Ok(false);
        }
        let current = playlist_configs::get_by_id(&mut *tx, config.id)
            .await?
            .ok_or_else(|| CadenceError::not_found("PlaylistConfig", config.id))?;
        playlist_configs::set_order_map(&mut *tx, config.id, &current.order_map.without(track_id))
            .await?;
        tx.commit().await?;
    }

    tracing::info!(playlist_id, track_id, "removed track from playlist");
    Ok(true)
}

pub async fn toggle_favorite(store: &LocalStore, id: PlaylistId) -> Result<bool> {
    let mut conn = store.pool().acquire().await?;
    let favorite = playlists::toggle_favorite(&mut conn, store.locks(), id).await?;
    tracing::debug!(playlist_id = id, favorite, "toggled playlist favorite");
    Ok(favorite)
}

/// Tracks of a playlist in play order
pub async fn playlist_tracks(store: &LocalStore, playlist_id: PlaylistId) -> Result<Vec<Track>> {
    let mut conn = store.pool().acquire().await?;
    let config = playlist_configs::require_by_playlist(&mut conn, playlist_id).await?;
    tracks::get_many(&mut conn, config.order_map.as_slice()).await
}

/// User-facing playlists, system playlists excluded
pub async fn user_playlists(store: &LocalStore) -> Result<Vec<Playlist>> {
    let mut conn = store.pool().acquire().await?;
    playlists::user_playlists(&mut conn).await
}
