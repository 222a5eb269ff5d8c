//! Track mutators
//!
//! Writes that span several tables run under the row locks of everything
//! they touch, in one `BEGIN IMMEDIATE` transaction. The live queue is never
//! called while those locks are held, because the queue manager takes config
//! and queue row locks of its own.

use cadence_core::{
    ArtistId, CadenceError, NewTrack, Result, Track, TrackId, UpdateTrack, Validate,
};
use cadence_playback::QueueHandle;
use cadence_storage::{
    artists, playlist_configs, playlist_content, tracks, LocalStore, RowKey, Table,
};

/// Import a track, creating its artist on first use
///
/// # Errors
///
/// `Validation` for bad input, `DuplicateTrack` when the file is already
/// imported. The artist is committed on its own and may outlive a failed
/// track insert.
pub async fn add_track(store: &LocalStore, track: &NewTrack) -> Result<Track> {
    track.validate()?;

    let mut conn = store.pool().acquire().await?;
    let artist = artists::resolve_or_create(&mut conn, store.locks(), &track.artist_name).await?;

    let created = match tracks::create(&mut conn, artist.id, track).await {
        Ok(created) => created,
        Err(e @ CadenceError::DuplicateTrack { .. }) => {
            let existing = tracks::find_by_file_uri(&mut conn, &track.file_uri)
                .await?
                .map(|t| t.id);
            tracing::warn!(file_uri = %track.file_uri, ?existing, "track already imported");
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    tracing::info!(
        track_id = created.id,
        artist_id = artist.id,
        title = %created.title,
        "imported track"
    );
    Ok(created)
}

/// Apply a metadata edit; renaming the artist re-resolves it by name
pub async fn update_track(store: &LocalStore, id: TrackId, changes: &UpdateTrack) -> Result<Track> {
    changes.validate()?;

    let _guard = store.locks().lock(RowKey::Row(Table::Tracks, id)).await;
    let mut conn = store.pool().acquire().await?;

    let artist_id: Option<ArtistId> = match &changes.artist_name {
        Some(name) => Some(artists::resolve_or_create(&mut conn, store.locks(), name).await?.id),
        None => None,
    };

    let track = tracks::update(&mut conn, id, changes, artist_id).await?;
    tracing::debug!(track_id = id, "updated track");
    Ok(track)
}

/// Delete a track everywhere
///
/// Prunes the live queue first (emptying it if nothing is left), so a queued
/// reorder cannot write the track back into the loaded order map. Then
/// removes every link, prunes every order map that references the track and
/// deletes the row. Returns `false` if the track did not exist.
///
/// # Errors
///
/// `ConfirmationRequired` unless `confirmed` is set; nothing is touched.
pub async fn delete_track(
    store: &LocalStore,
    queue: &QueueHandle,
    id: TrackId,
    confirmed: bool,
) -> Result<bool> {
    if !confirmed {
        return Err(CadenceError::ConfirmationRequired("track deletion"));
    }

    if queue.prune(None, vec![id]).await? {
        tracing::debug!(track_id = id, "removed track from live queue");
    }

    {
        let mut conn = store.pool().acquire().await?;
        let configs = playlist_configs::find_containing(&mut conn, id).await?;
        drop(conn);

        let keys = configs
            .iter()
            .map(|config| RowKey::Row(Table::PlaylistConfigs, config.id))
            .chain(std::iter::once(RowKey::Row(Table::Tracks, id)));
        let _guards = store.locks().lock_all(keys).await;
        let mut tx = store.begin_write().await?;
        if tracks::get_by_id(&mut *tx, id).await?.is_none() {
            return Ok(false);
        }

        // Re-read under the locks: a link may have landed since the scan
        let configs = playlist_configs::find_containing(&mut *tx, id).await?;
        for config in &configs {
            let order_map = config.order_map.without(id);
            playlist_configs::set_order_map(&mut *tx, config.id, &order_map).await?;
        }
        let unlinked = playlist_content::unlink_track_everywhere(&mut *tx, id).await?;
        tracks::delete(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!(
            track_id = id,
            configs = configs.len(),
            links = unlinked,
            "deleted track"
        );
    }

    // A link made while the transaction waited may have extended the queue
    queue.prune(None, vec![id]).await?;
    Ok(true)
}

/// Flip the favorite flag from its stored value
pub async fn toggle_favorite(store: &LocalStore, id: TrackId) -> Result<bool> {
    let mut conn = store.pool().acquire().await?;
    let favorite = tracks::toggle_favorite(&mut conn, store.locks(), id).await?;
    tracing::debug!(track_id = id, favorite, "toggled track favorite");
    Ok(favorite)
}

/// Flip an artist's favorite flag
pub async fn toggle_artist_favorite(store: &LocalStore, id: ArtistId) -> Result<bool> {
    let mut conn = store.pool().acquire().await?;
    let favorite = artists::toggle_favorite(&mut conn, store.locks(), id).await?;
    tracing::debug!(artist_id = id, favorite, "toggled artist favorite");
    Ok(favorite)
}
