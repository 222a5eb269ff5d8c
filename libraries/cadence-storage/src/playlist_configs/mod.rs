//! Playlist configs: order map and playback flags, one row per playlist
//!
//! The order map is persisted in its packed text form and always rewritten
//! whole; there are no positional in-place edits.

use cadence_core::{
    CadenceError, ConfigFlags, OrderMap, PlaylistConfig, PlaylistConfigId, PlaylistId, Result,
    TrackId,
};
use sqlx::SqliteConnection;

use crate::schema::Table;
use crate::store::{self, Record};

fn from_record(record: &Record) -> Result<PlaylistConfig> {
    Ok(PlaylistConfig {
        id: record.get_i64("id")?,
        playlist_id: record.get_i64("playlist_id")?,
        order_map: OrderMap::parse(&record.get_string("order_map")?)?,
        flags: ConfigFlags {
            is_looping: record.get_bool("is_looping")?,
            is_shuffling: record.get_bool("is_shuffling")?,
            is_reversing: record.get_bool("is_reversing")?,
        },
    })
}

pub async fn get_all(conn: &mut SqliteConnection) -> Result<Vec<PlaylistConfig>> {
    store::select_from(conn, Table::PlaylistConfigs, None, None, &[])
        .await?
        .iter()
        .map(from_record)
        .collect()
}

pub async fn get_by_id(
    conn: &mut SqliteConnection,
    id: PlaylistConfigId,
) -> Result<Option<PlaylistConfig>> {
    store::select_one(conn, Table::PlaylistConfigs, "id = ?", &[id.into()])
        .await?
        .as_ref()
        .map(from_record)
        .transpose()
}

pub async fn get_by_playlist(
    conn: &mut SqliteConnection,
    playlist_id: PlaylistId,
) -> Result<Option<PlaylistConfig>> {
    store::select_one(
        conn,
        Table::PlaylistConfigs,
        "playlist_id = ?",
        &[playlist_id.into()],
    )
    .await?
    .as_ref()
    .map(from_record)
    .transpose()
}

/// Like [`get_by_playlist`], but a missing config is an error
pub async fn require_by_playlist(
    conn: &mut SqliteConnection,
    playlist_id: PlaylistId,
) -> Result<PlaylistConfig> {
    get_by_playlist(conn, playlist_id)
        .await?
        .ok_or_else(|| CadenceError::not_found("PlaylistConfig for playlist", playlist_id))
}

/// Every config whose order map references `track_id`
pub async fn find_containing(
    conn: &mut SqliteConnection,
    track_id: TrackId,
) -> Result<Vec<PlaylistConfig>> {
    Ok(get_all(conn)
        .await?
        .into_iter()
        .filter(|config| config.order_map.contains(track_id))
        .collect())
}

/// Insert the empty config paired with `playlist_id`
pub async fn create(conn: &mut SqliteConnection, playlist_id: PlaylistId) -> Result<PlaylistConfig> {
    let record = Record::new()
        .with("playlist_id", playlist_id)
        .with("order_map", OrderMap::new().serialize());

    let id = store::insert_into(conn, Table::PlaylistConfigs, &record).await?;

    get_by_id(conn, id)
        .await?
        .ok_or_else(|| CadenceError::storage("failed to retrieve created playlist config"))
}

pub async fn set_order_map(
    conn: &mut SqliteConnection,
    id: PlaylistConfigId,
    order_map: &OrderMap,
) -> Result<()> {
    let affected = store::update(
        conn,
        Table::PlaylistConfigs,
        &Record::new().with("order_map", order_map.serialize()),
        Some("id = ?"),
        &[id.into()],
    )
    .await?;

    if affected == 0 {
        return Err(CadenceError::not_found("PlaylistConfig", id));
    }
    Ok(())
}

pub async fn set_flags(
    conn: &mut SqliteConnection,
    id: PlaylistConfigId,
    flags: ConfigFlags,
) -> Result<()> {
    let assignments = Record::new()
        .with("is_looping", flags.is_looping)
        .with("is_shuffling", flags.is_shuffling)
        .with("is_reversing", flags.is_reversing);

    let affected = store::update(
        conn,
        Table::PlaylistConfigs,
        &assignments,
        Some("id = ?"),
        &[id.into()],
    )
    .await?;

    if affected == 0 {
        return Err(CadenceError::not_found("PlaylistConfig", id));
    }
    Ok(())
}

pub async fn delete_by_playlist(conn: &mut SqliteConnection, playlist_id: PlaylistId) -> Result<u64> {
    store::delete_from(
        conn,
        Table::PlaylistConfigs,
        Some("playlist_id = ?"),
        &[playlist_id.into()],
    )
    .await
}
