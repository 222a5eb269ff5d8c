//! Track membership links, independent of order

use cadence_core::{CadenceError, PlaylistContent, PlaylistId, Result, TrackId};
use sqlx::SqliteConnection;

use crate::schema::Table;
use crate::store::{self, Record};

fn from_record(record: &Record) -> Result<PlaylistContent> {
    Ok(PlaylistContent {
        id: record.get_i64("id")?,
        playlist_id: record.get_i64("playlist_id")?,
        track_id: record.get_i64("track_id")?,
    })
}

pub async fn get_all(conn: &mut SqliteConnection) -> Result<Vec<PlaylistContent>> {
    store::select_from(conn, Table::PlaylistContent, None, None, &[])
        .await?
        .iter()
        .map(from_record)
        .collect()
}

pub async fn is_linked(
    conn: &mut SqliteConnection,
    playlist_id: PlaylistId,
    track_id: TrackId,
) -> Result<bool> {
    store::exists_in(
        conn,
        Table::PlaylistContent,
        "playlist_id = ? AND track_id = ?",
        &[playlist_id.into(), track_id.into()],
    )
    .await
}

/// Link `track_id` to `playlist_id`
///
/// # Errors
///
/// `DuplicateLink` when the pair is already linked, `ConstraintViolation` when
/// either side does not exist
pub async fn link(
    conn: &mut SqliteConnection,
    playlist_id: PlaylistId,
    track_id: TrackId,
) -> Result<PlaylistContent> {
    let record = Record::new()
        .with("playlist_id", playlist_id)
        .with("track_id", track_id);

    match store::insert_into(conn, Table::PlaylistContent, &record).await {
        Ok(id) => Ok(PlaylistContent {
            id,
            playlist_id,
            track_id,
        }),
        Err(CadenceError::ConstraintViolation(msg)) if msg.contains("UNIQUE") => {
            Err(CadenceError::DuplicateLink {
                playlist_id,
                track_id,
            })
        }
        Err(e) => Err(e),
    }
}

pub async fn unlink(
    conn: &mut SqliteConnection,
    playlist_id: PlaylistId,
    track_id: TrackId,
) -> Result<bool> {
    let affected = store::delete_from(
        conn,
        Table::PlaylistContent,
        Some("playlist_id = ? AND track_id = ?"),
        &[playlist_id.into(), track_id.into()],
    )
    .await?;
    Ok(affected > 0)
}

/// Remove `track_id` from every playlist
pub async fn unlink_track_everywhere(conn: &mut SqliteConnection, track_id: TrackId) -> Result<u64> {
    store::delete_from(
        conn,
        Table::PlaylistContent,
        Some("track_id = ?"),
        &[track_id.into()],
    )
    .await
}

/// Remove every link of `playlist_id`
pub async fn unlink_playlist(conn: &mut SqliteConnection, playlist_id: PlaylistId) -> Result<u64> {
    store::delete_from(
        conn,
        Table::PlaylistContent,
        Some("playlist_id = ?"),
        &[playlist_id.into()],
    )
    .await
}

/// Linked track ids in link-creation order
pub async fn track_ids(conn: &mut SqliteConnection, playlist_id: PlaylistId) -> Result<Vec<TrackId>> {
    store::select_from(
        conn,
        Table::PlaylistContent,
        Some(&["track_id"]),
        Some("playlist_id = ?"),
        &[playlist_id.into()],
    )
    .await?
    .iter()
    .map(|record| record.get_i64("track_id"))
    .collect()
}
