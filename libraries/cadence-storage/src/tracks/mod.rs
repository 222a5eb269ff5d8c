use std::collections::HashMap;

use cadence_core::{
    ArtistId, CadenceError, NewTrack, Platform, Result, Track, TrackId, UpdateTrack,
};
use sqlx::SqliteConnection;

use crate::locks::RowLocks;
use crate::schema::Table;
use crate::store::{self, Record, Value};

fn from_record(record: &Record) -> Result<Track> {
    let platform = record.get_string("platform")?;
    Ok(Track {
        id: record.get_i64("id")?,
        title: record.get_string("title")?,
        cover_uri: record.get_opt_string("cover_uri")?,
        file_uri: record.get_string("file_uri")?,
        millis: record.get_i64("millis")?,
        favorite: record.get_bool("favorite")?,
        platform: Platform::from_str(&platform).ok_or_else(|| {
            CadenceError::Serialization(format!("unknown platform `{platform}`"))
        })?,
        artist_id: record.get_i64("artist_id")?,
    })
}

pub async fn get_all(conn: &mut SqliteConnection) -> Result<Vec<Track>> {
    store::select_from(conn, Table::Tracks, None, None, &[])
        .await?
        .iter()
        .map(from_record)
        .collect()
}

pub async fn get_by_id(conn: &mut SqliteConnection, id: TrackId) -> Result<Option<Track>> {
    store::select_one(conn, Table::Tracks, "id = ?", &[id.into()])
        .await?
        .as_ref()
        .map(from_record)
        .transpose()
}

/// Fetch `ids` in the given order, skipping ids with no row
pub async fn get_many(conn: &mut SqliteConnection, ids: &[TrackId]) -> Result<Vec<Track>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let predicate = format!("id IN ({placeholders})");
    let args: Vec<Value> = ids.iter().map(|&id| id.into()).collect();

    let mut by_id: HashMap<TrackId, Track> =
        store::select_from(conn, Table::Tracks, None, Some(&predicate), &args)
            .await?
            .iter()
            .map(|record| from_record(record).map(|track| (track.id, track)))
            .collect::<Result<_>>()?;

    Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
}

/// The track imported from `file_uri`, if any
pub async fn find_by_file_uri(conn: &mut SqliteConnection, file_uri: &str) -> Result<Option<Track>> {
    store::select_one(conn, Table::Tracks, "file_uri = ?", &[file_uri.into()])
        .await?
        .as_ref()
        .map(from_record)
        .transpose()
}

/// Insert a track for an already resolved artist
///
/// # Errors
///
/// `DuplicateTrack` when `file_uri` is already imported
pub async fn create(
    conn: &mut SqliteConnection,
    artist_id: ArtistId,
    track: &NewTrack,
) -> Result<Track> {
    let record = Record::new()
        .with("title", track.title.as_str())
        .with("cover_uri", track.cover_uri.clone())
        .with("file_uri", track.file_uri.as_str())
        .with("millis", track.millis)
        .with("platform", track.platform.as_str())
        .with("artist_id", artist_id);

    let id = match store::insert_into(conn, Table::Tracks, &record).await {
        Ok(id) => id,
        Err(CadenceError::ConstraintViolation(msg)) if msg.contains("file_uri") => {
            return Err(CadenceError::DuplicateTrack {
                file_uri: track.file_uri.clone(),
            })
        }
        Err(e) => return Err(e),
    };

    get_by_id(conn, id)
        .await?
        .ok_or_else(|| CadenceError::storage("failed to retrieve created track"))
}

/// Apply a metadata edit; `artist_id` is the re-resolved artist, if renamed
pub async fn update(
    conn: &mut SqliteConnection,
    id: TrackId,
    changes: &UpdateTrack,
    artist_id: Option<ArtistId>,
) -> Result<Track> {
    let mut assignments = Record::new();
    if let Some(title) = &changes.title {
        assignments.set("title", title.as_str());
    }
    if let Some(cover_uri) = &changes.cover_uri {
        assignments.set("cover_uri", cover_uri.clone());
    }
    if let Some(millis) = changes.millis {
        assignments.set("millis", millis);
    }
    if let Some(platform) = changes.platform {
        assignments.set("platform", platform.as_str());
    }
    if let Some(artist_id) = artist_id {
        assignments.set("artist_id", artist_id);
    }

    if !assignments.is_empty() {
        let affected =
            store::update(conn, Table::Tracks, &assignments, Some("id = ?"), &[id.into()]).await?;
        if affected == 0 {
            return Err(CadenceError::not_found("Track", id));
        }
    }

    get_by_id(conn, id)
        .await?
        .ok_or_else(|| CadenceError::not_found("Track", id))
}

pub async fn delete(conn: &mut SqliteConnection, id: TrackId) -> Result<bool> {
    let affected = store::delete_from(conn, Table::Tracks, Some("id = ?"), &[id.into()]).await?;
    Ok(affected > 0)
}

pub async fn toggle_favorite(
    conn: &mut SqliteConnection,
    locks: &RowLocks,
    id: TrackId,
) -> Result<bool> {
    store::toggle_flag(conn, locks, Table::Tracks, id, "favorite").await
}
