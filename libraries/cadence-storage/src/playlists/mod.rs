use cadence_core::{
    is_reserved_title, CadenceError, CreatePlaylist, Playlist, PlaylistId, Result, UpdatePlaylist,
    RESERVED_PLAYLIST_TITLES,
};
use sqlx::SqliteConnection;

use crate::locks::RowLocks;
use crate::schema::Table;
use crate::store::{self, Record};

fn from_record(record: &Record) -> Result<Playlist> {
    Ok(Playlist {
        id: record.get_i64("id")?,
        title: record.get_string("title")?,
        description: record.get_string("description")?,
        cover_uri: record.get_opt_string("cover_uri")?,
        favorite: record.get_bool("favorite")?,
    })
}

/// Every playlist, system playlists included
pub async fn get_all(conn: &mut SqliteConnection) -> Result<Vec<Playlist>> {
    store::select_from(conn, Table::Playlists, None, None, &[])
        .await?
        .iter()
        .map(from_record)
        .collect()
}

/// Playlists shown to the user (reserved titles excluded)
pub async fn user_playlists(conn: &mut SqliteConnection) -> Result<Vec<Playlist>> {
    let [history, favorites] = RESERVED_PLAYLIST_TITLES;
    store::select_from(
        conn,
        Table::Playlists,
        None,
        Some("title NOT IN (?, ?)"),
        &[history.into(), favorites.into()],
    )
    .await?
    .iter()
    .map(from_record)
    .collect()
}

pub async fn get_by_id(conn: &mut SqliteConnection, id: PlaylistId) -> Result<Option<Playlist>> {
    store::select_one(conn, Table::Playlists, "id = ?", &[id.into()])
        .await?
        .as_ref()
        .map(from_record)
        .transpose()
}

/// First playlist with exactly this title
pub async fn find_by_title(conn: &mut SqliteConnection, title: &str) -> Result<Option<Playlist>> {
    store::select_one(conn, Table::Playlists, "title = ?", &[title.into()])
        .await?
        .as_ref()
        .map(from_record)
        .transpose()
}

/// Insert the playlist row only
///
/// Callers pair this with `playlist_configs::create` in one transaction.
pub async fn create(conn: &mut SqliteConnection, playlist: &CreatePlaylist) -> Result<Playlist> {
    let record = Record::new()
        .with("title", playlist.title.as_str())
        .with("description", playlist.description.as_str())
        .with("cover_uri", playlist.cover_uri.clone());

    let id = store::insert_into(conn, Table::Playlists, &record).await?;

    get_by_id(conn, id)
        .await?
        .ok_or_else(|| CadenceError::storage("failed to retrieve created playlist"))
}

pub async fn update(
    conn: &mut SqliteConnection,
    id: PlaylistId,
    changes: &UpdatePlaylist,
) -> Result<Playlist> {
    let current = get_by_id(conn, id)
        .await?
        .ok_or_else(|| CadenceError::not_found("Playlist", id))?;
    if is_reserved_title(&current.title) {
        return Err(CadenceError::invalid_argument(format!(
            "system playlist `{}` cannot be edited",
            current.title
        )));
    }

    let mut assignments = Record::new();
    if let Some(title) = &changes.title {
        assignments.set("title", title.as_str());
    }
    if let Some(description) = &changes.description {
        assignments.set("description", description.as_str());
    }
    if let Some(cover_uri) = &changes.cover_uri {
        assignments.set("cover_uri", cover_uri.clone());
    }

    if !assignments.is_empty() {
        store::update(conn, Table::Playlists, &assignments, Some("id = ?"), &[id.into()]).await?;
    }

    get_by_id(conn, id)
        .await?
        .ok_or_else(|| CadenceError::not_found("Playlist", id))
}

pub async fn delete(conn: &mut SqliteConnection, id: PlaylistId) -> Result<bool> {
    let affected =
        store::delete_from(conn, Table::Playlists, Some("id = ?"), &[id.into()]).await?;
    Ok(affected > 0)
}

pub async fn toggle_favorite(
    conn: &mut SqliteConnection,
    locks: &RowLocks,
    id: PlaylistId,
) -> Result<bool> {
    store::toggle_flag(conn, locks, Table::Playlists, id, "favorite").await
}
