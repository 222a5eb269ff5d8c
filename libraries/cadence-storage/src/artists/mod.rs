use cadence_core::{Artist, ArtistId, CadenceError, Result};
use sqlx::SqliteConnection;

use crate::locks::RowLocks;
use crate::schema::Table;
use crate::store::{self, Record};

fn from_record(record: &Record) -> Result<Artist> {
    Ok(Artist {
        id: record.get_i64("id")?,
        name: record.get_string("name")?,
        favorite: record.get_bool("favorite")?,
    })
}

pub async fn get_all(conn: &mut SqliteConnection) -> Result<Vec<Artist>> {
    store::select_from(conn, Table::Artists, None, None, &[])
        .await?
        .iter()
        .map(from_record)
        .collect()
}

pub async fn get_by_id(conn: &mut SqliteConnection, id: ArtistId) -> Result<Option<Artist>> {
    store::select_one(conn, Table::Artists, "id = ?", &[id.into()])
        .await?
        .as_ref()
        .map(from_record)
        .transpose()
}

/// Exact, case-sensitive name lookup
pub async fn find_by_name(conn: &mut SqliteConnection, name: &str) -> Result<Option<Artist>> {
    store::select_one(conn, Table::Artists, "name = ?", &[name.into()])
        .await?
        .as_ref()
        .map(from_record)
        .transpose()
}

/// Return the artist called `name`, creating it on first use
pub async fn resolve_or_create(
    conn: &mut SqliteConnection,
    locks: &RowLocks,
    name: &str,
) -> Result<Artist> {
    let created = store::insert_if_not_exists(
        conn,
        locks,
        Table::Artists,
        "name = ?",
        &[name.into()],
        &Record::new().with("name", name),
    )
    .await?;

    if let Some(id) = created {
        tracing::debug!(artist_id = id, name, "created artist");
    }

    find_by_name(conn, name)
        .await?
        .ok_or_else(|| CadenceError::storage(format!("artist `{name}` vanished after insert")))
}

pub async fn toggle_favorite(
    conn: &mut SqliteConnection,
    locks: &RowLocks,
    id: ArtistId,
) -> Result<bool> {
    store::toggle_flag(conn, locks, Table::Artists, id, "favorite").await
}
