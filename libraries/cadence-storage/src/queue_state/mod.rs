//! The singleton `queue` row (id = 1)
//!
//! Only the queue manager writes this row, through [`crate::LocalStore`]'s
//! `QueueStore` implementation.

use cadence_core::{QueueCursor, Result, NO_CONFIG};
use sqlx::SqliteConnection;

use crate::schema::Table;
use crate::store::{self, Record};

const QUEUE_ROW_ID: i64 = 1;

fn to_record(cursor: &QueueCursor) -> Record {
    Record::new()
        .with("current_index", cursor.current_index as i64)
        .with("current_millis", cursor.current_millis as i64)
        .with(
            "playlist_config_id",
            cursor.playlist_config_id.unwrap_or(NO_CONFIG),
        )
}

/// Insert the initial cursor row if it is missing
pub async fn ensure(conn: &mut SqliteConnection) -> Result<()> {
    let exists = store::exists_in(conn, Table::Queue, "id = ?", &[QUEUE_ROW_ID.into()]).await?;
    if !exists {
        let record = to_record(&QueueCursor::initial()).with("id", QUEUE_ROW_ID);
        store::insert_into(conn, Table::Queue, &record).await?;
        tracing::debug!("initialized queue cursor row");
    }
    Ok(())
}

/// Read the cursor; a missing row reads as the initial cursor
pub async fn get(conn: &mut SqliteConnection) -> Result<QueueCursor> {
    let Some(record) = store::select_one(conn, Table::Queue, "id = ?", &[QUEUE_ROW_ID.into()]).await?
    else {
        return Ok(QueueCursor::initial());
    };

    let config_id = record.get_i64("playlist_config_id")?;
    Ok(QueueCursor {
        current_index: record.get_i64("current_index")?.max(0) as usize,
        current_millis: record.get_i64("current_millis")?.max(0) as u64,
        playlist_config_id: (config_id != NO_CONFIG).then_some(config_id),
    })
}

pub async fn save(conn: &mut SqliteConnection, cursor: &QueueCursor) -> Result<()> {
    let affected = store::update(
        conn,
        Table::Queue,
        &to_record(cursor),
        Some("id = ?"),
        &[QUEUE_ROW_ID.into()],
    )
    .await?;

    if affected == 0 {
        let record = to_record(cursor).with("id", QUEUE_ROW_ID);
        store::insert_into(conn, Table::Queue, &record).await?;
    }
    Ok(())
}
