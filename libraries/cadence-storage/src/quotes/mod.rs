//! Cache of the last fetched daily quote

use chrono::{DateTime, Utc};
use cadence_core::{CadenceError, Quote, Result};
use sqlx::SqliteConnection;

use crate::schema::Table;
use crate::store::{self, Record};

/// Most recently stored quote
pub async fn latest(conn: &mut SqliteConnection) -> Result<Option<Quote>> {
    let Some(record) = store::select_from(conn, Table::Quotes, None, None, &[])
        .await?
        .pop()
    else {
        return Ok(None);
    };

    let fetched_at = record.get_string("fetched_at")?;
    let fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
        .map_err(|e| CadenceError::Serialization(format!("bad quote timestamp: {e}")))?
        .with_timezone(&Utc);

    Ok(Some(Quote {
        text: record.get_string("text")?,
        author: record.get_string("author")?,
        fetched_at,
    }))
}

/// Replace the cached quote
pub async fn replace(conn: &mut SqliteConnection, quote: &Quote) -> Result<()> {
    store::delete_from(conn, Table::Quotes, None, &[]).await?;
    store::insert_into(
        conn,
        Table::Quotes,
        &Record::new()
            .with("text", quote.text.as_str())
            .with("author", quote.author.as_str())
            .with("fetched_at", quote.fetched_at.to_rfc3339()),
    )
    .await?;
    Ok(())
}
