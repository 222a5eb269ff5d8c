//! Key-value settings
//!
//! Values are stored as serialized JSON so any preference shape fits.
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_storage::settings;
//! # async fn example(conn: &mut sqlx::SqliteConnection) -> cadence_core::Result<()> {
//! settings::set(conn, settings::SETTING_LAST_PLAY_MODE, &serde_json::json!("shuffle")).await?;
//! let mode = settings::get(conn, settings::SETTING_LAST_PLAY_MODE).await?;
//! # Ok(())
//! # }
//! ```

use cadence_core::Result;
use sqlx::SqliteConnection;

use crate::schema::Table;
use crate::store::{self, Record};

/// Play mode chosen the last time a playlist was started
pub const SETTING_LAST_PLAY_MODE: &str = "playback.last_play_mode";

/// Whether the onboarding screen was already shown
pub const SETTING_ONBOARDED: &str = "app.onboarded";

pub async fn get(conn: &mut SqliteConnection, key: &str) -> Result<Option<serde_json::Value>> {
    let Some(record) = store::select_one(conn, Table::Settings, "key = ?", &[key.into()]).await?
    else {
        return Ok(None);
    };
    let raw = record.get_string("value")?;
    Ok(Some(serde_json::from_str(&raw)?))
}

/// Insert or replace the value of `key`
pub async fn set(conn: &mut SqliteConnection, key: &str, value: &serde_json::Value) -> Result<()> {
    let encoded = serde_json::to_string(value)?;
    let affected = store::update(
        conn,
        Table::Settings,
        &Record::new().with("value", encoded.as_str()),
        Some("key = ?"),
        &[key.into()],
    )
    .await?;

    if affected == 0 {
        store::insert_into(
            conn,
            Table::Settings,
            &Record::new().with("key", key).with("value", encoded),
        )
        .await?;
    }
    Ok(())
}

pub async fn delete(conn: &mut SqliteConnection, key: &str) -> Result<bool> {
    let affected = store::delete_from(conn, Table::Settings, Some("key = ?"), &[key.into()]).await?;
    Ok(affected > 0)
}

/// Every setting as `(key, value)`, ordered by key
pub async fn get_all(conn: &mut SqliteConnection) -> Result<Vec<(String, serde_json::Value)>> {
    store::select_from(conn, Table::Settings, None, None, &[])
        .await?
        .iter()
        .map(|record| {
            let value = serde_json::from_str(&record.get_string("value")?)?;
            Ok((record.get_string("key")?, value))
        })
        .collect()
}
