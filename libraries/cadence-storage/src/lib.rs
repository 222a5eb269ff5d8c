//! Cadence Storage
//!
//! `SQLite` persistence layer for the Cadence library and playback queue.
//!
//! # Architecture
//!
//! - **Schema**: table definitions and idempotent lifecycle (`create`, `drop`,
//!   `truncate`) in [`schema`]
//! - **Generic CRUD**: parameterized `select_from` / `insert_into` / `update` /
//!   `delete_from` / `exists_in` primitives in [`store`], used by every slice
//! - **Vertical Slicing**: each table owns its own queries and row mapping
//! - **Row locks**: read-modify-write sequences on the same logical row are
//!   serialized through [`RowLocks`]
//! - **Write transactions**: every multi-statement write opens with
//!   [`begin_write`] (`BEGIN IMMEDIATE`)
//!
//! Slice functions take a `&mut SqliteConnection`, so the same function works
//! on a pooled connection or inside a transaction (`&mut *tx`).
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_storage::{create_pool, LocalStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool("sqlite://cadence.db", 5).await?;
//! let store = LocalStore::open(pool, 50).await?;
//!
//! let mut conn = store.pool().acquire().await?;
//! let tracks = cadence_storage::tracks::get_all(&mut conn).await?;
//! # Ok(())
//! # }
//! ```

mod context;
mod error;
mod locks;

pub mod schema;
pub mod store;

// Vertical slices
pub mod artists;
pub mod playlist_configs;
pub mod playlist_content;
pub mod playlists;
pub mod queue_state;
pub mod quotes;
pub mod settings;
pub mod tracks;

pub use context::{HistoryPolicy, LocalStore};
pub use error::StorageError;
pub use locks::{RowKey, RowLocks};
pub use schema::Table;
pub use store::{Record, Value};

use sqlx::sqlite::SqlitePool;
use sqlx::{Sqlite, Transaction};

/// Create every table that does not exist yet
///
/// This should be called once when the application starts. It is idempotent.
///
/// # Errors
///
/// Returns an error if any DDL statement fails
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), StorageError> {
    let mut conn = pool.acquire().await?;
    schema::create_all(&mut conn)
        .await
        .map_err(|e| StorageError::Migration(e.to_string()))
}

/// Start a write transaction holding the database write lock from its
/// first statement
///
/// A deferred transaction that reads first cannot upgrade to a write once
/// another connection has committed; SQLite fails it with `SQLITE_BUSY`
/// without waiting. `BEGIN IMMEDIATE` waits on `busy_timeout` instead.
///
/// # Errors
///
/// Returns an error if the lock is not acquired within the busy timeout
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, StorageError> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Create a new `SQLite` pool
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `<sqlite://cadence.db>`)
/// * `max_connections` - pool size
///
/// # Errors
///
/// Returns an error if the connection fails
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool, StorageError> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    tracing::debug!(database_url, "creating sqlite pool");

    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

    tracing::info!(database_url, "sqlite pool ready");

    Ok(pool)
}
