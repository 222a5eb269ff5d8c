//! Table definitions and lifecycle
//!
//! The schema is embedded as DDL constants and applied statement by statement.
//! Every lifecycle operation is idempotent: `create_all` on an existing
//! database, `drop_all` on an empty one and `truncate` on an already-empty
//! table are all no-ops.

use sqlx::SqliteConnection;

use cadence_core::Result;

/// A table of the Cadence schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    Artists,
    Playlists,
    PlaylistConfigs,
    Tracks,
    PlaylistContent,
    Queue,
    Quotes,
    Settings,
}

impl Table {
    /// Creation order; parents before children
    pub const ALL: [Table; 8] = [
        Table::Artists,
        Table::Playlists,
        Table::PlaylistConfigs,
        Table::Tracks,
        Table::PlaylistContent,
        Table::Queue,
        Table::Quotes,
        Table::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Artists => "artists",
            Self::Playlists => "playlists",
            Self::PlaylistConfigs => "playlist_configs",
            Self::Tracks => "tracks",
            Self::PlaylistContent => "playlist_content",
            Self::Queue => "queue",
            Self::Quotes => "quotes",
            Self::Settings => "settings",
        }
    }

    /// Column used for deterministic ordering of unrestricted selects
    pub fn order_column(&self) -> &'static str {
        match self {
            Self::Settings => "key",
            _ => "id",
        }
    }

    fn ddl(&self) -> &'static [&'static str] {
        match self {
            Self::Artists => &[
                "CREATE TABLE IF NOT EXISTS artists (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE,
                    favorite INTEGER NOT NULL DEFAULT 0
                )",
            ],
            Self::Playlists => &[
                "CREATE TABLE IF NOT EXISTS playlists (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    cover_uri TEXT,
                    favorite INTEGER NOT NULL DEFAULT 0
                )",
            ],
            Self::PlaylistConfigs => &[
                "CREATE TABLE IF NOT EXISTS playlist_configs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    playlist_id INTEGER NOT NULL UNIQUE REFERENCES playlists(id),
                    order_map TEXT NOT NULL DEFAULT '',
                    is_looping INTEGER NOT NULL DEFAULT 0,
                    is_shuffling INTEGER NOT NULL DEFAULT 0,
                    is_reversing INTEGER NOT NULL DEFAULT 0
                )",
            ],
            Self::Tracks => &[
                "CREATE TABLE IF NOT EXISTS tracks (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    cover_uri TEXT,
                    file_uri TEXT NOT NULL UNIQUE,
                    millis INTEGER NOT NULL DEFAULT 0,
                    favorite INTEGER NOT NULL DEFAULT 0,
                    platform TEXT NOT NULL DEFAULT 'NONE'
                        CHECK (platform IN ('NONE', 'SPOTIFY', 'SOUNDCLOUD', 'YOUTUBE')),
                    artist_id INTEGER NOT NULL REFERENCES artists(id)
                )",
                "CREATE INDEX IF NOT EXISTS idx_tracks_artist ON tracks(artist_id)",
            ],
            Self::PlaylistContent => &[
                "CREATE TABLE IF NOT EXISTS playlist_content (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    playlist_id INTEGER NOT NULL REFERENCES playlists(id),
                    track_id INTEGER NOT NULL REFERENCES tracks(id),
                    UNIQUE (playlist_id, track_id)
                )",
                "CREATE INDEX IF NOT EXISTS idx_playlist_content_track ON playlist_content(track_id)",
            ],
            Self::Queue => &[
                "CREATE TABLE IF NOT EXISTS queue (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    current_index INTEGER NOT NULL DEFAULT 0,
                    current_millis INTEGER NOT NULL DEFAULT 0,
                    playlist_config_id INTEGER NOT NULL DEFAULT -1
                )",
            ],
            Self::Quotes => &[
                "CREATE TABLE IF NOT EXISTS quotes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    text TEXT NOT NULL,
                    author TEXT NOT NULL,
                    fetched_at TEXT NOT NULL
                )",
            ],
            Self::Settings => &[
                "CREATE TABLE IF NOT EXISTS settings (
                    key TEXT PRIMARY KEY NOT NULL,
                    value TEXT NOT NULL
                )",
            ],
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Create `table` if it does not exist
pub async fn create_table(conn: &mut SqliteConnection, table: Table) -> Result<()> {
    for statement in table.ddl() {
        sqlx::query(statement).execute(&mut *conn).await?;
    }
    Ok(())
}

/// Create every table in dependency order
pub async fn create_all(conn: &mut SqliteConnection) -> Result<()> {
    for table in Table::ALL {
        create_table(conn, table).await?;
    }
    tracing::debug!("schema up to date");
    Ok(())
}

/// Drop every table, children first
pub async fn drop_all(conn: &mut SqliteConnection) -> Result<()> {
    for table in Table::ALL.iter().rev() {
        let sql = format!("DROP TABLE IF EXISTS {}", table.as_str());
        sqlx::query(&sql).execute(&mut *conn).await?;
    }
    tracing::info!("dropped all tables");
    Ok(())
}

async fn table_exists(conn: &mut SqliteConnection, name: &str) -> Result<bool> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(found.is_some())
}

/// Delete every row of `table` and reset its autoincrement counter
///
/// A missing table is left alone.
pub async fn truncate(conn: &mut SqliteConnection, table: Table) -> Result<()> {
    if !table_exists(conn, table.as_str()).await? {
        return Ok(());
    }

    let sql = format!("DELETE FROM {}", table.as_str());
    sqlx::query(&sql).execute(&mut *conn).await?;

    // sqlite_sequence only exists once some AUTOINCREMENT table has had a row
    if table_exists(conn, "sqlite_sequence").await? {
        sqlx::query("DELETE FROM sqlite_sequence WHERE name = ?")
            .bind(table.as_str())
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Truncate every table, children first
pub async fn truncate_all(conn: &mut SqliteConnection) -> Result<()> {
    for table in Table::ALL.iter().rev() {
        truncate(conn, *table).await?;
    }
    Ok(())
}
