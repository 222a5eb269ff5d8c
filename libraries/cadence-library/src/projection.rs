//! Library read model
//!
//! The UI subscribes to [`LibrarySnapshot`]s instead of querying tables. A
//! snapshot is rebuilt from storage after every committed library write, so
//! it never shows anything the database does not hold.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use cadence_core::{
    Artist, Playlist, PlaylistConfig, PlaylistContent, Projection, Result, Subscription, Track,
};
use cadence_storage::{artists, playlist_configs, playlist_content, playlists, tracks, LocalStore};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarySnapshot {
    /// User-visible playlists (system playlists excluded)
    pub playlists: Vec<Playlist>,
    pub configs: Vec<PlaylistConfig>,
    pub tracks: Vec<Track>,
    pub artists: Vec<Artist>,
    pub links: Vec<PlaylistContent>,
    /// Increases with every rebuild
    pub revision: u64,
}

/// Owns the library projection and rebuilds it on demand
pub struct LibraryProjector {
    store: Arc<LocalStore>,
    projection: Projection<LibrarySnapshot>,
    /// Serializes rebuilds so a stale read is never published last
    gate: Mutex<u64>,
}

impl LibraryProjector {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self {
            store,
            projection: Projection::new(LibrarySnapshot::default()),
            gate: Mutex::new(0),
        }
    }

    pub fn current(&self) -> LibrarySnapshot {
        self.projection.current()
    }

    pub fn subscribe(&self) -> Subscription<LibrarySnapshot> {
        self.projection.subscribe()
    }

    /// Re-read every library table and publish the result
    pub async fn refresh(&self) -> Result<LibrarySnapshot> {
        let mut revision = self.gate.lock().await;

        let mut conn = self.store.pool().acquire().await?;
        let mut snapshot = LibrarySnapshot {
            playlists: playlists::user_playlists(&mut conn).await?,
            configs: playlist_configs::get_all(&mut conn).await?,
            tracks: tracks::get_all(&mut conn).await?,
            artists: artists::get_all(&mut conn).await?,
            links: playlist_content::get_all(&mut conn).await?,
            revision: 0,
        };
        drop(conn);

        *revision += 1;
        snapshot.revision = *revision;
        self.projection.publish(snapshot.clone());

        tracing::trace!(revision = snapshot.revision, "library projection refreshed");
        Ok(snapshot)
    }

    /// Rebuild whenever the store reports a write made outside the library
    /// mutators (listening history)
    pub fn spawn_listener(self: &Arc<Self>) -> tokio::task::AbortHandle {
        let projector = Arc::clone(self);
        let mut changes = self.store.changes();

        tokio::spawn(async move {
            // The first value is the revision at subscription time
            let _ = changes.next().await;
            while changes.next().await.is_some() {
                if let Err(e) = projector.refresh().await {
                    tracing::warn!("failed to refresh library projection: {}", e);
                }
            }
        })
        .abort_handle()
    }
}
