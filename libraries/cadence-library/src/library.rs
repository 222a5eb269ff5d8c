//! The intent surface consumed by the UI layer

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use cadence_core::{
    ArtistId, CadenceError, CreatePlaylist, EngineEvent, NewTrack, PlayMode, PlaybackEngine,
    Playlist, PlaylistId, QueueSnapshot, QueueStatus, Quote, QuoteSource, Result, Subscription,
    Track, TrackId, UpdatePlaylist, UpdateTrack,
};
use cadence_playback::{
    AdapterHandle, PlaybackAdapter, QueueHandle, QueueManager, ReorderOutcome, Transport,
};
use cadence_storage::{
    create_pool, playlist_configs, quotes, settings, LocalStore, RowKey, Table,
};

use crate::config::LibraryConfig;
use crate::playlists::{self, LinkOutcome};
use crate::projection::{LibraryProjector, LibrarySnapshot};
use crate::tracks;

/// Offset past which `previous()` restarts the current track instead
const RESTART_THRESHOLD_MS: u64 = 3_000;

/// Handle to a running library: store, queue manager and playback adapter
///
/// Cheap to clone; every clone drives the same tasks.
#[derive(Clone)]
pub struct Library {
    store: Arc<LocalStore>,
    queue: QueueHandle,
    adapter: AdapterHandle,
    projector: Arc<LibraryProjector>,
    listener: tokio::task::AbortHandle,
    quote_max_age: Duration,
}

impl Library {
    /// Open the database named by `config` and start playback on `engine`
    pub async fn open(config: &LibraryConfig, engine: Arc<dyn PlaybackEngine>) -> Result<Self> {
        config
            .validate()
            .map_err(|e| CadenceError::invalid_argument(e.to_string()))?;
        let quote_max_age = config
            .quote_max_age()
            .map_err(|e| CadenceError::invalid_argument(e.to_string()))?;

        let pool = create_pool(&config.database_url, config.max_connections).await?;
        let store = LocalStore::open(pool, config.history_limit).await?;

        let library = Self::start(store, engine).await?;
        Ok(Self {
            quote_max_age,
            ..library
        })
    }

    /// Start on an already opened store, restoring the persisted queue
    pub async fn start(store: LocalStore, engine: Arc<dyn PlaybackEngine>) -> Result<Self> {
        let store = Arc::new(store);

        let queue = QueueManager::spawn(store.clone());
        let restored = queue.restore().await?;
        let adapter = PlaybackAdapter::spawn(queue.clone(), engine, store.clone());

        let projector = Arc::new(LibraryProjector::new(store.clone()));
        projector.refresh().await?;
        let listener = projector.spawn_listener();

        tracing::info!(
            queue = ?restored.status(),
            config_id = ?restored.playlist_config_id,
            "library started"
        );

        Ok(Self {
            store,
            queue,
            adapter,
            projector,
            listener,
            quote_max_age: Duration::from_secs(24 * 3600),
        })
    }

    /// Stop the background tasks
    pub async fn shutdown(&self) {
        self.listener.abort();
        self.adapter.shutdown();
        self.queue.shutdown().await;
        tracing::info!("library stopped");
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    // ===== Reactive read model =====

    pub fn subscribe(&self) -> Subscription<LibrarySnapshot> {
        self.projector.subscribe()
    }

    pub fn snapshot(&self) -> LibrarySnapshot {
        self.projector.current()
    }

    pub fn subscribe_queue(&self) -> Subscription<QueueSnapshot> {
        self.queue.subscribe()
    }

    pub fn queue(&self) -> QueueSnapshot {
        self.queue.snapshot()
    }

    /// Wait until the playback adapter has caught up with the queue
    pub async fn settle(&self) {
        self.adapter.flush().await;
    }

    async fn publish(&self) {
        if let Err(e) = self.projector.refresh().await {
            tracing::warn!("failed to refresh library projection: {}", e);
        }
    }

    // ===== Tracks =====

    pub async fn add_track(&self, track: &NewTrack) -> Result<Track> {
        let created = tracks::add_track(&self.store, track).await?;
        self.publish().await;
        Ok(created)
    }

    pub async fn update_track(&self, id: TrackId, changes: &UpdateTrack) -> Result<Track> {
        let track = tracks::update_track(&self.store, id, changes).await?;
        self.publish().await;
        Ok(track)
    }

    pub async fn delete_track(&self, id: TrackId, confirmed: bool) -> Result<bool> {
        let deleted = tracks::delete_track(&self.store, &self.queue, id, confirmed).await?;
        if deleted {
            self.publish().await;
        }
        Ok(deleted)
    }

    pub async fn toggle_track_favorite(&self, id: TrackId) -> Result<bool> {
        let favorite = tracks::toggle_favorite(&self.store, id).await?;
        self.publish().await;
        Ok(favorite)
    }

    pub async fn toggle_artist_favorite(&self, id: ArtistId) -> Result<bool> {
        let favorite = tracks::toggle_artist_favorite(&self.store, id).await?;
        self.publish().await;
        Ok(favorite)
    }

    // ===== Playlists =====

    pub async fn create_playlist(&self, playlist: &CreatePlaylist) -> Result<Playlist> {
        let created = playlists::create_playlist(&self.store, playlist).await?;
        self.publish().await;
        Ok(created)
    }

    pub async fn update_playlist(&self, id: PlaylistId, changes: &UpdatePlaylist) -> Result<Playlist> {
        let playlist = playlists::update_playlist(&self.store, id, changes).await?;
        self.publish().await;
        Ok(playlist)
    }

    pub async fn delete_playlist(&self, id: PlaylistId, confirmed: bool) -> Result<()> {
        playlists::delete_playlist(&self.store, &self.queue, id, confirmed).await?;
        self.publish().await;
        Ok(())
    }

    pub async fn link_tracks(
        &self,
        playlist_id: PlaylistId,
        track_ids: &[TrackId],
    ) -> Result<Vec<LinkOutcome>> {
        let outcomes = playlists::link_tracks(&self.store, &self.queue, playlist_id, track_ids).await?;
        self.publish().await;
        Ok(outcomes)
    }

    pub async fn delete_from_playlist(
        &self,
        playlist_id: PlaylistId,
        track_id: TrackId,
        confirmed: bool,
    ) -> Result<bool> {
        let removed =
            playlists::delete_from_playlist(&self.store, &self.queue, playlist_id, track_id, confirmed)
                .await?;
        if removed {
            self.publish().await;
        }
        Ok(removed)
    }

    pub async fn toggle_playlist_favorite(&self, id: PlaylistId) -> Result<bool> {
        let favorite = playlists::toggle_favorite(&self.store, id).await?;
        self.publish().await;
        Ok(favorite)
    }

    pub async fn user_playlists(&self) -> Result<Vec<Playlist>> {
        playlists::user_playlists(&self.store).await
    }

    pub async fn playlist_tracks(&self, playlist_id: PlaylistId) -> Result<Vec<Track>> {
        playlists::playlist_tracks(&self.store, playlist_id).await
    }

    // ===== Queue and transport =====

    /// Load a playlist into the queue in `mode` and start playing
    pub async fn play(&self, playlist_id: PlaylistId, mode: PlayMode) -> Result<QueueSnapshot> {
        let config = {
            let mut conn = self.store.pool().acquire().await?;
            playlist_configs::require_by_playlist(&mut conn, playlist_id).await?
        };

        let snapshot = self.queue.play(config.id, mode).await?;
        self.remember_play_mode(mode).await;
        // Shuffle and reverse rewrite the config's order map
        self.publish().await;

        if snapshot.status() == QueueStatus::Loaded {
            self.adapter.transport(Transport::Play).await?;
        } else {
            tracing::info!(playlist_id, "playlist is empty, nothing to play");
        }
        Ok(snapshot)
    }

    pub async fn pause(&self) -> Result<()> {
        self.adapter.transport(Transport::Pause).await
    }

    pub async fn resume(&self) -> Result<()> {
        if self.queue.snapshot().status() == QueueStatus::Empty {
            return Err(CadenceError::invalid_argument("nothing is loaded"));
        }
        self.adapter.transport(Transport::Play).await
    }

    pub async fn seek_to(&self, millis: u64) -> Result<()> {
        self.adapter.transport(Transport::SeekTo(millis)).await
    }

    /// Jump to `index` of the current order
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when nothing is loaded or `index` is out of range
    pub async fn skip_to(&self, index: usize) -> Result<()> {
        let snapshot = self.queue.snapshot();
        if snapshot.status() == QueueStatus::Empty || index >= snapshot.order_map.len() {
            return Err(CadenceError::invalid_argument(format!(
                "queue index {index} out of range (len {})",
                snapshot.order_map.len()
            )));
        }
        self.queue.set_index(index).await?;
        Ok(())
    }

    /// Skip forward; wraps around only when looping
    pub async fn next(&self) -> Result<bool> {
        let snapshot = self.queue.snapshot();
        if snapshot.status() == QueueStatus::Empty {
            return Ok(false);
        }
        if snapshot.current_index + 1 < snapshot.order_map.len() {
            self.queue.advance().await
        } else if snapshot.flags.is_looping {
            self.queue.loop_back().await
        } else {
            Ok(false)
        }
    }

    /// Restart the current track once past the first seconds, otherwise
    /// step back one track
    pub async fn previous(&self) -> Result<bool> {
        let snapshot = self.queue.snapshot();
        if snapshot.status() == QueueStatus::Empty {
            return Ok(false);
        }
        if snapshot.current_millis > RESTART_THRESHOLD_MS || snapshot.current_index == 0 {
            self.seek_to(0).await?;
            return Ok(true);
        }
        self.queue.set_index(snapshot.current_index - 1).await
    }

    pub async fn reorder_queue(&self, from: usize, to: usize) -> Result<ReorderOutcome> {
        let outcome = self.queue.reorder(from, to).await?;
        if outcome.is_applied() {
            self.publish().await;
        }
        Ok(outcome)
    }

    pub async fn set_looping(&self, looping: bool) -> Result<bool> {
        let changed = self.queue.set_looping(looping).await?;
        if changed {
            self.publish().await;
        }
        Ok(changed)
    }

    /// Forward a playback engine callback
    pub fn engine_event(&self, event: EngineEvent) {
        self.adapter.engine_event(event);
    }

    // ===== Settings and quote =====

    pub async fn setting(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let mut conn = self.store.pool().acquire().await?;
        settings::get(&mut conn, key).await
    }

    pub async fn set_setting(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let _guard = self.store.locks().lock(RowKey::Table(Table::Settings)).await;
        let mut conn = self.store.pool().acquire().await?;
        settings::set(&mut conn, key, value).await
    }

    /// Mode of the last `play()`, if any
    pub async fn last_play_mode(&self) -> Result<Option<PlayMode>> {
        self.setting(settings::SETTING_LAST_PLAY_MODE)
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(Into::into)
    }

    async fn remember_play_mode(&self, mode: PlayMode) {
        let result = match serde_json::to_value(mode) {
            Ok(value) => self.set_setting(settings::SETTING_LAST_PLAY_MODE, &value).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            tracing::warn!("failed to store last play mode: {}", e);
        }
    }

    /// Cached daily quote, fetched from `source` once the cache is stale
    ///
    /// A failed fetch falls back to the stale quote when there is one.
    pub async fn daily_quote(&self, source: &dyn QuoteSource) -> Result<Quote> {
        let cached = {
            let mut conn = self.store.pool().acquire().await?;
            quotes::latest(&mut conn).await?
        };

        if let Some(quote) = &cached {
            let age = Utc::now().signed_duration_since(quote.fetched_at);
            if age.to_std().is_ok_and(|age| age < self.quote_max_age) {
                return Ok(quote.clone());
            }
        }

        match source.fetch_quote().await {
            Ok((text, author)) => {
                let quote = Quote {
                    text,
                    author,
                    fetched_at: Utc::now(),
                };
                let mut conn = self.store.pool().acquire().await?;
                quotes::replace(&mut conn, &quote).await?;
                tracing::debug!(author = %quote.author, "fetched daily quote");
                Ok(quote)
            }
            Err(e) => match cached {
                Some(quote) => {
                    tracing::warn!("quote fetch failed, keeping cached quote: {}", e);
                    Ok(quote)
                }
                None => Err(e),
            },
        }
    }
}
