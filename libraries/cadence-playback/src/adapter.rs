//! Playback adapter
//!
//! Mirrors published queue snapshots onto the external [`PlaybackEngine`] and
//! feeds engine events back into the queue manager. The adapter keeps a copy
//! of the track ids it believes the engine holds, so most snapshot changes
//! become small deltas:
//!
//! - pure append: load only the new tail
//! - pure removal: remove the missing entries, highest index first
//! - upcoming tracks changed: drop and reload everything after the current one
//! - anything else (or a new epoch): reset and reload the whole queue
//!
//! Snapshots are always handled before engine events and transport commands
//! that arrived later, so a `play()` issued right after a queue change acts
//! on the new queue.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use cadence_core::{
    CadenceError, EngineEvent, EnginePlaybackState, PlaybackCatalog, PlaybackEngine,
    PlaylistConfigId, QueueSnapshot, QueueStatus, Result, TrackId,
};

use crate::manager::QueueHandle;

/// User transport commands routed through the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Play,
    Pause,
    SeekTo(u64),
}

enum AdapterInput {
    Event(EngineEvent),
    Transport {
        command: Transport,
        reply: oneshot::Sender<Result<()>>,
    },
    Flush {
        reply: oneshot::Sender<()>,
    },
    Shutdown,
}

/// Cloneable handle to the adapter task
#[derive(Clone)]
pub struct AdapterHandle {
    tx: mpsc::UnboundedSender<AdapterInput>,
}

impl AdapterHandle {
    /// Forward an engine callback; never blocks
    pub fn engine_event(&self, event: EngineEvent) {
        if self.tx.send(AdapterInput::Event(event)).is_err() {
            tracing::warn!("playback adapter stopped, dropping engine event");
        }
    }

    pub async fn transport(&self, command: Transport) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(AdapterInput::Transport { command, reply })
            .map_err(|_| CadenceError::engine("playback adapter is not running"))?;
        rx.await
            .map_err(|_| CadenceError::engine("playback adapter is not running"))?
    }

    /// Wait until every input sent before this call has been handled
    pub async fn flush(&self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(AdapterInput::Flush { reply }).is_ok() {
            let _ = rx.await;
        }
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(AdapterInput::Shutdown);
    }
}

pub struct PlaybackAdapter {
    queue: QueueHandle,
    engine: Arc<dyn PlaybackEngine>,
    catalog: Arc<dyn PlaybackCatalog>,

    /// Track ids loaded in the engine, in engine order
    loaded: Vec<TrackId>,
    /// Engine position, `None` when unknown
    engine_index: Option<usize>,
    /// Epoch of the last reconciled snapshot
    epoch: Option<u64>,
    engine_state: EnginePlaybackState,
    /// Start playback after the next full reload (loop-back)
    resume_after_reload: bool,
    /// Current track of the last seen snapshot; `None` before the first one
    last_current: Option<(Option<PlaylistConfigId>, Option<TrackId>)>,
}

impl PlaybackAdapter {
    /// Start the adapter task
    pub fn spawn(
        queue: QueueHandle,
        engine: Arc<dyn PlaybackEngine>,
        catalog: Arc<dyn PlaybackCatalog>,
    ) -> AdapterHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let adapter = Self {
            queue,
            engine,
            catalog,
            loaded: Vec::new(),
            engine_index: None,
            epoch: None,
            engine_state: EnginePlaybackState::None,
            resume_after_reload: false,
            last_current: None,
        };
        tokio::spawn(adapter.run(rx));
        AdapterHandle { tx }
    }

    async fn run(mut self, mut inputs: mpsc::UnboundedReceiver<AdapterInput>) {
        let mut snapshots = self.queue.subscribe();
        tracing::debug!("playback adapter started");

        loop {
            tokio::select! {
                biased;

                snapshot = snapshots.next() => {
                    let Some(snapshot) = snapshot else { break };
                    self.on_snapshot(snapshot).await;
                }
                input = inputs.recv() => {
                    match input {
                        Some(AdapterInput::Event(event)) => self.on_event(event).await,
                        Some(AdapterInput::Transport { command, reply }) => {
                            let _ = reply.send(self.on_transport(command).await);
                        }
                        Some(AdapterInput::Flush { reply }) => {
                            let _ = reply.send(());
                        }
                        Some(AdapterInput::Shutdown) | None => break,
                    }
                }
            }
        }

        tracing::debug!("playback adapter stopped");
    }

    async fn on_snapshot(&mut self, snapshot: QueueSnapshot) {
        self.record_history(&snapshot).await;

        if let Err(e) = self.reconcile(&snapshot).await {
            tracing::error!(epoch = snapshot.epoch, "failed to sync engine queue: {}", e);
            // Force a full reload on the next snapshot
            self.epoch = None;
        }
    }

    async fn record_history(&mut self, snapshot: &QueueSnapshot) {
        let current = (snapshot.playlist_config_id, snapshot.current_track());
        let previous = self.last_current.replace(current);

        // The first snapshot is the restored state, not a new play
        let Some(previous) = previous else {
            return;
        };
        let (config_id, Some(track_id)) = current else {
            return;
        };
        if previous == current {
            return;
        }

        if let Err(e) = self.catalog.record_history(track_id, config_id).await {
            tracing::warn!(track_id, "failed to record history: {}", e);
        }
    }

    async fn reconcile(&mut self, snapshot: &QueueSnapshot) -> Result<()> {
        if snapshot.status() == QueueStatus::Empty {
            if !self.loaded.is_empty() {
                self.engine.reset().await?;
                self.loaded.clear();
                self.engine_index = None;
                tracing::debug!("engine queue cleared");
            }
            self.epoch = Some(snapshot.epoch);
            return Ok(());
        }

        let target = snapshot.order_map.as_slice();
        let current = snapshot.current_index;

        if self.epoch != Some(snapshot.epoch) || self.loaded.is_empty() {
            self.reload(snapshot).await?;
        } else if self.loaded.as_slice() == target {
            // Unchanged
        } else if target.starts_with(&self.loaded) {
            let tail = target[self.loaded.len()..].to_vec();
            self.append(&tail).await?;
        } else if let Some(removed) = removed_positions(&self.loaded, target) {
            self.remove_positions(&removed).await?;
        } else if self.engine_index == Some(current)
            && self.loaded.len() > current
            && self.loaded[..=current] == target[..=current]
        {
            let stale: Vec<usize> = (current + 1..self.loaded.len()).collect();
            self.remove_positions(&stale).await?;
            let tail = target[current + 1..].to_vec();
            self.append(&tail).await?;
        } else {
            self.reload(snapshot).await?;
        }

        if self.engine_index != Some(current) {
            self.engine.skip_to(current).await?;
            self.engine_index = Some(current);
        }
        self.epoch = Some(snapshot.epoch);
        Ok(())
    }

    async fn reload(&mut self, snapshot: &QueueSnapshot) -> Result<()> {
        let target = snapshot.order_map.as_slice();
        let tracks = self.catalog.resolve_tracks(target).await?;

        tracing::debug!(
            epoch = snapshot.epoch,
            len = tracks.len(),
            index = snapshot.current_index,
            "reloading engine queue"
        );

        self.engine.reset().await?;
        self.loaded.clear();
        self.engine_index = None;

        self.engine.load(tracks).await?;
        self.loaded = target.to_vec();
        self.engine_index = Some(0);

        if snapshot.current_index > 0 {
            self.engine.skip_to(snapshot.current_index).await?;
            self.engine_index = Some(snapshot.current_index);
        }
        if snapshot.current_millis > 0 {
            self.engine.seek_to(snapshot.current_millis).await?;
        }

        let resume = std::mem::take(&mut self.resume_after_reload)
            || self.engine_state == EnginePlaybackState::Playing;
        if resume {
            self.engine.play().await?;
        }
        Ok(())
    }

    async fn append(&mut self, tail: &[TrackId]) -> Result<()> {
        if tail.is_empty() {
            return Ok(());
        }
        let tracks = self.catalog.resolve_tracks(tail).await?;
        self.engine.load(tracks).await?;
        self.loaded.extend_from_slice(tail);
        tracing::debug!(added = tail.len(), "appended tracks to engine queue");
        Ok(())
    }

    /// Remove engine entries, highest position first
    async fn remove_positions(&mut self, positions: &[usize]) -> Result<()> {
        for &position in positions.iter().rev() {
            self.engine.remove(position).await?;
            self.loaded.remove(position);
            self.engine_index = match self.engine_index {
                Some(index) if position < index => Some(index - 1),
                Some(index) if position == index => None,
                other => other,
            };
        }
        tracing::debug!(removed = positions.len(), "removed tracks from engine queue");
        Ok(())
    }

    async fn on_event(&mut self, event: EngineEvent) {
        let result = match event {
            EngineEvent::TrackChanged { index } => self.on_track_changed(index).await,
            EngineEvent::QueueEnded => match self.queue.queue_ended().await {
                Ok(looped) => {
                    self.resume_after_reload = looped;
                    Ok(())
                }
                Err(e) => Err(e),
            },
            EngineEvent::PlaybackStateChanged(state) => {
                tracing::debug!(?state, "engine state changed");
                self.engine_state = state;
                Ok(())
            }
            EngineEvent::Progress { millis } => self.queue.set_millis(millis).await.map(|_| ()),
        };

        if let Err(e) = result {
            tracing::error!("failed to handle engine event: {}", e);
        }
    }

    async fn on_track_changed(&mut self, engine_index: usize) -> Result<()> {
        self.engine_index = Some(engine_index);

        let Some(track_id) = self.loaded.get(engine_index).copied() else {
            tracing::debug!(engine_index, "engine reported an unknown index");
            return Ok(());
        };
        let Some(index) = self.queue.snapshot().order_map.position(track_id) else {
            tracing::debug!(track_id, "engine track is no longer queued");
            return Ok(());
        };

        self.queue.set_index(index).await?;
        Ok(())
    }

    async fn on_transport(&mut self, command: Transport) -> Result<()> {
        match command {
            Transport::Play => self.engine.play().await,
            Transport::Pause => self.engine.pause().await,
            Transport::SeekTo(millis) => {
                self.engine.seek_to(millis).await?;
                self.queue.set_millis(millis).await?;
                Ok(())
            }
        }
    }
}

/// Positions of `loaded` missing from `target`, if `target` is `loaded` with
/// some entries removed and the rest in the same order
fn removed_positions(loaded: &[TrackId], target: &[TrackId]) -> Option<Vec<usize>> {
    if target.len() >= loaded.len() {
        return None;
    }

    let mut removed = Vec::new();
    let mut next = target.iter().peekable();
    for (position, id) in loaded.iter().enumerate() {
        if next.peek() == Some(&id) {
            next.next();
        } else {
            removed.push(position);
        }
    }

    next.peek().is_none().then_some(removed)
}
