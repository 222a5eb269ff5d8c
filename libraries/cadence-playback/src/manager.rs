//! Queue manager actor
//!
//! A single task owns the [`QueueMachine`]. UI intents and engine events
//! reach it as [`QueueCommand`]s over one channel and are handled strictly
//! FIFO, one at a time, so a command can never observe another half-applied.
//!
//! Every transition is persisted through the [`QueueStore`] before it is
//! applied in memory and published to subscribers.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use cadence_core::{
    CadenceError, OrderMap, PlayMode, PlaylistConfigId, Projection, QueueSnapshot, QueueStore,
    Result, Subscription, TrackId,
};

use crate::queue::{Plan, QueueMachine};
use crate::types::ReorderOutcome;

const COMMAND_BUFFER: usize = 64;

type Reply<T> = oneshot::Sender<Result<T>>;

/// Commands accepted by the queue manager
pub enum QueueCommand {
    /// Reload the persisted cursor (startup)
    Restore { reply: Reply<QueueSnapshot> },

    LoadConfig {
        config_id: PlaylistConfigId,
        preserve_position: bool,
        reply: Reply<QueueSnapshot>,
    },

    Play {
        config_id: PlaylistConfigId,
        mode: PlayMode,
        reply: Reply<QueueSnapshot>,
    },

    SetIndex { index: usize, reply: Reply<bool> },

    Advance { reply: Reply<bool> },

    LoopBack { reply: Reply<bool> },

    /// The engine ran past its last track
    QueueEnded { reply: Reply<bool> },

    Reorder {
        from: usize,
        to: usize,
        reply: Reply<ReorderOutcome>,
    },

    SetOrderMap {
        order_map: OrderMap,
        persist: bool,
        reply: Reply<bool>,
    },

    SetLooping { looping: bool, reply: Reply<bool> },

    SetMillis { millis: u64, reply: Reply<bool> },

    /// Tracks were deleted or unlinked; `None` targets whatever is loaded
    Prune {
        config_id: Option<PlaylistConfigId>,
        track_ids: Vec<TrackId>,
        reply: Reply<bool>,
    },

    /// Tracks were linked to the playlist of `config_id`
    Extend {
        config_id: PlaylistConfigId,
        track_ids: Vec<TrackId>,
        reply: Reply<bool>,
    },

    /// The config is being deleted
    Invalidate {
        config_id: PlaylistConfigId,
        reply: Reply<bool>,
    },

    Shutdown { reply: oneshot::Sender<()> },
}

/// The actor side; see [`QueueManager::spawn`]
pub struct QueueManager {
    machine: QueueMachine,
    store: Arc<dyn QueueStore>,
    projection: Arc<Projection<QueueSnapshot>>,
    commands: mpsc::Receiver<QueueCommand>,
}

impl QueueManager {
    /// Start the manager task and return a handle to it
    ///
    /// The queue starts `EMPTY`; call [`QueueHandle::restore`] to reload the
    /// persisted cursor.
    pub fn spawn(store: Arc<dyn QueueStore>) -> QueueHandle {
        let (tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let projection = Arc::new(Projection::new(QueueSnapshot::empty()));

        let manager = Self {
            machine: QueueMachine::new(),
            store,
            projection: Arc::clone(&projection),
            commands,
        };
        tokio::spawn(manager.run());

        QueueHandle { tx, projection }
    }

    async fn run(mut self) {
        tracing::debug!("queue manager started");

        while let Some(command) = self.commands.recv().await {
            match command {
                QueueCommand::Restore { reply } => {
                    let result = self.restore().await;
                    let _ = reply.send(result);
                }
                QueueCommand::LoadConfig {
                    config_id,
                    preserve_position,
                    reply,
                } => {
                    let result = self.load_config(config_id, preserve_position).await;
                    let _ = reply.send(result);
                }
                QueueCommand::Play {
                    config_id,
                    mode,
                    reply,
                } => {
                    let result = self.play(config_id, mode).await;
                    let _ = reply.send(result);
                }
                QueueCommand::SetIndex { index, reply } => {
                    let plan = self.machine.plan_set_index(index);
                    let _ = reply.send(self.execute(plan).await);
                }
                QueueCommand::Advance { reply } => {
                    let plan = self.machine.plan_advance();
                    let _ = reply.send(self.execute(plan).await);
                }
                QueueCommand::LoopBack { reply } => {
                    let plan = self.machine.plan_loop_back();
                    let _ = reply.send(self.execute(plan).await);
                }
                QueueCommand::QueueEnded { reply } => {
                    let plan = self.machine.plan_queue_ended();
                    if plan.is_some() {
                        tracing::info!("queue ended, looping back to the start");
                    } else {
                        tracing::debug!("queue ended, not looping");
                    }
                    let _ = reply.send(self.execute(plan).await);
                }
                QueueCommand::Reorder { from, to, reply } => {
                    let result = self.reorder(from, to).await;
                    let _ = reply.send(result);
                }
                QueueCommand::SetOrderMap {
                    order_map,
                    persist,
                    reply,
                } => {
                    let plan = self.machine.plan_set_order_map(order_map, persist);
                    let _ = reply.send(self.execute(plan).await);
                }
                QueueCommand::SetLooping { looping, reply } => {
                    let plan = self.machine.plan_set_looping(looping);
                    let _ = reply.send(self.execute(plan).await);
                }
                QueueCommand::SetMillis { millis, reply } => {
                    let plan = self.machine.plan_set_millis(millis);
                    let _ = reply.send(self.execute(plan).await);
                }
                QueueCommand::Prune {
                    config_id,
                    track_ids,
                    reply,
                } => {
                    let plan = self.machine.plan_prune(config_id, &track_ids);
                    if let Some(plan) = &plan {
                        tracing::debug!(
                            ?track_ids,
                            remaining = plan.next.order_map.len(),
                            "pruning live queue"
                        );
                    }
                    let _ = reply.send(self.execute(plan).await);
                }
                QueueCommand::Extend {
                    config_id,
                    track_ids,
                    reply,
                } => {
                    let plan = self.machine.plan_extend(config_id, &track_ids);
                    let _ = reply.send(self.execute(plan).await);
                }
                QueueCommand::Invalidate { config_id, reply } => {
                    let plan = self.machine.plan_invalidate(config_id);
                    if plan.is_some() {
                        tracing::info!(config_id, "active config invalidated, queue emptied");
                    }
                    let _ = reply.send(self.execute(plan).await);
                }
                QueueCommand::Shutdown { reply } => {
                    let _ = reply.send(());
                    break;
                }
            }
        }

        tracing::debug!("queue manager stopped");
    }

    /// Persist, then apply, then publish
    ///
    /// A failed write leaves memory and subscribers untouched.
    async fn execute(&mut self, plan: Option<Plan>) -> Result<bool> {
        let Some(plan) = plan else {
            return Ok(false);
        };

        if let Err(e) = self.store.commit(plan.commit.clone()).await {
            tracing::error!("failed to persist queue transition: {}", e);
            return Err(e);
        }

        let next = plan.next.clone();
        self.machine.apply(plan);
        self.projection.publish(next);
        Ok(true)
    }

    async fn restore(&mut self) -> Result<QueueSnapshot> {
        let cursor = self.store.load_cursor().await?;

        let plan = match cursor.playlist_config_id {
            None => {
                tracing::debug!("no queue to restore");
                None
            }
            Some(config_id) => match self.store.load_config(config_id).await? {
                None => {
                    tracing::warn!(config_id, "persisted queue references a missing config");
                    Some(self.machine.plan_empty())
                }
                Some(config) if cursor.current_index >= config.order_map.len() => {
                    tracing::warn!(
                        config_id,
                        index = cursor.current_index,
                        len = config.order_map.len(),
                        "persisted queue index out of range"
                    );
                    Some(self.machine.plan_empty())
                }
                Some(config) => {
                    tracing::info!(config_id, index = cursor.current_index, "restoring queue");
                    Some(self.machine.plan_load(
                        &config,
                        Some((cursor.current_index, cursor.current_millis)),
                    ))
                }
            },
        };

        self.execute(plan).await?;
        Ok(self.machine.snapshot().clone())
    }

    async fn load_config(
        &mut self,
        config_id: PlaylistConfigId,
        preserve_position: bool,
    ) -> Result<QueueSnapshot> {
        let plan = match self.store.load_config(config_id).await? {
            None => {
                tracing::warn!(config_id, "cannot load missing config, emptying queue");
                self.machine.plan_empty()
            }
            Some(config) => {
                let position = (preserve_position && self.machine.is_active(config_id)).then(|| {
                    let snapshot = self.machine.snapshot();
                    (snapshot.current_index, snapshot.current_millis)
                });
                tracing::info!(config_id, len = config.order_map.len(), "loading config");
                self.machine.plan_load(&config, position)
            }
        };

        self.execute(Some(plan)).await?;
        Ok(self.machine.snapshot().clone())
    }

    async fn play(&mut self, config_id: PlaylistConfigId, mode: PlayMode) -> Result<QueueSnapshot> {
        let plan = match self.store.load_config(config_id).await? {
            None => {
                tracing::warn!(config_id, "cannot play missing config, emptying queue");
                self.machine.plan_empty()
            }
            Some(config) => {
                tracing::info!(config_id, ?mode, len = config.order_map.len(), "playing config");
                self.machine.plan_play(&config, mode)
            }
        };

        self.execute(Some(plan)).await?;
        Ok(self.machine.snapshot().clone())
    }

    async fn reorder(&mut self, from: usize, to: usize) -> Result<ReorderOutcome> {
        match self.machine.plan_reorder(from, to) {
            Ok(plan) => {
                self.execute(plan).await?;
                Ok(ReorderOutcome::Applied)
            }
            Err(warning) => {
                tracing::warn!(from, to, %warning, "reorder rejected");
                Ok(ReorderOutcome::Rejected(warning))
            }
        }
    }
}

/// Cloneable handle to the queue manager task
#[derive(Clone)]
pub struct QueueHandle {
    tx: mpsc::Sender<QueueCommand>,
    projection: Arc<Projection<QueueSnapshot>>,
}

impl QueueHandle {
    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> QueueCommand) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| CadenceError::QueueUnavailable)?;
        rx.await.map_err(|_| CadenceError::QueueUnavailable)?
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> QueueSnapshot {
        self.projection.current()
    }

    /// Subscribe to queue snapshots, starting with the latest
    pub fn subscribe(&self) -> Subscription<QueueSnapshot> {
        self.projection.subscribe()
    }

    pub async fn restore(&self) -> Result<QueueSnapshot> {
        self.request(|reply| QueueCommand::Restore { reply }).await
    }

    pub async fn load_config(
        &self,
        config_id: PlaylistConfigId,
        preserve_position: bool,
    ) -> Result<QueueSnapshot> {
        self.request(|reply| QueueCommand::LoadConfig {
            config_id,
            preserve_position,
            reply,
        })
        .await
    }

    pub async fn play(&self, config_id: PlaylistConfigId, mode: PlayMode) -> Result<QueueSnapshot> {
        self.request(|reply| QueueCommand::Play {
            config_id,
            mode,
            reply,
        })
        .await
    }

    /// Returns whether the cursor moved
    pub async fn set_index(&self, index: usize) -> Result<bool> {
        self.request(|reply| QueueCommand::SetIndex { index, reply })
            .await
    }

    pub async fn advance(&self) -> Result<bool> {
        self.request(|reply| QueueCommand::Advance { reply }).await
    }

    pub async fn loop_back(&self) -> Result<bool> {
        self.request(|reply| QueueCommand::LoopBack { reply }).await
    }

    /// Returns whether the queue looped back
    pub async fn queue_ended(&self) -> Result<bool> {
        self.request(|reply| QueueCommand::QueueEnded { reply })
            .await
    }

    pub async fn reorder(&self, from: usize, to: usize) -> Result<ReorderOutcome> {
        self.request(|reply| QueueCommand::Reorder { from, to, reply })
            .await
    }

    pub async fn set_order_map(&self, order_map: OrderMap, persist: bool) -> Result<bool> {
        self.request(|reply| QueueCommand::SetOrderMap {
            order_map,
            persist,
            reply,
        })
        .await
    }

    pub async fn set_looping(&self, looping: bool) -> Result<bool> {
        self.request(|reply| QueueCommand::SetLooping { looping, reply })
            .await
    }

    pub async fn set_millis(&self, millis: u64) -> Result<bool> {
        self.request(|reply| QueueCommand::SetMillis { millis, reply })
            .await
    }

    pub async fn prune(
        &self,
        config_id: Option<PlaylistConfigId>,
        track_ids: Vec<TrackId>,
    ) -> Result<bool> {
        self.request(|reply| QueueCommand::Prune {
            config_id,
            track_ids,
            reply,
        })
        .await
    }

    pub async fn extend(&self, config_id: PlaylistConfigId, track_ids: Vec<TrackId>) -> Result<bool> {
        self.request(|reply| QueueCommand::Extend {
            config_id,
            track_ids,
            reply,
        })
        .await
    }

    pub async fn invalidate(&self, config_id: PlaylistConfigId) -> Result<bool> {
        self.request(|reply| QueueCommand::Invalidate { config_id, reply })
            .await
    }

    /// Stop the manager task; later requests fail with `QueueUnavailable`
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(QueueCommand::Shutdown { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }
}
