//! Cadence Playback
//!
//! The playback queue: a persisted, single-writer state machine over the order
//! map of the loaded playlist config, plus the bridge to the external audio
//! engine.
//!
//! This crate provides:
//! - `QueueMachine`: pure transitions (load, set index, advance, loop back,
//!   reorder, prune, extend) returning a persist-then-apply plan
//! - Shuffle and reverse order generation that keep the current track first
//! - `QueueManager`: a single task handling every queue mutation FIFO,
//!   persisting before publishing
//! - `PlaybackAdapter`: engine synchronization and engine event routing
//!
//! # Architecture
//!
//! `cadence-playback` has no storage or audio dependency. Persistence and the
//! engine are reached through the `QueueStore`, `PlaybackCatalog` and
//! `PlaybackEngine` traits from `cadence-core`.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cadence_core::{PlayMode, PlaybackCatalog, PlaybackEngine, QueueStore};
//! use cadence_playback::{PlaybackAdapter, QueueManager, Transport};
//!
//! # async fn example(
//! #     store: Arc<dyn QueueStore>,
//! #     engine: Arc<dyn PlaybackEngine>,
//! #     catalog: Arc<dyn PlaybackCatalog>,
//! # ) -> cadence_core::Result<()> {
//! let queue = QueueManager::spawn(store);
//! queue.restore().await?;
//!
//! let adapter = PlaybackAdapter::spawn(queue.clone(), engine, catalog);
//! queue.play(1, PlayMode::Shuffle).await?;
//! adapter.transport(Transport::Play).await?;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod manager;
pub mod queue;
pub mod shuffle;
pub mod types;

pub use adapter::{AdapterHandle, PlaybackAdapter, Transport};
pub use manager::{QueueCommand, QueueHandle, QueueManager};
pub use queue::{Plan, QueueMachine};
pub use types::{QueueWarning, ReorderOutcome};
