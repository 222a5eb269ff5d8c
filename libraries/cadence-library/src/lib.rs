//! Cadence Library
//!
//! The surface the UI layer talks to. It owns the cross-table mutators
//! (track and playlist deletion cascades, batch linking), wires the store,
//! the queue manager and the playback adapter together, and publishes a
//! subscribable read model of the library.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cadence_core::{CreatePlaylist, NewTrack, PlayMode, Platform, PlaybackEngine};
//! use cadence_library::{Library, LibraryConfig};
//!
//! # async fn example(engine: Arc<dyn PlaybackEngine>) -> cadence_core::Result<()> {
//! let config = LibraryConfig::default();
//! cadence_library::logging::init(&config.log_filter);
//!
//! let library = Library::open(&config, engine).await?;
//! let playlist = library.create_playlist(&CreatePlaylist::new("Road trip")).await?;
//! let track = library
//!     .add_track(&NewTrack {
//!         title: "Intro".to_string(),
//!         file_uri: "file://intro.mp3".to_string(),
//!         artist_name: "The Band".to_string(),
//!         platform: Platform::None,
//!         millis: 215_000,
//!         cover_uri: None,
//!     })
//!     .await?;
//!
//! library.link_tracks(playlist.id, &[track.id]).await?;
//! library.play(playlist.id, PlayMode::Shuffle).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod library;
pub mod logging;
pub mod playlists;
pub mod projection;
pub mod tracks;

pub use config::{ConfigError, LibraryConfig};
pub use library::Library;
pub use playlists::LinkOutcome;
pub use projection::{LibraryProjector, LibrarySnapshot};
