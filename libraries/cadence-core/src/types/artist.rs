//! Artist types

use serde::{Deserialize, Serialize};

use super::ids::ArtistId;

/// An artist
///
/// Created on first import of a track referencing it; never deleted directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: ArtistId,
    pub name: String,
    pub favorite: bool,
}
