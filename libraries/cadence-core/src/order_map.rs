//! Order maps
//!
//! An order map is the persisted play order of a playlist config: an ordered
//! sequence of track ids, stored in a single text column as comma-separated
//! decimal integers (`"3,1,2"`, `""` for an empty map).
//!
//! Every edit returns a new map. Callers read the whole sequence, change it in
//! memory and write the whole sequence back; there are no positional in-place
//! writes against storage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CadenceError, Result};
use crate::types::TrackId;

const SEPARATOR: char = ',';

/// Ordered sequence of track ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderMap(Vec<TrackId>);

impl OrderMap {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Decode the packed text representation
    ///
    /// # Errors
    /// Returns `Serialization` if any entry is not an integer
    pub fn parse(packed: &str) -> Result<Self> {
        let packed = packed.trim();
        if packed.is_empty() {
            return Ok(Self::new());
        }

        packed
            .split(SEPARATOR)
            .map(|entry| {
                entry.trim().parse::<TrackId>().map_err(|e| {
                    CadenceError::Serialization(format!("bad order map entry {entry:?}: {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    /// Encode into the packed text representation
    pub fn serialize(&self) -> String {
        self.0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn as_slice(&self) -> &[TrackId] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<TrackId> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<TrackId> {
        self.0.get(index).copied()
    }

    pub fn contains(&self, track_id: TrackId) -> bool {
        self.0.contains(&track_id)
    }

    pub fn position(&self, track_id: TrackId) -> Option<usize> {
        self.0.iter().position(|&id| id == track_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = TrackId> + '_ {
        self.0.iter().copied()
    }

    /// Map with every occurrence of `track_id` removed
    #[must_use]
    pub fn without(&self, track_id: TrackId) -> Self {
        self.without_all(&[track_id])
    }

    /// Map with every occurrence of any of `track_ids` removed
    #[must_use]
    pub fn without_all(&self, track_ids: &[TrackId]) -> Self {
        Self(
            self.0
                .iter()
                .copied()
                .filter(|id| !track_ids.contains(id))
                .collect(),
        )
    }

    /// Append ids not already present, preserving existing relative order
    ///
    /// Returns the new map and the ids actually appended.
    #[must_use]
    pub fn append_missing(&self, track_ids: &[TrackId]) -> (Self, Vec<TrackId>) {
        let mut ids = self.0.clone();
        let mut appended = Vec::new();
        for &id in track_ids {
            if !ids.contains(&id) {
                ids.push(id);
                appended.push(id);
            }
        }
        (Self(ids), appended)
    }

    /// Map with `track_id` at the end, moving an existing occurrence instead of
    /// inserting a duplicate
    #[must_use]
    pub fn move_to_end(&self, track_id: TrackId) -> Self {
        let mut ids = self.without(track_id).0;
        ids.push(track_id);
        Self(ids)
    }

    /// Map with the entry at `from` moved to `to`
    ///
    /// Returns `None` when either position is out of range.
    #[must_use]
    pub fn moved(&self, from: usize, to: usize) -> Option<Self> {
        if from >= self.len() || to >= self.len() {
            return None;
        }
        let mut ids = self.0.clone();
        let id = ids.remove(from);
        ids.insert(to, id);
        Some(Self(ids))
    }

    /// Keep at most `limit` trailing entries
    ///
    /// Returns the trimmed map and the evicted (oldest) ids.
    #[must_use]
    pub fn keep_last(&self, limit: usize) -> (Self, Vec<TrackId>) {
        if self.len() <= limit {
            return (self.clone(), Vec::new());
        }
        let split = self.len() - limit;
        (Self(self.0[split..].to_vec()), self.0[..split].to_vec())
    }
}

impl From<Vec<TrackId>> for OrderMap {
    fn from(ids: Vec<TrackId>) -> Self {
        Self(ids)
    }
}

impl FromIterator<TrackId> for OrderMap {
    fn from_iter<I: IntoIterator<Item = TrackId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for OrderMap {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for OrderMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}
