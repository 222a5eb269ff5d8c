//! Field-level input validation
//!
//! Validation runs before any I/O. Failures are reported as a map of field
//! name to message so the UI can mark each offending input.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CadenceError, Result};
use crate::types::{is_reserved_title, CreatePlaylist, NewTrack, UpdatePlaylist, UpdateTrack};

/// Validation failures keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for `field` (the first message per field wins)
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Ok(())` when nothing was recorded, otherwise `CadenceError::Validation`
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CadenceError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        f.write_str(&parts.join("; "))
    }
}

/// Input that can be checked before it reaches storage
pub trait Validate {
    /// # Errors
    /// Returns `CadenceError::Validation` listing every failing field
    fn validate(&self) -> Result<()>;
}

fn check_title(errors: &mut FieldErrors, title: &str) {
    if title.trim().is_empty() {
        errors.add("title", "must not be empty");
    } else if is_reserved_title(title.trim()) {
        errors.add("title", "is reserved");
    }
}

impl Validate for CreatePlaylist {
    fn validate(&self) -> Result<()> {
        let mut errors = FieldErrors::new();
        check_title(&mut errors, &self.title);
        errors.into_result()
    }
}

impl Validate for UpdatePlaylist {
    fn validate(&self) -> Result<()> {
        let mut errors = FieldErrors::new();
        if let Some(title) = &self.title {
            check_title(&mut errors, title);
        }
        errors.into_result()
    }
}

impl Validate for NewTrack {
    fn validate(&self) -> Result<()> {
        let mut errors = FieldErrors::new();
        if self.title.trim().is_empty() {
            errors.add("title", "must not be empty");
        }
        if self.file_uri.trim().is_empty() {
            errors.add("file_uri", "must not be empty");
        }
        if self.artist_name.trim().is_empty() {
            errors.add("artist_name", "must not be empty");
        }
        if self.millis < 0 {
            errors.add("millis", "must not be negative");
        }
        errors.into_result()
    }
}

impl Validate for UpdateTrack {
    fn validate(&self) -> Result<()> {
        let mut errors = FieldErrors::new();
        if self.is_empty() {
            errors.add("update", "no fields to change");
        }
        if self.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            errors.add("title", "must not be empty");
        }
        if self
            .artist_name
            .as_deref()
            .is_some_and(|a| a.trim().is_empty())
        {
            errors.add("artist_name", "must not be empty");
        }
        if self.millis.is_some_and(|m| m < 0) {
            errors.add("millis", "must not be negative");
        }
        errors.into_result()
    }
}
