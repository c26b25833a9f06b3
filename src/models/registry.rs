//! Speaker and track registries.
//!
//! Both registries are optional. When a domain model lists speakers (or
//! tracks), every session must reference a listed one; when the list is
//! empty, ids are taken from the sessions as-is.

use serde::{Deserialize, Serialize};

/// A presenter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speaker {
    /// Unique speaker identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Slots during which the speaker cannot present.
    pub unavailable_slots: Vec<String>,
}

impl Speaker {
    /// Creates a speaker available in every slot.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            unavailable_slots: Vec::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Marks a slot as unavailable.
    pub fn unavailable_at(mut self, slot_id: impl Into<String>) -> Self {
        self.unavailable_slots.push(slot_id.into());
        self
    }
}

/// A thematic track grouping related sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Unique track identifier.
    pub id: String,
    /// Display name.
    pub name: String,
}

impl Track {
    /// Creates a track.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
