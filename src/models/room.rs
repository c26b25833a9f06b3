//! Room model.
//!
//! Rooms are the spatial resource of a timetable. Each room hosts at most
//! one session at a time and seats a fixed number of attendees.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A room that can host sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// Unique room identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Seats available.
    pub capacity: u32,
    /// Domain-specific metadata.
    pub attributes: HashMap<String, String>,
}

impl Room {
    /// Creates a room with the given capacity.
    pub fn new(id: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            capacity,
            attributes: HashMap::new(),
        }
    }

    /// Sets the room name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a domain-specific attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Whether the room seats `attendance` people.
    #[inline]
    pub fn fits(&self, attendance: u32) -> bool {
        self.capacity >= attendance
    }

    /// Whether the room is more than twice the size the audience needs.
    ///
    /// Sessions with no expected audience are never considered oversized.
    #[inline]
    pub fn is_oversized_for(&self, attendance: u32) -> bool {
        attendance > 0 && u64::from(self.capacity) > 2 * u64::from(attendance)
    }
}
