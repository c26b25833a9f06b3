//! Session model.
//!
//! A session is the unit of work placed on the timetable: a talk, workshop,
//! panel or keynote. It occupies one room for a contiguous run of slots.
//!
//! # Duration Model
//! Durations are counted in slot units, not wall-clock minutes. Ingestion
//! converts minutes to slot units before the engine sees the data.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A session to be timetabled.
///
/// # Pins
/// `pinned_room` and `pinned_slot` restrict the session to a fixed room
/// and/or a fixed start slot. Either may be set independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Number of consecutive slots the session occupies (must be > 0).
    pub duration: u32,
    /// Presenting speaker identifier.
    pub speaker_id: String,
    /// Track (theme) identifier.
    pub track_id: String,
    /// Expected number of attendees.
    pub expected_attendance: u32,
    /// Fixed room, if any.
    pub pinned_room: Option<String>,
    /// Fixed start slot, if any.
    pub pinned_slot: Option<String>,
    /// Domain-specific metadata.
    pub attributes: HashMap<String, String>,
}

impl Session {
    /// Creates a single-slot session with no speaker, track or audience.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            duration: 1,
            speaker_id: String::new(),
            track_id: String::new(),
            expected_attendance: 0,
            pinned_room: None,
            pinned_slot: None,
            attributes: HashMap::new(),
        }
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the duration in slot units.
    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = duration;
        self
    }

    /// Sets the speaker.
    pub fn with_speaker(mut self, speaker_id: impl Into<String>) -> Self {
        self.speaker_id = speaker_id.into();
        self
    }

    /// Sets the track.
    pub fn with_track(mut self, track_id: impl Into<String>) -> Self {
        self.track_id = track_id.into();
        self
    }

    /// Sets the expected attendance.
    pub fn with_attendance(mut self, expected_attendance: u32) -> Self {
        self.expected_attendance = expected_attendance;
        self
    }

    /// Pins the session to a room.
    pub fn pinned_to_room(mut self, room_id: impl Into<String>) -> Self {
        self.pinned_room = Some(room_id.into());
        self
    }

    /// Pins the session to a start slot.
    pub fn pinned_to_slot(mut self, slot_id: impl Into<String>) -> Self {
        self.pinned_slot = Some(slot_id.into());
        self
    }

    /// Adds a domain-specific attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Whether the title marks this session as a keynote.
    pub fn looks_like_keynote(&self) -> bool {
        self.title.to_lowercase().contains("keynote")
    }

    /// Whether the session has any pin.
    pub fn is_pinned(&self) -> bool {
        self.pinned_room.is_some() || self.pinned_slot.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_builder() {
        let s = Session::new("S1")
            .with_title("Opening Keynote")
            .with_duration(2)
            .with_speaker("smith")
            .with_track("general")
            .with_attendance(200)
            .pinned_to_room("hall")
            .with_attribute("level", "intro");

        assert_eq!(s.id, "S1");
        assert_eq!(s.duration, 2);
        assert_eq!(s.speaker_id, "smith");
        assert_eq!(s.track_id, "general");
        assert_eq!(s.expected_attendance, 200);
        assert_eq!(s.pinned_room.as_deref(), Some("hall"));
        assert!(s.pinned_slot.is_none());
        assert!(s.is_pinned());
        assert_eq!(s.attributes.get("level"), Some(&"intro".to_string()));
    }

    #[test]
    fn test_keynote_detection() {
        assert!(Session::new("a").with_title("Opening KEYNOTE").looks_like_keynote());
        assert!(!Session::new("b").with_title("AI Workshop").looks_like_keynote());
    }

    #[test]
    fn test_session_defaults() {
        let s = Session::new("S");
        assert_eq!(s.duration, 1);
        assert_eq!(s.expected_attendance, 0);
        assert!(!s.is_pinned());
    }
}
