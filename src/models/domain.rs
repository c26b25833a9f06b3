//! Domain model: the caller-owned input snapshot of one timetabling run.
//!
//! The engine never mutates a `DomainModel`. Change-sets produce a new
//! snapshot (see [`crate::incremental::ChangeSet::apply`]).

use serde::{Deserialize, Serialize};

use super::{Room, Session, Slot, Speaker, Track};

/// Sessions, rooms and slots of an event, plus optional registries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainModel {
    /// Sessions to place.
    pub sessions: Vec<Session>,
    /// Available rooms.
    pub rooms: Vec<Room>,
    /// Slot universe (any input order; `ordinal` defines the order).
    pub slots: Vec<Slot>,
    /// Speaker registry. Empty = speakers are implicit.
    #[serde(default)]
    pub speakers: Vec<Speaker>,
    /// Track registry. Empty = tracks are implicit.
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl DomainModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session.
    pub fn with_session(mut self, session: Session) -> Self {
        self.sessions.push(session);
        self
    }

    /// Adds several sessions.
    pub fn with_sessions(mut self, sessions: impl IntoIterator<Item = Session>) -> Self {
        self.sessions.extend(sessions);
        self
    }

    /// Adds a room.
    pub fn with_room(mut self, room: Room) -> Self {
        self.rooms.push(room);
        self
    }

    /// Adds several rooms.
    pub fn with_rooms(mut self, rooms: impl IntoIterator<Item = Room>) -> Self {
        self.rooms.extend(rooms);
        self
    }

    /// Adds a slot.
    pub fn with_slot(mut self, slot: Slot) -> Self {
        self.slots.push(slot);
        self
    }

    /// Adds several slots.
    pub fn with_slots(mut self, slots: impl IntoIterator<Item = Slot>) -> Self {
        self.slots.extend(slots);
        self
    }

    /// Registers a speaker.
    pub fn with_speaker(mut self, speaker: Speaker) -> Self {
        self.speakers.push(speaker);
        self
    }

    /// Registers a track.
    pub fn with_track(mut self, track: Track) -> Self {
        self.tracks.push(track);
        self
    }

    /// Finds a session by id.
    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Finds a room by id.
    pub fn room(&self, id: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == id)
    }

    /// Finds a slot by id.
    pub fn slot(&self, id: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.id == id)
    }

    /// Finds a registered speaker by id.
    pub fn speaker(&self, id: &str) -> Option<&Speaker> {
        self.speakers.iter().find(|s| s.id == id)
    }

    /// Slots sorted by ordinal (ties by id, for a total order).
    pub fn ordered_slots(&self) -> Vec<&Slot> {
        let mut slots: Vec<&Slot> = self.slots.iter().collect();
        slots.sort_by(|a, b| a.ordinal.cmp(&b.ordinal).then_with(|| a.id.cmp(&b.id)));
        slots
    }

    /// Number of sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_model() -> DomainModel {
        DomainModel::new()
            .with_session(Session::new("A").with_speaker("x"))
            .with_session(Session::new("B").with_speaker("y"))
            .with_room(Room::new("R1", 100))
            .with_slot(Slot::new("late", 1, 100, 200))
            .with_slot(Slot::new("early", 0, 0, 100))
            .with_speaker(Speaker::new("x"))
    }

    #[test]
    fn test_lookups() {
        let m = sample_model();
        assert_eq!(m.session("B").map(|s| s.speaker_id.as_str()), Some("y"));
        assert!(m.session("Z").is_none());
        assert_eq!(m.room("R1").map(|r| r.capacity), Some(100));
        assert!(m.slot("early").is_some());
        assert!(m.speaker("x").is_some());
        assert!(m.speaker("y").is_none());
        assert_eq!(m.session_count(), 2);
    }

    #[test]
    fn test_ordered_slots() {
        let m = sample_model();
        let ids: Vec<&str> = m.ordered_slots().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
    }
}
