//! Change-sets against a domain model snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::config::{SoftWeights, SolverConfig};
use crate::error::ConfigurationError;
use crate::models::{DomainModel, Room, Session, Slot};
use crate::validation::{ValidationError, ValidationErrorKind};

/// Edits to apply to a domain model (and optionally its weights).
///
/// Removals run first, then modifications, then additions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeSet {
    /// Sessions to add.
    pub added_sessions: Vec<Session>,
    /// Session ids to remove.
    pub removed_sessions: Vec<String>,
    /// Replacement sessions, matched by id.
    pub modified_sessions: Vec<Session>,
    /// Rooms to add.
    pub added_rooms: Vec<Room>,
    /// Room ids to remove.
    pub removed_rooms: Vec<String>,
    /// Replacement rooms, matched by id.
    pub modified_rooms: Vec<Room>,
    /// Slots to add.
    pub added_slots: Vec<Slot>,
    /// Slot ids to remove.
    pub removed_slots: Vec<String>,
    /// Replacement slots, matched by id.
    pub modified_slots: Vec<Slot>,
    /// New soft weights.
    pub weights: Option<SoftWeights>,
}

impl ChangeSet {
    /// An empty change-set.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_session(mut self, session: Session) -> Self {
        self.added_sessions.push(session);
        self
    }

    pub fn remove_session(mut self, id: impl Into<String>) -> Self {
        self.removed_sessions.push(id.into());
        self
    }

    pub fn modify_session(mut self, session: Session) -> Self {
        self.modified_sessions.push(session);
        self
    }

    pub fn add_room(mut self, room: Room) -> Self {
        self.added_rooms.push(room);
        self
    }

    pub fn remove_room(mut self, id: impl Into<String>) -> Self {
        self.removed_rooms.push(id.into());
        self
    }

    pub fn modify_room(mut self, room: Room) -> Self {
        self.modified_rooms.push(room);
        self
    }

    pub fn add_slot(mut self, slot: Slot) -> Self {
        self.added_slots.push(slot);
        self
    }

    pub fn remove_slot(mut self, id: impl Into<String>) -> Self {
        self.removed_slots.push(id.into());
        self
    }

    pub fn modify_slot(mut self, slot: Slot) -> Self {
        self.modified_slots.push(slot);
        self
    }

    /// Replaces the soft weights.
    pub fn with_weights(mut self, weights: SoftWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Whether the change-set edits nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Ids of sessions the change-set adds or modifies directly.
    pub fn touched_session_ids(&self) -> BTreeSet<String> {
        self.added_sessions
            .iter()
            .chain(&self.modified_sessions)
            .map(|s| s.id.clone())
            .collect()
    }

    /// The configuration after this change-set.
    pub fn apply_config(&self, config: &SolverConfig) -> SolverConfig {
        match &self.weights {
            Some(weights) => config.clone().with_weights(weights.clone()),
            None => config.clone(),
        }
    }

    /// Produces the new model snapshot. The input model is left untouched.
    ///
    /// Fails when removing or modifying an id the model lacks, or adding
    /// an id it already has. Everything else is checked when the new
    /// snapshot is compiled.
    pub fn apply(&self, model: &DomainModel) -> Result<DomainModel, ConfigurationError> {
        let mut next = model.clone();
        let mut issues = Vec::new();

        edit(
            &mut next.sessions,
            |s| &s.id,
            &self.removed_sessions,
            &self.modified_sessions,
            &self.added_sessions,
            "session",
            ValidationErrorKind::UnknownSession,
            &mut issues,
        );
        edit(
            &mut next.rooms,
            |r| &r.id,
            &self.removed_rooms,
            &self.modified_rooms,
            &self.added_rooms,
            "room",
            ValidationErrorKind::UnknownRoom,
            &mut issues,
        );
        edit(
            &mut next.slots,
            |s| &s.id,
            &self.removed_slots,
            &self.modified_slots,
            &self.added_slots,
            "slot",
            ValidationErrorKind::UnknownSlot,
            &mut issues,
        );

        if issues.is_empty() {
            Ok(next)
        } else {
            Err(ConfigurationError::new(issues))
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn edit<T: Clone>(
    items: &mut Vec<T>,
    id_of: impl Fn(&T) -> &String,
    removed: &[String],
    modified: &[T],
    added: &[T],
    label: &str,
    unknown: ValidationErrorKind,
    issues: &mut Vec<ValidationError>,
) {
    for id in removed {
        let before = items.len();
        items.retain(|item| id_of(item) != id);
        if items.len() == before {
            issues.push(ValidationError::new(
                unknown,
                format!("Cannot remove unknown {label} '{id}'"),
            ));
        }
    }
    for replacement in modified {
        let id = id_of(replacement);
        match items.iter_mut().find(|item| id_of(&**item) == id) {
            Some(current) => *current = replacement.clone(),
            None => issues.push(ValidationError::new(
                unknown,
                format!("Cannot modify unknown {label} '{id}'"),
            )),
        }
    }
    for item in added {
        let id = id_of(item);
        if items.iter().any(|existing| id_of(existing) == id) {
            issues.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Cannot add {label} '{id}': id already exists"),
            ));
        } else {
            items.push(item.clone());
        }
    }
}
