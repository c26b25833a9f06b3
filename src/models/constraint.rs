//! Hard constraint kinds.
//!
//! Three hard constraints can be toggled per run (capacity, room
//! exclusivity, speaker exclusivity). The remaining kinds are structural:
//! they are always enforced while building candidate domains and only
//! surface as causes in an infeasibility explanation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A configurable hard constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardConstraint {
    /// Room capacity must cover expected attendance.
    Capacity,
    /// A room hosts at most one session at a time.
    RoomExclusivity,
    /// A speaker presents at most one session at a time.
    SpeakerExclusivity,
}

impl HardConstraint {
    /// All configurable hard constraints.
    pub const ALL: [HardConstraint; 3] = [
        HardConstraint::Capacity,
        HardConstraint::RoomExclusivity,
        HardConstraint::SpeakerExclusivity,
    ];
}

/// Any rule that can take part in an infeasibility explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// See [`HardConstraint::Capacity`].
    Capacity,
    /// See [`HardConstraint::RoomExclusivity`].
    RoomExclusivity,
    /// See [`HardConstraint::SpeakerExclusivity`].
    SpeakerExclusivity,
    /// A fixed room or start slot pin.
    FixedPin,
    /// A speaker's declared unavailability.
    SpeakerAvailability,
    /// A multi-slot session needs back-to-back slots.
    SlotContiguity,
}

impl From<HardConstraint> for ConstraintKind {
    fn from(c: HardConstraint) -> Self {
        match c {
            HardConstraint::Capacity => ConstraintKind::Capacity,
            HardConstraint::RoomExclusivity => ConstraintKind::RoomExclusivity,
            HardConstraint::SpeakerExclusivity => ConstraintKind::SpeakerExclusivity,
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstraintKind::Capacity => "capacity",
            ConstraintKind::RoomExclusivity => "room exclusivity",
            ConstraintKind::SpeakerExclusivity => "speaker exclusivity",
            ConstraintKind::FixedPin => "fixed pin",
            ConstraintKind::SpeakerAvailability => "speaker availability",
            ConstraintKind::SlotContiguity => "slot contiguity",
        };
        f.write_str(name)
    }
}
