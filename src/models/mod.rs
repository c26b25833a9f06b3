//! Timetabling domain models.
//!
//! Provides the core data types for representing event timetabling
//! problems and their solutions.
//!
//! # Domain Mappings
//!
//! | u-timetable | Conference | Campus | Festival |
//! |-------------|------------|--------|----------|
//! | Session | Talk/Workshop | Lecture | Performance |
//! | Room | Hall | Lecture Room | Stage |
//! | Slot | Time Block | Period | Set Time |
//! | Schedule | Program | Timetable | Line-up |

mod constraint;
mod domain;
mod registry;
mod room;
mod schedule;
mod session;
mod slot;

pub use constraint::{ConstraintKind, HardConstraint};
pub use domain::DomainModel;
pub use registry::{Speaker, Track};
pub use room::Room;
pub use schedule::{Assignment, Schedule, Violation, ViolationType};
pub use session::Session;
pub use slot::{contiguous_slots, Slot};
