//! Session timetabling engine for multi-track events.
//!
//! Assigns sessions to (room, start slot) pairs so that no room or speaker
//! is double-booked and every audience fits its room, while rewarding
//! clustered tracks, well-placed keynotes and compact days.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Session`, `Room`, `Slot`, `Speaker`,
//!   `Track`, `DomainModel`, `Schedule`, `Assignment`
//! - **`validation`**: Input integrity checks and exhaustive schedule
//!   verification
//! - **`config`**: `SolverConfig` (hard constraints, soft weights, budget)
//! - **`compile`**: Constraint compiler producing pruned candidate domains
//! - **`objective`**: Pure, normalized soft-preference terms
//! - **`search`**: Propagation + branch-and-bound search with budgets and
//!   cooperative cancellation
//! - **`incremental`**: Change-sets, warm-started re-optimization and the
//!   stateful `Planner`
//! - **`scheduler`**: KPIs, room × slot grid, batch what-if evaluation
//! - **`generator`**: Seeded random instances with a known feasible timetable
//!
//! # Example
//!
//! ```
//! use u_timetable::prelude::*;
//!
//! let model = DomainModel::new()
//!     .with_sessions([
//!         Session::new("A").with_attendance(200),
//!         Session::new("B").with_attendance(80),
//!         Session::new("C").with_attendance(500),
//!     ])
//!     .with_rooms([Room::new("R1", 600), Room::new("R2", 100)])
//!     .with_slots(contiguous_slots("t", 2, 0, 3_600_000));
//!
//! let outcome = solve(&model, &SolverConfig::default(), &CancellationToken::new()).unwrap();
//! assert!(outcome.is_feasible());
//! assert_eq!(outcome.schedule.unwrap().get("C").unwrap().room_id, "R1");
//! ```
//!
//! # References
//!
//! - Burke & Petrovic (2002), "Recent research directions in automated timetabling"
//! - Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming"

pub mod compile;
pub mod config;
pub mod error;
pub mod generator;
pub mod incremental;
pub mod models;
pub mod objective;
pub mod scheduler;
pub mod search;
pub mod validation;

/// Common imports.
pub mod prelude {
    pub use crate::compile::{compile, CompiledModel};
    pub use crate::config::{Budget, SoftWeights, SolverConfig};
    pub use crate::error::{ConfigurationError, Error};
    pub use crate::incremental::{ChangeSet, Planner, Reoptimizer, RunPhase, Strategy};
    pub use crate::models::{
        contiguous_slots, Assignment, DomainModel, HardConstraint, Room, Schedule, Session, Slot,
        Speaker, Track,
    };
    pub use crate::objective::{evaluate_schedule, ScoreBreakdown};
    pub use crate::search::{solve, CancellationToken, SolveOutcome, SolveStatus};
}
