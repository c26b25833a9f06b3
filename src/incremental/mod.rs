//! Incremental re-optimization.
//!
//! - [`ChangeSet`]: edits against a model snapshot
//! - [`Reoptimizer`]: warm-started repair with cold fallback
//! - [`Planner`]: stateful wrapper enforcing the run state machine

mod change;
mod planner;
mod reoptimizer;

pub use change::ChangeSet;
pub use planner::{Planner, RunPhase};
pub use reoptimizer::{ReoptimizeOutcome, Reoptimizer, Strategy};
