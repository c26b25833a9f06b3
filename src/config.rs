//! Solver configuration.
//!
//! Every field has a default, so a partial JSON/TOML document deserializes
//! into a complete configuration:
//!
//! ```
//! use u_timetable::config::SolverConfig;
//!
//! let config = SolverConfig::default()
//!     .with_max_nodes(200_000)
//!     .with_max_wall_ms(5_000);
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use crate::models::HardConstraint;
use crate::validation::{ValidationError, ValidationErrorKind, ValidationResult};

/// Weights of the soft-preference terms.
///
/// Each term is normalized to `[0, 1]` before weighting, so the same
/// weights carry over between small and large events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftWeights {
    /// Same-track sessions close together in time.
    pub track_clustering: f64,
    /// Keynotes in preferred (or earliest) slots.
    pub keynote_positioning: f64,
    /// Few idle slots between sessions sharing a room or speaker.
    pub gap_minimization: f64,
    /// Rooms not grossly oversized for their audience.
    pub room_fit: f64,
    /// Sessions kept out of the second half of the slot sequence.
    pub late_slots: f64,
}

impl Default for SoftWeights {
    fn default() -> Self {
        Self {
            track_clustering: 1.0,
            keynote_positioning: 2.0,
            gap_minimization: 1.0,
            room_fit: 0.0,
            late_slots: 0.0,
        }
    }
}

impl SoftWeights {
    /// All weights zero: any feasible schedule is optimal.
    pub fn feasibility_only() -> Self {
        Self {
            track_clustering: 0.0,
            keynote_positioning: 0.0,
            gap_minimization: 0.0,
            room_fit: 0.0,
            late_slots: 0.0,
        }
    }

    /// Sum of all weights (upper bound of the weighted score).
    pub fn total(&self) -> f64 {
        self.track_clustering
            + self.keynote_positioning
            + self.gap_minimization
            + self.room_fit
            + self.late_slots
    }

    /// Whether every weight is zero.
    pub fn is_zero(&self) -> bool {
        self.total() == 0.0
    }

    fn named(&self) -> [(&'static str, f64); 5] {
        [
            ("track_clustering", self.track_clustering),
            ("keynote_positioning", self.keynote_positioning),
            ("gap_minimization", self.gap_minimization),
            ("room_fit", self.room_fit),
            ("late_slots", self.late_slots),
        ]
    }
}

/// Which sessions count as keynotes and where they belong.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeynoteConfig {
    /// Explicitly designated keynote session ids.
    pub sessions: Vec<String>,
    /// Preferred start slots. Empty = earlier is better.
    pub preferred_slots: Vec<String>,
    /// Also treat sessions whose title contains "keynote" as keynotes.
    pub detect_by_title: bool,
}

impl Default for KeynoteConfig {
    fn default() -> Self {
        Self {
            sessions: Vec::new(),
            preferred_slots: Vec::new(),
            detect_by_title: true,
        }
    }
}

/// Search budget. `None` = no limit on that axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Budget {
    /// Maximum search nodes (candidate trials).
    pub max_nodes: Option<u64>,
    /// Maximum wall-clock time (ms).
    pub max_wall_ms: Option<u64>,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            max_nodes: Some(1_000_000),
            max_wall_ms: Some(30_000),
        }
    }
}

impl Budget {
    /// No limits. Only use for instances known to be small.
    pub fn unbounded() -> Self {
        Self {
            max_nodes: None,
            max_wall_ms: None,
        }
    }

    /// Node limit only (fully deterministic).
    pub fn nodes(max_nodes: u64) -> Self {
        Self {
            max_nodes: Some(max_nodes),
            max_wall_ms: None,
        }
    }

    /// The instant the wall-clock limit runs out for a run started at
    /// `started`.
    pub fn deadline(&self, started: Instant) -> Option<Instant> {
        self.max_wall_ms.map(|ms| started + Duration::from_millis(ms))
    }
}

/// Infeasibility explanation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Compute a conflict core when the search proves infeasibility.
    pub explain_infeasibility: bool,
    /// Node budget of each feasibility probe used while shrinking the core.
    pub max_nodes_per_probe: u64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            explain_infeasibility: true,
            max_nodes_per_probe: 20_000,
        }
    }
}

/// Incremental re-optimization settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReoptimizationConfig {
    /// Node budget of the warm-started repair before falling back to a
    /// cold re-solve.
    pub warm_start_max_nodes: u64,
}

impl Default for ReoptimizationConfig {
    fn default() -> Self {
        Self {
            warm_start_max_nodes: 50_000,
        }
    }
}

/// Complete configuration of a timetabling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Active hard constraints.
    pub hard_constraints: BTreeSet<HardConstraint>,
    /// Soft-preference weights.
    pub soft_weights: SoftWeights,
    /// Keynote designation.
    pub keynotes: KeynoteConfig,
    /// Search budget.
    pub budget: Budget,
    /// Infeasibility diagnostics.
    pub diagnostics: DiagnosticsConfig,
    /// Incremental re-optimization.
    pub reoptimization: ReoptimizationConfig,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            hard_constraints: HardConstraint::ALL.into_iter().collect(),
            soft_weights: SoftWeights::default(),
            keynotes: KeynoteConfig::default(),
            budget: Budget::default(),
            diagnostics: DiagnosticsConfig::default(),
            reoptimization: ReoptimizationConfig::default(),
        }
    }
}

impl SolverConfig {
    /// Whether a hard constraint is active.
    #[inline]
    pub fn enforces(&self, constraint: HardConstraint) -> bool {
        self.hard_constraints.contains(&constraint)
    }

    /// Replaces the active hard constraint set.
    pub fn with_hard_constraints(mut self, constraints: impl IntoIterator<Item = HardConstraint>) -> Self {
        self.hard_constraints = constraints.into_iter().collect();
        self
    }

    /// Deactivates one hard constraint.
    pub fn without_hard_constraint(mut self, constraint: HardConstraint) -> Self {
        self.hard_constraints.remove(&constraint);
        self
    }

    /// Sets the soft weights.
    pub fn with_weights(mut self, weights: SoftWeights) -> Self {
        self.soft_weights = weights;
        self
    }

    /// Sets the keynote designation.
    pub fn with_keynotes(mut self, keynotes: KeynoteConfig) -> Self {
        self.keynotes = keynotes;
        self
    }

    /// Sets the whole budget.
    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    /// Sets the node limit.
    pub fn with_max_nodes(mut self, max_nodes: u64) -> Self {
        self.budget.max_nodes = Some(max_nodes);
        self
    }

    /// Sets the wall-clock limit.
    pub fn with_max_wall_ms(mut self, max_wall_ms: u64) -> Self {
        self.budget.max_wall_ms = Some(max_wall_ms);
        self
    }

    /// Enables or disables conflict explanations.
    pub fn with_explanations(mut self, enabled: bool) -> Self {
        self.diagnostics.explain_infeasibility = enabled;
        self
    }

    /// Sets the warm-start node budget of re-optimization.
    pub fn with_warm_start_max_nodes(mut self, nodes: u64) -> Self {
        self.reoptimization.warm_start_max_nodes = nodes;
        self
    }

    /// Checks weights and budgets. Model references are checked at compile
    /// time, where the model is known.
    pub fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        for (name, value) in self.soft_weights.named() {
            if !value.is_finite() || value < 0.0 {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidWeight,
                    format!("Soft weight '{name}' must be a finite value >= 0, got {value}"),
                ));
            }
        }

        if self.budget.max_nodes == Some(0) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidBudget,
                "Budget max_nodes must be positive",
            ));
        }
        if self.budget.max_wall_ms == Some(0) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidBudget,
                "Budget max_wall_ms must be positive",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
