//! Conflict cores for infeasible models.
//!
//! A deletion filter over sessions: drop each session in turn and keep the
//! drop when the remainder is still infeasible. What survives is a subset
//! in which every session is needed for the conflict. Each hard constraint
//! is then relaxed on that subset to see which ones the conflict rests on.
//! Past the run's deadline the filter stops and the core it has so far is
//! returned as non-minimal.

use std::collections::BTreeSet;
use std::time::Instant;

use tracing::debug;

use super::cancel::CancellationToken;
use super::engine::{SearchEngine, Termination};
use super::result::ConflictCore;
use crate::compile::{compile, CompiledModel};
use crate::config::Budget;
use crate::models::{ConstraintKind, HardConstraint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    Feasible,
    Infeasible,
    Unknown,
}

fn probe(
    compiled: &CompiledModel<'_>,
    active: &[bool],
    max_nodes: u64,
    deadline: Option<Instant>,
    cancel: &CancellationToken,
) -> Probe {
    let run = SearchEngine::new(compiled, Budget::nodes(max_nodes.max(1)), cancel.clone())
        .with_active(active)
        .with_deadline(deadline)
        .first_solution_only()
        .run();
    match (run.termination, run.incumbent.is_some()) {
        (_, true) => Probe::Feasible,
        (Termination::Exhausted, false) => Probe::Infeasible,
        _ => Probe::Unknown,
    }
}

/// Core built from sessions whose domains were emptied at compile time.
pub(crate) fn core_from_empty_domains(compiled: &CompiledModel<'_>) -> ConflictCore {
    let empties = compiled.empty_domains();
    let mut constraints = BTreeSet::new();
    let mut sessions = Vec::with_capacity(empties.len());
    for empty in empties {
        sessions.push(compiled.session(empty.session).id.clone());
        constraints.extend(empty.causes.iter().copied());
    }
    ConflictCore {
        sessions,
        constraints: constraints.into_iter().collect(),
        minimal: empties.len() == 1,
    }
}

/// Shrinks the full session set of an infeasible model to a conflict core.
///
/// Returns `None` when cancelled.
pub(crate) fn explain(
    compiled: &CompiledModel<'_>,
    deadline: Option<Instant>,
    cancel: &CancellationToken,
) -> Option<ConflictCore> {
    if !compiled.empty_domains().is_empty() {
        return Some(core_from_empty_domains(compiled));
    }

    let max_nodes = compiled.config().diagnostics.max_nodes_per_probe;
    let n = compiled.session_count();
    let mut active = vec![true; n];
    let mut minimal = true;
    let expired = || deadline.is_some_and(|at| Instant::now() >= at);

    for s in 0..n {
        if cancel.is_cancelled() {
            return None;
        }
        if expired() {
            debug!(remaining = n - s, "deadline reached while shrinking the core");
            minimal = false;
            break;
        }
        active[s] = false;
        match probe(compiled, &active, max_nodes, deadline, cancel) {
            Probe::Infeasible => {}
            Probe::Feasible => active[s] = true,
            Probe::Unknown => {
                active[s] = true;
                minimal = false;
            }
        }
    }

    let config = compiled.config();
    let mut constraints: Vec<ConstraintKind> = Vec::new();
    for hard in HardConstraint::ALL {
        if !config.enforces(hard) || expired() {
            continue;
        }
        let relaxed_config = config.clone().without_hard_constraint(hard);
        let Ok(relaxed) = compile(compiled.model(), &relaxed_config) else {
            continue;
        };
        if relaxed.empty_domains().iter().any(|e| active[e.session]) {
            continue;
        }
        if probe(&relaxed, &active, max_nodes, deadline, cancel) == Probe::Feasible {
            constraints.push(hard.into());
        }
    }

    let sessions: Vec<String> = (0..n)
        .filter(|&s| active[s])
        .map(|s| compiled.session(s).id.clone())
        .collect();

    if constraints.is_empty() {
        constraints.extend(
            HardConstraint::ALL
                .into_iter()
                .filter(|&h| config.enforces(h))
                .map(ConstraintKind::from),
        );
        let model = compiled.model();
        let core_sessions = (0..n).filter(|&s| active[s]).map(|s| compiled.session(s));
        let mut pinned = false;
        let mut restricted = false;
        for session in core_sessions {
            pinned |= session.is_pinned();
            restricted |= model
                .speaker(&session.speaker_id)
                .is_some_and(|sp| !sp.unavailable_slots.is_empty());
        }
        if pinned {
            constraints.push(ConstraintKind::FixedPin);
        }
        if restricted {
            constraints.push(ConstraintKind::SpeakerAvailability);
        }
    }

    debug!(
        sessions = sessions.len(),
        ?constraints,
        minimal,
        "conflict core"
    );
    Some(ConflictCore {
        sessions,
        constraints,
        minimal,
    })
}
