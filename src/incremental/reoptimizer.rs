//! Warm-started repair of a published schedule.
//!
//! # Algorithm
//!
//! 1. Apply the change-set to get the new model snapshot, and compile it.
//! 2. Map each prior assignment onto the new candidate domains. Sessions
//!    that were added or modified, whose prior placement no longer exists,
//!    or whose placement clashes with an earlier kept session (in id
//!    order) are *touched*.
//! 3. Warm phase: pin every untouched session to its prior placement and
//!    search only the touched ones, within `warm_start_max_nodes`.
//! 4. Global phase: search every session, trying prior placements first,
//!    with the warm schedule as the incumbent to beat. A schedule replaces
//!    it only with a higher score, or an equal score and fewer changed
//!    sessions, so the status reflects the whole search and not just the
//!    pinned neighbourhood.
//!
//! One deadline, taken from `max_wall_ms` when the run starts, bounds both
//! phases and any infeasibility explanation.

use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::time::Instant;

use tracing::{info, trace};

use crate::compile::{compile, CompiledModel};
use crate::config::{Budget, SolverConfig};
use crate::error::ConfigurationError;
use crate::models::{DomainModel, HardConstraint, Schedule};
use crate::search::engine::{SearchEngine, Termination};
use crate::search::{conclude, solve_until, CancellationToken, SolveOutcome};

use super::change::ChangeSet;

/// How a re-optimization produced its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Strategy {
    /// The warm repair around the kept assignments was not beaten.
    Warm,
    /// The search over all sessions found the returned schedule.
    Cold,
}

/// Result of a re-optimization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReoptimizeOutcome {
    /// Status, schedule, score and statistics (both phases combined).
    pub outcome: SolveOutcome,
    /// Which phase found the returned schedule.
    pub strategy: Strategy,
    /// Sessions present in both schedules whose placement changed.
    pub changed_sessions: Vec<String>,
    /// Sessions the warm phase had to re-place.
    pub touched_sessions: Vec<String>,
    /// The model snapshot after the change-set.
    #[serde(skip)]
    pub model: DomainModel,
    /// The configuration after the change-set.
    #[serde(skip)]
    pub config: SolverConfig,
}

/// Incremental re-optimizer.
#[derive(Debug, Clone)]
pub struct Reoptimizer {
    config: SolverConfig,
}

struct Seed {
    preferred: Vec<(usize, usize)>,
    kept: Vec<(usize, usize)>,
    touched: Vec<usize>,
}

impl Reoptimizer {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Applies `changes` to `model` and repairs `prior` for the result.
    pub fn reoptimize(
        &self,
        prior: &Schedule,
        model: &DomainModel,
        changes: &ChangeSet,
        cancel: &CancellationToken,
    ) -> Result<ReoptimizeOutcome, ConfigurationError> {
        let next = changes.apply(model)?;
        let config = changes.apply_config(&self.config);
        self.repair(prior, next, config, &changes.touched_session_ids(), cancel)
    }

    /// Repairs `prior` for a model snapshot, re-placing at least the
    /// sessions in `forced`.
    pub fn repair(
        &self,
        prior: &Schedule,
        model: DomainModel,
        config: SolverConfig,
        forced: &BTreeSet<String>,
        cancel: &CancellationToken,
    ) -> Result<ReoptimizeOutcome, ConfigurationError> {
        let compiled = compile(&model, &config)?;
        let seed = seed_from_prior(&compiled, prior, forced);
        let touched_sessions: Vec<String> = seed
            .touched
            .iter()
            .map(|&s| compiled.session(s).id.clone())
            .collect();
        info!(
            sessions = compiled.session_count(),
            kept = seed.kept.len(),
            touched = seed.touched.len(),
            "re-optimization started"
        );

        let (outcome, strategy) = run_phases(&compiled, &seed, cancel);
        let changed_sessions = outcome
            .schedule
            .as_ref()
            .map(|schedule| changed_against(prior, schedule))
            .unwrap_or_default();
        info!(
            status = %outcome.status,
            ?strategy,
            changed = changed_sessions.len(),
            "re-optimization finished"
        );

        Ok(ReoptimizeOutcome {
            outcome,
            strategy,
            changed_sessions,
            touched_sessions,
            model,
            config,
        })
    }
}

fn run_phases(
    compiled: &CompiledModel<'_>,
    seed: &Seed,
    cancel: &CancellationToken,
) -> (SolveOutcome, Strategy) {
    let config = compiled.config();
    let deadline = config.budget.deadline(Instant::now());
    if !compiled.empty_domains().is_empty() {
        trace!("empty domains after change-set; skipping warm phase");
        return (solve_until(compiled, deadline, cancel), Strategy::Cold);
    }

    let warm = SearchEngine::new(
        compiled,
        Budget::nodes(config.reoptimization.warm_start_max_nodes.max(1)),
        cancel.clone(),
    )
    .with_preferred(&seed.preferred)
    .with_fixed(&seed.kept)
    .with_deadline(deadline)
    .run();
    if warm.termination == Termination::Cancelled {
        return (conclude(compiled, warm, deadline, cancel), Strategy::Warm);
    }
    let seeded = warm.incumbent.is_some();
    trace!(
        nodes = warm.stats.nodes,
        seeded,
        termination = ?warm.termination,
        "warm phase finished; searching all sessions"
    );

    let global = SearchEngine::new(
        compiled,
        Budget {
            max_nodes: config.budget.max_nodes,
            max_wall_ms: None,
        },
        cancel.clone(),
    )
    .with_preferred(&seed.preferred)
    .with_incumbent(warm.incumbent)
    .with_deadline(deadline)
    .run();
    let strategy = if seeded && global.stats.solutions_found == 0 {
        Strategy::Warm
    } else {
        Strategy::Cold
    };
    let mut outcome = conclude(compiled, global, deadline, cancel);
    outcome.stats.absorb(&warm.stats);
    (outcome, strategy)
}

/// Maps prior assignments to candidates and decides what to keep.
fn seed_from_prior(compiled: &CompiledModel<'_>, prior: &Schedule, forced: &BTreeSet<String>) -> Seed {
    let config = compiled.config();
    let room_exclusive = config.enforces(HardConstraint::RoomExclusivity);
    let speaker_exclusive = config.enforces(HardConstraint::SpeakerExclusivity);

    let mut preferred = Vec::new();
    let mut kept = Vec::new();
    let mut touched = Vec::new();
    let mut rooms_busy: HashSet<(usize, usize)> = HashSet::new();
    let mut speakers_busy: HashSet<(usize, usize)> = HashSet::new();

    for s in 0..compiled.session_count() {
        let session = compiled.session(s);
        let candidate = prior.get(&session.id).and_then(|a| {
            let room = compiled.room_index(&a.room_id)?;
            let start = compiled.slot_position(&a.start_slot_id)?;
            compiled.find_candidate(s, room, start)
        });
        let Some(candidate) = candidate else {
            touched.push(s);
            continue;
        };
        preferred.push((s, candidate));
        if forced.contains(&session.id) {
            touched.push(s);
            continue;
        }

        let p = compiled.candidate(candidate);
        let speaker = compiled.speaker_of(s);
        let clashes = (p.start..p.end).any(|pos| {
            (room_exclusive && rooms_busy.contains(&(p.room, pos)))
                || (speaker_exclusive && speaker.is_some_and(|spk| speakers_busy.contains(&(spk, pos))))
        });
        if clashes {
            touched.push(s);
            continue;
        }
        for pos in p.start..p.end {
            rooms_busy.insert((p.room, pos));
            if let Some(spk) = speaker {
                speakers_busy.insert((spk, pos));
            }
        }
        kept.push((s, candidate));
    }

    Seed {
        preferred,
        kept,
        touched,
    }
}

/// Sessions scheduled in both `prior` and `next` at different placements.
fn changed_against(prior: &Schedule, next: &Schedule) -> Vec<String> {
    next.iter()
        .filter(|a| prior.get(&a.session_id).is_some_and(|p| !p.same_placement(a)))
        .map(|a| a.session_id.clone())
        .collect()
}
