// ==========================================
// Property tests over generated instances
// ==========================================

mod common;

use common::assert_sound;
use proptest::prelude::*;
use u_timetable::generator::{GeneratorConfig, InstanceGenerator};
use u_timetable::prelude::*;

fn tiny_config(seed_rooms: usize) -> GeneratorConfig {
    GeneratorConfig {
        num_rooms: 1 + seed_rooms % 2,
        ..GeneratorConfig::tiny()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_planted_instances_are_solved_to_optimality(seed in 0u64..10_000, rooms in 0usize..4) {
        let instance = InstanceGenerator::new(tiny_config(rooms), seed).generate();
        let config = SolverConfig::default();
        let outcome = solve(&instance.model, &config, &CancellationToken::new()).unwrap();

        prop_assert_eq!(outcome.status, SolveStatus::FeasibleOptimal);
        let schedule = outcome.schedule.unwrap();
        assert_sound(&schedule, &instance.model, &config);

        // the optimum is never worse than the planted timetable
        let planted = evaluate_schedule(&instance.planted, &instance.model, &config).unwrap();
        prop_assert!(outcome.score.unwrap().total + 1e-9 >= planted.total);
    }

    #[test]
    fn prop_solving_is_deterministic(seed in 0u64..10_000, nodes in 1u64..200) {
        let instance = InstanceGenerator::new(GeneratorConfig::default(), seed).generate();
        let config = SolverConfig::default().with_budget(Budget::nodes(nodes));
        let a = solve(&instance.model, &config, &CancellationToken::new()).unwrap();
        let b = solve(&instance.model, &config, &CancellationToken::new()).unwrap();

        prop_assert_eq!(a.status, b.status);
        prop_assert_eq!(&a.schedule, &b.schedule);
        prop_assert!(a.stats.nodes <= nodes);
        if let Some(schedule) = &a.schedule {
            assert_sound(schedule, &instance.model, &config);
        }
    }

    #[test]
    fn prop_repair_of_planted_never_loses_score(seed in 0u64..10_000) {
        let instance = InstanceGenerator::new(GeneratorConfig::tiny(), seed).generate();
        let config = SolverConfig::default();
        let result = Reoptimizer::new(config.clone())
            .reoptimize(&instance.planted, &instance.model, &ChangeSet::new(), &CancellationToken::new())
            .unwrap();

        prop_assert_eq!(result.outcome.status, SolveStatus::FeasibleOptimal);
        let planted = evaluate_schedule(&instance.planted, &instance.model, &config).unwrap();
        prop_assert!(result.outcome.score.unwrap().total + 1e-9 >= planted.total);
        let schedule = result.outcome.schedule.unwrap();
        assert_sound(&schedule, &instance.model, &config);
        if result.strategy == u_timetable::prelude::Strategy::Warm {
            prop_assert!(result.changed_sessions.is_empty());
            prop_assert_eq!(schedule, instance.planted);
        }
    }

    #[test]
    fn prop_random_change_sets_repair_soundly(
        seed in 0u64..10_000,
        edits in prop::collection::vec(edit_strategy(), 1..4),
    ) {
        let instance = InstanceGenerator::new(GeneratorConfig::tiny(), seed).generate();
        let changes = change_set(&instance.model, &edits);
        let reoptimizer = Reoptimizer::new(SolverConfig::default().with_budget(Budget::nodes(20_000)));
        // edits that leave a session longer than the remaining slots are
        // rejected up front
        let Ok(result) = reoptimizer.reoptimize(&instance.planted, &instance.model, &changes, &CancellationToken::new())
        else {
            return Ok(());
        };

        if result.outcome.is_feasible() {
            let schedule = result.outcome.schedule.as_ref().unwrap();
            assert_sound(schedule, &result.model, &result.config);
            for id in &result.changed_sessions {
                prop_assert!(instance.planted.get(id).is_some());
            }
        } else {
            prop_assert!(result.outcome.schedule.is_none() || result.outcome.status == SolveStatus::Cancelled);
        }
    }
}

#[derive(Debug, Clone)]
enum Edit {
    AddSession(u32),
    RemoveSession(prop::sample::Index),
    AddSlot,
    RemoveSlot(prop::sample::Index),
    RemoveRoom(prop::sample::Index),
    Reweigh(f64),
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (1u32..150).prop_map(Edit::AddSession),
        any::<prop::sample::Index>().prop_map(Edit::RemoveSession),
        Just(Edit::AddSlot),
        any::<prop::sample::Index>().prop_map(Edit::RemoveSlot),
        any::<prop::sample::Index>().prop_map(Edit::RemoveRoom),
        (0.0f64..5.0).prop_map(Edit::Reweigh),
    ]
}

/// Turns random edits into a change-set that only names existing ids,
/// each at most once.
fn change_set(model: &DomainModel, edits: &[Edit]) -> ChangeSet {
    let mut changes = ChangeSet::new();
    for (i, edit) in edits.iter().enumerate() {
        changes = match edit {
            Edit::AddSession(attendance) => {
                changes.add_session(Session::new(format!("NEW{i}")).with_attendance(*attendance))
            }
            Edit::RemoveSession(pick) if !model.sessions.is_empty() => {
                let id = &model.sessions[pick.index(model.sessions.len())].id;
                if changes.removed_sessions.contains(id) {
                    changes
                } else {
                    changes.remove_session(id.clone())
                }
            }
            Edit::AddSlot => {
                let start = (100 + i as i64) * 3_600_000;
                changes.add_slot(Slot::new(format!("EXTRA{i}"), 1_000 + i as u32, start, start + 3_600_000))
            }
            Edit::RemoveSlot(pick) => {
                let id = &model.slots[pick.index(model.slots.len())].id;
                if changes.removed_slots.contains(id) {
                    changes
                } else {
                    changes.remove_slot(id.clone())
                }
            }
            Edit::RemoveRoom(pick) => {
                let id = &model.rooms[pick.index(model.rooms.len())].id;
                if changes.removed_rooms.contains(id) || changes.removed_rooms.len() + 1 >= model.rooms.len() {
                    changes
                } else {
                    changes.remove_room(id.clone())
                }
            }
            Edit::Reweigh(keynote) => changes.with_weights(SoftWeights {
                keynote_positioning: *keynote,
                late_slots: 1.0,
                ..SoftWeights::default()
            }),
            _ => changes,
        };
    }
    changes
}
