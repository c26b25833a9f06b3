//! Random instance generator.
//!
//! Builds random but solvable conference instances: every session is
//! first placed on a hidden timetable that respects capacity, room and
//! speaker exclusivity, and the day breaks, and only then given an
//! attendance that fits its room. The hidden timetable is returned with
//! the model, so callers know a feasible schedule exists.

use rand::prelude::*;
use rand::rngs::StdRng;

use crate::models::{Assignment, DomainModel, Room, Schedule, Session, Slot};

const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Shape of generated instances.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Number of rooms.
    pub num_rooms: usize,
    /// Number of conference days.
    pub num_days: u32,
    /// One-hour slots per day (back-to-back within a day).
    pub slots_per_day: u32,
    /// Sessions to attempt to place.
    pub num_sessions: usize,
    /// Distinct speakers.
    pub num_speakers: usize,
    /// Distinct tracks.
    pub num_tracks: usize,
    /// Room capacity range (min, max).
    pub room_capacity_range: (u32, u32),
    /// Session duration range in slots (min, max).
    pub duration_range: (u32, u32),
    /// Chance that a session is titled as a keynote.
    pub keynote_probability: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            num_rooms: 3,
            num_days: 2,
            slots_per_day: 6,
            num_sessions: 20,
            num_speakers: 12,
            num_tracks: 4,
            room_capacity_range: (40, 400),
            duration_range: (1, 2),
            keynote_probability: 0.05,
        }
    }
}

impl GeneratorConfig {
    /// Small instances that an exhaustive search finishes quickly.
    pub fn tiny() -> Self {
        Self {
            num_rooms: 2,
            num_days: 1,
            slots_per_day: 4,
            num_sessions: 5,
            num_speakers: 3,
            num_tracks: 2,
            room_capacity_range: (20, 120),
            duration_range: (1, 2),
            keynote_probability: 0.1,
        }
    }

    /// Tightly packed: most room-slot cells end up occupied.
    pub fn dense() -> Self {
        Self {
            num_rooms: 4,
            num_days: 1,
            slots_per_day: 8,
            num_sessions: 28,
            num_speakers: 14,
            num_tracks: 4,
            room_capacity_range: (30, 300),
            duration_range: (1, 2),
            keynote_probability: 0.05,
        }
    }
}

/// A generated model plus the hidden feasible timetable it was built on.
#[derive(Debug, Clone)]
pub struct GeneratedInstance {
    pub model: DomainModel,
    pub planted: Schedule,
}

/// Seeded generator. The same seed and config always give the same
/// instance.
pub struct InstanceGenerator {
    config: GeneratorConfig,
    rng: StdRng,
}

impl InstanceGenerator {
    pub fn new(config: GeneratorConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generates an instance. Sessions that could not be placed on the
    /// hidden timetable are left out, so the result may hold fewer than
    /// `num_sessions`.
    pub fn generate(&mut self) -> GeneratedInstance {
        let rooms = self.generate_rooms();
        let slots = self.generate_slots();
        let per_day = self.config.slots_per_day.max(1) as usize;
        let slot_count = slots.len();

        let mut room_busy = vec![vec![false; slot_count]; rooms.len()];
        let mut speaker_busy = vec![vec![false; slot_count]; self.config.num_speakers.max(1)];
        let mut model = DomainModel::new().with_rooms(rooms.clone()).with_slots(slots.clone());
        let mut planted = Schedule::new();

        for i in 0..self.config.num_sessions {
            let speaker = self.rng.random_range(0..speaker_busy.len());
            let (min_d, max_d) = self.config.duration_range;
            let wanted = self.rng.random_range(min_d.max(1)..=max_d.max(min_d).max(1)) as usize;

            let Some((room, start, duration)) = self
                .place(wanted, per_day, &room_busy, &speaker_busy[speaker])
                .or_else(|| self.place(1, per_day, &room_busy, &speaker_busy[speaker]))
            else {
                continue;
            };

            for pos in start..start + duration {
                room_busy[room][pos] = true;
                speaker_busy[speaker][pos] = true;
            }

            let id = format!("S{i:03}");
            let capacity = rooms[room].capacity.max(1);
            let attendance = self.rng.random_range(1..=capacity);
            let title = if self.rng.random_bool(self.config.keynote_probability.clamp(0.0, 1.0)) {
                format!("Keynote {i}")
            } else {
                format!("Talk {i}")
            };
            let mut session = Session::new(&id)
                .with_title(title)
                .with_duration(duration as u32)
                .with_speaker(format!("SP{speaker:02}"))
                .with_attendance(attendance);
            if self.config.num_tracks > 0 {
                let track = self.rng.random_range(0..self.config.num_tracks);
                session = session.with_track(format!("TR{track}"));
            }
            model = model.with_session(session);

            let first = &slots[start];
            let last = &slots[start + duration - 1];
            planted.insert(
                Assignment::new(&id, &rooms[room].id, &first.id)
                    .with_span(&last.id, duration as u32)
                    .with_times(first.start_ms, last.end_ms),
            );
        }

        GeneratedInstance { model, planted }
    }

    fn generate_rooms(&mut self) -> Vec<Room> {
        let (min_cap, max_cap) = self.config.room_capacity_range;
        (0..self.config.num_rooms)
            .map(|r| {
                let capacity = self.rng.random_range(min_cap..=max_cap.max(min_cap));
                Room::new(format!("R{r}"), capacity).with_name(format!("Room {r}"))
            })
            .collect()
    }

    fn generate_slots(&self) -> Vec<Slot> {
        let per_day = self.config.slots_per_day;
        let mut slots = Vec::new();
        for day in 0..self.config.num_days {
            // 09:00 each day, so days are separated by an overnight break
            let day_start = i64::from(day) * DAY_MS + 9 * HOUR_MS;
            for k in 0..per_day {
                let start = day_start + i64::from(k) * HOUR_MS;
                let ordinal = day * per_day + k;
                slots.push(Slot::new(format!("D{day}T{k:02}"), ordinal, start, start + HOUR_MS));
            }
        }
        slots
    }

    /// Random free (room, start) for a run of `duration` slots inside one
    /// day, or `None` after a bounded number of attempts.
    fn place(
        &mut self,
        duration: usize,
        per_day: usize,
        room_busy: &[Vec<bool>],
        speaker_busy: &[bool],
    ) -> Option<(usize, usize, usize)> {
        if room_busy.is_empty() || duration > per_day || speaker_busy.is_empty() {
            return None;
        }
        let days = speaker_busy.len() / per_day;
        if days == 0 {
            return None;
        }
        for _ in 0..64 {
            let room = self.rng.random_range(0..room_busy.len());
            let day = self.rng.random_range(0..days);
            let offset = self.rng.random_range(0..=per_day - duration);
            let start = day * per_day + offset;
            let free = (start..start + duration).all(|p| !room_busy[room][p] && !speaker_busy[p]);
            if free {
                return Some((room, start, duration));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolverConfig;
    use crate::validation::{check_schedule, validate_model};

    #[test]
    fn test_planted_schedule_is_feasible() {
        for seed in 0..5 {
            let instance = InstanceGenerator::new(GeneratorConfig::default(), seed).generate();
            assert!(validate_model(&instance.model).is_ok());
            assert_eq!(instance.planted.len(), instance.model.sessions.len());
            let violations = check_schedule(
                &instance.planted,
                &instance.model,
                &SolverConfig::default().hard_constraints,
            );
            assert!(violations.is_empty(), "seed {seed}: {violations:?}");
        }
    }

    #[test]
    fn test_same_seed_same_instance() {
        let a = InstanceGenerator::new(GeneratorConfig::tiny(), 42).generate();
        let b = InstanceGenerator::new(GeneratorConfig::tiny(), 42).generate();
        assert_eq!(a.model, b.model);
        assert_eq!(a.planted, b.planted);
    }

    #[test]
    fn test_days_are_separated_by_breaks() {
        let instance = InstanceGenerator::new(GeneratorConfig::default(), 7).generate();
        let slots = instance.model.ordered_slots();
        assert_eq!(slots.len(), 12);
        assert!(slots[0].is_followed_by(slots[1]));
        assert!(!slots[5].is_followed_by(slots[6]));
    }
}
