//! Initial schedule generation.
//!
//! Builds one weekly pattern and repeats it across every week:
//!
//! 1. Each specialist receives `specialist_lessons_per_class` lessons in
//!    every class they may teach, at random free positions where they are
//!    not already busy.
//! 2. Remaining positions get a random homeroom subject.
//!
//! Randomness is injected so callers (and tests) control the seed.

use log::{debug, warn};
use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::EngineConfig;
use crate::models::{
    grid_positions, Cell, ClassGrid, ScheduleStore, Slot, TeacherRegistry, DAY_COUNT,
    PERIOD_COUNT,
};

type Pattern = [[Option<Cell>; DAY_COUNT]; PERIOD_COUNT];

/// Generates a total schedule for weeks `1..=config.week_count` and
/// classes `1..=class_count`.
///
/// Specialists never double-book and only teach classes they are allowed
/// in. A teacher whose lessons do not fit is logged and under-placed.
pub fn generate_schedule<R: Rng + ?Sized>(
    class_count: u32,
    subjects: &[String],
    registry: &TeacherRegistry,
    config: &EngineConfig,
    rng: &mut R,
) -> ScheduleStore {
    let mut patterns: BTreeMap<u32, Pattern> = (1..=class_count)
        .map(|class| (class, Default::default()))
        .collect();
    let mut busy: BTreeSet<(&str, usize, usize)> = BTreeSet::new();

    for teacher in registry.teachers() {
        let classes: Vec<u32> = (1..=class_count)
            .filter(|&c| teacher.allows_class(c))
            .collect();
        for class in classes {
            for _ in 0..config.specialist_lessons_per_class {
                let Some(pattern) = patterns.get_mut(&class) else {
                    continue;
                };
                let free: Vec<(usize, usize)> = grid_positions()
                    .filter(|&(p, d)| {
                        pattern[p][d].is_none() && !busy.contains(&(teacher.id.as_str(), p, d))
                    })
                    .collect();
                let Some(&(p, d)) = free.choose(rng) else {
                    warn!(
                        "generator: no free slot for {} in class {class}",
                        teacher.name
                    );
                    break;
                };
                let slot = Slot::new(1, class, p, d);
                pattern[p][d] = Some(Cell::special(&slot, teacher, None));
                busy.insert((teacher.id.as_str(), p, d));
            }
        }
    }

    let homeroom = homeroom_subjects(subjects, registry, config);
    let mut store = ScheduleStore::new();
    for (class, pattern) in &patterns {
        let grid = ClassGrid::from_fn(|p, d| {
            let slot = Slot::new(1, *class, p, d);
            match &pattern[p][d] {
                Some(cell) => cell.clone(),
                None => match homeroom.choose(rng) {
                    Some(subject) => Cell::homeroom(&slot, subject.as_str()),
                    None => Cell::empty(&slot),
                },
            }
        });
        for week in 1..=config.week_count {
            store.set_class_grid(week, *class, grid.clone());
        }
    }

    debug!(
        "generator: {} classes x {} weeks, {} specialist lessons per week",
        class_count,
        config.week_count,
        busy.len()
    );
    store
}

/// Subjects a homeroom teacher fills free positions with: everything not
/// owned by a specialist, plus flex subjects. Falls back to the full list.
fn homeroom_subjects<'s>(
    subjects: &'s [String],
    registry: &TeacherRegistry,
    config: &EngineConfig,
) -> Vec<&'s String> {
    let owned: BTreeSet<&str> = registry
        .teachers()
        .iter()
        .filter(|t| !t.is_locked_out())
        .map(|t| t.subject.as_str())
        .collect();
    let filtered: Vec<&String> = subjects
        .iter()
        .filter(|s| !owned.contains(s.as_str()) || config.is_flex_subject(s))
        .collect();
    if filtered.is_empty() {
        subjects.iter().collect()
    } else {
        filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Teacher;
    use crate::rules::find_double_bookings;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn subjects() -> Vec<String> {
        ["국어", "수학", "영어", "과학", "체육"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn registry() -> TeacherRegistry {
        TeacherRegistry::from_teachers([
            Teacher::new("T1", "Kim", "영어").with_classes([1, 2, 3]),
            Teacher::new("T2", "Lee", "과학").with_classes([2, 3, 4]),
        ])
    }

    fn small_config() -> EngineConfig {
        EngineConfig {
            week_count: 3,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_generate_total_and_repeated() {
        let mut rng = StdRng::seed_from_u64(7);
        let config = small_config();
        let store = generate_schedule(4, &subjects(), &registry(), &config, &mut rng);

        assert_eq!(store.week_count(), 3);
        assert_eq!(store.cell_count(), 3 * 4 * PERIOD_COUNT * DAY_COUNT);
        for (slot, cell) in store.iter_cells() {
            assert_eq!(cell.id, slot.cell_id());
            let first = store.cell(&slot.in_week(1)).unwrap();
            assert_eq!(first.subject, cell.subject);
        }
    }

    #[test]
    fn test_specialist_lessons_placed() {
        let mut rng = StdRng::seed_from_u64(1);
        let config = small_config();
        let store = generate_schedule(4, &subjects(), &registry(), &config, &mut rng);

        let count = |teacher: &str, class: u32| {
            store
                .week(1)
                .and_then(|w| w.class(class))
                .map(|g| g.iter().filter(|(_, _, c)| c.is_taught_by(teacher)).count())
                .unwrap_or(0)
        };
        assert_eq!(count("T1", 1), 2);
        assert_eq!(count("T1", 4), 0);
        assert_eq!(count("T2", 1), 0);
        assert_eq!(count("T2", 4), 2);
    }

    #[test]
    fn test_homeroom_excludes_specialist_subjects() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = small_config();
        let store = generate_schedule(4, &subjects(), &registry(), &config, &mut rng);
        for (_, cell) in store.iter_cells() {
            if !cell.is_special() {
                assert_ne!(cell.subject, "영어");
                assert_ne!(cell.subject, "과학");
            }
        }
    }

    #[test]
    fn test_no_subjects_yields_empty_cells() {
        let mut rng = StdRng::seed_from_u64(0);
        let config = small_config();
        let store = generate_schedule(2, &[], &TeacherRegistry::new(), &config, &mut rng);
        assert!(store.iter_cells().all(|(_, c)| c.is_empty()));
    }

    proptest! {
        #[test]
        fn prop_generated_schedule_is_consistent(seed in any::<u64>(), classes in 1u32..8) {
            let mut rng = StdRng::seed_from_u64(seed);
            let config = EngineConfig { week_count: 2, ..EngineConfig::default() };
            let registry = registry();
            let store = generate_schedule(classes, &subjects(), &registry, &config, &mut rng);

            prop_assert_eq!(store.cell_count(), 2 * classes as usize * PERIOD_COUNT * DAY_COUNT);
            prop_assert!(find_double_bookings(&store, 1).is_empty());
            for (slot, cell) in store.iter_cells() {
                if let Some(id) = cell.teacher_id.as_deref() {
                    let teacher = registry.get(id).unwrap();
                    prop_assert!(teacher.allows_class(slot.class));
                }
            }
        }
    }
}
