//! Swap/move legality evaluation.
//!
//! Decides whether exchanging a source cell with a target cell is legal
//! under teacher availability and class membership. Pure and
//! deterministic: used both for hover-candidate scans across the grid and
//! at commit time to decide whether a forced override prompt is needed.

use serde::{Deserialize, Serialize};

use super::overlap::find_overlaps_excluding;
use crate::models::{Cell, ScheduleStore, Slot, TeacherRegistry};

/// Why a swap was blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    /// Source or target is a holiday cell.
    Holiday,
    /// Source is a specialist cell without a teacher id, or with an id
    /// the registry does not know.
    MissingTeacher,
    /// Source teacher may not teach the target class.
    TeacherClassMismatch,
    /// Source teacher already teaches another class at the target time.
    SourceTeacherBusy,
    /// Target teacher may not teach the source class.
    TargetTeacherClassMismatch,
    /// Target teacher already teaches another class at the source time.
    TargetTeacherBusy,
}

impl BlockReason {
    /// Whether a user may confirm past this reason with a forced override.
    #[inline]
    pub fn is_overridable(&self) -> bool {
        !matches!(self, BlockReason::Holiday)
    }
}

/// Result of a legality evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapEvaluation {
    /// Whether the swap is legal.
    pub can_swap: bool,
    /// Block reason when not legal.
    pub block_reason: Option<BlockReason>,
    /// Human-readable explanation.
    pub details: String,
    /// Classes the moving teacher collides with (busy reasons only).
    pub conflicts: Vec<u32>,
}

impl SwapEvaluation {
    fn allowed() -> Self {
        Self {
            can_swap: true,
            block_reason: None,
            details: String::new(),
            conflicts: Vec::new(),
        }
    }

    fn blocked(reason: BlockReason, details: impl Into<String>) -> Self {
        Self {
            can_swap: false,
            block_reason: Some(reason),
            details: details.into(),
            conflicts: Vec::new(),
        }
    }

    fn with_conflicts(mut self, conflicts: Vec<u32>) -> Self {
        self.conflicts = conflicts;
        self
    }
}

/// Evaluates exchanging `source_cell` at `source` with `target_cell` at `target`.
///
/// # Decision sequence
/// 1. Holiday on either side → [`BlockReason::Holiday`].
/// 2. Non-specialist sources are always legal.
/// 3. Specialist source without a registered teacher → [`BlockReason::MissingTeacher`].
/// 4. Source teacher not allowed in target class → [`BlockReason::TeacherClassMismatch`].
/// 5. Source teacher busy elsewhere at the target time → [`BlockReason::SourceTeacherBusy`].
/// 6. Target taught by a different specialist: the symmetric checks
///    ([`BlockReason::TargetTeacherClassMismatch`], [`BlockReason::TargetTeacherBusy`]).
///
/// Each busy check skips only the cells the swap itself vacates: the
/// destination cell, plus the mover's own cell when both slots share a
/// time. A cross-class move therefore still sees the mover's own class
/// at the destination time.
pub fn evaluate_swap(
    source: &Slot,
    source_cell: &Cell,
    target: &Slot,
    target_cell: &Cell,
    store: &ScheduleStore,
    registry: &TeacherRegistry,
) -> SwapEvaluation {
    if source_cell.is_holiday() || target_cell.is_holiday() {
        return SwapEvaluation::blocked(BlockReason::Holiday, "Holiday cells cannot be moved");
    }
    if !source_cell.is_special() {
        return SwapEvaluation::allowed();
    }

    let Some(source_teacher) = source_cell.teacher_id.as_deref().filter(|id| !id.is_empty())
    else {
        return SwapEvaluation::blocked(
            BlockReason::MissingTeacher,
            format!("'{}' has no teacher id", source_cell.subject),
        );
    };

    let Some(teacher) = registry.get(source_teacher) else {
        return SwapEvaluation::blocked(
            BlockReason::MissingTeacher,
            format!("unknown teacher '{source_teacher}'"),
        );
    };
    if !teacher.allows_class(target.class) {
        return SwapEvaluation::blocked(
            BlockReason::TeacherClassMismatch,
            format!("{} does not teach class {}", teacher.name, target.class),
        );
    }

    let same_time = source.same_time(target);
    let vacated = |mover_class: u32, destination_class: u32| -> Vec<u32> {
        if same_time {
            vec![mover_class, destination_class]
        } else {
            vec![destination_class]
        }
    };

    let busy = find_overlaps_excluding(
        store,
        target.week,
        &vacated(source.class, target.class),
        target.period,
        target.day,
        source_teacher,
    );
    if !busy.is_empty() {
        return SwapEvaluation::blocked(
            BlockReason::SourceTeacherBusy,
            format!(
                "{} already teaches class {} at that time",
                teacher.name,
                join_classes(&busy)
            ),
        )
        .with_conflicts(busy);
    }

    if target_cell.is_special() {
        if let Some(target_teacher) = target_cell.teacher_id.as_deref() {
            if target_teacher != source_teacher {
                if let Some(t) = registry.get(target_teacher) {
                    if !t.allows_class(source.class) {
                        return SwapEvaluation::blocked(
                            BlockReason::TargetTeacherClassMismatch,
                            format!("{} does not teach class {}", t.name, source.class),
                        );
                    }
                }
                let busy = find_overlaps_excluding(
                    store,
                    source.week,
                    &vacated(target.class, source.class),
                    source.period,
                    source.day,
                    target_teacher,
                );
                if !busy.is_empty() {
                    return SwapEvaluation::blocked(
                        BlockReason::TargetTeacherBusy,
                        format!(
                            "{} already teaches class {} at that time",
                            display_name(target_cell, registry),
                            join_classes(&busy)
                        ),
                    )
                    .with_conflicts(busy);
                }
            }
        }
    }

    SwapEvaluation::allowed()
}

fn display_name(cell: &Cell, registry: &TeacherRegistry) -> String {
    cell.teacher_id
        .as_deref()
        .and_then(|id| registry.get(id))
        .map(|t| t.name.clone())
        .or_else(|| cell.teacher.clone())
        .unwrap_or_default()
}

fn join_classes(classes: &[u32]) -> String {
    classes
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Teacher;

    struct Fixture {
        store: ScheduleStore,
        registry: TeacherRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            let registry = TeacherRegistry::from_teachers([
                Teacher::new("T1", "Kim", "체육").with_classes([1, 2]),
                Teacher::new("T2", "Lee", "음악").with_classes([1, 2, 3]),
            ]);
            let store = ScheduleStore::filled(1, 3, |s| Cell::homeroom(s, "국어"));
            Self { store, registry }
        }

        fn place(&mut self, slot: Slot, teacher: &str) {
            let t = self.registry.get(teacher).unwrap().clone();
            self.store
                .set_cell(&slot, Cell::special(&slot, &t, None))
                .unwrap();
        }

        fn eval(&self, source: Slot, target: Slot) -> SwapEvaluation {
            evaluate_swap(
                &source,
                self.store.cell(&source).unwrap(),
                &target,
                self.store.cell(&target).unwrap(),
                &self.store,
                &self.registry,
            )
        }
    }

    #[test]
    fn test_homeroom_swap_always_legal() {
        let mut f = Fixture::new();
        f.place(Slot::new(1, 2, 0, 0), "T1");
        f.place(Slot::new(1, 3, 1, 1), "T2");
        let e = f.eval(Slot::new(1, 1, 0, 0), Slot::new(1, 1, 1, 1));
        assert!(e.can_swap);
        assert_eq!(e.block_reason, None);
    }

    #[test]
    fn test_holiday_blocks() {
        let mut f = Fixture::new();
        let h = Slot::new(1, 1, 0, 0);
        f.store.set_cell(&h, Cell::holiday(&h)).unwrap();
        let e = f.eval(Slot::new(1, 1, 1, 0), h);
        assert_eq!(e.block_reason, Some(BlockReason::Holiday));
        assert!(!BlockReason::Holiday.is_overridable());
    }

    #[test]
    fn test_missing_teacher() {
        let mut f = Fixture::new();
        let s = Slot::new(1, 1, 0, 0);
        f.place(s, "T1");
        let mut broken = f.store.cell(&s).unwrap().clone();
        broken.teacher_id = None;
        f.store.set_cell(&s, broken).unwrap();
        let e = f.eval(s, Slot::new(1, 1, 1, 0));
        assert_eq!(e.block_reason, Some(BlockReason::MissingTeacher));
    }

    #[test]
    fn test_teacher_class_mismatch() {
        let mut f = Fixture::new();
        let s = Slot::new(1, 1, 0, 0);
        f.place(s, "T1");
        let e = f.eval(s, Slot::new(1, 3, 0, 1));
        assert_eq!(e.block_reason, Some(BlockReason::TeacherClassMismatch));
    }

    #[test]
    fn test_source_teacher_busy() {
        let mut f = Fixture::new();
        let s = Slot::new(1, 1, 0, 0);
        f.place(s, "T1");
        f.place(Slot::new(1, 2, 3, 3), "T1");
        let e = f.eval(s, Slot::new(1, 1, 3, 3));
        assert_eq!(e.block_reason, Some(BlockReason::SourceTeacherBusy));
        assert_eq!(e.conflicts, vec![2]);

        assert!(f.eval(s, Slot::new(1, 1, 2, 2)).can_swap);
    }

    #[test]
    fn test_target_side_checks() {
        let mut f = Fixture::new();
        // T2 in class 3 wants to trade with T1's class-1 slot: T2 fine in class 1,
        // but T1 cannot teach class 3.
        f.place(Slot::new(1, 1, 0, 0), "T1");
        f.place(Slot::new(1, 3, 0, 0), "T2");
        let e = f.eval(Slot::new(1, 3, 0, 0), Slot::new(1, 1, 0, 0));
        assert_eq!(e.block_reason, Some(BlockReason::TargetTeacherClassMismatch));

        // Within class 1: T1 at (0,0) swaps with T2 at (1,1); T2 is busy in class 2 at (0,0).
        let mut f = Fixture::new();
        f.place(Slot::new(1, 1, 0, 0), "T1");
        f.place(Slot::new(1, 1, 1, 1), "T2");
        f.place(Slot::new(1, 2, 0, 0), "T2");
        let e = f.eval(Slot::new(1, 1, 0, 0), Slot::new(1, 1, 1, 1));
        assert_eq!(e.block_reason, Some(BlockReason::TargetTeacherBusy));
        assert_eq!(e.conflicts, vec![2]);
    }

    #[test]
    fn test_same_teacher_both_sides() {
        let mut f = Fixture::new();
        f.place(Slot::new(1, 1, 0, 0), "T1");
        f.place(Slot::new(1, 1, 1, 1), "T1");
        assert!(f.eval(Slot::new(1, 1, 0, 0), Slot::new(1, 1, 1, 1)).can_swap);
    }

    #[test]
    fn test_cross_class_move_sees_own_class() {
        let mut f = Fixture::new();
        f.place(Slot::new(1, 1, 0, 0), "T1");
        f.place(Slot::new(1, 1, 1, 1), "T1");
        let e = f.eval(Slot::new(1, 1, 0, 0), Slot::new(1, 2, 1, 1));
        assert_eq!(e.block_reason, Some(BlockReason::SourceTeacherBusy));
        assert_eq!(e.conflicts, vec![1]);

        // Same time, other class: the mover's own cell is vacated.
        assert!(f.eval(Slot::new(1, 1, 0, 0), Slot::new(1, 2, 0, 0)).can_swap);
    }

    #[test]
    fn test_cross_class_target_sees_own_class() {
        let mut f = Fixture::new();
        f.place(Slot::new(1, 1, 0, 0), "T1");
        f.place(Slot::new(1, 2, 1, 1), "T2");
        f.place(Slot::new(1, 2, 0, 0), "T2");
        let e = f.eval(Slot::new(1, 1, 0, 0), Slot::new(1, 2, 1, 1));
        assert_eq!(e.block_reason, Some(BlockReason::TargetTeacherBusy));
        assert_eq!(e.conflicts, vec![2]);
    }

    #[test]
    fn test_unregistered_source_teacher() {
        let mut f = Fixture::new();
        let s = Slot::new(1, 1, 0, 0);
        f.place(s, "T1");
        f.registry.remove("T1").unwrap();
        let e = f.eval(s, Slot::new(1, 1, 1, 0));
        assert_eq!(e.block_reason, Some(BlockReason::MissingTeacher));
        assert!(e.details.contains("T1"));
    }
}
