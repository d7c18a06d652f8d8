//! Timetable engine context.
//!
//! [`TimetableEngine`] owns the schedule store, teacher registry, baseline
//! snapshot, history and configuration. Every structural mutation funnels
//! through a single commit path so undo always reverses the preceding
//! change and the revision counter advances on every state change.
//!
//! # Usage
//!
//! ```
//! use u_timetable::config::EngineConfig;
//! use u_timetable::engine::{AssignOutcome, AssignmentRequest, TimetableEngine};
//! use u_timetable::models::{Slot, Teacher, TeacherRegistry};
//!
//! let registry = TeacherRegistry::from_teachers([
//!     Teacher::new("T", "Park", "체육").with_classes([1, 2]),
//! ]);
//! let config = EngineConfig { week_count: 2, ..EngineConfig::default() };
//! let mut engine = TimetableEngine::new(config, 2, vec!["국어".into()], registry);
//!
//! let slot = Slot::new(1, 1, 0, 0);
//! let outcome = engine
//!     .assign(&slot, AssignmentRequest::specialist("T"))
//!     .unwrap();
//! assert_eq!(outcome, AssignOutcome::Committed);
//!
//! engine.undo().unwrap();
//! assert!(engine.cell(&slot).unwrap().is_empty());
//! ```

mod bulk;
mod generator;
mod history;
mod settings;

pub use bulk::PropagationSummary;
pub use generator::generate_schedule;
pub use history::{Checkpoint, HistoryManager, LiveState};

use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::EngineConfig;
use crate::error::{Result, TimetableError};
use crate::models::{
    grid_positions, Cell, ChangeKind, ChangeLogEntry, ScheduleStore, Slot, TeacherRegistry,
};
use crate::planner::{slot_label, swap_cells, ConflictPlanner, Plan};
use crate::rules::{
    evaluate_swap, find_double_bookings, find_overlaps, DoubleBooking, MismatchClassifier,
    SwapEvaluation,
};
use crate::stats::TimetableStats;

/// What to put in a slot on direct assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentRequest {
    /// Empty the slot.
    Clear,
    /// A homeroom lesson.
    Homeroom { subject: String },
    /// A specialist lesson.
    Specialist {
        teacher_id: String,
        location: Option<String>,
    },
}

impl AssignmentRequest {
    /// Homeroom lesson shorthand.
    pub fn homeroom(subject: impl Into<String>) -> Self {
        AssignmentRequest::Homeroom {
            subject: subject.into(),
        }
    }

    /// Specialist lesson shorthand, without a location.
    pub fn specialist(teacher_id: impl Into<String>) -> Self {
        AssignmentRequest::Specialist {
            teacher_id: teacher_id.into(),
            location: None,
        }
    }
}

/// Outcome of a direct assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignOutcome {
    /// The change was committed.
    Committed,
    /// The assignment would double-book a teacher. Nothing was committed;
    /// the caller must pick one of the plans (the last is the forced one).
    NeedsResolution(Vec<Plan>),
}

/// Outcome of a swap request.
#[derive(Debug, Clone, PartialEq)]
pub enum SwapOutcome {
    /// Source and target are the same slot. Nothing was committed.
    Unchanged,
    /// The legal swap was committed.
    Swapped,
    /// A blocked swap was committed by override; specialist cells were
    /// flagged `forced_conflict`.
    Forced(SwapEvaluation),
    /// The swap is illegal and was not committed. Re-issue with `force`
    /// to override (not possible for holidays).
    Blocked(SwapEvaluation),
}

/// Render status of one cell.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CellStatus {
    /// Other classes holding the same teacher at the same moment.
    pub overlaps: Vec<u32>,
    /// Whether the cell deviates from templates or the baseline.
    pub mismatched: bool,
    /// Whether the cell was placed by override.
    pub forced: bool,
}

impl CellStatus {
    /// Whether the cell has any overlap.
    pub fn has_overlap(&self) -> bool {
        !self.overlaps.is_empty()
    }
}

/// The timetable engine context.
#[derive(Debug, Clone)]
pub struct TimetableEngine {
    pub(crate) config: EngineConfig,
    pub(crate) class_count: u32,
    pub(crate) subjects: Vec<String>,
    pub(crate) registry: TeacherRegistry,
    pub(crate) store: ScheduleStore,
    pub(crate) baseline: Option<ScheduleStore>,
    pub(crate) history: HistoryManager,
    pub(crate) standard_hours: BTreeMap<String, f64>,
    pub(crate) weekly_notices: BTreeMap<u32, String>,
    pub(crate) actor: String,
    pub(crate) revision: u64,
}

impl TimetableEngine {
    /// Creates an engine over an all-empty schedule.
    ///
    /// No baseline is captured; it is taken from the first generated or
    /// loaded schedule.
    pub fn new(
        config: EngineConfig,
        class_count: u32,
        subjects: Vec<String>,
        registry: TeacherRegistry,
    ) -> Self {
        let store = ScheduleStore::filled(config.week_count, class_count, Cell::empty);
        Self::with_store(config, class_count, subjects, registry, store)
    }

    /// Creates an engine over a generated schedule and captures it as the
    /// baseline.
    pub fn generate<R: Rng + ?Sized>(
        config: EngineConfig,
        class_count: u32,
        subjects: Vec<String>,
        registry: TeacherRegistry,
        rng: &mut R,
    ) -> Self {
        let store = generate_schedule(class_count, &subjects, &registry, &config, rng);
        let mut engine = Self::with_store(config, class_count, subjects, registry, store);
        engine.capture_baseline();
        engine
    }

    fn with_store(
        config: EngineConfig,
        class_count: u32,
        subjects: Vec<String>,
        registry: TeacherRegistry,
        store: ScheduleStore,
    ) -> Self {
        let history = HistoryManager::new(config.undo_limit, config.change_log_limit);
        Self {
            config,
            class_count,
            subjects,
            registry,
            store,
            baseline: None,
            history,
            standard_hours: BTreeMap::new(),
            weekly_notices: BTreeMap::new(),
            actor: "local".to_string(),
            revision: 0,
        }
    }

    /// Sets the actor recorded in change log entries.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    // ======================== Queries ========================

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &ScheduleStore {
        &self.store
    }

    pub fn registry(&self) -> &TeacherRegistry {
        &self.registry
    }

    /// The first-observed schedule, if captured.
    pub fn baseline(&self) -> Option<&ScheduleStore> {
        self.baseline.as_ref()
    }

    pub fn class_count(&self) -> u32 {
        self.class_count
    }

    /// Display names for classes `1..=class_count`.
    pub fn class_labels(&self) -> Vec<String> {
        (1..=self.class_count)
            .map(|c| self.config.class_label(c))
            .collect()
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    pub fn standard_hours(&self) -> &BTreeMap<String, f64> {
        &self.standard_hours
    }

    pub fn weekly_notice(&self, week: u32) -> Option<&str> {
        self.weekly_notices.get(&week).map(String::as_str)
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Monotonic counter bumped on every state change (commits, undo/redo,
    /// configuration edits and remote replacement).
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    /// Change log, oldest first.
    pub fn change_log(&self) -> Vec<&ChangeLogEntry> {
        self.history.log().collect()
    }

    /// Cell at a slot.
    pub fn cell(&self, slot: &Slot) -> Result<&Cell> {
        self.store.require_cell(slot)
    }

    /// Mismatch classifier over the current registry and baseline.
    pub fn classifier(&self) -> MismatchClassifier<'_> {
        MismatchClassifier::new(&self.registry, self.baseline.as_ref(), &self.config)
    }

    /// Overlap, mismatch and forced status of one cell.
    pub fn cell_status(&self, slot: &Slot) -> Result<CellStatus> {
        let cell = self.store.require_cell(slot)?;
        let overlaps = match cell.teacher_id.as_deref().filter(|_| cell.is_special()) {
            Some(teacher_id) => find_overlaps(
                &self.store,
                slot.week,
                slot.class,
                slot.period,
                slot.day,
                teacher_id,
            ),
            None => Vec::new(),
        };
        Ok(CellStatus {
            overlaps,
            mismatched: self.classifier().is_mismatched(slot, cell),
            forced: cell.forced_conflict,
        })
    }

    /// Legal swap targets for `source` within its week, across all classes.
    pub fn swap_candidates(&self, source: &Slot) -> Result<Vec<Slot>> {
        let source_cell = self.store.require_cell(source)?;
        let week = self
            .store
            .week(source.week)
            .ok_or(TimetableError::UnknownWeek(source.week))?;
        let mut out = Vec::new();
        for class in week.class_numbers() {
            for (period, day) in grid_positions() {
                let target = Slot::new(source.week, class, period, day);
                if target == *source {
                    continue;
                }
                let Some(target_cell) = self.store.cell(&target) else {
                    continue;
                };
                let eval = evaluate_swap(
                    source,
                    source_cell,
                    &target,
                    target_cell,
                    &self.store,
                    &self.registry,
                );
                if eval.can_swap {
                    out.push(target);
                }
            }
        }
        debug!("swap candidates for {}: {}", source.cell_id(), out.len());
        Ok(out)
    }

    /// Every double-booked teacher in a week.
    pub fn double_bookings(&self, week: u32) -> Vec<DoubleBooking> {
        find_double_bookings(&self.store, week)
    }

    /// Read-only statistics for a week.
    pub fn stats(&self, week: u32) -> Result<TimetableStats> {
        if self.store.week(week).is_none() {
            return Err(TimetableError::UnknownWeek(week));
        }
        Ok(TimetableStats::calculate(
            &self.store,
            week,
            &self.standard_hours,
        ))
    }

    // ======================== Direct edits ========================

    /// Assigns a slot directly.
    ///
    /// A specialist assignment that would double-book the teacher is not
    /// committed; the ranked plans are returned instead.
    pub fn assign(&mut self, slot: &Slot, request: AssignmentRequest) -> Result<AssignOutcome> {
        let current = self.store.require_cell(slot)?;
        if current.is_holiday() {
            return Err(TimetableError::HolidayLocked(slot.cell_id()));
        }

        let proposed = match &request {
            AssignmentRequest::Clear => Cell::empty(slot),
            AssignmentRequest::Homeroom { subject } => {
                if subject.trim().is_empty() {
                    return Err(TimetableError::EmptySubject);
                }
                Cell::homeroom(slot, subject.trim())
            }
            AssignmentRequest::Specialist {
                teacher_id,
                location,
            } => {
                let teacher = self.registry.require(teacher_id)?;
                if !teacher.allows_class(slot.class) {
                    return Err(TimetableError::TeacherClassNotAllowed {
                        teacher_id: teacher_id.clone(),
                        class: slot.class,
                    });
                }
                let location = location
                    .as_deref()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string);
                Cell::special(slot, teacher, location)
            }
        };

        let plans = ConflictPlanner::new(&self.store, &self.registry, self.classifier(), &self.config)
            .with_revision(self.revision)
            .build_plans(slot, &proposed);
        if !plans.is_empty() {
            info!(
                "assign: {} at {} conflicts, {} plans offered",
                proposed.subject,
                slot.cell_id(),
                plans.len()
            );
            return Ok(AssignOutcome::NeedsResolution(plans));
        }

        let summary = format!(
            "{} {}: {}",
            self.config.class_label(slot.class),
            slot_label(slot),
            if proposed.is_empty() { "cleared" } else { proposed.subject.as_str() }
        );
        let mut next = self.store.clone();
        next.set_cell(slot, proposed)?;
        self.commit(next, ChangeKind::Assign, summary, [slot.week]);
        Ok(AssignOutcome::Committed)
    }

    /// Applies a plan returned by [`assign`](Self::assign).
    ///
    /// Fails with [`TimetableError::StalePlan`] if anything was committed
    /// since the plan was built.
    pub fn apply_plan(&mut self, plan: &Plan) -> Result<()> {
        if plan.revision != self.revision {
            return Err(TimetableError::StalePlan {
                plan_revision: plan.revision,
                current_revision: self.revision,
            });
        }
        let mut next = self.store.clone();
        plan.apply_to(&mut next)?;
        if plan.is_forced() {
            warn!("plan: forced placement applied ({})", plan.description);
        }
        self.commit(next, ChangeKind::ResolvePlan, plan.description.clone(), plan.weeks());
        Ok(())
    }

    /// Swaps two cells.
    ///
    /// Blocked swaps are only committed with `force`; holiday blocks can
    /// never be forced.
    pub fn swap(&mut self, source: &Slot, target: &Slot, force: bool) -> Result<SwapOutcome> {
        let source_cell = self.store.require_cell(source)?;
        let target_cell = self.store.require_cell(target)?;
        if source == target {
            return Ok(SwapOutcome::Unchanged);
        }

        let eval = evaluate_swap(
            source,
            source_cell,
            target,
            target_cell,
            &self.store,
            &self.registry,
        );
        let summary = format!(
            "{} {} ↔ {} {}",
            self.config.class_label(source.class),
            slot_label(source),
            self.config.class_label(target.class),
            slot_label(target)
        );

        if eval.can_swap {
            let mut next = self.store.clone();
            swap_cells(&mut next, source, target, false)?;
            self.commit(next, ChangeKind::Swap, summary, [source.week, target.week]);
            return Ok(SwapOutcome::Swapped);
        }

        if !force {
            return Ok(SwapOutcome::Blocked(eval));
        }
        if eval.block_reason.is_some_and(|r| !r.is_overridable()) {
            let locked = if source_cell.is_holiday() { source } else { target };
            return Err(TimetableError::HolidayLocked(locked.cell_id()));
        }

        warn!("swap: forced override ({})", eval.details);
        let mut next = self.store.clone();
        swap_cells(&mut next, source, target, true)?;
        self.commit(
            next,
            ChangeKind::Swap,
            format!("{summary} (forced)"),
            [source.week, target.week],
        );
        Ok(SwapOutcome::Forced(eval))
    }

    // ======================== History ========================

    /// Restores the state before the last commit, including teacher
    /// class sets and the class count when that commit changed them.
    pub fn undo(&mut self) -> Result<()> {
        let live = LiveState {
            store: &mut self.store,
            registry: &mut self.registry,
            class_count: &mut self.class_count,
        };
        self.history.undo(live, &self.actor)?;
        self.revision += 1;
        Ok(())
    }

    /// Re-applies the last undone commit.
    pub fn redo(&mut self) -> Result<()> {
        let live = LiveState {
            store: &mut self.store,
            registry: &mut self.registry,
            class_count: &mut self.class_count,
        };
        self.history.redo(live, &self.actor)?;
        self.revision += 1;
        Ok(())
    }

    /// Captures the current schedule as the baseline if none exists yet.
    pub(crate) fn capture_baseline(&mut self) {
        if self.baseline.is_none() {
            self.baseline = Some(self.store.clone());
        }
    }

    /// The single mutation path for schedule changes.
    pub(crate) fn commit(
        &mut self,
        next: ScheduleStore,
        kind: ChangeKind,
        summary: impl Into<String>,
        weeks: impl IntoIterator<Item = u32>,
    ) {
        let previous = Checkpoint::new(std::mem::replace(&mut self.store, next), self.class_count);
        self.record_commit(previous, kind, summary, weeks);
    }

    /// Commit path for changes that also rewrite the registry or class
    /// count. The caller has already applied both; `registry` and
    /// `class_count` are the values before the change.
    pub(crate) fn commit_with_registry(
        &mut self,
        next: ScheduleStore,
        registry: TeacherRegistry,
        class_count: u32,
        kind: ChangeKind,
        summary: impl Into<String>,
        weeks: impl IntoIterator<Item = u32>,
    ) {
        let previous =
            Checkpoint::new(std::mem::replace(&mut self.store, next), class_count)
                .with_registry(registry);
        self.record_commit(previous, kind, summary, weeks);
    }

    fn record_commit(
        &mut self,
        previous: Checkpoint,
        kind: ChangeKind,
        summary: impl Into<String>,
        weeks: impl IntoIterator<Item = u32>,
    ) {
        let entry = ChangeLogEntry::new(kind, summary, self.actor.clone()).with_weeks(weeks);
        info!("commit: {:?} {}", entry.kind, entry.summary);
        self.history.commit(previous, entry);
        self.revision += 1;
    }

    /// Marks a non-schedule state change (registry, subjects, notices).
    pub(crate) fn touch(&mut self) {
        self.revision += 1;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::Teacher;
    use crate::planner::PlanFamily;
    use crate::rules::BlockReason;
    use crate::validation::validate_schedule;

    pub(crate) fn test_config() -> EngineConfig {
        EngineConfig {
            week_count: 3,
            ..EngineConfig::default()
        }
    }

    pub(crate) fn pe_engine() -> TimetableEngine {
        let registry = TeacherRegistry::from_teachers([
            Teacher::new("T", "Park", "체육").with_classes([1, 2]),
            Teacher::new("M", "Choi", "음악").with_classes([1, 2, 3]),
        ]);
        let mut engine = TimetableEngine::new(
            test_config(),
            3,
            vec!["국어".into(), "수학".into()],
            registry,
        );
        let mut next = engine.store.clone();
        for (slot, _) in engine.store.iter_cells() {
            next.set_cell(&slot, Cell::homeroom(&slot, "국어")).unwrap();
        }
        engine.store = next;
        engine
    }

    #[test]
    fn test_assign_conflict_returns_plans_without_commit() {
        let mut engine = pe_engine();
        let busy = Slot::new(1, 1, 0, 0);
        assert_eq!(
            engine.assign(&busy, AssignmentRequest::specialist("T")).unwrap(),
            AssignOutcome::Committed
        );
        let before = engine.store().clone();
        let revision = engine.revision();

        let target = Slot::new(1, 2, 0, 0);
        let outcome = engine.assign(&target, AssignmentRequest::specialist("T")).unwrap();
        let AssignOutcome::NeedsResolution(plans) = outcome else {
            panic!("expected plans");
        };
        assert_eq!(engine.store(), &before);
        assert_eq!(engine.revision(), revision);

        assert!(plans.len() <= 10);
        assert_eq!(plans.iter().filter(|p| p.is_forced()).count(), 1);
        assert!(plans.last().unwrap().is_forced());
        assert!(plans
            .iter()
            .any(|p| matches!(p.family, PlanFamily::RelocateBlocker | PlanFamily::RelocateNew)));
    }

    #[test]
    fn test_apply_plan_resolves_conflict() {
        let mut engine = pe_engine();
        let busy = Slot::new(1, 1, 0, 0);
        engine.assign(&busy, AssignmentRequest::specialist("T")).unwrap();
        let target = Slot::new(1, 2, 0, 0);
        let AssignOutcome::NeedsResolution(plans) =
            engine.assign(&target, AssignmentRequest::specialist("T")).unwrap()
        else {
            panic!("expected plans");
        };

        engine.apply_plan(&plans[0]).unwrap();
        assert!(engine.double_bookings(1).is_empty());
        assert_eq!(
            engine.change_log().last().unwrap().kind,
            ChangeKind::ResolvePlan
        );
    }

    #[test]
    fn test_apply_forced_plan_flags_cell() {
        let mut engine = pe_engine();
        let busy = Slot::new(1, 1, 0, 0);
        engine.assign(&busy, AssignmentRequest::specialist("T")).unwrap();
        let target = Slot::new(1, 2, 0, 0);
        let AssignOutcome::NeedsResolution(plans) =
            engine.assign(&target, AssignmentRequest::specialist("T")).unwrap()
        else {
            panic!("expected plans");
        };
        let forced = plans.last().unwrap();
        engine.apply_plan(forced).unwrap();

        let status = engine.cell_status(&target).unwrap();
        assert!(status.forced);
        assert_eq!(status.overlaps, vec![1]);
        let bookings = engine.double_bookings(1);
        assert_eq!(bookings.len(), 1);
        assert!(bookings[0].forced);
    }

    #[test]
    fn test_stale_plan_rejected() {
        let mut engine = pe_engine();
        let busy = Slot::new(1, 1, 0, 0);
        engine.assign(&busy, AssignmentRequest::specialist("T")).unwrap();
        let target = Slot::new(1, 2, 0, 0);
        let AssignOutcome::NeedsResolution(plans) =
            engine.assign(&target, AssignmentRequest::specialist("T")).unwrap()
        else {
            panic!("expected plans");
        };
        engine
            .assign(&Slot::new(1, 3, 5, 4), AssignmentRequest::homeroom("수학"))
            .unwrap();

        let err = engine.apply_plan(&plans[0]).unwrap_err();
        assert!(matches!(err, TimetableError::StalePlan { .. }));
    }

    #[test]
    fn test_assign_validation_errors() {
        let mut engine = pe_engine();
        let slot = Slot::new(1, 3, 0, 0);
        let revision = engine.revision();

        assert_eq!(
            engine.assign(&slot, AssignmentRequest::homeroom("  ")),
            Err(TimetableError::EmptySubject)
        );
        assert_eq!(
            engine.assign(&slot, AssignmentRequest::specialist("T")),
            Err(TimetableError::TeacherClassNotAllowed {
                teacher_id: "T".into(),
                class: 3
            })
        );
        assert_eq!(
            engine.assign(&slot, AssignmentRequest::specialist("nobody")),
            Err(TimetableError::UnknownTeacher("nobody".into()))
        );
        assert_eq!(
            engine.assign(&Slot::new(9, 1, 0, 0), AssignmentRequest::Clear),
            Err(TimetableError::UnknownWeek(9))
        );
        assert_eq!(engine.revision(), revision);
        assert!(!engine.history().can_undo());
    }

    #[test]
    fn test_assign_holiday_locked() {
        let mut engine = pe_engine();
        engine.apply_holiday(1, &[0]).unwrap();
        let err = engine
            .assign(&Slot::new(1, 1, 0, 0), AssignmentRequest::homeroom("수학"))
            .unwrap_err();
        assert!(matches!(err, TimetableError::HolidayLocked(_)));
    }

    #[test]
    fn test_swap_homeroom_always_legal() {
        let mut engine = pe_engine();
        let a = Slot::new(1, 1, 0, 0);
        let b = Slot::new(1, 1, 3, 2);
        engine.assign(&a, AssignmentRequest::homeroom("수학")).unwrap();

        assert_eq!(engine.swap(&a, &b, false).unwrap(), SwapOutcome::Swapped);
        assert_eq!(engine.cell(&b).unwrap().subject, "수학");
        assert_eq!(engine.cell(&a).unwrap().subject, "국어");
    }

    #[test]
    fn test_swap_blocked_then_forced() {
        let mut engine = pe_engine();
        let in_one = Slot::new(1, 1, 0, 0);
        let in_two = Slot::new(1, 2, 1, 0);
        engine.assign(&in_one, AssignmentRequest::specialist("T")).unwrap();
        engine.assign(&in_two, AssignmentRequest::specialist("T")).unwrap();

        // Moving class 2's lesson to period 1 collides with class 1.
        let target = Slot::new(1, 2, 0, 0);
        let before = engine.store().clone();
        let outcome = engine.swap(&in_two, &target, false).unwrap();
        let SwapOutcome::Blocked(eval) = outcome else {
            panic!("expected block");
        };
        assert_eq!(eval.block_reason, Some(BlockReason::SourceTeacherBusy));
        assert_eq!(engine.store(), &before);

        let outcome = engine.swap(&in_two, &target, true).unwrap();
        assert!(matches!(outcome, SwapOutcome::Forced(_)));
        assert!(engine.cell(&target).unwrap().forced_conflict);
        assert_eq!(engine.cell_status(&target).unwrap().overlaps, vec![1]);
    }

    #[test]
    fn test_cross_class_swap_sees_own_class() {
        let mut engine = pe_engine();
        let source = Slot::new(1, 1, 0, 0);
        engine.assign(&source, AssignmentRequest::specialist("T")).unwrap();
        engine
            .assign(&Slot::new(1, 1, 1, 1), AssignmentRequest::specialist("T"))
            .unwrap();
        let before = engine.store().clone();

        let target = Slot::new(1, 2, 1, 1);
        let SwapOutcome::Blocked(eval) = engine.swap(&source, &target, false).unwrap() else {
            panic!("expected block");
        };
        assert_eq!(eval.block_reason, Some(BlockReason::SourceTeacherBusy));
        assert_eq!(eval.conflicts, vec![1]);
        assert_eq!(engine.store(), &before);
        assert!(engine.double_bookings(1).is_empty());
        assert!(!engine.swap_candidates(&source).unwrap().contains(&target));
    }

    #[test]
    fn test_forced_swap_flags_both_specialists() {
        let mut engine = pe_engine();
        let pe = Slot::new(1, 1, 0, 0);
        let music = Slot::new(1, 3, 1, 1);
        engine.assign(&pe, AssignmentRequest::specialist("T")).unwrap();
        engine.assign(&music, AssignmentRequest::specialist("M")).unwrap();

        let SwapOutcome::Blocked(eval) = engine.swap(&pe, &music, false).unwrap() else {
            panic!("expected block");
        };
        assert_eq!(eval.block_reason, Some(BlockReason::TeacherClassMismatch));

        let outcome = engine.swap(&pe, &music, true).unwrap();
        assert!(matches!(outcome, SwapOutcome::Forced(_)));
        let moved_music = engine.cell(&pe).unwrap();
        let moved_pe = engine.cell(&music).unwrap();
        assert!(moved_music.is_taught_by("M") && moved_music.forced_conflict);
        assert!(moved_pe.is_taught_by("T") && moved_pe.forced_conflict);
        assert_eq!(validate_schedule(engine.store(), engine.registry()), Ok(()));

        engine.undo().unwrap();
        assert!(!engine.cell(&pe).unwrap().forced_conflict);
        assert!(!engine.cell(&music).unwrap().forced_conflict);
    }

    #[test]
    fn test_forced_swap_on_holiday_is_error() {
        let mut engine = pe_engine();
        engine.apply_holiday(1, &[4]).unwrap();
        let a = Slot::new(1, 1, 0, 0);
        let h = Slot::new(1, 1, 0, 4);
        assert!(matches!(
            engine.swap(&a, &h, false).unwrap(),
            SwapOutcome::Blocked(SwapEvaluation {
                block_reason: Some(BlockReason::Holiday),
                ..
            })
        ));
        assert!(matches!(
            engine.swap(&a, &h, true),
            Err(TimetableError::HolidayLocked(_))
        ));
    }

    #[test]
    fn test_swap_same_slot_unchanged() {
        let mut engine = pe_engine();
        let a = Slot::new(1, 1, 0, 0);
        assert_eq!(engine.swap(&a, &a, false).unwrap(), SwapOutcome::Unchanged);
        assert!(!engine.history().can_undo());
    }

    #[test]
    fn test_undo_redo_is_noop_on_store() {
        let mut engine = pe_engine();
        engine
            .assign(&Slot::new(1, 1, 0, 0), AssignmentRequest::specialist("T"))
            .unwrap();
        let after = engine.store().clone();

        engine.undo().unwrap();
        assert!(!engine.cell(&Slot::new(1, 1, 0, 0)).unwrap().is_special());
        engine.redo().unwrap();
        assert_eq!(engine.store(), &after);

        engine.undo().unwrap();
        assert!(engine.undo().unwrap_err().is_benign());
    }

    #[test]
    fn test_swap_candidates_excludes_busy_moments() {
        let mut engine = pe_engine();
        let in_one = Slot::new(1, 1, 0, 0);
        let in_two = Slot::new(1, 2, 2, 0);
        engine.assign(&in_one, AssignmentRequest::specialist("T")).unwrap();
        engine.assign(&in_two, AssignmentRequest::specialist("T")).unwrap();

        let candidates = engine.swap_candidates(&in_two).unwrap();
        assert!(!candidates.contains(&in_two));
        assert!(!candidates.contains(&Slot::new(1, 2, 0, 0)));
        assert!(candidates.contains(&Slot::new(1, 2, 1, 0)));
        // Class 3 is outside the teacher's allowed set.
        assert!(!candidates.iter().any(|s| s.class == 3));
    }

    #[test]
    fn test_cell_status_mismatch_against_baseline() {
        let mut engine = pe_engine();
        engine.capture_baseline();
        let slot = Slot::new(1, 1, 0, 0);
        assert!(!engine.cell_status(&slot).unwrap().mismatched);
        engine.assign(&slot, AssignmentRequest::homeroom("수학")).unwrap();
        assert!(!engine.cell_status(&slot).unwrap().mismatched);
        engine.assign(&slot, AssignmentRequest::specialist("T")).unwrap();
        assert!(engine.cell_status(&slot).unwrap().mismatched);
    }

    #[test]
    fn test_change_log_records_actor_and_week() {
        let mut engine = pe_engine().with_actor("teacher-a");
        engine
            .assign(&Slot::new(2, 1, 0, 0), AssignmentRequest::homeroom("수학"))
            .unwrap();
        let entry = engine.change_log().pop().unwrap().clone();
        assert_eq!(entry.kind, ChangeKind::Assign);
        assert_eq!(entry.actor, "teacher-a");
        assert_eq!(entry.week_keys, vec![2]);
        assert_eq!(entry.summary, "1반 Mon P1: 수학");
    }
}
