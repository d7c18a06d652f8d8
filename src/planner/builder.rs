//! Candidate generation and scoring.

use log::debug;

use super::plan::{slot_label, Plan, PlanFamily, PlanOperation};
use crate::config::{EngineConfig, PlanWeights};
use crate::models::{grid_positions, Cell, ScheduleStore, Slot, TeacherRegistry};
use crate::rules::{evaluate_swap, find_overlaps, MismatchClassifier};

/// Builds ranked resolution plans for a conflicting direct assignment.
///
/// # Algorithm
/// All candidates are generated against the current store only (no
/// look-ahead):
///
/// 1. **Relocate-the-blocker**: for each class holding the teacher at the
///    target moment, every other slot of that class whose cell is neither
///    specialist nor holiday, where the swap is legal.
/// 2. **Relocate-the-new-assignment**: every other non-specialist,
///    non-holiday slot of the target class where the teacher is free.
/// 3. **Forced apply**: always present.
///
/// Each candidate is simulated on a clone of the store and scored with
/// [`PlanWeights`]. Plans are sorted ascending by score, truncated to
/// `max_plans`, and the forced plan is always retained.
#[derive(Debug, Clone)]
pub struct ConflictPlanner<'a> {
    store: &'a ScheduleStore,
    registry: &'a TeacherRegistry,
    classifier: MismatchClassifier<'a>,
    config: &'a EngineConfig,
    revision: u64,
}

impl<'a> ConflictPlanner<'a> {
    /// Creates a planner over the current state.
    pub fn new(
        store: &'a ScheduleStore,
        registry: &'a TeacherRegistry,
        classifier: MismatchClassifier<'a>,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            store,
            registry,
            classifier,
            config,
            revision: 0,
        }
    }

    /// Stamps generated plans with an engine revision.
    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    /// Builds plans for placing `proposed` at `target`.
    ///
    /// Returns an empty list when `proposed` is not a specialist cell or
    /// does not conflict with any other class.
    pub fn build_plans(&self, target: &Slot, proposed: &Cell) -> Vec<Plan> {
        let Some(teacher_id) = proposed
            .teacher_id
            .as_deref()
            .filter(|_| proposed.is_special())
        else {
            return Vec::new();
        };
        let conflicts = find_overlaps(
            self.store,
            target.week,
            target.class,
            target.period,
            target.day,
            teacher_id,
        );
        if conflicts.is_empty() {
            return Vec::new();
        }

        let placed = proposed.relocated(target).with_forced_conflict(false);
        let mut candidates = Vec::new();

        for &class in &conflicts {
            self.relocate_blocker(target.in_class(class), target, &placed, &mut candidates);
        }
        self.relocate_new(target, &placed, teacher_id, &mut candidates);

        let generated = candidates.len();
        let mut plans: Vec<Plan> = candidates
            .into_iter()
            .map(|(family, ops, description)| self.score(family, ops, description))
            .collect();
        plans.sort_by_key(|p| p.score);
        plans.truncate(self.config.max_plans.saturating_sub(1));

        let forced = placed.clone().with_forced_conflict(true);
        plans.push(self.score(
            PlanFamily::ForcedApply,
            vec![PlanOperation::Place {
                slot: *target,
                cell: forced,
            }],
            format!(
                "Place {} in class {} at {} despite the conflict",
                placed.subject,
                target.class,
                slot_label(target)
            ),
        ));
        plans.sort_by_key(|p| (p.score, p.is_forced()));

        debug!(
            "planner: {} candidate(s) for teacher {} at {}; returning {}",
            generated,
            teacher_id,
            target.cell_id(),
            plans.len()
        );
        plans
    }

    fn relocate_blocker(
        &self,
        blocker_slot: Slot,
        target: &Slot,
        placed: &Cell,
        out: &mut Vec<(PlanFamily, Vec<PlanOperation>, String)>,
    ) {
        let Some(blocker) = self.store.cell(&blocker_slot) else {
            return;
        };
        for (period, day) in grid_positions() {
            if (period, day) == (blocker_slot.period, blocker_slot.day) {
                continue;
            }
            let dest = blocker_slot.at(period, day);
            let Some(dest_cell) = self.store.cell(&dest) else {
                continue;
            };
            if dest_cell.is_special() || dest_cell.is_holiday() {
                continue;
            }
            let eval = evaluate_swap(
                &blocker_slot,
                blocker,
                &dest,
                dest_cell,
                self.store,
                self.registry,
            );
            if !eval.can_swap {
                continue;
            }
            let ops = vec![
                PlanOperation::Swap {
                    from: blocker_slot,
                    to: dest,
                    forced: false,
                },
                PlanOperation::Place {
                    slot: *target,
                    cell: placed.clone(),
                },
            ];
            let description = format!(
                "Move class {}'s {} from {} to {}, then place {} in class {}",
                blocker_slot.class,
                blocker.subject,
                slot_label(&blocker_slot),
                slot_label(&dest),
                placed.subject,
                target.class
            );
            out.push((PlanFamily::RelocateBlocker, ops, description));
        }
    }

    fn relocate_new(
        &self,
        target: &Slot,
        placed: &Cell,
        teacher_id: &str,
        out: &mut Vec<(PlanFamily, Vec<PlanOperation>, String)>,
    ) {
        for (period, day) in grid_positions() {
            if (period, day) == (target.period, target.day) {
                continue;
            }
            let dest = target.at(period, day);
            let Some(dest_cell) = self.store.cell(&dest) else {
                continue;
            };
            if dest_cell.is_special() || dest_cell.is_holiday() {
                continue;
            }
            if !find_overlaps(self.store, dest.week, dest.class, period, day, teacher_id).is_empty()
            {
                continue;
            }
            let ops = vec![PlanOperation::Place {
                slot: dest,
                cell: placed.relocated(&dest),
            }];
            let description = format!(
                "Place {} in class {} at {} instead",
                placed.subject,
                target.class,
                slot_label(&dest)
            );
            out.push((PlanFamily::RelocateNew, ops, description));
        }
    }

    /// Simulates a plan on a cloned store and scores it.
    fn score(&self, family: PlanFamily, operations: Vec<PlanOperation>, description: String) -> Plan {
        let mut plan = Plan {
            family,
            operations,
            score: 0,
            residual_overlaps: 0,
            residual_mismatches: 0,
            warnings: Vec::new(),
            description,
            revision: self.revision,
        };

        let mut sim = self.store.clone();
        if let Err(e) = plan.apply_to(&mut sim) {
            // Generated against this very store, so every slot exists.
            debug!("planner: simulation failed: {e}");
        }

        for slot in plan.changed_slots() {
            let Some(cell) = sim.cell(&slot) else {
                continue;
            };
            if let Some(teacher_id) = cell.teacher_id.as_deref().filter(|_| cell.is_special()) {
                plan.residual_overlaps +=
                    find_overlaps(&sim, slot.week, slot.class, slot.period, slot.day, teacher_id)
                        .len();
            }
            if self.classifier.is_mismatched(&slot, cell) {
                plan.residual_mismatches += 1;
            }
        }

        let w: &PlanWeights = &self.config.plan_weights;
        plan.score = w.operation * plan.operations.len() as i64
            + w.overlap * plan.residual_overlaps as i64
            + w.mismatch * plan.residual_mismatches as i64
            + if plan.is_forced() { w.forced } else { 0 };

        if plan.residual_overlaps > 0 {
            plan.warnings.push(format!(
                "{} overlapping assignment(s) remain",
                plan.residual_overlaps
            ));
        }
        if plan.residual_mismatches > 0 {
            plan.warnings.push(format!(
                "{} slot(s) deviate from their intended placement",
                plan.residual_mismatches
            ));
        }
        if plan.is_forced() {
            plan.warnings
                .push("Applied as a forced conflict: the teacher stays double-booked".into());
        }
        plan
    }
}
