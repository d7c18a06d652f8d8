//! Plan and operation types.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Cell, ScheduleStore, Slot, DAY_NAMES};

/// Short human label for a slot position, e.g. `"Tue P3"`.
pub fn slot_label(slot: &Slot) -> String {
    let day = DAY_NAMES.get(slot.day).copied().unwrap_or("?");
    format!("{day} P{}", slot.period + 1)
}

/// Plan family, in the order they are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanFamily {
    /// Move the conflicting class's lesson away, then place the new one.
    RelocateBlocker,
    /// Place the new lesson in a different free slot of the same class.
    RelocateNew,
    /// Place the new lesson anyway, flagged as a forced conflict.
    ForcedApply,
}

/// A single mutation inside a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PlanOperation {
    /// Exchange the cells at two slots.
    Swap {
        from: Slot,
        to: Slot,
        /// Flag every specialist cell involved as a forced conflict.
        forced: bool,
    },
    /// Overwrite the cell at a slot.
    Place { slot: Slot, cell: Cell },
}

impl PlanOperation {
    /// Applies the operation to a store.
    pub fn apply(&self, store: &mut ScheduleStore) -> Result<()> {
        match self {
            PlanOperation::Swap { from, to, forced } => swap_cells(store, from, to, *forced),
            PlanOperation::Place { slot, cell } => store.set_cell(slot, cell.clone()).map(|_| ()),
        }
    }

    /// Slots written by the operation.
    pub fn touched(&self) -> Vec<Slot> {
        match self {
            PlanOperation::Swap { from, to, .. } => vec![*from, *to],
            PlanOperation::Place { slot, .. } => vec![*slot],
        }
    }
}

/// Exchanges the cells at `a` and `b`.
///
/// With `forced`, every specialist cell in the resulting placement is
/// flagged `forced_conflict`. Otherwise flags travel with their cells.
pub fn swap_cells(store: &mut ScheduleStore, a: &Slot, b: &Slot, forced: bool) -> Result<()> {
    let mut cell_a = store.require_cell(a)?.clone();
    let mut cell_b = store.require_cell(b)?.clone();
    if forced {
        for cell in [&mut cell_a, &mut cell_b] {
            if cell.is_special() {
                cell.forced_conflict = true;
            }
        }
    }
    store.set_cell(a, cell_b)?;
    store.set_cell(b, cell_a)?;
    Ok(())
}

/// A ranked corrective operation sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Generating family.
    pub family: PlanFamily,
    /// Operations applied in order.
    pub operations: Vec<PlanOperation>,
    /// Ranking score; lower is better.
    pub score: i64,
    /// Overlaps left among changed slots after simulation.
    pub residual_overlaps: usize,
    /// Mismatches left among changed slots after simulation.
    pub residual_mismatches: usize,
    /// Human-readable notices for the user.
    pub warnings: Vec<String>,
    /// One-line summary.
    pub description: String,
    /// Engine revision the plan was computed against.
    pub revision: u64,
}

impl Plan {
    /// Whether this is the forced-apply fallback.
    #[inline]
    pub fn is_forced(&self) -> bool {
        self.family == PlanFamily::ForcedApply
    }

    /// Every slot written by the plan, deduplicated, in first-touch order.
    pub fn changed_slots(&self) -> Vec<Slot> {
        let mut out: Vec<Slot> = Vec::new();
        for slot in self.operations.iter().flat_map(PlanOperation::touched) {
            if !out.contains(&slot) {
                out.push(slot);
            }
        }
        out
    }

    /// Weeks touched by the plan.
    pub fn weeks(&self) -> Vec<u32> {
        let mut weeks: Vec<u32> = self.changed_slots().iter().map(|s| s.week).collect();
        weeks.sort_unstable();
        weeks.dedup();
        weeks
    }

    /// Applies every operation to `store`.
    pub fn apply_to(&self, store: &mut ScheduleStore) -> Result<()> {
        for op in &self.operations {
            op.apply(store)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Teacher;

    #[test]
    fn test_slot_label() {
        assert_eq!(slot_label(&Slot::new(1, 1, 2, 1)), "Tue P3");
    }

    #[test]
    fn test_swap_cells_forced_flags_specialists_only() {
        let t = Teacher::new("T1", "Kim", "체육");
        let mut store = ScheduleStore::filled(1, 1, |s| Cell::homeroom(s, "국어"));
        let a = Slot::new(1, 1, 0, 0);
        let b = Slot::new(1, 1, 1, 1);
        store.set_cell(&a, Cell::special(&a, &t, None)).unwrap();

        swap_cells(&mut store, &a, &b, true).unwrap();
        let moved = store.cell(&b).unwrap();
        assert!(moved.is_taught_by("T1"));
        assert!(moved.forced_conflict);
        assert_eq!(moved.id, b.cell_id());
        let back = store.cell(&a).unwrap();
        assert_eq!(back.subject, "국어");
        assert!(!back.forced_conflict);
    }

    #[test]
    fn test_changed_slots_dedup() {
        let a = Slot::new(1, 1, 0, 0);
        let b = Slot::new(1, 1, 1, 0);
        let plan = Plan {
            family: PlanFamily::RelocateBlocker,
            operations: vec![
                PlanOperation::Swap {
                    from: a,
                    to: b,
                    forced: false,
                },
                PlanOperation::Place {
                    slot: a,
                    cell: Cell::empty(&a),
                },
            ],
            score: 0,
            residual_overlaps: 0,
            residual_mismatches: 0,
            warnings: Vec::new(),
            description: String::new(),
            revision: 0,
        };
        assert_eq!(plan.changed_slots(), vec![a, b]);
        assert_eq!(plan.weeks(), vec![1]);
    }
}
