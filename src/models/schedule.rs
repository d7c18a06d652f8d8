//! Schedule store model.
//!
//! The canonical timetable: `week → class → period×day grid of cells`.
//!
//! # Copy-on-write
//! Weeks and class grids are held behind [`Arc`]. Cloning a store is cheap
//! and shares every grid; a write copies only the week map entry and the
//! class grid it touches (`Arc::make_mut`). Snapshots held elsewhere (undo
//! stack, baseline, planner simulations) are therefore never mutated
//! retroactively.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{grid_positions, Cell, Slot, DAY_COUNT, PERIOD_COUNT};
use crate::error::{Result, TimetableError};

/// One class's weekly grid, indexed `[period][day]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassGrid {
    cells: [[Cell; DAY_COUNT]; PERIOD_COUNT],
}

impl ClassGrid {
    /// Builds a grid by calling `fill` for every position.
    pub fn from_fn(mut fill: impl FnMut(usize, usize) -> Cell) -> Self {
        Self {
            cells: std::array::from_fn(|p| std::array::from_fn(|d| fill(p, d))),
        }
    }

    /// A grid of empty cells for `(week, class)`.
    pub fn empty(week: u32, class: u32) -> Self {
        Self::from_fn(|p, d| Cell::empty(&Slot::new(week, class, p, d)))
    }

    /// Cell at a position.
    pub fn get(&self, period: usize, day: usize) -> Option<&Cell> {
        self.cells.get(period).and_then(|row| row.get(day))
    }

    fn get_mut(&mut self, period: usize, day: usize) -> Option<&mut Cell> {
        self.cells.get_mut(period).and_then(|row| row.get_mut(day))
    }

    /// Iterates `(period, day, cell)` row-major.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &Cell)> {
        grid_positions().map(move |(p, d)| (p, d, &self.cells[p][d]))
    }

    /// Re-identifies every cell for `(week, class)`.
    pub fn relocated(&self, week: u32, class: u32) -> Self {
        Self::from_fn(|p, d| self.cells[p][d].relocated(&Slot::new(week, class, p, d)))
    }
}

/// All class grids of one week, keyed by class number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeekSchedule {
    classes: BTreeMap<u32, Arc<ClassGrid>>,
}

impl WeekSchedule {
    /// Grid for a class.
    pub fn class(&self, class: u32) -> Option<&ClassGrid> {
        self.classes.get(&class).map(Arc::as_ref)
    }

    /// Class numbers in ascending order.
    pub fn class_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.classes.keys().copied()
    }

    /// Iterates `(class, grid)`.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &ClassGrid)> {
        self.classes.iter().map(|(&c, g)| (c, g.as_ref()))
    }
}

/// The canonical schedule store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleStore {
    weeks: BTreeMap<u32, Arc<WeekSchedule>>,
}

impl ScheduleStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a total store for weeks `1..=week_count` and classes
    /// `1..=class_count`, calling `fill` for every slot.
    pub fn filled(week_count: u32, class_count: u32, mut fill: impl FnMut(&Slot) -> Cell) -> Self {
        let mut store = Self::new();
        for week in 1..=week_count {
            for class in 1..=class_count {
                let grid = ClassGrid::from_fn(|p, d| fill(&Slot::new(week, class, p, d)));
                store.set_class_grid(week, class, grid);
            }
        }
        store
    }

    /// Week keys in ascending order.
    pub fn week_keys(&self) -> impl Iterator<Item = u32> + '_ {
        self.weeks.keys().copied()
    }

    /// Number of weeks.
    pub fn week_count(&self) -> usize {
        self.weeks.len()
    }

    /// A week's schedule.
    pub fn week(&self, week: u32) -> Option<&WeekSchedule> {
        self.weeks.get(&week).map(Arc::as_ref)
    }

    /// A class grid.
    pub fn class_grid(&self, week: u32, class: u32) -> Option<&ClassGrid> {
        self.week(week).and_then(|w| w.class(class))
    }

    /// Cell at a slot.
    pub fn cell(&self, slot: &Slot) -> Option<&Cell> {
        self.class_grid(slot.week, slot.class)
            .and_then(|g| g.get(slot.period, slot.day))
    }

    /// Cell at a slot, failing with a typed error when absent.
    pub fn require_cell(&self, slot: &Slot) -> Result<&Cell> {
        if !slot.in_grid() {
            return Err(TimetableError::SlotOutOfRange {
                period: slot.period,
                day: slot.day,
            });
        }
        let week = self
            .week(slot.week)
            .ok_or(TimetableError::UnknownWeek(slot.week))?;
        let grid = week.class(slot.class).ok_or(TimetableError::UnknownClass {
            week: slot.week,
            class: slot.class,
        })?;
        grid.get(slot.period, slot.day)
            .ok_or(TimetableError::SlotOutOfRange {
                period: slot.period,
                day: slot.day,
            })
    }

    /// Iterates `(class, cell)` for every class at one week/period/day.
    pub fn cells_at(
        &self,
        week: u32,
        period: usize,
        day: usize,
    ) -> impl Iterator<Item = (u32, &Cell)> {
        self.week(week)
            .into_iter()
            .flat_map(|w| w.iter())
            .filter_map(move |(class, grid)| grid.get(period, day).map(|c| (class, c)))
    }

    /// Replaces the cell at `slot`, copying only the path being written.
    ///
    /// The cell is re-identified for the slot. Returns the previous cell.
    pub fn set_cell(&mut self, slot: &Slot, cell: Cell) -> Result<Cell> {
        self.require_cell(slot)?;
        let week = Arc::make_mut(
            self.weeks
                .get_mut(&slot.week)
                .ok_or(TimetableError::UnknownWeek(slot.week))?,
        );
        let grid = Arc::make_mut(week.classes.get_mut(&slot.class).ok_or(
            TimetableError::UnknownClass {
                week: slot.week,
                class: slot.class,
            },
        )?);
        let target = grid
            .get_mut(slot.period, slot.day)
            .ok_or(TimetableError::SlotOutOfRange {
                period: slot.period,
                day: slot.day,
            })?;
        Ok(std::mem::replace(target, cell.relocated(slot)))
    }

    /// Inserts or replaces a whole class grid, creating the week if needed.
    pub fn set_class_grid(&mut self, week: u32, class: u32, grid: ClassGrid) {
        let entry = self.weeks.entry(week).or_default();
        Arc::make_mut(entry)
            .classes
            .insert(class, Arc::new(grid.relocated(week, class)));
    }

    /// Removes every class above `class_count` from every week.
    ///
    /// Weeks that contain no such class are left untouched (still shared).
    pub fn truncate_classes(&mut self, class_count: u32) -> usize {
        let mut removed = 0;
        for week in self.weeks.values_mut() {
            if week.classes.keys().all(|&c| c <= class_count) {
                continue;
            }
            let week = Arc::make_mut(week);
            let before = week.classes.len();
            week.classes.retain(|&c, _| c <= class_count);
            removed += before - week.classes.len();
        }
        removed
    }

    /// Whether two stores share the same grid allocation for a class.
    ///
    /// Used to verify copy-on-write isolation.
    pub fn shares_grid_with(&self, other: &ScheduleStore, week: u32, class: u32) -> bool {
        match (
            self.weeks.get(&week).and_then(|w| w.classes.get(&class)),
            other.weeks.get(&week).and_then(|w| w.classes.get(&class)),
        ) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Iterates every `(slot, cell)` in the store.
    pub fn iter_cells(&self) -> impl Iterator<Item = (Slot, &Cell)> {
        self.weeks.iter().flat_map(|(&week, w)| {
            w.iter().flat_map(move |(class, grid)| {
                grid.iter()
                    .map(move |(p, d, cell)| (Slot::new(week, class, p, d), cell))
            })
        })
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.weeks
            .values()
            .map(|w| w.classes.len() * PERIOD_COUNT * DAY_COUNT)
            .sum()
    }
}
