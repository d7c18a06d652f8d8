//! Bulk edits: holidays, future-week propagation and template application.
//!
//! Each operation builds the next store on a clone and commits once, so a
//! whole bulk edit is a single undo step.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::TimetableEngine;
use crate::error::{Result, TimetableError};
use crate::models::{Cell, ChangeKind, Slot, DAY_COUNT, DAY_NAMES, PERIOD_COUNT};
use crate::validation::find_template_conflicts;

/// Result of copying a class grid into later weeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PropagationSummary {
    /// Weeks that received the grid.
    pub weeks: usize,
    /// Cells overwritten across those weeks.
    pub cells: usize,
}

fn day_list(days: &[usize]) -> String {
    days.iter()
        .filter_map(|&d| DAY_NAMES.get(d).copied())
        .collect::<Vec<_>>()
        .join(", ")
}

fn check_days(days: &[usize]) -> Result<()> {
    match days.iter().find(|&&d| d >= DAY_COUNT) {
        Some(&day) => Err(TimetableError::SlotOutOfRange { period: 0, day }),
        None => Ok(()),
    }
}

impl TimetableEngine {
    /// Turns every cell of the given days into a holiday, across all
    /// classes and periods of the week. Returns the number of cells changed.
    pub fn apply_holiday(&mut self, week: u32, days: &[usize]) -> Result<usize> {
        check_days(days)?;
        let classes: Vec<u32> = self
            .store
            .week(week)
            .ok_or(TimetableError::UnknownWeek(week))?
            .class_numbers()
            .collect();

        let mut next = self.store.clone();
        let mut changed = 0;
        for &class in &classes {
            for period in 0..PERIOD_COUNT {
                for &day in days {
                    let slot = Slot::new(week, class, period, day);
                    if next.require_cell(&slot)?.is_holiday() {
                        continue;
                    }
                    next.set_cell(&slot, Cell::holiday(&slot))?;
                    changed += 1;
                }
            }
        }
        if changed > 0 {
            let summary = format!("Week {week} holiday: {}", day_list(days));
            self.commit(next, ChangeKind::HolidayApply, summary, [week]);
        }
        Ok(changed)
    }

    /// Restores every holiday cell of the given days to its expected cell
    /// (template, else baseline, else empty). Returns the number restored.
    ///
    /// Holiday cells are identified by type, never by subject text.
    pub fn clear_holiday(&mut self, week: u32, days: &[usize]) -> Result<usize> {
        check_days(days)?;
        let classes: Vec<u32> = self
            .store
            .week(week)
            .ok_or(TimetableError::UnknownWeek(week))?
            .class_numbers()
            .collect();

        let classifier = self.classifier();
        let mut next = self.store.clone();
        let mut restored = 0;
        for &class in &classes {
            for period in 0..PERIOD_COUNT {
                for &day in days {
                    let slot = Slot::new(week, class, period, day);
                    if !next.require_cell(&slot)?.is_holiday() {
                        continue;
                    }
                    next.set_cell(&slot, classifier.expected_cell(&slot))?;
                    restored += 1;
                }
            }
        }
        if restored > 0 {
            let summary = format!("Week {week} holiday cleared: {}", day_list(days));
            self.commit(next, ChangeKind::HolidayClear, summary, [week]);
        }
        Ok(restored)
    }

    /// Overwrites `class`'s grid in every week after `week` with its grid
    /// in `week`. Holiday cells on either side are preserved.
    pub fn copy_class_to_future_weeks(&mut self, week: u32, class: u32) -> Result<PropagationSummary> {
        let source = self
            .store
            .class_grid(week, class)
            .ok_or_else(|| match self.store.week(week) {
                None => TimetableError::UnknownWeek(week),
                Some(_) => TimetableError::UnknownClass { week, class },
            })?
            .clone();

        let later: Vec<u32> = self.store.week_keys().filter(|&w| w > week).collect();
        let mut next = self.store.clone();
        let mut summary = PropagationSummary::default();
        for target_week in later {
            if next.class_grid(target_week, class).is_none() {
                continue;
            }
            let mut touched = 0;
            for (period, day, cell) in source.iter() {
                if cell.is_holiday() {
                    continue;
                }
                let slot = Slot::new(target_week, class, period, day);
                let current = next.require_cell(&slot)?;
                if current.is_holiday() || same_content(current, cell) {
                    continue;
                }
                next.set_cell(&slot, cell.clone())?;
                touched += 1;
            }
            if touched > 0 {
                summary.weeks += 1;
                summary.cells += touched;
            }
        }

        if summary.cells > 0 {
            let text = format!(
                "{} week {week} copied to {} later week(s)",
                self.config.class_label(class),
                summary.weeks
            );
            let weeks: Vec<u32> = self.store.week_keys().filter(|&w| w > week).collect();
            self.commit(next, ChangeKind::Propagate, text, weeks);
        }
        Ok(summary)
    }

    /// Applies a teacher's placement template to the given weeks.
    ///
    /// Places a specialist cell at every template position (skipping
    /// holidays and classes outside the current class count) and clears the
    /// teacher's cells that the template does not address. Returns the
    /// number of template cells placed.
    pub fn apply_template(&mut self, teacher_id: &str, weeks: &[u32]) -> Result<usize> {
        let teacher = self.registry.require(teacher_id)?.clone();
        let template = self
            .registry
            .template(teacher_id)
            .ok_or_else(|| TimetableError::NoTemplate(teacher_id.to_string()))?
            .clone();
        for &week in weeks {
            if self.store.week(week).is_none() {
                return Err(TimetableError::UnknownWeek(week));
            }
        }

        for conflict in find_template_conflicts(&self.registry)
            .iter()
            .filter(|c| c.teacher_ids.iter().any(|id| id == teacher_id))
        {
            warn!("template: {conflict}");
        }

        let mut next = self.store.clone();
        let mut placed = 0;
        let mut cleared = 0;
        for &week in weeks {
            let stale: Vec<Slot> = next
                .iter_cells()
                .filter(|(slot, cell)| {
                    slot.week == week
                        && cell.is_taught_by(teacher_id)
                        && template
                            .entry(slot.period, slot.day)
                            .and_then(|e| e.class)
                            != Some(slot.class)
                })
                .map(|(slot, _)| slot)
                .collect();
            for slot in stale {
                next.set_cell(&slot, Cell::empty(&slot))?;
                cleared += 1;
            }

            for (period, day, entry) in template.assigned() {
                let Some(class) = entry.class else { continue };
                let slot = Slot::new(week, class, period, day);
                let Some(current) = next.cell(&slot) else {
                    continue;
                };
                if current.is_holiday() {
                    continue;
                }
                let location = self.config.normalize_location(Some(entry.location.as_str()));
                next.set_cell(&slot, Cell::special(&slot, &teacher, Some(location)))?;
                placed += 1;
            }
        }

        info!(
            "template: {} placed {placed}, cleared {cleared} across {} week(s)",
            teacher.name,
            weeks.len()
        );
        if placed + cleared > 0 {
            let summary = format!("{} template applied", teacher.name);
            self.commit(next, ChangeKind::ApplyTemplate, summary, weeks.iter().copied());
        }
        Ok(placed)
    }
}

/// Same lesson ignoring the slot-derived id.
fn same_content(a: &Cell, b: &Cell) -> bool {
    a.subject == b.subject
        && a.cell_type == b.cell_type
        && a.teacher_id == b.teacher_id
        && a.teacher == b.teacher
        && a.location == b.location
        && a.forced_conflict == b.forced_conflict
}
