//! Configuration surface: teachers, templates, subjects, class count,
//! standard hours, weekly notices and regeneration.

use log::{info, warn};
use rand::Rng;
use std::collections::BTreeMap;

use super::{generate_schedule, TimetableEngine};
use crate::error::{Result, TimetableError};
use crate::models::{Cell, ChangeKind, ClassGrid, PlacementTemplate, Slot, Teacher};
use crate::validation::{find_template_conflicts, TemplateConflict};

impl TimetableEngine {
    /// Registers a new teacher.
    pub fn add_teacher(&mut self, teacher: Teacher) -> Result<()> {
        self.check_class_range(&teacher)?;
        info!("teacher: add {} ({})", teacher.name, teacher.subject);
        self.registry.add(teacher)?;
        self.touch();
        Ok(())
    }

    /// Replaces a teacher's details.
    ///
    /// Display names and subjects of the teacher's existing cells are
    /// refreshed through a commit; cells are not moved or removed.
    pub fn update_teacher(&mut self, teacher: Teacher) -> Result<()> {
        self.check_class_range(&teacher)?;
        let before = self.registry.clone();
        self.registry.update(teacher.clone())?;

        let mut next = self.store.clone();
        let mut refreshed = Vec::new();
        for (slot, cell) in self.store.iter_cells() {
            if !cell.is_taught_by(&teacher.id) {
                continue;
            }
            if cell.teacher.as_deref() == Some(teacher.name.as_str()) && cell.subject == teacher.subject {
                continue;
            }
            let cell = Cell::special(&slot, &teacher, cell.location.clone())
                .with_forced_conflict(cell.forced_conflict);
            next.set_cell(&slot, cell)?;
            refreshed.push(slot.week);
        }

        if refreshed.is_empty() {
            self.touch();
        } else {
            let summary = format!("{} details updated", teacher.name);
            self.commit_with_registry(
                next,
                before,
                self.class_count,
                ChangeKind::Custom("teacher_update".into()),
                summary,
                refreshed,
            );
        }
        Ok(())
    }

    /// Removes a teacher, their template and every lesson they hold.
    /// Returns the number of cells cleared.
    pub fn remove_teacher(&mut self, teacher_id: &str) -> Result<usize> {
        let before = self.registry.clone();
        let teacher = self.registry.remove(teacher_id)?;

        let mut next = self.store.clone();
        let mut weeks = Vec::new();
        for (slot, cell) in self.store.iter_cells() {
            if cell.is_taught_by(teacher_id) {
                next.set_cell(&slot, Cell::empty(&slot))?;
                weeks.push(slot.week);
            }
        }

        let cleared = weeks.len();
        info!("teacher: removed {} ({cleared} lessons cleared)", teacher.name);
        if cleared == 0 {
            self.touch();
        } else {
            let summary = format!("{} removed", teacher.name);
            self.commit_with_registry(
                next,
                before,
                self.class_count,
                ChangeKind::TeacherRemove,
                summary,
                weeks,
            );
        }
        Ok(cleared)
    }

    /// Stores a placement template for a teacher.
    ///
    /// Entries for classes the teacher may not teach are rejected.
    /// Authoring conflicts with other templates are allowed but returned
    /// and logged.
    pub fn set_template(
        &mut self,
        teacher_id: &str,
        template: PlacementTemplate,
    ) -> Result<Vec<TemplateConflict>> {
        self.registry.set_template(teacher_id, template)?;
        self.touch();

        let conflicts: Vec<TemplateConflict> = find_template_conflicts(&self.registry)
            .into_iter()
            .filter(|c| c.teacher_ids.iter().any(|id| id == teacher_id))
            .collect();
        for conflict in &conflicts {
            warn!("template authoring conflict: {conflict}");
        }
        Ok(conflicts)
    }

    /// Removes a teacher's template. Returns whether one existed.
    pub fn clear_template(&mut self, teacher_id: &str) -> bool {
        let removed = self.registry.clear_template(teacher_id);
        if removed {
            self.touch();
        }
        removed
    }

    /// Replaces the subject list. Blank and duplicate names are dropped.
    pub fn set_subjects(&mut self, subjects: impl IntoIterator<Item = String>) -> Result<()> {
        let mut cleaned: Vec<String> = Vec::new();
        for subject in subjects {
            let subject = subject.trim();
            if !subject.is_empty() && !cleaned.iter().any(|s| s == subject) {
                cleaned.push(subject.to_string());
            }
        }
        if cleaned.is_empty() {
            return Err(TimetableError::EmptySubject);
        }
        self.subjects = cleaned;
        self.touch();
        Ok(())
    }

    /// Changes the number of classes.
    ///
    /// Classes above `count` are dropped from every week, new classes get
    /// empty grids, and teacher class sets and template entries are
    /// clipped to the new range. A teacher clipped to no class is locked
    /// out until reassigned. Undo restores the grids and the unclipped
    /// registry together.
    pub fn set_class_count(&mut self, count: u32) -> Result<()> {
        if count == 0 {
            return Err(TimetableError::InvalidClassCount(count));
        }
        if count == self.class_count {
            return Ok(());
        }

        let mut next = self.store.clone();
        let removed = next.truncate_classes(count);
        let weeks: Vec<u32> = next.week_keys().collect();
        for &week in &weeks {
            for class in 1..=count {
                if next.class_grid(week, class).is_none() {
                    next.set_class_grid(week, class, ClassGrid::empty(week, class));
                }
            }
        }

        let before = self.registry.clone();
        self.registry.clip_classes(count);
        let previous_count = std::mem::replace(&mut self.class_count, count);
        let summary = format!("Class count {previous_count} → {count}");
        info!("classes: {summary} ({removed} grids dropped)");
        self.commit_with_registry(next, before, previous_count, ChangeKind::ClassCount, summary, weeks);
        Ok(())
    }

    /// Replaces the standard weekly hours per subject.
    pub fn set_standard_hours(&mut self, hours: BTreeMap<String, f64>) {
        self.standard_hours = hours
            .into_iter()
            .filter(|(subject, h)| !subject.trim().is_empty() && h.is_finite() && *h >= 0.0)
            .collect();
        self.touch();
    }

    /// Sets or clears (with blank text) the notice for a week.
    ///
    /// Notices are not part of the undo history.
    pub fn set_weekly_notice(&mut self, week: u32, text: impl Into<String>) -> Result<()> {
        if self.store.week(week).is_none() {
            return Err(TimetableError::UnknownWeek(week));
        }
        let text = text.into();
        if text.trim().is_empty() {
            self.weekly_notices.remove(&week);
        } else {
            self.weekly_notices.insert(week, text);
        }
        self.touch();
        Ok(())
    }

    /// Regenerates the whole schedule through the generator.
    pub fn regenerate<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let next = generate_schedule(
            self.class_count,
            &self.subjects,
            &self.registry,
            &self.config,
            rng,
        );
        let weeks: Vec<u32> = next.week_keys().collect();
        self.commit(next, ChangeKind::Regenerate, "Schedule regenerated", weeks);
        self.capture_baseline();
    }

    fn check_class_range(&self, teacher: &Teacher) -> Result<()> {
        match teacher
            .classes
            .iter()
            .find(|&&c| c == 0 || c > self.class_count)
        {
            Some(&class) => Err(TimetableError::ClassOutOfRange(class)),
            None => Ok(()),
        }
    }

    /// Slots in `week` where `teacher_id` currently teaches.
    pub fn lessons_of(&self, teacher_id: &str, week: u32) -> Vec<Slot> {
        self.store
            .iter_cells()
            .filter(|(slot, cell)| slot.week == week && cell.is_taught_by(teacher_id))
            .map(|(slot, _)| slot)
            .collect()
    }
}
