//! Template/baseline mismatch classification.
//!
//! Decides whether a cell deviates from its intended placement. The
//! intended placement comes from the teachers' placement templates when
//! any are configured, otherwise from the baseline snapshot.
//!
//! # Rules (evaluated in order)
//! 1. Holiday cells are never mismatched on subject grounds, but are
//!    flagged when they displace an original specialist placement.
//! 2. Homeroom cells with a flex subject are exempt from template
//!    comparison, with the same original-placement check.
//! 3. A slot resolved to exactly one template teacher must hold that
//!    teacher's special cell with the same subject and normalized location.
//! 4. A slot claimed by two or more templates is always mismatched.
//! 5. Without templates, the cell's specialist identity is compared with
//!    the baseline; a specialist where the baseline had none is a
//!    fabricated assignment.
//!
//! The result is advisory: it never blocks a mutation.

use crate::config::EngineConfig;
use crate::models::{Cell, CellType, ScheduleStore, Slot, TeacherRegistry, TemplateResolution};

/// Classifies cells against templates and the baseline snapshot.
#[derive(Debug, Clone, Copy)]
pub struct MismatchClassifier<'a> {
    registry: &'a TeacherRegistry,
    baseline: Option<&'a ScheduleStore>,
    config: &'a EngineConfig,
}

impl<'a> MismatchClassifier<'a> {
    /// Creates a classifier. `baseline` is `None` until one is captured.
    pub fn new(
        registry: &'a TeacherRegistry,
        baseline: Option<&'a ScheduleStore>,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            registry,
            baseline,
            config,
        }
    }

    /// Whether `actual` deviates from the intended placement at `slot`.
    pub fn is_mismatched(&self, slot: &Slot, actual: &Cell) -> bool {
        if actual.is_holiday() || self.is_flex_homeroom(actual) {
            return self.displaces_original(slot, actual);
        }

        if !self.registry.has_templates() {
            return self.differs_from_baseline(slot, actual);
        }

        match self.registry.resolve(slot.class, slot.period, slot.day) {
            TemplateResolution::Unique { teacher, location } => {
                !(actual.is_taught_by(&teacher.id)
                    && actual.subject == teacher.subject
                    && self.same_location(actual.location.as_deref(), location))
            }
            TemplateResolution::Ambiguous(_) => true,
            TemplateResolution::Unassigned => {
                if actual.is_special() && self.teacher_has_template(actual.teacher_id.as_deref()) {
                    // Templated teacher placed somewhere the template does not put them.
                    return true;
                }
                self.differs_from_baseline(slot, actual)
            }
        }
    }

    /// The cell the slot is expected to hold: template-derived if a
    /// template addresses it, else the baseline cell, else empty.
    ///
    /// Used to restore cleared holidays. Never returns a holiday cell.
    pub fn expected_cell(&self, slot: &Slot) -> Cell {
        if self.registry.has_templates() {
            if let TemplateResolution::Unique { teacher, location } =
                self.registry.resolve(slot.class, slot.period, slot.day)
            {
                let location = self.config.normalize_location(Some(location));
                return Cell::special(slot, teacher, Some(location));
            }
        }
        match self.baseline_cell(slot) {
            Some(cell) if self.is_restorable(slot, cell) => cell.relocated(slot),
            _ => Cell::empty(slot),
        }
    }

    fn is_flex_homeroom(&self, cell: &Cell) -> bool {
        cell.cell_type == CellType::Homeroom && self.config.is_flex_subject(&cell.subject)
    }

    fn same_location(&self, actual: Option<&str>, expected: &str) -> bool {
        self.config.normalize_location(actual) == self.config.normalize_location(Some(expected))
    }

    fn teacher_has_template(&self, teacher_id: Option<&str>) -> bool {
        teacher_id
            .and_then(|id| self.registry.template(id))
            .is_some_and(|t| !t.is_blank())
    }

    fn baseline_cell(&self, slot: &Slot) -> Option<&'a Cell> {
        self.baseline.and_then(|b| b.cell(slot))
    }

    /// Baseline specialist at the slot that still counts as an original
    /// placement. With templates configured, specialists whose teacher now
    /// has a template are superseded by that template.
    fn baseline_specialist(&self, slot: &Slot) -> Option<&'a Cell> {
        let cell = self.baseline_cell(slot).filter(|c| c.is_special())?;
        if self.registry.has_templates() && self.teacher_has_template(cell.teacher_id.as_deref()) {
            return None;
        }
        Some(cell)
    }

    /// Original-placement check for exempt cells.
    fn displaces_original(&self, slot: &Slot, actual: &Cell) -> bool {
        if self.registry.has_templates() {
            match self.registry.resolve(slot.class, slot.period, slot.day) {
                TemplateResolution::Unique { teacher, .. } => {
                    return !actual.is_taught_by(&teacher.id)
                }
                TemplateResolution::Ambiguous(_) => return true,
                TemplateResolution::Unassigned => {}
            }
        }
        match self.baseline_specialist(slot) {
            Some(original) => original.teacher_key() != actual.teacher_key(),
            None => false,
        }
    }

    fn differs_from_baseline(&self, slot: &Slot, actual: &Cell) -> bool {
        if self.baseline.is_none() {
            return false;
        }
        match self.baseline_specialist(slot) {
            Some(original) => {
                original.teacher_key() != actual.teacher_key() || original.subject != actual.subject
            }
            None => actual.is_special(),
        }
    }

    fn is_restorable(&self, slot: &Slot, cell: &Cell) -> bool {
        if cell.is_holiday() {
            return false;
        }
        if !cell.is_special() {
            return true;
        }
        let Some(teacher) = cell.teacher_id.as_deref().and_then(|id| self.registry.get(id)) else {
            return false;
        };
        teacher.allows_class(slot.class)
            && !(self.registry.has_templates() && self.teacher_has_template(Some(&teacher.id)))
    }
}
