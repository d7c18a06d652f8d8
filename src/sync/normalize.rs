//! Conversion between the engine state and wire snapshots.
//!
//! Inbound snapshots are normalized field by field: absent fields keep the
//! current in-memory value, grids are reshaped to exactly
//! `class_count × 6 × 5`, and cells that contradict the registry are
//! repaired. Every repair is logged with `warn!` and counted.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::snapshot::{RawCell, RawSchedules, RawTeacher, RawTemplateEntry, Snapshot};
use crate::engine::TimetableEngine;
use crate::models::{
    grid_positions, Cell, ClassGrid, PlacementTemplate, ScheduleStore, Slot, Teacher,
    TeacherRegistry, TemplateEntry,
};
use crate::validation::validate_schedule;

/// What normalization had to fix in an inbound snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeReport {
    /// Cells whose content was changed (demoted or retyped).
    pub repaired_cells: usize,
    /// Cells missing from the wire grid and created empty.
    pub fabricated_cells: usize,
    /// Teachers skipped for lacking an id or duplicating one.
    pub dropped_teachers: usize,
    /// Template entries naming an unknown or disallowed class.
    pub dropped_template_entries: usize,
    /// Week keys that are not numbers in `1..=week_count`.
    pub dropped_weeks: usize,
}

impl NormalizeReport {
    /// Whether anything was repaired or dropped.
    pub fn has_repairs(&self) -> bool {
        *self != Self::default()
    }
}

impl TimetableEngine {
    /// Captures the whole shared state as a snapshot.
    pub fn to_snapshot(&self) -> Snapshot {
        let mut schedules = RawSchedules::new();
        for week in self.store.week_keys() {
            let Some(schedule) = self.store.week(week) else {
                continue;
            };
            let classes = schedule
                .iter()
                .map(|(class, grid)| {
                    let mut rows: Vec<Vec<RawCell>> = Vec::new();
                    for (period, _, cell) in grid.iter() {
                        if rows.len() <= period {
                            rows.push(Vec::new());
                        }
                        rows[period].push(RawCell::from(cell));
                    }
                    (self.config.class_label(class), rows)
                })
                .collect();
            schedules.insert(week.to_string(), classes);
        }

        let teachers = self
            .registry
            .teachers()
            .iter()
            .map(|t| RawTeacher {
                id: Some(t.id.clone()),
                name: Some(t.name.clone()),
                subject: Some(t.subject.clone()),
                classes: t.classes.iter().map(|&c| self.config.class_label(c)).collect(),
                restricted: t.is_locked_out().then_some(true),
            })
            .collect();

        let templates = self
            .registry
            .templates()
            .iter()
            .map(|(id, template)| {
                let rows = (0..crate::models::PERIOD_COUNT)
                    .map(|p| {
                        (0..crate::models::DAY_COUNT)
                            .map(|d| {
                                template
                                    .entry(p, d)
                                    .map(|e| {
                                        RawTemplateEntry::from_entry(e, |c| {
                                            self.config.class_label(c)
                                        })
                                    })
                                    .unwrap_or_default()
                            })
                            .collect()
                    })
                    .collect();
                (id.clone(), rows)
            })
            .collect();

        Snapshot {
            class_count: Some(self.class_count),
            subject_list: Some(self.subjects.clone()),
            all_schedules: Some(schedules),
            standard_hours: Some(self.standard_hours.clone()),
            teacher_configs: Some(teachers),
            special_templates: Some(templates),
            change_logs: Some(self.history.log().cloned().collect()),
            weekly_notices: Some(
                self.weekly_notices
                    .iter()
                    .map(|(w, text)| (w.to_string(), text.clone()))
                    .collect(),
            ),
        }
    }

    /// Replaces the whole state with a normalized snapshot.
    ///
    /// Not a commit: undo/redo stacks are dropped because they describe a
    /// state that no longer exists. The baseline is captured if absent.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) -> NormalizeReport {
        let mut report = NormalizeReport::default();

        let class_count = snapshot
            .class_count
            .filter(|&n| n > 0)
            .unwrap_or(self.class_count);

        let subjects = snapshot
            .subject_list
            .map(clean_subjects)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.subjects.clone());

        let teachers_replaced = snapshot.teacher_configs.is_some();
        let mut registry = match snapshot.teacher_configs {
            Some(raw) => self.registry_from_raw(raw, class_count, &mut report),
            None => {
                let mut registry = self.registry.clone();
                registry.clip_classes(class_count);
                registry
            }
        };

        match snapshot.special_templates {
            Some(raw) => {
                let stale: Vec<String> = registry.templates().keys().cloned().collect();
                for id in stale {
                    registry.clear_template(&id);
                }
                for (teacher_id, rows) in raw {
                    let template = self.template_from_raw(
                        &teacher_id,
                        &rows,
                        class_count,
                        &registry,
                        &mut report,
                    );
                    if let Some(template) = template {
                        store_template(&mut registry, &teacher_id, template);
                    }
                }
            }
            None if teachers_replaced => {
                for (teacher_id, template) in self.registry.templates() {
                    let Some(teacher) = registry.get(teacher_id) else {
                        continue;
                    };
                    let mut template = template.clone();
                    let allowed = teacher.clone();
                    template.retain_classes(|c| c <= class_count && allowed.allows_class(c));
                    store_template(&mut registry, teacher_id, template);
                }
            }
            None => {}
        }

        let store = match snapshot.all_schedules {
            Some(raw) => self.store_from_raw(&raw, class_count, &registry, &mut report),
            None => self.reshaped_store(class_count),
        };

        if let Some(hours) = snapshot.standard_hours {
            self.standard_hours = hours
                .into_iter()
                .filter(|(subject, h)| !subject.trim().is_empty() && h.is_finite() && *h >= 0.0)
                .collect();
        }
        if let Some(notices) = snapshot.weekly_notices {
            self.weekly_notices = notices
                .into_iter()
                .filter_map(|(week, text)| week.trim().parse::<u32>().ok().map(|w| (w, text)))
                .filter(|(_, text)| !text.trim().is_empty())
                .collect();
        }
        if let Some(logs) = snapshot.change_logs {
            self.history.replace_log(logs);
        }

        if let Err(errors) = validate_schedule(&store, &registry) {
            for error in &errors {
                warn!("snapshot: {}", error.message);
            }
        }
        if report.has_repairs() {
            warn!("snapshot: normalization repaired {report:?}");
        }

        self.class_count = class_count;
        self.subjects = subjects;
        self.registry = registry;
        self.store = store;
        self.history.clear_stacks();
        self.capture_baseline();
        self.touch();
        info!(
            "snapshot: applied ({} classes, {} weeks, {} teachers)",
            self.class_count,
            self.store.week_count(),
            self.registry.len()
        );
        report
    }

    fn registry_from_raw(
        &self,
        raw: Vec<RawTeacher>,
        class_count: u32,
        report: &mut NormalizeReport,
    ) -> TeacherRegistry {
        let mut teachers: Vec<Teacher> = Vec::new();
        for item in raw {
            let Some(id) = item.id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
            else {
                warn!("snapshot: dropping teacher without id");
                report.dropped_teachers += 1;
                continue;
            };
            if teachers.iter().any(|t| t.id == id) {
                warn!("snapshot: dropping duplicate teacher '{id}'");
                report.dropped_teachers += 1;
                continue;
            }
            let name = item
                .name
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| id.clone());
            let subject = item.subject.map(|s| s.trim().to_string()).unwrap_or_default();
            let teacher = Teacher::new(id, name, subject);
            // A listed set clipped to nothing still restricts.
            let restricted = !item.classes.is_empty() || item.restricted == Some(true);
            let teacher = if restricted {
                let classes = item
                    .classes
                    .iter()
                    .filter_map(|label| self.config.parse_class_label(label))
                    .filter(|&c| c <= class_count);
                teacher.with_classes(classes)
            } else {
                teacher
            };
            teachers.push(teacher);
        }
        TeacherRegistry::from_teachers(teachers)
    }

    fn template_from_raw(
        &self,
        teacher_id: &str,
        rows: &[Vec<RawTemplateEntry>],
        class_count: u32,
        registry: &TeacherRegistry,
        report: &mut NormalizeReport,
    ) -> Option<PlacementTemplate> {
        let Some(teacher) = registry.get(teacher_id) else {
            warn!("snapshot: dropping template of unknown teacher '{teacher_id}'");
            return None;
        };
        let mut template = PlacementTemplate::new();
        for (period, day) in grid_positions() {
            let Some(raw) = rows.get(period).and_then(|r| r.get(day)) else {
                continue;
            };
            let Some(label) = raw.class_name.as_deref().filter(|l| !l.trim().is_empty()) else {
                continue;
            };
            match self.config.parse_class_label(label) {
                Some(class) if class <= class_count && teacher.allows_class(class) => {
                    let location = raw.location.clone().unwrap_or_default();
                    template.set(period, day, TemplateEntry::new(class, location));
                }
                _ => {
                    warn!("snapshot: template of '{teacher_id}' names unusable class '{label}'");
                    report.dropped_template_entries += 1;
                }
            }
        }
        Some(template)
    }

    fn store_from_raw(
        &self,
        raw: &RawSchedules,
        class_count: u32,
        registry: &TeacherRegistry,
        report: &mut NormalizeReport,
    ) -> ScheduleStore {
        let week_count = self.config.week_count;
        report.dropped_weeks += raw
            .keys()
            .filter(|k| {
                !k.trim()
                    .parse::<u32>()
                    .is_ok_and(|w| (1..=week_count).contains(&w))
            })
            .count();
        let by_week: BTreeMap<u32, &BTreeMap<String, Vec<Vec<RawCell>>>> = raw
            .iter()
            .filter_map(|(k, v)| k.trim().parse::<u32>().ok().map(|w| (w, v)))
            .collect();

        let mut store = ScheduleStore::new();
        for week in 1..=week_count {
            let classes = by_week.get(&week);
            for class in 1..=class_count {
                let rows = classes.and_then(|c| {
                    c.get(&self.config.class_label(class))
                        .or_else(|| c.get(&class.to_string()))
                });
                let grid = ClassGrid::from_fn(|period, day| {
                    let slot = Slot::new(week, class, period, day);
                    match rows.and_then(|r| r.get(period)).and_then(|r| r.get(day)) {
                        Some(cell) => self.normalize_cell(cell, &slot, registry, report),
                        None => {
                            report.fabricated_cells += 1;
                            Cell::empty(&slot)
                        }
                    }
                });
                store.set_class_grid(week, class, grid);
            }
        }
        store
    }

    /// Current store reshaped to `class_count`, used when the snapshot
    /// carries no schedules.
    fn reshaped_store(&self, class_count: u32) -> ScheduleStore {
        let mut store = self.store.clone();
        store.truncate_classes(class_count);
        let weeks: Vec<u32> = store.week_keys().collect();
        for week in weeks {
            for class in 1..=class_count {
                if store.class_grid(week, class).is_none() {
                    store.set_class_grid(week, class, ClassGrid::empty(week, class));
                }
            }
        }
        store
    }

    fn normalize_cell(
        &self,
        raw: &RawCell,
        slot: &Slot,
        registry: &TeacherRegistry,
        report: &mut NormalizeReport,
    ) -> Cell {
        let subject = raw.subject.as_deref().map(str::trim).unwrap_or("");
        let has_teacher = raw
            .teacher_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty());
        let kind = raw
            .cell_type
            .as_deref()
            .map(|t| t.trim().to_ascii_lowercase())
            .unwrap_or_default();

        match kind.as_str() {
            "holiday" => Cell::holiday(slot),
            "special" => self.special_cell(raw, slot, registry, report),
            // Legacy cells carry a teacher id but no type.
            "" if has_teacher => self.special_cell(raw, slot, registry, report),
            "" | "homeroom" => Cell::homeroom(slot, subject),
            "empty" => Cell::empty(slot),
            other => {
                warn!("snapshot: unknown cell type '{other}' at {}", slot.cell_id());
                report.repaired_cells += 1;
                Cell::homeroom(slot, subject)
            }
        }
    }

    fn special_cell(
        &self,
        raw: &RawCell,
        slot: &Slot,
        registry: &TeacherRegistry,
        report: &mut NormalizeReport,
    ) -> Cell {
        let subject = raw.subject.as_deref().map(str::trim).unwrap_or("");
        let forced = raw.forced_conflict.unwrap_or(false);
        let teacher = raw
            .teacher_id
            .as_deref()
            .map(str::trim)
            .and_then(|id| registry.get(id))
            .or_else(|| raw.teacher.as_deref().and_then(|n| registry.find_by_name(n.trim())));

        match teacher {
            Some(teacher) if forced || teacher.allows_class(slot.class) => {
                let location = raw
                    .location
                    .as_deref()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string);
                Cell::special(slot, teacher, location).with_forced_conflict(forced)
            }
            Some(teacher) => {
                warn!(
                    "snapshot: {} may not teach class {}, demoting {}",
                    teacher.name,
                    slot.class,
                    slot.cell_id()
                );
                report.repaired_cells += 1;
                Cell::homeroom(slot, subject)
            }
            None => {
                warn!(
                    "snapshot: unknown teacher {:?} at {}, demoting to homeroom",
                    raw.teacher_id,
                    slot.cell_id()
                );
                report.repaired_cells += 1;
                Cell::homeroom(slot, subject)
            }
        }
    }
}

fn clean_subjects(subjects: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for subject in subjects {
        let subject = subject.trim();
        if !subject.is_empty() && !out.iter().any(|s| s == subject) {
            out.push(subject.to_string());
        }
    }
    out
}

fn store_template(registry: &mut TeacherRegistry, teacher_id: &str, template: PlacementTemplate) {
    if let Err(e) = registry.set_template(teacher_id, template) {
        warn!("snapshot: dropping template of '{teacher_id}': {e}");
    }
}
