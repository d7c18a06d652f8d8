//! Teacher model and registry.
//!
//! The registry keeps teachers in insertion order together with each
//! teacher's optional [`PlacementTemplate`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{PlacementTemplate, TemplateResolution};
use crate::error::{Result, TimetableError};

/// A specialist teacher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    /// Unique teacher identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Subject this teacher teaches.
    pub subject: String,
    /// Class numbers this teacher may teach.
    pub classes: BTreeSet<u32>,
    /// Whether `classes` was ever set explicitly. An empty set is
    /// unrestricted only while this is false; a restricted set clipped to
    /// nothing allows no class.
    #[serde(default)]
    pub restricted: bool,
}

impl Teacher {
    /// Creates a teacher with no class restriction.
    pub fn new(id: impl Into<String>, name: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            subject: subject.into(),
            classes: BTreeSet::new(),
            restricted: false,
        }
    }

    /// Restricts the teacher to `classes`.
    pub fn with_classes(mut self, classes: impl IntoIterator<Item = u32>) -> Self {
        self.classes = classes.into_iter().collect();
        self.restricted = true;
        self
    }

    /// Whether this teacher may teach `class`.
    #[inline]
    pub fn allows_class(&self, class: u32) -> bool {
        self.classes.contains(&class) || (!self.restricted && self.classes.is_empty())
    }

    /// Whether the teacher may teach no class at all.
    #[inline]
    pub fn is_locked_out(&self) -> bool {
        self.restricted && self.classes.is_empty()
    }

    /// Checks the fields a user must fill in.
    pub fn check_input(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(TimetableError::EmptyTeacherName);
        }
        if self.subject.trim().is_empty() {
            return Err(TimetableError::EmptySubject);
        }
        if self.classes.is_empty() {
            return Err(TimetableError::NoClassSelected(self.name.clone()));
        }
        Ok(())
    }
}

/// Ordered teacher collection plus per-teacher placement templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeacherRegistry {
    teachers: Vec<Teacher>,
    templates: BTreeMap<String, PlacementTemplate>,
}

impl TeacherRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from teachers, skipping duplicate ids.
    pub fn from_teachers(teachers: impl IntoIterator<Item = Teacher>) -> Self {
        let mut registry = Self::new();
        for t in teachers {
            if registry.get(&t.id).is_none() {
                registry.teachers.push(t);
            }
        }
        registry
    }

    /// Teachers in insertion order.
    pub fn teachers(&self) -> &[Teacher] {
        &self.teachers
    }

    /// Looks a teacher up by id.
    pub fn get(&self, id: &str) -> Option<&Teacher> {
        self.teachers.iter().find(|t| t.id == id)
    }

    /// Looks a teacher up by display name.
    pub fn find_by_name(&self, name: &str) -> Option<&Teacher> {
        self.teachers.iter().find(|t| t.name == name)
    }

    /// Looks a teacher up by id, failing with [`TimetableError::UnknownTeacher`].
    pub fn require(&self, id: &str) -> Result<&Teacher> {
        self.get(id)
            .ok_or_else(|| TimetableError::UnknownTeacher(id.to_string()))
    }

    /// Number of teachers.
    pub fn len(&self) -> usize {
        self.teachers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teachers.is_empty()
    }

    /// Adds a validated teacher.
    pub fn add(&mut self, teacher: Teacher) -> Result<()> {
        teacher.check_input()?;
        if self.get(&teacher.id).is_some() {
            return Err(TimetableError::DuplicateTeacher(teacher.id));
        }
        self.teachers.push(teacher);
        Ok(())
    }

    /// Replaces the teacher with the same id, keeping its position.
    ///
    /// Template entries for classes the teacher may no longer teach are cleared.
    pub fn update(&mut self, teacher: Teacher) -> Result<()> {
        teacher.check_input()?;
        let pos = self
            .teachers
            .iter()
            .position(|t| t.id == teacher.id)
            .ok_or_else(|| TimetableError::UnknownTeacher(teacher.id.clone()))?;
        if let Some(template) = self.templates.get_mut(&teacher.id) {
            template.retain_classes(|c| teacher.allows_class(c));
        }
        self.teachers[pos] = teacher;
        Ok(())
    }

    /// Removes a teacher and its template.
    pub fn remove(&mut self, id: &str) -> Result<Teacher> {
        let pos = self
            .teachers
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| TimetableError::UnknownTeacher(id.to_string()))?;
        self.templates.remove(id);
        Ok(self.teachers.remove(pos))
    }

    /// Drops every allowed class and template entry above `class_count`.
    ///
    /// A teacher whose every class is dropped stays restricted and may
    /// no longer teach anywhere.
    pub fn clip_classes(&mut self, class_count: u32) {
        for t in &mut self.teachers {
            t.classes.retain(|&c| c <= class_count);
        }
        for template in self.templates.values_mut() {
            template.retain_classes(|c| c <= class_count);
        }
    }

    /// Template for a teacher, if configured.
    pub fn template(&self, teacher_id: &str) -> Option<&PlacementTemplate> {
        self.templates.get(teacher_id)
    }

    /// All templates keyed by teacher id.
    pub fn templates(&self) -> &BTreeMap<String, PlacementTemplate> {
        &self.templates
    }

    /// Stores a template for a registered teacher.
    ///
    /// Fails if any entry targets a class the teacher may not teach.
    pub fn set_template(&mut self, teacher_id: &str, template: PlacementTemplate) -> Result<()> {
        let teacher = self.require(teacher_id)?;
        if let Some(class) = template.classes().find(|&c| !teacher.allows_class(c)) {
            return Err(TimetableError::TeacherClassNotAllowed {
                teacher_id: teacher_id.to_string(),
                class,
            });
        }
        if template.is_blank() {
            self.templates.remove(teacher_id);
        } else {
            self.templates.insert(teacher_id.to_string(), template);
        }
        Ok(())
    }

    /// Removes a teacher's template. Returns whether one existed.
    pub fn clear_template(&mut self, teacher_id: &str) -> bool {
        self.templates.remove(teacher_id).is_some()
    }

    /// Whether any teacher has a non-blank template.
    pub fn has_templates(&self) -> bool {
        self.templates.values().any(|t| !t.is_blank())
    }

    /// Resolves which teacher(s) the templates expect at a class/period/day.
    pub fn resolve(&self, class: u32, period: usize, day: usize) -> TemplateResolution<'_> {
        let mut found = Vec::new();
        for (teacher_id, template) in &self.templates {
            let Some(entry) = template.entry(period, day) else {
                continue;
            };
            if entry.class != Some(class) {
                continue;
            }
            if let Some(teacher) = self.get(teacher_id) {
                found.push((teacher, entry.location.as_str()));
            }
        }
        match found.len() {
            0 => TemplateResolution::Unassigned,
            1 => {
                let (teacher, location) = found[0];
                TemplateResolution::Unique { teacher, location }
            }
            _ => TemplateResolution::Ambiguous(found.into_iter().map(|(t, _)| t).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TemplateEntry;

    fn registry() -> TeacherRegistry {
        let mut r = TeacherRegistry::new();
        r.add(Teacher::new("T1", "Kim", "체육").with_classes([1, 2, 3]))
            .unwrap();
        r.add(Teacher::new("T2", "Lee", "음악").with_classes([1, 2]))
            .unwrap();
        r
    }

    #[test]
    fn test_teacher_allows_class() {
        let t = Teacher::new("T1", "Kim", "체육").with_classes([1, 2]);
        assert!(t.allows_class(1));
        assert!(!t.allows_class(3));
        assert!(Teacher::new("T2", "Lee", "음악").allows_class(9));
    }

    #[test]
    fn test_add_validation() {
        let mut r = TeacherRegistry::new();
        assert_eq!(
            r.add(Teacher::new("T1", " ", "체육").with_classes([1])),
            Err(TimetableError::EmptyTeacherName)
        );
        assert_eq!(
            r.add(Teacher::new("T1", "Kim", "").with_classes([1])),
            Err(TimetableError::EmptySubject)
        );
        assert!(matches!(
            r.add(Teacher::new("T1", "Kim", "체육")),
            Err(TimetableError::NoClassSelected(_))
        ));
        r.add(Teacher::new("T1", "Kim", "체육").with_classes([1]))
            .unwrap();
        assert_eq!(
            r.add(Teacher::new("T1", "Park", "미술").with_classes([1])),
            Err(TimetableError::DuplicateTeacher("T1".into()))
        );
    }

    #[test]
    fn test_update_keeps_order_and_clips_template() {
        let mut r = registry();
        let mut tpl = PlacementTemplate::new();
        tpl.set(0, 0, TemplateEntry::new(3, ""));
        tpl.set(0, 1, TemplateEntry::new(1, ""));
        r.set_template("T1", tpl).unwrap();

        r.update(Teacher::new("T1", "Kim S.", "체육").with_classes([1]))
            .unwrap();
        assert_eq!(r.teachers()[0].name, "Kim S.");
        let tpl = r.template("T1").unwrap();
        assert_eq!(tpl.entry(0, 0).unwrap().class, None);
        assert_eq!(tpl.entry(0, 1).unwrap().class, Some(1));
    }

    #[test]
    fn test_remove_drops_template() {
        let mut r = registry();
        let mut tpl = PlacementTemplate::new();
        tpl.set(0, 0, TemplateEntry::new(1, ""));
        r.set_template("T2", tpl).unwrap();
        r.remove("T2").unwrap();
        assert!(r.template("T2").is_none());
        assert!(r.remove("T2").is_err());
    }

    #[test]
    fn test_set_template_rejects_disallowed_class() {
        let mut r = registry();
        let mut tpl = PlacementTemplate::new();
        tpl.set(1, 1, TemplateEntry::new(3, ""));
        assert_eq!(
            r.set_template("T2", tpl),
            Err(TimetableError::TeacherClassNotAllowed {
                teacher_id: "T2".into(),
                class: 3
            })
        );
        assert!(!r.has_templates());
    }

    #[test]
    fn test_resolve() {
        let mut r = registry();
        let mut t1 = PlacementTemplate::new();
        t1.set(0, 0, TemplateEntry::new(1, "강당"));
        t1.set(1, 0, TemplateEntry::new(2, ""));
        r.set_template("T1", t1).unwrap();
        let mut t2 = PlacementTemplate::new();
        t2.set(1, 0, TemplateEntry::new(2, "음악실"));
        r.set_template("T2", t2).unwrap();

        match r.resolve(1, 0, 0) {
            TemplateResolution::Unique { teacher, location } => {
                assert_eq!(teacher.id, "T1");
                assert_eq!(location, "강당");
            }
            other => panic!("expected unique, got {other:?}"),
        }
        assert!(matches!(
            r.resolve(2, 1, 0),
            TemplateResolution::Ambiguous(ref ts) if ts.len() == 2
        ));
        assert!(matches!(r.resolve(3, 0, 0), TemplateResolution::Unassigned));
    }

    #[test]
    fn test_clip_classes() {
        let mut r = registry();
        r.clip_classes(1);
        assert_eq!(r.get("T1").unwrap().classes, BTreeSet::from([1]));
        assert_eq!(r.get("T2").unwrap().classes, BTreeSet::from([1]));
    }

    #[test]
    fn test_clipped_to_nothing_allows_no_class() {
        let mut r = TeacherRegistry::from_teachers([
            Teacher::new("L", "Lim", "영어").with_classes([8, 12]),
            Teacher::new("U", "Yoo", "미술"),
        ]);
        r.clip_classes(5);
        let l = r.get("L").unwrap();
        assert!(l.classes.is_empty());
        assert!(l.is_locked_out());
        assert!((1..=5).all(|c| !l.allows_class(c)));

        let u = r.get("U").unwrap();
        assert!(!u.is_locked_out());
        assert!(u.allows_class(3));
    }
}
