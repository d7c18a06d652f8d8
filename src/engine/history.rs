//! Undo/redo history.
//!
//! Stores full [`Checkpoint`]s. Because [`ScheduleStore`] clones share
//! grids copy-on-write, a checkpoint costs only the paths that later
//! diverge. Changes that also touch teachers or the class count carry the
//! registry and count too, so undo puts all three back together.
//!
//! # Invariant
//! Undo always exactly reverses the immediately preceding commit, provided
//! every mutation goes through [`HistoryManager::commit`].

use log::info;
use std::collections::VecDeque;
use std::mem;

use crate::error::{HistoryDirection, Result, TimetableError};
use crate::models::{ChangeKind, ChangeLogEntry, ScheduleStore, TeacherRegistry};

/// State captured before a commit.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub store: ScheduleStore,
    /// Only set by commits that changed the registry.
    pub registry: Option<TeacherRegistry>,
    pub class_count: u32,
}

impl Checkpoint {
    pub fn new(store: ScheduleStore, class_count: u32) -> Self {
        Self {
            store,
            registry: None,
            class_count,
        }
    }

    pub fn with_registry(mut self, registry: TeacherRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Swaps this checkpoint into the live state and returns what it
    /// replaced, in the same shape.
    pub fn restore(
        self,
        store: &mut ScheduleStore,
        registry: &mut TeacherRegistry,
        class_count: &mut u32,
    ) -> Checkpoint {
        Checkpoint {
            store: mem::replace(store, self.store),
            registry: self.registry.map(|r| mem::replace(registry, r)),
            class_count: mem::replace(class_count, self.class_count),
        }
    }
}

/// Live state the history rewinds.
pub struct LiveState<'a> {
    pub store: &'a mut ScheduleStore,
    pub registry: &'a mut TeacherRegistry,
    pub class_count: &'a mut u32,
}

impl LiveState<'_> {
    fn swap_in(&mut self, checkpoint: Checkpoint) -> Checkpoint {
        checkpoint.restore(self.store, self.registry, self.class_count)
    }
}

/// Bounded undo/redo stacks plus a bounded change log.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    undo: VecDeque<Checkpoint>,
    redo: Vec<Checkpoint>,
    log: VecDeque<ChangeLogEntry>,
    undo_limit: usize,
    log_limit: usize,
}

impl HistoryManager {
    /// Creates an empty history with the given caps (minimum 1).
    pub fn new(undo_limit: usize, log_limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            log: VecDeque::new(),
            undo_limit: undo_limit.max(1),
            log_limit: log_limit.max(1),
        }
    }

    /// Records `previous` as the state before a change that was just applied.
    pub fn commit(&mut self, previous: Checkpoint, entry: ChangeLogEntry) {
        self.push_undo(previous);
        self.redo.clear();
        self.record(entry);
    }

    /// Restores the most recent checkpoint.
    ///
    /// Fails with [`TimetableError::HistoryExhausted`] (benign) when empty.
    pub fn undo(&mut self, mut live: LiveState<'_>, actor: &str) -> Result<()> {
        let Some(previous) = self.undo.pop_back() else {
            info!("history: nothing to undo");
            return Err(TimetableError::HistoryExhausted(HistoryDirection::Undo));
        };
        let undone = live.swap_in(previous);
        self.redo.push(undone);
        self.record(ChangeLogEntry::new(ChangeKind::Undo, "Undo last change", actor));
        Ok(())
    }

    /// Re-applies the most recently undone checkpoint.
    pub fn redo(&mut self, mut live: LiveState<'_>, actor: &str) -> Result<()> {
        let Some(next) = self.redo.pop() else {
            info!("history: nothing to redo");
            return Err(TimetableError::HistoryExhausted(HistoryDirection::Redo));
        };
        let previous = live.swap_in(next);
        self.push_undo(previous);
        self.record(ChangeLogEntry::new(ChangeKind::Redo, "Redo change", actor));
        Ok(())
    }

    fn push_undo(&mut self, checkpoint: Checkpoint) {
        self.undo.push_back(checkpoint);
        while self.undo.len() > self.undo_limit {
            self.undo.pop_front();
        }
    }

    /// Appends a log entry without touching the stacks.
    pub fn record(&mut self, entry: ChangeLogEntry) {
        self.log.push_back(entry);
        while self.log.len() > self.log_limit {
            self.log.pop_front();
        }
    }

    /// Replaces the change log (e.g. from a sync snapshot), keeping the newest entries.
    pub fn replace_log(&mut self, entries: impl IntoIterator<Item = ChangeLogEntry>) {
        self.log.clear();
        for entry in entries {
            self.record(entry);
        }
    }

    /// Drops both stacks. The change log is kept.
    pub fn clear_stacks(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Snapshots available to undo.
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Snapshots available to redo.
    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// Change log, oldest first.
    pub fn log(&self) -> impl Iterator<Item = &ChangeLogEntry> {
        self.log.iter()
    }

    /// Number of log entries.
    pub fn log_len(&self) -> usize {
        self.log.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cell, Slot, Teacher};

    fn store(subject: &str) -> ScheduleStore {
        ScheduleStore::filled(1, 1, |s| Cell::homeroom(s, subject))
    }

    fn entry(summary: &str) -> ChangeLogEntry {
        ChangeLogEntry::new(ChangeKind::Assign, summary, "tester")
    }

    /// Minimal owner of the live state, committing the way the engine does.
    struct State {
        store: ScheduleStore,
        registry: TeacherRegistry,
        class_count: u32,
        history: HistoryManager,
    }

    impl State {
        fn new(subject: &str, undo_limit: usize, log_limit: usize) -> Self {
            Self {
                store: store(subject),
                registry: TeacherRegistry::new(),
                class_count: 1,
                history: HistoryManager::new(undo_limit, log_limit),
            }
        }

        fn commit(&mut self, subject: &str, summary: &str) {
            let previous = mem::replace(&mut self.store, store(subject));
            self.history
                .commit(Checkpoint::new(previous, self.class_count), entry(summary));
        }

        fn undo(&mut self) -> Result<()> {
            let live = LiveState {
                store: &mut self.store,
                registry: &mut self.registry,
                class_count: &mut self.class_count,
            };
            self.history.undo(live, "t")
        }

        fn redo(&mut self) -> Result<()> {
            let live = LiveState {
                store: &mut self.store,
                registry: &mut self.registry,
                class_count: &mut self.class_count,
            };
            self.history.redo(live, "t")
        }

        fn subject(&self) -> String {
            self.store.cell(&Slot::new(1, 1, 0, 0)).unwrap().subject.clone()
        }
    }

    #[test]
    fn test_commit_undo_redo() {
        let mut s = State::new("A", 10, 10);
        s.commit("B", "A→B");
        s.commit("C", "B→C");

        assert_eq!(s.subject(), "C");
        s.undo().unwrap();
        assert_eq!(s.subject(), "B");
        s.undo().unwrap();
        assert_eq!(s.subject(), "A");
        assert_eq!(
            s.undo(),
            Err(TimetableError::HistoryExhausted(HistoryDirection::Undo))
        );
        s.redo().unwrap();
        assert_eq!(s.subject(), "B");
        assert_eq!(s.history.log_len(), 5);
    }

    #[test]
    fn test_commit_clears_redo() {
        let mut s = State::new("A", 10, 10);
        s.commit("B", "1");
        s.undo().unwrap();
        assert!(s.history.can_redo());
        s.commit("C", "2");
        assert!(!s.history.can_redo());
        assert!(s.redo().unwrap_err().is_benign());
    }

    #[test]
    fn test_limits_evict_oldest() {
        let mut s = State::new("0", 2, 3);
        for i in 1..=4 {
            s.commit(&i.to_string(), &i.to_string());
        }
        assert_eq!(s.history.undo_depth(), 2);
        assert_eq!(s.history.log_len(), 3);
        assert_eq!(s.history.log().next().unwrap().summary, "2");

        s.undo().unwrap();
        s.undo().unwrap();
        assert_eq!(s.subject(), "2");
        assert!(s.undo().is_err());
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut s = State::new("A", 5, 5);
        s.commit("B", "x");
        let before = s.store.clone();
        s.undo().unwrap();
        s.redo().unwrap();
        assert_eq!(s.store, before);
    }

    #[test]
    fn test_registry_and_class_count_rewound() {
        let mut s = State::new("A", 5, 5);
        s.registry = TeacherRegistry::from_teachers([
            Teacher::new("T", "Park", "체육").with_classes([1, 2, 3])
        ]);
        s.class_count = 3;

        let previous = Checkpoint::new(s.store.clone(), s.class_count)
            .with_registry(s.registry.clone());
        s.registry = TeacherRegistry::from_teachers([
            Teacher::new("T", "Park", "체육").with_classes([1])
        ]);
        s.class_count = 1;
        s.history.commit(previous, entry("shrink"));

        s.undo().unwrap();
        assert_eq!(s.class_count, 3);
        assert_eq!(s.registry.get("T").unwrap().classes.len(), 3);

        s.redo().unwrap();
        assert_eq!(s.class_count, 1);
        assert_eq!(s.registry.get("T").unwrap().classes.len(), 1);
    }

    #[test]
    fn test_schedule_only_checkpoint_keeps_registry() {
        let mut s = State::new("A", 5, 5);
        s.commit("B", "x");
        s.registry = TeacherRegistry::from_teachers([
            Teacher::new("T", "Park", "체육").with_classes([1])
        ]);
        s.undo().unwrap();
        assert_eq!(s.subject(), "A");
        assert_eq!(s.registry.len(), 1);
    }
}
