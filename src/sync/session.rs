//! Debounced synchronization between one engine and a [`SyncStore`].
//!
//! The session is driven by [`SyncSession::poll`] with an injected clock,
//! so it needs no timer thread. Each poll:
//!
//! 1. drains snapshots pushed by the store, skipping echoes of our own
//!    last save, and replaces the engine state with each one;
//! 2. notices local commits by comparing the engine revision;
//! 3. saves once no local change happened for the debounce interval.
//!
//! Merging is last-write-wins on the whole document: a remote snapshot
//! drained before a pending local save supersedes it.

use log::{debug, info, warn};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use super::{Snapshot, SyncError, SyncStore};
use crate::engine::TimetableEngine;

/// Sync state as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// Nothing saved or loaded yet.
    Idle,
    /// Local changes wait for the debounce to elapse.
    Pending,
    /// The store holds the current state.
    Synced,
    /// The last save failed; local edits are kept and retried.
    Degraded(String),
}

/// A sync session bound to one store.
pub struct SyncSession<S: SyncStore> {
    store: S,
    inbox: Receiver<Snapshot>,
    debounce: Duration,
    last_revision: u64,
    pending_since: Option<Instant>,
    last_saved: Option<Snapshot>,
    applying_remote: bool,
    status: SyncStatus,
}

impl<S: SyncStore> SyncSession<S> {
    /// Subscribes to `store` and performs the initial load.
    ///
    /// A stored snapshot replaces the engine state. An empty store gets
    /// the local state on the first poll past the debounce.
    pub fn connect(store: S, engine: &mut TimetableEngine, now: Instant) -> Self {
        let (tx, inbox) = mpsc::channel();
        store.subscribe(Box::new(move |snapshot| {
            // The session may be gone; nothing to deliver to then.
            let _ = tx.send(snapshot);
        }));

        let mut session = Self {
            store,
            inbox,
            debounce: engine.config().sync_debounce(),
            last_revision: engine.revision(),
            pending_since: None,
            last_saved: None,
            applying_remote: false,
            status: SyncStatus::Idle,
        };

        match session.store.load() {
            Ok(Some(snapshot)) => session.apply_remote(engine, snapshot),
            Ok(None) => {
                info!("sync: store is empty, publishing local state");
                session.pending_since = Some(now);
                session.status = SyncStatus::Pending;
            }
            Err(e) => {
                warn!("sync: initial load failed: {e}");
                session.status = SyncStatus::Degraded(e.to_string());
            }
        }
        session
    }

    /// Overrides the debounce interval.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn status(&self) -> &SyncStatus {
        &self.status
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether a local change is waiting to be saved.
    pub fn has_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    /// Whether a remote snapshot is being applied right now.
    pub fn is_applying_remote(&self) -> bool {
        self.applying_remote
    }

    /// Runs one sync step at time `now`.
    pub fn poll(&mut self, engine: &mut TimetableEngine, now: Instant) -> &SyncStatus {
        while let Ok(snapshot) = self.inbox.try_recv() {
            if self.last_saved.as_ref() == Some(&snapshot) {
                debug!("sync: ignoring echo of our own save");
                continue;
            }
            self.apply_remote(engine, snapshot);
        }

        self.note_local_change(engine, now);

        if let Some(since) = self.pending_since {
            if now.saturating_duration_since(since) >= self.debounce {
                self.flush(engine, now);
            }
        }
        &self.status
    }

    /// Saves immediately if anything is pending, ignoring the debounce.
    pub fn flush_now(&mut self, engine: &TimetableEngine, now: Instant) -> &SyncStatus {
        self.note_local_change(engine, now);
        if self.pending_since.is_some() {
            self.flush(engine, now);
        }
        &self.status
    }

    fn note_local_change(&mut self, engine: &TimetableEngine, now: Instant) {
        if self.applying_remote || engine.revision() == self.last_revision {
            return;
        }
        self.last_revision = engine.revision();
        // Each new change restarts the debounce.
        self.pending_since = Some(now);
        if !matches!(self.status, SyncStatus::Degraded(_)) {
            self.status = SyncStatus::Pending;
        }
    }

    fn flush(&mut self, engine: &TimetableEngine, now: Instant) {
        match self.save(engine) {
            Ok(()) => {
                self.pending_since = None;
                self.status = SyncStatus::Synced;
                info!("sync: saved revision {} as {}", engine.revision(), engine.actor());
            }
            Err(e) => {
                warn!("sync: save failed, keeping local edits: {e}");
                self.pending_since = Some(now);
                self.status = SyncStatus::Degraded(e.to_string());
            }
        }
    }

    fn save(&mut self, engine: &TimetableEngine) -> Result<(), SyncError> {
        let snapshot = engine.to_snapshot();
        // Compare echoes in the decoded form a subscriber receives.
        let decoded = Snapshot::from_value(snapshot.to_value()?);
        self.store.save(&snapshot, engine.actor())?;
        self.last_saved = Some(decoded);
        Ok(())
    }

    fn apply_remote(&mut self, engine: &mut TimetableEngine, snapshot: Snapshot) {
        self.applying_remote = true;
        let report = engine.apply_snapshot(snapshot);
        if report.has_repairs() {
            warn!("sync: remote snapshot needed repairs: {report:?}");
        }
        self.last_revision = engine.revision();
        self.pending_since = None;
        self.applying_remote = false;
        self.status = SyncStatus::Synced;
    }
}
