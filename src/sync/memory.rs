//! In-process sync backend.
//!
//! Keeps the document as a JSON value so every load goes through the same
//! lenient decoding as a real remote store. Clones share state, which lets
//! several sessions in one process talk to each other.

use log::debug;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::{RemoteCallback, Snapshot, SyncError, SyncStore};

#[derive(Default)]
struct State {
    document: Option<Value>,
    last_actor: Option<String>,
    saves: usize,
    fail_saves: Option<Failure>,
}

/// Injected save failure.
#[derive(Debug, Clone)]
enum Failure {
    Unavailable(String),
    Rejected(String),
}

impl Failure {
    fn to_error(&self) -> SyncError {
        match self {
            Failure::Unavailable(reason) => SyncError::Unavailable(reason.clone()),
            Failure::Rejected(reason) => SyncError::Rejected(reason.clone()),
        }
    }
}

/// Shared in-memory snapshot store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
    subscribers: Arc<Mutex<Vec<RemoteCallback>>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with a raw document.
    pub fn with_document(document: Value) -> Self {
        let store = Self::new();
        store.state.write().document = Some(document);
        store
    }

    /// Makes every subsequent save fail with `reason`, or succeed again
    /// with `None`.
    pub fn set_failing(&self, reason: Option<&str>) {
        self.state.write().fail_saves = reason.map(|r| Failure::Unavailable(r.to_string()));
    }

    /// Makes every subsequent save be refused by the store, as a backend
    /// does for a writer without permission. `None` accepts saves again.
    pub fn set_rejecting(&self, reason: Option<&str>) {
        self.state.write().fail_saves = reason.map(|r| Failure::Rejected(r.to_string()));
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.state.read().saves
    }

    /// Actor of the most recent successful save.
    pub fn last_actor(&self) -> Option<String> {
        self.state.read().last_actor.clone()
    }

    /// The raw stored document.
    pub fn document(&self) -> Option<Value> {
        self.state.read().document.clone()
    }
}

impl SyncStore for MemoryStore {
    fn load(&self) -> Result<Option<Snapshot>, SyncError> {
        Ok(self.state.read().document.clone().map(Snapshot::from_value))
    }

    fn save(&self, snapshot: &Snapshot, actor_id: &str) -> Result<(), SyncError> {
        let document = snapshot.to_value()?;
        {
            let mut state = self.state.write();
            if let Some(failure) = &state.fail_saves {
                return Err(failure.to_error());
            }
            state.document = Some(document.clone());
            state.last_actor = Some(actor_id.to_string());
            state.saves += 1;
        }
        debug!("memory store: saved by {actor_id}");

        // Subscribers see what a remote reader would decode.
        let pushed = Snapshot::from_value(document);
        for callback in self.subscribers.lock().iter_mut() {
            callback(pushed.clone());
        }
        Ok(())
    }

    fn subscribe(&self, callback: RemoteCallback) {
        self.subscribers.lock().push(callback);
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("MemoryStore")
            .field("has_document", &state.document.is_some())
            .field("saves", &state.saves)
            .field("subscribers", &self.subscribers.lock().len())
            .finish()
    }
}
