//! Remote persistence and live synchronization.
//!
//! The engine never talks to a backend directly. A [`SyncStore`] loads and
//! saves whole-state [`Snapshot`]s and pushes remote changes to a callback;
//! a [`SyncSession`] sits between the store and the engine, debouncing
//! outgoing saves and applying inbound snapshots through normalization.
//!
//! # Components
//!
//! - **`snapshot`**: lenient wire document
//! - **`normalize`**: engine ⇄ snapshot conversion with repair
//! - **`memory`**: in-process [`MemoryStore`] shared by several sessions
//! - **`session`**: debounce, echo suppression and degraded-mode handling

mod memory;
mod normalize;
mod session;
mod snapshot;

pub use memory::MemoryStore;
pub use normalize::NormalizeReport;
pub use session::{SyncSession, SyncStatus};
pub use snapshot::{RawCell, RawSchedules, RawTeacher, RawTemplateEntry, Snapshot};

use thiserror::Error;

/// Callback receiving snapshots pushed by the store.
pub type RemoteCallback = Box<dyn FnMut(Snapshot) + Send>;

/// Errors raised by a sync backend.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The stored document is not valid JSON.
    #[error("Malformed snapshot: {0}")]
    Malformed(String),

    /// The backend cannot be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The backend refused the write.
    #[error("Save rejected: {0}")]
    Rejected(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A shared backend holding one snapshot document.
pub trait SyncStore {
    /// Loads the stored snapshot, `None` when nothing was saved yet.
    fn load(&self) -> Result<Option<Snapshot>, SyncError>;

    /// Replaces the stored snapshot. `actor_id` identifies the writer.
    fn save(&self, snapshot: &Snapshot, actor_id: &str) -> Result<(), SyncError>;

    /// Registers a callback invoked with every snapshot saved by anyone,
    /// including the caller.
    fn subscribe(&self, callback: RemoteCallback);
}
