//! Conflict-aware weekly school timetable engine.
//!
//! Holds a multi-week timetable of homeroom and specialist lessons and
//! keeps it consistent under edits: specialist overlaps are detected,
//! swaps are checked for legality, conflicting assignments come back as
//! ranked resolution plans, and every structural change is undoable.
//!
//! # Modules
//!
//! - **`models`**: Domain types — `Slot`, `Cell`, `Teacher`,
//!   `PlacementTemplate`, `ScheduleStore`, `ChangeLogEntry`
//! - **`rules`**: Overlap detection, mismatch classification, swap legality
//! - **`planner`**: Conflict resolution plan enumeration and ranking
//! - **`engine`**: The mutation context: assignment, swaps, bulk edits,
//!   history, configuration and seeded generation
//! - **`sync`**: Snapshot normalization and debounced remote sync
//! - **`stats`**: Read-only weekly statistics
//! - **`validation`**: Input integrity checks (duplicate IDs, class ranges,
//!   teacher references, double bookings)
//!
//! # Example
//!
//! ```
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use u_timetable::{EngineConfig, TeacherRegistry, Teacher, TimetableEngine};
//!
//! let registry = TeacherRegistry::from_teachers([
//!     Teacher::new("T1", "Park", "체육").with_classes([1, 2, 3]),
//! ]);
//! let mut rng = StdRng::seed_from_u64(7);
//! let engine = TimetableEngine::generate(
//!     EngineConfig::default(),
//!     3,
//!     vec!["국어".into(), "수학".into()],
//!     registry,
//!     &mut rng,
//! );
//! assert!(engine.double_bookings(1).is_empty());
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod planner;
pub mod rules;
pub mod stats;
pub mod sync;
pub mod validation;

pub use config::EngineConfig;
pub use engine::{AssignOutcome, AssignmentRequest, SwapOutcome, TimetableEngine};
pub use error::{Result, TimetableError};
pub use models::{Cell, CellType, ScheduleStore, Slot, Teacher, TeacherRegistry};
pub use planner::Plan;
pub use sync::{MemoryStore, Snapshot, SyncSession, SyncStatus, SyncStore};
