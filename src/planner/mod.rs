//! Conflict resolution planning.
//!
//! When a direct assignment would double-book a specialist teacher, the
//! planner enumerates local corrective operation sequences, simulates
//! each on a cloned store, and ranks them. It never mutates the live
//! schedule: the caller applies exactly the plan the user selects.
//!
//! # Usage
//!
//! ```
//! use u_timetable::config::EngineConfig;
//! use u_timetable::models::{Cell, ScheduleStore, Slot, Teacher, TeacherRegistry};
//! use u_timetable::planner::ConflictPlanner;
//! use u_timetable::rules::MismatchClassifier;
//!
//! let registry = TeacherRegistry::from_teachers([
//!     Teacher::new("T", "Park", "체육").with_classes([1, 2]),
//! ]);
//! let config = EngineConfig::default();
//! let mut store = ScheduleStore::filled(1, 2, |s| Cell::homeroom(s, "국어"));
//! let busy = Slot::new(1, 1, 0, 0);
//! store.set_cell(&busy, Cell::special(&busy, registry.get("T").unwrap(), None)).unwrap();
//!
//! let target = Slot::new(1, 2, 0, 0);
//! let proposed = Cell::special(&target, registry.get("T").unwrap(), None);
//! let classifier = MismatchClassifier::new(&registry, None, &config);
//! let plans = ConflictPlanner::new(&store, &registry, classifier, &config)
//!     .build_plans(&target, &proposed);
//! assert!(plans.last().unwrap().is_forced());
//! ```
//!
//! # Scoring
//!
//! `score = 10·ops + 18·overlaps + 6·mismatches + 120·forced` with the
//! default [`PlanWeights`](crate::config::PlanWeights), counted over the
//! slots each plan changes. Lower is better.

mod builder;
mod plan;

pub use builder::ConflictPlanner;
pub use plan::{slot_label, swap_cells, Plan, PlanFamily, PlanOperation};
