//! Conflict rules for specialist placements.
//!
//! - **`overlap`**: finds classes double-booking a teacher at one moment.
//! - **`mismatch`**: classifies cells against templates and the baseline.
//! - **`legality`**: decides whether a swap/move is legal and why not.
//!
//! All three are pure functions of the schedule state; none of them
//! mutate the store. Overlap and mismatch results are advisory status,
//! legality results gate whether a forced override prompt is needed.

mod legality;
mod mismatch;
mod overlap;

pub use legality::{evaluate_swap, BlockReason, SwapEvaluation};
pub use mismatch::MismatchClassifier;
pub use overlap::{find_double_bookings, find_overlaps, find_overlaps_excluding, DoubleBooking};
