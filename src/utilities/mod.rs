//! Small helpers shared across the crate.

pub mod clock;
pub mod json_path;

pub use clock::{Clock, ManualClock, SystemClock};
