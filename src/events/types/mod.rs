//! Event payload definitions.
//!
//! Each sub-module defines the events of one layer of the hierarchy.

/// Named value writes.
pub mod value_events;

/// Element pairing and summary changes.
pub mod element_events;

/// Segment admission, release and positional changes.
pub mod group_events;

/// Coalesced board notifications.
pub mod board_events;

pub use board_events::{BoardChange, BoardChanged};
pub use element_events::ElementEvent;
pub use group_events::{GroupEvent, SlotChange};
pub use value_events::ValueChanged;
