//! Event infrastructure shared by every layer of the board.
//!
//! - [`BaseEvent`] trait: the kind discriminator every payload exposes.
//! - [`EventBus`]: per-entity synchronous subscribe/unsubscribe/emit.
//! - [`types`]: the payloads emitted by values, elements, segments and boards.

pub mod base_event;
pub mod event_bus;
pub mod types;

pub use base_event::BaseEvent;
pub use event_bus::{EventBus, Handler, HandlerId};
pub use types::{
    BoardChange, BoardChanged, ElementEvent, GroupEvent, SlotChange, ValueChanged,
};
