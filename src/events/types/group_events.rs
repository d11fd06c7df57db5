//! Events emitted by segments.

use serde::{Deserialize, Serialize};

use crate::events::base_event::BaseEvent;

/// A positional change inside a segment.
///
/// `index` is the stable slot index, not the record's insertion order. An
/// `element` of `None` means the slot was vacated and may be reused later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotChange {
    pub group: String,
    pub element: Option<String>,
    pub summary: String,
    pub index: usize,
}

/// Lifecycle notifications for a segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GroupEvent {
    /// A record was stored and paired at `index`.
    RecordAccepted {
        group: String,
        record: String,
        index: usize,
    },
    /// A record was removed.
    RecordReleased { group: String, record: String },
    /// An element's summary changed or its slot was vacated.
    Changed(SlotChange),
}

impl BaseEvent for GroupEvent {
    fn event_type(&self) -> &'static str {
        match self {
            GroupEvent::RecordAccepted { .. } => "accepted",
            GroupEvent::RecordReleased { .. } => "released",
            GroupEvent::Changed(_) => "changed",
        }
    }
}
