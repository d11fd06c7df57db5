//! Events emitted by view elements.

use serde::{Deserialize, Serialize};

use crate::events::base_event::BaseEvent;

/// Pairing and change notifications for a single view element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementEvent {
    /// A record was bound to the element.
    Paired { element: String, record: String },
    /// The element's record was released.
    Unpaired { element: String, record: String },
    /// The element's summary changed.
    Changed { element: String, summary: String },
}

impl BaseEvent for ElementEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ElementEvent::Paired { .. } => "paired",
            ElementEvent::Unpaired { .. } => "unpaired",
            ElementEvent::Changed { .. } => "changed",
        }
    }
}
