//! Attribute-level events emitted by named values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events::base_event::BaseEvent;

/// Emitted on every write to a named value, including writes that store the
/// value it already held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueChanged {
    /// Attribute name.
    pub name: String,
    /// Value read before the write (the default if never written).
    pub old: Value,
    /// Value stored by the write.
    pub new: Value,
    /// Resolved write timestamp.
    pub timestamp: DateTime<Utc>,
}

impl BaseEvent for ValueChanged {
    fn event_type(&self) -> &'static str {
        "changed"
    }
}
