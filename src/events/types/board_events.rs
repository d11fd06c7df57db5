//! Coalesced notifications emitted by the board.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::base_event::BaseEvent;
use crate::events::types::group_events::SlotChange;

/// One de-duplicated slot change, tagged with its segment's position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardChange {
    pub group_index: usize,
    #[serde(flatten)]
    pub change: SlotChange,
}

/// The single notification a board emits per coalescing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardChanged {
    pub board: String,
    /// Per-board emission number, starting at 1.
    pub sequence: u64,
    /// Latest change per `(group_index, index)`, ordered by that key.
    pub changes: Vec<BoardChange>,
    /// Checksum of every segment that had at least one change.
    pub group_checksums: BTreeMap<usize, u32>,
    pub emitted_at: DateTime<Utc>,
}

impl BaseEvent for BoardChanged {
    fn event_type(&self) -> &'static str {
        "changed"
    }
}
