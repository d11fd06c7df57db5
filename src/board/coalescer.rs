//! Rate limiting for board notifications.
//!
//! Segment changes are buffered and released at most once per
//! `min_interval`, de-duplicated so each slot appears once with its latest
//! state.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::events::{BoardChange, SlotChange};

/// Buffer of segment changes awaiting the next emission window.
#[derive(Debug, Clone)]
pub struct Coalescer {
    min_interval: Duration,
    last_emit: DateTime<Utc>,
    pending: Vec<BoardChange>,
}

impl Coalescer {
    /// Start a window at `now`; nothing is released before
    /// `now + min_interval`.
    pub fn new(min_interval: Duration, now: DateTime<Utc>) -> Self {
        Self {
            min_interval,
            last_emit: now,
            pending: Vec::new(),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn last_emit(&self) -> DateTime<Utc> {
        self.last_emit
    }

    pub fn push(&mut self, group_index: usize, change: SlotChange) {
        self.pending.push(BoardChange {
            group_index,
            change,
        });
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Whether the window has elapsed. A clock that moved backwards never
    /// counts as elapsed.
    pub fn window_elapsed(&self, now: DateTime<Utc>) -> bool {
        (now - self.last_emit)
            .to_std()
            .is_ok_and(|elapsed| elapsed >= self.min_interval)
    }

    /// Whether [`take`](Self::take) should run now.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.pending.is_empty() && self.window_elapsed(now)
    }

    /// Drain the buffer, keeping the latest change per
    /// `(group_index, index)` ordered by that key, and start a new window.
    pub fn take(&mut self, now: DateTime<Utc>) -> Vec<BoardChange> {
        let mut latest: BTreeMap<(usize, usize), BoardChange> = BTreeMap::new();
        for change in self.pending.drain(..) {
            latest.insert((change.group_index, change.change.index), change);
        }
        self.last_emit = now;
        latest.into_values().collect()
    }
}
