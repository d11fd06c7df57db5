//! The board: top-level owner of segments and the single source of
//! coalesced change notifications.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::board::coalescer::Coalescer;
use crate::elements::ElementFactory;
use crate::error::{BoardError, Result};
use crate::events::{BoardChanged, EventBus, ValueChanged};
use crate::groups::{Admission, Group};
use crate::utilities::clock::{Clock, SystemClock};
use crate::values::Record;

/// Default minimum spacing between two board notifications.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Owns an ordered set of segments, routes records to the first segment
/// that accepts them, and rate-limits their change events into one
/// [`BoardChanged`] notification per window.
///
/// The board is a single-actor state machine: callers driving it from
/// several threads must serialise access (see
/// [`spawn_ticker`](crate::board::spawn_ticker) for the shared form).
pub struct Board {
    name: String,
    groups: Vec<Group>,
    factory: ElementFactory,
    coalescer: Coalescer,
    clock: Arc<dyn Clock>,
    /// Sequence number of the last emitted notification.
    sequence: u64,
    events: EventBus<BoardChanged>,
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("name", &self.name)
            .field("groups", &self.groups)
            .field("factory", &self.factory)
            .field("coalescer", &self.coalescer)
            .finish()
    }
}

impl Board {
    /// A board on wall-clock time with the default element factory.
    pub fn new(name: impl Into<String>, min_interval: Duration) -> Self {
        Self::with_clock(name, min_interval, Arc::new(SystemClock))
    }

    /// A board reading time from `clock`. The first window starts now.
    pub fn with_clock(name: impl Into<String>, min_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        let coalescer = Coalescer::new(min_interval, clock.now());
        Self {
            name: name.into(),
            groups: Vec::new(),
            factory: ElementFactory::default(),
            coalescer,
            clock,
            sequence: 0,
            events: EventBus::new(),
        }
    }

    pub fn with_factory(mut self, factory: ElementFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Append a segment. Segment order decides admission (first fit).
    pub fn add_group(&mut self, group: Group) -> usize {
        self.groups.push(group);
        self.groups.len() - 1
    }

    pub fn with_group(mut self, group: Group) -> Self {
        self.add_group(group);
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, index: usize) -> Option<&Group> {
        self.groups.get(index)
    }

    pub fn group_by_name(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name() == name)
    }

    /// Mutable access to a segment, e.g. to subscribe to its events.
    /// Changes made through it reach the board's buffer on the next
    /// board-level operation or [`tick`](Self::tick).
    pub fn group_mut(&mut self, index: usize) -> Option<&mut Group> {
        self.groups.get_mut(index)
    }

    pub fn factory(&self) -> &ElementFactory {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut ElementFactory {
        &mut self.factory
    }

    /// Index of the segment owning record `id` (first match).
    pub fn owner_of(&self, id: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.owns(id))
    }

    pub fn record(&self, id: &str) -> Option<&dyn Record> {
        self.groups.iter().find_map(|g| g.record(id))
    }

    /// Current checksum of every segment, in segment order.
    pub fn checksums(&self) -> Vec<u32> {
        self.groups.iter().map(Group::checksum).collect()
    }

    /// Number of buffered, not yet emitted changes.
    pub fn pending_len(&self) -> usize {
        self.coalescer.len()
    }

    pub fn events(&self) -> &EventBus<BoardChanged> {
        &self.events
    }

    /// Subscribe or unsubscribe handlers for coalesced notifications.
    pub fn events_mut(&mut self) -> &mut EventBus<BoardChanged> {
        &mut self.events
    }

    // -----------------------------------------------------------------------
    // Records
    // -----------------------------------------------------------------------

    /// Hand `record` to the first segment that accepts it.
    ///
    /// Returns the index of that segment. Fails with
    /// [`BoardError::NoGroupAccepted`] when every segment declines, which
    /// means the topology has no segment for this kind of record.
    pub fn add_record(&mut self, record: Box<dyn Record>) -> Result<usize> {
        if record.id().is_empty() {
            return Err(BoardError::InvalidId(String::new()));
        }
        if self.owner_of(record.id()).is_some() {
            return Err(BoardError::DuplicateId {
                id: record.id().to_string(),
            });
        }

        let mut record = record;
        for index in 0..self.groups.len() {
            match self.groups[index].accept(record, &self.factory)? {
                Admission::Accepted { .. } => {
                    self.collect(index);
                    return Ok(index);
                }
                Admission::Rejected(returned) => record = returned,
            }
        }

        log::warn!(
            "board '{}': no segment accepted record {} ({})",
            self.name,
            record.id(),
            record.kind()
        );
        Err(BoardError::NoGroupAccepted {
            id: record.id().to_string(),
            kind: record.kind().to_string(),
        })
    }

    /// Remove record `id` from its owning segment.
    ///
    /// Returns `Ok(false)` when no segment owns it.
    pub fn remove_record(&mut self, id: &str) -> Result<bool> {
        if id.is_empty() {
            return Err(BoardError::InvalidId(id.to_string()));
        }
        let Some(index) = self.owner_of(id) else {
            return Ok(false);
        };
        if !self.groups[index].release(id)? {
            return Err(BoardError::AssetRemovalFailed {
                id: id.to_string(),
                group: self.groups[index].name().to_string(),
            });
        }
        self.collect(index);
        Ok(true)
    }

    /// Write one attribute of record `id`.
    pub fn set_attribute(
        &mut self,
        id: &str,
        name: &str,
        value: Value,
        timestamp: Option<&Value>,
    ) -> Result<ValueChanged> {
        let index = self.require_owner(id)?;
        let change = self.groups[index].set_attribute(id, name, value, timestamp)?;
        self.collect(index);
        Ok(change)
    }

    /// Bulk-update record `id` (see
    /// [`Attributes::bulk_update`](crate::values::Attributes::bulk_update)).
    pub fn bulk_update(
        &mut self,
        id: &str,
        object: &Value,
        reverse_keyed: bool,
    ) -> Result<Vec<ValueChanged>> {
        let index = self.require_owner(id)?;
        let changes = self.groups[index].bulk_update(id, object, reverse_keyed)?;
        self.collect(index);
        Ok(changes)
    }

    fn require_owner(&self, id: &str) -> Result<usize> {
        self.owner_of(id)
            .ok_or_else(|| BoardError::UnknownRecord { id: id.to_string() })
    }

    // -----------------------------------------------------------------------
    // Coalescing
    // -----------------------------------------------------------------------

    /// Buffer segment `index`'s changes and run the rate check.
    fn collect(&mut self, index: usize) {
        let changes = self.groups[index].drain_changes();
        if changes.is_empty() {
            return;
        }
        for change in changes {
            self.coalescer.push(index, change);
        }
        self.tick();
    }

    /// Emit one coalesced notification if the buffer is non-empty and the
    /// minimum interval has elapsed since the last emission.
    ///
    /// Called after every buffered change and by the recurring timer.
    pub fn tick(&mut self) -> Option<BoardChanged> {
        for index in 0..self.groups.len() {
            for change in self.groups[index].drain_changes() {
                self.coalescer.push(index, change);
            }
        }
        let now = self.clock.now();
        if !self.coalescer.is_due(now) {
            return None;
        }
        Some(self.emit(now))
    }

    /// Emit whatever is buffered, ignoring the interval.
    pub fn flush(&mut self) -> Option<BoardChanged> {
        for index in 0..self.groups.len() {
            for change in self.groups[index].drain_changes() {
                self.coalescer.push(index, change);
            }
        }
        if self.coalescer.is_empty() {
            return None;
        }
        let now = self.clock.now();
        Some(self.emit(now))
    }

    fn emit(&mut self, now: chrono::DateTime<chrono::Utc>) -> BoardChanged {
        let changes = self.coalescer.take(now);
        let touched: BTreeSet<usize> = changes.iter().map(|c| c.group_index).collect();
        let group_checksums = touched
            .into_iter()
            .map(|index| (index, self.groups[index].checksum()))
            .collect();

        self.sequence += 1;
        let notification = BoardChanged {
            board: self.name.clone(),
            sequence: self.sequence,
            changes,
            group_checksums,
            emitted_at: now,
        };
        log::debug!(
            "board '{}' emitting {} change(s), sequence {}",
            self.name,
            notification.changes.len(),
            notification.sequence
        );
        self.events.emit(&notification);
        notification
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Acceptance, BasicView, ViewElement, STATUS_VIEW_TYPE};
    use crate::groups::{Boundary, ContainsFn};
    use crate::utilities::clock::ManualClock;
    use crate::values::{Asset, Position, TrackedAsset};
    use chrono::Duration as ChronoDuration;
    use serde_json::json;
    use std::sync::Mutex;

    fn asset(id: &str, kind: &str) -> Box<dyn Record> {
        Box::new(Asset::new(id, kind, [("load", json!(0))]).unwrap())
    }

    fn board_with_clock(interval_ms: u64) -> (Board, ManualClock) {
        let clock = ManualClock::default();
        let board = Board::with_clock(
            "ops",
            Duration::from_millis(interval_ms),
            Arc::new(clock.clone()),
        );
        (board, clock)
    }

    fn capture(board: &mut Board) -> Arc<Mutex<Vec<BoardChanged>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        board
            .events_mut()
            .on("changed", "capture", move |n: &BoardChanged| {
                sink.lock().unwrap().push(n.clone())
            });
        seen
    }

    #[test]
    fn test_first_accepting_group_wins() {
        let (mut board, _clock) = board_with_clock(100);
        let valves_only = Group::new("valves").with_admission(KindIs("valve"));
        board.add_group(valves_only);
        board.add_group(Group::new("everything"));

        assert_eq!(board.add_record(asset("v", "valve")).unwrap(), 0);
        assert_eq!(board.add_record(asset("p", "pump")).unwrap(), 1);
        assert_eq!(board.owner_of("p"), Some(1));
        assert!(board.record("v").is_some());
    }

    #[test]
    fn test_no_group_accepted_is_configuration_error() {
        let (mut board, _clock) = board_with_clock(100);
        board.add_group(Group::new("valves").with_admission(KindIs("valve")));
        let err = board.add_record(asset("p", "pump")).unwrap_err();
        assert!(matches!(err, BoardError::NoGroupAccepted { ref kind, .. } if kind == "pump"));
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn test_duplicate_across_groups_rejected() {
        let (mut board, _clock) = board_with_clock(100);
        board.add_group(Group::new("a"));
        board.add_group(Group::new("b"));
        board.add_record(asset("x", "pump")).unwrap();
        assert!(matches!(
            board.add_record(asset("x", "pump")),
            Err(BoardError::DuplicateId { .. })
        ));
    }

    #[test]
    fn test_remove_record() {
        let (mut board, _clock) = board_with_clock(100);
        board.add_group(Group::new("a"));
        board.add_record(asset("x", "pump")).unwrap();
        assert!(board.remove_record("x").unwrap());
        assert!(!board.remove_record("x").unwrap());
        assert!(matches!(board.remove_record(""), Err(BoardError::InvalidId(_))));
        assert_eq!(board.owner_of("x"), None);
    }

    #[test]
    fn test_burst_coalesces_into_one_notification() {
        let (mut board, clock) = board_with_clock(100);
        board.add_group(Group::new("a"));
        let seen = capture(&mut board);

        board.add_record(asset("r1", "pump")).unwrap();
        clock.advance(ChronoDuration::milliseconds(10));
        board.add_record(asset("r2", "pump")).unwrap();
        clock.advance(ChronoDuration::milliseconds(10));
        board.add_record(asset("r3", "pump")).unwrap();
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(board.pending_len(), 3);

        clock.advance(ChronoDuration::milliseconds(50));
        assert!(board.tick().is_none());

        clock.advance(ChronoDuration::milliseconds(30));
        let notification = board.tick().unwrap();
        assert_eq!(notification.changes.len(), 3);
        assert_eq!(notification.group_checksums.get(&0), Some(&board.groups()[0].checksum()));
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(notification.sequence, 1);
        assert_eq!(board.pending_len(), 0);

        // Nothing pending: the next tick is silent.
        clock.advance(ChronoDuration::seconds(1));
        assert!(board.tick().is_none());
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_event_after_window_flushes_immediately() {
        let (mut board, clock) = board_with_clock(100);
        board.add_group(Group::new("a"));
        let seen = capture(&mut board);

        board.add_record(asset("r1", "pump")).unwrap();
        clock.advance(ChronoDuration::milliseconds(150));
        board.add_record(asset("r2", "pump")).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].changes.len(), 2);
    }

    #[test]
    fn test_dedup_keeps_latest_per_slot() {
        let (mut board, clock) = board_with_clock(100);
        board.add_group(Group::new("a"));
        board.add_record(asset("r1", "pump")).unwrap();
        board.remove_record("r1").unwrap();
        board.add_record(asset("r2", "pump")).unwrap();

        clock.advance(ChronoDuration::milliseconds(100));
        let notification = board.tick().unwrap();
        assert_eq!(notification.changes.len(), 1);
        let change = &notification.changes[0].change;
        assert_eq!(change.index, 0);
        assert!(change.summary.ends_with("|r2"));
    }

    #[test]
    fn test_checksums_only_for_touched_groups() {
        let (mut board, clock) = board_with_clock(0);
        board.add_group(Group::new("valves").with_admission(KindIs("valve")));
        board.add_group(Group::new("rest"));
        let seen = capture(&mut board);

        clock.advance(ChronoDuration::milliseconds(1));
        board.add_record(asset("p", "pump")).unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].group_checksums.keys().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_attribute_updates_reach_board() {
        let (mut board, clock) = board_with_clock(100);
        board
            .factory_mut()
            .bind_kind(
                "pump",
                STATUS_VIEW_TYPE,
                json!({"attribute": "load", "warning": 70, "critical": 90}),
            )
            .unwrap();
        board.add_group(Group::new("a"));
        board.add_record(asset("p", "pump")).unwrap();
        clock.advance(ChronoDuration::milliseconds(100));
        board.tick().unwrap();

        board.set_attribute("p", "load", json!(80), None).unwrap();
        board.bulk_update("p", &json!({"load": 85}), false).unwrap();
        clock.advance(ChronoDuration::milliseconds(100));
        let notification = board.tick().unwrap();
        assert_eq!(notification.changes.len(), 1);
        assert_eq!(notification.changes[0].change.summary, "warning|p");

        assert!(matches!(
            board.set_attribute("ghost", "load", json!(1), None),
            Err(BoardError::UnknownRecord { .. })
        ));
    }

    #[test]
    fn test_flush_ignores_interval() {
        let (mut board, _clock) = board_with_clock(60_000);
        board.add_group(Group::new("a"));
        board.add_record(asset("r", "pump")).unwrap();
        assert!(board.tick().is_none());
        let notification = board.flush().unwrap();
        assert_eq!(notification.changes.len(), 1);
        assert!(board.flush().is_none());
    }

    #[test]
    fn test_static_and_geo_topology() {
        let contains: ContainsFn = Arc::new(|b: &Boundary, p: &Position| {
            b.vertices.first().is_some_and(|v| (v.lat - p.lat).abs() < 1.0)
        });
        let (mut board, _clock) = board_with_clock(100);
        board.add_group(Group::geo(
            "yard",
            Boundary::new(vec![Position::new(10.0, 10.0, 0.0)]),
            contains,
        ));
        board.add_group(
            Group::new("dock").with_static_element(ViewElement::new(
                "element",
                Acceptance::kind("crane"),
                Box::new(BasicView),
                true,
            )),
        );

        let mut truck = TrackedAsset::new("t", "truck", [("fuel", json!(1))]).unwrap();
        truck.move_to(Position::new(10.2, 3.0, 0.0)).unwrap();
        assert_eq!(board.add_record(Box::new(truck)).unwrap(), 0);
        assert_eq!(board.add_record(asset("c", "crane")).unwrap(), 1);
        assert_eq!(board.group(1).unwrap().paired_element_index("c"), Some(0));
    }

    #[derive(Debug)]
    struct KindIs(&'static str);

    impl crate::groups::AdmissionPolicy for KindIs {
        fn admits(&self, record: &dyn Record) -> bool {
            record.kind() == self.0
        }
    }
}
