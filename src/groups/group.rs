//! Segments: ordered, positionally stable owners of records and elements.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value;

use crate::elements::{ElementFactory, ViewElement};
use crate::error::{BoardError, Result};
use crate::events::{ElementEvent, EventBus, GroupEvent, SlotChange, ValueChanged};
use crate::groups::checksum::checksum;
use crate::values::Record;

// ---------------------------------------------------------------------------
// Admission
// ---------------------------------------------------------------------------

/// Decides whether a segment takes a record at all, before storage.
pub trait AdmissionPolicy: Send + fmt::Debug {
    fn admits(&self, record: &dyn Record) -> bool;
}

/// The base segment policy: take everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl AdmissionPolicy for AcceptAll {
    fn admits(&self, _record: &dyn Record) -> bool {
        true
    }
}

/// Outcome of [`Group::accept`].
#[derive(Debug)]
pub enum Admission {
    /// Stored and paired with the element at slot `index`.
    Accepted { index: usize },
    /// Declined by the admission policy; the record is handed back so the
    /// caller can offer it elsewhere.
    Rejected(Box<dyn Record>),
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Admission::Accepted { .. })
    }
}

// ---------------------------------------------------------------------------
// Group
// ---------------------------------------------------------------------------

/// An ordered container of view elements plus the records it owns.
///
/// `elements` is an arena: a slot index never changes while it is occupied,
/// a pruned element leaves a vacant slot (`None`) instead of shifting its
/// successors, and the lowest vacant slot is reused first. The slot count is
/// therefore a high-water mark, not a live count.
///
/// Element `changed` events are re-emitted as [`GroupEvent::Changed`] with
/// the slot index, and queued for the owner to collect with
/// [`drain_changes`](Self::drain_changes).
pub struct Group {
    name: String,
    admission: Box<dyn AdmissionPolicy>,
    records: Vec<Box<dyn Record>>,
    elements: Vec<Option<ViewElement>>,
    vacancies: BTreeSet<usize>,
    events: EventBus<GroupEvent>,
    outbox: Vec<SlotChange>,
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("admission", &self.admission)
            .field("records", &self.records.len())
            .field("elements", &self.elements)
            .field("vacancies", &self.vacancies)
            .finish()
    }
}

impl Group {
    /// A segment that accepts every record.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            admission: Box::new(AcceptAll),
            records: Vec::new(),
            elements: Vec::new(),
            vacancies: BTreeSet::new(),
            events: EventBus::new(),
            outbox: Vec::new(),
        }
    }

    /// Replace the admission policy.
    pub fn with_admission(mut self, policy: impl AdmissionPolicy + 'static) -> Self {
        self.admission = Box::new(policy);
        self
    }

    /// Append a static element. Static elements are offered records before
    /// any element is manufactured and are never pruned.
    pub fn add_static_element(&mut self, mut element: ViewElement) -> usize {
        element.set_static(true);
        self.elements.push(Some(element));
        self.elements.len() - 1
    }

    pub fn with_static_element(mut self, element: ViewElement) -> Self {
        self.add_static_element(element);
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    /// All slots, vacant ones included.
    pub fn elements(&self) -> &[Option<ViewElement>] {
        &self.elements
    }

    pub fn element(&self, index: usize) -> Option<&ViewElement> {
        self.elements.get(index).and_then(Option::as_ref)
    }

    /// Subscribe to a single element's own events.
    pub fn element_events_mut(&mut self, index: usize) -> Option<&mut EventBus<ElementEvent>> {
        self.elements
            .get_mut(index)
            .and_then(Option::as_mut)
            .map(ViewElement::events_mut)
    }

    /// Slot count (high-water mark).
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Number of occupied slots.
    pub fn occupied(&self) -> usize {
        self.elements.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn records(&self) -> impl Iterator<Item = &dyn Record> {
        self.records.iter().map(|r| r.as_ref())
    }

    pub fn record(&self, id: &str) -> Option<&dyn Record> {
        self.records.iter().find(|r| r.id() == id).map(|r| r.as_ref())
    }

    pub fn owns(&self, id: &str) -> bool {
        self.record(id).is_some()
    }

    /// Slot of the element currently paired with record `id`.
    pub fn paired_element_index(&self, id: &str) -> Option<usize> {
        self.elements.iter().position(|slot| {
            slot.as_ref()
                .is_some_and(|e| e.paired_record() == Some(id))
        })
    }

    /// Cached summary per slot, empty for vacant slots.
    pub fn summaries(&self) -> Vec<&str> {
        self.elements
            .iter()
            .map(|slot| slot.as_ref().map_or("", ViewElement::cached_summary))
            .collect()
    }

    /// Fingerprint of the current slot summaries, computed on demand.
    pub fn checksum(&self) -> u32 {
        checksum(self.summaries())
    }

    /// Render the element in slot `index` with its paired record.
    ///
    /// Returns `Ok(None)` for a vacant or out-of-range slot.
    pub fn render(&self, index: usize, format: &str) -> Result<Option<String>> {
        let Some(element) = self.element(index) else {
            return Ok(None);
        };
        let record = element.paired_record().and_then(|id| self.record(id));
        element.render(format, record).map(Some)
    }

    pub fn events(&self) -> &EventBus<GroupEvent> {
        &self.events
    }

    /// Subscribe or unsubscribe handlers.
    pub fn events_mut(&mut self) -> &mut EventBus<GroupEvent> {
        &mut self.events
    }

    /// Take the positional changes produced since the last call.
    pub fn drain_changes(&mut self) -> Vec<SlotChange> {
        std::mem::take(&mut self.outbox)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Take ownership of `record` and pair it.
    ///
    /// Static elements are tried in slot order and the first that pairs
    /// wins. Otherwise `factory` manufactures an element for the record,
    /// which goes into the lowest vacant slot or is appended. If the factory
    /// fails the record is not stored.
    pub fn accept(&mut self, record: Box<dyn Record>, factory: &ElementFactory) -> Result<Admission> {
        if !self.admission.admits(record.as_ref()) {
            log::debug!("segment '{}' declined record {}", self.name, record.id());
            return Ok(Admission::Rejected(record));
        }
        if self.owns(record.id()) {
            return Err(BoardError::DuplicateId {
                id: record.id().to_string(),
            });
        }

        let mut paired_at = None;
        for (index, slot) in self.elements.iter_mut().enumerate() {
            if let Some(element) = slot {
                if element.is_static() && element.pair(record.as_ref(), false) {
                    paired_at = Some(index);
                    break;
                }
            }
        }

        let index = match paired_at {
            Some(index) => index,
            None => {
                let mut element = factory.create_for(record.as_ref())?;
                element.pair(record.as_ref(), false);
                self.place(element)
            }
        };

        let id = record.id().to_string();
        self.records.push(record);
        log::debug!("segment '{}' paired record {} at slot {}", self.name, id, index);

        self.relay(index);
        self.events.emit(&GroupEvent::RecordAccepted {
            group: self.name.clone(),
            record: id,
            index,
        });
        Ok(Admission::Accepted { index })
    }

    /// Remove record `id`, unpair its element and prune vacated
    /// non-static elements.
    ///
    /// Returns `Ok(false)` if the record is not owned here.
    pub fn release(&mut self, id: &str) -> Result<bool> {
        if id.is_empty() {
            return Err(BoardError::InvalidId(id.to_string()));
        }
        let Some(position) = self.records.iter().position(|r| r.id() == id) else {
            return Ok(false);
        };
        self.records.remove(position);

        if let Some(index) = self.paired_element_index(id) {
            if let Some(element) = self.elements[index].as_mut() {
                element.unpair()?;
            }
            self.relay(index);
        }
        self.prune();

        self.events.emit(&GroupEvent::RecordReleased {
            group: self.name.clone(),
            record: id.to_string(),
        });
        Ok(true)
    }

    /// Write one attribute of an owned record and let its element react.
    pub fn set_attribute(
        &mut self,
        id: &str,
        name: &str,
        value: Value,
        timestamp: Option<&Value>,
    ) -> Result<ValueChanged> {
        let position = self.position_of(id)?;
        let change = self.records[position].set(name, value, timestamp)?;
        self.observe(position, std::slice::from_ref(&change));
        Ok(change)
    }

    /// Bulk-update an owned record and let its element react.
    pub fn bulk_update(
        &mut self,
        id: &str,
        object: &Value,
        reverse_keyed: bool,
    ) -> Result<Vec<ValueChanged>> {
        let position = self.position_of(id)?;
        let changes = self.records[position].bulk_update(object, reverse_keyed)?;
        self.observe(position, &changes);
        Ok(changes)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn position_of(&self, id: &str) -> Result<usize> {
        self.records
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| BoardError::UnknownRecord { id: id.to_string() })
    }

    /// Put a manufactured element into the lowest vacant slot, or append.
    fn place(&mut self, element: ViewElement) -> usize {
        match self.vacancies.pop_first() {
            Some(index) => {
                self.elements[index] = Some(element);
                index
            }
            None => {
                self.elements.push(Some(element));
                self.elements.len() - 1
            }
        }
    }

    /// Feed attribute changes of `records[position]` to its paired element.
    fn observe(&mut self, position: usize, changes: &[ValueChanged]) {
        if changes.is_empty() {
            return;
        }
        let record = self.records[position].as_ref();
        let Some(index) = self.elements.iter().position(|slot| {
            slot.as_ref()
                .is_some_and(|e| e.paired_record() == Some(record.id()))
        }) else {
            return;
        };
        if let Some(element) = self.elements[index].as_mut() {
            for change in changes {
                element.observe(record, change);
            }
        }
        self.relay(index);
    }

    /// Re-emit the element's pending `changed` events with its slot index.
    fn relay(&mut self, index: usize) {
        let Some(element) = self.elements.get_mut(index).and_then(Option::as_mut) else {
            return;
        };
        for event in element.drain_changes() {
            if let ElementEvent::Changed { element, summary } = event {
                self.emit_change(SlotChange {
                    group: self.name.clone(),
                    element: Some(element),
                    summary,
                    index,
                });
            }
        }
    }

    /// Vacate every non-static element left without a record.
    fn prune(&mut self) {
        for index in 0..self.elements.len() {
            let vacate = self.elements[index]
                .as_ref()
                .is_some_and(|e| !e.is_static() && !e.is_paired());
            if !vacate {
                continue;
            }
            if let Some(mut element) = self.elements[index].take() {
                element.events_mut().clear();
                log::debug!(
                    "segment '{}' pruned element {} from slot {}",
                    self.name,
                    element.id(),
                    index
                );
            }
            self.vacancies.insert(index);
            self.emit_change(SlotChange {
                group: self.name.clone(),
                element: None,
                summary: String::new(),
                index,
            });
        }
    }

    fn emit_change(&mut self, change: SlotChange) {
        self.events.emit(&GroupEvent::Changed(change.clone()));
        self.outbox.push(change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Acceptance, BasicView, STATUS_VIEW_TYPE};
    use crate::values::Asset;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn asset(id: &str, kind: &str) -> Box<dyn Record> {
        Box::new(Asset::new(id, kind, [("load", json!(0))]).unwrap())
    }

    fn static_element(acceptance: Acceptance) -> ViewElement {
        ViewElement::new("element", acceptance, Box::new(BasicView), true)
    }

    #[test]
    fn test_accept_release_reuses_slot() {
        let factory = ElementFactory::default();
        let mut group = Group::new("G");

        let admission = group.accept(asset("A", "pump"), &factory).unwrap();
        assert!(matches!(admission, Admission::Accepted { index: 0 }));
        assert_eq!(group.element(0).unwrap().paired_record(), Some("A"));

        assert!(group.release("A").unwrap());
        assert_eq!(group.len(), 1);
        assert!(group.elements()[0].is_none());

        group.accept(asset("B", "pump"), &factory).unwrap();
        assert_eq!(group.len(), 1);
        assert_eq!(group.element(0).unwrap().paired_record(), Some("B"));
    }

    #[test]
    fn test_first_vacancy_reused_before_append() {
        let factory = ElementFactory::default();
        let mut group = Group::new("G");
        for id in ["a", "b", "c"] {
            group.accept(asset(id, "pump"), &factory).unwrap();
        }
        group.release("c").unwrap();
        group.release("a").unwrap();

        let admission = group.accept(asset("d", "pump"), &factory).unwrap();
        assert!(matches!(admission, Admission::Accepted { index: 0 }));
        let admission = group.accept(asset("e", "pump"), &factory).unwrap();
        assert!(matches!(admission, Admission::Accepted { index: 2 }));
        let admission = group.accept(asset("f", "pump"), &factory).unwrap();
        assert!(matches!(admission, Admission::Accepted { index: 3 }));
        assert_eq!(group.element(1).unwrap().paired_record(), Some("b"));
    }

    #[test]
    fn test_release_twice_returns_false() {
        let factory = ElementFactory::default();
        let mut group = Group::new("G");
        group.accept(asset("A", "pump"), &factory).unwrap();
        assert!(group.release("A").unwrap());
        assert!(!group.release("A").unwrap());
        assert!(matches!(group.release(""), Err(BoardError::InvalidId(_))));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let factory = ElementFactory::default();
        let mut group = Group::new("G");
        group.accept(asset("A", "pump"), &factory).unwrap();
        let err = group.accept(asset("A", "pump"), &factory).unwrap_err();
        assert!(matches!(err, BoardError::DuplicateId { .. }));
        assert_eq!(group.records().count(), 1);
    }

    #[test]
    fn test_static_elements_first_fit() {
        let factory = ElementFactory::default();
        let mut group = Group::new("G")
            .with_static_element(static_element(Acceptance::kind("valve")))
            .with_static_element(static_element(Acceptance::kind("pump")))
            .with_static_element(static_element(Acceptance::kind("pump")));

        group.accept(asset("p1", "pump"), &factory).unwrap();
        assert_eq!(group.element(1).unwrap().paired_record(), Some("p1"));
        assert!(!group.element(2).unwrap().is_paired());

        group.accept(asset("p2", "pump"), &factory).unwrap();
        assert_eq!(group.element(2).unwrap().paired_record(), Some("p2"));

        // No static element left: a new one is manufactured.
        let admission = group.accept(asset("p3", "pump"), &factory).unwrap();
        assert!(matches!(admission, Admission::Accepted { index: 3 }));
        assert!(!group.element(3).unwrap().is_static());
    }

    #[test]
    fn test_static_elements_survive_release() {
        let factory = ElementFactory::default();
        let mut group = Group::new("G").with_static_element(static_element(Acceptance::Any));
        group.accept(asset("A", "pump"), &factory).unwrap();
        group.release("A").unwrap();

        let element = group.element(0).unwrap();
        assert!(element.is_static());
        assert!(!element.is_paired());
        assert_eq!(group.occupied(), 1);
    }

    #[test]
    fn test_exactly_one_element_paired_per_record() {
        let factory = ElementFactory::default();
        let mut group = Group::new("G").with_static_element(static_element(Acceptance::Any));
        for id in ["a", "b", "c"] {
            group.accept(asset(id, "pump"), &factory).unwrap();
        }
        for id in ["a", "b", "c"] {
            let paired = group
                .elements()
                .iter()
                .flatten()
                .filter(|e| e.paired_record() == Some(id))
                .count();
            assert_eq!(paired, 1);
        }
    }

    #[test]
    fn test_changes_carry_slot_index() {
        let factory = ElementFactory::default();
        let mut group = Group::new("G");
        group.accept(asset("a", "pump"), &factory).unwrap();
        group.accept(asset("b", "pump"), &factory).unwrap();
        group.drain_changes();

        group.release("a").unwrap();
        let changes = group.drain_changes();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].index, 0);
        assert!(changes[0].element.is_some());
        assert_eq!(changes[1].index, 0);
        assert_eq!(changes[1].element, None);
        assert_eq!(changes[1].summary, "");
    }

    #[test]
    fn test_group_events_emitted() {
        let factory = ElementFactory::default();
        let mut group = Group::new("G");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        group.events_mut().on_all("log", move |e: &GroupEvent| {
            sink.lock().unwrap().push(crate::events::BaseEvent::event_type(e));
        });

        group.accept(asset("a", "pump"), &factory).unwrap();
        group.release("a").unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["changed", "accepted", "changed", "changed", "released"]
        );
    }

    #[test]
    fn test_checksum_tracks_pruning_and_reoccupation() {
        let factory = ElementFactory::default();
        let mut group = Group::new("G");
        let empty = group.checksum();

        group.accept(asset("a", "pump"), &factory).unwrap();
        let occupied = group.checksum();
        assert_ne!(empty, occupied);

        group.release("a").unwrap();
        let vacant = group.checksum();
        assert_ne!(vacant, occupied);
        assert_ne!(vacant, empty);

        group.accept(asset("b", "pump"), &factory).unwrap();
        assert_ne!(group.checksum(), vacant);
    }

    #[test]
    fn test_attribute_updates_flow_to_status_element() {
        let mut factory = ElementFactory::default();
        factory
            .bind_kind(
                "pump",
                STATUS_VIEW_TYPE,
                json!({"attribute": "load", "warning": 70, "critical": 90}),
            )
            .unwrap();
        let mut group = Group::new("G");
        group.accept(asset("p", "pump"), &factory).unwrap();
        assert_eq!(group.element(0).unwrap().cached_summary(), "nominal|p");
        group.drain_changes();

        group.set_attribute("p", "load", json!(40), None).unwrap();
        assert!(group.drain_changes().is_empty());

        group.bulk_update("p", &json!({"load": 95}), false).unwrap();
        let changes = group.drain_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].summary, "critical|p");

        let err = group.set_attribute("q", "load", json!(1), None).unwrap_err();
        assert!(matches!(err, BoardError::UnknownRecord { .. }));
    }

    #[test]
    fn test_render_slot() {
        let factory = ElementFactory::default();
        let mut group = Group::new("G");
        group.accept(asset("a", "pump"), &factory).unwrap();
        let text = group.render(0, "text").unwrap().unwrap();
        assert!(text.ends_with(": a"));
        assert_eq!(group.render(5, "text").unwrap(), None);
    }

    #[test]
    fn test_factory_failure_leaves_record_unstored() {
        let factory = ElementFactory::default();
        let mut group = Group::new("G");
        let record = Asset::new("x", "pump", [("load", json!(0))])
            .unwrap()
            .with_view_type("gauge");
        let err = group.accept(Box::new(record), &factory).unwrap_err();
        assert!(matches!(err, BoardError::NoSuchViewType { .. }));
        assert!(!group.owns("x"));
        assert!(group.is_empty());
    }
}
