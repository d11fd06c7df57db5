//! View elements: cached, opinionated views bound to at most one record.

use std::fmt;

use uuid::Uuid;

use crate::elements::acceptance::Acceptance;
use crate::elements::behavior::{ElementBehavior, ElementContext};
use crate::elements::render::RenderFormat;
use crate::error::{BoardError, Result};
use crate::events::{ElementEvent, EventBus, ValueChanged};
use crate::values::Record;

/// A stateful view bound to at most one record at a time.
///
/// The element stores the paired record's id; the owning segment passes the
/// record itself into every call that needs it. Change detection is a string
/// comparison of the behaviour's summary against the cached one
/// ([`dirty`](Self::dirty)).
///
/// Static elements are created with their segment and survive unpaired.
/// Non-static elements exist to represent exactly one record and are pruned
/// by the segment once that record is released.
pub struct ViewElement {
    id: String,
    view_type: String,
    is_static: bool,
    acceptance: Acceptance,
    paired: Option<String>,
    cached_summary: String,
    behavior: Box<dyn ElementBehavior>,
    events: EventBus<ElementEvent>,
    /// `changed` events not yet collected by the owning segment.
    outbox: Vec<ElementEvent>,
}

impl fmt::Debug for ViewElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewElement")
            .field("id", &self.id)
            .field("view_type", &self.view_type)
            .field("is_static", &self.is_static)
            .field("acceptance", &self.acceptance)
            .field("paired", &self.paired)
            .field("cached_summary", &self.cached_summary)
            .field("behavior", &self.behavior)
            .finish()
    }
}

impl ViewElement {
    pub fn new(
        view_type: impl Into<String>,
        acceptance: Acceptance,
        behavior: Box<dyn ElementBehavior>,
        is_static: bool,
    ) -> Self {
        let mut element = Self {
            id: Uuid::new_v4().to_string(),
            view_type: view_type.into(),
            is_static,
            acceptance,
            paired: None,
            cached_summary: String::new(),
            behavior,
            events: EventBus::new(),
            outbox: Vec::new(),
        };
        element.cached_summary = element.summary(None);
        element
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn view_type(&self) -> &str {
        &self.view_type
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub(crate) fn set_static(&mut self, is_static: bool) {
        self.is_static = is_static;
    }

    pub fn acceptance(&self) -> &Acceptance {
        &self.acceptance
    }

    /// Id of the paired record.
    pub fn paired_record(&self) -> Option<&str> {
        self.paired.as_deref()
    }

    pub fn is_paired(&self) -> bool {
        self.paired.is_some()
    }

    /// Whether this element would pair with `record` right now.
    pub fn accepts(&self, record: &dyn Record) -> bool {
        self.paired.is_none() && self.acceptance.matches(record.kind())
    }

    pub fn behavior(&self) -> &dyn ElementBehavior {
        self.behavior.as_ref()
    }

    fn context<'a>(&'a self, record: Option<&'a dyn Record>) -> ElementContext<'a> {
        ElementContext {
            element_id: &self.id,
            view_type: &self.view_type,
            is_static: self.is_static,
            record,
        }
    }

    // -----------------------------------------------------------------------
    // Pairing
    // -----------------------------------------------------------------------

    /// Bind `record` to this element.
    ///
    /// Returns `false` without side effects when already paired or when the
    /// record's kind fails the acceptance predicate. A `dry_run` only tests
    /// acceptance. Otherwise emits `paired` and re-checks the summary.
    pub fn pair(&mut self, record: &dyn Record, dry_run: bool) -> bool {
        if !self.accepts(record) {
            return false;
        }
        if dry_run {
            return true;
        }

        self.paired = Some(record.id().to_string());
        self.behavior.paired(record);
        self.events.emit(&ElementEvent::Paired {
            element: self.id.clone(),
            record: record.id().to_string(),
        });
        self.dirty(Some(record));
        true
    }

    /// Release the paired record, emit `unpaired` and re-check the summary.
    pub fn unpair(&mut self) -> Result<String> {
        let record = self.paired.take().ok_or_else(|| BoardError::NothingToUnpair {
            element: self.id.clone(),
        })?;
        self.behavior.unpaired();
        self.events.emit(&ElementEvent::Unpaired {
            element: self.id.clone(),
            record: record.clone(),
        });
        self.dirty(None);
        Ok(record)
    }

    // -----------------------------------------------------------------------
    // Change detection
    // -----------------------------------------------------------------------

    /// Compute the summary for the current state with `record` as the
    /// paired record.
    pub fn summary(&self, record: Option<&dyn Record>) -> String {
        self.behavior.summary(&self.context(record))
    }

    /// Last observed summary.
    pub fn cached_summary(&self) -> &str {
        &self.cached_summary
    }

    /// Whether `record` is the one this element holds (`None` when unpaired).
    fn holds(&self, record: Option<&dyn Record>) -> bool {
        if record.map(|r| r.id()) == self.paired.as_deref() {
            return true;
        }
        log::warn!(
            "element {} holds {:?}, ignoring state of {:?}",
            self.id,
            self.paired,
            record.map(|r| r.id())
        );
        false
    }

    /// Recompute the summary and emit `changed` if it differs from the cache.
    ///
    /// Must be called whenever state that could affect the summary changes.
    /// Returns whether a change was emitted; a `record` other than the
    /// paired one is ignored.
    pub fn dirty(&mut self, record: Option<&dyn Record>) -> bool {
        if !self.holds(record) {
            return false;
        }
        let summary = self.summary(record);
        if summary == self.cached_summary {
            return false;
        }
        self.cached_summary = summary;
        let event = ElementEvent::Changed {
            element: self.id.clone(),
            summary: self.cached_summary.clone(),
        };
        self.events.emit(&event);
        self.outbox.push(event);
        true
    }

    /// Forward an attribute write on the paired record to the behaviour,
    /// then re-check the summary. Writes on any other record are ignored.
    pub fn observe(&mut self, record: &dyn Record, change: &ValueChanged) -> bool {
        if !self.holds(Some(record)) {
            return false;
        }
        self.behavior.observe(record, change);
        self.dirty(Some(record))
    }

    /// Take the `changed` events emitted since the last call.
    pub(crate) fn drain_changes(&mut self) -> Vec<ElementEvent> {
        std::mem::take(&mut self.outbox)
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    /// Render in the named format (`"json"`, `"text"`, `"html"`).
    pub fn render(&self, format: &str, record: Option<&dyn Record>) -> Result<String> {
        let format: RenderFormat = format.parse()?;
        if !self.behavior.supports(format) {
            return Err(BoardError::UnsupportedFormat {
                format: format.to_string(),
            });
        }
        self.behavior.render(format, &self.context(record))
    }

    pub fn events(&self) -> &EventBus<ElementEvent> {
        &self.events
    }

    /// Subscribe or unsubscribe handlers.
    pub fn events_mut(&mut self) -> &mut EventBus<ElementEvent> {
        &mut self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::behavior::BasicView;
    use crate::elements::status::{StatusThresholds, StatusView};
    use crate::values::Asset;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn basic(acceptance: Acceptance) -> ViewElement {
        ViewElement::new("element", acceptance, Box::new(BasicView), false)
    }

    fn pump(id: &str) -> Asset {
        Asset::new(id, "pump", [("load", json!(0))]).unwrap()
    }

    #[test]
    fn test_pair_emits_paired_then_changed() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut element = basic(Acceptance::Any);
        let sink = seen.clone();
        element
            .events_mut()
            .on_all("log", move |e: &ElementEvent| sink.lock().unwrap().push(e.clone()));

        let record = pump("p-1");
        assert!(element.pair(&record, false));
        assert_eq!(element.paired_record(), Some("p-1"));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(matches!(&seen[0], ElementEvent::Paired { record, .. } if record == "p-1"));
        assert!(matches!(&seen[1], ElementEvent::Changed { summary, .. } if summary.ends_with("|p-1")));
    }

    #[test]
    fn test_pair_fails_closed() {
        let mut element = basic(Acceptance::kind("valve"));
        let record = pump("p-1");
        assert!(!element.pair(&record, false));
        assert!(!element.is_paired());

        let mut element = basic(Acceptance::Any);
        assert!(element.pair(&record, false));
        let other = pump("p-2");
        assert!(!element.pair(&other, false));
        assert_eq!(element.paired_record(), Some("p-1"));
    }

    #[test]
    fn test_dry_run_does_not_bind() {
        let mut element = basic(Acceptance::Any);
        let record = pump("p-1");
        assert!(element.pair(&record, true));
        assert!(!element.is_paired());
        assert!(element.drain_changes().is_empty());
    }

    #[test]
    fn test_unpair_requires_pairing() {
        let mut element = basic(Acceptance::Any);
        assert!(matches!(
            element.unpair(),
            Err(BoardError::NothingToUnpair { .. })
        ));

        let record = pump("p-1");
        element.pair(&record, false);
        let summary_paired = element.cached_summary().to_string();
        assert_eq!(element.unpair().unwrap(), "p-1");
        assert_ne!(element.cached_summary(), summary_paired);
        assert_eq!(element.drain_changes().len(), 2);
    }

    #[test]
    fn test_dirty_only_emits_on_summary_change() {
        let mut element = basic(Acceptance::Any);
        let record = pump("p-1");
        element.pair(&record, false);
        element.drain_changes();
        assert!(!element.dirty(Some(&record)));
        assert!(element.drain_changes().is_empty());
    }

    #[test]
    fn test_foreign_record_is_ignored() {
        let view = StatusView::new(StatusThresholds {
            attribute: "load".into(),
            warning: 70.0,
            critical: 90.0,
            inverted: false,
        });
        let mut element = ViewElement::new("status", Acceptance::Any, Box::new(view), false);
        let paired = pump("p-1");
        element.pair(&paired, false);
        element.drain_changes();

        let mut stranger = pump("p-2");
        let change = stranger.set("load", json!(95), None).unwrap();
        assert!(!element.observe(&stranger, &change));
        assert!(!element.dirty(Some(&stranger)));
        assert!(!element.dirty(None));
        assert_eq!(element.cached_summary(), "nominal|p-1");
        assert!(element.drain_changes().is_empty());

        let mut unpaired = basic(Acceptance::Any);
        assert!(!unpaired.dirty(Some(&paired)));
    }

    #[test]
    fn test_status_element_tracks_bands() {
        let view = StatusView::new(StatusThresholds {
            attribute: "load".into(),
            warning: 70.0,
            critical: 90.0,
            inverted: false,
        });
        let mut element = ViewElement::new("status", Acceptance::Any, Box::new(view), false);
        let mut record = pump("p-1");
        element.pair(&record, false);
        assert_eq!(element.cached_summary(), "nominal|p-1");

        let change = record.set("load", json!(50), None).unwrap();
        assert!(!element.observe(&record, &change));

        let change = record.set("load", json!(75), None).unwrap();
        assert!(element.observe(&record, &change));
        assert_eq!(element.cached_summary(), "warning|p-1");

        let html = element.render("html", Some(&record)).unwrap();
        assert!(html.contains("status-amber"));
    }

    #[test]
    fn test_render_formats() {
        let mut element = basic(Acceptance::Any);
        let record = pump("p-1");
        element.pair(&record, false);

        let json_out = element.render("json", Some(&record)).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json_out).unwrap();
        assert_eq!(parsed["record"]["id"], json!("p-1"));
        assert_eq!(parsed["summary"], json!(element.cached_summary()));

        assert!(element.render("text", Some(&record)).unwrap().ends_with("p-1"));
        assert!(matches!(
            element.render("html", Some(&record)),
            Err(BoardError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            element.render("svg", Some(&record)),
            Err(BoardError::UnsupportedFormat { .. })
        ));
    }
}
