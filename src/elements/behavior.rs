//! The overridable part of a view element: how it summarises and renders.

use std::fmt;

use serde_json::{json, Value};

use crate::elements::render::RenderFormat;
use crate::error::{BoardError, Result};
use crate::events::ValueChanged;
use crate::values::Record;

/// What a behaviour can see of its element when summarising or rendering.
#[derive(Clone, Copy)]
pub struct ElementContext<'a> {
    pub element_id: &'a str,
    pub view_type: &'a str,
    pub is_static: bool,
    /// The paired record, if any.
    pub record: Option<&'a dyn Record>,
}

impl<'a> ElementContext<'a> {
    pub fn record_id(&self) -> Option<&'a str> {
        self.record.map(|r| r.id())
    }
}

impl fmt::Debug for ElementContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementContext")
            .field("element_id", &self.element_id)
            .field("view_type", &self.view_type)
            .field("is_static", &self.is_static)
            .field("record", &self.record_id())
            .finish()
    }
}

/// The summary every behaviour falls back to: element identity plus paired
/// record identity.
pub fn default_summary(ctx: &ElementContext<'_>) -> String {
    format!(
        "{}:{}|{}",
        ctx.view_type,
        ctx.element_id,
        ctx.record_id().unwrap_or("")
    )
}

/// Opinionated, stateful view logic plugged into a
/// [`ViewElement`](crate::elements::ViewElement).
///
/// `summary` must return the same string for two states that should not
/// trigger a visual update, and different strings otherwise.
pub trait ElementBehavior: Send + fmt::Debug {
    fn summary(&self, ctx: &ElementContext<'_>) -> String {
        default_summary(ctx)
    }

    /// React to an attribute write on the paired record. The element
    /// re-checks its summary afterwards.
    fn observe(&mut self, _record: &dyn Record, _change: &ValueChanged) {}

    /// Called after a record is bound, before the summary is re-checked.
    fn paired(&mut self, _record: &dyn Record) {}

    /// Called after the record is released, before the summary is re-checked.
    fn unpaired(&mut self) {}

    fn supports(&self, format: RenderFormat) -> bool {
        matches!(format, RenderFormat::Json | RenderFormat::Text)
    }

    fn render(&self, format: RenderFormat, ctx: &ElementContext<'_>) -> Result<String> {
        match format {
            RenderFormat::Json => {
                let record = ctx
                    .record
                    .map(|r| json!({ "id": r.id(), "kind": r.kind(), "values": r.to_object(false) }))
                    .unwrap_or(Value::Null);
                let body = json!({
                    "id": ctx.element_id,
                    "view_type": ctx.view_type,
                    "static": ctx.is_static,
                    "summary": self.summary(ctx),
                    "record": record,
                });
                Ok(serde_json::to_string(&body)?)
            }
            RenderFormat::Text => Ok(format!(
                "{} {}: {}",
                ctx.view_type,
                ctx.element_id,
                ctx.record_id().unwrap_or("-")
            )),
            other => Err(BoardError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }
}

/// The base view: default summary and rendering, no extra state.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicView;

impl ElementBehavior for BasicView {}
