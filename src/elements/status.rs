//! Colour-coded status view: buckets one numeric attribute into a condition.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::elements::behavior::{ElementBehavior, ElementContext};
use crate::elements::render::RenderFormat;
use crate::error::Result;
use crate::events::ValueChanged;
use crate::values::Record;

/// Health condition of a status element, worst last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    /// No record, or the attribute is not numeric.
    Unknown,
    Nominal,
    Warning,
    Critical,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Unknown => "unknown",
            Condition::Nominal => "nominal",
            Condition::Warning => "warning",
            Condition::Critical => "critical",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Condition::Unknown => "grey",
            Condition::Nominal => "green",
            Condition::Warning => "amber",
            Condition::Critical => "red",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds for a [`StatusView`], deserialised from factory parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusThresholds {
    /// Attribute the condition is computed from.
    pub attribute: String,
    pub warning: f64,
    pub critical: f64,
    /// Lower values are worse (e.g. battery level).
    #[serde(default)]
    pub inverted: bool,
}

impl StatusThresholds {
    pub fn classify(&self, reading: f64) -> Condition {
        let (warn, crit) = if self.inverted {
            (reading <= self.warning, reading <= self.critical)
        } else {
            (reading >= self.warning, reading >= self.critical)
        };
        if crit {
            Condition::Critical
        } else if warn {
            Condition::Warning
        } else {
            Condition::Nominal
        }
    }
}

/// Element behaviour that reports a [`Condition`] instead of raw values, so
/// readings that stay inside one band never trigger an update.
#[derive(Debug, Clone)]
pub struct StatusView {
    thresholds: StatusThresholds,
    condition: Condition,
    reading: Option<f64>,
}

impl StatusView {
    pub fn new(thresholds: StatusThresholds) -> Self {
        Self {
            thresholds,
            condition: Condition::Unknown,
            reading: None,
        }
    }

    /// Build from factory parameters (`attribute`, `warning`, `critical`,
    /// optional `inverted`).
    pub fn from_params(params: &Value) -> Result<Self> {
        let thresholds: StatusThresholds = serde_json::from_value(params.clone())?;
        Ok(Self::new(thresholds))
    }

    pub fn condition(&self) -> Condition {
        self.condition
    }

    pub fn reading(&self) -> Option<f64> {
        self.reading
    }

    fn refresh(&mut self, record: &dyn Record) {
        self.reading = record
            .get(&self.thresholds.attribute)
            .and_then(|v| v.read().as_f64());
        self.condition = match self.reading {
            Some(r) => self.thresholds.classify(r),
            None => Condition::Unknown,
        };
    }

    /// Condition as seen in `ctx`: unknown whenever no record is paired.
    fn effective(&self, ctx: &ElementContext<'_>) -> Condition {
        match ctx.record {
            Some(_) => self.condition,
            None => Condition::Unknown,
        }
    }
}

impl ElementBehavior for StatusView {
    fn summary(&self, ctx: &ElementContext<'_>) -> String {
        format!("{}|{}", self.effective(ctx), ctx.record_id().unwrap_or(""))
    }

    fn observe(&mut self, record: &dyn Record, change: &ValueChanged) {
        if change.name == self.thresholds.attribute {
            self.refresh(record);
        }
    }

    fn supports(&self, _format: RenderFormat) -> bool {
        true
    }

    fn render(&self, format: RenderFormat, ctx: &ElementContext<'_>) -> Result<String> {
        let condition = self.effective(ctx);
        let label = ctx.record_id().unwrap_or("-");
        Ok(match format {
            RenderFormat::Json => serde_json::to_string(&json!({
                "id": ctx.element_id,
                "record": ctx.record_id(),
                "attribute": self.thresholds.attribute,
                "reading": self.reading,
                "condition": condition,
                "color": condition.color(),
            }))?,
            RenderFormat::Text => format!("[{}] {}", condition.as_str().to_uppercase(), label),
            RenderFormat::Html => format!(
                "<span class=\"status status-{}\" data-element=\"{}\">{}</span>",
                condition.color(),
                ctx.element_id,
                label
            ),
        })
    }

    /// Pairing recomputes from the record's current values.
    fn paired(&mut self, record: &dyn Record) {
        self.refresh(record);
    }

    fn unpaired(&mut self) {
        self.reading = None;
        self.condition = Condition::Unknown;
    }
}
