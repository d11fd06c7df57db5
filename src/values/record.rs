//! Records ("assets"): identified bags of named values.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BoardError, Result};
use crate::events::ValueChanged;
use crate::values::attributes::Attributes;
use crate::values::named_value::NamedValue;

/// A WGS84 position: degrees latitude/longitude, meters altitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub alt: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64, alt: f64) -> Self {
        Self { lat, lon, alt }
    }
}

/// An identified external fact to be summarised.
///
/// A record is owned by exactly one segment for its lifetime. Its id is
/// immutable and unique within that segment.
pub trait Record: Send + fmt::Debug {
    /// Stable, non-empty identifier.
    fn id(&self) -> &str;

    /// Runtime type name, matched by element acceptance predicates.
    fn kind(&self) -> &str;

    /// Preferred element type for the factory, if the record declares one.
    fn view_type(&self) -> Option<&str> {
        None
    }

    fn attributes(&self) -> &Attributes;

    fn attributes_mut(&mut self) -> &mut Attributes;

    /// Geographic position, if the record has one. Only geo-fenced segments
    /// consult this.
    fn position(&self) -> Option<Position> {
        None
    }

    fn get(&self, name: &str) -> Option<&NamedValue> {
        self.attributes().get(name)
    }

    fn set(&mut self, name: &str, value: Value, timestamp: Option<&Value>) -> Result<ValueChanged> {
        self.attributes_mut().set(name, value, timestamp)
    }

    fn bulk_update(&mut self, object: &Value, reverse_keyed: bool) -> Result<Vec<ValueChanged>> {
        self.attributes_mut().bulk_update(object, reverse_keyed)
    }

    fn to_object(&self, nested: bool) -> Value {
        self.attributes().to_object(nested)
    }
}

fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(BoardError::InvalidId(id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Asset
// ---------------------------------------------------------------------------

/// The base record. It never reports a position.
#[derive(Debug)]
pub struct Asset {
    id: String,
    kind: String,
    view_type: Option<String>,
    attributes: Attributes,
}

impl Asset {
    /// Create an asset with declared `(name, default)` attributes.
    pub fn new<I, S>(id: impl Into<String>, kind: impl Into<String>, declared: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let id = id.into();
        validate_id(&id)?;
        Ok(Self {
            id,
            kind: kind.into(),
            view_type: None,
            attributes: Attributes::declare(declared)?,
        })
    }

    /// Ask the factory for a specific element type when no static element
    /// takes this asset.
    pub fn with_view_type(mut self, view_type: impl Into<String>) -> Self {
        self.view_type = Some(view_type.into());
        self
    }
}

impl Record for Asset {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn view_type(&self) -> Option<&str> {
        self.view_type.as_deref()
    }

    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}

// ---------------------------------------------------------------------------
// TrackedAsset
// ---------------------------------------------------------------------------

pub const LAT_ATTRIBUTE: &str = "position.lat";
pub const LON_ATTRIBUTE: &str = "position.lon";
pub const ALT_ATTRIBUTE: &str = "position.alt";

/// An asset with a position, read from its `position.lat`,
/// `position.lon` and `position.alt` attributes.
#[derive(Debug)]
pub struct TrackedAsset {
    inner: Asset,
}

impl TrackedAsset {
    /// Create a tracked asset. The three position attributes are declared in
    /// addition to `declared` and must not appear in it.
    pub fn new<I, S>(id: impl Into<String>, kind: impl Into<String>, declared: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let mut inner = Asset::new(id, kind, declared)?;
        for name in [LAT_ATTRIBUTE, LON_ATTRIBUTE, ALT_ATTRIBUTE] {
            inner.attributes.push(name.to_string(), Value::Null)?;
        }
        Ok(Self { inner })
    }

    pub fn with_view_type(self, view_type: impl Into<String>) -> Self {
        Self {
            inner: self.inner.with_view_type(view_type),
        }
    }

    /// Write all three coordinates at once.
    pub fn move_to(&mut self, position: Position) -> Result<Vec<ValueChanged>> {
        let object = serde_json::json!({ "position": position });
        self.bulk_update(&object, true)
    }
}

impl Record for TrackedAsset {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn kind(&self) -> &str {
        self.inner.kind()
    }

    fn view_type(&self) -> Option<&str> {
        self.inner.view_type()
    }

    fn attributes(&self) -> &Attributes {
        self.inner.attributes()
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        self.inner.attributes_mut()
    }

    fn position(&self) -> Option<Position> {
        let coordinate = |name: &str| self.get(name).and_then(|v| v.read().as_f64());
        let lat = coordinate(LAT_ATTRIBUTE)?;
        let lon = coordinate(LON_ATTRIBUTE)?;
        let alt = coordinate(ALT_ATTRIBUTE).unwrap_or(0.0);
        Some(Position { lat, lon, alt })
    }
}
