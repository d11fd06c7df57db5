//! The declared attribute store of a record.

use serde_json::{Map, Value};

use crate::error::{BoardError, Result};
use crate::events::ValueChanged;
use crate::utilities::json_path;
use crate::values::named_value::NamedValue;

/// Ordered collection of [`NamedValue`]s whose names are fixed at
/// construction time.
#[derive(Debug, Default)]
pub struct Attributes {
    values: Vec<NamedValue>,
}

impl Attributes {
    /// Declare attributes from `(name, default)` pairs.
    ///
    /// Names must be non-empty and unique.
    pub fn declare<I, S>(declared: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let mut attributes = Self::default();
        for (name, default) in declared {
            attributes.push(name.into(), default)?;
        }
        Ok(attributes)
    }

    pub(crate) fn push(&mut self, name: String, default: Value) -> Result<()> {
        if name.is_empty() {
            return Err(BoardError::InvalidInput(
                "attribute names must be non-empty".to_string(),
            ));
        }
        if self.contains(&name) {
            return Err(BoardError::InvalidInput(format!(
                "attribute '{name}' declared twice"
            )));
        }
        if let Some(clash) = self
            .names()
            .find(|other| is_path_prefix(other, &name) || is_path_prefix(&name, other))
        {
            return Err(BoardError::InvalidInput(format!(
                "attribute '{name}' overlaps '{clash}' as a dotted path"
            )));
        }
        self.values.push(NamedValue::new(name, default));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&NamedValue> {
        self.values.iter().find(|v| v.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut NamedValue> {
        self.values.iter_mut().find(|v| v.name() == name)
    }

    /// Declared names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|v| v.name())
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedValue> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Write one declared attribute.
    pub fn set(
        &mut self,
        name: &str,
        value: Value,
        timestamp: Option<&Value>,
    ) -> Result<ValueChanged> {
        let target = self
            .get_mut(name)
            .ok_or_else(|| BoardError::UnknownAttribute {
                name: name.to_string(),
            })?;
        target.write(value, timestamp)
    }

    /// Write every declared attribute found in `object`.
    ///
    /// By default each declared name is looked up as a top-level key. With
    /// `reverse_keyed`, each declared name is treated as a dotted path into
    /// `object`, so an attribute named `"position.lat"` pulls from
    /// `{"position": {"lat": ..}}`. Keys that are not declared, and declared
    /// names that do not resolve, are skipped. All writes share one
    /// timestamp.
    pub fn bulk_update(&mut self, object: &Value, reverse_keyed: bool) -> Result<Vec<ValueChanged>> {
        let map = object.as_object().ok_or_else(|| {
            BoardError::InvalidInput(format!("bulk update expects an object, got {object}"))
        })?;

        let now = chrono::Utc::now();
        let mut changes = Vec::new();
        for value in self.values.iter_mut() {
            let found = if reverse_keyed {
                json_path::resolve(object, value.name())
            } else {
                map.get(value.name())
            };
            if let Some(found) = found {
                changes.push(value.write_at(found.clone(), now));
            }
        }
        Ok(changes)
    }

    /// Export current values.
    ///
    /// With `nested`, dotted names are expanded into nested objects so that
    /// the export round-trips through a reverse-keyed
    /// [`bulk_update`](Self::bulk_update).
    pub fn to_object(&self, nested: bool) -> Value {
        let mut root = Map::new();
        for value in &self.values {
            if nested {
                json_path::insert(&mut root, value.name(), value.read().clone());
            } else {
                root.insert(value.name().to_string(), value.read().clone());
            }
        }
        Value::Object(root)
    }
}

/// Whether `prefix` names an object that `path` descends into
/// (`"pos"` for `"pos.lat"`).
fn is_path_prefix(prefix: &str, path: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('.'))
}
