//! A single timestamped attribute.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::error::{BoardError, Result};
use crate::events::{EventBus, ValueChanged};

/// A named attribute with a default, a current value and the time of its
/// last write.
///
/// Reads return the default until the first write. Every write emits a
/// [`ValueChanged`] event, even when the stored value does not change;
/// suppression of no-op updates happens at the element summary layer.
#[derive(Debug)]
pub struct NamedValue {
    name: String,
    value: Option<Value>,
    default: Value,
    timestamp: Option<DateTime<Utc>>,
    events: EventBus<ValueChanged>,
}

impl NamedValue {
    /// Declare a value with the given default.
    pub fn new(name: impl Into<String>, default: Value) -> Self {
        Self {
            name: name.into(),
            value: None,
            default,
            timestamp: None,
            events: EventBus::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value, or the default if never written.
    pub fn read(&self) -> &Value {
        self.value.as_ref().unwrap_or(&self.default)
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }

    /// Time of the last write; `None` until the first write.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// Whether the value has been written at least once.
    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Write a value.
    ///
    /// `timestamp` may be omitted (meaning now), an RFC 3339 string, or a
    /// number of milliseconds since the Unix epoch. Anything else fails with
    /// [`BoardError::InvalidTimestamp`] and leaves the value untouched.
    pub fn write(&mut self, value: Value, timestamp: Option<&Value>) -> Result<ValueChanged> {
        let at = match timestamp {
            None | Some(Value::Null) => Utc::now(),
            Some(raw) => parse_timestamp(raw)?,
        };
        Ok(self.write_at(value, at))
    }

    /// Write a value with an already-resolved timestamp.
    pub fn write_at(&mut self, value: Value, at: DateTime<Utc>) -> ValueChanged {
        let old = self.read().clone();
        self.value = Some(value.clone());
        self.timestamp = Some(at);

        let event = ValueChanged {
            name: self.name.clone(),
            old,
            new: value,
            timestamp: at,
        };
        self.events.emit(&event);
        event
    }

    pub fn events(&self) -> &EventBus<ValueChanged> {
        &self.events
    }

    /// Subscribe or unsubscribe handlers.
    pub fn events_mut(&mut self) -> &mut EventBus<ValueChanged> {
        &mut self.events
    }
}

/// Parse a date-like JSON value.
pub fn parse_timestamp(raw: &Value) -> Result<DateTime<Utc>> {
    let invalid = || BoardError::InvalidTimestamp {
        value: raw.to_string(),
    };
    match raw {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| invalid()),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .ok_or_else(invalid),
        _ => Err(invalid()),
    }
}
