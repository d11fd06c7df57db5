//! Dotted-path helpers over `serde_json::Value`.

use serde_json::{Map, Value};

/// Resolve a dotted path such as `"position.lat"` inside `object`.
///
/// Each segment indexes an object key. Returns `None` as soon as a segment is
/// missing or the current value is not an object.
pub fn resolve<'a>(object: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(object, |current, segment| current.as_object()?.get(segment))
}

/// Insert `value` at a dotted path, creating intermediate objects.
///
/// A non-object value sitting where an intermediate object is needed is
/// replaced.
pub fn insert(root: &mut Map<String, Value>, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = root;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = match slot {
            Value::Object(map) => map,
            _ => return,
        };
    }
}
