//! Helpers for assembling event property maps before they are serialized.

use serde_json::{Map, Value};

/// String-keyed JSON properties attached to an event.
pub type Properties = Map<String, Value>;

/// Copy every top-level entry of `defaults` whose key is missing from `target`.
///
/// Keys already present in `target` keep their value, nested maps are not merged.
/// `target` is consumed and returned, with `None` leaving it untouched.
pub fn merge_defaults(defaults: Option<&Properties>, mut target: Properties) -> Properties {
    let Some(defaults) = defaults else {
        return target;
    };

    for (key, value) in defaults {
        if !target.contains_key(key) {
            target.insert(key.clone(), value.clone());
        }
    }

    target
}

/// Recursively copy a property map so that no nested map or list is shared with `properties`.
pub fn deep_copy(properties: &Properties) -> Properties {
    copy_map(properties)
}

/// Deep copy an arbitrary JSON value that is expected to hold properties.
///
/// Anything other than an object yields an empty map.
pub fn deep_copy_value(value: &Value) -> Properties {
    match copy_value(value) {
        Value::Object(properties) => properties,
        _ => Properties::new(),
    }
}

fn copy_map(map: &Properties) -> Properties {
    map.iter()
        .map(|(key, value)| (key.clone(), copy_value(value)))
        .collect()
}

fn copy_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(copy_map(map)),
        Value::Array(items) => Value::Array(items.iter().map(copy_value).collect()),
        Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Null => value.clone(),
    }
}
