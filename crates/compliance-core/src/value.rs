//! Property path resolution over resource descriptions
//!
//! Resource descriptions are `serde_json::Value` trees. A path such as
//! `properties.networkAcls.ipRules.0.value` walks map keys and, when the
//! current node is an array and the segment is a non-negative integer,
//! list positions.

use serde_json::Value;

/// A resource description as returned by an inventory query
pub type ResourceDescription = Value;

/// Outcome of resolving a property path
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolved<'a> {
    Found(&'a Value),
    NotFound,
}

impl<'a> Resolved<'a> {
    pub fn value(&self) -> Option<&'a Value> {
        match self {
            Resolved::Found(v) => Some(v),
            Resolved::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolved::Found(_))
    }
}

/// Resolve a dot-separated path against a value.
///
/// Resolution is all-or-nothing: a missing key, an out-of-range index or an
/// attempt to index into a scalar yields `NotFound`. An empty path resolves
/// to the value itself.
pub fn resolve<'a>(value: &'a Value, path: &str) -> Resolved<'a> {
    if path.is_empty() {
        return Resolved::Found(value);
    }

    let mut current = value;
    for segment in path.split('.') {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|idx| items.get(idx)),
            _ => None,
        };

        match next {
            Some(v) => current = v,
            None => return Resolved::NotFound,
        }
    }

    Resolved::Found(current)
}

/// Short human-readable rendering of a value for explanations and reports
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => format!(
            "[{}]",
            items.iter().map(display_value).collect::<Vec<_>>().join(",")
        ),
        other => other.to_string(),
    }
}

/// Pick a label for a resource: its `name`, else its `id`
pub fn resource_label(resource: &Value) -> Option<String> {
    ["name", "id"]
        .iter()
        .find_map(|key| resource.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}
