/// Dotted key-path addressing into payload documents
///
/// Steps name where their input comes from and where their output goes with
/// paths like `$.validationResult` or `user.profile`. A path is a sequence of
/// mapping keys; there is no array indexing and no escaping. `""`, `"$"` and
/// `"$."` all address the document root.

use serde_json::{Map, Value};
use std::fmt;

/// A parsed payload path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadPath {
    segments: Vec<String>,
}

impl PayloadPath {
    /// The document root
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a path; an optional `$.` or `$` prefix is stripped
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let body = trimmed
            .strip_prefix("$.")
            .or_else(|| trimmed.strip_prefix('$'))
            .unwrap_or(trimmed);

        if body.is_empty() {
            return Self::root();
        }

        Self {
            segments: body.split('.').map(str::to_string).collect(),
        }
    }

    /// Parse an optional step path; None is the root
    pub fn from_option(raw: Option<&str>) -> Self {
        raw.map(Self::parse).unwrap_or_default()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for PayloadPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str("$")
        } else {
            write!(f, "$.{}", self.segments.join("."))
        }
    }
}

/// Read the value at `path`
///
/// Returns None as soon as a segment is missing or a non-mapping is traversed.
pub fn get<'a>(document: &'a Value, path: &PayloadPath) -> Option<&'a Value> {
    path.segments
        .iter()
        .try_fold(document, |current, key| current.as_object()?.get(key))
}

/// Write `value` at `path` and return the updated document
///
/// At the root a mapping value is shallow-merged into a mapping document and
/// anything else replaces the document. Below the root, missing or
/// non-mapping intermediate nodes are replaced with empty mappings.
pub fn set(document: Value, path: &PayloadPath, value: Value) -> Value {
    if path.is_root() {
        return merge_root(document, value);
    }
    set_nested(document, &path.segments, value)
}

/// Assign `value` below `node`, turning `node` into a mapping if it is not one
fn set_nested(node: Value, segments: &[String], value: Value) -> Value {
    let Some((key, rest)) = segments.split_first() else {
        return value;
    };

    let mut map = match node {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    // Taking the child in place keeps the key's position in the mapping
    let slot = map.entry(key.clone()).or_insert(Value::Null);
    let child = std::mem::take(slot);
    *slot = set_nested(child, rest, value);

    Value::Object(map)
}

fn merge_root(document: Value, value: Value) -> Value {
    match (document, value) {
        (Value::Object(mut base), Value::Object(patch)) => {
            for (key, v) in patch {
                base.insert(key, v);
            }
            Value::Object(base)
        }
        (_, value) => value,
    }
}
