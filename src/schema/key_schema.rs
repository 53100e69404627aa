//! Decoding of the single-table key schema.
//!
//! Partition and sort keys encode one or more logical IDs as `#`-joined
//! `LABEL#value` pairs (ex. `KEYID#abc#APITYPE#zoning`). `schema_unmarshal`
//! strips the keys from an item and re-exposes the encoded IDs as named
//! fields.

use serde_json::Value;

use super::{
    JsonMap, PARTITION_KEY, SET_VALUES_FIELD, SET_WRAPPER_FIELD, SET_WRAPPER_NAME, SORT_KEY,
};

const KEY_DELIMITER: char = '#';

/// A known key layout: the labels it must contain (in order), and the output
/// field each label's value is written to.
struct KeyPattern {
    labels: &'static [&'static str],
    fields: &'static [&'static str],
}

impl KeyPattern {
    fn is_multi_field(&self) -> bool {
        self.fields.len() > 1
    }

    /// Matches the full key (`LABEL#value[#LABEL#value...]`), returning the
    /// captured values in label order.
    fn capture<'a>(&self, key: &'a str) -> Option<Vec<&'a str>> {
        let parts: Vec<&str> = key.split(KEY_DELIMITER).collect();
        if parts.len() != self.labels.len() * 2 {
            return None;
        }
        parts
            .chunks(2)
            .zip(self.labels.iter())
            .map(|(pair, label)| match pair {
                [found, value] if found == label && is_valid_value(value) => Some(*value),
                _ => None,
            })
            .collect()
    }
}

// Evaluated in order, first match wins. The labels are currently mutually
// exclusive, so order only matters if overlapping layouts are added.
const KEY_PATTERNS: &[KeyPattern] = &[
    KeyPattern {
        labels: &["KEYID", "APITYPE"],
        fields: &["keyId", "apiType"],
    },
    KeyPattern {
        labels: &["DATE"],
        fields: &["date"],
    },
    KeyPattern {
        labels: &["ORG"],
        fields: &["organizationId"],
    },
    KeyPattern {
        labels: &["USERID"],
        fields: &["userId"],
    },
    KeyPattern {
        labels: &["TOKENID"],
        fields: &["userId"],
    },
];

fn is_valid_value(value: &str) -> bool {
    !value.is_empty() && !value.contains(';')
}

fn match_key(key: &str) -> Option<(&'static KeyPattern, Vec<&str>)> {
    KEY_PATTERNS
        .iter()
        .find_map(|pattern| pattern.capture(key).map(|values| (pattern, values)))
}

fn take_key(item: &mut JsonMap, name: &str) -> Option<String> {
    match item.remove(name) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

fn unwrap_set(value: Value) -> Value {
    match value {
        Value::Object(mut map)
            if map.get(SET_WRAPPER_FIELD).and_then(Value::as_str) == Some(SET_WRAPPER_NAME) =>
        {
            map.remove(SET_VALUES_FIELD).unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn insert_captures(target: &mut JsonMap, pattern: &KeyPattern, values: Vec<&str>) {
    for (field, value) in pattern.fields.iter().zip(values) {
        target.insert(field.to_string(), Value::String(value.to_string()));
    }
}

/// Normalizes a raw single-table item:
///
/// - `PK` / `SK` are removed, and any IDs they encode are added as named
///   fields (`organizationId`, `userId`, `date`, `keyId`, `apiType`).
/// - Set-wrapped attributes are replaced by their plain list of values.
/// - All other attributes are carried through as-is.
///
/// Keys that don't match a known layout contribute no fields. Multi-field
/// layouts are only decoded from the partition key.
pub fn schema_unmarshal(item: Option<JsonMap>) -> Option<JsonMap> {
    let mut item = item?;
    let pk = take_key(&mut item, PARTITION_KEY);
    let sk = take_key(&mut item, SORT_KEY);

    let mut normalized: JsonMap = item
        .into_iter()
        .map(|(key, value)| (key, unwrap_set(value)))
        .collect();

    if let Some((pattern, values)) = pk.as_deref().and_then(match_key) {
        insert_captures(&mut normalized, pattern, values);
    }
    if let Some((pattern, values)) = sk.as_deref().and_then(match_key) {
        if !pattern.is_multi_field() {
            insert_captures(&mut normalized, pattern, values);
        }
    }

    Some(normalized)
}
