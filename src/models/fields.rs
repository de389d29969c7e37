//! Stored field names and the accessors that cope with their variations.
//!
//! The corpus was imported from several spreadsheets and the key spelling
//! differs between collections, so every logical field has a list of keys
//! checked in priority order.

use serde_json::{Map, Value};

pub type Document = Map<String, Value>;

pub const ID_KEY: &str = "_id";
pub const NAME_KEYS: [&str; 5] = [
    "Disease Name",
    "Disease name",
    "disease_name",
    "disease name",
    "name",
];
pub const SYMPTOM_KEYS: [&str; 2] = ["Symptoms", "symptoms"];
pub const CAUSE_KEYS: [&str; 2] = ["Causes", "causes"];
pub const INDEX_KEYS: [&str; 2] = ["index", "Index"];
pub const TREATMENT_LIST_KEYS: [&str; 2] = ["Treatments", "treatments"];
pub const IMAGE_LIST_KEYS: [&str; 2] = ["images", "Images"];

pub const TREATMENT_NAME_KEYS: [&str; 3] =
    ["Treatment Name", "treatment_name", "treatment_description"];
pub const ENTRY_NAME_KEYS: [&str; 4] = [
    "Treatment Name",
    "treatment_name",
    "treatment_description",
    "name",
];
pub const INGREDIENT_KEYS: [&str; 2] = ["Ingredients", "ingredients"];
pub const PREPARATION_KEYS: [&str; 3] =
    ["Preparation Method", "preparation_method", "preparation"];
pub const DOSAGE_KEYS: [&str; 2] = ["Dosage", "dosage"];

/// Fields the gateway pattern-matches against.
pub const SEARCH_FIELDS: [&str; 4] = ["Disease Name", "Disease name", "disease_name", "Symptoms"];

/// First value under any of `keys` that is not null.
pub fn first_present<'a>(doc: &'a Document, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| doc.get(*k))
        .find(|v| !v.is_null())
}

/// First non-blank string under any of `keys`.
pub fn first_text<'a>(doc: &'a Document, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| doc.get(*k))
        .filter_map(Value::as_str)
        .find(|s| !s.trim().is_empty())
}

/// String form of the stored id. Extended-JSON object ids (`{"$oid": ..}`)
/// are unwrapped to their hex string.
pub fn document_id(doc: &Document) -> Option<String> {
    match doc.get(ID_KEY)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(obj) => obj.get("$oid").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// Integer value of a stored `index`, accepting numeric strings and floats
/// without a fractional part.
pub fn coerce_index(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }
        Value::Object(obj) => obj
            .get("$numberInt")
            .or_else(|| obj.get("$numberLong"))
            .and_then(coerce_index),
        _ => None,
    }
}

pub fn document_index(doc: &Document) -> Option<i64> {
    INDEX_KEYS
        .iter()
        .filter_map(|k| doc.get(*k))
        .find_map(coerce_index)
}

/// Case-insensitive containment over strings, (nested) arrays and the
/// values of nested objects. Keys are never matched.
/// `needle_lower` must already be lowercased.
pub fn value_contains(value: &Value, needle_lower: &str) -> bool {
    match value {
        Value::String(s) => s.to_lowercase().contains(needle_lower),
        Value::Array(items) => items.iter().any(|v| value_contains(v, needle_lower)),
        Value::Object(map) => map.values().any(|v| value_contains(v, needle_lower)),
        _ => false,
    }
}

/// Whether any stored value of the document, other than its id, contains
/// `needle_lower`.
pub fn document_contains(doc: &Document, needle_lower: &str) -> bool {
    doc.iter()
        .filter(|(key, _)| key.as_str() != ID_KEY)
        .any(|(_, value)| value_contains(value, needle_lower))
}
