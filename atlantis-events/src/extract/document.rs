//! Strict parse of a repaired candidate into raw record values.

use serde_json::Value;

/// Wrapper-object field that holds the record array.
pub const RECORDS_FIELD: &str = "pins";

/// Parse `text` as JSON and return its candidate records.
///
/// Accepts either a bare array of records or an object whose `pins` field is
/// one. Any other well-formed document has no records.
pub fn parse_document(text: &str) -> Result<Vec<Value>, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    Ok(records_from_value(value))
}

pub fn records_from_value(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(RECORDS_FIELD) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
