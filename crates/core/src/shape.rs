//! Tolerant accessors over duck-typed backend payloads.
//!
//! The finalized response object's output items vary in shape across
//! backend versions: the same logical field may appear under different
//! keys (`file_id` vs `id`), scores may be numbers or missing, and
//! whole sections may be absent. These helpers normalize "anything
//! exposing field X" into plain Rust values before any business logic
//! touches the data.

use serde_json::Value;

/// First string found under any of `keys`.
pub fn str_at<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| value.get(k).and_then(Value::as_str))
}

/// String under `key`, or `default` when absent or not a string.
pub fn str_or<'a>(value: &'a Value, key: &str, default: &'a str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or(default)
}

/// Array under `key`, or an empty slice.
pub fn arr_at<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Number under `key`, when present and numeric.
pub fn f64_at(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(Value::as_f64)
}

/// Unsigned integer under `key`, when present.
pub fn u64_at(value: &Value, key: &str) -> Option<u64> {
    value.get(key).and_then(Value::as_u64)
}

/// The `type` discriminator of an output item ("" when missing).
pub fn type_of(value: &Value) -> &str {
    str_or(value, "type", "")
}
