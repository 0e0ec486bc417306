//! Raw string to typed value conversion ahead of schema validation.
//!
//! Transport values (query, path, header, form) always arrive as strings.
//! Only strings are touched here; JSON bodies and non-string defaults pass
//! through unchanged.

use crate::spec::{CollectionFormat, ParameterSpec};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

#[allow(clippy::expect_used)]
static NUMERIC_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-+]?\d").expect("numeric prefix regex"));

/// Parse `raw` as an integer, then as a float.
///
/// Strings that do not start like a number, or that do not parse in full,
/// are returned unchanged so the schema reports the type mismatch.
pub fn coerce_number(raw: &str) -> Value {
    if !NUMERIC_PREFIX.is_match(raw) {
        return Value::String(raw.to_string());
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Number(i.into());
    }
    match raw.parse::<f64>().ok().and_then(Number::from_f64) {
        Some(n) => Value::Number(n),
        None => Value::String(raw.to_string()),
    }
}

/// `"false"`, `""` and `"0"` are false; every other string is true.
pub fn coerce_boolean(raw: &str) -> bool {
    !matches!(raw, "false" | "" | "0")
}

fn coerce_scalar(value: Value, declared: Option<&str>) -> Value {
    match (value, declared) {
        (Value::String(s), Some("integer" | "number")) => coerce_number(&s),
        (Value::String(s), Some("boolean")) => Value::Bool(coerce_boolean(&s)),
        (other, _) => other,
    }
}

/// Split a packed collection string on the format's delimiter.
///
/// An empty string is an empty collection.
pub fn split_collection(raw: &str, format: CollectionFormat) -> Vec<Value> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(format.delimiter())
        .map(|s| Value::String(s.to_string()))
        .collect()
}

/// Coerce one extracted (or defaulted) value according to its declaration.
pub fn coerce(param: &ParameterSpec, value: Value) -> Value {
    if param.is_body() {
        return value;
    }
    if param.is_numeric() || param.is_boolean() {
        return coerce_scalar(value, param.param_type.as_deref());
    }
    if !param.is_array() {
        return value;
    }

    let format = param.collection_format.unwrap_or(CollectionFormat::Csv);
    let items = match value {
        Value::String(s) => split_collection(&s, format),
        Value::Array(items) => items,
        other => return other,
    };
    Value::Array(
        items
            .into_iter()
            .map(|item| coerce_scalar(item, param.item_type.as_deref()))
            .collect(),
    )
}
