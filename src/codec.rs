//! Wire codec helpers shared by the resource records.
//!
//! Records are plain serde types; the helpers here cover the spots where
//! the JumpServer wire format is looser than the attribute types: integers
//! that arrive as floats, references that arrive as bare ids or as objects,
//! and choice fields that arrive as strings or `{"value": ...}` objects.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

use crate::error::{ProviderError, Result};

/// Serialize a record into a request payload, omitting unset (null) attributes.
pub fn encode_payload<T: Serialize>(record: &T) -> Result<Value> {
    let mut value = serde_json::to_value(record)?;
    if let Value::Object(map) = &mut value {
        map.retain(|_, v| !v.is_null());
    }
    Ok(value)
}

/// Decode a JSON value into a record, reporting mismatches as schema errors.
pub fn decode<T: DeserializeOwned>(value: Value, context: &str) -> Result<T> {
    serde_json::from_value(value).map_err(|e| ProviderError::Schema(format!("{}: {}", context, e)))
}

/// Integer attribute that may arrive as an integral float.
pub fn int_from_number<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => narrow(&n).map_err(D::Error::custom),
        other => Err(D::Error::custom(format!("expected integer, got {}", other))),
    }
}

/// Optional integer attribute that may arrive as an integral float.
pub fn opt_int_from_number<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => narrow(&n).map(Some).map_err(D::Error::custom),
        other => Err(D::Error::custom(format!("expected integer, got {}", other))),
    }
}

/// Integer reference: a number, or an object with a numeric `id`.
pub fn int_or_ref<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => narrow(&n).map_err(D::Error::custom),
        Value::Object(map) => match map.get("id") {
            Some(Value::Number(n)) => narrow(n).map_err(D::Error::custom),
            _ => Err(D::Error::custom("reference object has no numeric 'id'")),
        },
        other => Err(D::Error::custom(format!("expected integer reference, got {}", other))),
    }
}

/// Optional string reference: null, an id string, or an object with an `id`.
pub fn opt_id_ref<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        other => id_from_value(other).map(Some).map_err(D::Error::custom),
    }
}

/// A list of string references.
pub fn id_refs<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<Value>::deserialize(deserializer)?
        .into_iter()
        .map(id_from_value)
        .collect::<std::result::Result<_, _>>()
        .map_err(D::Error::custom)
}

/// A choice field: a plain string, or an object carrying the string in `value`.
pub fn choice_value<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Object(map) => match map.get("value") {
            Some(Value::String(s)) => Ok(s.clone()),
            _ => Err(D::Error::custom("choice object has no string 'value'")),
        },
        other => Err(D::Error::custom(format!("expected string choice, got {}", other))),
    }
}

/// Treat an explicit null like an absent value.
pub fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn narrow(n: &Number) -> std::result::Result<i64, String> {
    if let Some(i) = n.as_i64() {
        return Ok(i);
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => Ok(f as i64),
        _ => Err(format!("{} is not representable as a 64-bit integer", n)),
    }
}

fn id_from_value(value: Value) -> std::result::Result<String, String> {
    match value {
        Value::String(id) => Ok(id),
        Value::Object(map) => match map.get("id") {
            Some(Value::String(id)) => Ok(id.clone()),
            _ => Err("reference object has no string 'id'".to_string()),
        },
        other => Err(format!("expected id reference, got {}", other)),
    }
}
