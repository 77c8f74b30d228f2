//! Typed field extraction over untyped JSON maps.
//!
//! Every payload codec reads its wire form through these helpers so that a
//! missing key always surfaces as [`CodecError::FieldNotFound`] and a value of
//! the wrong JSON kind as [`CodecError::FieldTypeMismatch`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Value};

use crate::error_handling::types::CodecError;

pub type JsonMap = Map<String, Value>;

fn mismatch(field: &str, expected: &'static str) -> CodecError {
    CodecError::FieldTypeMismatch {
        field: field.to_string(),
        expected,
    }
}

/// Views `value` as an object, naming it `what` in the error.
pub fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a JsonMap, CodecError> {
    value.as_object().ok_or_else(|| mismatch(what, "object"))
}

/// Returns the raw value under `key`. `null` counts as present.
pub fn get_field<'a>(m: &'a JsonMap, key: &str) -> Result<&'a Value, CodecError> {
    m.get(key)
        .ok_or_else(|| CodecError::FieldNotFound(key.to_string()))
}

/// Returns the value under `key`, treating an explicit `null` like a missing key.
pub fn get_optional<'a>(m: &'a JsonMap, key: &str) -> Option<&'a Value> {
    m.get(key).filter(|v| !v.is_null())
}

pub fn get_string(m: &JsonMap, key: &str) -> Result<String, CodecError> {
    get_field(m, key)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| mismatch(key, "string"))
}

pub fn get_optional_string(m: &JsonMap, key: &str) -> Result<Option<String>, CodecError> {
    match get_optional(m, key) {
        None => Ok(None),
        Some(v) => v
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| mismatch(key, "string")),
    }
}

pub fn get_bool(m: &JsonMap, key: &str) -> Result<bool, CodecError> {
    get_field(m, key)?
        .as_bool()
        .ok_or_else(|| mismatch(key, "bool"))
}

pub fn get_optional_bool(m: &JsonMap, key: &str) -> Result<Option<bool>, CodecError> {
    match get_optional(m, key) {
        None => Ok(None),
        Some(v) => v.as_bool().map(Some).ok_or_else(|| mismatch(key, "bool")),
    }
}

pub fn get_u64(m: &JsonMap, key: &str) -> Result<u64, CodecError> {
    get_field(m, key)?
        .as_u64()
        .ok_or_else(|| mismatch(key, "unsigned integer"))
}

pub fn get_u16(m: &JsonMap, key: &str) -> Result<u16, CodecError> {
    u16::try_from(get_u64(m, key)?).map_err(|_| mismatch(key, "u16"))
}

pub fn get_u8(m: &JsonMap, key: &str) -> Result<u8, CodecError> {
    u8::try_from(get_u64(m, key)?).map_err(|_| mismatch(key, "u8"))
}

pub fn encode_bytes(bytes: &[u8]) -> Value {
    Value::String(STANDARD.encode(bytes))
}

fn decode_b64(field: &str, s: &str) -> Result<Vec<u8>, CodecError> {
    STANDARD.decode(s).map_err(|e| CodecError::InvalidBase64 {
        field: field.to_string(),
        reason: e.to_string(),
    })
}

/// Reads a base64 blob. A `null` blob decodes to an empty buffer.
pub fn get_bytes(m: &JsonMap, key: &str) -> Result<Vec<u8>, CodecError> {
    match get_field(m, key)? {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => decode_b64(key, s),
        _ => Err(mismatch(key, "base64 string")),
    }
}

/// Reads a list of base64 blobs. `null` decodes to an empty list.
pub fn get_bytes_list(m: &JsonMap, key: &str) -> Result<Vec<Vec<u8>>, CodecError> {
    match get_field(m, key)? {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => decode_b64(key, s),
                _ => Err(mismatch(key, "array of base64 strings")),
            })
            .collect(),
        _ => Err(mismatch(key, "array of base64 strings")),
    }
}

/// Reads an optional list of strings; absent and `null` both give `None`.
pub fn get_string_array(m: &JsonMap, key: &str) -> Result<Option<Vec<String>>, CodecError> {
    match get_optional(m, key) {
        None => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| mismatch(key, "array of strings"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(_) => Err(mismatch(key, "array of strings")),
    }
}

pub fn get_optional_object<'a>(
    m: &'a JsonMap,
    key: &str,
) -> Result<Option<&'a JsonMap>, CodecError> {
    match get_optional(m, key) {
        None => Ok(None),
        Some(v) => as_object(v, key).map(Some),
    }
}
