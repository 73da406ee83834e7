//! Response payload handling: envelope unwrapping, field-name casing and
//! decoding into caller types.

use crate::error::QueryError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Fields a response envelope may carry next to `data`.
const ENVELOPE_FIELDS: &[&str] = &[
    "totalCount",
    "count",
    "pageNumber",
    "pageSize",
    "totalPages",
    "hasNextPage",
    "hasPreviousPage",
    "message",
    "messages",
    "errors",
    "succeeded",
    "success",
    "statusCode",
];

/// Strips a `{ "data": ... }` envelope. Key matches are case-insensitive.
///
/// An object is only an envelope when every key besides `data` is a known
/// envelope field, so a record that happens to have a `data` field is
/// returned unchanged.
pub fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) => {
            let envelope_key = map
                .keys()
                .find(|k| k.eq_ignore_ascii_case("data"))
                .cloned();
            match envelope_key {
                Some(key) if map.keys().all(|k| *k == key || is_envelope_field(k)) => {
                    map.remove(&key).unwrap_or(Value::Null)
                }
                _ => Value::Object(map),
            }
        }
        other => other,
    }
}

fn is_envelope_field(key: &str) -> bool {
    ENVELOPE_FIELDS
        .iter()
        .any(|field| field.eq_ignore_ascii_case(key))
}

/// Rewrites every object key, at any depth, to camelCase.
///
/// When two keys collapse to the same name, the one that was already
/// camelCase keeps its value.
pub fn normalize_field_names(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut normalized = Map::with_capacity(map.len());
            for (key, child) in map {
                let camel = to_camel_case(&key);
                let already_camel = camel == key;
                if already_camel || !normalized.contains_key(&camel) {
                    normalized.insert(camel, normalize_field_names(child));
                }
            }
            Value::Object(normalized)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_field_names).collect()),
        other => other,
    }
}

/// `DepartmentId` -> `departmentId`, `ID` -> `id`, `URLPath` -> `urlPath`.
pub fn to_camel_case(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let upper_run = chars.iter().take_while(|c| c.is_uppercase()).count();
    if upper_run == 0 {
        return key.to_string();
    }

    // In "URLPath" the last capital of the run starts the next word.
    let lower_count = if upper_run > 1
        && chars
            .get(upper_run)
            .is_some_and(|c| c.is_lowercase())
    {
        upper_run - 1
    } else {
        upper_run
    };

    let mut out = String::with_capacity(key.len());
    for (i, c) in chars.iter().enumerate() {
        if i < lower_count {
            out.extend(c.to_lowercase());
        } else {
            out.push(*c);
        }
    }
    out
}

/// Decodes a list payload. `null` is an empty list; anything other than an
/// array is rejected.
pub fn decode_list<T: DeserializeOwned>(payload: Value) -> Result<Vec<T>, QueryError> {
    match payload {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(QueryError::from))
            .collect(),
        other => Err(QueryError::Decode(format!(
            "expected a list payload, got {}",
            json_kind(&other)
        ))),
    }
}

/// Decodes a detail payload. `null` is an absent record.
pub fn decode_detail<T: DeserializeOwned>(payload: Value) -> Result<Option<T>, QueryError> {
    match payload {
        Value::Null => Ok(None),
        other => serde_json::from_value(other)
            .map(Some)
            .map_err(QueryError::from),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
