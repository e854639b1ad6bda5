use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::Value;

/// Encode query parameters as `application/x-www-form-urlencoded`.
///
/// `params` must serialize to a JSON object (or `null`, which encodes to
/// nothing). Per field:
/// - `null` is omitted
/// - arrays become one `key=value` pair per non-null element
/// - strings are written as-is, numbers and booleans via `to_string`
/// - nested objects are written as compact JSON
///
/// Keys come out in the order `serde_json::Map` iterates them (sorted).
pub fn encode<Q: Serialize + ?Sized>(params: &Q) -> Result<String> {
    let value = serde_json::to_value(params).context("Failed to serialize query parameters")?;
    let map = match value {
        Value::Null => return Ok(String::new()),
        Value::Object(map) => map,
        other => bail!(
            "query parameters must serialize to an object, got {}",
            kind(&other)
        ),
    };

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in &map {
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(text) = scalar(item) {
                        serializer.append_pair(key, &text);
                    }
                }
            }
            other => {
                if let Some(text) = scalar(other) {
                    serializer.append_pair(key, &text);
                }
            }
        }
    }
    Ok(serializer.finish())
}

/// Append an encoded query to `endpoint`, adding `?` only when non-empty.
pub fn with_query(endpoint: &str, query: &str) -> String {
    if query.is_empty() {
        endpoint.to_string()
    } else if endpoint.contains('?') {
        format!("{}&{}", endpoint, query)
    } else {
        format!("{}?{}", endpoint, query)
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
            Some(value.to_string())
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests;
