use crate::errors::CrmError;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Message used when an error body names neither `message` nor `error`.
const FALLBACK_MESSAGE: &str = "Request failed";

/// Decode a 2xx response into `T`.
///
/// 204 and blank bodies resolve to the empty result (see [`empty_result`]).
pub async fn decode_success<T: DeserializeOwned>(resp: Response) -> Result<T, CrmError> {
    if resp.status() == StatusCode::NO_CONTENT {
        return empty_result();
    }
    let bytes = resp.bytes().await?;
    decode_body(&bytes)
}

pub fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CrmError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return empty_result();
    }
    serde_json::from_slice(bytes).map_err(|e| CrmError::Decode {
        message: e.to_string(),
    })
}

/// `{}` deserialized into `T`, or `null` for unit-like targets such as `()`.
pub fn empty_result<T: DeserializeOwned>() -> Result<T, CrmError> {
    serde_json::from_value(Value::Object(Map::new()))
        .or_else(|_| serde_json::from_value(Value::Null))
        .map_err(|e| CrmError::Decode {
            message: format!("empty response cannot be decoded: {}", e),
        })
}

/// Turn a non-2xx response into a structured [`CrmError::Http`].
pub async fn error_from_response(resp: Response) -> CrmError {
    let status = resp.status();
    let body = resp.bytes().await.ok();
    let parsed = body
        .as_deref()
        .and_then(|b| serde_json::from_slice::<Value>(b).ok());
    http_error(status, parsed.as_ref())
}

/// Build the HTTP error from the status and the (best-effort) parsed body.
///
/// `message` may be a string or, for validation failures, a list of strings.
/// Falls back to `error`, then a generic message. Without a JSON body the
/// status text is the message.
pub fn http_error(status: StatusCode, body: Option<&Value>) -> CrmError {
    let error = body
        .and_then(|b| b.get("error"))
        .and_then(Value::as_str)
        .map(ToString::to_string);

    let message = match body {
        Some(body) => body_message(body)
            .or_else(|| error.clone().filter(|e| !e.is_empty()))
            .unwrap_or_else(|| FALLBACK_MESSAGE.to_string()),
        None => status_text(status),
    };

    CrmError::Http {
        message,
        status_code: status.as_u16(),
        error,
    }
}

fn body_message(body: &Value) -> Option<String> {
    match body.get("message")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        _ => None,
    }
}

/// Reason phrase for `status`, e.g. `"Internal Server Error"`.
pub fn status_text(status: StatusCode) -> String {
    status.canonical_reason().map_or_else(
        || format!("HTTP {}", status.as_u16()),
        ToString::to_string,
    )
}
