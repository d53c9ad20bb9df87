// src/logging_middleware.rs
//! Middleware for logging request and response bodies in debug mode

use axum::{
    body::Body,
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use axum::body::to_bytes;
use serde_json::Value;
use tracing::debug;

/// JSON keys whose values never reach the logs
const REDACTED_FIELDS: [&str; 5] = ["password", "password_hash", "id_token", "access_token", "token"];

/// Replace credential-bearing values at any depth
fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map.iter_mut() {
                if REDACTED_FIELDS.contains(&key.as_str()) {
                    *inner = Value::String("[REDACTED]".to_string());
                } else {
                    redact(inner);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}

/// Loggable form of a body: redacted pretty JSON, or a size note for anything else
fn printable_body(bytes: &[u8]) -> String {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(mut json) => {
            redact(&mut json);
            serde_json::to_string_pretty(&json).unwrap_or_default()
        }
        Err(_) => format!("<{} bytes, non-JSON>", bytes.len()),
    }
}

/// Middleware to log request and response bodies in debug mode
pub async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    let (parts, body) = request.into_parts();

    // Read request body
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if !bytes.is_empty() {
        debug!(
            method = %parts.method,
            uri = %parts.uri,
            request_body = %printable_body(&bytes),
            "📥 Request"
        );
    }

    // Reconstruct request
    let request = Request::from_parts(parts, Body::from(bytes));

    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if !bytes.is_empty() {
        debug!(
            status = %parts.status,
            response_body = %printable_body(&bytes),
            "📤 Response"
        );
    }

    // Reconstruct response
    Ok(Response::from_parts(parts, Body::from(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_credentials_are_redacted() {
        let body = json!({
            "email": "a@b.com",
            "password": "Secret123",
            "nested": {"access_token": "abc", "keep": 1},
            "list": [{"id_token": "xyz"}]
        })
        .to_string();

        let printed = printable_body(body.as_bytes());

        assert!(!printed.contains("Secret123"));
        assert!(!printed.contains("abc"));
        assert!(!printed.contains("xyz"));
        assert!(printed.contains("a@b.com"));
        assert!(printed.contains("[REDACTED]"));
    }

    #[test]
    fn test_non_json_body_is_summarized() {
        assert_eq!(printable_body(b"password=hunter2"), "<16 bytes, non-JSON>");
    }
}
