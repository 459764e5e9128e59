// handlers/mod.rs - function handlers, split by whether a verified caller is required
//
// Public:    /, /health, generate-upload-url, test-sdk-version, cors-sdk-demo
// Protected: db-ops, all-http-methods, delete-method, get-claims-demo
pub mod protected;
pub mod public;

use axum::{
    body::Bytes,
    http::Method,
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use crate::error::ApiError;

/// Parse a request body as JSON, reporting failures as INVALID_REQUEST.
pub(crate) fn parse_json_body(body: &Bytes) -> Result<Value, ApiError> {
    if body.is_empty() {
        return Err(ApiError::invalid_request("Request body is required"));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::invalid_request(format!("Invalid JSON body: {}", e)))
}

/// Current time as an RFC 3339 string with millisecond precision.
pub(crate) fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Plain `OPTIONS` requests that are not CORS preflights still get a 200.
pub async fn preflight() -> Response {
    "ok".into_response()
}

/// Fallback for POST-only functions.
pub async fn post_only(method: Method) -> ApiError {
    ApiError::method_not_allowed(format!("Method {} not supported", method), &["POST", "OPTIONS"])
}
