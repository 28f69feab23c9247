//! HTTP helpers for Lambda functions.

use lambda_http::http::response::Builder;
use lambda_http::{Body, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::ErrorResponse;

/// Header carrying the admin password on writes.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Start a response with the cross-origin headers every reply carries.
pub fn cors_builder(status: u16) -> Builder {
    Response::builder()
        .status(status)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, x-admin-key")
}

/// Create a JSON response with the given status code and data.
pub fn json_response<T: Serialize>(status: u16, data: &T) -> Result<Response<Body>, lambda_http::Error> {
    Ok(cors_builder(status)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_string(data)?))?)
}

/// Create a response with no body.
pub fn empty_response(status: u16) -> Result<Response<Body>, lambda_http::Error> {
    Ok(cors_builder(status).body(Body::Empty)?)
}

/// Create an error response with the given status code and message.
pub fn error_response(status: u16, message: impl Into<String>) -> Result<Response<Body>, lambda_http::Error> {
    json_response(status, &ErrorResponse::new(message))
}

/// Parse request body as JSON, returning a 400 response on failure.
///
/// An empty body parses as `T::default()`.
/// Returns `Ok(Ok(T))` on successful parse, `Ok(Err(Response))` on parse error (400),
/// or `Err(lambda_http::Error)` on serialization failure.
pub fn parse_json_body<T: DeserializeOwned + Default>(body: &Body) -> Result<Result<T, Response<Body>>, lambda_http::Error> {
    match try_parse_json_body(body) {
        Ok(parsed) => Ok(Ok(parsed)),
        Err(_) => {
            let response = error_response(400, "Invalid request body")?;
            Ok(Err(response))
        }
    }
}

/// Parse request body as JSON without building an error response.
pub fn try_parse_json_body<T: DeserializeOwned + Default>(body: &Body) -> Result<T, serde_json::Error> {
    let bytes: &[u8] = body.as_ref();
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(bytes)
}

/// Macro to parse request body, returning early with 400 on parse error.
///
/// Usage:
/// ```ignore
/// let request: MyRequest = parse_body!(event.body());
/// ```
#[macro_export]
macro_rules! parse_body {
    ($body:expr) => {
        match shared::http::parse_json_body($body)? {
            Ok(parsed) => parsed,
            Err(response) => return Ok(response),
        }
    };
}
