// src/logging_middleware.rs
//! Request logging: request id propagation, status and latency, plus JSON
//! bodies at debug level. Multipart uploads and file downloads pass through
//! untouched.

use axum::body::to_bytes;
use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{debug, info, warn};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Bodies above this size are never buffered for logging.
const MAX_LOGGED_BODY_BYTES: usize = 64 * 1024;

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false)
}

fn body_for_log(bytes: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(json) => serde_json::to_string_pretty(&json).unwrap_or_default(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

pub async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    let started = Instant::now();

    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let (mut parts, body) = request.into_parts();
    let method = parts.method.clone();
    let uri = parts.uri.clone();

    let body = if is_json(&parts.headers) {
        let bytes = to_bytes(body, MAX_LOGGED_BODY_BYTES)
            .await
            .map_err(|_| StatusCode::PAYLOAD_TOO_LARGE)?;
        if !bytes.is_empty() {
            debug!(
                request_id = %request_id,
                method = %method,
                uri = %uri,
                request_body = %body_for_log(&bytes),
                "📥 Request"
            );
        }
        Body::from(bytes)
    } else {
        body
    };

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        parts.headers.insert(REQUEST_ID_HEADER, value);
    }

    let response = next.run(Request::from_parts(parts, body)).await;

    let (mut parts, body) = response.into_parts();
    let body = if is_json(&parts.headers) {
        let bytes = to_bytes(body, usize::MAX)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        if bytes.len() <= MAX_LOGGED_BODY_BYTES {
            debug!(
                request_id = %request_id,
                status = %parts.status,
                response_body = %body_for_log(&bytes),
                "📤 Response"
            );
        }
        Body::from(bytes)
    } else {
        body
    };

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        parts.headers.insert(REQUEST_ID_HEADER, value);
    }

    let latency_ms = started.elapsed().as_millis() as u64;
    if parts.status.is_server_error() {
        warn!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            status = parts.status.as_u16(),
            latency_ms = latency_ms,
            "Request failed"
        );
    } else {
        info!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            status = parts.status.as_u16(),
            latency_ms = latency_ms,
            "Request handled"
        );
    }

    Ok(Response::from_parts(parts, body))
}
