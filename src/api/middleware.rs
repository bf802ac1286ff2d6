//! Access logging middleware.
//!
//! Tags every request with a generated request id (echoed back in the
//! `x-request-id` response header) and logs method, path, client ip, status
//! and latency.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

pub async fn request_logging(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    // Probes are noisy and uninteresting.
    if path.ends_with("/healthz") {
        return next.run(request).await;
    }

    let request_id = Uuid::new_v4().to_string();
    let start = Instant::now();

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }

    let status = response.status().as_u16();
    let latency_ms = start.elapsed().as_millis() as u64;

    if status >= 500 {
        warn!(
            %method,
            path,
            status,
            latency_ms,
            client_ip = %addr.ip(),
            request_id,
            "request failed"
        );
    } else {
        info!(
            %method,
            path,
            status,
            latency_ms,
            client_ip = %addr.ip(),
            request_id,
            "request completed"
        );
    }

    response
}
