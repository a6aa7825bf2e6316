//! Request logging middleware.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::Response,
};
use tracing::info;

use crucible_core::ErrorType;

/// Middleware function for request logging: method, path, remote address,
/// status, latency, and the classified error type when the handler set one.
pub async fn log_requests(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let error_type = response.extensions().get::<ErrorType>().map(ErrorType::as_str);

    info!(
        method = %method,
        path = %path,
        remote = %addr,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        error_type,
        "request completed"
    );

    response
}
