//! HTTP server lifecycle.
//!
//! Builds the axum router with request logging and a per-request timeout,
//! binds the configured address and serves until the cancellation token fires.

use crate::config::Config;
use crate::error::AppError;
use crate::services::http_api::{api_routes, AppState};
use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;

/// Header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the full application router.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    api_routes()
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(log_requests))
}

/// Log method, path, status and latency for every request.
///
/// An incoming `x-request-id` is kept; otherwise a fresh UUID is assigned.
/// Either way it is echoed on the response.
async fn log_requests(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let mut response = next.run(request).await;

    log::info!(
        "[http] {} {} {} {}ms id={}",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis(),
        request_id
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Serve the API until `shutdown` is cancelled.
///
/// Returns an error if the address cannot be bound.
pub async fn serve(config: &Config, state: AppState, shutdown: CancellationToken) -> Result<(), AppError> {
    let addr = config.bind_addr()?;
    let app = router(state, config.request_timeout());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind to {}: {}", addr, e)))?;

    log::info!("[http] Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    log::info!("[http] Server stopped");
    Ok(())
}
