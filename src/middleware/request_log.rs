use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Logs method, path, status and latency of every request.
pub async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let res = next.run(req).await;

    let status = res.status();
    let elapsed_ms = started.elapsed().as_millis();
    if status.is_server_error() {
        tracing::error!("{} {} -> {} ({} ms)", method, path, status.as_u16(), elapsed_ms);
    } else if status.is_client_error() {
        tracing::warn!("{} {} -> {} ({} ms)", method, path, status.as_u16(), elapsed_ms);
    } else {
        tracing::info!("{} {} -> {} ({} ms)", method, path, status.as_u16(), elapsed_ms);
    }

    res
}
