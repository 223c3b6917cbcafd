//! Audit logging middleware.
//!
//! Logs every request with method, path, response status and the
//! session fingerprint. Runs inside the session middleware so the
//! `SessionHandle` is present. Bodies and query strings are never logged.

use std::time::Instant;

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::SessionHandle;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let session = req
        .extensions()
        .get::<SessionHandle>()
        .map(|handle| handle.token.fingerprint());
    let started = Instant::now();

    let response = next.run(req).await;

    tracing::info!(
        %method,
        path,
        status = response.status().as_u16(),
        session = session.as_deref().unwrap_or("-"),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Request handled"
    );
    response
}
