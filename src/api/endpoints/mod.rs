//! HTTP endpoints.
//!
//! Each endpoint turns its extractors into a `Route` plus `PortalRequest`
//! and hands them to `run_handler`, which runs the handler on the
//! blocking pool under the session's lock.

pub mod auth;
pub mod health;
pub mod patients;
pub mod profile;

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Uri;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, SessionHandle};
use crate::handlers::{FormFields, PortalRequest, Route};

/// Submitted form body or query string.
pub type Fields = HashMap<String, String>;

pub(crate) async fn run_handler(
    ctx: &ApiContext,
    session: &SessionHandle,
    route: Route,
    request: PortalRequest,
) -> Result<Response, ApiError> {
    let core = Arc::clone(&ctx.core);
    let token = session.token.clone();
    let reply = tokio::task::spawn_blocking(move || core.handle(&token, route, request)).await??;
    Ok(reply.into_response())
}

pub(crate) fn read(fields: Fields) -> PortalRequest {
    PortalRequest::read(FormFields::new(fields))
}

pub(crate) fn write(fields: Fields) -> PortalRequest {
    PortalRequest::write(FormFields::new(fields))
}

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}
