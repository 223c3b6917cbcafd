//! `/login`, `/register` and `/logout`.

use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::response::Response;
use axum::{Extension, Form};

use super::{read, run_handler, write, Fields};
use crate::api::error::ApiError;
use crate::api::middleware::session::expired_cookie;
use crate::api::types::{ApiContext, SessionHandle};
use crate::handlers::Route;

/// `GET /login`
pub async fn show_login(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionHandle>,
    Query(query): Query<Fields>,
) -> Result<Response, ApiError> {
    run_handler(&ctx, &session, Route::Login, read(query)).await
}

/// `POST /login`
pub async fn login(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionHandle>,
    Form(form): Form<Fields>,
) -> Result<Response, ApiError> {
    run_handler(&ctx, &session, Route::Login, write(form)).await
}

/// `GET /register`
pub async fn show_register(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionHandle>,
    Query(query): Query<Fields>,
) -> Result<Response, ApiError> {
    run_handler(&ctx, &session, Route::Register, read(query)).await
}

/// `POST /register`
pub async fn register(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionHandle>,
    Form(form): Form<Fields>,
) -> Result<Response, ApiError> {
    run_handler(&ctx, &session, Route::Register, write(form)).await
}

/// `POST /logout`: clears the session, drops it from the store and
/// expires the cookie.
pub async fn logout(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionHandle>,
) -> Result<Response, ApiError> {
    let mut response = run_handler(&ctx, &session, Route::Logout, write(Fields::new())).await?;
    ctx.core.sessions().invalidate(&session.token);
    response.headers_mut().insert(SET_COOKIE, expired_cookie());
    tracing::info!(session = %session.token.fingerprint(), "Session ended");
    Ok(response)
}
