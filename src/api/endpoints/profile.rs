//! `/profile` and its sub-resources.

use axum::extract::{Query, State};
use axum::response::Response;
use axum::{Extension, Form};

use super::{read, run_handler, write, Fields};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, SessionHandle};
use crate::handlers::Route;

/// `GET /profile`
pub async fn view(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionHandle>,
) -> Result<Response, ApiError> {
    run_handler(&ctx, &session, Route::Profile, read(Fields::new())).await
}

/// `GET /profile/update`
pub async fn show_update(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionHandle>,
    Query(query): Query<Fields>,
) -> Result<Response, ApiError> {
    run_handler(&ctx, &session, Route::ProfileUpdate, read(query)).await
}

/// `POST /profile/update`
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionHandle>,
    Form(form): Form<Fields>,
) -> Result<Response, ApiError> {
    run_handler(&ctx, &session, Route::ProfileUpdate, write(form)).await
}

/// `POST /profile/appointments`
pub async fn book_appointment(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionHandle>,
    Form(form): Form<Fields>,
) -> Result<Response, ApiError> {
    run_handler(&ctx, &session, Route::Appointments, write(form)).await
}

/// `POST /profile/history`
pub async fn record_history(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionHandle>,
    Form(form): Form<Fields>,
) -> Result<Response, ApiError> {
    run_handler(&ctx, &session, Route::MedicalHistory, write(form)).await
}
