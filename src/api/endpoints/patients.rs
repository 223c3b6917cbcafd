//! `/patients` endpoints.

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::{Extension, Form};

use super::{read, run_handler, write, Fields};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, SessionHandle};
use crate::handlers::Route;

/// `GET /patients`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionHandle>,
) -> Result<Response, ApiError> {
    run_handler(&ctx, &session, Route::Patients, read(Fields::new())).await
}

/// `POST /patients`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionHandle>,
    Form(form): Form<Fields>,
) -> Result<Response, ApiError> {
    run_handler(&ctx, &session, Route::Patients, write(form)).await
}

/// `GET /patients/new`
pub async fn new_form(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionHandle>,
    Query(query): Query<Fields>,
) -> Result<Response, ApiError> {
    run_handler(&ctx, &session, Route::NewPatient, read(query)).await
}

/// `GET /patients/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionHandle>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    run_handler(&ctx, &session, Route::Patient(id), read(Fields::new())).await
}

/// `GET /patients/:id/edit`
pub async fn edit(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionHandle>,
    Path(id): Path<String>,
    Query(query): Query<Fields>,
) -> Result<Response, ApiError> {
    run_handler(&ctx, &session, Route::EditPatient(id), read(query)).await
}

/// `POST /patients/:id/edit`
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionHandle>,
    Path(id): Path<String>,
    Form(form): Form<Fields>,
) -> Result<Response, ApiError> {
    run_handler(&ctx, &session, Route::EditPatient(id), write(form)).await
}

/// `POST /patients/:id/delete`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionHandle>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    run_handler(&ctx, &session, Route::DeletePatient(id), write(Fields::new())).await
}
