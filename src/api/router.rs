//! Portal router.
//!
//! Middleware stack (outermost → innermost):
//! Extension(ApiContext) → Cache-Control → Session → Audit → Handler

use std::sync::Arc;

use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the portal router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn portal_router(core: Arc<CoreState>) -> Router {
    let ctx = ApiContext::new(core);

    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let pages = Router::new()
        .route(
            "/login",
            get(endpoints::auth::show_login).post(endpoints::auth::login),
        )
        .route(
            "/register",
            get(endpoints::auth::show_register).post(endpoints::auth::register),
        )
        .route("/logout", post(endpoints::auth::logout))
        .route("/profile", get(endpoints::profile::view))
        .route(
            "/profile/update",
            get(endpoints::profile::show_update).post(endpoints::profile::update),
        )
        .route(
            "/profile/appointments",
            post(endpoints::profile::book_appointment),
        )
        .route("/profile/history", post(endpoints::profile::record_history))
        .route(
            "/patients",
            get(endpoints::patients::list).post(endpoints::patients::create),
        )
        .route("/patients/new", get(endpoints::patients::new_form))
        .route("/patients/:id", get(endpoints::patients::detail))
        .route(
            "/patients/:id/edit",
            get(endpoints::patients::edit).post(endpoints::patients::update),
        )
        .route("/patients/:id/delete", post(endpoints::patients::delete))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::session::attach_session));

    // Probes run without a session.
    let probes = Router::new()
        .route("/health", get(endpoints::health::check))
        .with_state(ctx.clone());

    Router::new()
        .merge(pages)
        .merge(probes)
        .fallback(endpoints::not_found)
        // ServiceBuilder layers run top to bottom: Extension is outermost
        // so middleware can extract ApiContext.
        .layer(
            ServiceBuilder::new()
                .layer(axum::Extension(ctx))
                .layer(SetResponseHeaderLayer::overriding(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-store"),
                )),
        )
}
