//! View rendering.
//!
//! Markup is not this crate's concern: a [`ViewRenderer`] receives the
//! view, its request-scoped attributes and a read-only session, and
//! produces a body. [`JsonRenderer`] is the stock implementation.

use std::collections::BTreeMap;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::handlers::{Attributes, ErrorFlag, NextAction, RedirectStatus, View};
use crate::session_context::{SessionValue, SessionView};

/// A rendered page body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub content_type: &'static str,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to serialize view {view}: {source}")]
    Serialize {
        view: &'static str,
        source: serde_json::Error,
    },
    #[error("Renderer failed on view {view}: {detail}")]
    Renderer { view: &'static str, detail: String },
}

/// Draws a view. Implementations only read the session.
pub trait ViewRenderer: Send + Sync {
    fn render(
        &self,
        view: &View,
        attributes: &Attributes,
        session: SessionView<'_>,
    ) -> Result<Rendered, RenderError>;
}

// ── JsonRenderer ────────────────────────────────────────

/// Renders `{"view", "path", "attributes", "session"}` as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

#[derive(Serialize)]
struct JsonPage<'a> {
    view: &'static str,
    path: String,
    attributes: &'a Attributes,
    session: BTreeMap<&'a str, &'a SessionValue>,
}

impl ViewRenderer for JsonRenderer {
    fn render(
        &self,
        view: &View,
        attributes: &Attributes,
        session: SessionView<'_>,
    ) -> Result<Rendered, RenderError> {
        let page = JsonPage {
            view: view.name(),
            path: view.path(),
            attributes,
            session: session
                .keys()
                .into_iter()
                .filter_map(|key| session.get(key).map(|value| (key, value)))
                .collect(),
        };
        let body = serde_json::to_string(&page).map_err(|source| RenderError::Serialize {
            view: view.name(),
            source,
        })?;
        Ok(Rendered {
            content_type: "application/json",
            body,
        })
    }
}

// ═══════════════════════════════════════════════════════════
// Reply: NextAction in HTTP terms
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Page(Rendered),
    Redirect {
        location: String,
        status: RedirectStatus,
    },
}

impl Reply {
    pub fn from_next_action(
        next: NextAction,
        renderer: &dyn ViewRenderer,
        session: SessionView<'_>,
    ) -> Result<Self, RenderError> {
        match next {
            NextAction::Render { view, attributes } => {
                renderer.render(&view, &attributes, session).map(Reply::Page)
            }
            NextAction::Redirect {
                target,
                status,
                error,
            } => Ok(Reply::Redirect {
                location: redirect_location(&target, error.as_ref()),
                status,
            }),
        }
    }
}

/// Target path with the error flag, if any, as `?error=<code>`.
pub fn redirect_location(target: &View, error: Option<&ErrorFlag>) -> String {
    match error {
        Some(flag) => format!("{}?error={}", target.path(), flag.code()),
        None => target.path(),
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Page(page) => {
                ([(header::CONTENT_TYPE, page.content_type)], page.body).into_response()
            }
            Reply::Redirect { location, status } => {
                let status = match status {
                    RedirectStatus::Found => StatusCode::FOUND,
                    RedirectStatus::SeeOther => StatusCode::SEE_OTHER,
                };
                (status, [(header::LOCATION, location)]).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::Method;
    use crate::models::{IdentityRecord, ValidationError};
    use crate::session_context::SessionContext;

    #[test]
    fn redirect_location_appends_error_code() {
        assert_eq!(redirect_location(&View::Profile, None), "/profile");
        assert_eq!(
            redirect_location(&View::Login, Some(&ErrorFlag::NotAuthenticated)),
            "/login?error=not_authenticated"
        );
    }

    #[test]
    fn json_renderer_includes_view_attributes_and_session() {
        let mut context = SessionContext::new();
        let jane = IdentityRecord::new("Jane Roe", "jane@example.com", None, None).unwrap();
        context.bind_identity(jane);
        let attributes = Attributes::new().with("patientName", "John Doe");

        let rendered = JsonRenderer
            .render(&View::Profile, &attributes, SessionView::new(&context))
            .unwrap();

        assert_eq!(rendered.content_type, "application/json");
        let json: serde_json::Value = serde_json::from_str(&rendered.body).unwrap();
        assert_eq!(json["view"], "profile");
        assert_eq!(json["path"], "/profile");
        assert_eq!(json["attributes"]["patientName"], "John Doe");
        assert_eq!(json["session"]["identity"]["fullName"], "Jane Roe");
    }

    #[test]
    fn absent_session_keys_render_as_nothing() {
        let context = SessionContext::new();
        let rendered = JsonRenderer
            .render(&View::Login, &Attributes::new(), SessionView::new(&context))
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&rendered.body).unwrap();
        assert_eq!(json["session"], serde_json::json!({}));
        assert_eq!(json["attributes"], serde_json::json!({}));
    }

    #[test]
    fn redirect_reply_maps_status_codes() {
        let context = SessionContext::new();
        let next = NextAction::redirect_with_error(
            Method::Write,
            View::Register,
            ValidationError::PasswordMismatch,
        );

        let reply =
            Reply::from_next_action(next, &JsonRenderer, SessionView::new(&context)).unwrap();
        let response = reply.into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/register?error=password_mismatch"
        );
    }

    #[test]
    fn page_reply_is_200_with_content_type() {
        let response = Reply::Page(Rendered {
            content_type: "application/json",
            body: "{}".into(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
