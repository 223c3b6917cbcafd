//! Session cookie middleware.
//!
//! Reads the `portal_session` cookie, reuses the session if it is still
//! live, otherwise mints a fresh token. Client-chosen values are never
//! adopted as session ids. Injects `SessionHandle` into request extensions
//! and sets the cookie on the response when a token was minted.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, SessionHandle};
use crate::session_store::SessionToken;

pub const SESSION_COOKIE: &str = "portal_session";

const COOKIE_ATTRIBUTES: &str = "HttpOnly; SameSite=Lax; Path=/";

pub async fn attach_session(req: Request<axum::body::Body>, next: Next) -> Response {
    match attach_session_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn attach_session_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let sessions = ctx.core.sessions();
    let handle = match session_cookie(req.headers()).map(|raw| SessionToken::from_client(&raw)) {
        Some(token) if sessions.contains(&token) => SessionHandle {
            token,
            issued: false,
        },
        presented => {
            if presented.is_some() {
                tracing::debug!("Unknown or expired session cookie replaced");
            }
            SessionHandle {
                token: sessions.create(),
                issued: true,
            }
        }
    };

    req.extensions_mut().insert(handle.clone());
    let mut response = next.run(req).await;

    // An endpoint that set the cookie itself (logout) wins.
    if handle.issued && !response.headers().contains_key(SET_COOKIE) {
        let cookie = issue_cookie(&handle.token)?;
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    Ok(response)
}

/// Value of the session cookie, if the client sent one.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value handing `token` to the client.
pub fn issue_cookie(token: &SessionToken) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(&format!("{SESSION_COOKIE}={}; {COOKIE_ATTRIBUTES}", token.as_str()))
        .map_err(|e| ApiError::Internal(format!("session cookie header: {e}")))
}

/// `Set-Cookie` value telling the client to drop the cookie.
pub fn expired_cookie() -> HeaderValue {
    HeaderValue::from_static("portal_session=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}
