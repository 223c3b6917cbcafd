//! Shared types for the HTTP layer.

use std::sync::Arc;

use crate::core_state::CoreState;
use crate::session_store::SessionToken;

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

// ═══════════════════════════════════════════════════════════
// Session handle, injected by session middleware
// ═══════════════════════════════════════════════════════════

/// The session a request runs under, injected into request extensions
/// by the session middleware.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub token: SessionToken,
    /// True when the token was minted for this request and the client
    /// must be sent a cookie.
    pub issued: bool,
}
