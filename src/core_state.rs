//! Application state shared by every request.
//!
//! `CoreState` owns the session store and the handler collaborators. It is
//! wrapped in `Arc` at startup and handed to the router and the session
//! sweeper.

use std::sync::Arc;
use std::time::Instant;

use crate::api::render::{JsonRenderer, RenderError, Reply, ViewRenderer};
use crate::config::PortalConfig;
use crate::credentials::{AccountDirectory, CredentialStore};
use crate::handlers::{Portal, PortalRequest, Route};
use crate::patients::PatientRegistry;
use crate::session_context::SessionView;
use crate::session_store::{SessionStore, SessionToken};

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    config: PortalConfig,
    sessions: SessionStore,
    portal: Portal,
    patients: Arc<PatientRegistry>,
    renderer: Arc<dyn ViewRenderer>,
    started_at: Instant,
}

impl CoreState {
    /// Build state from config: in-memory directory (demo account seeded
    /// when enabled), empty patient registry, JSON renderer.
    pub fn new(config: PortalConfig) -> Self {
        let accounts = if config.seed_demo_account {
            CredentialStore::with_demo_account(config.pbkdf2_iterations)
        } else {
            CredentialStore::new(config.pbkdf2_iterations)
        };
        Self::with_parts(
            config,
            Arc::new(accounts),
            Arc::new(PatientRegistry::new()),
            Arc::new(JsonRenderer),
        )
    }

    /// Build state around caller-supplied collaborators.
    pub fn with_parts(
        config: PortalConfig,
        accounts: Arc<dyn AccountDirectory>,
        patients: Arc<PatientRegistry>,
        renderer: Arc<dyn ViewRenderer>,
    ) -> Self {
        Self {
            sessions: SessionStore::new(config.session_ttl),
            portal: Portal::new(accounts, Arc::clone(&patients)),
            patients,
            renderer,
            config,
            started_at: Instant::now(),
        }
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn patients(&self) -> &PatientRegistry {
        &self.patients
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    // ── Request handling ────────────────────────────────────

    /// Run one request against the session behind `token`.
    ///
    /// Holds the session's lock for the handler and the render, so a page
    /// always reflects the mutation that produced it. Blocking: callers on
    /// the async runtime go through `spawn_blocking`.
    pub fn handle(
        &self,
        token: &SessionToken,
        route: Route,
        request: PortalRequest,
    ) -> Result<Reply, RenderError> {
        self.sessions.with_session(token, |context| {
            let next = self.portal.dispatch(route, &request, context);
            Reply::from_next_action(next, self.renderer.as_ref(), SessionView::new(context))
        })
    }

    /// Drop expired sessions. Returns how many were removed.
    pub fn sweep_sessions(&self) -> usize {
        self.sessions.sweep_expired()
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> PortalConfig {
    PortalConfig {
        pbkdf2_iterations: 1_000,
        ..PortalConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::credentials::{DEMO_EMAIL, DEMO_PASSWORD};
    use crate::handlers::FormFields;

    fn login_request() -> PortalRequest {
        PortalRequest::write(
            [("email", DEMO_EMAIL), ("password", DEMO_PASSWORD)]
                .into_iter()
                .collect(),
        )
    }

    #[test]
    fn login_then_profile_renders_identity() {
        let core = CoreState::new(test_config());
        let token = core.sessions().create();

        let reply = core.handle(&token, Route::Login, login_request()).unwrap();
        assert!(matches!(reply, Reply::Redirect { .. }));

        let reply = core
            .handle(&token, Route::Profile, PortalRequest::read(FormFields::default()))
            .unwrap();
        let Reply::Page(page) = reply else {
            panic!("expected page");
        };
        let json: serde_json::Value = serde_json::from_str(&page.body).unwrap();
        assert_eq!(json["view"], "profile");
        assert_eq!(json["attributes"]["identity"]["fullName"], "John Doe");
        assert_eq!(json["session"]["identity"]["email"], DEMO_EMAIL);
    }

    #[test]
    fn demo_account_can_be_disabled() {
        let core = CoreState::new(PortalConfig {
            seed_demo_account: false,
            ..test_config()
        });
        let token = core.sessions().create();

        let reply = core.handle(&token, Route::Login, login_request()).unwrap();

        let Reply::Redirect { location, .. } = reply else {
            panic!("expected redirect");
        };
        assert_eq!(location, "/login?error=invalid_credentials");
    }

    #[test]
    fn sweep_removes_only_expired_sessions() {
        let core = CoreState::new(PortalConfig {
            session_ttl: std::time::Duration::from_millis(20),
            ..test_config()
        });
        core.sessions().create();
        std::thread::sleep(std::time::Duration::from_millis(40));
        let live = core.sessions().create();

        assert_eq!(core.sweep_sessions(), 1);
        assert!(core.sessions().contains(&live));
    }

    #[test]
    fn handle_on_unknown_token_starts_empty_session() {
        let core = CoreState::new(test_config());
        let token = SessionToken::generate();

        let reply = core
            .handle(&token, Route::Profile, PortalRequest::read(FormFields::new(HashMap::new())))
            .unwrap();

        let Reply::Redirect { location, .. } = reply else {
            panic!("expected redirect");
        };
        assert_eq!(location, "/login?error=not_authenticated");
    }
}
