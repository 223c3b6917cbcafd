//! HTTP transport for the portal.
//!
//! Maps form posts and page requests onto the request handlers. Routes
//! are protected by a middleware stack: Session → Audit → Handler.
//!
//! The router is composable: `portal_router()` returns a `Router` that
//! can be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod render;
pub mod router;
pub mod server;
pub mod types;

pub use render::{JsonRenderer, RenderError, ViewRenderer};
pub use router::portal_router;
pub use server::{start_server, PortalServer, ServerError, ServerInfo};
pub use types::ApiContext;
