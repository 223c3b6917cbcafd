//! Middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Session resolver: reuses or mints the session, sets the cookie
//! 2. Audit logger: logs after the session is known

pub mod audit;
pub mod session;
