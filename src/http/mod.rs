//! HTTP server: recording WebSocket plus a small query API
//!
//! - GET / ?sessionId=<id> - Upgrade to the recording WebSocket
//! - GET /sessions/:id/status - Live buffer state of a session
//! - GET /sessions/:id/parts - Stored parts of a session
//! - GET /health - Health check

mod handlers;
mod routes;
mod socket;
mod state;

pub use routes::create_router;
pub use state::AppState;
