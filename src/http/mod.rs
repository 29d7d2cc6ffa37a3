//! HTTP API for the presentation layer
//!
//! - POST /interview/connect - Start an interview for a role
//! - POST /interview/disconnect - End the interview
//! - GET /interview/status - Connection state, speaking flag, error, logs
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
