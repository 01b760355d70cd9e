pub mod auth;
pub mod middleware;
pub mod proxy;
pub mod rest;
pub mod routes;
pub mod state;

// Re-export the router builder so the binary and the integration tests share one wiring.
pub use routes::build_router;
pub use state::{AppState, SessionContext};
