//! services/admin/src/web/routes.rs
//!
//! Assembles the service router.

use crate::web::{
    auth::{login_form_handler, login_handler, login_page, logout_handler},
    middleware::{edge_gate, require_session},
    proxy::proxy_handler,
    rest::{clear_cache_handler, landing_handler, list_resource_handler, me_handler},
    state::AppState,
};
use axum::{
    middleware as axum_middleware,
    routing::{any, delete, get, post},
    Router,
};
use std::sync::Arc;

/// Builds every route behind the edge gate. CORS and Swagger are added by the binary.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    // Public routes (no session required)
    let public_routes = Router::new()
        .route("/login", get(login_page).post(login_form_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/api/{*path}", any(proxy_handler));

    // Protected routes (full session required)
    let protected_routes = Router::new()
        .route("/", get(landing_handler))
        .route("/me", get(me_handler))
        .route("/data/cache", delete(clear_cache_handler))
        .route("/data/{resource}", get(list_resource_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_session,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            edge_gate,
        ))
        .with_state(app_state)
}
