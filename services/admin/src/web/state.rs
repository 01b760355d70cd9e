//! services/admin/src/web/state.rs
//!
//! Defines the application's shared state and the per-request session context.

use crate::adapters::{CookieChannel, CookieSettings};
use crate::config::Config;
use crate::error::ApiError;
use axum::{
    http::{header, HeaderMap, HeaderValue},
    response::Response,
};
use lam_phuong_core::{
    guard::DEFAULT_EXCLUDED_PATHS, AuthApi, AuthRoutes, AuthSessionManager, Clock, EdgeGate,
    GatePolicy, MemoryStore, RecordingNavigator, ResourceLoader, RouteGuard, TokenUserStore,
};
use std::sync::Arc;
use tracing::error;

/// Service routes the edge gate must never redirect, on top of the defaults.
const SERVICE_EXCLUDED_PATHS: &[&str] = &[r"^/auth/", r"^/swagger-ui", r"^/api-docs"];

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth_api: Arc<dyn AuthApi>,
    pub resources: Arc<ResourceLoader>,
    pub gate: Arc<EdgeGate>,
    pub routes: AuthRoutes,
    pub clock: Arc<dyn Clock>,
    /// Client used by the `/api` proxy.
    pub http: reqwest::Client,
    session_lifetime: chrono::Duration,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        auth_api: Arc<dyn AuthApi>,
        resources: Arc<ResourceLoader>,
        clock: Arc<dyn Clock>,
        http: reqwest::Client,
    ) -> Result<Self, ApiError> {
        let routes = AuthRoutes::default();
        let policy = GatePolicy::new(
            routes.clone(),
            DEFAULT_EXCLUDED_PATHS
                .iter()
                .chain(SERVICE_EXCLUDED_PATHS.iter()),
        )
        .map_err(|e| ApiError::Internal(format!("Invalid gate pattern: {}", e)))?;
        let session_lifetime = chrono::Duration::from_std(config.session_max_age)
            .map_err(|e| ApiError::Internal(format!("Invalid session lifetime: {}", e)))?;

        Ok(Self {
            config,
            auth_api,
            resources,
            gate: Arc::new(EdgeGate::new(policy)),
            routes,
            clock,
            http,
            session_lifetime,
        })
    }

    pub fn cookie_settings(&self) -> CookieSettings {
        CookieSettings {
            max_age: self.config.session_max_age,
            secure: self.config.secure_cookies,
        }
    }
}

//=========================================================================================
// SessionContext (Specific to One Request)
//=========================================================================================

/// The session manager for one request, wired to that request's cookies.
///
/// Server-side there is no browser local storage, so the local channel is a
/// map that lives as long as the request.
pub struct SessionContext {
    pub manager: Arc<AuthSessionManager>,
    pub navigator: Arc<RecordingNavigator>,
    cookies: Arc<CookieChannel>,
    routes: AuthRoutes,
}

impl SessionContext {
    pub fn from_headers(state: &AppState, headers: &HeaderMap) -> Self {
        let cookies = Arc::new(CookieChannel::from_headers(headers, state.cookie_settings()));
        let store = Arc::new(TokenUserStore::new(
            cookies.clone(),
            Arc::new(MemoryStore::new()),
            state.clock.clone(),
            state.session_lifetime,
        ));
        let navigator = Arc::new(RecordingNavigator::new());
        let manager = Arc::new(AuthSessionManager::new(
            store,
            state.auth_api.clone(),
            navigator.clone(),
            state.routes.clone(),
        ));

        Self {
            manager,
            navigator,
            cookies,
            routes: state.routes.clone(),
        }
    }

    pub fn guard(&self) -> RouteGuard {
        RouteGuard::new(self.manager.clone(), self.routes.clone())
    }

    /// Copies every cookie change made during the request onto `response`.
    pub fn finish(&self, mut response: Response) -> Response {
        for cookie in self.cookies.set_cookie_headers() {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
                Err(e) => error!("Dropping unrepresentable Set-Cookie header: {}", e),
            }
        }
        response
    }
}
