//! crates/lam_phuong_core/src/guard.rs
//!
//! The two layers of route protection.
//!
//! `EdgeGate` decides, per incoming request, from the session cookie alone.
//! `RouteGuard` runs after the session manager has bootstrapped and also
//! accepts sessions that only exist in local storage.

use regex::RegexSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::form_urlencoded;

use crate::ports::NavigationMode;
use crate::session::AuthSessionManager;

pub const REDIRECT_PARAM: &str = "redirect";
pub const UNAUTHORIZED_PARAM: &str = "unauthorized";

/// Paths the edge gate never intercepts: build assets, image optimization,
/// the API proxy, and anything that looks like a static file.
pub const DEFAULT_EXCLUDED_PATHS: &[&str] = &[
    r"^/api(/|$)",
    r"^/_next/static(/|$)",
    r"^/_next/image(/|$)",
    r"^/static(/|$)",
    r"^/assets(/|$)",
    r"^/favicon\.ico$",
    r"\.(?:svg|png|jpe?g|gif|webp|ico|css|js|map|txt|woff2?)$",
];

//=========================================================================================
// Routes and Locations
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRoutes {
    pub sign_in_path: String,
    pub landing_path: String,
}

impl Default for AuthRoutes {
    fn default() -> Self {
        Self {
            sign_in_path: "/login".to_string(),
            landing_path: "/".to_string(),
        }
    }
}

impl AuthRoutes {
    pub fn is_sign_in(&self, path: &str) -> bool {
        path.trim_end_matches('/') == self.sign_in_path.trim_end_matches('/')
    }

    /// Builds `/login?redirect=<path>&unauthorized=true`.
    pub fn sign_in_url(&self, redirect: Option<&str>, unauthorized: bool) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(target) = redirect {
            query.append_pair(REDIRECT_PARAM, target);
        }
        if unauthorized {
            query.append_pair(UNAUTHORIZED_PARAM, "true");
        }
        let query = query.finish();
        if query.is_empty() {
            self.sign_in_path.clone()
        } else {
            format!("{}?{}", self.sign_in_path, query)
        }
    }

    /// Where to send a user who is signed in but standing on the sign-in page.
    pub fn post_sign_in_target(&self, location: &Location) -> String {
        sanitize_redirect(location.query_param(REDIRECT_PARAM).as_deref(), &self.landing_path)
    }
}

/// Accepts same-origin absolute paths only; everything else falls back.
pub fn sanitize_redirect(target: Option<&str>, fallback: &str) -> String {
    match target {
        Some(t) if t.starts_with('/') && !t.starts_with("//") && !t.contains('\\') => t.to_string(),
        _ => fallback.to_string(),
    }
}

/// A request target split into path and raw query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub query: Option<String>,
}

impl Location {
    pub fn parse(path_and_query: &str) -> Self {
        match path_and_query.split_once('?') {
            Some((path, query)) => Self {
                path: path.to_string(),
                query: Some(query.to_string()).filter(|q| !q.is_empty()),
            },
            None => Self {
                path: path_and_query.to_string(),
                query: None,
            },
        }
    }

    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }

    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// The `unauthorized` flag only drives UI messaging, never guard logic.
    pub fn was_forced(&self) -> bool {
        self.query_param(UNAUTHORIZED_PARAM).as_deref() == Some("true")
    }
}

//=========================================================================================
// Edge Request Gate
//=========================================================================================

#[derive(Debug, Clone)]
pub struct GatePolicy {
    pub routes: AuthRoutes,
    excluded: RegexSet,
}

impl GatePolicy {
    pub fn new<I, S>(routes: AuthRoutes, excluded_patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            routes,
            excluded: RegexSet::new(excluded_patterns)?,
        })
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded.is_match(path)
    }
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            routes: AuthRoutes::default(),
            excluded: RegexSet::new(DEFAULT_EXCLUDED_PATHS)
                .expect("default gate patterns are valid regexes"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Pass,
    Redirect(String),
}

/// Request-level check that only looks at whether the token cookie exists.
#[derive(Debug, Clone, Default)]
pub struct EdgeGate {
    policy: GatePolicy,
}

impl EdgeGate {
    pub fn new(policy: GatePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &GatePolicy {
        &self.policy
    }

    pub fn decide(&self, location: &Location, has_token_cookie: bool) -> GateDecision {
        let routes = &self.policy.routes;

        if self.policy.is_excluded(&location.path) {
            return GateDecision::Pass;
        }

        if routes.is_sign_in(&location.path) {
            return if has_token_cookie {
                GateDecision::Redirect(routes.landing_path.clone())
            } else {
                GateDecision::Pass
            };
        }

        if has_token_cookie {
            GateDecision::Pass
        } else {
            GateDecision::Redirect(routes.sign_in_url(Some(&location.path_and_query()), true))
        }
    }
}

//=========================================================================================
// Client Route Guard
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// The session manager is still initializing; show neither content nor redirect.
    Loading,
    Render,
    Redirect(String),
    /// A newer navigation started, or the guard was torn down, while this check ran.
    Discarded,
}

pub struct RouteGuard {
    manager: Arc<AuthSessionManager>,
    routes: AuthRoutes,
    generation: AtomicU64,
    teardown: CancellationToken,
}

impl RouteGuard {
    pub fn new(manager: Arc<AuthSessionManager>, routes: AuthRoutes) -> Self {
        Self {
            manager,
            routes,
            generation: AtomicU64::new(0),
            teardown: CancellationToken::new(),
        }
    }

    /// Re-validates the session for `location`. Must run on every route change.
    pub async fn check(&self, location: &Location) -> GuardOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if self.manager.is_loading() {
            return GuardOutcome::Loading;
        }

        // After initialization storage decides; an expired or cleared copy
        // is picked up here rather than hidden by the in-memory flag.
        let has_session = tokio::select! {
            _ = self.teardown.cancelled() => return GuardOutcome::Discarded,
            presence = self.manager.store().presence() => presence.any(),
        };

        if self.teardown.is_cancelled() || self.generation.load(Ordering::SeqCst) != generation {
            debug!("Discarding stale guard check for {}", location.path);
            return GuardOutcome::Discarded;
        }

        if !has_session {
            self.manager.forget_session().await;
        }

        if self.routes.is_sign_in(&location.path) {
            if has_session {
                GuardOutcome::Redirect(self.routes.post_sign_in_target(location))
            } else {
                GuardOutcome::Render
            }
        } else if has_session {
            GuardOutcome::Render
        } else {
            GuardOutcome::Redirect(
                self.routes
                    .sign_in_url(Some(&location.path_and_query()), false),
            )
        }
    }

    /// Runs `check` and performs the redirect it asks for.
    pub async fn check_and_navigate(&self, location: &Location) -> GuardOutcome {
        let outcome = self.check(location).await;
        if let GuardOutcome::Redirect(target) = &outcome {
            self.manager.navigator().navigate(target, NavigationMode::Replace);
        }
        outcome
    }

    /// Called when the owning view goes away; in-flight checks resolve as `Discarded`.
    pub fn teardown(&self) {
        self.teardown.cancel();
    }
}
