//! services/admin/src/web/middleware.rs
//!
//! The two layers of route protection.
//!
//! `edge_gate` wraps every route and only asks whether the token cookie
//! exists. `require_session` wraps the protected pages, bootstraps a full
//! session from the cookies and hands it to the handler.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use lam_phuong_core::{session_store::TOKEN_KEY, GateDecision, GuardOutcome, Location};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::adapters::cookies::read_cookie;
use crate::web::state::{AppState, SessionContext};

fn location_of(req: &Request) -> Location {
    Location::parse(
        req.uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/"),
    )
}

/// Redirects requests without a token cookie to the sign-in page, and signed-in
/// users away from it.
pub async fn edge_gate(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let location = location_of(&req);
    let has_token = read_cookie(req.headers(), TOKEN_KEY).is_some();

    match state.gate.decide(&location, has_token) {
        GateDecision::Pass => next.run(req).await,
        GateDecision::Redirect(target) => {
            debug!("Edge gate redirecting {} to {}", location.path, target);
            // Leaving the sign-in page always lands on a GET page, whatever the method.
            if state.routes.is_sign_in(&location.path) {
                Redirect::to(&target).into_response()
            } else {
                Redirect::temporary(&target).into_response()
            }
        }
    }
}

/// Validates the full session behind the cookies and inserts it into request
/// extensions for handlers to use.
///
/// A token cookie without a readable user profile is a partial session: the
/// cookies are cleared so the edge gate stops treating the browser as signed in.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let context = SessionContext::from_headers(&state, req.headers());
    context.manager.bootstrap().await;
    let location = location_of(&req);

    match context.guard().check(&location).await {
        GuardOutcome::Render => match context.manager.current_session().await {
            Some(session) => {
                req.extensions_mut().insert(session);
                next.run(req).await
            }
            None => {
                let target = state.routes.sign_in_url(Some(&location.path_and_query()), true);
                Redirect::temporary(&target).into_response()
            }
        },
        GuardOutcome::Redirect(target) => {
            warn!("Incomplete session on {}, clearing cookies", location.path);
            if let Err(e) = context.manager.store().clear_session().await {
                warn!("Failed to clear incomplete session: {}", e);
            }
            context.finish(Redirect::temporary(&target).into_response())
        }
        // Neither can happen after a completed bootstrap within one request.
        GuardOutcome::Loading | GuardOutcome::Discarded => {
            Redirect::temporary(&state.routes.sign_in_path).into_response()
        }
    }
}
