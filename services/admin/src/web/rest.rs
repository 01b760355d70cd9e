//! services/admin/src/web/rest.rs
//!
//! Contains the Axum handlers for the signed-in pages and data endpoints, and
//! the master definition for the OpenAPI specification.

use crate::web::auth::{
    self, AuthErrorResponse, FieldErrorResponse, LoginRequest, LoginResponse, UserResponse,
};
use crate::web::state::{AppState, SessionContext};
use axum::{
    extract::{OriginalUri, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
    Extension,
};
use lam_phuong_core::{ResourceKind, Session, TokenRejected};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login_handler,
        auth::logout_handler,
        landing_handler,
        me_handler,
        list_resource_handler,
        clear_cache_handler,
    ),
    components(
        schemas(
            LoginRequest,
            LoginResponse,
            UserResponse,
            AuthErrorResponse,
            FieldErrorResponse,
            LandingResponse,
            ResourceListResponse,
            ErrorResponse
        )
    ),
    tags(
        (name = "Lam Phuong Admin", description = "Session-aware gateway for the recruitment admin console.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct LandingResponse {
    pub user: UserResponse,
    /// Slugs accepted by `/data/{resource}`.
    pub resources: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ResourceListResponse {
    pub resource: String,
    pub count: usize,
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<Value>,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

fn not_found(message: String) -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// The landing page for a signed-in user.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Signed-in landing data", body = LandingResponse),
        (status = 307, description = "No session; redirect to the sign-in page")
    )
)]
pub async fn landing_handler(Extension(session): Extension<Session>) -> Json<LandingResponse> {
    Json(LandingResponse {
        user: session.user.into(),
        resources: ResourceKind::ALL
            .iter()
            .map(|kind| kind.slug().to_string())
            .collect(),
    })
}

/// The signed-in user's profile.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 307, description = "No session; redirect to the sign-in page")
    )
)]
pub async fn me_handler(Extension(session): Extension<Session>) -> Json<UserResponse> {
    Json(session.user.into())
}

/// List one remote resource. Reference data is served from the cache held
/// for this session's token; other lists always go to the remote API.
///
/// When the remote API rejects the token the session is cleared and the
/// browser is sent to the sign-in page with a return path.
#[utoipa::path(
    get,
    path = "/data/{resource}",
    params(
        ("resource" = String, Path, description = "Resource slug, e.g. `job-categories`.")
    ),
    responses(
        (status = 200, description = "Resource items", body = ResourceListResponse),
        (status = 303, description = "Token rejected; session cleared, redirect to sign-in"),
        (status = 404, description = "Unknown resource", body = ErrorResponse)
    )
)]
pub async fn list_resource_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Path(resource): Path<String>,
) -> Response {
    let Some(kind) = ResourceKind::from_slug(&resource) else {
        return not_found(format!("Unknown resource '{}'", resource));
    };

    match state.resources.load_list(kind, Some(&session.token)).await {
        Ok(items) => Json(ResourceListResponse {
            resource: kind.slug().to_string(),
            count: items.len(),
            items,
        })
        .into_response(),
        Err(TokenRejected) => {
            warn!("Remote API rejected the session token on {}", uri.path());
            let current = uri
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| uri.path().to_string());

            let context = SessionContext::from_headers(&state, &headers);
            context.manager.bootstrap().await;
            context.manager.handle_unauthorized(&current).await;

            let target = context
                .navigator
                .last()
                .map(|n| n.target)
                .unwrap_or_else(|| state.routes.sign_in_url(Some(&current), true));
            context.finish(Redirect::to(&target).into_response())
        }
    }
}

/// Drop every cached resource list.
#[utoipa::path(
    delete,
    path = "/data/cache",
    responses(
        (status = 204, description = "Cache cleared")
    )
)]
pub async fn clear_cache_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> StatusCode {
    state.resources.invalidate_all().await;
    info!("Resource cache cleared by {}", session.user.email);
    StatusCode::NO_CONTENT
}
