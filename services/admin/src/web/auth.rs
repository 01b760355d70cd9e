//! services/admin/src/web/auth.rs
//!
//! Sign-in page plus sign-in and sign-out endpoints.

use axum::{
    extract::{OriginalUri, Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use lam_phuong_core::{
    guard::sanitize_redirect, validation::FieldError, AuthError, Credentials, Location, Session,
    User,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::web::state::{AppState, SessionContext};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl From<LoginRequest> for Credentials {
    fn from(req: LoginRequest) -> Self {
        Credentials {
            email: req.email.trim().to_string(),
            password: req.password,
        }
    }
}

#[derive(Deserialize, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct SignInQuery {
    /// Path to return to after signing in.
    pub redirect: Option<String>,
    /// `true` when the sign-in page was reached through a forced redirect.
    /// Only drives the notice on the page; any other value is ignored.
    pub unauthorized: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub redirect_to: String,
}

#[derive(Serialize, ToSchema)]
pub struct FieldErrorResponse {
    pub field: String,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthErrorResponse {
    pub message: String,
    pub errors: Vec<FieldErrorResponse>,
}

//=========================================================================================
// Shared Sign-in Flow
//=========================================================================================

fn status_for(e: &AuthError) -> StatusCode {
    match e {
        AuthError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::Network(_) | AuthError::Server(_) => StatusCode::BAD_GATEWAY,
        AuthError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn field_errors(e: &AuthError) -> Vec<FieldError> {
    match e {
        AuthError::Validation(errors) => errors.errors.clone(),
        _ => Vec::new(),
    }
}

/// Message shown to the user; upstream details stay in the logs.
fn public_message(e: &AuthError) -> String {
    match e {
        AuthError::Validation(_) | AuthError::InvalidCredentials => e.to_string(),
        AuthError::Network(_) | AuthError::Server(_) => {
            "The authentication service is unavailable, please try again".to_string()
        }
        AuthError::Storage(_) => "Could not start a session".to_string(),
    }
}

async fn sign_in(
    state: &AppState,
    headers: &HeaderMap,
    credentials: Credentials,
) -> (SessionContext, Result<Session, AuthError>) {
    let context = SessionContext::from_headers(state, headers);
    context.manager.bootstrap().await;
    let result = context.manager.sign_in(&credentials).await;
    if let Err(e) = &result {
        if matches!(e, AuthError::Storage(_) | AuthError::Server(_)) {
            error!("Sign-in failed: {}", e);
        }
    }
    (context, result)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /login - Minimal sign-in form
pub async fn login_page(OriginalUri(uri): OriginalUri) -> Html<String> {
    let location = Location::parse(uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/"));
    render_login_page(location.was_forced(), &[])
}

/// POST /login - Form sign-in, redirects on success
pub async fn login_form_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SignInQuery>,
    headers: HeaderMap,
    Form(req): Form<LoginRequest>,
) -> Response {
    let (context, result) = sign_in(&state, &headers, req.into()).await;
    match result {
        Ok(_) => {
            let target = sanitize_redirect(query.redirect.as_deref(), &state.routes.landing_path);
            context.finish(Redirect::to(&target).into_response())
        }
        Err(e) => {
            let mut messages: Vec<String> =
                field_errors(&e).into_iter().map(|f| f.message).collect();
            if messages.is_empty() {
                messages.push(public_message(&e));
            }
            (status_for(&e), render_login_page(false, &messages)).into_response()
        }
    }
}

/// POST /auth/login - JSON sign-in
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    params(SignInQuery),
    responses(
        (status = 200, description = "Signed in; session cookies set", body = LoginResponse),
        (status = 401, description = "Invalid email or password", body = AuthErrorResponse),
        (status = 422, description = "Input failed local validation", body = AuthErrorResponse),
        (status = 502, description = "Remote API unavailable", body = AuthErrorResponse)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SignInQuery>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Response {
    let (context, result) = sign_in(&state, &headers, req.into()).await;
    match result {
        Ok(session) => {
            let response = LoginResponse {
                user: session.user.into(),
                redirect_to: sanitize_redirect(
                    query.redirect.as_deref(),
                    &state.routes.landing_path,
                ),
            };
            context.finish((StatusCode::OK, Json(response)).into_response())
        }
        Err(e) => {
            let body = AuthErrorResponse {
                message: public_message(&e),
                errors: field_errors(&e)
                    .into_iter()
                    .map(|f| FieldErrorResponse {
                        field: f.field.to_string(),
                        message: f.message,
                    })
                    .collect(),
            };
            (status_for(&e), Json(body)).into_response()
        }
    }
}

/// POST /auth/logout - Sign out and reload the sign-in page
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 303, description = "Signed out; cookies cleared, redirect to the sign-in page")
    )
)]
pub async fn logout_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let context = SessionContext::from_headers(&state, &headers);
    context.manager.bootstrap().await;
    context.manager.sign_out().await;

    let target = context
        .navigator
        .last()
        .map(|n| n.target)
        .unwrap_or_else(|| state.routes.sign_in_path.clone());

    // A full navigation plus a cleared HTTP cache: nothing protected stays rendered.
    let response = (
        [("clear-site-data", "\"cache\"")],
        Redirect::to(&target),
    )
        .into_response();
    context.finish(response)
}

//=========================================================================================
// Page Rendering
//=========================================================================================

fn render_login_page(unauthorized: bool, errors: &[String]) -> Html<String> {
    let mut notice = String::new();
    if unauthorized {
        notice.push_str("<p class=\"notice\">Please sign in to continue.</p>\n");
    }
    for message in errors {
        notice.push_str(&format!("<p class=\"error\">{}</p>\n", html_escape(message)));
    }

    Html(format!(
        r#"<!doctype html>
<html lang="vi">
<head><meta charset="utf-8"><title>Lam Phương Admin</title></head>
<body>
<h1>Lam Phương Admin</h1>
{notice}<form method="post">
<label>Email <input type="email" name="email" required></label>
<label>Password <input type="password" name="password" required></label>
<button type="submit">Sign in</button>
</form>
</body>
</html>
"#
    ))
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
