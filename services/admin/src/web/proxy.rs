//! services/admin/src/web/proxy.rs
//!
//! Forwards `/api/*` calls from the browser to the remote API, attaching the
//! session token from the cookie as a bearer token.

use crate::adapters::cookies::read_cookie;
use crate::web::state::AppState;
use axum::{
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use lam_phuong_core::session_store::TOKEN_KEY;
use std::sync::Arc;
use tracing::{debug, error};

/// Request headers copied onto the upstream call.
const FORWARDED_HEADERS: [header::HeaderName; 3] =
    [header::CONTENT_TYPE, header::ACCEPT, header::ACCEPT_LANGUAGE];

fn upstream_url(base_url: &str, path: &str, query: Option<&str>) -> String {
    let mut url = format!("{}/{}", base_url, path.trim_start_matches('/'));
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }
    url
}

pub async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let url = upstream_url(&state.config.api_base_url, &path, query.as_deref());
    debug!("Proxying {} {}", method, url);

    let mut request = state.http.request(method, &url);
    for name in FORWARDED_HEADERS {
        if let Some(value) = headers.get(&name) {
            request = request.header(name, value.clone());
        }
    }

    // An explicit Authorization header wins over the session cookie.
    if let Some(auth) = headers.get(header::AUTHORIZATION) {
        request = request.header(header::AUTHORIZATION, auth.clone());
    } else if let Some(token) = read_cookie(&headers, TOKEN_KEY) {
        request = request.bearer_auth(token);
    }

    if !body.is_empty() {
        request = request.body(body);
    }

    let upstream = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            error!("Proxy request to {} failed: {}", url, e);
            return (StatusCode::BAD_GATEWAY, "Remote API unavailable").into_response();
        }
    };

    let status = upstream.status();
    let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
    let bytes = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Failed to read proxied response from {}: {}", url, e);
            return (StatusCode::BAD_GATEWAY, "Remote API unavailable").into_response();
        }
    };

    let mut response = (status, bytes).into_response();
    if let Some(content_type) = content_type {
        response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    } else {
        response.headers_mut().remove(header::CONTENT_TYPE);
    }
    response
}
