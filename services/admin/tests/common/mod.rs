//! Shared fixtures for the admin service integration tests.
#![allow(dead_code)]

use admin_lib::config::Config;
use admin_lib::web::{build_router, AppState};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response},
    Router,
};
use lam_phuong_core::{
    AuthApi, Credentials, LocalResponseCache, MemoryStore, PortError, PortResult, ResourceApi,
    ResourceKind, ResourceLoader, SignInResponse, SystemClock, User,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

pub const TOKEN: &str = "token-abc";
pub const PASSWORD: &str = "Secret#123";
/// `{"id":"7","email":"user@example.com","role":"admin"}` as the browser stores it.
pub const USER_COOKIE: &str = "lp_auth_user=%7B%22id%22%3A%227%22%2C%22email%22%3A%22user%40example.com%22%2C%22role%22%3A%22admin%22%7D";

pub fn user() -> User {
    User {
        id: "7".to_string(),
        email: "user@example.com".to_string(),
        role: "admin".to_string(),
    }
}

pub fn session_cookie() -> String {
    format!("lp_auth_token={}; {}", TOKEN, USER_COOKIE)
}

//=========================================================================================
// Fake Remote API
//=========================================================================================

pub struct FakeRemote {
    sign_in_result: Mutex<PortResult<SignInResponse>>,
    lists: Mutex<HashMap<ResourceKind, PortResult<Vec<Value>>>>,
    pub sign_in_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub last_list_token: Mutex<Option<String>>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sign_in_result: Mutex::new(Ok(SignInResponse {
                token: TOKEN.to_string(),
                user: user(),
            })),
            lists: Mutex::new(HashMap::new()),
            sign_in_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            last_list_token: Mutex::new(None),
        })
    }

    pub fn fail_sign_in(&self, error: PortError) {
        *self.sign_in_result.lock().unwrap() = Err(error);
    }

    pub fn set_list(&self, kind: ResourceKind, result: PortResult<Vec<Value>>) {
        self.lists.lock().unwrap().insert(kind, result);
    }
}

#[async_trait]
impl AuthApi for FakeRemote {
    async fn sign_in(&self, credentials: &Credentials) -> PortResult<SignInResponse> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        if credentials.password != PASSWORD {
            return Err(PortError::Unauthorized);
        }
        self.sign_in_result.lock().unwrap().clone()
    }

    async fn sign_out(&self, _token: &str) -> PortResult<()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ResourceApi for FakeRemote {
    async fn list(&self, kind: ResourceKind, token: Option<&str>) -> PortResult<Vec<Value>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_list_token.lock().unwrap() = token.map(str::to_string);
        self.lists
            .lock()
            .unwrap()
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

//=========================================================================================
// App Wiring
//=========================================================================================

pub fn test_config(api_base_url: &str) -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        api_base_url: api_base_url.to_string(),
        log_level: tracing::Level::DEBUG,
        cache_dir: None,
        cache_ttl: Duration::from_secs(300),
        session_max_age: Duration::from_secs(3600),
        secure_cookies: false,
        cors_origin: None,
        api_timeout: Duration::from_secs(5),
    }
}

pub fn app_with(remote: Arc<FakeRemote>, api_base_url: &str) -> Router {
    let clock = Arc::new(SystemClock);
    let cache = Arc::new(LocalResponseCache::new(
        Arc::new(MemoryStore::new()),
        clock.clone(),
    ));
    let resources = Arc::new(ResourceLoader::new(
        remote.clone(),
        cache,
        chrono::Duration::minutes(5),
    ));
    let state = AppState::new(
        Arc::new(test_config(api_base_url)),
        remote,
        resources,
        clock,
        reqwest::Client::new(),
    )
    .unwrap();
    build_router(Arc::new(state))
}

pub fn app(remote: Arc<FakeRemote>) -> Router {
    app_with(remote, "http://127.0.0.1:9")
}

//=========================================================================================
// Request Helpers
//=========================================================================================

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
