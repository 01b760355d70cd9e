//! Sign-in and sign-out endpoints.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::*;
use lam_phuong_core::PortError;
use serde_json::json;
use std::sync::atomic::Ordering;

fn json_login(uri: &str, email: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": email, "password": password }).to_string(),
        ))
        .unwrap()
}

fn form_login(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn json_sign_in_sets_both_cookies() {
    let remote = FakeRemote::new();
    let app = app(remote.clone());

    let response = send(
        &app,
        json_login("/auth/login?redirect=%2Fdata%2Fusers", "user@example.com", PASSWORD),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|c| c.starts_with("lp_auth_token=token-abc;")
        && c.contains("HttpOnly")
        && c.contains("Max-Age=3600")));
    assert!(cookies.iter().any(|c| c.starts_with(&format!("{};", USER_COOKIE))));

    let body = body_json(response).await;
    assert_eq!(body["user"]["id"], "7");
    assert_eq!(body["redirect_to"], "/data/users");
}

#[tokio::test]
async fn json_sign_in_ignores_offsite_redirects() {
    let app = app(FakeRemote::new());

    let response = send(
        &app,
        json_login(
            "/auth/login?redirect=%2F%2Fevil.example.com",
            "user@example.com",
            PASSWORD,
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["redirect_to"], "/");
}

#[tokio::test]
async fn invalid_input_never_reaches_the_remote_api() {
    let remote = FakeRemote::new();
    let app = app(remote.clone());

    let response = send(&app, json_login("/auth/login", "not-an-email", "short")).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(set_cookies(&response).is_empty());
    let body = body_json(response).await;
    let errors = body["errors"].as_array().cloned().unwrap_or_default();
    assert!(errors.iter().any(|e| e["field"] == "email"));
    assert!(errors
        .iter()
        .any(|e| e["message"] == "Password must be at least 8 characters long"));
    assert_eq!(remote.sign_in_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rejected_credentials_return_401_without_cookies() {
    let remote = FakeRemote::new();
    let app = app(remote.clone());

    let response = send(&app, json_login("/auth/login", "user@example.com", "Wrong#Pass1")).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).is_empty());
    assert_eq!(body_json(response).await["message"], "Invalid email or password");
    assert_eq!(remote.sign_in_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unreachable_remote_api_is_a_bad_gateway() {
    let remote = FakeRemote::new();
    remote.fail_sign_in(PortError::Network("connection refused".to_string()));
    let app = app(remote);

    let response = send(&app, json_login("/auth/login", "user@example.com", PASSWORD)).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(set_cookies(&response).is_empty());
}

#[tokio::test]
async fn form_sign_in_redirects_to_the_return_path() {
    let app = app(FakeRemote::new());

    let response = send(
        &app,
        form_login(
            "/login?redirect=%2Fdata%2Flocations&unauthorized=true",
            "email=user%40example.com&password=Secret%23123",
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/data/locations");
    assert_eq!(set_cookies(&response).len(), 2);
}

#[tokio::test]
async fn form_sign_in_failure_rerenders_the_page() {
    let app = app(FakeRemote::new());

    let response = send(&app, form_login("/login", "email=user%40example.com&password=abc")).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let page = body_text(response).await;
    assert!(page.contains("<form method=\"post\">"));
    assert!(page.contains("Password must contain at least one uppercase letter"));
}

#[tokio::test]
async fn sign_out_clears_cookies_and_reloads_sign_in() {
    let remote = FakeRemote::new();
    let app = app(remote.clone());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/logout")
        .header(header::COOKIE, session_cookie())
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    assert_eq!(
        response
            .headers()
            .get("clear-site-data")
            .and_then(|v| v.to_str().ok()),
        Some("\"cache\"")
    );
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
    assert_eq!(remote.sign_out_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn sign_out_without_session_still_lands_on_sign_in() {
    let remote = FakeRemote::new();
    let app = app(remote.clone());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/logout")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    assert_eq!(remote.sign_out_calls.load(Ordering::SeqCst), 0);
}
