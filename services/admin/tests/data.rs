//! Resource listing, caching and forced sign-out on a rejected token.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::*;
use lam_phuong_core::{PortError, ResourceKind};
use serde_json::json;
use std::sync::atomic::Ordering;

#[tokio::test]
async fn lists_items_with_the_session_token() {
    let remote = FakeRemote::new();
    remote.set_list(
        ResourceKind::JobPostings,
        Ok(vec![json!({"id": 1, "title": "Bếp chính"})]),
    );
    let app = app(remote.clone());

    let response = send(&app, get("/data/job-postings", Some(&session_cookie()))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["resource"], "job-postings");
    assert_eq!(body["count"], 1);
    assert_eq!(body["items"][0]["title"], "Bếp chính");
    assert_eq!(
        remote.last_list_token.lock().unwrap().as_deref(),
        Some(TOKEN)
    );
}

#[tokio::test]
async fn reference_data_is_served_from_cache() {
    let remote = FakeRemote::new();
    remote.set_list(ResourceKind::Locations, Ok(vec![json!({"id": 1, "name": "Quận 1"})]));
    let app = app(remote.clone());

    for _ in 0..3 {
        let response = send(&app, get("/data/locations", Some(&session_cookie()))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["count"], 1);
    }
    assert_eq!(remote.list_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn non_reference_data_is_fetched_every_time() {
    let remote = FakeRemote::new();
    let app = app(remote.clone());

    send(&app, get("/data/users", Some(&session_cookie()))).await;
    send(&app, get("/data/users", Some(&session_cookie()))).await;

    assert_eq!(remote.list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn clearing_the_cache_forces_a_refetch() {
    let remote = FakeRemote::new();
    let app = app(remote.clone());

    send(&app, get("/data/job-types", Some(&session_cookie()))).await;

    let clear = Request::builder()
        .method(Method::DELETE)
        .uri("/data/cache")
        .header(header::COOKIE, session_cookie())
        .body(Body::empty())
        .unwrap();
    let response = send(&app, clear).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    send(&app, get("/data/job-types", Some(&session_cookie()))).await;
    assert_eq!(remote.list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unknown_resource_is_not_found() {
    let app = app(FakeRemote::new());

    let response = send(&app, get("/data/invoices", Some(&session_cookie()))).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn remote_failures_degrade_to_an_empty_list() {
    let remote = FakeRemote::new();
    remote.set_list(
        ResourceKind::ProductGroups,
        Err(PortError::Network("timeout".to_string())),
    );
    let app = app(remote);

    let response = send(&app, get("/data/product-groups", Some(&session_cookie()))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["count"], 0);
}

#[tokio::test]
async fn rejected_token_clears_session_and_redirects() {
    let remote = FakeRemote::new();
    remote.set_list(ResourceKind::Users, Err(PortError::Unauthorized));
    let app = app(remote);

    let response = send(&app, get("/data/users?page=3", Some(&session_cookie()))).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "/login?redirect=%2Fdata%2Fusers%3Fpage%3D3&unauthorized=true"
    );
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
}

#[tokio::test]
async fn cached_lists_are_not_served_to_another_token() {
    let remote = FakeRemote::new();
    remote.set_list(ResourceKind::Locations, Ok(vec![json!({"id": 1, "name": "Quận 1"})]));
    let app = app(remote.clone());

    let primed = send(&app, get("/data/locations", Some(&session_cookie()))).await;
    assert_eq!(primed.status(), StatusCode::OK);

    remote.set_list(ResourceKind::Locations, Err(PortError::Unauthorized));
    let forged = format!("lp_auth_token=forged; {}", USER_COOKIE);
    let response = send(&app, get("/data/locations", Some(&forged))).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "/login?redirect=%2Fdata%2Flocations&unauthorized=true"
    );
    assert_eq!(remote.list_calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        remote.last_list_token.lock().unwrap().as_deref(),
        Some("forged")
    );

    // The session that loaded the list still gets it from its own cache entry.
    let again = send(&app, get("/data/locations", Some(&session_cookie()))).await;
    assert_eq!(again.status(), StatusCode::OK);
    assert_eq!(body_json(again).await["count"], 1);
    assert_eq!(remote.list_calls.load(Ordering::SeqCst), 2);
}
