// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # HTTP API Integration Tests
//!
//! Drives the router end to end with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use keygate_tests::prelude::*;

// =============================================================================
// Helpers
// =============================================================================

async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, response_json(response).await)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, response_json(response).await)
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

fn error_message(body: &Value) -> &str {
    body["error"]["message"].as_str().unwrap_or_default()
}

async fn generate(
    router: &Router,
    user: &UserFixture,
    application: &str,
    role: &str,
) -> (StatusCode, Value) {
    post_json(
        router,
        "/generate-pat",
        json!({
            "user_id": user.user_id,
            "application_id": application,
            "role_id": role,
        }),
    )
    .await
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_api_login_success() {
    init_test_logging();
    let router = Scenario::standard().into_context().router();

    let (status, body) = post_json(
        &router,
        "/login",
        json!({ "username": ALICE.username, "password": ALICE.password }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["user_id"], ALICE.user_id);
    assert_eq!(body["user_name"], "Alice");
}

#[tokio::test]
async fn test_api_login_failures_are_indistinguishable() {
    let router = Scenario::standard().into_context().router();

    for (username, password) in [
        (ALICE.username, "correct horsf"),
        ("mallory", "correct horse"),
        (CAROL.username, CAROL.password),
        (DAVE.username, DAVE.password),
    ] {
        let (status, body) = post_json(
            &router,
            "/login",
            json!({ "username": username, "password": password }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(&body), "UNAUTHORIZED");
        assert_eq!(error_message(&body), "Invalid username or password");
    }
}

#[tokio::test]
async fn test_api_login_missing_fields() {
    let router = Scenario::standard().into_context().router();
    let (status, body) = post_json(&router, "/login", json!({ "username": "alice" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "BAD_REQUEST");
}

// =============================================================================
// Tokens
// =============================================================================

#[tokio::test]
async fn test_api_generate_then_introspect() {
    let ctx = Scenario::standard().into_context();
    let router = ctx.router();

    let (status, body) = generate(&router, &ALICE, PORTAL, BILLING_ROLE).await;
    assert_eq!(status, StatusCode::OK);
    let pat = body["pat"].as_str().unwrap().to_string();
    assert_eq!(pat, ZERO_KEY_TOKEN);
    assert!(body["expires_at"].is_null());

    let (status, body) = post_json(
        &router,
        "/introspect-pat",
        json!({ "user_id": ALICE.user_id, "pat": pat }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], ALICE.user_id);
    assert_eq!(body["application_id"], PORTAL);
    assert_eq!(body["role_id"], BILLING_ROLE);
    assert_eq!(body["active"], true);
    assert_eq!(body["current"], true);
}

#[tokio::test]
async fn test_api_generate_without_grant_is_forbidden() {
    let ctx = Scenario::standard().into_context();
    let router = ctx.router();

    let (status, body) = generate(&router, &ALICE, UNLISTED_APP, UNLISTED_ROLE).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "FORBIDDEN");
    assert_eq!(error_message(&body), "Invalid access or expired association");
    assert_eq!(ctx.store.issued_token_count(), 0);
}

#[tokio::test]
async fn test_api_tampered_token_is_generic() {
    let router = Scenario::standard().into_context().router();

    for pat in [
        "v2:ha5WKZsKc8PLgTzij76Uhh==",
        "v2:AAAAAAAAAAAAAAAAAAAAAA==",
        "v2:!!!",
        "garbage",
    ] {
        let (status, body) = post_json(
            &router,
            "/introspect-pat",
            json!({ "user_id": ALICE.user_id, "pat": pat }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "pat {:?}", pat);
        assert_eq!(error_code(&body), "INVALID_TOKEN");
        assert_eq!(error_message(&body), "Invalid token");

        let text = body.to_string().to_lowercase();
        assert!(!text.contains("padding"));
        assert!(!text.contains("base64"));
        assert!(!text.contains("utf-8"));
    }
}

#[tokio::test]
async fn test_api_foreign_token_forbidden() {
    let router = Scenario::standard().into_context().router();
    let (_, body) = generate(&router, &ALICE, PORTAL, BILLING_ROLE).await;

    let (status, body) = post_json(
        &router,
        "/introspect-pat",
        json!({ "user_id": ERIN.user_id, "pat": body["pat"] }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "FORBIDDEN");
}

#[tokio::test]
async fn test_api_missing_key_record_hides_reference() {
    let router = Scenario::standard().into_context().router();

    let (status, body) = generate(&router, &DAVE, PORTAL, BILLING_ROLE).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");
    assert_eq!(error_message(&body), "user key not found");
    assert!(!body.to_string().contains("k-missing"));
}

#[tokio::test]
async fn test_api_store_outage_is_internal() {
    let ctx = ContextBuilder::new(Scenario::standard())
        .wrap_store(|store| Arc::new(UnavailableStore::new(store)))
        .build();
    let router = ctx.router();

    let (status, body) = generate(&router, &ALICE, PORTAL, BILLING_ROLE).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_code(&body), "INTERNAL_ERROR");
    assert_eq!(error_message(&body), "An internal error occurred");
    assert!(!body.to_string().contains("db-primary"));
}

#[tokio::test]
async fn test_api_concurrent_reissue_conflicts() {
    let ctx = ContextBuilder::new(Scenario::standard())
        .wrap_store(|store| Arc::new(RacingStore::new(store)))
        .build();

    let (status, body) = generate(&ctx.router(), &BOB, PORTAL, BILLING_ROLE).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "CONFLICT");
}

// =============================================================================
// Listings
// =============================================================================

#[tokio::test]
async fn test_api_user_pats() {
    let router = Scenario::standard().into_context().router();
    let (_, issued) = generate(&router, &BOB, PORTAL, BILLING_ROLE).await;

    let (status, body) = get(&router, "/user/pats?user_id=u2").await;
    assert_eq!(status, StatusCode::OK);

    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    let portal = entries
        .iter()
        .find(|e| e["application_id"] == PORTAL)
        .unwrap();
    assert_eq!(portal["application_name"], "Customer Portal");
    assert_eq!(portal["token"], issued["pat"]);

    let unlisted = entries
        .iter()
        .find(|e| e["application_id"] == UNLISTED_APP)
        .unwrap();
    assert_eq!(unlisted["application_name"], "Unknown");
    assert_eq!(unlisted["component_name"], "Unknown");
}

#[tokio::test]
async fn test_api_user_components() {
    let router = Scenario::standard().into_context().router();

    let (status, body) = get(&router, "/user/components?user_id=u1").await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["component_id"], BILLING_COMPONENT);
    assert_eq!(entries[0]["component_name"], "Billing API");
}

#[tokio::test]
async fn test_api_listing_requires_user_id() {
    let router = Scenario::standard().into_context().router();
    for uri in ["/user/pats", "/user/components?user_id=", "/user/pats?user_id=%20"] {
        let (status, body) = get(&router, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "uri {}", uri);
        assert_eq!(error_code(&body), "BAD_REQUEST");
    }
}

#[tokio::test]
async fn test_api_health() {
    let router = Scenario::standard().into_context().router();
    let (status, body) = get(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "keygate-test");
}
