// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Access Service Integration Tests
//!
//! - `test_login_*`: password verification
//! - `test_issue_*`: token issuance and grant updates
//! - `test_introspect_*`: token status reporting
//! - `test_listing_*`: per-user component and token listings

use std::sync::Arc;

use chrono::{Duration, Utc};
use keygate_core::crypto::{
    EncryptedToken, KeySize, KeySourceMode, TokenCodec, TokenPayload, WireVersion,
};
use keygate_core::{ApplicationId, CoreError, GrantKey, RoleId, TokenOptions, UserId};
use keygate_tests::prelude::*;

fn grant_key(user: &UserFixture, application: &str, role: &str) -> GrantKey {
    GrantKey::new(user.id(), ApplicationId::new(application), RoleId::new(role))
}

async fn issue(ctx: &TestContext, user: &UserFixture, application: &str, role: &str) -> String {
    ctx.service
        .issue_token(&user.id(), &application.into(), &role.into())
        .await
        .expect("token issued")
        .token
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_login_success() {
    init_test_logging();
    let ctx = Scenario::standard().into_context();

    let outcome = ctx.service.login(ALICE.username, ALICE.password).await.unwrap();
    assert_eq!(outcome.user_id, ALICE.id());
    assert_eq!(outcome.user_name, "Alice");

    let outcome = ctx.service.login(BOB.username, BOB.password).await.unwrap();
    assert_eq!(outcome.user_id, BOB.id());
}

#[tokio::test]
async fn test_login_any_single_character_change_fails() {
    let ctx = Scenario::standard().into_context();
    let password: Vec<char> = ALICE.password.chars().collect();

    for position in 0..password.len() {
        let mut altered = password.clone();
        altered[position] = if altered[position] == 'x' { 'y' } else { 'x' };
        let altered: String = altered.into_iter().collect();

        let result = ctx.service.login(ALICE.username, &altered).await;
        assert!(
            matches!(result, Err(CoreError::InvalidCredentials)),
            "altered at {} gave {:?}",
            position,
            result
        );
    }

    // Prefix and extension
    for altered in ["correct hors", "correct horse ", "Correct horse"] {
        assert!(matches!(
            ctx.service.login(ALICE.username, altered).await,
            Err(CoreError::InvalidCredentials)
        ));
    }
}

#[tokio::test]
async fn test_login_unknown_and_disabled_users() {
    let ctx = Scenario::standard().into_context();

    assert!(matches!(
        ctx.service.login("mallory", "whatever").await,
        Err(CoreError::InvalidCredentials)
    ));
    assert!(matches!(
        ctx.service.login(CAROL.username, CAROL.password).await,
        Err(CoreError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn test_login_empty_credentials() {
    let ctx = Scenario::standard().into_context();
    assert!(matches!(
        ctx.service.login("", "pw").await,
        Err(CoreError::Validation { .. })
    ));
    assert!(matches!(
        ctx.service.login(ALICE.username, "").await,
        Err(CoreError::Validation { .. })
    ));
}

#[tokio::test]
async fn test_login_missing_key_record() {
    let ctx = Scenario::standard().into_context();
    assert!(matches!(
        ctx.service.login(DAVE.username, DAVE.password).await,
        Err(CoreError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn test_login_direct_mode() {
    let direct = UserFixture {
        user_id: "d1",
        username: "direct",
        password: "hunter2",
        salt: "raw-salt",
    };
    let ctx = ContextBuilder::new(SeedBuilder::new().direct_user(&direct, KeySize::Aes128))
        .mode(KeySourceMode::Direct)
        .build();

    assert!(ctx.service.login("direct", "hunter2").await.is_ok());
    assert!(matches!(
        ctx.service.login("direct", "hunter3").await,
        Err(CoreError::InvalidCredentials)
    ));
}

// =============================================================================
// Issue
// =============================================================================

#[tokio::test]
async fn test_issue_stores_token_and_bumps_revision() {
    let ctx = Scenario::standard().into_context();
    let key = grant_key(&ALICE, PORTAL, BILLING_ROLE);

    let issued = ctx
        .service
        .issue_token(&ALICE.id(), &PORTAL.into(), &BILLING_ROLE.into())
        .await
        .unwrap();

    // Zero key, fixed IV, no timestamp: the well-known ciphertext.
    assert_eq!(issued.token, ZERO_KEY_TOKEN);
    assert_eq!(issued.revision, 1);
    assert!(issued.expires_at.is_none());

    let grant = ctx.store.grant(&key).unwrap();
    assert_eq!(grant.api_token.as_deref(), Some(ZERO_KEY_TOKEN));
    assert_eq!(grant.revision, 1);

    let report = ctx
        .service
        .introspect_token(&ALICE.id(), &issued.token)
        .await
        .unwrap();
    assert!(report.grant_exists);
    assert!(report.current);
    assert!(report.active);
    assert_eq!(report.application_id.as_str(), PORTAL);
    assert_eq!(report.role_id.as_str(), BILLING_ROLE);
}

#[tokio::test]
async fn test_issue_without_grant_is_forbidden_and_writes_nothing() {
    let ctx = Scenario::standard().into_context();
    let grants_before = ctx.store.grant_count();
    let tokens_before = ctx.store.issued_token_count();

    for (user, application, role) in [
        (&ALICE, PORTAL, UNLISTED_ROLE),
        (&ALICE, UNLISTED_APP, BILLING_ROLE),
        (&CAROL, PORTAL, BILLING_ROLE),
    ] {
        let result = ctx
            .service
            .issue_token(&user.id(), &application.into(), &role.into())
            .await;
        match result {
            Err(CoreError::Forbidden { message }) => {
                assert_eq!(message, "Invalid access or expired association")
            }
            other => panic!("expected Forbidden, got {:?}", other),
        }
    }

    assert_eq!(ctx.store.grant_count(), grants_before);
    assert_eq!(ctx.store.issued_token_count(), tokens_before);
    let untouched = ctx.store.grant(&grant_key(&ALICE, PORTAL, BILLING_ROLE)).unwrap();
    assert_eq!(untouched.revision, 0);
}

#[tokio::test]
async fn test_issue_missing_key_record_writes_nothing() {
    let ctx = Scenario::standard().into_context();
    let result = ctx
        .service
        .issue_token(&DAVE.id(), &PORTAL.into(), &BILLING_ROLE.into())
        .await;

    assert!(matches!(result, Err(CoreError::KeyNotFound { .. })));
    assert_eq!(ctx.store.issued_token_count(), 0);
}

#[tokio::test]
async fn test_issue_empty_ids_rejected() {
    let ctx = Scenario::standard().into_context();
    let result = ctx
        .service
        .issue_token(&UserId::new(""), &PORTAL.into(), &BILLING_ROLE.into())
        .await;
    assert!(matches!(result, Err(CoreError::Validation { .. })));
}

#[tokio::test]
async fn test_issue_reissue_replaces_current_token() {
    let ctx = ContextBuilder::new(Scenario::standard())
        .options(TokenOptions::default().with_issued_at(true))
        .build();

    let first = issue(&ctx, &BOB, PORTAL, BILLING_ROLE).await;
    // issued_at has second precision
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    let second = issue(&ctx, &BOB, PORTAL, BILLING_ROLE).await;
    assert_ne!(first, second);

    let old = ctx.service.introspect_token(&BOB.id(), &first).await.unwrap();
    assert!(old.grant_exists);
    assert!(!old.current);
    assert!(!old.active);

    let new = ctx.service.introspect_token(&BOB.id(), &second).await.unwrap();
    assert!(new.current);
    assert!(new.active);
    assert!(new.issued_at.is_some());

    let grant = ctx.store.grant(&grant_key(&BOB, PORTAL, BILLING_ROLE)).unwrap();
    assert_eq!(grant.revision, 2);
}

#[tokio::test]
async fn test_issue_concurrent_write_conflicts() {
    let racing: Arc<std::sync::Mutex<Option<Arc<RacingStore>>>> = Default::default();
    let handle = racing.clone();
    let ctx = ContextBuilder::new(Scenario::standard())
        .wrap_store(move |store| {
            let wrapped = Arc::new(RacingStore::new(store));
            *handle.lock().unwrap() = Some(wrapped.clone());
            wrapped
        })
        .build();

    let result = ctx
        .service
        .issue_token(&ALICE.id(), &PORTAL.into(), &BILLING_ROLE.into())
        .await;
    assert!(matches!(result, Err(CoreError::Conflict { .. })));

    let racer = racing.lock().unwrap().clone().unwrap();
    assert_eq!(racer.races(), 1);

    // The racer's write stands.
    let grant = ctx.store.grant(&grant_key(&ALICE, PORTAL, BILLING_ROLE)).unwrap();
    assert_eq!(grant.api_token.as_deref(), Some(RACING_TOKEN));
    assert_eq!(grant.revision, 1);
}

#[tokio::test]
async fn test_issue_direct_mode_uses_random_iv() {
    let direct = UserFixture {
        user_id: "d1",
        username: "direct",
        password: "pw",
        salt: "0123456789abcdef0123",
    };
    let seed = SeedBuilder::new()
        .direct_user(&direct, KeySize::Aes128)
        .application(PORTAL, "Customer Portal")
        .grant("d1", PORTAL, BILLING_ROLE);
    let ctx = ContextBuilder::new(seed).mode(KeySourceMode::Direct).build();

    let first = issue(&ctx, &direct, PORTAL, BILLING_ROLE).await;
    let second = issue(&ctx, &direct, PORTAL, BILLING_ROLE).await;
    assert_ne!(first, second);
    assert_eq!(EncryptedToken::parse(&first).unwrap().version(), WireVersion::V1);

    let report = ctx
        .service
        .introspect_token(&UserId::new("d1"), &second)
        .await
        .unwrap();
    assert!(report.active);
}

// =============================================================================
// Introspect
// =============================================================================

#[tokio::test]
async fn test_introspect_foreign_token_forbidden() {
    let ctx = Scenario::standard().into_context();
    let alice_token = issue(&ctx, &ALICE, PORTAL, BILLING_ROLE).await;

    // Erin shares Alice's key record, so the token decodes under her key.
    let result = ctx.service.introspect_token(&ERIN.id(), &alice_token).await;
    assert!(matches!(result, Err(CoreError::Forbidden { .. })));
}

#[tokio::test]
async fn test_introspect_token_under_wrong_key() {
    let ctx = Scenario::standard().into_context();
    let alice_token = issue(&ctx, &ALICE, PORTAL, BILLING_ROLE).await;

    let err = ctx
        .service
        .introspect_token(&BOB.id(), &alice_token)
        .await
        .unwrap_err();
    assert!(err.is_token_error(), "got {:?}", err);
}

#[tokio::test]
async fn test_introspect_garbage_token() {
    let ctx = Scenario::standard().into_context();
    assert!(matches!(
        ctx.service.introspect_token(&ALICE.id(), "not-a-token").await,
        Err(CoreError::MalformedToken { .. })
    ));
}

#[tokio::test]
async fn test_introspect_expired_grant() {
    let seed = Scenario::standard().expiring_grant(
        ALICE.user_id,
        UNLISTED_APP,
        BILLING_ROLE,
        Utc::now() - Duration::days(1),
    );
    let ctx = seed.into_context();

    let issued = ctx
        .service
        .issue_token(&ALICE.id(), &UNLISTED_APP.into(), &BILLING_ROLE.into())
        .await
        .unwrap();
    assert!(issued.expires_at.is_some());

    let report = ctx
        .service
        .introspect_token(&ALICE.id(), &issued.token)
        .await
        .unwrap();
    assert!(report.current);
    assert!(report.expired);
    assert!(!report.active);
    assert_eq!(report.expires_at, issued.expires_at);
}

#[tokio::test]
async fn test_introspect_stale_token() {
    let ctx = ContextBuilder::new(Scenario::standard())
        .options(TokenOptions::default().with_freshness_window(Duration::hours(1)))
        .build();

    let payload = TokenPayload::new(ALICE.user_id, PORTAL, BILLING_ROLE)
        .with_issued_at(Utc::now() - Duration::hours(2));
    let old_token = TokenCodec::seal(&payload, &KeyFixtures::zero_key())
        .unwrap()
        .encode();

    let report = ctx
        .service
        .introspect_token(&ALICE.id(), &old_token)
        .await
        .unwrap();
    assert!(report.grant_exists);
    assert!(report.stale);
    assert!(!report.active);
}

#[tokio::test]
async fn test_introspect_revoked_grant() {
    let ctx = Scenario::standard().into_context();
    let payload = TokenPayload::new(ALICE.user_id, UNLISTED_APP, UNLISTED_ROLE);
    let token = TokenCodec::seal(&payload, &KeyFixtures::zero_key())
        .unwrap()
        .encode();

    let report = ctx.service.introspect_token(&ALICE.id(), &token).await.unwrap();
    assert!(!report.grant_exists);
    assert!(!report.current);
    assert!(!report.active);
}

// =============================================================================
// Listings
// =============================================================================

#[tokio::test]
async fn test_listing_components_only_with_api() {
    let ctx = Scenario::standard().into_context();

    let components = ctx.service.user_components(&ALICE.id()).await.unwrap();
    assert_eq!(components.len(), 1);
    assert_eq!(components[0].component_id.as_str(), BILLING_COMPONENT);
    assert_eq!(components[0].component_name, "Billing API");
    assert_eq!(components[0].role_id.as_str(), BILLING_ROLE);

    assert!(ctx.service.user_components(&CAROL.id()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_listing_tokens_with_unknown_names() {
    let ctx = Scenario::standard().into_context();
    let bob_token = issue(&ctx, &BOB, PORTAL, BILLING_ROLE).await;

    let tokens = ctx.service.user_tokens(&BOB.id()).await.unwrap();
    assert_eq!(tokens.len(), 2);

    let portal = tokens
        .iter()
        .find(|t| t.application_id.as_str() == PORTAL)
        .unwrap();
    assert_eq!(portal.application_name, "Customer Portal");
    assert_eq!(portal.component_name, "Billing API");
    assert_eq!(portal.token.as_deref(), Some(bob_token.as_str()));

    let unlisted = tokens
        .iter()
        .find(|t| t.application_id.as_str() == UNLISTED_APP)
        .unwrap();
    assert_eq!(unlisted.application_name, "Unknown");
    assert_eq!(unlisted.component_name, "Unknown");
    assert!(unlisted.token.is_none());
}

#[tokio::test]
async fn test_listing_store_outage_propagates() {
    let ctx = ContextBuilder::new(Scenario::standard())
        .wrap_store(|store| Arc::new(UnavailableStore::new(store)))
        .build();

    assert!(matches!(
        ctx.service.user_tokens(&ALICE.id()).await,
        Err(CoreError::Store { .. })
    ));
    assert!(matches!(
        ctx.service
            .issue_token(&ALICE.id(), &PORTAL.into(), &BILLING_ROLE.into())
            .await,
        Err(CoreError::Store { .. })
    ));
}
