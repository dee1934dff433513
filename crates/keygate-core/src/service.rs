// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Access service.
//!
//! Ties the key resolver, token codec and store together into the
//! operations exposed over HTTP and the CLI: login, token issuance, token
//! introspection and the per-user listings.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::crypto::{constant_time_eq, KeyResolver, ResolvedKey, TokenCodec, TokenPayload};
use crate::error::{CoreError, CoreResult};
use crate::store::AccessStore;
use crate::types::{ApplicationId, ComponentId, GrantKey, RoleId, UserId};

/// Fallback name for records that no longer exist in the catalog.
pub const UNKNOWN_NAME: &str = "Unknown";

// =============================================================================
// Options
// =============================================================================

/// Token issuance and introspection options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenOptions {
    /// Embed an `issued_at` timestamp in new tokens.
    pub embed_issued_at: bool,
    /// Tokens older than this are reported as stale on introspection.
    pub freshness_window: Option<Duration>,
}

impl TokenOptions {
    /// Enables or disables the `issued_at` field.
    pub fn with_issued_at(mut self, embed: bool) -> Self {
        self.embed_issued_at = embed;
        self
    }

    /// Sets the freshness window.
    pub fn with_freshness_window(mut self, window: Duration) -> Self {
        self.freshness_window = Some(window);
        self
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// Successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginOutcome {
    /// Authenticated user.
    pub user_id: UserId,
    /// Display name.
    pub user_name: String,
}

/// A freshly issued token.
#[derive(Clone, Serialize)]
pub struct IssuedToken {
    /// The encoded token.
    pub token: String,
    /// Expiry of the underlying grant.
    pub expires_at: Option<DateTime<Utc>>,
    /// Grant revision after the token was stored.
    pub revision: u64,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("revision", &self.revision)
            .finish()
    }
}

/// What a token decodes to, and whether it is still good.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenIntrospection {
    /// Token owner.
    pub user_id: UserId,
    /// Granted application.
    pub application_id: ApplicationId,
    /// Granted role.
    pub role_id: RoleId,
    /// Embedded issuance time.
    pub issued_at: Option<DateTime<Utc>>,
    /// Expiry of the grant, if it still exists.
    pub expires_at: Option<DateTime<Utc>>,
    /// A grant for the triple still exists.
    pub grant_exists: bool,
    /// The token is the one currently stored on the grant.
    pub current: bool,
    /// The grant's expiry date has passed.
    pub expired: bool,
    /// The token is older than the freshness window.
    pub stale: bool,
    /// All of the above checks pass.
    pub active: bool,
}

/// An API-capable component reachable through one of the user's grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentAccess {
    /// Component id.
    pub component_id: ComponentId,
    /// Component name.
    pub component_name: String,
    /// Component description.
    pub component_description: Option<String>,
    /// Role granting access.
    pub role_id: RoleId,
    /// Application of the grant.
    pub application_id: ApplicationId,
}

/// One of the user's grants together with its stored token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenSummary {
    /// Application id.
    pub application_id: ApplicationId,
    /// Application name, or [`UNKNOWN_NAME`].
    pub application_name: String,
    /// Role id.
    pub role_id: RoleId,
    /// Component name behind the role, or [`UNKNOWN_NAME`].
    pub component_name: String,
    /// Stored token, if one was issued.
    pub token: Option<String>,
    /// Grant expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

// =============================================================================
// AccessService
// =============================================================================

/// Entry point for all access-control operations.
pub struct AccessService {
    store: Arc<dyn AccessStore>,
    resolver: KeyResolver,
    options: TokenOptions,
}

impl AccessService {
    /// Creates a service with default options.
    pub fn new(store: Arc<dyn AccessStore>, resolver: KeyResolver) -> Self {
        Self {
            store,
            resolver,
            options: TokenOptions::default(),
        }
    }

    /// Replaces the token options.
    pub fn with_options(mut self, options: TokenOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the token options.
    pub fn options(&self) -> &TokenOptions {
        &self.options
    }

    /// Returns the key resolver.
    pub fn resolver(&self) -> &KeyResolver {
        &self.resolver
    }

    // -------------------------------------------------------------------------
    // Login
    // -------------------------------------------------------------------------

    /// Authenticates a user by username and password.
    ///
    /// Unknown users, disabled users, users whose key cannot be resolved and
    /// wrong passwords all yield [`CoreError::InvalidCredentials`]. Store
    /// failures still propagate.
    #[instrument(skip_all, fields(username = %username))]
    pub async fn login(&self, username: &str, password: &str) -> CoreResult<LoginOutcome> {
        if username.is_empty() || password.is_empty() {
            return Err(CoreError::validation(
                "credentials",
                "username and password are required",
            ));
        }

        let Some(user) = self.store.find_user_by_username(username).await? else {
            warn!("Login rejected: unknown user");
            return Err(CoreError::InvalidCredentials);
        };
        if user.is_disabled {
            warn!(user_id = %user.user_id, "Login rejected: account disabled");
            return Err(CoreError::InvalidCredentials);
        }

        let key = match self.resolver.resolve_for_user(&user.user_id).await {
            Ok(key) => key,
            Err(e @ CoreError::Store { .. }) => return Err(e),
            Err(e) => {
                warn!(
                    user_id = %user.user_id,
                    error_type = e.error_type(),
                    reason = %e,
                    "Login rejected: user key unavailable"
                );
                return Err(CoreError::InvalidCredentials);
            }
        };
        if !Self::verify_login(password, &user.password, &key)? {
            warn!(user_id = %user.user_id, "Login rejected: password mismatch");
            return Err(CoreError::InvalidCredentials);
        }

        info!(user_id = %user.user_id, "User logged in");
        Ok(LoginOutcome {
            user_id: user.user_id,
            user_name: user.name,
        })
    }

    /// Checks a submitted password against the stored encrypted password.
    ///
    /// A stored value that cannot be decoded is an internal fault, not a
    /// failed login.
    pub fn verify_login(submitted: &str, stored: &str, key: &ResolvedKey) -> CoreResult<bool> {
        TokenCodec::verify_secret(submitted, stored, key).map_err(|e| {
            if e.is_token_error() {
                CoreError::internal(format!("stored password is unreadable: {}", e))
            } else {
                e
            }
        })
    }

    // -------------------------------------------------------------------------
    // Tokens
    // -------------------------------------------------------------------------

    /// Issues a token for a user/application/role triple and stores it on
    /// the grant.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Validation`] if an id is empty.
    /// - [`CoreError::Forbidden`] if no grant exists. Nothing is encrypted
    ///   and nothing is written.
    /// - [`CoreError::NotFound`] if the user has no key reference.
    /// - [`CoreError::Conflict`] if the grant was re-issued concurrently.
    #[instrument(
        skip_all,
        fields(user_id = %user_id, application_id = %application_id, role_id = %role_id)
    )]
    pub async fn issue_token(
        &self,
        user_id: &UserId,
        application_id: &ApplicationId,
        role_id: &RoleId,
    ) -> CoreResult<IssuedToken> {
        require("user_id", user_id.as_str())?;
        require("application_id", application_id.as_str())?;
        require("role_id", role_id.as_str())?;

        let grant_key = GrantKey::new(user_id.clone(), application_id.clone(), role_id.clone());
        let Some(grant) = self.store.access_grant(&grant_key).await? else {
            warn!("Token refused: no matching grant");
            return Err(CoreError::forbidden("Invalid access or expired association"));
        };

        let key = self.resolver.resolve_for_user(user_id).await?;

        let mut payload = TokenPayload::new(user_id.clone(), application_id.clone(), role_id.clone());
        if self.options.embed_issued_at {
            payload = payload.with_issued_at(Utc::now());
        }
        let token = TokenCodec::seal(&payload, &key)?.encode();

        let updated = self
            .store
            .store_grant_token(&grant_key, token.clone(), grant.revision)
            .await?;

        info!(revision = updated.revision, token_len = token.len(), "Token issued");
        Ok(IssuedToken {
            token,
            expires_at: updated.expiry_date,
            revision: updated.revision,
        })
    }

    /// Decrypts a token presented by a user and reports its status.
    ///
    /// # Errors
    ///
    /// - [`CoreError::MalformedToken`] or [`CoreError::DecryptionFailed`] if
    ///   the token does not decode under the user's key.
    /// - [`CoreError::Forbidden`] if the token names a different user.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn introspect_token(
        &self,
        user_id: &UserId,
        token: &str,
    ) -> CoreResult<TokenIntrospection> {
        require("user_id", user_id.as_str())?;
        require("token", token)?;

        let key = self.resolver.resolve_for_user(user_id).await?;
        let payload = TokenCodec::open(token, &key).inspect_err(|e| {
            debug!(error_type = e.error_type(), reason = %e, "Token did not decode");
        })?;

        if &payload.user_id != user_id {
            warn!(token_user = %payload.user_id, "Token presented by a different user");
            return Err(CoreError::forbidden("Token does not belong to this user"));
        }

        let grant_key = GrantKey::new(
            payload.user_id.clone(),
            payload.application_id.clone(),
            payload.role_id.clone(),
        );
        let grant = self.store.access_grant(&grant_key).await?;
        let now = Utc::now();

        let grant_exists = grant.is_some();
        let current = grant
            .as_ref()
            .and_then(|g| g.api_token.as_deref())
            .is_some_and(|stored| constant_time_eq(stored.as_bytes(), token.trim().as_bytes()));
        let expired = grant.as_ref().is_some_and(|g| g.is_expired_at(now));
        let stale = match (self.options.freshness_window, payload.issued_at) {
            (Some(window), Some(issued_at)) => now - issued_at > window,
            _ => false,
        };
        let active = grant_exists && current && !expired && !stale;

        debug!(grant_exists, current, expired, stale, active, "Token introspected");
        Ok(TokenIntrospection {
            user_id: payload.user_id,
            application_id: payload.application_id,
            role_id: payload.role_id,
            issued_at: payload.issued_at,
            expires_at: grant.and_then(|g| g.expiry_date),
            grant_exists,
            current,
            expired,
            stale,
            active,
        })
    }

    // -------------------------------------------------------------------------
    // Listings
    // -------------------------------------------------------------------------

    /// Lists API-capable components the user reaches through their grants.
    pub async fn user_components(&self, user_id: &UserId) -> CoreResult<Vec<ComponentAccess>> {
        require("user_id", user_id.as_str())?;

        let grants = self.store.grants_for_user(user_id).await?;
        let roles = self.store.roles().await?;
        let components = self.store.components().await?;

        let access = grants
            .into_iter()
            .filter_map(|grant| {
                let role = roles.iter().find(|r| r.role_id == grant.role_id)?;
                let component = components
                    .iter()
                    .find(|c| c.component_id == role.component_id && c.has_api)?;
                Some(ComponentAccess {
                    component_id: component.component_id.clone(),
                    component_name: component.name.clone(),
                    component_description: component.description.clone(),
                    role_id: grant.role_id,
                    application_id: grant.application_id,
                })
            })
            .collect();
        Ok(access)
    }

    /// Lists the user's grants with their stored tokens.
    pub async fn user_tokens(&self, user_id: &UserId) -> CoreResult<Vec<TokenSummary>> {
        require("user_id", user_id.as_str())?;

        let grants = self.store.grants_for_user(user_id).await?;
        let applications = self.store.applications().await?;
        let roles = self.store.roles().await?;
        let components = self.store.components().await?;

        let summaries = grants
            .into_iter()
            .map(|grant| {
                let application_name = applications
                    .iter()
                    .find(|a| a.application_id == grant.application_id)
                    .map_or_else(|| UNKNOWN_NAME.to_string(), |a| a.name.clone());
                let component_name = roles
                    .iter()
                    .find(|r| r.role_id == grant.role_id)
                    .and_then(|r| components.iter().find(|c| c.component_id == r.component_id))
                    .map_or_else(|| UNKNOWN_NAME.to_string(), |c| c.name.clone());
                TokenSummary {
                    application_id: grant.application_id,
                    application_name,
                    role_id: grant.role_id,
                    component_name,
                    token: grant.api_token,
                    expires_at: grant.expiry_date,
                }
            })
            .collect();
        Ok(summaries)
    }
}

impl fmt::Debug for AccessService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessService")
            .field("resolver", &self.resolver)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn require(field: &str, value: &str) -> CoreResult<()> {
    if value.trim().is_empty() {
        Err(CoreError::validation(field, "is required"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{IvMode, KeyMaterial, KeyResolverConfig, KeySourceMode};
    use crate::store::{InMemoryAccessStore, SeedData};
    use crate::types::{AccessGrant, Application, KeyRecord, Role, SoftwareComponent, User};

    const MATERIAL: &str = "AAAAAAAAAAAAAAAAAAAAAA==,AAAAAAAAAAAAAAAAAAAAAA==";

    fn user(id: &str, username: &str, password: &str, disabled: bool) -> User {
        let key = KeyMaterial::parse(MATERIAL).unwrap().into_resolved();
        User {
            user_id: UserId::new(id),
            organization_id: None,
            username: username.to_string(),
            password: TokenCodec::seal_secret(password, &key).unwrap().encode(),
            salt: Some("k1".to_string()),
            name: username.to_uppercase(),
            email: None,
            phone: None,
            created_at: Utc::now(),
            is_super_admin: false,
            is_disabled: disabled,
        }
    }

    fn fixture() -> (Arc<InMemoryAccessStore>, AccessService) {
        let store = Arc::new(
            InMemoryAccessStore::from_seed(SeedData {
                users: vec![
                    user("u1", "alice", "correct horse", false),
                    user("u2", "bob", "battery staple", true),
                ],
                applications: vec![Application {
                    application_id: ApplicationId::new("a1"),
                    name: "Billing".to_string(),
                }],
                roles: vec![
                    Role {
                        role_id: RoleId::new("r1"),
                        component_id: ComponentId::new("c1"),
                        name: "Reader".to_string(),
                        description: None,
                    },
                    Role {
                        role_id: RoleId::new("r2"),
                        component_id: ComponentId::new("c2"),
                        name: "Viewer".to_string(),
                        description: None,
                    },
                ],
                components: vec![
                    SoftwareComponent {
                        component_id: ComponentId::new("c1"),
                        name: "Ledger".to_string(),
                        description: Some("General ledger".to_string()),
                        has_api: true,
                    },
                    SoftwareComponent {
                        component_id: ComponentId::new("c2"),
                        name: "Dashboard".to_string(),
                        description: None,
                        has_api: false,
                    },
                ],
                grants: vec![
                    AccessGrant::new("u1", "a1", "r1"),
                    AccessGrant::new("u1", "a2", "r2"),
                ],
                key_records: vec![KeyRecord::new("k1", MATERIAL)],
            })
            .unwrap(),
        );
        let resolver = KeyResolver::new(
            KeyResolverConfig::new(KeySourceMode::Referenced),
            store.clone(),
            store.clone(),
        );
        let service = AccessService::new(store.clone(), resolver);
        (store, service)
    }

    #[tokio::test]
    async fn test_login_accepts_exact_password() {
        let (_, service) = fixture();
        let outcome = service.login("alice", "correct horse").await.unwrap();
        assert_eq!(outcome.user_id.as_str(), "u1");
        assert_eq!(outcome.user_name, "ALICE");
    }

    #[tokio::test]
    async fn test_login_rejects_single_character_changes() {
        let (_, service) = fixture();
        for wrong in ["correct hors", "correct horsf", "Correct horse", "correct horse "] {
            assert!(matches!(
                service.login("alice", wrong).await,
                Err(CoreError::InvalidCredentials)
            ));
        }
    }

    #[tokio::test]
    async fn test_login_hides_unresolvable_key() {
        let (store, service) = fixture();
        let mut carol = user("u3", "carol", "tr0ub4dor", false);
        carol.salt = Some("k-missing".to_string());
        store.insert_user(carol).unwrap();

        assert!(matches!(
            service.login("carol", "tr0ub4dor").await,
            Err(CoreError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_login_rejects_unknown_and_disabled() {
        let (_, service) = fixture();
        assert!(matches!(
            service.login("mallory", "x").await,
            Err(CoreError::InvalidCredentials)
        ));
        assert!(matches!(
            service.login("bob", "battery staple").await,
            Err(CoreError::InvalidCredentials)
        ));
        assert!(matches!(
            service.login("", "x").await,
            Err(CoreError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_issue_without_grant_is_forbidden_and_writes_nothing() {
        let (store, service) = fixture();
        let result = service
            .issue_token(&UserId::new("u1"), &ApplicationId::new("a1"), &RoleId::new("r9"))
            .await;
        assert!(matches!(result, Err(CoreError::Forbidden { .. })));
        assert_eq!(store.issued_token_count(), 0);
    }

    #[tokio::test]
    async fn test_issue_then_introspect() {
        let (store, service) = fixture();
        let user = UserId::new("u1");
        let issued = service
            .issue_token(&user, &ApplicationId::new("a1"), &RoleId::new("r1"))
            .await
            .unwrap();
        assert!(issued.token.starts_with("v2:"));
        assert_eq!(issued.revision, 1);

        let stored = store.grant(&GrantKey::new("u1", "a1", "r1")).unwrap();
        assert_eq!(stored.api_token.as_deref(), Some(issued.token.as_str()));

        let report = service.introspect_token(&user, &issued.token).await.unwrap();
        assert_eq!(report.application_id.as_str(), "a1");
        assert_eq!(report.role_id.as_str(), "r1");
        assert!(report.active);
    }

    #[tokio::test]
    async fn test_reissue_supersedes_previous_token() {
        let (_, service) = fixture();
        let service = service.with_options(TokenOptions::default().with_issued_at(true));
        let user = UserId::new("u1");
        let (app, role) = (ApplicationId::new("a1"), RoleId::new("r1"));

        let first = service.issue_token(&user, &app, &role).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        let second = service.issue_token(&user, &app, &role).await.unwrap();
        assert_ne!(first.token, second.token);
        assert_eq!(second.revision, 2);

        let old = service.introspect_token(&user, &first.token).await.unwrap();
        assert!(!old.current);
        assert!(!old.active);
        assert!(old.issued_at.is_some());
    }

    #[tokio::test]
    async fn test_introspect_rejects_garbage() {
        let (_, service) = fixture();
        let user = UserId::new("u1");
        assert!(matches!(
            service.introspect_token(&user, "v2:AAAAAAAAAAAAAAAAAAAAAA==").await,
            Err(CoreError::DecryptionFailed { .. })
        ));
        assert!(matches!(
            service.introspect_token(&user, "nonsense").await,
            Err(CoreError::MalformedToken { .. })
        ));
    }

    #[tokio::test]
    async fn test_introspect_rejects_foreign_token() {
        let (_, service) = fixture();
        let key = KeyMaterial::parse(MATERIAL).unwrap().into_resolved();
        let token = TokenCodec::seal(&TokenPayload::new("u2", "a1", "r1"), &key)
            .unwrap()
            .encode();
        assert!(matches!(
            service.introspect_token(&UserId::new("u1"), &token).await,
            Err(CoreError::Forbidden { .. })
        ));
    }

    #[tokio::test]
    async fn test_stale_token() {
        let (_, service) = fixture();
        let service = service.with_options(
            TokenOptions::default()
                .with_issued_at(true)
                .with_freshness_window(Duration::seconds(60)),
        );
        let key = KeyMaterial::parse(MATERIAL).unwrap().into_resolved();
        let payload = TokenPayload::new("u1", "a1", "r1")
            .with_issued_at(Utc::now() - Duration::hours(2));
        let token = TokenCodec::seal(&payload, &key).unwrap().encode();

        let report = service
            .introspect_token(&UserId::new("u1"), &token)
            .await
            .unwrap();
        assert!(report.stale);
        assert!(!report.active);
    }

    #[tokio::test]
    async fn test_user_components_lists_api_components_only() {
        let (_, service) = fixture();
        let components = service.user_components(&UserId::new("u1")).await.unwrap();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].component_name, "Ledger");
        assert_eq!(components[0].role_id.as_str(), "r1");
    }

    #[tokio::test]
    async fn test_user_tokens_fall_back_to_unknown() {
        let (_, service) = fixture();
        let tokens = service.user_tokens(&UserId::new("u1")).await.unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].application_name, "Billing");
        assert_eq!(tokens[0].component_name, "Ledger");
        assert_eq!(tokens[1].application_name, UNKNOWN_NAME);
        assert_eq!(tokens[1].component_name, "Dashboard");
        assert!(tokens.iter().all(|t| t.token.is_none()));
    }

    #[test]
    fn test_verify_login_reports_unreadable_password_as_internal() {
        let key = ResolvedKey::new(
            KeyMaterial::parse(MATERIAL).unwrap().key().clone(),
            IvMode::Random,
        );
        assert!(matches!(
            AccessService::verify_login("pw", "plaintext-password", &key),
            Err(CoreError::Internal { .. })
        ));
    }
}
