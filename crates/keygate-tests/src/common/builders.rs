// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Builders
//!
//! Builders for seed data and fully wired services.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use keygate_api::{AppState, ServerConfig};
use keygate_core::crypto::{
    CipherKey, IvMode, KeyMaterial, KeyResolver, KeyResolverConfig, KeySize, KeySourceMode,
    ResolvedKey, TokenCodec,
};
use keygate_core::store::{AccessStore, InMemoryAccessStore, SeedData};
use keygate_core::{
    AccessGrant, AccessService, Application, KeyRecord, Role, SoftwareComponent, TokenOptions,
    User,
};

use super::fixtures::{KeyFixtures, UserFixture};

// =============================================================================
// SeedBuilder
// =============================================================================

/// Builds [`SeedData`], encrypting user passwords under the right key.
#[derive(Debug, Default)]
pub struct SeedBuilder {
    seed: SeedData,
    materials: HashMap<String, String>,
}

impl SeedBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key record.
    pub fn key_record(mut self, id: &str, material: impl Into<String>) -> Self {
        let material = material.into();
        self.materials.insert(id.to_string(), material.clone());
        self.seed.key_records.push(KeyRecord::new(id, material));
        self
    }

    /// Adds a user whose salt references a key record.
    ///
    /// Users pointing at an unknown record get a password sealed under the
    /// zero key; their logins fail before the password is checked.
    pub fn user(self, fixture: &UserFixture) -> Self {
        let key = self.referenced_key(fixture.salt);
        self.push_user(fixture, &key, false)
    }

    /// Adds a disabled user.
    pub fn disabled_user(self, fixture: &UserFixture) -> Self {
        let key = self.referenced_key(fixture.salt);
        self.push_user(fixture, &key, true)
    }

    /// Adds a user whose salt is a raw key for the `direct` key source.
    pub fn direct_user(self, fixture: &UserFixture, size: KeySize) -> Self {
        let key = ResolvedKey::new(CipherKey::fit_to(fixture.salt, size), IvMode::Random);
        self.push_user(fixture, &key, false)
    }

    /// Adds an application.
    pub fn application(mut self, id: &str, name: &str) -> Self {
        self.seed.applications.push(Application {
            application_id: id.into(),
            name: name.to_string(),
        });
        self
    }

    /// Adds a software component.
    pub fn component(mut self, id: &str, name: &str, has_api: bool) -> Self {
        self.seed.components.push(SoftwareComponent {
            component_id: id.into(),
            name: name.to_string(),
            description: Some(format!("{} component", name)),
            has_api,
        });
        self
    }

    /// Adds a role.
    pub fn role(mut self, id: &str, component_id: &str, name: &str) -> Self {
        self.seed.roles.push(Role {
            role_id: id.into(),
            component_id: component_id.into(),
            name: name.to_string(),
            description: None,
        });
        self
    }

    /// Adds a grant with no token and no expiry.
    pub fn grant(mut self, user_id: &str, application_id: &str, role_id: &str) -> Self {
        self.seed
            .grants
            .push(AccessGrant::new(user_id, application_id, role_id));
        self
    }

    /// Adds a grant expiring at `expiry`.
    pub fn expiring_grant(
        mut self,
        user_id: &str,
        application_id: &str,
        role_id: &str,
        expiry: DateTime<Utc>,
    ) -> Self {
        self.seed
            .grants
            .push(AccessGrant::new(user_id, application_id, role_id).with_expiry(expiry));
        self
    }

    /// Returns the seed data.
    pub fn build(self) -> SeedData {
        self.seed
    }

    /// Returns a context in `referenced` mode with default options.
    pub fn into_context(self) -> TestContext {
        ContextBuilder::new(self).build()
    }

    fn referenced_key(&self, salt: &str) -> ResolvedKey {
        self.materials
            .get(salt)
            .map(|material| {
                KeyMaterial::parse(material)
                    .expect("seeded key material parses")
                    .into_resolved()
            })
            .unwrap_or_else(KeyFixtures::zero_key)
    }

    fn push_user(mut self, fixture: &UserFixture, key: &ResolvedKey, disabled: bool) -> Self {
        let password = TokenCodec::seal_secret(fixture.password, key)
            .expect("password seals")
            .encode();
        self.seed.users.push(User {
            user_id: fixture.id(),
            organization_id: Some("org-1".to_string()),
            username: fixture.username.to_string(),
            password,
            salt: Some(fixture.salt.to_string()),
            name: capitalize(fixture.username),
            email: Some(format!("{}@example.com", fixture.username)),
            phone: None,
            created_at: Utc::now(),
            is_super_admin: false,
            is_disabled: disabled,
        });
        self
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// =============================================================================
// ContextBuilder
// =============================================================================

/// A seeded store and the service over it.
#[derive(Debug, Clone)]
pub struct TestContext {
    /// The backing store, for inspecting writes.
    pub store: Arc<InMemoryAccessStore>,
    /// The service under test.
    pub service: Arc<AccessService>,
}

impl TestContext {
    /// Builds the HTTP router over this context's service.
    pub fn router(&self) -> Router {
        let config = ServerConfig::default().with_service_name("keygate-test");
        keygate_api::router(AppState::new(self.service.clone(), config))
    }
}

/// Configures how a [`TestContext`] is wired.
#[derive(Debug)]
pub struct ContextBuilder {
    seed: SeedBuilder,
    mode: KeySourceMode,
    direct_key_length: usize,
    options: TokenOptions,
    seed_store: Option<Arc<InMemoryAccessStore>>,
    access_store: Option<Arc<dyn AccessStore>>,
}

impl ContextBuilder {
    /// Starts from seed data.
    pub fn new(seed: SeedBuilder) -> Self {
        Self {
            seed,
            mode: KeySourceMode::Referenced,
            direct_key_length: 16,
            options: TokenOptions::default(),
            seed_store: None,
            access_store: None,
        }
    }

    /// Sets the key source mode.
    pub fn mode(mut self, mode: KeySourceMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the direct key length.
    pub fn direct_key_length(mut self, length: usize) -> Self {
        self.direct_key_length = length;
        self
    }

    /// Sets token options.
    pub fn options(mut self, options: TokenOptions) -> Self {
        self.options = options;
        self
    }

    /// Wraps the seeded store before handing it to the service.
    pub fn wrap_store<F>(mut self, wrap: F) -> Self
    where
        F: FnOnce(Arc<InMemoryAccessStore>) -> Arc<dyn AccessStore>,
    {
        let store = Arc::new(
            InMemoryAccessStore::from_seed(std::mem::take(&mut self.seed).build())
                .expect("seed data is consistent"),
        );
        self.access_store = Some(wrap(store.clone()));
        self.seed_store = Some(store);
        self
    }

    /// Builds the context.
    pub fn build(self) -> TestContext {
        let store = match self.seed_store {
            Some(store) => store,
            None => Arc::new(
                InMemoryAccessStore::from_seed(self.seed.build()).expect("seed data is consistent"),
            ),
        };
        let access_store: Arc<dyn AccessStore> =
            self.access_store.unwrap_or_else(|| store.clone());

        let config = KeyResolverConfig::new(self.mode)
            .with_direct_key_length(self.direct_key_length)
            .expect("valid direct key length");
        let resolver = KeyResolver::new(config, access_store.clone(), store.clone());
        let service = AccessService::new(access_store, resolver).with_options(self.options);

        TestContext {
            store,
            service: Arc::new(service),
        }
    }
}
