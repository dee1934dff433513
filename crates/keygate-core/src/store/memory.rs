// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-memory store implementation.
//!
//! Backed by `parking_lot::RwLock` maps. Suitable for tests, demos and
//! single-node deployments seeded from a fixture file.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{AccessStore, KeyRecordStore};
use crate::error::{CoreError, CoreResult};
use crate::types::{
    AccessGrant, Application, GrantKey, KeyRecord, KeyRecordId, Role, SoftwareComponent, User,
    UserId,
};

// =============================================================================
// SeedData
// =============================================================================

/// Initial contents for an [`InMemoryAccessStore`].
///
/// ```yaml
/// users:
///   - user_id: u1
///     username: alice
///     password: "v2:..."
///     salt: k1
///     name: Alice
/// grants:
///   - user_id: u1
///     application_id: a1
///     role_id: r1
/// key_records:
///   - id: k1
///     material: "<base64 iv>,<base64 key>"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeedData {
    /// User accounts.
    pub users: Vec<User>,
    /// Applications.
    pub applications: Vec<Application>,
    /// Roles.
    pub roles: Vec<Role>,
    /// Software components.
    pub components: Vec<SoftwareComponent>,
    /// Access grants.
    pub grants: Vec<AccessGrant>,
    /// Credential key records.
    pub key_records: Vec<KeyRecord>,
}

impl SeedData {
    /// Parses seed data from YAML.
    pub fn from_yaml_str(content: &str) -> CoreResult<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| CoreError::store(format!("invalid seed YAML: {}", e)))
    }

    /// Parses seed data from JSON.
    pub fn from_json_str(content: &str) -> CoreResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| CoreError::store(format!("invalid seed JSON: {}", e)))
    }

    /// Reads seed data from a file. `.json` files are parsed as JSON,
    /// everything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::store(format!("failed to read seed file '{}': {}", path.display(), e))
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }
}

// =============================================================================
// InMemoryAccessStore
// =============================================================================

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    usernames: HashMap<String, UserId>,
    applications: Vec<Application>,
    roles: Vec<Role>,
    components: Vec<SoftwareComponent>,
    grants: HashMap<GrantKey, AccessGrant>,
    key_records: HashMap<KeyRecordId, KeyRecord>,
}

/// Thread-safe in-memory implementation of [`AccessStore`] and
/// [`KeyRecordStore`].
#[derive(Debug, Default)]
pub struct InMemoryAccessStore {
    tables: RwLock<Tables>,
}

impl InMemoryAccessStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store from seed data.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Conflict`] on duplicate user ids, usernames or
    /// key record ids.
    pub fn from_seed(seed: SeedData) -> CoreResult<Self> {
        let store = Self::new();
        for user in seed.users {
            store.insert_user(user)?;
        }
        for record in seed.key_records {
            store.insert_key_record(record)?;
        }
        for grant in seed.grants {
            store.insert_grant(grant);
        }

        {
            let mut tables = store.tables.write();
            tables.applications = seed.applications;
            tables.roles = seed.roles;
            tables.components = seed.components;
        }

        let tables = store.tables.read();
        info!(
            users = tables.users.len(),
            grants = tables.grants.len(),
            key_records = tables.key_records.len(),
            "In-memory store seeded"
        );
        drop(tables);
        Ok(store)
    }

    /// Adds a user.
    pub fn insert_user(&self, user: User) -> CoreResult<()> {
        let mut tables = self.tables.write();
        if tables.users.contains_key(&user.user_id) {
            return Err(CoreError::conflict(format!("duplicate user id '{}'", user.user_id)));
        }
        if tables.usernames.contains_key(&user.username) {
            return Err(CoreError::conflict(format!("duplicate username '{}'", user.username)));
        }
        tables
            .usernames
            .insert(user.username.clone(), user.user_id.clone());
        tables.users.insert(user.user_id.clone(), user);
        Ok(())
    }

    /// Adds or replaces a grant.
    pub fn insert_grant(&self, grant: AccessGrant) {
        self.tables.write().grants.insert(grant.key(), grant);
    }

    /// Adds a key record. Existing records are never replaced.
    pub fn insert_key_record(&self, record: KeyRecord) -> CoreResult<()> {
        let mut tables = self.tables.write();
        if tables.key_records.contains_key(&record.id) {
            return Err(CoreError::conflict(format!(
                "key record '{}' already exists",
                record.id
            )));
        }
        tables.key_records.insert(record.id.clone(), record);
        Ok(())
    }

    /// Adds an application.
    pub fn insert_application(&self, application: Application) {
        self.tables.write().applications.push(application);
    }

    /// Adds a role.
    pub fn insert_role(&self, role: Role) {
        self.tables.write().roles.push(role);
    }

    /// Adds a software component.
    pub fn insert_component(&self, component: SoftwareComponent) {
        self.tables.write().components.push(component);
    }

    /// Returns a snapshot of a grant.
    pub fn grant(&self, key: &GrantKey) -> Option<AccessGrant> {
        self.tables.read().grants.get(key).cloned()
    }

    /// Number of grants held.
    pub fn grant_count(&self) -> usize {
        self.tables.read().grants.len()
    }

    /// Number of grants that carry a stored token.
    pub fn issued_token_count(&self) -> usize {
        self.tables
            .read()
            .grants
            .values()
            .filter(|grant| grant.api_token.is_some())
            .count()
    }
}

#[async_trait]
impl AccessStore for InMemoryAccessStore {
    async fn find_user(&self, user_id: &UserId) -> CoreResult<Option<User>> {
        Ok(self.tables.read().users.get(user_id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> CoreResult<Option<User>> {
        let tables = self.tables.read();
        Ok(tables
            .usernames
            .get(username)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn access_grant(&self, key: &GrantKey) -> CoreResult<Option<AccessGrant>> {
        Ok(self.tables.read().grants.get(key).cloned())
    }

    async fn grants_for_user(&self, user_id: &UserId) -> CoreResult<Vec<AccessGrant>> {
        let mut grants: Vec<AccessGrant> = self
            .tables
            .read()
            .grants
            .values()
            .filter(|grant| &grant.user_id == user_id)
            .cloned()
            .collect();
        grants.sort_by(|a, b| {
            (&a.application_id, &a.role_id).cmp(&(&b.application_id, &b.role_id))
        });
        Ok(grants)
    }

    async fn roles(&self) -> CoreResult<Vec<Role>> {
        Ok(self.tables.read().roles.clone())
    }

    async fn components(&self) -> CoreResult<Vec<SoftwareComponent>> {
        Ok(self.tables.read().components.clone())
    }

    async fn applications(&self) -> CoreResult<Vec<Application>> {
        Ok(self.tables.read().applications.clone())
    }

    async fn store_grant_token(
        &self,
        key: &GrantKey,
        token: String,
        expected_revision: u64,
    ) -> CoreResult<AccessGrant> {
        let mut tables = self.tables.write();
        let grant = tables
            .grants
            .get_mut(key)
            .ok_or_else(|| CoreError::not_found("access grant"))?;

        if grant.revision != expected_revision {
            return Err(CoreError::conflict(format!(
                "grant {} is at revision {}, expected {}",
                key, grant.revision, expected_revision
            )));
        }

        grant.api_token = Some(token);
        grant.revision += 1;
        debug!(grant = %key, revision = grant.revision, "Stored grant token");
        Ok(grant.clone())
    }
}

#[async_trait]
impl KeyRecordStore for InMemoryAccessStore {
    async fn key_record(&self, id: &KeyRecordId) -> CoreResult<Option<KeyRecord>> {
        Ok(self.tables.read().key_records.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = r#"
users:
  - user_id: u1
    username: alice
    password: "v2:AAAA"
    salt: k1
    name: Alice
applications:
  - application_id: a1
    name: Billing
roles:
  - role_id: r1
    component_id: c1
    name: Reader
components:
  - component_id: c1
    name: Ledger
    has_api: true
grants:
  - user_id: u1
    application_id: a1
    role_id: r1
    expiry_date: "2030-01-01T00:00:00Z"
key_records:
  - id: k1
    material: "AAAAAAAAAAAAAAAAAAAAAA==,AAAAAAAAAAAAAAAAAAAAAA=="
"#;

    fn seeded() -> InMemoryAccessStore {
        InMemoryAccessStore::from_seed(SeedData::from_yaml_str(SEED).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_seed_lookup() {
        let store = seeded();
        let user = store.find_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(user.user_id.as_str(), "u1");
        assert_eq!(
            store.user_key_reference(&UserId::new("u1")).await.unwrap(),
            Some("k1".to_string())
        );
        assert!(store.key_record(&KeyRecordId::new("k1")).await.unwrap().is_some());
        assert_eq!(store.grants_for_user(&UserId::new("u1")).await.unwrap().len(), 1);
        assert_eq!(store.components().await.unwrap().len(), 1);
    }

    #[test]
    fn test_seed_rejects_unknown_fields() {
        assert!(SeedData::from_yaml_str("usres: []").is_err());
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let mut seed = SeedData::from_yaml_str(SEED).unwrap();
        let mut twin = seed.users[0].clone();
        twin.user_id = UserId::new("u2");
        seed.users.push(twin);
        assert!(matches!(
            InMemoryAccessStore::from_seed(seed),
            Err(CoreError::Conflict { .. })
        ));
    }

    #[test]
    fn test_key_records_are_immutable() {
        let store = seeded();
        let result = store.insert_key_record(KeyRecord::new("k1", "x,y"));
        assert!(matches!(result, Err(CoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_store_grant_token_revision_check() {
        let store = seeded();
        let key = GrantKey::new("u1", "a1", "r1");

        let updated = store
            .store_grant_token(&key, "v2:first".to_string(), 0)
            .await
            .unwrap();
        assert_eq!(updated.revision, 1);
        assert_eq!(updated.api_token.as_deref(), Some("v2:first"));

        let stale = store.store_grant_token(&key, "v2:second".to_string(), 0).await;
        assert!(matches!(stale, Err(CoreError::Conflict { .. })));
        assert_eq!(store.grant(&key).unwrap().api_token.as_deref(), Some("v2:first"));

        let missing = store
            .store_grant_token(&GrantKey::new("u1", "a1", "r9"), "x".to_string(), 0)
            .await;
        assert!(matches!(missing, Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn test_seed_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        std::fs::write(&path, r#"{"applications":[{"application_id":"a1","name":"App"}]}"#)
            .unwrap();
        let seed = SeedData::from_path(&path).unwrap();
        assert_eq!(seed.applications.len(), 1);
    }
}
