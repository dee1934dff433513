// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Storage collaborators.
//!
//! The access service and key resolver reach users, grants and key records
//! only through these traits. [`InMemoryAccessStore`] implements both and is
//! what the binary runs with.

mod memory;

pub use memory::{InMemoryAccessStore, SeedData};

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::{
    AccessGrant, Application, GrantKey, KeyRecord, KeyRecordId, Role, SoftwareComponent, User,
    UserId,
};

// =============================================================================
// AccessStore
// =============================================================================

/// Users, catalog records and access grants.
#[async_trait]
pub trait AccessStore: Send + Sync + Debug {
    /// Looks up a user by id.
    async fn find_user(&self, user_id: &UserId) -> CoreResult<Option<User>>;

    /// Looks up a user by login name.
    async fn find_user_by_username(&self, username: &str) -> CoreResult<Option<User>>;

    /// Returns the user's salt, or `None` if the user or salt is absent.
    async fn user_key_reference(&self, user_id: &UserId) -> CoreResult<Option<String>> {
        Ok(self.find_user(user_id).await?.and_then(|user| user.salt))
    }

    /// Looks up the grant for a user/application/role triple.
    async fn access_grant(&self, key: &GrantKey) -> CoreResult<Option<AccessGrant>>;

    /// Returns every grant held by a user.
    async fn grants_for_user(&self, user_id: &UserId) -> CoreResult<Vec<AccessGrant>>;

    /// Returns all roles.
    async fn roles(&self) -> CoreResult<Vec<Role>>;

    /// Returns all software components.
    async fn components(&self) -> CoreResult<Vec<SoftwareComponent>>;

    /// Returns all applications.
    async fn applications(&self) -> CoreResult<Vec<Application>>;

    /// Overwrites the token stored on a grant.
    ///
    /// The write only happens if the grant's revision still equals
    /// `expected_revision`. Returns the updated grant.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] if the grant no longer exists.
    /// - [`CoreError::Conflict`] if another writer got there first.
    ///
    /// [`CoreError::NotFound`]: crate::error::CoreError::NotFound
    /// [`CoreError::Conflict`]: crate::error::CoreError::Conflict
    async fn store_grant_token(
        &self,
        key: &GrantKey,
        token: String,
        expected_revision: u64,
    ) -> CoreResult<AccessGrant>;
}

// =============================================================================
// KeyRecordStore
// =============================================================================

/// Read-only access to credential key records.
#[async_trait]
pub trait KeyRecordStore: Send + Sync + Debug {
    /// Looks up a key record by id.
    async fn key_record(&self, id: &KeyRecordId) -> CoreResult<Option<KeyRecord>>;
}
