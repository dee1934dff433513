// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Store Mocks
//!
//! Wrappers around [`InMemoryAccessStore`] that inject races and faults.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use keygate_core::store::{AccessStore, InMemoryAccessStore};
use keygate_core::{
    AccessGrant, Application, CoreError, CoreResult, GrantKey, Role, SoftwareComponent, User,
    UserId,
};

/// Token a [`RacingStore`] writes ahead of the caller.
pub const RACING_TOKEN: &str = "v2:cmFjZXI=";

/// Lets another writer overwrite the grant token between the service's
/// read and its write, so the caller's revision is always stale.
#[derive(Debug)]
pub struct RacingStore {
    inner: Arc<InMemoryAccessStore>,
    races: AtomicUsize,
}

impl RacingStore {
    /// Wraps a store.
    pub fn new(inner: Arc<InMemoryAccessStore>) -> Self {
        Self {
            inner,
            races: AtomicUsize::new(0),
        }
    }

    /// Number of writes that were beaten by the simulated racer.
    pub fn races(&self) -> usize {
        self.races.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccessStore for RacingStore {
    async fn find_user(&self, user_id: &UserId) -> CoreResult<Option<User>> {
        self.inner.find_user(user_id).await
    }

    async fn find_user_by_username(&self, username: &str) -> CoreResult<Option<User>> {
        self.inner.find_user_by_username(username).await
    }

    async fn access_grant(&self, key: &GrantKey) -> CoreResult<Option<AccessGrant>> {
        self.inner.access_grant(key).await
    }

    async fn grants_for_user(&self, user_id: &UserId) -> CoreResult<Vec<AccessGrant>> {
        self.inner.grants_for_user(user_id).await
    }

    async fn roles(&self) -> CoreResult<Vec<Role>> {
        self.inner.roles().await
    }

    async fn components(&self) -> CoreResult<Vec<SoftwareComponent>> {
        self.inner.components().await
    }

    async fn applications(&self) -> CoreResult<Vec<Application>> {
        self.inner.applications().await
    }

    async fn store_grant_token(
        &self,
        key: &GrantKey,
        token: String,
        expected_revision: u64,
    ) -> CoreResult<AccessGrant> {
        self.races.fetch_add(1, Ordering::SeqCst);
        self.inner
            .store_grant_token(key, RACING_TOKEN.to_string(), expected_revision)
            .await?;
        self.inner
            .store_grant_token(key, token, expected_revision)
            .await
    }
}

/// Fails every grant lookup with a store error.
#[derive(Debug)]
pub struct UnavailableStore {
    inner: Arc<InMemoryAccessStore>,
}

impl UnavailableStore {
    /// Wraps a store. Users still resolve; grants do not.
    pub fn new(inner: Arc<InMemoryAccessStore>) -> Self {
        Self { inner }
    }

    fn outage() -> CoreError {
        CoreError::store("connection refused by db-primary.internal:5432")
    }
}

#[async_trait]
impl AccessStore for UnavailableStore {
    async fn find_user(&self, user_id: &UserId) -> CoreResult<Option<User>> {
        self.inner.find_user(user_id).await
    }

    async fn find_user_by_username(&self, username: &str) -> CoreResult<Option<User>> {
        self.inner.find_user_by_username(username).await
    }

    async fn access_grant(&self, _key: &GrantKey) -> CoreResult<Option<AccessGrant>> {
        Err(Self::outage())
    }

    async fn grants_for_user(&self, _user_id: &UserId) -> CoreResult<Vec<AccessGrant>> {
        Err(Self::outage())
    }

    async fn roles(&self) -> CoreResult<Vec<Role>> {
        self.inner.roles().await
    }

    async fn components(&self) -> CoreResult<Vec<SoftwareComponent>> {
        self.inner.components().await
    }

    async fn applications(&self) -> CoreResult<Vec<Application>> {
        self.inner.applications().await
    }

    async fn store_grant_token(
        &self,
        _key: &GrantKey,
        _token: String,
        _expected_revision: u64,
    ) -> CoreResult<AccessGrant> {
        Err(Self::outage())
    }
}
