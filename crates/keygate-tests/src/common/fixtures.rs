// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Fixed key material, users and a standard seeded scenario.

use keygate_core::crypto::{KeyMaterial, KeySize, ResolvedKey};
use keygate_core::UserId;

use super::builders::SeedBuilder;

// =============================================================================
// Key Fixtures
// =============================================================================

/// All-zero 16-byte IV and 16-byte key.
pub const ZERO_MATERIAL: &str = "AAAAAAAAAAAAAAAAAAAAAA==,AAAAAAAAAAAAAAAAAAAAAA==";

/// `"u1,a1,r1"` under [`ZERO_MATERIAL`], AES-128-CBC with PKCS#7.
pub const ZERO_KEY_TOKEN: &str = "v2:ha5WKZsKc8PLgTzij76Uhg==";

/// Key material helpers.
pub struct KeyFixtures;

impl KeyFixtures {
    /// Parsed [`ZERO_MATERIAL`].
    pub fn zero_material() -> KeyMaterial {
        KeyMaterial::parse(ZERO_MATERIAL).expect("zero material parses")
    }

    /// [`ZERO_MATERIAL`] as a fixed-IV key.
    pub fn zero_key() -> ResolvedKey {
        Self::zero_material().into_resolved()
    }

    /// Fresh random material, encoded.
    pub fn random_material(size: KeySize) -> String {
        KeyMaterial::generate(size).encode().as_str().to_string()
    }
}

// =============================================================================
// Users
// =============================================================================

/// A seeded user and the plaintext password behind their stored ciphertext.
#[derive(Debug, Clone, Copy)]
pub struct UserFixture {
    /// User id.
    pub user_id: &'static str,
    /// Login name.
    pub username: &'static str,
    /// Plaintext password.
    pub password: &'static str,
    /// Salt: a key record id, or raw key material in direct mode.
    pub salt: &'static str,
}

impl UserFixture {
    /// Typed user id.
    pub fn id(&self) -> UserId {
        UserId::new(self.user_id)
    }
}

/// Key record `k1`, zero material.
pub const ALICE: UserFixture = UserFixture {
    user_id: "u1",
    username: "alice",
    password: "correct horse",
    salt: "k1",
};

/// Key record `k2`, random AES-256 material.
pub const BOB: UserFixture = UserFixture {
    user_id: "u2",
    username: "bob",
    password: "s3cret!",
    salt: "k2",
};

/// Disabled account.
pub const CAROL: UserFixture = UserFixture {
    user_id: "u3",
    username: "carol",
    password: "carol-pass",
    salt: "k1",
};

/// Salt points at a key record that does not exist.
pub const DAVE: UserFixture = UserFixture {
    user_id: "u4",
    username: "dave",
    password: "dave-pass",
    salt: "k-missing",
};

/// Shares key record `k1` with [`ALICE`].
pub const ERIN: UserFixture = UserFixture {
    user_id: "u5",
    username: "erin",
    password: "erin-pass",
    salt: "k1",
};

// =============================================================================
// Catalog
// =============================================================================

/// Application every standard grant points at.
pub const PORTAL: &str = "a1";
/// Application id with no catalog entry.
pub const UNLISTED_APP: &str = "a9";
/// API-capable component.
pub const BILLING_COMPONENT: &str = "c1";
/// Component without an API.
pub const REPORTS_COMPONENT: &str = "c2";
/// Role on [`BILLING_COMPONENT`].
pub const BILLING_ROLE: &str = "r1";
/// Role on [`REPORTS_COMPONENT`].
pub const REPORTS_ROLE: &str = "r2";
/// Role id with no catalog entry.
pub const UNLISTED_ROLE: &str = "r9";

// =============================================================================
// Scenario
// =============================================================================

/// Canned seed data.
pub struct Scenario;

impl Scenario {
    /// The standard scenario.
    ///
    /// | user  | key record | grants                                   |
    /// |-------|------------|------------------------------------------|
    /// | alice | k1 (zero)  | a1/r1, a1/r2                             |
    /// | bob   | k2         | a1/r1, a9/r9                             |
    /// | carol | k1         | none, account disabled                   |
    /// | dave  | missing    | a1/r1                                    |
    /// | erin  | k1         | a1/r1                                    |
    pub fn standard() -> SeedBuilder {
        SeedBuilder::new()
            .key_record("k1", ZERO_MATERIAL)
            .key_record("k2", KeyFixtures::random_material(KeySize::Aes256))
            .application(PORTAL, "Customer Portal")
            .component(BILLING_COMPONENT, "Billing API", true)
            .component(REPORTS_COMPONENT, "Reports", false)
            .role(BILLING_ROLE, BILLING_COMPONENT, "Billing Reader")
            .role(REPORTS_ROLE, REPORTS_COMPONENT, "Report Viewer")
            .user(&ALICE)
            .user(&BOB)
            .disabled_user(&CAROL)
            .user(&DAVE)
            .user(&ERIN)
            .grant(ALICE.user_id, PORTAL, BILLING_ROLE)
            .grant(ALICE.user_id, PORTAL, REPORTS_ROLE)
            .grant(BOB.user_id, PORTAL, BILLING_ROLE)
            .grant(BOB.user_id, UNLISTED_APP, UNLISTED_ROLE)
            .grant(DAVE.user_id, PORTAL, BILLING_ROLE)
            .grant(ERIN.user_id, PORTAL, BILLING_ROLE)
    }
}
