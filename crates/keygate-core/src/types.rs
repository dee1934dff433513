// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Domain records shared across keygate.
//!
//! Identifiers are string newtypes so that a user id can never be passed
//! where an application id is expected. Records mirror what the backing
//! store holds; the token codec never persists anything itself.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Identifiers
// =============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[inline]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the identifier and returns the inner string.
            #[inline]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// Identifies a user.
    ///
    /// ```
    /// use keygate_core::types::UserId;
    ///
    /// let id = UserId::new("u1");
    /// assert_eq!(id.as_str(), "u1");
    /// ```
    UserId
}

string_id! {
    /// Identifies an application.
    ApplicationId
}

string_id! {
    /// Identifies a role.
    RoleId
}

string_id! {
    /// Identifies a software component.
    ComponentId
}

string_id! {
    /// Identifies a credential key record.
    KeyRecordId
}

// =============================================================================
// User
// =============================================================================

/// A user account.
#[derive(Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user id.
    pub user_id: UserId,
    /// Owning organization.
    #[serde(default)]
    pub organization_id: Option<String>,
    /// Unique login name.
    pub username: String,
    /// Password in the versioned encrypted token format.
    pub password: String,
    /// Key source for this user: raw key material or a key record reference,
    /// depending on the configured key source mode.
    #[serde(default)]
    pub salt: Option<String>,
    /// Display name.
    pub name: String,
    /// Contact email.
    #[serde(default)]
    pub email: Option<String>,
    /// Contact phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// Creation time.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Super administrator flag.
    #[serde(default)]
    pub is_super_admin: bool,
    /// Disabled accounts cannot log in.
    #[serde(default)]
    pub is_disabled: bool,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("salt", &self.salt.as_ref().map(|_| "[REDACTED]"))
            .field("name", &self.name)
            .field("is_super_admin", &self.is_super_admin)
            .field("is_disabled", &self.is_disabled)
            .finish()
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// An application a user can be granted access to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    /// Application id.
    pub application_id: ApplicationId,
    /// Display name.
    pub name: String,
}

/// A role, scoped to one software component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role id.
    pub role_id: RoleId,
    /// Component the role belongs to.
    pub component_id: ComponentId,
    /// Display name.
    pub name: String,
    /// Free text description.
    #[serde(default)]
    pub description: Option<String>,
}

/// A software component that roles are defined on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwareComponent {
    /// Component id.
    pub component_id: ComponentId,
    /// Display name.
    pub name: String,
    /// Free text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Only components exposing an API are listed to users.
    #[serde(default)]
    pub has_api: bool,
}

// =============================================================================
// Access Grants
// =============================================================================

/// The user/application/role triple that identifies a grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantKey {
    /// Grantee.
    pub user_id: UserId,
    /// Granted application.
    pub application_id: ApplicationId,
    /// Granted role.
    pub role_id: RoleId,
}

impl GrantKey {
    /// Creates a grant key.
    pub fn new(
        user_id: impl Into<UserId>,
        application_id: impl Into<ApplicationId>,
        role_id: impl Into<RoleId>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            application_id: application_id.into(),
            role_id: role_id.into(),
        }
    }
}

impl fmt::Display for GrantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.user_id, self.application_id, self.role_id)
    }
}

/// Association of a user with an application and a role.
///
/// The stored token is overwritten on each issuance. `revision` increases on
/// every overwrite and backs the optimistic version check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessGrant {
    /// Grantee.
    pub user_id: UserId,
    /// Granted application.
    pub application_id: ApplicationId,
    /// Granted role.
    pub role_id: RoleId,
    /// Free text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Creation time.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Optional expiry. Advisory only.
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
    /// Last issued token, if any.
    #[serde(default)]
    pub api_token: Option<String>,
    /// Write counter for the stored token.
    #[serde(default)]
    pub revision: u64,
}

impl AccessGrant {
    /// Creates a grant with no token and no expiry.
    pub fn new(
        user_id: impl Into<UserId>,
        application_id: impl Into<ApplicationId>,
        role_id: impl Into<RoleId>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            application_id: application_id.into(),
            role_id: role_id.into(),
            description: None,
            created_at: Utc::now(),
            expiry_date: None,
            api_token: None,
            revision: 0,
        }
    }

    /// Sets the expiry date.
    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry_date = Some(expiry);
        self
    }

    /// Returns the triple identifying this grant.
    pub fn key(&self) -> GrantKey {
        GrantKey {
            user_id: self.user_id.clone(),
            application_id: self.application_id.clone(),
            role_id: self.role_id.clone(),
        }
    }

    /// Returns `true` if the grant has an expiry date in the past.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry <= now)
    }
}

// =============================================================================
// Key Records
// =============================================================================

/// Stored key material, `"<base64 iv>,<base64 key>"`.
///
/// Immutable once issued.
#[derive(Clone, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Record id, referenced from a user's salt.
    pub id: KeyRecordId,
    /// Encoded IV and key.
    pub material: String,
}

impl KeyRecord {
    /// Creates a key record.
    pub fn new(id: impl Into<KeyRecordId>, material: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            material: material.into(),
        }
    }
}

impl fmt::Debug for KeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRecord")
            .field("id", &self.id)
            .field("material", &"[REDACTED]")
            .finish()
    }
}
