// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # keygate-core
//!
//! Personal access token issuance and verification.
//!
//! - **Types**: identifiers and store records (`User`, `AccessGrant`, `KeyRecord`)
//! - **Error**: the `CoreError` taxonomy
//! - **Crypto**: the key resolver and the AES-CBC token codec
//! - **Store**: collaborator traits and an in-memory implementation
//! - **Service**: login, issuance, introspection and listings
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use keygate_core::crypto::{KeyResolver, KeyResolverConfig, KeySourceMode};
//! use keygate_core::service::AccessService;
//! use keygate_core::store::{InMemoryAccessStore, SeedData};
//! use keygate_core::types::{ApplicationId, RoleId, UserId};
//!
//! let store = Arc::new(InMemoryAccessStore::from_seed(SeedData::from_path("seed.yaml")?)?);
//! let resolver = KeyResolver::new(
//!     KeyResolverConfig::new(KeySourceMode::Referenced),
//!     store.clone(),
//!     store.clone(),
//! );
//! let service = AccessService::new(store, resolver);
//!
//! let issued = service
//!     .issue_token(&UserId::new("u1"), &ApplicationId::new("a1"), &RoleId::new("r1"))
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod crypto;
pub mod error;
pub mod service;
pub mod store;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use service::{
    AccessService, ComponentAccess, IssuedToken, LoginOutcome, TokenIntrospection, TokenOptions,
    TokenSummary,
};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
