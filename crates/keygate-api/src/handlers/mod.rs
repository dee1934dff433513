// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API handlers.
//!
//! - [`health`]: liveness
//! - [`auth`]: password login
//! - [`tokens`]: PAT issuance, listing and introspection
//! - [`components`]: components reachable through the user's grants

mod auth;
mod components;
mod health;
mod tokens;

pub use auth::*;
pub use components::*;
pub use health::*;
pub use tokens::*;
