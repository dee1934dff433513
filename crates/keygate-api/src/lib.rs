// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # keygate-api
//!
//! HTTP surface for the keygate token service, built on axum.
//!
//! | method | path               |
//! |--------|--------------------|
//! | POST   | `/login`           |
//! | GET    | `/user/components` |
//! | POST   | `/generate-pat`    |
//! | GET    | `/user/pats`       |
//! | POST   | `/introspect-pat`  |
//! | GET    | `/health`          |
//!
//! Errors are returned as `{"error": {"code", "message"}}`.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod server;
pub mod state;

pub use config::{CorsSettings, ServerConfig};
pub use error::{ApiError, ApiResult, ErrorDetails, ErrorResponseBody};
pub use server::{router, ApiServer};
pub use state::{AppState, AppStateBuilder};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
