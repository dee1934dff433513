// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # keygate integration tests
//!
//! Shared helpers for the suites under `tests/`.
//!
//! - [`common::fixtures`]: key material and a standard seeded scenario
//! - [`common::builders`]: seed and service builders
//! - [`common::mocks`]: store wrappers that inject failures
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p keygate-tests
//! cargo test -p keygate-tests --test integration_codec
//! cargo test -p keygate-tests --test integration_service
//! cargo test -p keygate-tests --test integration_config
//! cargo test -p keygate-tests --test integration_api
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use keygate_tests::prelude::*;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let ctx = Scenario::standard().into_context();
//!     let issued = ctx.service.issue_token(&ALICE.id(), &PORTAL.into(), &BILLING_ROLE.into()).await;
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::builders::*;
    pub use crate::common::fixtures::*;
    pub use crate::common::mocks::*;
    pub use crate::common::{init_test_logging, response_json};
}
