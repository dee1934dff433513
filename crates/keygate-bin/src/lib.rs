// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # keygate-bin
//!
//! Command line entry point for keygate.
//!
//! - CLI argument parsing with clap
//! - Service runtime orchestration
//! - Graceful shutdown handling
//! - Logging initialization
//! - Command implementations (run, validate, seal, open, ...)
//!
//! ## Usage
//!
//! ```bash
//! # Start the service (default command)
//! keygate -c /etc/keygate/keygate.yaml
//!
//! # Validate configuration
//! keygate validate --strict
//!
//! # Generate key record material and seal it for the config file
//! keygate gen-key-record --id k1 --master-key "$KEYGATE_MASTER_KEY"
//!
//! # Encrypt a password for a seed file
//! keygate seal --secret 'hunter2' -m "<base64 iv>,<base64 key>"
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod shutdown;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;
pub use runtime::{RuntimeBuilder, ServiceRuntime};
pub use shutdown::ShutdownCoordinator;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
