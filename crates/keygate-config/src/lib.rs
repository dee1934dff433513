// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # keygate-config
//!
//! Configuration for the keygate token service.
//!
//! - **Schema**: typed sections with validation
//! - **Loader**: YAML, TOML and JSON files with `KEYGATE_*` overrides
//! - **Encryption**: AES-256-GCM for key record material kept in config
//!
//! ## Quick Start
//!
//! ```no_run
//! use keygate_config::loader::load_config;
//!
//! let config = load_config("keygate.yaml").unwrap();
//! println!("Key source: {}", config.keys.source);
//! println!("Listening on {}", config.api.socket_addr());
//! ```
//!
//! ## Configuration Schema
//!
//! - `service` - instance name
//! - `keys` - salt interpretation, direct key length, static key records
//! - `tokens` - `issued_at` embedding and the freshness window
//! - `store` - seed file for the in-memory store
//! - `api` - HTTP listener, CORS, timeouts
//! - `logging` - level and output format

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod encryption;
pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};

pub use schema::{
    ApiConfig, CorsConfig, KeygateConfig, KeysConfig, LogFormat, LogLevel, LoggingConfig,
    SecretValue, ServiceConfig, StaticKeyRecord, StoreConfig, TokensConfig, DEFAULT_API_PORT,
};

pub use loader::{load_config, load_config_str, ConfigFormat, ConfigLoader, ConfigLoaderBuilder};

pub use encryption::{is_sealed, ENCRYPTED_PREFIX, MASTER_KEY_LENGTH};

#[cfg(feature = "encryption")]
pub use encryption::{generate_master_key, SecretCipher};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name() {
        assert_eq!(NAME, "keygate-config");
        assert!(!VERSION.is_empty());
    }
}
