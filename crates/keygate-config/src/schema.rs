// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema definitions for keygate.
//!
//! # Schema Structure
//!
//! ```text
//! KeygateConfig
//! ├── service: ServiceConfig
//! ├── keys: KeysConfig
//! ├── tokens: TokensConfig
//! ├── store: StoreConfig
//! ├── api: ApiConfig
//! └── logging: LoggingConfig
//! ```

use std::collections::HashSet;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use keygate_core::crypto::{KeyMaterial, KeyResolverConfig, KeySize, KeySourceMode};
use keygate_core::service::TokenOptions;
use keygate_core::types::KeyRecord;
use serde::{Deserialize, Serialize};

use crate::encryption::ENCRYPTED_PREFIX;
use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Constants
// =============================================================================

/// Default API port.
pub const DEFAULT_API_PORT: u16 = 8080;

/// Default direct key length in bytes.
pub const DEFAULT_DIRECT_KEY_LENGTH: usize = 16;

/// Default environment variable holding the master key for `ENC:` secrets.
pub const DEFAULT_MASTER_KEY_ENV: &str = "KEYGATE_MASTER_KEY";

/// Maximum request timeout in seconds.
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

// =============================================================================
// Top-Level Configuration
// =============================================================================

/// The root configuration structure for keygate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeygateConfig {
    /// Service identification.
    pub service: ServiceConfig,
    /// Key resolution settings.
    pub keys: KeysConfig,
    /// Token issuance settings.
    pub tokens: TokensConfig,
    /// Backing store settings.
    pub store: StoreConfig,
    /// HTTP API settings.
    pub api: ApiConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl KeygateConfig {
    /// Validates the entire configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.service.validate()?;
        self.keys.validate()?;
        self.tokens.validate()?;
        self.api.validate()?;
        Ok(())
    }
}

// =============================================================================
// Service
// =============================================================================

/// Service identification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Instance name, used in logs and the health endpoint.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Free text description.
    #[serde(default)]
    pub description: Option<String>,
}

fn default_service_name() -> String {
    "keygate".to_string()
}

impl ServiceConfig {
    /// Validates the service configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::validation("service.name", "cannot be empty"));
        }
        if self.name.len() > 64 {
            return Err(ConfigError::validation(
                "service.name",
                "cannot exceed 64 characters",
            ));
        }
        Ok(())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            description: None,
        }
    }
}

// =============================================================================
// Keys
// =============================================================================

/// Key resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeysConfig {
    /// How user salts are interpreted.
    #[serde(default)]
    pub source: KeySourceMode,

    /// Key length for direct salts: 16, 24 or 32.
    #[serde(default = "default_direct_key_length")]
    pub direct_key_length: usize,

    /// Environment variable holding the base64 master key used to decrypt
    /// `ENC:` values in this file.
    #[serde(default = "default_master_key_env")]
    pub master_key_env: String,

    /// Key records supplied by configuration instead of the store.
    #[serde(default)]
    pub static_records: Vec<StaticKeyRecord>,
}

fn default_direct_key_length() -> usize {
    DEFAULT_DIRECT_KEY_LENGTH
}

fn default_master_key_env() -> String {
    DEFAULT_MASTER_KEY_ENV.to_string()
}

impl KeysConfig {
    /// Validates the key configuration.
    ///
    /// Plain static records are parsed here; encrypted ones are checked once
    /// the loader has decrypted them.
    pub fn validate(&self) -> ConfigResult<()> {
        if KeySize::from_len(self.direct_key_length).is_err() {
            return Err(ConfigError::validation(
                "keys.direct_key_length",
                format!("must be 16, 24 or 32, got {}", self.direct_key_length),
            ));
        }

        let mut ids = HashSet::new();
        for (i, record) in self.static_records.iter().enumerate() {
            let field = format!("keys.static_records[{}]", i);
            if record.id.trim().is_empty() {
                return Err(ConfigError::validation(format!("{}.id", field), "cannot be empty"));
            }
            if !ids.insert(record.id.as_str()) {
                return Err(ConfigError::validation(
                    format!("{}.id", field),
                    format!("duplicate key record id '{}'", record.id),
                ));
            }
            if !record.material.is_encrypted() {
                KeyMaterial::parse(record.material.expose()).map_err(|e| {
                    ConfigError::validation(format!("{}.material", field), e.to_string())
                })?;
            }
        }
        Ok(())
    }

    /// Builds the key resolver configuration.
    pub fn resolver_config(&self) -> ConfigResult<KeyResolverConfig> {
        KeyResolverConfig::new(self.source)
            .with_direct_key_length(self.direct_key_length)
            .map_err(|e| ConfigError::validation("keys.direct_key_length", e.to_string()))
    }

    /// Converts static records into store records.
    ///
    /// # Errors
    ///
    /// Fails if a record is still encrypted, meaning no master key was
    /// available at load time.
    pub fn key_records(&self) -> ConfigResult<Vec<KeyRecord>> {
        self.static_records
            .iter()
            .map(|record| {
                if record.material.is_encrypted() {
                    return Err(ConfigError::decryption_failed(format!(
                        "key record '{}' is encrypted but no master key was provided",
                        record.id
                    )));
                }
                Ok(KeyRecord::new(record.id.as_str(), record.material.expose()))
            })
            .collect()
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            source: KeySourceMode::default(),
            direct_key_length: DEFAULT_DIRECT_KEY_LENGTH,
            master_key_env: default_master_key_env(),
            static_records: Vec::new(),
        }
    }
}

/// A key record defined in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticKeyRecord {
    /// Record id, matched against user salts.
    pub id: String,
    /// `"<base64 iv>,<base64 key>"`, optionally `ENC:` encrypted.
    pub material: SecretValue,
}

// =============================================================================
// Tokens
// =============================================================================

/// Token issuance and introspection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokensConfig {
    /// Embed an ISO-8601 `issued_at` field in new tokens.
    #[serde(default = "default_enabled")]
    pub embed_issued_at: bool,

    /// Tokens older than this are reported stale, e.g. `"30d"`.
    #[serde(default, with = "humantime_serde")]
    pub freshness_window: Option<Duration>,
}

impl TokensConfig {
    /// Validates the token configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(window) = self.freshness_window {
            if window.is_zero() {
                return Err(ConfigError::validation(
                    "tokens.freshness_window",
                    "cannot be zero",
                ));
            }
            if chrono::Duration::from_std(window).is_err() {
                return Err(ConfigError::validation(
                    "tokens.freshness_window",
                    "is too large",
                ));
            }
        }
        Ok(())
    }

    /// Builds the service token options.
    pub fn token_options(&self) -> ConfigResult<TokenOptions> {
        let mut options = TokenOptions::default().with_issued_at(self.embed_issued_at);
        if let Some(window) = self.freshness_window {
            let window = chrono::Duration::from_std(window).map_err(|e| {
                ConfigError::validation("tokens.freshness_window", e.to_string())
            })?;
            options = options.with_freshness_window(window);
        }
        Ok(options)
    }
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            embed_issued_at: true,
            freshness_window: None,
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// Backing store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// YAML or JSON file used to seed the in-memory store.
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
}

// =============================================================================
// API Configuration
// =============================================================================

/// HTTP API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Whether the API is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Bind address.
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// Listen port.
    #[serde(default = "default_api_port")]
    pub port: u16,

    /// CORS configuration.
    #[serde(default)]
    pub cors: CorsConfig,

    /// Request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0))
}

fn default_api_port() -> u16 {
    DEFAULT_API_PORT
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_body_size() -> usize {
    64 * 1024
}

impl ApiConfig {
    /// Validates the API configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.request_timeout_secs == 0 || self.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS {
            return Err(ConfigError::out_of_range(
                "api.request_timeout_secs",
                self.request_timeout_secs,
                1,
                MAX_REQUEST_TIMEOUT_SECS,
            ));
        }
        if self.max_body_size == 0 {
            return Err(ConfigError::validation("api.max_body_size", "cannot be zero"));
        }
        self.cors.validate()?;
        Ok(())
    }

    /// Returns the request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Returns the socket address.
    pub fn socket_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::new(self.bind_address, self.port)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: default_bind_address(),
            port: DEFAULT_API_PORT,
            cors: CorsConfig::default(),
            request_timeout_secs: default_request_timeout(),
            max_body_size: default_max_body_size(),
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins (use "*" for all).
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Allowed methods.
    #[serde(default = "default_methods")]
    pub allowed_methods: Vec<String>,

    /// Allowed headers.
    #[serde(default = "default_headers")]
    pub allowed_headers: Vec<String>,

    /// Allow credentials.
    #[serde(default)]
    pub allow_credentials: bool,

    /// Max age in seconds.
    #[serde(default = "default_max_age")]
    pub max_age_secs: u64,
}

fn default_methods() -> Vec<String> {
    vec!["GET".to_string(), "POST".to_string()]
}

fn default_headers() -> Vec<String> {
    vec!["Content-Type".to_string(), "Authorization".to_string()]
}

fn default_max_age() -> u64 {
    3600
}

impl CorsConfig {
    /// Validates the CORS configuration.
    ///
    /// Browsers reject a wildcard origin combined with credentials.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.allow_credentials && self.allowed_origins.iter().any(|o| o == "*") {
            return Err(ConfigError::validation(
                "api.cors",
                "allow_credentials cannot be combined with a wildcard origin",
            ));
        }
        Ok(())
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_methods: default_methods(),
            allowed_headers: default_headers(),
            allow_credentials: false,
            max_age_secs: default_max_age(),
        }
    }
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include span targets in logs.
    #[serde(default = "default_enabled")]
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            with_target: true,
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the filter directive for this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Parses a level name, accepting `warning` as an alias.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable.
    #[default]
    Text,
    /// Single-line compact output.
    Compact,
    /// JSON for log shippers.
    Json,
}

// =============================================================================
// Secret Value
// =============================================================================

/// A potentially encrypted secret value.
///
/// Values can be plain text or encrypted with the `ENC:` prefix.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretValue(String);

impl SecretValue {
    /// Creates a new secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Creates an encrypted secret value.
    pub fn encrypted(base64_ciphertext: impl Into<String>) -> Self {
        Self(format!("{}{}", ENCRYPTED_PREFIX, base64_ciphertext.into()))
    }

    /// Returns `true` if the value is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.0.starts_with(ENCRYPTED_PREFIX)
    }

    /// Returns the raw value (encrypted or plain).
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns the encrypted payload (without the ENC: prefix).
    pub fn encrypted_payload(&self) -> Option<&str> {
        self.0.strip_prefix(ENCRYPTED_PREFIX)
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretValue({})", self)
    }
}

impl fmt::Display for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_encrypted() {
            write!(f, "ENC:***")
        } else {
            write!(f, "***")
        }
    }
}
