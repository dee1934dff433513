// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loading for keygate.
//!
//! # Loading Pipeline
//!
//! 1. Read the file and substitute `${VAR}` / `${VAR:default}` placeholders
//! 2. Parse YAML, TOML or JSON into [`KeygateConfig`]
//! 3. Apply `KEYGATE_*` environment overrides
//! 4. Resolve relative paths against the config file's directory
//! 5. Decrypt `ENC:` key record material
//! 6. Validate
//!
//! # Environment Variable Override
//!
//! ```text
//! KEYGATE_API_PORT=9090
//! KEYGATE_API_ENABLED=false
//! KEYGATE_API_BIND_ADDRESS=127.0.0.1
//! KEYGATE_LOG_LEVEL=debug
//! KEYGATE_KEY_SOURCE=direct
//! KEYGATE_STORE_SEED_FILE=/etc/keygate/seed.yaml
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use keygate_core::crypto::KeySourceMode;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{KeygateConfig, LogLevel};

// =============================================================================
// ConfigLoader
// =============================================================================

/// Loads a [`KeygateConfig`] from disk or from a string.
///
/// ```no_run
/// use keygate_config::loader::ConfigLoader;
///
/// let config = ConfigLoader::new().load("keygate.yaml").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    base_path: Option<PathBuf>,
    env_prefix: String,
    resolve_env_vars: bool,
    resolve_paths: bool,
    /// Overrides `keys.master_key_env` when set.
    #[cfg(feature = "encryption")]
    master_key: Option<[u8; 32]>,
}

impl ConfigLoader {
    /// Creates a loader with default settings.
    pub fn new() -> Self {
        Self {
            base_path: None,
            env_prefix: "KEYGATE".to_string(),
            resolve_env_vars: true,
            resolve_paths: true,
            #[cfg(feature = "encryption")]
            master_key: None,
        }
    }

    /// Creates a builder for configuring the loader.
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder::new()
    }

    /// Sets the base path for resolving relative paths.
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Sets the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enables or disables environment variable resolution.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = enabled;
        self
    }

    /// Enables or disables relative path resolution.
    pub fn with_path_resolution(mut self, enabled: bool) -> Self {
        self.resolve_paths = enabled;
        self
    }

    /// Sets the master key used for `ENC:` values.
    #[cfg(feature = "encryption")]
    pub fn with_master_key(mut self, key: [u8; 32]) -> Self {
        self.master_key = Some(key);
        self
    }

    /// Loads configuration from a file.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<KeygateConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let base_path = self.base_path.clone().unwrap_or_else(|| {
            path.parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
        });

        let content = self.read_file(path)?;
        let format = ConfigFormat::from_path(path)?;
        let mut config = self.parse_content(&content, format, path)?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }

        if self.resolve_paths {
            self.resolve_relative_paths(&mut config, &base_path);
        }

        self.decrypt_secrets(&mut config)?;

        config.validate()?;

        info!(
            service = %config.service.name,
            key_source = %config.keys.source,
            "Configuration loaded successfully"
        );
        debug!(
            static_records = config.keys.static_records.len(),
            seed_file = ?config.store.seed_file,
            "Configuration details"
        );

        Ok(config)
    }

    /// Loads configuration from a string.
    ///
    /// Relative paths are left untouched.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> ConfigResult<KeygateConfig> {
        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(content)
        } else {
            content.to_string()
        };
        let mut config: KeygateConfig = parse_str(&content, format)
            .map_err(|message| ConfigError::parse("<string>", message))?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }

        self.decrypt_secrets(&mut config)?;
        config.validate()?;

        Ok(config)
    }

    fn read_file(&self, path: &Path) -> ConfigResult<String> {
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))
    }

    fn parse_content(
        &self,
        content: &str,
        format: ConfigFormat,
        path: &Path,
    ) -> ConfigResult<KeygateConfig> {
        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(content)
        } else {
            content.to_string()
        };

        parse_str(&content, format).map_err(|message| ConfigError::parse(path, message))
    }

    /// Substitutes `${VAR_NAME}` and `${VAR_NAME:default}`.
    ///
    /// Unset variables without a default are left in place.
    fn resolve_env_placeholders(&self, content: &str) -> String {
        let mut result = String::with_capacity(content.len());
        let mut rest = content;

        while let Some(start) = rest.find("${") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];

            let Some(end) = after.find('}') else {
                result.push_str(&rest[start..]);
                return result;
            };

            let inner = &after[..end];
            let (name, default) = match inner.split_once(':') {
                Some((name, default)) => (name, Some(default)),
                None => (inner, None),
            };

            match (env::var(name), default) {
                (Ok(value), _) => result.push_str(&value),
                (Err(_), Some(default)) => result.push_str(default),
                (Err(_), None) => {
                    warn!("Environment variable '{}' not found", name);
                    result.push_str(&rest[start..start + 2 + end + 1]);
                }
            }

            rest = &after[end + 1..];
        }

        result.push_str(rest);
        result
    }

    fn apply_env_overrides(&self, config: &mut KeygateConfig) -> ConfigResult<()> {
        let var = |suffix: &str| format!("{}_{}", self.env_prefix, suffix);

        if let Ok(value) = env::var(var("API_PORT")) {
            config.api.port = value
                .parse()
                .map_err(|_| ConfigError::invalid_env_var(var("API_PORT"), "expected valid port number"))?;
        }
        if let Ok(value) = env::var(var("API_ENABLED")) {
            config.api.enabled = parse_bool(&value);
        }
        if let Ok(value) = env::var(var("API_BIND_ADDRESS")) {
            config.api.bind_address = value.parse().map_err(|_| {
                ConfigError::invalid_env_var(var("API_BIND_ADDRESS"), "expected an IP address")
            })?;
        }

        if let Ok(value) = env::var(var("LOG_LEVEL")) {
            match LogLevel::parse(&value) {
                Some(level) => config.logging.level = level,
                None => warn!("Ignoring unknown log level '{}'", value),
            }
        }

        if let Ok(value) = env::var(var("KEY_SOURCE")) {
            config.keys.source = match value.to_lowercase().as_str() {
                "direct" => KeySourceMode::Direct,
                "referenced" => KeySourceMode::Referenced,
                _ => {
                    return Err(ConfigError::invalid_env_var(
                        var("KEY_SOURCE"),
                        "expected 'direct' or 'referenced'",
                    ))
                }
            };
        }

        if let Ok(value) = env::var(var("STORE_SEED_FILE")) {
            config.store.seed_file = Some(PathBuf::from(value));
        }

        Ok(())
    }

    fn resolve_relative_paths(&self, config: &mut KeygateConfig, base_path: &Path) {
        if let Some(ref mut seed_file) = config.store.seed_file {
            if seed_file.is_relative() {
                *seed_file = base_path.join(&seed_file);
            }
        }
    }

    /// Decrypts `ENC:` key record material.
    ///
    /// Without a master key the values stay encrypted and validation
    /// skips them; using them later fails.
    #[cfg(feature = "encryption")]
    fn decrypt_secrets(&self, config: &mut KeygateConfig) -> ConfigResult<()> {
        use crate::encryption::SecretCipher;
        use crate::schema::SecretValue;

        if !config.keys.static_records.iter().any(|r| r.material.is_encrypted()) {
            return Ok(());
        }

        let cipher = match self.master_key {
            Some(key) => SecretCipher::new(key),
            None => match SecretCipher::from_env_optional(&config.keys.master_key_env)? {
                Some(cipher) => cipher,
                None => {
                    warn!(
                        env = %config.keys.master_key_env,
                        "Encrypted key records present but no master key is set"
                    );
                    return Ok(());
                }
            },
        };

        for record in &mut config.keys.static_records {
            if record.material.is_encrypted() {
                let plain = cipher.open(record.material.expose()).map_err(|e| {
                    ConfigError::decryption_failed(format!("key record '{}': {}", record.id, e))
                })?;
                record.material = SecretValue::new(plain);
            }
        }

        Ok(())
    }

    #[cfg(not(feature = "encryption"))]
    fn decrypt_secrets(&self, _config: &mut KeygateConfig) -> ConfigResult<()> {
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConfigLoaderBuilder
// =============================================================================

/// Builder for [`ConfigLoader`].
#[derive(Debug, Default)]
pub struct ConfigLoaderBuilder {
    base_path: Option<PathBuf>,
    env_prefix: Option<String>,
    resolve_env_vars: Option<bool>,
    resolve_paths: Option<bool>,
    #[cfg(feature = "encryption")]
    master_key: Option<[u8; 32]>,
}

impl ConfigLoaderBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base path.
    pub fn base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Sets the environment variable prefix.
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Enables or disables environment variable resolution.
    pub fn resolve_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = Some(enabled);
        self
    }

    /// Enables or disables path resolution.
    pub fn resolve_paths(mut self, enabled: bool) -> Self {
        self.resolve_paths = Some(enabled);
        self
    }

    /// Sets the master key.
    #[cfg(feature = "encryption")]
    pub fn master_key(mut self, key: [u8; 32]) -> Self {
        self.master_key = Some(key);
        self
    }

    /// Builds the loader.
    pub fn build(self) -> ConfigLoader {
        let defaults = ConfigLoader::new();
        ConfigLoader {
            base_path: self.base_path,
            env_prefix: self.env_prefix.unwrap_or(defaults.env_prefix),
            resolve_env_vars: self.resolve_env_vars.unwrap_or(defaults.resolve_env_vars),
            resolve_paths: self.resolve_paths.unwrap_or(defaults.resolve_paths),
            #[cfg(feature = "encryption")]
            master_key: self.master_key,
        }
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file extension.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            "json" => Ok(ConfigFormat::Json),
            other => Err(ConfigError::unsupported_format(other)),
        }
    }

    /// Returns the canonical file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "true" | "1" | "yes" | "on" | "enabled"
    )
}

fn parse_str<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> Result<T, String> {
    match format {
        ConfigFormat::Yaml => parse_yaml(content),
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
    }
}

/// YAML goes through the `config` crate.
fn parse_yaml<T: DeserializeOwned>(content: &str) -> Result<T, String> {
    config::Config::builder()
        .add_source(config::File::from_str(content, config::FileFormat::Yaml))
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| e.to_string())
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Loads configuration from a file with default settings.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<KeygateConfig> {
    ConfigLoader::new().load(path)
}

/// Loads configuration from a string with default settings.
pub fn load_config_str(content: &str, format: ConfigFormat) -> ConfigResult<KeygateConfig> {
    ConfigLoader::new().load_from_str(content, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MATERIAL: &str = "AAAAAAAAAAAAAAAAAAAAAA==,AAAAAAAAAAAAAAAAAAAAAA==";

    fn sample_yaml() -> String {
        format!(
            r#"
service:
  name: keygate-test
keys:
  source: referenced
  static_records:
    - id: k1
      material: "{MATERIAL}"
tokens:
  embed_issued_at: false
  freshness_window: 30d
store:
  seed_file: seed.yaml
api:
  port: 9000
logging:
  level: debug
  format: json
"#
        )
    }

    fn isolated_loader(prefix: &str) -> ConfigLoader {
        ConfigLoader::new().with_env_prefix(prefix)
    }

    #[test]
    fn test_load_yaml() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        file.write_all(sample_yaml().as_bytes()).unwrap();

        let config = isolated_loader("KG_TEST_LOAD_YAML").load(file.path()).unwrap();
        assert_eq!(config.service.name, "keygate-test");
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.keys.static_records.len(), 1);
        assert!(!config.tokens.embed_issued_at);
        assert_eq!(
            config.tokens.freshness_window,
            Some(std::time::Duration::from_secs(30 * 86_400))
        );
        assert_eq!(config.logging.level, LogLevel::Debug);

        let seed = config.store.seed_file.unwrap();
        assert!(seed.is_absolute() || seed.starts_with(file.path().parent().unwrap()));
        assert!(seed.ends_with("seed.yaml"));
    }

    #[test]
    fn test_load_toml_and_json() {
        let toml = "[api]\nport = 9100\n\n[keys]\nsource = \"direct\"\ndirect_key_length = 32\n";
        let config = isolated_loader("KG_TEST_TOML")
            .load_from_str(toml, ConfigFormat::Toml)
            .unwrap();
        assert_eq!(config.api.port, 9100);
        assert_eq!(config.keys.source, KeySourceMode::Direct);
        assert_eq!(config.keys.direct_key_length, 32);

        let json = r#"{"service": {"name": "json-gate"}}"#;
        let config = isolated_loader("KG_TEST_JSON")
            .load_from_str(json, ConfigFormat::Json)
            .unwrap();
        assert_eq!(config.service.name, "json-gate");
    }

    #[test]
    fn test_empty_yaml_yields_defaults() {
        let config = isolated_loader("KG_TEST_EMPTY")
            .load_from_str("", ConfigFormat::Yaml)
            .unwrap();
        assert_eq!(config.api.port, crate::schema::DEFAULT_API_PORT);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = isolated_loader("KG_TEST_UNKNOWN")
            .load_from_str("[keys]\nsalt_mode = \"direct\"\n", ConfigFormat::Toml);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_invalid_key_length_rejected() {
        let result = isolated_loader("KG_TEST_BADLEN")
            .load_from_str("[keys]\ndirect_key_length = 20\n", ConfigFormat::Toml);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_config_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.yml")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.TOML")).unwrap(), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")).unwrap(), ConfigFormat::Json);
        assert!(ConfigFormat::from_path(Path::new("a.ini")).is_err());
    }

    #[test]
    fn test_env_placeholder_resolution() {
        env::set_var("KG_TEST_PLACEHOLDER_NAME", "from-env");
        let loader = isolated_loader("KG_TEST_PLACEHOLDER");
        let resolved = loader.resolve_env_placeholders("name: ${KG_TEST_PLACEHOLDER_NAME}");
        assert_eq!(resolved, "name: from-env");

        let resolved = loader.resolve_env_placeholders("port: ${KG_TEST_PLACEHOLDER_UNSET:8081}");
        assert_eq!(resolved, "port: 8081");

        let resolved = loader.resolve_env_placeholders("x: ${KG_TEST_PLACEHOLDER_UNSET} ${open");
        assert_eq!(resolved, "x: ${KG_TEST_PLACEHOLDER_UNSET} ${open");
    }

    #[test]
    fn test_env_overrides() {
        env::set_var("KG_TEST_OVERRIDE_API_PORT", "9555");
        env::set_var("KG_TEST_OVERRIDE_KEY_SOURCE", "direct");
        env::set_var("KG_TEST_OVERRIDE_LOG_LEVEL", "warning");

        let config = isolated_loader("KG_TEST_OVERRIDE")
            .load_from_str("", ConfigFormat::Yaml)
            .unwrap();
        assert_eq!(config.api.port, 9555);
        assert_eq!(config.keys.source, KeySourceMode::Direct);
        assert_eq!(config.logging.level, LogLevel::Warn);

        env::set_var("KG_TEST_BADPORT_API_PORT", "http");
        let result = isolated_loader("KG_TEST_BADPORT").load_from_str("", ConfigFormat::Yaml);
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar { .. })));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool("ON"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("nope"));
    }

    #[test]
    fn test_loader_builder() {
        let loader = ConfigLoader::builder()
            .env_prefix("CUSTOM")
            .resolve_env_vars(false)
            .build();
        assert_eq!(loader.env_prefix, "CUSTOM");
        assert!(!loader.resolve_env_vars);
        assert!(loader.resolve_paths);
    }

    #[test]
    fn test_file_not_found() {
        let result = load_config("/nonexistent/keygate.yaml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[cfg(feature = "encryption")]
    #[test]
    fn test_encrypted_key_record_is_decrypted() {
        use crate::encryption::SecretCipher;

        let master = [9u8; 32];
        let sealed = SecretCipher::new(master).seal(MATERIAL).unwrap();
        let toml = format!(
            "[keys]\nmaster_key_env = \"KG_TEST_ENC_UNSET_MASTER\"\n\n[[keys.static_records]]\nid = \"k1\"\nmaterial = \"{}\"\n",
            sealed
        );

        let config = isolated_loader("KG_TEST_ENC")
            .with_master_key(master)
            .load_from_str(&toml, ConfigFormat::Toml)
            .unwrap();
        let records = config.keys.key_records().unwrap();
        assert_eq!(records[0].material, MATERIAL);

        let wrong = isolated_loader("KG_TEST_ENC")
            .with_master_key([1u8; 32])
            .load_from_str(&toml, ConfigFormat::Toml);
        assert!(matches!(wrong, Err(ConfigError::DecryptionFailed { .. })));

        let no_key = isolated_loader("KG_TEST_ENC")
            .load_from_str(&toml, ConfigFormat::Toml)
            .unwrap();
        assert!(no_key.keys.key_records().is_err());
    }
}
