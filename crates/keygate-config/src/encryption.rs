// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Encryption of secrets stored in configuration files.
//!
//! Key record material may be written to the config file as
//!
//! ```text
//! ENC:<base64(nonce || ciphertext || tag)>
//! ```
//!
//! sealed with AES-256-GCM under a master key that lives outside the file,
//! normally in `KEYGATE_MASTER_KEY`. Unlike token encryption this layer is
//! authenticated, so a tampered value fails to load.

#[cfg(feature = "encryption")]
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
#[cfg(feature = "encryption")]
use base64::{engine::general_purpose::STANDARD, Engine};

#[cfg(feature = "encryption")]
use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Constants
// =============================================================================

/// Marks an encrypted configuration value.
pub const ENCRYPTED_PREFIX: &str = "ENC:";

/// Master key length in bytes.
pub const MASTER_KEY_LENGTH: usize = 32;

/// GCM nonce length in bytes.
pub const NONCE_LENGTH: usize = 12;

/// GCM tag length in bytes.
pub const TAG_LENGTH: usize = 16;

// =============================================================================
// SecretCipher
// =============================================================================

/// Seals and opens `ENC:` configuration values.
#[cfg(feature = "encryption")]
#[derive(Clone)]
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

#[cfg(feature = "encryption")]
impl SecretCipher {
    /// Creates a cipher from raw master key bytes.
    pub fn new(key: [u8; MASTER_KEY_LENGTH]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key)),
        }
    }

    /// Creates a cipher from a base64 master key.
    pub fn from_base64(encoded: &str) -> ConfigResult<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ConfigError::invalid_encryption_key(format!("invalid base64: {}", e)))?;

        let key: [u8; MASTER_KEY_LENGTH] = bytes.as_slice().try_into().map_err(|_| {
            ConfigError::invalid_encryption_key(format!(
                "expected {} bytes, got {}",
                MASTER_KEY_LENGTH,
                bytes.len()
            ))
        })?;
        Ok(Self::new(key))
    }

    /// Reads the master key from an environment variable.
    pub fn from_env(var: &str) -> ConfigResult<Self> {
        let encoded = std::env::var(var).map_err(|_| ConfigError::env_var_not_found(var))?;
        Self::from_base64(&encoded)
    }

    /// Like [`from_env`](Self::from_env) but returns `None` when the
    /// variable is unset.
    pub fn from_env_optional(var: &str) -> ConfigResult<Option<Self>> {
        match std::env::var(var) {
            Ok(encoded) => Self::from_base64(&encoded).map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Encrypts `plaintext` and returns the prefixed value.
    pub fn seal(&self, plaintext: &str) -> ConfigResult<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| ConfigError::encryption_failed(e.to_string()))?;

        let mut combined = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);

        Ok(format!("{}{}", ENCRYPTED_PREFIX, STANDARD.encode(combined)))
    }

    /// Decrypts a value. The `ENC:` prefix is optional.
    pub fn open(&self, value: &str) -> ConfigResult<String> {
        let payload = value.strip_prefix(ENCRYPTED_PREFIX).unwrap_or(value);
        let combined = STANDARD
            .decode(payload.trim())
            .map_err(|e| ConfigError::decryption_failed(format!("invalid base64: {}", e)))?;

        if combined.len() < NONCE_LENGTH + TAG_LENGTH {
            return Err(ConfigError::decryption_failed("ciphertext too short"));
        }

        let (nonce, ciphertext) = combined.split_at(NONCE_LENGTH);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| ConfigError::decryption_failed("authentication failed"))?;

        String::from_utf8(plaintext)
            .map_err(|e| ConfigError::decryption_failed(format!("invalid UTF-8: {}", e)))
    }

    /// Opens `value` if it carries the prefix, otherwise returns it unchanged.
    pub fn open_if_sealed(&self, value: &str) -> ConfigResult<String> {
        if is_sealed(value) {
            self.open(value)
        } else {
            Ok(value.to_string())
        }
    }
}

#[cfg(feature = "encryption")]
impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher")
            .field("cipher", &"[REDACTED]")
            .finish()
    }
}

/// Generates a random master key, base64 encoded.
#[cfg(feature = "encryption")]
pub fn generate_master_key() -> String {
    use aes_gcm::aead::rand_core::RngCore;
    let mut key = [0u8; MASTER_KEY_LENGTH];
    OsRng.fill_bytes(&mut key);
    STANDARD.encode(key)
}

/// Returns `true` if `value` is an `ENC:` value.
pub fn is_sealed(value: &str) -> bool {
    value.starts_with(ENCRYPTED_PREFIX)
}
