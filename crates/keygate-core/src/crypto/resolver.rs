// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Key resolution.
//!
//! A user's salt field means one of two things, decided once by
//! configuration:
//!
//! - [`KeySourceMode::Direct`]: the salt is raw key material. It is
//!   zero-padded or truncated to the configured key size and paired with a
//!   fresh random IV per encryption.
//! - [`KeySourceMode::Referenced`]: the salt names a [`KeyRecord`] whose
//!   material is `"<base64 iv>,<base64 key>"`. The IV is fixed per user.
//!
//! [`KeyRecord`]: crate::types::KeyRecord

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use super::cipher::{CipherKey, Iv, KeySize};
use crate::error::{CoreError, CoreResult};
use crate::store::{AccessStore, KeyRecordStore};
use crate::types::{KeyRecordId, UserId};

/// Separator between the IV and key halves of key material.
pub const KEY_MATERIAL_SEPARATOR: char = ',';

// =============================================================================
// Key Sources
// =============================================================================

/// Where a user's key comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Raw key material taken from the user's salt.
    Direct(String),
    /// Reference into the key record store.
    Referenced(KeyRecordId),
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Direct(_) => f.write_str("Direct([REDACTED])"),
            KeySource::Referenced(id) => f.debug_tuple("Referenced").field(id).finish(),
        }
    }
}

/// How salts are interpreted. Set from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySourceMode {
    /// Salt is raw key material.
    Direct,
    /// Salt references a key record.
    #[default]
    Referenced,
}

impl KeySourceMode {
    /// Interprets a salt value under this mode.
    pub fn source_for(self, salt: impl Into<String>) -> KeySource {
        match self {
            KeySourceMode::Direct => KeySource::Direct(salt.into()),
            KeySourceMode::Referenced => KeySource::Referenced(KeyRecordId::new(salt)),
        }
    }
}

impl fmt::Display for KeySourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySourceMode::Direct => f.write_str("direct"),
            KeySourceMode::Referenced => f.write_str("referenced"),
        }
    }
}

/// Resolver settings, passed in at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyResolverConfig {
    /// Salt interpretation.
    pub mode: KeySourceMode,
    /// Key size used when padding or truncating direct salts.
    pub direct_key_size: KeySize,
}

impl KeyResolverConfig {
    /// Creates a config with the default 16-byte direct key size.
    pub fn new(mode: KeySourceMode) -> Self {
        Self {
            mode,
            direct_key_size: KeySize::Aes128,
        }
    }

    /// Sets the direct key length in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidKeyLength`] unless the length is 16, 24
    /// or 32.
    pub fn with_direct_key_length(mut self, length: usize) -> CoreResult<Self> {
        self.direct_key_size = KeySize::from_len(length)?;
        Ok(self)
    }
}

impl Default for KeyResolverConfig {
    fn default() -> Self {
        Self::new(KeySourceMode::default())
    }
}

// =============================================================================
// Resolved Keys
// =============================================================================

/// IV policy attached to a resolved key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IvMode {
    /// A fresh IV per encryption, carried inside the token.
    Random,
    /// The same IV for every encryption under this key.
    Fixed(Iv),
}

impl IvMode {
    /// Returns the fixed IV, if any.
    pub fn fixed(&self) -> Option<&Iv> {
        match self {
            IvMode::Random => None,
            IvMode::Fixed(iv) => Some(iv),
        }
    }
}

/// Cipher-ready key material for one user.
#[derive(Debug, Clone)]
pub struct ResolvedKey {
    /// The AES key.
    pub key: CipherKey,
    /// The IV policy.
    pub iv: IvMode,
}

impl ResolvedKey {
    /// Creates a resolved key.
    pub fn new(key: CipherKey, iv: IvMode) -> Self {
        Self { key, iv }
    }
}

// =============================================================================
// Key Material
// =============================================================================

/// Parsed `"<base64 iv>,<base64 key>"` key material.
///
/// ```
/// use keygate_core::crypto::KeyMaterial;
///
/// let text = "AAAAAAAAAAAAAAAAAAAAAA==,AAAAAAAAAAAAAAAAAAAAAA==";
/// let material = KeyMaterial::parse(text).unwrap();
/// assert_eq!(material.key().as_bytes().len(), 16);
///
/// assert!(KeyMaterial::parse("AAAA").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    iv: Iv,
    key: CipherKey,
}

impl KeyMaterial {
    /// Parses key material.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidKeyFormat`] when the text does not contain
    ///   exactly one separator, a half is not valid base64, or the IV is not
    ///   16 bytes.
    /// - [`CoreError::InvalidKeyLength`] when the key is not 16, 24 or 32
    ///   bytes.
    pub fn parse(material: &str) -> CoreResult<Self> {
        let separators = material.matches(KEY_MATERIAL_SEPARATOR).count();
        if separators != 1 {
            return Err(CoreError::invalid_key_format(format!(
                "expected exactly one separator, found {}",
                separators
            )));
        }
        let (iv_b64, key_b64) = material
            .split_once(KEY_MATERIAL_SEPARATOR)
            .ok_or_else(|| CoreError::invalid_key_format("missing separator"))?;

        let iv_bytes = STANDARD
            .decode(iv_b64.trim())
            .map_err(|e| CoreError::invalid_key_format(format!("IV is not base64: {}", e)))?;
        let key_bytes = Zeroizing::new(
            STANDARD
                .decode(key_b64.trim())
                .map_err(|e| CoreError::invalid_key_format(format!("key is not base64: {}", e)))?,
        );

        Ok(Self {
            iv: Iv::from_slice(&iv_bytes)?,
            key: CipherKey::from_bytes(&key_bytes)?,
        })
    }

    /// Generates fresh random key material.
    pub fn generate(size: KeySize) -> Self {
        let mut key = Zeroizing::new(vec![0u8; size.key_len()]);
        OsRng.fill_bytes(&mut key);
        let key = CipherKey::fit_to_bytes(&key, size);
        Self {
            iv: Iv::random(),
            key,
        }
    }

    /// Encodes the material as `"<base64 iv>,<base64 key>"`.
    pub fn encode(&self) -> Zeroizing<String> {
        Zeroizing::new(format!(
            "{}{}{}",
            STANDARD.encode(self.iv.as_bytes()),
            KEY_MATERIAL_SEPARATOR,
            STANDARD.encode(self.key.as_bytes())
        ))
    }

    /// Returns the IV.
    pub fn iv(&self) -> &Iv {
        &self.iv
    }

    /// Returns the key.
    pub fn key(&self) -> &CipherKey {
        &self.key
    }

    /// Converts into a resolved key with a fixed IV.
    pub fn into_resolved(self) -> ResolvedKey {
        ResolvedKey::new(self.key, IvMode::Fixed(self.iv))
    }
}

// =============================================================================
// KeyResolver
// =============================================================================

/// Produces cipher-ready key material for users.
///
/// Reads users and key records through the store traits and never writes.
pub struct KeyResolver {
    config: KeyResolverConfig,
    users: Arc<dyn AccessStore>,
    records: Arc<dyn KeyRecordStore>,
}

impl KeyResolver {
    /// Creates a resolver.
    pub fn new(
        config: KeyResolverConfig,
        users: Arc<dyn AccessStore>,
        records: Arc<dyn KeyRecordStore>,
    ) -> Self {
        Self {
            config,
            users,
            records,
        }
    }

    /// Returns the resolver configuration.
    pub fn config(&self) -> &KeyResolverConfig {
        &self.config
    }

    /// Resolves key material for a user.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] if the user does not exist or has no salt.
    /// - Any error of [`KeyResolver::resolve`].
    pub async fn resolve_for_user(&self, user_id: &UserId) -> CoreResult<ResolvedKey> {
        let salt = self
            .users
            .user_key_reference(user_id)
            .await?
            .filter(|salt| !salt.is_empty())
            .ok_or_else(|| CoreError::not_found("user key reference"))?;

        let source = self.config.mode.source_for(salt);
        debug!(user_id = %user_id, mode = %self.config.mode, "Resolving user key");
        self.resolve(&source).await
    }

    /// Resolves a key source.
    ///
    /// # Errors
    ///
    /// - [`CoreError::KeyNotFound`] if a referenced record does not exist.
    /// - [`CoreError::InvalidKeyFormat`] or [`CoreError::InvalidKeyLength`]
    ///   if the record's material is unusable.
    pub async fn resolve(&self, source: &KeySource) -> CoreResult<ResolvedKey> {
        match source {
            KeySource::Direct(salt) => {
                let key = CipherKey::fit_to(salt, self.config.direct_key_size);
                Ok(ResolvedKey::new(key, IvMode::Random))
            }
            KeySource::Referenced(id) => {
                let record = self
                    .records
                    .key_record(id)
                    .await?
                    .ok_or_else(|| CoreError::key_not_found(id.as_str()))?;
                let material = KeyMaterial::parse(&record.material)?;
                debug!(
                    key_record = %id,
                    key_size = %material.key().size(),
                    "Resolved referenced key"
                );
                Ok(material.into_resolved())
            }
        }
    }
}

impl fmt::Debug for KeyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyResolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
