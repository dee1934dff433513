// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Token codec.
//!
//! Turns a [`TokenPayload`] into an opaque [`EncryptedToken`] and back.
//!
//! # Wire Format
//!
//! ```text
//! v1:<base64(iv || ciphertext)>    random IV, carried in the token
//! v2:<base64(ciphertext)>          fixed per-user IV, supplied out of band
//! ```
//!
//! The version tag alone decides where the IV comes from. Token length is
//! never used to guess.
//!
//! # Failure Classes
//!
//! Anything wrong with the envelope (unknown tag, bad base64, truncated IV)
//! is [`CoreError::MalformedToken`]. Anything that goes wrong once the
//! cipher has run (padding, UTF-8, payload shape) is
//! [`CoreError::DecryptionFailed`].
//!
//! # Integrity
//!
//! A flipped ciphertext bit garbles a whole plaintext block, which the
//! padding and payload checks reject. The IV embedded in a v1 token is not
//! covered: CBC xors it into the first plaintext block, so flipping an IV
//! bit flips the same bit of the decoded user id. Callers must compare the
//! decoded owner against the requesting user.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use zeroize::Zeroizing;

use super::cipher::{cbc_decrypt, cbc_encrypt, constant_time_eq, CipherKey, Iv, IV_LENGTH};
use super::resolver::{IvMode, ResolvedKey};
use crate::error::{CoreError, CoreResult};
use crate::types::{ApplicationId, RoleId, UserId};

/// Field separator inside a token payload.
pub const PAYLOAD_SEPARATOR: char = ',';

// =============================================================================
// TokenPayload
// =============================================================================

/// The plaintext carried by a token: `user,application,role[,issued_at]`.
///
/// ```
/// use keygate_core::crypto::TokenPayload;
///
/// let payload = TokenPayload::parse("u1,a1,r1").unwrap();
/// assert_eq!(payload.user_id.as_str(), "u1");
/// assert_eq!(payload.encode().unwrap(), "u1,a1,r1");
///
/// assert!(TokenPayload::parse("u1,a1").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPayload {
    /// Token owner.
    pub user_id: UserId,
    /// Application the token grants access to.
    pub application_id: ApplicationId,
    /// Role within the application.
    pub role_id: RoleId,
    /// Issuance time. Encoded with as much sub-second precision as it carries.
    pub issued_at: Option<DateTime<Utc>>,
}

impl TokenPayload {
    /// Creates a payload without an issuance time.
    pub fn new(
        user_id: impl Into<UserId>,
        application_id: impl Into<ApplicationId>,
        role_id: impl Into<RoleId>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            application_id: application_id.into(),
            role_id: role_id.into(),
            issued_at: None,
        }
    }

    /// Attaches an issuance time, truncated to whole seconds.
    pub fn with_issued_at(mut self, issued_at: DateTime<Utc>) -> Self {
        self.issued_at = Some(issued_at.trunc_subsecs(0));
        self
    }

    /// Serializes the payload.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidPayload`] if an identifier is empty or
    /// contains a separator, whitespace, or non-ASCII characters.
    pub fn encode(&self) -> CoreResult<String> {
        validate_field("user_id", self.user_id.as_str())?;
        validate_field("application_id", self.application_id.as_str())?;
        validate_field("role_id", self.role_id.as_str())?;

        let mut out = format!(
            "{}{sep}{}{sep}{}",
            self.user_id,
            self.application_id,
            self.role_id,
            sep = PAYLOAD_SEPARATOR
        );
        if let Some(issued_at) = self.issued_at {
            out.push(PAYLOAD_SEPARATOR);
            out.push_str(&issued_at.to_rfc3339_opts(SecondsFormat::AutoSi, true));
        }
        Ok(out)
    }

    /// Parses a serialized payload.
    ///
    /// Exactly three or four fields are accepted.
    pub fn parse(input: &str) -> CoreResult<Self> {
        let fields: Vec<&str> = input.split(PAYLOAD_SEPARATOR).collect();
        if fields.len() != 3 && fields.len() != 4 {
            return Err(CoreError::invalid_payload(format!(
                "expected 3 or 4 fields, found {}",
                fields.len()
            )));
        }

        validate_field("user_id", fields[0])?;
        validate_field("application_id", fields[1])?;
        validate_field("role_id", fields[2])?;

        let issued_at = match fields.get(3) {
            Some(raw) => Some(
                DateTime::parse_from_rfc3339(raw)
                    .map_err(|e| CoreError::invalid_payload(format!("issued_at: {}", e)))?
                    .with_timezone(&Utc),
            ),
            None => None,
        };

        Ok(Self {
            user_id: UserId::new(fields[0]),
            application_id: ApplicationId::new(fields[1]),
            role_id: RoleId::new(fields[2]),
            issued_at,
        })
    }
}

fn validate_field(name: &str, value: &str) -> CoreResult<()> {
    if value.is_empty() {
        return Err(CoreError::invalid_payload(format!("{} is empty", name)));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_graphic() && c != PAYLOAD_SEPARATOR)
    {
        return Err(CoreError::invalid_payload(format!(
            "{} contains a separator, whitespace or non-ASCII character",
            name
        )));
    }
    Ok(())
}

// =============================================================================
// EncryptedToken
// =============================================================================

/// Wire version of an encrypted token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireVersion {
    /// Random IV prepended to the ciphertext.
    V1,
    /// Ciphertext only, IV fixed per user.
    V2,
}

impl WireVersion {
    /// Returns the tag written before the `:` separator.
    pub fn tag(self) -> &'static str {
        match self {
            WireVersion::V1 => "v1",
            WireVersion::V2 => "v2",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "v1" => Some(WireVersion::V1),
            "v2" => Some(WireVersion::V2),
            _ => None,
        }
    }
}

impl fmt::Display for WireVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A versioned, base64-encoded ciphertext.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedToken {
    version: WireVersion,
    bytes: Vec<u8>,
}

impl EncryptedToken {
    fn random_iv(iv: &Iv, ciphertext: Vec<u8>) -> Self {
        let mut bytes = Vec::with_capacity(IV_LENGTH + ciphertext.len());
        bytes.extend_from_slice(iv.as_bytes());
        bytes.extend_from_slice(&ciphertext);
        Self {
            version: WireVersion::V1,
            bytes,
        }
    }

    fn fixed_iv(ciphertext: Vec<u8>) -> Self {
        Self {
            version: WireVersion::V2,
            bytes: ciphertext,
        }
    }

    /// Returns the wire version.
    pub fn version(&self) -> WireVersion {
        self.version
    }

    /// Returns the ciphertext portion, excluding any embedded IV.
    pub fn ciphertext(&self) -> &[u8] {
        match self.version {
            WireVersion::V1 => &self.bytes[IV_LENGTH..],
            WireVersion::V2 => &self.bytes,
        }
    }

    /// Returns the IV embedded in a `v1` token.
    pub fn embedded_iv(&self) -> Option<Iv> {
        match self.version {
            WireVersion::V1 => Iv::from_slice(&self.bytes[..IV_LENGTH]).ok(),
            WireVersion::V2 => None,
        }
    }

    /// Returns the decoded bytes behind the base64 text.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encodes the token for storage or transport.
    pub fn encode(&self) -> String {
        format!("{}:{}", self.version.tag(), STANDARD.encode(&self.bytes))
    }

    /// Parses a token string.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MalformedToken`] for a missing or unknown version
    /// tag, invalid base64, or a body too short to hold its IV and one block.
    pub fn parse(input: &str) -> CoreResult<Self> {
        let (tag, body) = input
            .trim()
            .split_once(':')
            .ok_or_else(|| CoreError::malformed_token("missing version tag"))?;
        let version = WireVersion::from_tag(tag)
            .ok_or_else(|| CoreError::malformed_token(format!("unknown version '{}'", tag)))?;
        let bytes = STANDARD
            .decode(body)
            .map_err(|e| CoreError::malformed_token(format!("invalid base64: {}", e)))?;

        let minimum = match version {
            WireVersion::V1 => IV_LENGTH + 1,
            WireVersion::V2 => 1,
        };
        if bytes.len() < minimum {
            return Err(CoreError::malformed_token(format!(
                "{} token body of {} bytes is too short",
                version,
                bytes.len()
            )));
        }

        Ok(Self { version, bytes })
    }
}

impl fmt::Display for EncryptedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl fmt::Debug for EncryptedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedToken")
            .field("version", &self.version)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl FromStr for EncryptedToken {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// =============================================================================
// TokenCodec
// =============================================================================

/// Stateless AES-CBC token codec.
///
/// Every call is independent; the only side effect is drawing a random IV
/// for `v1` tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCodec;

impl TokenCodec {
    /// Encrypts a payload under a fixed IV, producing a `v2` token.
    pub fn encrypt(payload: &TokenPayload, key: &CipherKey, iv: &Iv) -> CoreResult<EncryptedToken> {
        let plaintext = Zeroizing::new(payload.encode()?);
        Self::encrypt_bytes(plaintext.as_bytes(), key, &IvMode::Fixed(*iv))
    }

    /// Encrypts a payload under a fresh random IV, producing a `v1` token.
    pub fn encrypt_with_random_iv(
        payload: &TokenPayload,
        key: &CipherKey,
    ) -> CoreResult<EncryptedToken> {
        let plaintext = Zeroizing::new(payload.encode()?);
        Self::encrypt_bytes(plaintext.as_bytes(), key, &IvMode::Random)
    }

    /// Decrypts a token into its payload.
    ///
    /// `iv` is required for `v2` tokens and ignored for `v1` tokens, which
    /// carry their own.
    pub fn decrypt(
        token: &EncryptedToken,
        key: &CipherKey,
        iv: Option<&Iv>,
    ) -> CoreResult<TokenPayload> {
        let plaintext = Self::decrypt_bytes(token, key, iv)?;
        let text = std::str::from_utf8(&plaintext)
            .map_err(|_| CoreError::decryption_failed("plaintext is not valid UTF-8"))?;
        TokenPayload::parse(text)
            .map_err(|e| CoreError::decryption_failed(format!("payload rejected: {}", e)))
    }

    /// Encrypts a payload with resolved key material.
    ///
    /// The IV mode of the key decides the wire version.
    pub fn seal(payload: &TokenPayload, key: &ResolvedKey) -> CoreResult<EncryptedToken> {
        let plaintext = Zeroizing::new(payload.encode()?);
        Self::encrypt_bytes(plaintext.as_bytes(), &key.key, &key.iv)
    }

    /// Parses and decrypts a token string with resolved key material.
    pub fn open(token: &str, key: &ResolvedKey) -> CoreResult<TokenPayload> {
        let token = EncryptedToken::parse(token)?;
        Self::decrypt(&token, &key.key, key.iv.fixed())
    }

    /// Encrypts an arbitrary secret such as a password.
    pub fn seal_secret(secret: &str, key: &ResolvedKey) -> CoreResult<EncryptedToken> {
        Self::encrypt_bytes(secret.as_bytes(), &key.key, &key.iv)
    }

    /// Decrypts a secret previously produced by [`TokenCodec::seal_secret`].
    pub fn open_secret(token: &str, key: &ResolvedKey) -> CoreResult<Zeroizing<String>> {
        let token = EncryptedToken::parse(token)?;
        let plaintext = Self::decrypt_bytes(&token, &key.key, key.iv.fixed())?;
        String::from_utf8(plaintext.to_vec())
            .map(Zeroizing::new)
            .map_err(|_| CoreError::decryption_failed("secret is not valid UTF-8"))
    }

    /// Checks a submitted secret against its stored encrypted form.
    ///
    /// `v2` secrets are compared by re-encrypting the submission under the
    /// same key and IV. `v1` secrets are decrypted and compared as
    /// plaintext. Both comparisons run in constant time.
    ///
    /// # Errors
    ///
    /// Fails only when the stored value itself cannot be read.
    pub fn verify_secret(submitted: &str, stored: &str, key: &ResolvedKey) -> CoreResult<bool> {
        let stored = EncryptedToken::parse(stored)?;
        match stored.version() {
            WireVersion::V2 => {
                let iv = key.iv.fixed().ok_or_else(|| {
                    CoreError::malformed_token("v2 secret requires a fixed IV")
                })?;
                let candidate = cbc_encrypt(&key.key, iv, submitted.as_bytes())?;
                Ok(constant_time_eq(&candidate, stored.ciphertext()))
            }
            WireVersion::V1 => {
                let plaintext = Self::decrypt_bytes(&stored, &key.key, None)?;
                Ok(constant_time_eq(&plaintext, submitted.as_bytes()))
            }
        }
    }

    fn encrypt_bytes(plaintext: &[u8], key: &CipherKey, mode: &IvMode) -> CoreResult<EncryptedToken> {
        match mode {
            IvMode::Random => {
                let iv = Iv::random();
                let ciphertext = cbc_encrypt(key, &iv, plaintext)?;
                Ok(EncryptedToken::random_iv(&iv, ciphertext))
            }
            IvMode::Fixed(iv) => {
                let ciphertext = cbc_encrypt(key, iv, plaintext)?;
                Ok(EncryptedToken::fixed_iv(ciphertext))
            }
        }
    }

    fn decrypt_bytes(
        token: &EncryptedToken,
        key: &CipherKey,
        iv: Option<&Iv>,
    ) -> CoreResult<Zeroizing<Vec<u8>>> {
        let iv = match (token.version(), iv) {
            (WireVersion::V1, _) => token
                .embedded_iv()
                .ok_or_else(|| CoreError::malformed_token("v1 token is missing its IV"))?,
            (WireVersion::V2, Some(iv)) => *iv,
            (WireVersion::V2, None) => {
                return Err(CoreError::malformed_token("v2 token requires a fixed IV"))
            }
        };
        cbc_decrypt(key, &iv, token.ciphertext()).map(Zeroizing::new)
    }
}
