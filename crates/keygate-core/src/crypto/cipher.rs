// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! AES-CBC primitives with PKCS#7 padding.
//!
//! Key size selects the AES variant: 16 bytes for AES-128, 24 for AES-192,
//! 32 for AES-256. Any other length is rejected before a cipher is built.

use std::fmt;

use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Constants
// =============================================================================

/// AES block size, and therefore the IV length, in bytes.
pub const BLOCK_SIZE: usize = 16;

/// IV length in bytes.
pub const IV_LENGTH: usize = BLOCK_SIZE;

// =============================================================================
// KeySize
// =============================================================================

/// Supported AES key sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySize {
    /// 16-byte key.
    Aes128,
    /// 24-byte key.
    Aes192,
    /// 32-byte key.
    Aes256,
}

impl KeySize {
    /// Maps a byte length to a key size.
    pub fn from_len(length: usize) -> CoreResult<Self> {
        match length {
            16 => Ok(KeySize::Aes128),
            24 => Ok(KeySize::Aes192),
            32 => Ok(KeySize::Aes256),
            other => Err(CoreError::invalid_key_length(other)),
        }
    }

    /// Key length in bytes.
    pub fn key_len(self) -> usize {
        match self {
            KeySize::Aes128 => 16,
            KeySize::Aes192 => 24,
            KeySize::Aes256 => 32,
        }
    }
}

impl fmt::Display for KeySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AES-{}", self.key_len() * 8)
    }
}

// =============================================================================
// CipherKey
// =============================================================================

/// A validated AES key. The bytes are zeroed on drop.
#[derive(Clone)]
pub struct CipherKey {
    bytes: Zeroizing<Vec<u8>>,
    size: KeySize,
}

impl CipherKey {
    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidKeyLength`] unless the input is 16, 24 or
    /// 32 bytes long.
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        let size = KeySize::from_len(bytes.len())?;
        Ok(Self {
            bytes: Zeroizing::new(bytes.to_vec()),
            size,
        })
    }

    /// Builds a key from arbitrary text by zero-padding or truncating its
    /// UTF-8 bytes to `size`.
    ///
    /// ```
    /// use keygate_core::crypto::{CipherKey, KeySize};
    ///
    /// let key = CipherKey::fit_to("short", KeySize::Aes128);
    /// assert_eq!(&key.as_bytes()[..5], b"short");
    /// assert!(key.as_bytes()[5..].iter().all(|b| *b == 0));
    /// ```
    pub fn fit_to(material: &str, size: KeySize) -> Self {
        Self::fit_to_bytes(material.as_bytes(), size)
    }

    /// Byte-level form of [`CipherKey::fit_to`].
    pub fn fit_to_bytes(source: &[u8], size: KeySize) -> Self {
        let mut bytes = Zeroizing::new(vec![0u8; size.key_len()]);
        let take = source.len().min(size.key_len());
        bytes[..take].copy_from_slice(&source[..take]);
        Self { bytes, size }
    }

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the key size.
    pub fn size(&self) -> KeySize {
        self.size
    }
}

impl fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherKey")
            .field("size", &self.size)
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// Iv
// =============================================================================

/// A 16-byte initialization vector.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Iv([u8; IV_LENGTH]);

impl Iv {
    /// Wraps raw IV bytes.
    pub const fn new(bytes: [u8; IV_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Creates an IV from a slice.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidKeyFormat`] if the slice is not 16 bytes.
    pub fn from_slice(bytes: &[u8]) -> CoreResult<Self> {
        let array: [u8; IV_LENGTH] = bytes.try_into().map_err(|_| {
            CoreError::invalid_key_format(format!(
                "IV must be {} bytes, got {}",
                IV_LENGTH,
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }

    /// Generates a random IV from the operating system RNG.
    pub fn random() -> Self {
        let mut bytes = [0u8; IV_LENGTH];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Returns the raw IV bytes.
    pub fn as_bytes(&self) -> &[u8; IV_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for Iv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Iv([REDACTED])")
    }
}

// =============================================================================
// CBC
// =============================================================================

/// Encrypts `plaintext` with AES-CBC and PKCS#7 padding.
///
/// The output length is always a positive multiple of [`BLOCK_SIZE`].
pub fn cbc_encrypt(key: &CipherKey, iv: &Iv, plaintext: &[u8]) -> CoreResult<Vec<u8>> {
    let k = key.as_bytes();
    let iv = iv.as_bytes().as_slice();
    let ciphertext = match key.size() {
        KeySize::Aes128 => cbc::Encryptor::<Aes128>::new_from_slices(k, iv)
            .map_err(|e| CoreError::internal(format!("cipher init: {}", e)))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        KeySize::Aes192 => cbc::Encryptor::<Aes192>::new_from_slices(k, iv)
            .map_err(|e| CoreError::internal(format!("cipher init: {}", e)))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        KeySize::Aes256 => cbc::Encryptor::<Aes256>::new_from_slices(k, iv)
            .map_err(|e| CoreError::internal(format!("cipher init: {}", e)))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
    };
    Ok(ciphertext)
}

/// Decrypts AES-CBC ciphertext and strips PKCS#7 padding.
///
/// # Errors
///
/// Returns [`CoreError::DecryptionFailed`] when the ciphertext is empty, is
/// not block aligned, or unpads incorrectly. A wrong key or IV normally
/// lands here.
pub fn cbc_decrypt(key: &CipherKey, iv: &Iv, ciphertext: &[u8]) -> CoreResult<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CoreError::decryption_failed(format!(
            "ciphertext length {} is not a positive multiple of {}",
            ciphertext.len(),
            BLOCK_SIZE
        )));
    }

    let k = key.as_bytes();
    let iv = iv.as_bytes().as_slice();
    let unpadded = match key.size() {
        KeySize::Aes128 => cbc::Decryptor::<Aes128>::new_from_slices(k, iv)
            .map_err(|e| CoreError::internal(format!("cipher init: {}", e)))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        KeySize::Aes192 => cbc::Decryptor::<Aes192>::new_from_slices(k, iv)
            .map_err(|e| CoreError::internal(format!("cipher init: {}", e)))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        KeySize::Aes256 => cbc::Decryptor::<Aes256>::new_from_slices(k, iv)
            .map_err(|e| CoreError::internal(format!("cipher init: {}", e)))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
    };
    unpadded.map_err(|_| CoreError::decryption_failed("invalid padding"))
}

// =============================================================================
// Comparison
// =============================================================================

/// Compares two byte strings in constant time with respect to their content.
///
/// Length mismatches return `false` immediately; lengths are not secret.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}
