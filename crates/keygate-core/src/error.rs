// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error taxonomy for keygate.
//!
//! Every failure in the key resolution, token codec and access service paths
//! is expressed as a [`CoreError`]. Errors are scoped to a single request;
//! nothing in this crate is fatal to the process.
//!
//! ```text
//! CoreError
//! ├── request shape    Validation
//! ├── lookups          NotFound, KeyNotFound
//! ├── authorization    Forbidden, InvalidCredentials
//! ├── key material     InvalidKeyFormat, InvalidKeyLength
//! ├── token codec      MalformedToken, DecryptionFailed, InvalidPayload
//! └── collaborators    Conflict, Store, Internal
//! ```
//!
//! # Examples
//!
//! ```
//! use keygate_core::error::CoreError;
//!
//! let error = CoreError::decryption_failed("invalid padding");
//! assert!(error.is_token_error());
//! assert_eq!(error.error_type(), "decryption_failed");
//! ```

use thiserror::Error;

// =============================================================================
// CoreError
// =============================================================================

/// The error type for all keygate core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A request field is missing or invalid.
    #[error("Validation failed for '{field}': {message}")]
    Validation {
        /// The offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// A user, grant or other record does not exist.
    #[error("{resource} not found")]
    NotFound {
        /// Description of the missing resource.
        resource: String,
    },

    /// No grant authorizes the requested operation.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Reason for the refusal.
        message: String,
    },

    /// Username or password did not match.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// The key record referenced by a user could not be found.
    #[error("Key record not found for reference '{reference}'")]
    KeyNotFound {
        /// The unresolved reference.
        reference: String,
    },

    /// Key material could not be parsed.
    #[error("Invalid key format: {message}")]
    InvalidKeyFormat {
        /// Parse failure detail.
        message: String,
    },

    /// Key is not 16, 24 or 32 bytes long.
    #[error("Invalid key length: {length} bytes (expected 16, 24 or 32)")]
    InvalidKeyLength {
        /// The rejected length.
        length: usize,
    },

    /// The token did not decrypt to a valid payload.
    ///
    /// Covers bad padding, invalid UTF-8 and malformed payloads produced by
    /// a wrong key, wrong IV, or tampered ciphertext.
    #[error("Decryption failed: {reason}")]
    DecryptionFailed {
        /// Internal reason. Never shown to clients.
        reason: String,
    },

    /// The token envelope is unreadable before any decryption is attempted.
    #[error("Malformed token: {message}")]
    MalformedToken {
        /// Envelope failure detail.
        message: String,
    },

    /// A payload supplied for encryption is not well formed.
    #[error("Invalid token payload: {message}")]
    InvalidPayload {
        /// Payload failure detail.
        message: String,
    },

    /// A concurrent writer updated the record first.
    #[error("Conflict: {message}")]
    Conflict {
        /// Conflict detail.
        message: String,
    },

    /// The backing store failed.
    #[error("Store error: {message}")]
    Store {
        /// Store failure detail.
        message: String,
    },

    /// Unexpected internal failure.
    #[error("Internal error: {message}")]
    Internal {
        /// Failure detail.
        message: String,
    },
}

impl CoreError {
    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Creates a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a key not found error.
    pub fn key_not_found(reference: impl Into<String>) -> Self {
        Self::KeyNotFound {
            reference: reference.into(),
        }
    }

    /// Creates an invalid key format error.
    pub fn invalid_key_format(message: impl Into<String>) -> Self {
        Self::InvalidKeyFormat {
            message: message.into(),
        }
    }

    /// Creates an invalid key length error.
    pub fn invalid_key_length(length: usize) -> Self {
        Self::InvalidKeyLength { length }
    }

    /// Creates a decryption failed error.
    pub fn decryption_failed(reason: impl Into<String>) -> Self {
        Self::DecryptionFailed {
            reason: reason.into(),
        }
    }

    /// Creates a malformed token error.
    pub fn malformed_token(message: impl Into<String>) -> Self {
        Self::MalformedToken {
            message: message.into(),
        }
    }

    /// Creates an invalid payload error.
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }

    /// Creates a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` for failures on the token decode path.
    ///
    /// These collapse into a single generic message at the API boundary.
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            CoreError::DecryptionFailed { .. }
                | CoreError::MalformedToken { .. }
                | CoreError::InvalidPayload { .. }
        )
    }

    /// Returns `true` for key material problems.
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            CoreError::KeyNotFound { .. }
                | CoreError::InvalidKeyFormat { .. }
                | CoreError::InvalidKeyLength { .. }
        )
    }

    /// Returns `true` if retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Conflict { .. } | CoreError::Store { .. })
    }

    /// Returns the error type as a string for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            CoreError::Validation { .. } => "validation",
            CoreError::NotFound { .. } => "not_found",
            CoreError::Forbidden { .. } => "forbidden",
            CoreError::InvalidCredentials => "invalid_credentials",
            CoreError::KeyNotFound { .. } => "key_not_found",
            CoreError::InvalidKeyFormat { .. } => "invalid_key_format",
            CoreError::InvalidKeyLength { .. } => "invalid_key_length",
            CoreError::DecryptionFailed { .. } => "decryption_failed",
            CoreError::MalformedToken { .. } => "malformed_token",
            CoreError::InvalidPayload { .. } => "invalid_payload",
            CoreError::Conflict { .. } => "conflict",
            CoreError::Store { .. } => "store",
            CoreError::Internal { .. } => "internal",
        }
    }

    /// Returns a message safe to show to clients.
    ///
    /// Token and key failures never expose their inner detail.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Validation { field, message } => format!("{}: {}", field, message),
            CoreError::NotFound { resource } => format!("{} not found", resource),
            CoreError::Forbidden { message } => message.clone(),
            CoreError::InvalidCredentials => "Invalid username or password".to_string(),
            CoreError::DecryptionFailed { .. }
            | CoreError::MalformedToken { .. }
            | CoreError::InvalidPayload { .. } => "Invalid token".to_string(),
            CoreError::Conflict { .. } => {
                "The token was updated concurrently, retry the request".to_string()
            }
            CoreError::KeyNotFound { .. }
            | CoreError::InvalidKeyFormat { .. }
            | CoreError::InvalidKeyLength { .. }
            | CoreError::Store { .. }
            | CoreError::Internal { .. } => "An internal error occurred".to_string(),
        }
    }
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Tests
// =============================================================================
