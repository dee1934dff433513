// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API error types and their HTTP mapping.
//!
//! Every handler returns [`ApiResult`]. Core errors are converted with
//! `From<CoreError>`, which decides the status and the client-facing message.
//! Token failures all look the same from outside; the underlying reason is
//! only logged.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use keygate_core::CoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Message returned for every token decoding failure.
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid token";

/// Message returned for server-side failures.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

// =============================================================================
// ApiError
// =============================================================================

/// API error type with HTTP status code mapping.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or incomplete request (400).
    #[error("Bad request: {message}")]
    BadRequest {
        /// Error message.
        message: String,
    },

    /// A token could not be decoded (400).
    #[error("Invalid token: {reason}")]
    InvalidToken {
        /// Logged, never returned.
        reason: String,
    },

    /// Wrong credentials (401).
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Error message.
        message: String,
    },

    /// No grant for the request (403).
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Error message.
        message: String,
    },

    /// Resource not found (404).
    #[error("Resource not found: {resource}")]
    NotFound {
        /// The resource that was not found.
        resource: String,
    },

    /// Concurrent modification (409).
    #[error("Conflict: {message}")]
    Conflict {
        /// Error message.
        message: String,
    },

    /// Internal server error (500).
    #[error("Internal error: {message}")]
    Internal {
        /// Logged, never returned.
        message: String,
    },
}

impl ApiError {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Creates an invalid token error.
    pub fn invalid_token(reason: impl Into<String>) -> Self {
        Self::InvalidToken {
            reason: reason.into(),
        }
    }

    /// Creates an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Creates a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } | ApiError::InvalidToken { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for categorization.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest { .. } => "BAD_REQUEST",
            ApiError::InvalidToken { .. } => "INVALID_TOKEN",
            ApiError::Unauthorized { .. } => "UNAUTHORIZED",
            ApiError::Forbidden { .. } => "FORBIDDEN",
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::Conflict { .. } => "CONFLICT",
            ApiError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Returns the message sent to the client.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::BadRequest { message } => message.clone(),
            ApiError::InvalidToken { .. } => INVALID_TOKEN_MESSAGE.to_string(),
            ApiError::Unauthorized { message } => message.clone(),
            ApiError::Forbidden { message } => message.clone(),
            ApiError::NotFound { resource } => format!("{} not found", resource),
            ApiError::Conflict { message } => message.clone(),
            ApiError::Internal { .. } => INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }

    /// Returns `true` if this error should be logged at error level.
    pub fn is_server_error(&self) -> bool {
        matches!(self, ApiError::Internal { .. })
    }
}

// =============================================================================
// IntoResponse Implementation
// =============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        if self.is_server_error() {
            tracing::error!(
                error = %self,
                error_code = error_code,
                status = %status,
                "Server error occurred"
            );
        } else {
            tracing::debug!(
                error = %self,
                error_code = error_code,
                status = %status,
                "Client error occurred"
            );
        }

        let body = ErrorResponseBody {
            error: ErrorDetails {
                code: error_code.to_string(),
                message: self.user_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Error Response Body
// =============================================================================

/// Error response body structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseBody {
    /// Error details.
    pub error: ErrorDetails,
}

/// Error details within the response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

// =============================================================================
// From Implementations
// =============================================================================

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.user_message();
        match err {
            CoreError::Validation { .. } => ApiError::bad_request(err.to_string()),
            CoreError::DecryptionFailed { .. }
            | CoreError::MalformedToken { .. }
            | CoreError::InvalidPayload { .. } => ApiError::invalid_token(err.to_string()),
            CoreError::InvalidCredentials => ApiError::unauthorized(message),
            CoreError::Forbidden { .. } => ApiError::forbidden(message),
            CoreError::NotFound { resource } => ApiError::not_found(resource),
            CoreError::KeyNotFound { .. } => ApiError::not_found("user key"),
            CoreError::Conflict { .. } => ApiError::conflict(message),
            CoreError::InvalidKeyFormat { .. }
            | CoreError::InvalidKeyLength { .. }
            | CoreError::Store { .. }
            | CoreError::Internal { .. } => ApiError::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_core_error_mapping() {
        let cases = [
            (CoreError::validation("user_id", "required"), StatusCode::BAD_REQUEST),
            (CoreError::decryption_failed("invalid padding"), StatusCode::BAD_REQUEST),
            (CoreError::malformed_token("missing version"), StatusCode::BAD_REQUEST),
            (CoreError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (CoreError::forbidden("no grant"), StatusCode::FORBIDDEN),
            (CoreError::not_found("user"), StatusCode::NOT_FOUND),
            (CoreError::key_not_found("k9"), StatusCode::NOT_FOUND),
            (CoreError::conflict("stale"), StatusCode::CONFLICT),
            (CoreError::invalid_key_format("no comma"), StatusCode::INTERNAL_SERVER_ERROR),
            (CoreError::store("down"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (core, status) in cases {
            assert_eq!(ApiError::from(core).status_code(), status);
        }
    }

    #[test]
    fn test_token_errors_share_one_message() {
        let a = ApiError::from(CoreError::decryption_failed("invalid padding"));
        let b = ApiError::from(CoreError::malformed_token("bad base64"));
        let c = ApiError::from(CoreError::invalid_payload("expected 3 or 4 fields"));
        assert_eq!(a.user_message(), INVALID_TOKEN_MESSAGE);
        assert_eq!(a.user_message(), b.user_message());
        assert_eq!(b.user_message(), c.user_message());
        assert_eq!(a.error_code(), c.error_code());
    }

    #[test]
    fn test_key_not_found_does_not_echo_reference() {
        let err = ApiError::from(CoreError::key_not_found("secret-ref-42"));
        assert!(!err.user_message().contains("secret-ref-42"));
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = ApiError::from(CoreError::invalid_key_length(7)).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorResponseBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error.code, "INTERNAL_ERROR");
        assert_eq!(body.error.message, INTERNAL_ERROR_MESSAGE);
    }
}
