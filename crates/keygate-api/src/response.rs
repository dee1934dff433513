// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Response bodies.

use chrono::{DateTime, Utc};
use keygate_core::{LoginOutcome, UserId};
use serde::{Deserialize, Serialize};

/// Body of a successful `POST /login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Status line.
    pub message: String,
    /// Authenticated user.
    pub user_id: UserId,
    /// Display name.
    pub user_name: String,
}

impl From<LoginOutcome> for LoginResponse {
    fn from(outcome: LoginOutcome) -> Self {
        Self {
            message: "Login successful".to_string(),
            user_id: outcome.user_id,
            user_name: outcome.user_name,
        }
    }
}

/// Body of a successful `POST /generate-pat`.
#[derive(Clone, Serialize, Deserialize)]
pub struct PatResponse {
    /// The encoded token.
    pub pat: String,
    /// Grant expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for PatResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatResponse")
            .field("pat", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"healthy"` when the process answers.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Configured instance name.
    pub service: String,
    /// Seconds since the server started.
    pub uptime_seconds: u64,
}

impl HealthResponse {
    /// Creates a healthy response.
    pub fn healthy(service: impl Into<String>, uptime_seconds: u64) -> Self {
        Self {
            status: "healthy".to_string(),
            version: crate::VERSION.to_string(),
            service: service.into(),
            uptime_seconds,
        }
    }
}
