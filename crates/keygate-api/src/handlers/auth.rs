// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Login handler.

use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extractors::ValidatedJson;
use crate::response::LoginResponse;
use crate::state::AppState;

/// Login request body.
#[derive(Deserialize)]
pub struct LoginRequest {
    /// Username.
    #[serde(default)]
    pub username: String,
    /// Plaintext password.
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// POST /login
///
/// Checks the password against the user's stored ciphertext. A wrong
/// password and an unknown username produce the same 401.
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state
        .service()
        .login(request.username.trim(), &request.password)
        .await?;

    Ok(Json(LoginResponse::from(outcome)))
}
