// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Personal access token handlers.

use axum::{extract::State, response::IntoResponse, Json};
use keygate_core::{ApplicationId, RoleId, UserId};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extractors::{UserQuery, ValidatedJson};
use crate::response::PatResponse;
use crate::state::AppState;

// =============================================================================
// Generate
// =============================================================================

/// PAT request body.
#[derive(Debug, Deserialize)]
pub struct GeneratePatRequest {
    /// Requesting user.
    #[serde(default)]
    pub user_id: String,
    /// Target application.
    #[serde(default)]
    pub application_id: String,
    /// Requested role.
    #[serde(default)]
    pub role_id: String,
}

/// POST /generate-pat
///
/// Issues a token for a granted `(user, application, role)` triple and
/// stores it on the grant. Without a grant the answer is 403 and nothing
/// is written.
pub async fn generate_pat(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<GeneratePatRequest>,
) -> ApiResult<impl IntoResponse> {
    let issued = state
        .service()
        .issue_token(
            &UserId::new(request.user_id.trim()),
            &ApplicationId::new(request.application_id.trim()),
            &RoleId::new(request.role_id.trim()),
        )
        .await?;

    Ok(Json(PatResponse {
        pat: issued.token,
        expires_at: issued.expires_at,
    }))
}

// =============================================================================
// List
// =============================================================================

/// GET /user/pats?user_id=
pub async fn user_pats(
    State(state): State<AppState>,
    UserQuery(user_id): UserQuery,
) -> ApiResult<impl IntoResponse> {
    let tokens = state.service().user_tokens(&user_id).await?;
    Ok(Json(tokens))
}

// =============================================================================
// Introspect
// =============================================================================

/// Introspection request body.
#[derive(Deserialize)]
pub struct IntrospectPatRequest {
    /// Presenting user.
    #[serde(default)]
    pub user_id: String,
    /// The token.
    #[serde(default)]
    pub pat: String,
}

impl std::fmt::Debug for IntrospectPatRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntrospectPatRequest")
            .field("user_id", &self.user_id)
            .field("pat", &"[REDACTED]")
            .finish()
    }
}

/// POST /introspect-pat
///
/// Decodes the token under the user's key. Every decoding failure is
/// reported as the same 400.
pub async fn introspect_pat(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<IntrospectPatRequest>,
) -> ApiResult<impl IntoResponse> {
    let introspection = state
        .service()
        .introspect_token(&UserId::new(request.user_id.trim()), request.pat.trim())
        .await?;

    Ok(Json(introspection))
}
