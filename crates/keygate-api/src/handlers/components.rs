// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Component listing handler.

use axum::{extract::State, response::IntoResponse, Json};

use crate::error::ApiResult;
use crate::extractors::UserQuery;
use crate::state::AppState;

/// GET /user/components?user_id=
pub async fn user_components(
    State(state): State<AppState>,
    UserQuery(user_id): UserQuery,
) -> ApiResult<impl IntoResponse> {
    let components = state.service().user_components(&user_id).await?;
    Ok(Json(components))
}
