// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Custom extractors for API handlers.
//!
//! Both extractors reject with [`ApiError`] so malformed input gets the
//! standard error body instead of axum's plain-text rejection.

use axum::{
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use keygate_core::UserId;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ApiError;

// =============================================================================
// Validated JSON Extractor
// =============================================================================

/// JSON body extractor with [`ApiError`] rejections.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON: {}", e.body_text())))?;

        Ok(ValidatedJson(value))
    }
}

// =============================================================================
// User Query Extractor
// =============================================================================

#[derive(Debug, Deserialize)]
struct UserQueryParams {
    #[serde(default)]
    user_id: String,
}

/// Extracts a required, non-empty `?user_id=` parameter.
pub struct UserQuery(pub UserId);

impl<S> FromRequestParts<S> for UserQuery
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<UserQueryParams>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid query: {}", e.body_text())))?;

        let user_id = params.user_id.trim();
        if user_id.is_empty() {
            return Err(ApiError::bad_request("user_id is required"));
        }

        Ok(UserQuery(UserId::new(user_id)))
    }
}
