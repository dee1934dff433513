// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Instant;

use keygate_core::AccessService;

use crate::config::ServerConfig;
use crate::error::{ApiError, ApiResult};

// =============================================================================
// AppState
// =============================================================================

/// State handed to every handler through axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// The access-control service.
    pub service: Arc<AccessService>,
    started_at: Instant,
}

impl AppState {
    /// Creates state from a service and configuration.
    pub fn new(service: Arc<AccessService>, config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
            service,
            started_at: Instant::now(),
        }
    }

    /// Creates a new app state builder.
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }

    /// Returns the access service.
    pub fn service(&self) -> &AccessService {
        &self.service
    }

    /// Seconds since the state was created.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

// =============================================================================
// AppStateBuilder
// =============================================================================

/// Builder for [`AppState`].
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<ServerConfig>,
    service: Option<Arc<AccessService>>,
}

impl AppStateBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the access service.
    pub fn service(mut self, service: Arc<AccessService>) -> Self {
        self.service = Some(service);
        self
    }

    /// Builds the state. The service is required.
    pub fn build(self) -> ApiResult<AppState> {
        let service = self
            .service
            .ok_or_else(|| ApiError::internal("access service not configured"))?;
        Ok(AppState::new(service, self.config.unwrap_or_default()))
    }
}
