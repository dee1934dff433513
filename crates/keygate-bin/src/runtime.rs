// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Service runtime orchestration.
//!
//! Startup order:
//!
//! 1. Load and validate configuration
//! 2. Seed the in-memory store and add static key records
//! 3. Build the key resolver and access service
//! 4. Serve the HTTP API until a shutdown signal arrives

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use keygate_api::{ApiServer, AppState, CorsSettings, ServerConfig};
use keygate_config::{ApiConfig, ConfigLoader, KeygateConfig};
use keygate_core::crypto::KeyResolver;
use keygate_core::store::{InMemoryAccessStore, SeedData};
use keygate_core::AccessService;

use crate::error::{BinError, BinResult};
use crate::shutdown::ShutdownCoordinator;

// =============================================================================
// ServiceRuntime
// =============================================================================

/// Owns the loaded configuration and drives the service lifecycle.
pub struct ServiceRuntime {
    config: Arc<KeygateConfig>,
    shutdown: ShutdownCoordinator,
}

impl ServiceRuntime {
    /// Creates a runtime over an already validated configuration.
    pub fn new(config: KeygateConfig) -> Self {
        Self {
            config: Arc::new(config),
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &KeygateConfig {
        &self.config
    }

    /// Returns the shutdown coordinator.
    pub fn shutdown_coordinator(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Builds the in-memory store from the seed file and static key records.
    pub fn build_store(&self) -> BinResult<Arc<InMemoryAccessStore>> {
        let store = match &self.config.store.seed_file {
            Some(path) => {
                let seed = SeedData::from_path(path)
                    .map_err(|e| BinError::from(e).with_context("Failed to read seed data"))?;
                InMemoryAccessStore::from_seed(seed)?
            }
            None => {
                warn!("No seed file configured, starting with an empty store");
                InMemoryAccessStore::new()
            }
        };

        let records = self.config.keys.key_records()?;
        let count = records.len();
        for record in records {
            store.insert_key_record(record)?;
        }
        if count > 0 {
            info!(count, "Static key records loaded");
        }

        Ok(Arc::new(store))
    }

    /// Builds the access service over a fresh store.
    pub fn build_service(&self) -> BinResult<AccessService> {
        let store = self.build_store()?;
        let resolver = KeyResolver::new(
            self.config.keys.resolver_config()?,
            store.clone(),
            store.clone(),
        );
        let options = self.config.tokens.token_options()?;

        Ok(AccessService::new(store, resolver).with_options(options))
    }

    /// Returns the API server configuration.
    pub fn server_config(&self) -> ServerConfig {
        server_config(&self.config.api, &self.config.service.name)
    }

    /// Runs the service until a shutdown signal is received.
    pub async fn run(self) -> BinResult<()> {
        if !self.config.api.enabled {
            return Err(BinError::config(
                "api.enabled is false; the service has nothing to run",
            ));
        }

        info!(
            service = %self.config.service.name,
            version = keygate_core::VERSION,
            key_source = %self.config.keys.source,
            "Starting keygate"
        );

        let service = Arc::new(self.build_service()?);
        let state = AppState::builder()
            .config(self.server_config())
            .service(service)
            .build()?;

        let signals = self.shutdown.clone();
        tokio::spawn(async move {
            signals.listen_for_signals().await;
        });

        ApiServer::new(state)
            .run_with_shutdown(self.shutdown.shutdown_signal())
            .await?;

        info!("keygate shutdown complete");
        Ok(())
    }
}

/// Converts the `api` config section into the server's runtime settings.
pub fn server_config(api: &ApiConfig, service_name: &str) -> ServerConfig {
    let cors = CorsSettings {
        allowed_origins: api.cors.allowed_origins.clone(),
        allowed_methods: api.cors.allowed_methods.clone(),
        allowed_headers: api.cors.allowed_headers.clone(),
        allow_credentials: api.cors.allow_credentials,
        max_age: std::time::Duration::from_secs(api.cors.max_age_secs),
    };

    ServerConfig::new()
        .with_host(api.bind_address)
        .with_port(api.port)
        .with_cors(cors)
        .with_request_timeout(api.request_timeout())
        .with_max_body_size(api.max_body_size)
        .with_service_name(service_name)
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for [`ServiceRuntime`].
#[derive(Debug, Default)]
pub struct RuntimeBuilder {
    config_path: Option<PathBuf>,
    config: Option<KeygateConfig>,
    port: Option<u16>,
    seed_file: Option<PathBuf>,
}

impl RuntimeBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from this file.
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Uses an already loaded configuration.
    pub fn config(mut self, config: KeygateConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides the API port.
    pub fn port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    /// Overrides the seed file.
    pub fn seed_file(mut self, path: Option<PathBuf>) -> Self {
        self.seed_file = path;
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> BinResult<ServiceRuntime> {
        let mut config = match (self.config, self.config_path) {
            (Some(config), _) => config,
            (None, Some(path)) => ConfigLoader::new().load(&path).map_err(|e| {
                BinError::from(e).with_context(format!("Failed to load {}", path.display()))
            })?,
            (None, None) => {
                return Err(BinError::config(
                    "Either a config path or a config must be provided",
                ))
            }
        };

        if let Some(port) = self.port {
            config.api.port = port;
        }
        if let Some(seed) = self.seed_file {
            config.store.seed_file = Some(seed);
        }

        Ok(ServiceRuntime::new(config))
    }
}
