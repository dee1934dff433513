// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API server implementation.

use std::net::SocketAddr;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request, StatusCode},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::config::CorsSettings;
use crate::error::{ApiError, ApiResult};
use crate::handlers;
use crate::state::AppState;

// =============================================================================
// ApiServer
// =============================================================================

/// The HTTP server.
pub struct ApiServer {
    state: AppState,
}

impl ApiServer {
    /// Creates a server over the given state.
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Builds the router with all routes and middleware.
    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Returns the address the server binds to.
    pub fn addr(&self) -> SocketAddr {
        self.state.config.socket_addr()
    }

    /// Runs until `shutdown_signal` resolves, then drains in-flight requests.
    pub async fn run_with_shutdown(
        self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> ApiResult<()> {
        let addr = self.addr();
        let router = self.router();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to bind {}: {}", addr, e)))?;

        info!("API server listening on {}", addr);

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| ApiError::internal(format!("Server error: {}", e)))?;

        info!("API server shutdown complete");
        Ok(())
    }
}

/// Builds the application router.
///
/// Exposed separately so tests can drive it with `oneshot`.
pub fn router(state: AppState) -> Router {
    let config = state.config.clone();

    let middleware = ServiceBuilder::new()
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                info_span!(
                    "http_request",
                    request_id = %Uuid::new_v4(),
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .map_response(|response: axum::response::Response<_>| response.map(Body::new))
        .layer(RequestBodyLimitLayer::new(config.max_body_size))
        .layer(create_cors_layer(&config.cors));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/login", post(handlers::login))
        .route("/user/components", get(handlers::user_components))
        .route("/generate-pat", post(handlers::generate_pat))
        .route("/user/pats", get(handlers::user_pats))
        .route("/introspect-pat", post(handlers::introspect_pat))
        .fallback(|| async { ApiError::not_found("route") })
        .layer(middleware)
        .with_state(state)
}

// =============================================================================
// Helper Functions
// =============================================================================

fn create_cors_layer(cors: &CorsSettings) -> CorsLayer {
    let mut layer = CorsLayer::new().max_age(cors.max_age);

    if cors.allows_any_origin() {
        layer = layer.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = cors
            .allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        layer = layer.allow_origin(AllowOrigin::list(origins));
    }

    let methods: Vec<Method> = cors
        .allowed_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();
    layer = layer.allow_methods(methods);

    if cors.allowed_headers.iter().any(|h| h == "*") {
        layer = layer.allow_headers(AllowHeaders::any());
    } else {
        let headers: Vec<HeaderName> = cors
            .allowed_headers
            .iter()
            .filter_map(|h| h.parse().ok())
            .collect();
        layer = layer.allow_headers(headers);
    }

    if cors.allow_credentials {
        layer = layer.allow_credentials(true);
    }

    layer
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::ServerConfig;
    use http_body_util::BodyExt;
    use keygate_core::crypto::{KeyResolver, KeyResolverConfig, KeySourceMode};
    use keygate_core::store::InMemoryAccessStore;
    use keygate_core::AccessService;
    use tower::ServiceExt;

    fn empty_state() -> AppState {
        let store = Arc::new(InMemoryAccessStore::new());
        let resolver = KeyResolver::new(
            KeyResolverConfig::new(KeySourceMode::Referenced),
            store.clone(),
            store.clone(),
        );
        let service = Arc::new(AccessService::new(store, resolver));
        AppState::builder()
            .service(service)
            .config(ServerConfig::default().with_service_name("keygate-test"))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(empty_state())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "keygate-test");
    }

    #[tokio::test]
    async fn test_unknown_route_uses_error_body() {
        let response = router(empty_state())
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_missing_user_query_is_bad_request() {
        let response = router(empty_state())
            .oneshot(Request::get("/user/pats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let request = Request::post("/login")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = router(empty_state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_state_requires_service() {
        assert!(AppState::builder().build().is_err());
    }

    #[test]
    fn test_cors_layer_builds() {
        let mut cors = CorsSettings::default();
        let _ = create_cors_layer(&cors);
        cors.allowed_origins = vec!["https://portal.example.com".to_string(), "bad\norigin".to_string()];
        cors.allowed_headers = vec!["*".to_string()];
        let _ = create_cors_layer(&cors);
    }
}
