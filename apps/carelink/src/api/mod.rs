//! # CareLink HTTP API Module
//!
//! This module implements the HTTP server using axum.
//!
//! ## Endpoints
//!
//! - `POST /api` - Execute one typed query or mutation
//! - `GET /health` - Health check
//!
//! ## Security Configuration
//!
//! Read from [`ServerConfig`]:
//! - `cors_origins`: allowed origins, `["*"]` for all (default: localhost only)
//! - `rate_limit`: requests per second (default: 100, 0 to disable)
//!
//! Tokens are optional per request; see [`auth`] and the authority policy.

pub mod auth;
mod handlers;
mod middleware;
pub mod types;

pub use handlers::{ApiError, health_handler, operation_handler};
pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use types::{ApiRequest, ApiResponse, ErrorBody, HealthResponse, Operation};

use crate::config::{AppConfig, ServerConfig};
use crate::error::AppError;
use crate::gateway::PredictionGateway;
use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use carelink_core::{AuthService, EntityStore, MutationRules};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<EntityStore>>,
    pub auth: Arc<AuthService>,
    pub rules: Arc<MutationRules>,
    pub gateway: PredictionGateway,
}

impl AppState {
    #[must_use]
    pub fn new(
        store: EntityStore,
        auth: AuthService,
        rules: MutationRules,
        gateway: PredictionGateway,
    ) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            auth: Arc::new(auth),
            rules: Arc::new(rules),
            gateway,
        }
    }

    /// Open the store and build every service from `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let store = config.storage.open()?;
        let auth = config.auth.service()?;
        Ok(Self::new(
            store,
            auth,
            config.policy.mutation_rules(),
            PredictionGateway::from_config(&config.prediction),
        ))
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

fn allowed_headers() -> [HeaderName; 3] {
    [
        header::CONTENT_TYPE,
        header::AUTHORIZATION,
        HeaderName::from_static(auth::TOKEN_HEADER),
    ]
}

/// Build the CORS layer.
///
/// - `["*"]`: allows all origins (development only)
/// - empty: localhost only
/// - otherwise: exactly the listed origins
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins = &config.cors_origins;

    if origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS: Allowing ALL origins. This is insecure for production!");
        return CorsLayer::permissive();
    }
    if origins.is_empty() {
        tracing::info!("CORS: No origins configured, defaulting to localhost only");
        return build_localhost_cors();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(hv) => {
                tracing::info!("CORS: Allowing origin: {}", origin);
                Some(hv)
            }
            Err(e) => {
                tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
        build_localhost_cors()
    } else {
        CorsLayer::new()
            .allow_origin(allowed)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(allowed_headers())
    }
}

fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .map(HeaderValue::from_static)
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(allowed_headers())
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate limiting (if enabled)
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/api", post(handlers::operation_handler));

    match create_rate_limiter(config.rate_limit) {
        Some(limiter) => {
            tracing::info!("Rate limiting enabled: {} requests/second", config.rate_limit);
            router = router.layer(axum_middleware::from_fn_with_state(
                limiter,
                middleware::rate_limit_middleware,
            ));
        }
        None => tracing::info!("Rate limiting disabled"),
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(build_cors_layer(config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server and run until Ctrl+C.
pub async fn run_server(config: &AppConfig) -> Result<(), AppError> {
    let state = AppState::from_config(config)?;
    if !state.gateway.is_configured() {
        tracing::warn!("No prediction service configured; predictions use the fallback list");
    }
    let router = create_router(state, &config.server);

    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Io(format!("Bind failed: {e}")))?;

    tracing::info!("CareLink HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Io(format!("Server error: {e}")))
}

/// Resolves on Ctrl+C. In-flight requests finish before the store closes.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::warn!("Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
