//! # Registrar HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET  /health` - Health check
//! - `GET  /status` - Store counters and active configuration
//! - `POST /bootstrap` - Load the demonstration dataset
//! - `GET  /records/exists?institution=&student_id=&digest=` - Triple lookup
//! - `POST /records/profiles` - Insert a student profile
//! - `POST /records/taken-courses` - Insert a taken-course result
//! - `POST /records/catalog` - Insert a catalog entry
//! - `GET  /records/profiles/{digest}` (also `taken-courses`, `catalog`) - Fetch by digest
//! - `GET  /institutions/{institution}/students/{student_id}/profile`
//! - `GET  /institutions/{institution}/students/{student_id}/catalog`
//! - `GET  /institutions/{institution}/students/{student_id}/taken-courses`
//! - `GET  /institutions/{institution}/students/{student_id}/transcript`
//! - `GET  /institutions/{institution}/students/{student_id}/digests/{relation}`
//! - `GET  /institutions/{institution}/meta/{relation}`
//! - `GET  /institutions/{institution}/profiles`
//! - `GET  /institutions/{institution}/catalog`
//! - `GET  /institutions/{institution}/taken-courses`
//!
//! Errors come back as `{"kind": ..., "error": ...}` with a status derived
//! from the error kind.

mod handlers;
mod middleware;
mod types;

pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use types::{
    ApiError, BootstrapResponse, ErrorResponse, ExistsQuery, ExistsResponse, HealthResponse,
    InsertResponse, StatusResponse, status_for,
};

use crate::config::ServerConfig;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use registrar_core::{Registrar, RegistrarError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Request body limit (2 MiB).
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the registrar.
#[derive(Clone)]
pub struct AppState {
    pub registrar: Arc<RwLock<Registrar>>,
}

impl AppState {
    #[must_use]
    pub fn new(registrar: Registrar) -> Self {
        Self {
            registrar: Arc::new(RwLock::new(registrar)),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer from `[server] cors_origins`.
///
/// - `["*"]`: allows all origins
/// - empty: localhost only
/// - otherwise: the listed origins; unparsable entries are skipped
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS: Allowing ALL origins. This is insecure for production!");
        return CorsLayer::permissive();
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
        tracing::info!("CORS: defaulting to localhost only");
        return build_localhost_cors();
    }

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
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
/// 4. Rate Limiting (if enabled)
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let cors = build_cors_layer(&config.cors_origins);

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/bootstrap", post(handlers::bootstrap_handler))
        .route("/records/exists", get(handlers::exists_handler))
        .route("/records/profiles", post(handlers::insert_profile_handler))
        .route("/records/taken-courses", post(handlers::insert_taken_handler))
        .route("/records/catalog", post(handlers::insert_catalog_handler))
        .route(
            "/records/profiles/{digest}",
            get(handlers::profile_by_digest_handler),
        )
        .route(
            "/records/taken-courses/{digest}",
            get(handlers::taken_by_digest_handler),
        )
        .route(
            "/records/catalog/{digest}",
            get(handlers::catalog_by_digest_handler),
        )
        .route(
            "/institutions/{institution}/students/{student_id}/profile",
            get(handlers::student_profile_handler),
        )
        .route(
            "/institutions/{institution}/students/{student_id}/catalog",
            get(handlers::student_catalog_handler),
        )
        .route(
            "/institutions/{institution}/students/{student_id}/taken-courses",
            get(handlers::student_taken_handler),
        )
        .route(
            "/institutions/{institution}/students/{student_id}/transcript",
            get(handlers::transcript_handler),
        )
        .route(
            "/institutions/{institution}/students/{student_id}/digests/{relation}",
            get(handlers::student_digests_handler),
        )
        .route(
            "/institutions/{institution}/meta/{relation}",
            get(handlers::institution_meta_handler),
        )
        .route(
            "/institutions/{institution}/profiles",
            get(handlers::institution_profiles_handler),
        )
        .route(
            "/institutions/{institution}/catalog",
            get(handlers::institution_catalog_handler),
        )
        .route(
            "/institutions/{institution}/taken-courses",
            get(handlers::institution_taken_handler),
        );

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
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server and serve until Ctrl+C.
pub async fn run_server(config: &ServerConfig, registrar: Registrar) -> Result<(), RegistrarError> {
    let router = create_router(AppState::new(registrar), config);
    let addr = config.bind_addr();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RegistrarError::BackendUnavailable(format!("Bind failed: {}", e)))?;

    tracing::info!("Registrar HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| RegistrarError::BackendUnavailable(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

// =============================================================================
// TESTS
// =============================================================================
