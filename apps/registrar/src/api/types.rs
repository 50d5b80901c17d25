//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API and the mapping
//! from core error kinds to HTTP status codes.
//!
//! Record bodies reuse the core types directly (`NewStudentProfile`,
//! `StudentTranscript`, ...), so the wire layout is the stored layout.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use registrar_core::{
    DigestAlgorithm, DuplicatePolicy, ErrorKind, InsertOutcome, JoinMode, RegistrarError,
    SeedReport, StoreStats,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Store status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub persistent: bool,
    pub records: usize,
    pub meta_entries: usize,
    pub digest_algorithm: DigestAlgorithm,
    pub duplicate_policy: DuplicatePolicy,
    pub join_mode: JoinMode,
}

impl StatusResponse {
    pub fn new(
        persistent: bool,
        stats: StoreStats,
        duplicate_policy: DuplicatePolicy,
        join_mode: JoinMode,
    ) -> Self {
        Self {
            persistent,
            records: stats.records,
            meta_entries: stats.meta_entries,
            digest_algorithm: stats.digest_algorithm,
            duplicate_policy,
            join_mode,
        }
    }
}

// =============================================================================
// BOOTSTRAP RESPONSE
// =============================================================================

/// Bootstrap response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapResponse {
    pub inserted: usize,
    pub skipped: usize,
}

impl From<SeedReport> for BootstrapResponse {
    fn from(report: SeedReport) -> Self {
        Self {
            inserted: report.inserted,
            skipped: report.skipped,
        }
    }
}

// =============================================================================
// EXISTS QUERY/RESPONSE
// =============================================================================

/// Query string of `GET /records/exists`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistsQuery {
    pub institution: String,
    pub student_id: String,
    pub digest: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistsResponse {
    pub exists: bool,
}

// =============================================================================
// INSERT RESPONSE
// =============================================================================

/// Insert response. `inserted` is false for an idempotent duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertResponse {
    pub inserted: bool,
    pub digest: String,
}

impl From<&InsertOutcome> for InsertResponse {
    fn from(outcome: &InsertOutcome) -> Self {
        Self {
            inserted: outcome.was_written(),
            digest: outcome.digest().to_string(),
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub error: String,
}

/// HTTP status for an error kind.
#[must_use]
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::JoinIncomplete => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Configuration | ErrorKind::SerializationError => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        ErrorKind::BackendUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// A core error on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub RegistrarError);

impl From<RegistrarError> for ApiError {
    fn from(err: RegistrarError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        // Storage details stay in the log
        let error = match kind {
            ErrorKind::BackendUnavailable => {
                tracing::error!(error = %self.0, "backend failure");
                "storage backend unavailable".to_string()
            }
            ErrorKind::SerializationError => {
                tracing::error!(error = %self.0, "stored payload could not be decoded");
                "stored record could not be decoded".to_string()
            }
            _ => self.0.to_string(),
        };
        (status_for(kind), Json(ErrorResponse { kind, error })).into_response()
    }
}

// =============================================================================
// TESTS
// =============================================================================
