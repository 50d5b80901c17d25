//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! Reads take the shared read lock; inserts and bootstrap take the write
//! lock, so each operation sees and commits one consistent state.

use super::{
    AppState,
    types::{
        ApiError, BootstrapResponse, ExistsQuery, ExistsResponse, HealthResponse, InsertResponse,
        StatusResponse,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use registrar_core::{
    CanonicalRecord, CourseCatalogEntry, Digest, MetaIndexEntry, NewCatalogEntry,
    NewStudentProfile, NewTakenCourse, Relation, StudentProfile, StudentTranscript, Submission,
    TakenCourseResult,
};
use serde::de::DeserializeOwned;

type ApiResult<T> = Result<Json<T>, ApiError>;

// =============================================================================
// HEALTH / STATUS
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// Store counters and active configuration.
pub async fn status_handler(State(state): State<AppState>) -> ApiResult<StatusResponse> {
    let registrar = state.registrar.read().await;
    let stats = registrar.stats()?;
    let config = registrar.config();
    Ok(Json(StatusResponse::new(
        registrar.state().is_persistent(),
        stats,
        config.duplicate_policy,
        config.join_mode,
    )))
}

// =============================================================================
// BOOTSTRAP
// =============================================================================

/// Load the demonstration dataset.
pub async fn bootstrap_handler(State(state): State<AppState>) -> ApiResult<BootstrapResponse> {
    let mut registrar = state.registrar.write().await;
    let report = registrar.bootstrap()?;
    tracing::info!(
        inserted = report.inserted,
        skipped = report.skipped,
        "bootstrap complete"
    );
    Ok(Json(report.into()))
}

// =============================================================================
// EXISTS
// =============================================================================

/// Check whether an (institution, student, digest) triple is indexed.
pub async fn exists_handler(
    State(state): State<AppState>,
    Query(query): Query<ExistsQuery>,
) -> ApiResult<ExistsResponse> {
    let digest = Digest::parse(&query.digest)?;
    let registrar = state.registrar.read().await;
    let exists = registrar.record_exists(&query.institution, &query.student_id, &digest)?;
    Ok(Json(ExistsResponse { exists }))
}

// =============================================================================
// INSERTS
// =============================================================================

/// Insert a student profile.
pub async fn insert_profile_handler(
    State(state): State<AppState>,
    Json(request): Json<NewStudentProfile>,
) -> Result<impl IntoResponse, ApiError> {
    insert_record(&state, &request).await
}

/// Insert a taken-course result.
pub async fn insert_taken_handler(
    State(state): State<AppState>,
    Json(request): Json<NewTakenCourse>,
) -> Result<impl IntoResponse, ApiError> {
    insert_record(&state, &request).await
}

/// Insert a catalog entry.
pub async fn insert_catalog_handler(
    State(state): State<AppState>,
    Json(request): Json<NewCatalogEntry>,
) -> Result<impl IntoResponse, ApiError> {
    insert_record(&state, &request).await
}

/// 201 when written, 200 for an idempotent duplicate.
async fn insert_record<N: Submission>(
    state: &AppState,
    submission: &N,
) -> Result<(StatusCode, Json<InsertResponse>), ApiError> {
    let relation = <N::Record as CanonicalRecord>::RELATION;
    let mut registrar = state.registrar.write().await;

    let outcome = match registrar.insert(submission) {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(
                relation = %relation,
                institution = submission.institution(),
                student_id = submission.student_id(),
                error = %e,
                "insert rejected"
            );
            return Err(e.into());
        }
    };

    let status = if outcome.was_written() {
        tracing::info!(
            relation = %relation,
            institution = submission.institution(),
            student_id = submission.student_id(),
            digest = %outcome.digest(),
            "record inserted"
        );
        StatusCode::CREATED
    } else {
        tracing::info!(
            relation = %relation,
            digest = %outcome.digest(),
            "duplicate insert ignored"
        );
        StatusCode::OK
    };

    Ok((status, Json(InsertResponse::from(&outcome))))
}

// =============================================================================
// STUDENT QUERIES
// =============================================================================

pub async fn student_profile_handler(
    State(state): State<AppState>,
    Path((institution, student_id)): Path<(String, String)>,
) -> ApiResult<StudentProfile> {
    let registrar = state.registrar.read().await;
    Ok(Json(registrar.student_profile(&institution, &student_id)?))
}

pub async fn student_catalog_handler(
    State(state): State<AppState>,
    Path((institution, student_id)): Path<(String, String)>,
) -> ApiResult<Vec<CourseCatalogEntry>> {
    let registrar = state.registrar.read().await;
    Ok(Json(registrar.student_catalog(&institution, &student_id)?))
}

pub async fn student_taken_handler(
    State(state): State<AppState>,
    Path((institution, student_id)): Path<(String, String)>,
) -> ApiResult<Vec<TakenCourseResult>> {
    let registrar = state.registrar.read().await;
    Ok(Json(
        registrar.student_taken_courses(&institution, &student_id)?,
    ))
}

/// Assemble a transcript; omitted courses are logged, not returned.
pub async fn transcript_handler(
    State(state): State<AppState>,
    Path((institution, student_id)): Path<(String, String)>,
) -> ApiResult<StudentTranscript> {
    let registrar = state.registrar.read().await;
    let report = registrar.transcript_report(&institution, &student_id)?;
    if !report.omitted.is_empty() {
        tracing::info!(
            institution = %institution,
            student_id = %student_id,
            omitted = ?report.omitted,
            "taken courses without catalog entry left out of transcript"
        );
    }
    Ok(Json(report.transcript))
}

// =============================================================================
// INSTITUTION QUERIES
// =============================================================================

pub async fn institution_profiles_handler(
    State(state): State<AppState>,
    Path(institution): Path<String>,
) -> ApiResult<Vec<StudentProfile>> {
    let registrar = state.registrar.read().await;
    Ok(Json(registrar.institution_profiles(&institution)?))
}

pub async fn institution_catalog_handler(
    State(state): State<AppState>,
    Path(institution): Path<String>,
) -> ApiResult<Vec<CourseCatalogEntry>> {
    let registrar = state.registrar.read().await;
    Ok(Json(registrar.institution_catalog(&institution)?))
}

pub async fn institution_taken_handler(
    State(state): State<AppState>,
    Path(institution): Path<String>,
) -> ApiResult<Vec<TakenCourseResult>> {
    let registrar = state.registrar.read().await;
    Ok(Json(registrar.institution_taken_courses(&institution)?))
}

// =============================================================================
// DIGEST LOOKUPS
// =============================================================================

/// Digests of one relation indexed for a student, in key order.
pub async fn student_digests_handler(
    State(state): State<AppState>,
    Path((institution, student_id, relation)): Path<(String, String, String)>,
) -> ApiResult<Vec<Digest>> {
    let relation = Relation::parse(&relation)?;
    let registrar = state.registrar.read().await;
    Ok(Json(registrar.student_digests(
        &institution,
        &student_id,
        relation,
    )?))
}

pub async fn profile_by_digest_handler(
    State(state): State<AppState>,
    Path(digest): Path<String>,
) -> ApiResult<StudentProfile> {
    record_by_digest(&state, &digest).await
}

pub async fn taken_by_digest_handler(
    State(state): State<AppState>,
    Path(digest): Path<String>,
) -> ApiResult<TakenCourseResult> {
    record_by_digest(&state, &digest).await
}

pub async fn catalog_by_digest_handler(
    State(state): State<AppState>,
    Path(digest): Path<String>,
) -> ApiResult<CourseCatalogEntry> {
    record_by_digest(&state, &digest).await
}

async fn record_by_digest<T>(state: &AppState, digest: &str) -> ApiResult<T>
where
    T: CanonicalRecord + DeserializeOwned,
{
    let digest = Digest::parse(digest)?;
    let registrar = state.registrar.read().await;
    Ok(Json(registrar.record_by_digest(&digest)?))
}

/// An institution's meta entries of one relation.
pub async fn institution_meta_handler(
    State(state): State<AppState>,
    Path((institution, relation)): Path<(String, String)>,
) -> ApiResult<Vec<MetaIndexEntry>> {
    let relation = Relation::parse(&relation)?;
    let registrar = state.registrar.read().await;
    Ok(Json(registrar.institution_meta(&institution, relation)?))
}
