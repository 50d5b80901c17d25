//! Integration tests for the Registrar HTTP API.
//!
//! Uses axum-test to drive the router without binding a socket.

#![allow(clippy::unwrap_used, clippy::panic, clippy::float_arithmetic)]

use axum_test::TestServer;
use registrar::api::{
    AppState, BootstrapResponse, ErrorResponse, ExistsResponse, HealthResponse, InsertResponse,
    StatusResponse, create_router,
};
use registrar::config::ServerConfig;
use registrar_core::{
    DigestAlgorithm, DuplicatePolicy, ErrorKind, JoinMode, Registrar, RegistrarConfig,
};
use serde_json::{Value, json};

const STUDENT_PATH: &str = "/institutions/Fenerbahce%20University/students/190908809";

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn server_with(config: RegistrarConfig) -> TestServer {
    let registrar = Registrar::in_memory(config).unwrap();
    let server_config = ServerConfig {
        rate_limit: 0,
        ..ServerConfig::default()
    };
    TestServer::new(create_router(AppState::new(registrar), &server_config)).unwrap()
}

fn test_server() -> TestServer {
    server_with(RegistrarConfig::default())
}

async fn bootstrapped_server(config: RegistrarConfig) -> TestServer {
    let server = server_with(config);
    server.post("/bootstrap").await.assert_status_ok();
    server
}

fn comp2004_taken() -> Value {
    json!({
        "institution": "Fenerbahce University",
        "student_id": 190908809,
        "course_code": "COMP2004",
        "grade": "BB",
        "point": 18.0,
        "taken_semester": 2
    })
}

fn comp2004_catalog() -> Value {
    json!({
        "institution": "Fenerbahce University",
        "student_id": 190908809,
        "course_code": "COMP2004",
        "course_name": "Database Management Systems",
        "course_type": "C",
        "ects": 6,
        "credit": 3
    })
}

// =============================================================================
// HEALTH / STATUS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let server = test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_status_empty_store() {
    let server = test_server();

    let response = server.get("/status").await;

    response.assert_status_ok();
    let status: StatusResponse = response.json();
    assert!(!status.persistent);
    assert_eq!(status.records, 0);
    assert_eq!(status.meta_entries, 0);
    assert_eq!(status.digest_algorithm, DigestAlgorithm::Blake3);
    assert_eq!(status.duplicate_policy, DuplicatePolicy::Reject);
    assert_eq!(status.join_mode, JoinMode::Lenient);
}

// =============================================================================
// BOOTSTRAP
// =============================================================================

#[tokio::test]
async fn test_bootstrap_then_rebootstrap() {
    let server = test_server();

    let first: BootstrapResponse = server.post("/bootstrap").await.json();
    assert_eq!(first.inserted, 17);
    assert_eq!(first.skipped, 0);

    let second: BootstrapResponse = server.post("/bootstrap").await.json();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.skipped, 17);

    let status: StatusResponse = server.get("/status").await.json();
    assert_eq!(status.records, 17);
    assert_eq!(status.meta_entries, 17);
}

// =============================================================================
// INSERTS
// =============================================================================

#[tokio::test]
async fn test_insert_created_then_conflict() {
    let server = test_server();

    let response = server.post("/records/taken-courses").json(&comp2004_taken()).await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let inserted: InsertResponse = response.json();
    assert!(inserted.inserted);
    assert_eq!(inserted.digest.len(), 32);

    let response = server.post("/records/taken-courses").json(&comp2004_taken()).await;
    response.assert_status(axum::http::StatusCode::CONFLICT);
    let error: ErrorResponse = response.json();
    assert_eq!(error.kind, ErrorKind::AlreadyExists);
}

#[tokio::test]
async fn test_idempotent_duplicate_is_ok() {
    let server = server_with(RegistrarConfig {
        duplicate_policy: DuplicatePolicy::Idempotent,
        ..RegistrarConfig::default()
    });

    let first: InsertResponse = server
        .post("/records/catalog")
        .json(&comp2004_catalog())
        .await
        .json();

    let response = server.post("/records/catalog").json(&comp2004_catalog()).await;
    response.assert_status_ok();
    let second: InsertResponse = response.json();
    assert!(!second.inserted);
    assert_eq!(second.digest, first.digest);
}

#[tokio::test]
async fn test_invalid_submission_is_bad_request() {
    let server = test_server();
    let mut body = comp2004_taken();
    body["institution"] = json!("");

    let response = server.post("/records/taken-courses").json(&body).await;

    response.assert_status_bad_request();
    let error: ErrorResponse = response.json();
    assert_eq!(error.kind, ErrorKind::InvalidInput);
}

// =============================================================================
// EXISTS
// =============================================================================

#[tokio::test]
async fn test_exists_after_insert() {
    let server = test_server();
    let inserted: InsertResponse = server
        .post("/records/taken-courses")
        .json(&comp2004_taken())
        .await
        .json();

    let response = server
        .get("/records/exists")
        .add_query_param("institution", "Fenerbahce University")
        .add_query_param("student_id", "190908809")
        .add_query_param("digest", &inserted.digest)
        .await;
    response.assert_status_ok();
    let found: ExistsResponse = response.json();
    assert!(found.exists);

    let other: ExistsResponse = server
        .get("/records/exists")
        .add_query_param("institution", "Other University")
        .add_query_param("student_id", "190908809")
        .add_query_param("digest", &inserted.digest)
        .await
        .json();
    assert!(!other.exists);
}

#[tokio::test]
async fn test_exists_rejects_malformed_digest() {
    let server = test_server();

    let response = server
        .get("/records/exists")
        .add_query_param("institution", "Fenerbahce University")
        .add_query_param("student_id", "190908809")
        .add_query_param("digest", "not-hex")
        .await;

    response.assert_status_bad_request();
}

// =============================================================================
// STUDENT QUERIES
// =============================================================================

#[tokio::test]
async fn test_profile_after_bootstrap() {
    let server = bootstrapped_server(RegistrarConfig::default()).await;

    let response = server.get(&format!("{}/profile", STUDENT_PATH)).await;

    response.assert_status_ok();
    let profile: Value = response.json();
    assert_eq!(profile["student_name"], "Osman");
    assert_eq!(profile["student_surname"], "Selvi");
    assert_eq!(profile["student_id"], 190908809);
    assert_eq!(profile["class"], 1);
}

#[tokio::test]
async fn test_taken_and_catalog_after_bootstrap() {
    let server = bootstrapped_server(RegistrarConfig::default()).await;

    let taken: Vec<Value> = server
        .get(&format!("{}/taken-courses", STUDENT_PATH))
        .await
        .json();
    assert_eq!(taken.len(), 8);

    let catalog: Vec<Value> = server.get(&format!("{}/catalog", STUDENT_PATH)).await.json();
    assert_eq!(catalog.len(), 8);
}

#[tokio::test]
async fn test_unknown_student_is_not_found() {
    let server = bootstrapped_server(RegistrarConfig::default()).await;

    let response = server
        .get("/institutions/Fenerbahce%20University/students/1/profile")
        .await;

    response.assert_status_not_found();
    let error: ErrorResponse = response.json();
    assert_eq!(error.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_transcript_lenient_omits_uncatalogued_course() {
    let server = bootstrapped_server(RegistrarConfig::default()).await;
    server
        .post("/records/taken-courses")
        .json(&comp2004_taken())
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    let response = server.get(&format!("{}/transcript", STUDENT_PATH)).await;

    response.assert_status_ok();
    let transcript: Value = response.json();
    let courses = transcript["taken_courses"].as_array().unwrap();
    assert_eq!(courses.len(), 8);
    assert!(courses.iter().all(|c| c["course_code"] != "COMP2004"));
    assert_eq!(transcript["student_informations"]["student_name"], "Osman");
}

#[tokio::test]
async fn test_transcript_strict_rejects_incomplete_join() {
    let server = bootstrapped_server(RegistrarConfig {
        join_mode: JoinMode::Strict,
        ..RegistrarConfig::default()
    })
    .await;
    server
        .post("/records/taken-courses")
        .json(&comp2004_taken())
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    let response = server.get(&format!("{}/transcript", STUDENT_PATH)).await;
    response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    let error: ErrorResponse = response.json();
    assert_eq!(error.kind, ErrorKind::JoinIncomplete);

    server
        .post("/records/catalog")
        .json(&comp2004_catalog())
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    let transcript: Value = server
        .get(&format!("{}/transcript", STUDENT_PATH))
        .await
        .json();
    assert_eq!(transcript["taken_courses"].as_array().unwrap().len(), 9);
}

// =============================================================================
// INSTITUTION QUERIES
// =============================================================================

#[tokio::test]
async fn test_institution_listings() {
    let server = bootstrapped_server(RegistrarConfig::default()).await;

    let profiles: Vec<Value> = server
        .get("/institutions/Fenerbahce%20University/profiles")
        .await
        .json();
    assert_eq!(profiles.len(), 1);

    let taken: Vec<Value> = server
        .get("/institutions/Fenerbahce%20University/taken-courses")
        .await
        .json();
    assert_eq!(taken.len(), 8);

    server
        .get("/institutions/Nowhere/catalog")
        .await
        .assert_status_not_found();
}

// =============================================================================
// DIGEST LOOKUPS
// =============================================================================

#[tokio::test]
async fn test_student_digests_resolve_by_digest() {
    let server = bootstrapped_server(RegistrarConfig::default()).await;

    let response = server.get(&format!("{}/digests/taken", STUDENT_PATH)).await;
    response.assert_status_ok();
    let digests: Vec<String> = response.json();
    assert_eq!(digests.len(), 8);

    for digest in &digests {
        let course: Value = server
            .get(&format!("/records/taken-courses/{}", digest))
            .await
            .json();
        assert_eq!(course["hash_value"], digest.as_str());
        assert_eq!(course["student_id"], 190908809);
    }

    let profiles: Vec<String> = server
        .get(&format!("{}/digests/StudentProfile", STUDENT_PATH))
        .await
        .json();
    let profile: Value = server
        .get(&format!("/records/profiles/{}", profiles[0]))
        .await
        .json();
    assert_eq!(profile["student_name"], "Osman");
}

#[tokio::test]
async fn test_record_by_digest_errors() {
    let server = bootstrapped_server(RegistrarConfig::default()).await;
    let catalog: Vec<String> = server
        .get(&format!("{}/digests/catalog", STUDENT_PATH))
        .await
        .json();

    server
        .get(&format!("/records/catalog/{}", catalog[0]))
        .await
        .assert_status_ok();

    let response = server
        .get(&format!("/records/profiles/{}", catalog[0]))
        .await;
    response.assert_status_not_found();
    let error: ErrorResponse = response.json();
    assert_eq!(error.kind, ErrorKind::NotFound);

    server
        .get("/records/catalog/cdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcd")
        .await
        .assert_status_not_found();
    server
        .get("/records/catalog/xyz")
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn test_institution_meta_listing() {
    let server = bootstrapped_server(RegistrarConfig::default()).await;

    let response = server
        .get("/institutions/Fenerbahce%20University/meta/catalog")
        .await;
    response.assert_status_ok();
    let entries: Vec<Value> = response.json();
    assert_eq!(entries.len(), 8);
    assert!(entries.iter().all(|e| {
        e["owner"] == "Fenerbahce University" && e["relation"] == "CourseCatalogEntry"
    }));

    let response = server
        .get("/institutions/Fenerbahce%20University/meta/grades")
        .await;
    response.assert_status_bad_request();
    let error: ErrorResponse = response.json();
    assert_eq!(error.kind, ErrorKind::InvalidInput);
}
