//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//! Every command opens the configured store, runs one registrar operation
//! and prints the result, as JSON with `--json-mode`.

use super::StudentArgs;
use crate::api;
use crate::config::AppConfig;
use registrar_core::{
    CanonicalRecord, CourseCatalogEntry, Digest, MetaIndexEntry, Registrar, RegistrarError,
    Relation, StudentProfile, Submission, TakenCourseResult,
};
use serde::Serialize;

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

fn print_json<T: Serialize>(value: &T) -> Result<(), RegistrarError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| RegistrarError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

fn print_profile(profile: &StudentProfile) {
    println!(
        "{} {} ({})",
        profile.student_name, profile.student_surname, profile.student_id
    );
    println!("  Faculty:      {}", profile.faculty);
    println!("  Department:   {}", profile.department);
    println!("  National ID:  {}", profile.national_id);
    println!(
        "  Registered:   {} ({}, {})",
        profile.registration_date, profile.registration_type, profile.program_type
    );
    println!(
        "  Class:        {}  Semester: {}",
        profile.class, profile.student_semester
    );
    println!("  Digest:       {}", profile.hash_value);
}

fn print_taken(courses: &[TakenCourseResult]) {
    for c in courses {
        println!(
            "{:<10} {:<3} {:>6} sem {:<2} {}",
            c.course_code, c.grade, c.point, c.taken_semester, c.hash_value
        );
    }
}

fn print_catalog(entries: &[CourseCatalogEntry]) {
    for e in entries {
        println!(
            "{:<10} {:<40} {:<2} ects {:<2} credit {:<2} {}",
            e.course_code, e.course_name, e.course_type, e.ects, e.credit, e.hash_value
        );
    }
}

fn open(config: &AppConfig) -> Result<Registrar, RegistrarError> {
    tracing::debug!(
        backend = config.storage.backend.as_str(),
        path = %config.storage.path.display(),
        "opening store"
    );
    config.open_registrar()
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Compact the redb database file.
pub fn cmd_compact(config: &AppConfig, json_mode: bool) -> Result<(), RegistrarError> {
    let mut registrar = open(config)?;
    let compacted = registrar.compact()?;
    tracing::info!(compacted, "compaction finished");

    if json_mode {
        return print_json(&serde_json::json!({ "compacted": compacted }));
    }
    if compacted {
        println!("Compacted {}", config.storage.path.display());
    } else {
        println!("Nothing to compact (in-memory backend)");
    }
    Ok(())
}

/// Start the HTTP server.
pub async fn cmd_server(config: &AppConfig) -> Result<(), RegistrarError> {
    let registrar = open(config)?;

    println!("Registrar Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Address:  {}", config.server.bind_addr());
    println!("  Backend:  {}", config.storage.backend.as_str());
    println!("  Database: {}", config.storage.path.display());
    println!("  Digest:   {}", config.registrar.digest_algorithm);
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(&config.server, registrar).await
}

// =============================================================================
// STATUS / BOOTSTRAP / EXISTS
// =============================================================================

/// Show store status.
pub fn cmd_status(config: &AppConfig, json_mode: bool) -> Result<(), RegistrarError> {
    let registrar = open(config)?;
    let stats = registrar.stats()?;

    if json_mode {
        return print_json(&serde_json::json!({
            "database": config.storage.path.to_string_lossy(),
            "backend": config.storage.backend.as_str(),
            "records": stats.records,
            "meta_entries": stats.meta_entries,
            "digest_algorithm": stats.digest_algorithm,
            "duplicate_policy": registrar.config().duplicate_policy,
            "join_mode": registrar.config().join_mode,
        }));
    }

    println!("Registrar Store Status");
    println!("======================");
    println!("Database:     {}", config.storage.path.display());
    println!("Backend:      {}", config.storage.backend.as_str());
    println!();
    println!("Records:      {}", stats.records);
    println!("Meta entries: {}", stats.meta_entries);
    println!("Digest:       {}", stats.digest_algorithm);

    Ok(())
}

/// Load the demonstration dataset.
pub fn cmd_bootstrap(config: &AppConfig, json_mode: bool) -> Result<(), RegistrarError> {
    let mut registrar = open(config)?;
    let report = registrar.bootstrap()?;
    tracing::info!(
        inserted = report.inserted,
        skipped = report.skipped,
        "bootstrap complete"
    );

    if json_mode {
        return print_json(&report);
    }
    println!(
        "Bootstrap complete: {} inserted, {} already present",
        report.inserted, report.skipped
    );
    Ok(())
}

/// Check an (institution, student, digest) triple.
pub fn cmd_exists(
    config: &AppConfig,
    json_mode: bool,
    student: &StudentArgs,
    digest: &str,
) -> Result<(), RegistrarError> {
    let digest = Digest::parse(digest)?;
    let registrar = open(config)?;
    let exists = registrar.record_exists(&student.institution, &student.student_id, &digest)?;

    if json_mode {
        return print_json(&serde_json::json!({ "exists": exists }));
    }
    println!("{}", exists);
    Ok(())
}

// =============================================================================
// INSERT / DIGEST
// =============================================================================

/// Insert one record.
pub fn cmd_insert<N: Submission>(
    config: &AppConfig,
    json_mode: bool,
    submission: &N,
) -> Result<(), RegistrarError> {
    let relation = <N::Record as CanonicalRecord>::RELATION;
    let mut registrar = open(config)?;
    let outcome = registrar.insert(submission)?;

    if outcome.was_written() {
        tracing::info!(
            relation = %relation,
            institution = submission.institution(),
            student_id = submission.student_id(),
            digest = %outcome.digest(),
            "record inserted"
        );
    } else {
        tracing::info!(relation = %relation, digest = %outcome.digest(), "duplicate insert ignored");
    }

    if json_mode {
        return print_json(&serde_json::json!({
            "inserted": outcome.was_written(),
            "digest": outcome.digest(),
        }));
    }
    let verb = if outcome.was_written() {
        "Inserted"
    } else {
        "Already present"
    };
    println!("{} {} {}", verb, relation, outcome.digest());
    Ok(())
}

/// Print a record's digest under the configured algorithm.
pub fn cmd_digest<N: Submission>(
    config: &AppConfig,
    json_mode: bool,
    submission: &N,
) -> Result<(), RegistrarError> {
    let digest = registrar_core::InsertionPipeline::preview(
        submission,
        config.registrar.digest_algorithm,
    )?;

    if json_mode {
        return print_json(&serde_json::json!({
            "algorithm": config.registrar.digest_algorithm,
            "digest": digest,
        }));
    }
    println!("{}", digest);
    Ok(())
}

// =============================================================================
// QUERIES
// =============================================================================

/// List a student's records of one relation.
pub fn cmd_student_relation(
    config: &AppConfig,
    json_mode: bool,
    student: &StudentArgs,
    relation: Relation,
) -> Result<(), RegistrarError> {
    let registrar = open(config)?;
    let (institution, id) = (student.institution.as_str(), student.student_id.as_str());

    match relation {
        Relation::StudentProfile => {
            let profile = registrar.student_profile(institution, id)?;
            if json_mode {
                return print_json(&profile);
            }
            print_profile(&profile);
            Ok(())
        }
        Relation::TakenCourseResult => {
            let courses = registrar.student_taken_courses(institution, id)?;
            if json_mode {
                return print_json(&courses);
            }
            print_taken(&courses);
            Ok(())
        }
        Relation::CourseCatalogEntry => {
            let entries = registrar.student_catalog(institution, id)?;
            if json_mode {
                return print_json(&entries);
            }
            print_catalog(&entries);
            Ok(())
        }
    }
}

/// List every record of one relation at an institution.
pub fn cmd_institution(
    config: &AppConfig,
    json_mode: bool,
    institution: &str,
    relation: Relation,
) -> Result<(), RegistrarError> {
    let registrar = open(config)?;

    match relation {
        Relation::StudentProfile => {
            let profiles = registrar.institution_profiles(institution)?;
            if json_mode {
                return print_json(&profiles);
            }
            for profile in &profiles {
                print_profile(profile);
            }
        }
        Relation::TakenCourseResult => {
            let courses = registrar.institution_taken_courses(institution)?;
            if json_mode {
                return print_json(&courses);
            }
            print_taken(&courses);
        }
        Relation::CourseCatalogEntry => {
            let entries = registrar.institution_catalog(institution)?;
            if json_mode {
                return print_json(&entries);
            }
            print_catalog(&entries);
        }
    }
    Ok(())
}

/// Assemble and print a transcript.
pub fn cmd_transcript(
    config: &AppConfig,
    json_mode: bool,
    student: &StudentArgs,
) -> Result<(), RegistrarError> {
    let registrar = open(config)?;
    let report = registrar.transcript_report(&student.institution, &student.student_id)?;

    if !report.omitted.is_empty() {
        tracing::info!(
            omitted = ?report.omitted,
            "taken courses without catalog entry left out of transcript"
        );
    }

    if json_mode {
        return print_json(&report.transcript);
    }

    let transcript = &report.transcript;
    print_profile(&transcript.profile);
    println!();
    println!(
        "{:<10} {:<40} {:<2} {:>4} {:>6} {:<3} {:>6} {:>3}",
        "Code", "Course", "T", "ECTS", "Credit", "Grd", "Point", "Sem"
    );
    for line in &transcript.courses {
        println!(
            "{:<10} {:<40} {:<2} {:>4} {:>6} {:<3} {:>6} {:>3}",
            line.course_code,
            line.course_name,
            line.course_type,
            line.ects,
            line.credit,
            line.grade,
            line.point,
            line.taken_semester
        );
    }
    if !report.omitted.is_empty() {
        println!();
        println!("Not in catalog: {}", report.omitted.join(", "));
    }
    Ok(())
}

// =============================================================================
// DIGEST LOOKUPS
// =============================================================================

/// List the digests of one relation indexed for a student.
pub fn cmd_digests(
    config: &AppConfig,
    json_mode: bool,
    student: &StudentArgs,
    relation: Relation,
) -> Result<(), RegistrarError> {
    let registrar = open(config)?;
    let digests =
        registrar.student_digests(&student.institution, &student.student_id, relation)?;

    if json_mode {
        return print_json(&digests);
    }
    for digest in &digests {
        println!("{}", digest);
    }
    Ok(())
}

/// Fetch one record by digest.
pub fn cmd_record(
    config: &AppConfig,
    json_mode: bool,
    relation: Relation,
    digest: &str,
) -> Result<(), RegistrarError> {
    let digest = Digest::parse(digest)?;
    let registrar = open(config)?;

    match relation {
        Relation::StudentProfile => {
            let profile: StudentProfile = registrar.record_by_digest(&digest)?;
            if json_mode {
                return print_json(&profile);
            }
            print_profile(&profile);
        }
        Relation::TakenCourseResult => {
            let course: TakenCourseResult = registrar.record_by_digest(&digest)?;
            if json_mode {
                return print_json(&course);
            }
            print_taken(std::slice::from_ref(&course));
        }
        Relation::CourseCatalogEntry => {
            let entry: CourseCatalogEntry = registrar.record_by_digest(&digest)?;
            if json_mode {
                return print_json(&entry);
            }
            print_catalog(std::slice::from_ref(&entry));
        }
    }
    Ok(())
}

/// List an institution's meta entries of one relation.
pub fn cmd_meta(
    config: &AppConfig,
    json_mode: bool,
    institution: &str,
    relation: Relation,
) -> Result<(), RegistrarError> {
    let registrar = open(config)?;
    let entries: Vec<MetaIndexEntry> = registrar.institution_meta(institution, relation)?;

    if json_mode {
        return print_json(&entries);
    }
    for entry in &entries {
        println!(
            "{:<12} {:<20} {}",
            entry.student_id,
            entry.relation.as_str(),
            entry.hash_value
        );
    }
    Ok(())
}
