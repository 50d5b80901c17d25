//! # Bootstrap Seeder
//!
//! A fixed demonstration dataset: one first-year computer engineering
//! student at Fenerbahce University, their eight first-semester results and
//! the matching eight catalog entries.
//!
//! The whole dataset goes through the insertion pipeline inside one
//! transaction. Entries that are already indexed are skipped, so seeding
//! twice leaves the store unchanged.

use crate::canonical::DigestAlgorithm;
use crate::config::DuplicatePolicy;
use crate::pipeline::{
    InsertOutcome, InsertionPipeline, NewCatalogEntry, NewStudentProfile, NewTakenCourse,
    Submission,
};
use crate::storage::{Transaction, WorldState};
use crate::RegistrarError;
use serde::{Deserialize, Serialize};

/// Institution the demonstration records belong to.
pub const SEED_INSTITUTION: &str = "Fenerbahce University";

/// Subject of the demonstration records.
pub const SEED_STUDENT_ID: u64 = 190908809;

/// (course code, grade, point)
const SEED_RESULTS: [(&str, &str, f32); 8] = [
    ("COMP1001", "AA", 20.0),
    ("COMP1003", "BA", 21.0),
    ("ENG103", "BB", 6.0),
    ("MATH1001", "CB", 18.9),
    ("PHYS1001", "CC", 8.0),
    ("PHYS1011", "CC", 4.0),
    ("TURK103", "BB", 6.0),
    ("UNI103", "AA", 8.0),
];

/// (course code, name, ects, credit)
const SEED_CATALOG: [(&str, &str, u32, u32); 8] = [
    ("COMP1001", "Fundamentals of Computer Engineering", 5, 3),
    ("COMP1003", "Algorithms and Programming I", 6, 3),
    ("ENG103", "Advanced English I", 2, 2),
    ("MATH1001", "Calculus I", 7, 4),
    ("PHYS1001", "Physics I", 4, 3),
    ("PHYS1011", "Physics I Laboratory", 2, 1),
    ("TURK103", "Turkish Language I", 2, 2),
    ("UNI103", "University Life and Culture", 2, 2),
];

/// Counts from one bootstrap run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeedReport {
    /// Records written by this run.
    pub inserted: usize,
    /// Records that were already indexed.
    pub skipped: usize,
}

impl SeedReport {
    fn record(&mut self, outcome: &InsertOutcome) {
        if outcome.was_written() {
            self.inserted += 1;
        } else {
            self.skipped += 1;
        }
    }
}

/// The demonstration profile.
#[must_use]
pub fn seed_profile() -> NewStudentProfile {
    NewStudentProfile {
        institution: SEED_INSTITUTION.into(),
        faculty: "Faculty of Engineering and Architecture".into(),
        department: "Department of Computer Engineering".into(),
        student_id: SEED_STUDENT_ID,
        student_surname: "Selvi".into(),
        student_name: "Osman".into(),
        national_id: "44262495576".into(),
        registration_date: "02.09.2022".into(),
        registration_type: "Major / OSYM".into(),
        program_type: "Undergraduate".into(),
        class: 1,
        student_semester: 1,
    }
}

/// The demonstration first-semester results.
#[must_use]
pub fn seed_taken_courses() -> Vec<NewTakenCourse> {
    SEED_RESULTS
        .iter()
        .map(|&(code, grade, point)| NewTakenCourse {
            institution: SEED_INSTITUTION.into(),
            student_id: SEED_STUDENT_ID,
            course_code: code.into(),
            grade: grade.into(),
            point,
            taken_semester: 1,
        })
        .collect()
}

/// The demonstration catalog entries.
#[must_use]
pub fn seed_catalog() -> Vec<NewCatalogEntry> {
    SEED_CATALOG
        .iter()
        .map(|&(code, name, ects, credit)| NewCatalogEntry {
            institution: SEED_INSTITUTION.into(),
            student_id: SEED_STUDENT_ID,
            course_code: code.into(),
            course_name: name.into(),
            course_type: "C".into(),
            ects,
            credit,
        })
        .collect()
}

/// Stage the whole dataset in `tx`.
pub fn seed<S: WorldState + ?Sized>(
    tx: &mut Transaction<'_, S>,
    algorithm: DigestAlgorithm,
) -> Result<SeedReport, RegistrarError> {
    let mut report = SeedReport::default();

    stage(tx, &seed_profile(), algorithm, &mut report)?;
    for course in seed_taken_courses() {
        stage(tx, &course, algorithm, &mut report)?;
    }
    for entry in seed_catalog() {
        stage(tx, &entry, algorithm, &mut report)?;
    }

    Ok(report)
}

fn stage<S: WorldState + ?Sized, N: Submission>(
    tx: &mut Transaction<'_, S>,
    submission: &N,
    algorithm: DigestAlgorithm,
    report: &mut SeedReport,
) -> Result<(), RegistrarError> {
    let outcome =
        InsertionPipeline::insert(tx, submission, algorithm, DuplicatePolicy::Idempotent)?;
    report.record(&outcome);
    Ok(())
}
