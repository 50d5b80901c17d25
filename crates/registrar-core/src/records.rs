//! # Record Kinds
//!
//! The three persisted relations (`StudentProfile`, `TakenCourseResult`,
//! `CourseCatalogEntry`) and the two derived views assembled by the
//! projection layer (`CombinedCourseRecord`, `StudentTranscript`).
//!
//! Persisted records are immutable once written. Each one carries its own
//! digest in `hash_value`; the digest is excluded from its own hash input.
//!
//! JSON field names are part of the stored layout and must not change.

use crate::canonical::{CanonicalRecord, CanonicalWriter};
use crate::{Digest, Relation};
use serde::{Deserialize, Serialize};

// =============================================================================
// STUDENT PROFILE
// =============================================================================

/// A student's registration profile.
///
/// The owning institution is not part of the record; it lives in the
/// meta entry, so identical profiles under two institutions share a digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub faculty: String,
    pub department: String,
    pub student_id: u64,
    pub student_surname: String,
    pub student_name: String,
    pub national_id: String,
    pub registration_date: String,
    pub registration_type: String,
    pub program_type: String,
    pub class: u32,
    pub student_semester: u32,
    #[serde(default)]
    pub hash_value: Digest,
}

impl CanonicalRecord for StudentProfile {
    const RELATION: Relation = Relation::StudentProfile;

    fn write_canonical(&self, out: &mut CanonicalWriter) {
        out.text("faculty", &self.faculty);
        out.text("department", &self.department);
        out.uint("student_id", self.student_id);
        out.text("student_surname", &self.student_surname);
        out.text("student_name", &self.student_name);
        out.text("national_id", &self.national_id);
        out.text("registration_date", &self.registration_date);
        out.text("registration_type", &self.registration_type);
        out.text("program_type", &self.program_type);
        out.uint("class", u64::from(self.class));
        out.uint("student_semester", u64::from(self.student_semester));
    }

    fn digest(&self) -> &Digest {
        &self.hash_value
    }

    fn set_digest(&mut self, digest: Digest) {
        self.hash_value = digest;
    }
}

// =============================================================================
// TAKEN COURSE RESULT
// =============================================================================

/// The result of one course attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakenCourseResult {
    pub student_id: u64,
    pub course_code: String,
    pub grade: String,
    pub point: f32,
    pub taken_semester: u32,
    #[serde(default)]
    pub hash_value: Digest,
}

impl CanonicalRecord for TakenCourseResult {
    const RELATION: Relation = Relation::TakenCourseResult;

    fn write_canonical(&self, out: &mut CanonicalWriter) {
        out.uint("student_id", self.student_id);
        out.text("course_code", &self.course_code);
        out.text("grade", &self.grade);
        out.real("point", self.point);
        out.uint("taken_semester", u64::from(self.taken_semester));
    }

    fn digest(&self) -> &Digest {
        &self.hash_value
    }

    fn set_digest(&mut self, digest: Digest) {
        self.hash_value = digest;
    }
}

// =============================================================================
// COURSE CATALOG ENTRY
// =============================================================================

/// An institution-scoped course catalog row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseCatalogEntry {
    pub course_code: String,
    pub course_name: String,
    pub course_type: String,
    pub ects: u32,
    pub credit: u32,
    #[serde(default)]
    pub hash_value: Digest,
}

impl CanonicalRecord for CourseCatalogEntry {
    const RELATION: Relation = Relation::CourseCatalogEntry;

    fn write_canonical(&self, out: &mut CanonicalWriter) {
        out.text("course_code", &self.course_code);
        out.text("course_name", &self.course_name);
        out.text("course_type", &self.course_type);
        out.uint("ects", u64::from(self.ects));
        out.uint("credit", u64::from(self.credit));
    }

    fn digest(&self) -> &Digest {
        &self.hash_value
    }

    fn set_digest(&mut self, digest: Digest) {
        self.hash_value = digest;
    }
}

// =============================================================================
// DERIVED VIEWS (never persisted)
// =============================================================================

/// One transcript line: a taken course enriched with its catalog metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedCourseRecord {
    pub course_code: String,
    pub course_name: String,
    pub course_type: String,
    pub ects: u32,
    pub credit: u32,
    pub grade: String,
    pub point: f32,
    pub taken_semester: u32,
}

impl CombinedCourseRecord {
    /// Join one taken course with one matching catalog entry.
    #[must_use]
    pub fn join(taken: &TakenCourseResult, catalog: &CourseCatalogEntry) -> Self {
        Self {
            course_code: taken.course_code.clone(),
            course_name: catalog.course_name.clone(),
            course_type: catalog.course_type.clone(),
            ects: catalog.ects,
            credit: catalog.credit,
            grade: taken.grade.clone(),
            point: taken.point,
            taken_semester: taken.taken_semester,
        }
    }
}

/// A student's profile plus their joined course lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentTranscript {
    #[serde(rename = "student_informations")]
    pub profile: StudentProfile,
    #[serde(rename = "taken_courses")]
    pub courses: Vec<CombinedCourseRecord>,
}

// =============================================================================
// TESTS
// =============================================================================
