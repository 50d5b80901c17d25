//! # Insertion Pipeline
//!
//! Validation and insertion protocol for new records.
//!
//! For each relation kind an insert:
//! 1. validates the raw caller-supplied fields
//! 2. builds the record and seals its digest
//! 3. checks the meta index for the exact (owner, subject, digest) triple
//! 4. stages the data record and its meta entry in the caller's transaction
//!
//! Nothing reaches the store until the caller commits the transaction, so a
//! failure at any step leaves no partial writes behind.

use crate::canonical::{CanonicalRecord, DigestAlgorithm, compute_digest, seal};
use crate::config::DuplicatePolicy;
use crate::meta::{MetaIndex, MetaIndexEntry};
use crate::primitives::{KEY_SEPARATOR, MAX_FIELD_LENGTH, MAX_INSTITUTION_LENGTH};
use crate::record_store::RecordStore;
use crate::records::{CourseCatalogEntry, StudentProfile, TakenCourseResult};
use crate::storage::{Transaction, WorldState};
use crate::{Digest, RegistrarError};
use serde::{Deserialize, Serialize};

// =============================================================================
// SUBMISSIONS
// =============================================================================

/// Raw fields of a new record, as received at the caller boundary.
pub trait Submission {
    /// The record kind this submission produces.
    type Record: CanonicalRecord + Serialize;

    /// Owning institution.
    fn institution(&self) -> &str;

    /// Subject the record is indexed under.
    fn student_id(&self) -> u64;

    /// Reject malformed fields before anything is hashed or stored.
    fn validate(&self) -> Result<(), RegistrarError>;

    /// Build the (unsealed) record.
    fn to_record(&self) -> Self::Record;
}

/// Fields of a new student profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudentProfile {
    pub institution: String,
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
}

impl Submission for NewStudentProfile {
    type Record = StudentProfile;

    fn institution(&self) -> &str {
        &self.institution
    }

    fn student_id(&self) -> u64 {
        self.student_id
    }

    fn validate(&self) -> Result<(), RegistrarError> {
        validate_institution(&self.institution)?;
        for (name, value) in [
            ("faculty", &self.faculty),
            ("department", &self.department),
            ("student_surname", &self.student_surname),
            ("student_name", &self.student_name),
            ("national_id", &self.national_id),
            ("registration_date", &self.registration_date),
            ("registration_type", &self.registration_type),
            ("program_type", &self.program_type),
        ] {
            validate_text(name, value)?;
        }
        Ok(())
    }

    fn to_record(&self) -> StudentProfile {
        StudentProfile {
            faculty: self.faculty.clone(),
            department: self.department.clone(),
            student_id: self.student_id,
            student_surname: self.student_surname.clone(),
            student_name: self.student_name.clone(),
            national_id: self.national_id.clone(),
            registration_date: self.registration_date.clone(),
            registration_type: self.registration_type.clone(),
            program_type: self.program_type.clone(),
            class: self.class,
            student_semester: self.student_semester,
            hash_value: Digest::default(),
        }
    }
}

/// Fields of a new taken-course result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTakenCourse {
    pub institution: String,
    pub student_id: u64,
    pub course_code: String,
    pub grade: String,
    pub point: f32,
    pub taken_semester: u32,
}

impl Submission for NewTakenCourse {
    type Record = TakenCourseResult;

    fn institution(&self) -> &str {
        &self.institution
    }

    fn student_id(&self) -> u64 {
        self.student_id
    }

    fn validate(&self) -> Result<(), RegistrarError> {
        validate_institution(&self.institution)?;
        validate_course_code(&self.course_code)?;
        validate_text("grade", &self.grade)?;
        if !self.point.is_finite() {
            return Err(RegistrarError::InvalidInput(format!(
                "point must be finite, got {}",
                self.point
            )));
        }
        Ok(())
    }

    fn to_record(&self) -> TakenCourseResult {
        TakenCourseResult {
            student_id: self.student_id,
            course_code: self.course_code.clone(),
            grade: self.grade.clone(),
            point: self.point,
            taken_semester: self.taken_semester,
            hash_value: Digest::default(),
        }
    }
}

/// Fields of a new course catalog entry, indexed under a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCatalogEntry {
    pub institution: String,
    pub student_id: u64,
    pub course_code: String,
    pub course_name: String,
    pub course_type: String,
    pub ects: u32,
    pub credit: u32,
}

impl Submission for NewCatalogEntry {
    type Record = CourseCatalogEntry;

    fn institution(&self) -> &str {
        &self.institution
    }

    fn student_id(&self) -> u64 {
        self.student_id
    }

    fn validate(&self) -> Result<(), RegistrarError> {
        validate_institution(&self.institution)?;
        validate_course_code(&self.course_code)?;
        validate_text("course_name", &self.course_name)?;
        validate_text("course_type", &self.course_type)
    }

    fn to_record(&self) -> CourseCatalogEntry {
        CourseCatalogEntry {
            course_code: self.course_code.clone(),
            course_name: self.course_name.clone(),
            course_type: self.course_type.clone(),
            ects: self.ects,
            credit: self.credit,
            hash_value: Digest::default(),
        }
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

fn validate_institution(institution: &str) -> Result<(), RegistrarError> {
    if institution.is_empty() {
        return Err(RegistrarError::InvalidInput(
            "institution must not be empty".into(),
        ));
    }
    if institution.len() > MAX_INSTITUTION_LENGTH {
        return Err(RegistrarError::InvalidInput(format!(
            "institution exceeds {} bytes",
            MAX_INSTITUTION_LENGTH
        )));
    }
    if institution.contains(KEY_SEPARATOR) {
        return Err(RegistrarError::InvalidInput(
            "institution must not contain U+0000".into(),
        ));
    }
    Ok(())
}

fn validate_course_code(code: &str) -> Result<(), RegistrarError> {
    if code.is_empty() {
        return Err(RegistrarError::InvalidInput(
            "course_code must not be empty".into(),
        ));
    }
    validate_text("course_code", code)
}

fn validate_text(name: &str, value: &str) -> Result<(), RegistrarError> {
    if value.len() > MAX_FIELD_LENGTH {
        return Err(RegistrarError::InvalidInput(format!(
            "{} exceeds {} bytes",
            name, MAX_FIELD_LENGTH
        )));
    }
    Ok(())
}

// =============================================================================
// PIPELINE
// =============================================================================

/// Result of one insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The data record and its meta entry were staged.
    Inserted(Digest),
    /// The triple was already indexed and nothing was staged.
    Duplicate(Digest),
}

impl InsertOutcome {
    /// Digest of the submitted record.
    #[must_use]
    pub fn digest(&self) -> &Digest {
        match self {
            InsertOutcome::Inserted(d) | InsertOutcome::Duplicate(d) => d,
        }
    }

    /// Whether anything was staged.
    #[must_use]
    pub fn was_written(&self) -> bool {
        matches!(self, InsertOutcome::Inserted(_))
    }
}

/// The insertion protocol shared by all three relation kinds.
pub struct InsertionPipeline;

impl InsertionPipeline {
    /// Validate and digest a submission without touching any store.
    pub fn preview<N: Submission>(
        submission: &N,
        algorithm: DigestAlgorithm,
    ) -> Result<Digest, RegistrarError> {
        submission.validate()?;
        Ok(compute_digest(&submission.to_record(), algorithm))
    }

    /// Run the full insert protocol inside `tx`.
    ///
    /// A duplicate triple fails with `AlreadyExists` under
    /// [`DuplicatePolicy::Reject`] and yields [`InsertOutcome::Duplicate`]
    /// under [`DuplicatePolicy::Idempotent`].
    pub fn insert<S, N>(
        tx: &mut Transaction<'_, S>,
        submission: &N,
        algorithm: DigestAlgorithm,
        policy: DuplicatePolicy,
    ) -> Result<InsertOutcome, RegistrarError>
    where
        S: WorldState + ?Sized,
        N: Submission,
    {
        submission.validate()?;

        let mut record = submission.to_record();
        let digest = seal(&mut record, algorithm);
        let owner = submission.institution();
        let student_id = submission.student_id().to_string();

        if MetaIndex::contains(&*tx, owner, &student_id, &digest)? {
            return match policy {
                DuplicatePolicy::Reject => Err(RegistrarError::AlreadyExists {
                    owner: owner.to_string(),
                    student_id,
                    digest,
                }),
                DuplicatePolicy::Idempotent => Ok(InsertOutcome::Duplicate(digest)),
            };
        }

        RecordStore::put(tx, &record)?;
        let entry = MetaIndexEntry::new(owner, student_id, N::Record::RELATION, digest.clone());
        MetaIndex::put(tx, &entry)?;

        Ok(InsertOutcome::Inserted(digest))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::storage::{MemoryState, StateReader};

    fn catalog(institution: &str) -> NewCatalogEntry {
        NewCatalogEntry {
            institution: institution.into(),
            student_id: 190908809,
            course_code: "COMP1001".into(),
            course_name: "Fundamentals of Computer Engineering".into(),
            course_type: "C".into(),
            ects: 5,
            credit: 3,
        }
    }

    fn taken(point: f32) -> NewTakenCourse {
        NewTakenCourse {
            institution: "Fenerbahce University".into(),
            student_id: 190908809,
            course_code: "COMP1001".into(),
            grade: "AA".into(),
            point,
            taken_semester: 1,
        }
    }

    fn insert<N: Submission>(
        state: &mut MemoryState,
        submission: &N,
        policy: DuplicatePolicy,
    ) -> Result<InsertOutcome, RegistrarError> {
        let mut tx = Transaction::begin(state);
        let outcome =
            InsertionPipeline::insert(&mut tx, submission, DigestAlgorithm::Blake3, policy)?;
        tx.commit()?;
        Ok(outcome)
    }

    #[test]
    fn insert_writes_record_and_meta_entry() {
        let mut state = MemoryState::new();
        let outcome =
            insert(&mut state, &catalog("Uni"), DuplicatePolicy::Reject).expect("insert");
        assert!(outcome.was_written());
        assert_eq!(state.entry_count().expect("count"), 2);
        assert!(state.get_state(outcome.digest().as_str()).expect("get").is_some());
    }

    #[test]
    fn duplicate_is_rejected_by_default() {
        let mut state = MemoryState::new();
        insert(&mut state, &catalog("Uni"), DuplicatePolicy::Reject).expect("first");
        let err = insert(&mut state, &catalog("Uni"), DuplicatePolicy::Reject).expect_err("dup");
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(state.entry_count().expect("count"), 2);
    }

    #[test]
    fn duplicate_is_a_no_op_when_idempotent() {
        let mut state = MemoryState::new();
        let first = insert(&mut state, &catalog("Uni"), DuplicatePolicy::Idempotent).expect("1");
        let second = insert(&mut state, &catalog("Uni"), DuplicatePolicy::Idempotent).expect("2");
        assert!(!second.was_written());
        assert_eq!(first.digest(), second.digest());
        assert_eq!(state.entry_count().expect("count"), 2);
    }

    #[test]
    fn same_content_under_other_institution_is_not_a_duplicate() {
        let mut state = MemoryState::new();
        let a = insert(&mut state, &catalog("Uni A"), DuplicatePolicy::Reject).expect("a");
        let b = insert(&mut state, &catalog("Uni B"), DuplicatePolicy::Reject).expect("b");
        assert_eq!(a.digest(), b.digest());
        // one shared data record, two meta entries
        assert_eq!(state.entry_count().expect("count"), 3);
    }

    #[test]
    fn validation_rejects_before_writing() {
        let mut state = MemoryState::new();
        for bad in [catalog(""), catalog("Uni\u{0}"), catalog(&"u".repeat(300))] {
            let err = insert(&mut state, &bad, DuplicatePolicy::Reject).expect_err("invalid");
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }

        let mut empty_code = catalog("Uni");
        empty_code.course_code.clear();
        assert!(insert(&mut state, &empty_code, DuplicatePolicy::Reject).is_err());

        let mut long_name = catalog("Uni");
        long_name.course_name = "x".repeat(MAX_FIELD_LENGTH + 1);
        assert!(insert(&mut state, &long_name, DuplicatePolicy::Reject).is_err());

        assert_eq!(state.entry_count().expect("count"), 0);
    }

    #[test]
    fn non_finite_point_is_rejected() {
        let mut state = MemoryState::new();
        for point in [f32::NAN, f32::INFINITY] {
            let err = insert(&mut state, &taken(point), DuplicatePolicy::Reject).expect_err("nan");
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn preview_matches_inserted_digest() {
        let mut state = MemoryState::new();
        let preview = InsertionPipeline::preview(&taken(20.0), DigestAlgorithm::Blake3)
            .expect("preview");
        let outcome = insert(&mut state, &taken(20.0), DuplicatePolicy::Reject).expect("insert");
        assert_eq!(&preview, outcome.digest());
    }

    #[test]
    fn uncommitted_insert_is_invisible() {
        let mut state = MemoryState::new();
        {
            let mut tx = Transaction::begin(&mut state);
            InsertionPipeline::insert(
                &mut tx,
                &catalog("Uni"),
                DigestAlgorithm::Blake3,
                DuplicatePolicy::Reject,
            )
            .expect("insert");
            assert_eq!(tx.pending(), 2);
        }
        assert_eq!(state.entry_count().expect("count"), 0);
    }
}
