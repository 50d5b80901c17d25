//! # Query and Projection
//!
//! Read paths over the two key families:
//! selector query (meta index) -> digest list -> record fetch -> join.
//!
//! Every lookup that yields nothing fails with `NotFound` naming the step
//! that came up empty. A digest that the meta index knows but the record
//! store does not is also `NotFound`: it means data and meta disagree.

use crate::canonical::CanonicalRecord;
use crate::config::JoinMode;
use crate::meta::{MetaIndex, Selector};
use crate::record_store::RecordStore;
use crate::records::{
    CombinedCourseRecord, CourseCatalogEntry, StudentProfile, StudentTranscript,
    TakenCourseResult,
};
use crate::storage::StateReader;
use crate::{Digest, RegistrarError, Relation};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A transcript together with the taken courses the join left out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptReport {
    pub transcript: StudentTranscript,
    /// Course codes of taken courses with no catalog match, in query order.
    pub omitted: Vec<String>,
}

/// Read-side projections over any world state.
pub struct Projection;

impl Projection {
    /// Digests indexed under `owner` (and `student_id`, if given) for one relation.
    ///
    /// Fails `NotFound` when the selector matches nothing.
    pub fn resolve_digests<R: StateReader + ?Sized>(
        reader: &R,
        owner: &str,
        student_id: Option<&str>,
        relation: Relation,
    ) -> Result<Vec<Digest>, RegistrarError> {
        let mut selector = Selector::new().owner(owner).relation(relation);
        if let Some(id) = student_id {
            selector = selector.student_id(id);
        }
        let entries = MetaIndex::query(reader, &selector)?;
        Ok(entries.into_iter().map(|e| e.hash_value).collect())
    }

    /// Dereference every digest, preserving order.
    pub fn fetch_records<R, T>(reader: &R, digests: &[Digest]) -> Result<Vec<T>, RegistrarError>
    where
        R: StateReader + ?Sized,
        T: DeserializeOwned,
    {
        digests
            .iter()
            .map(|digest| RecordStore::get(reader, digest))
            .collect()
    }

    /// All records of kind `T` indexed under one student.
    pub fn student_records<R, T>(
        reader: &R,
        owner: &str,
        student_id: &str,
    ) -> Result<Vec<T>, RegistrarError>
    where
        R: StateReader + ?Sized,
        T: CanonicalRecord + DeserializeOwned,
    {
        let step = format!("{} lookup for student {}", T::RELATION, student_id);
        let digests = Self::resolve_digests(reader, owner, Some(student_id), T::RELATION)
            .map_err(|e| e.during(&step))?;
        Self::fetch_records(reader, &digests).map_err(|e| e.during(&step))
    }

    /// All records of kind `T` indexed under an institution, any student.
    pub fn institution_records<R, T>(reader: &R, owner: &str) -> Result<Vec<T>, RegistrarError>
    where
        R: StateReader + ?Sized,
        T: CanonicalRecord + DeserializeOwned,
    {
        let step = format!("{} lookup for institution {}", T::RELATION, owner);
        let digests = Self::resolve_digests(reader, owner, None, T::RELATION)
            .map_err(|e| e.during(&step))?;
        Self::fetch_records(reader, &digests).map_err(|e| e.during(&step))
    }

    /// The student's profile.
    ///
    /// When several profile digests are indexed for one student, the last one
    /// in composite-key order wins.
    pub fn student_profile<R: StateReader + ?Sized>(
        reader: &R,
        owner: &str,
        student_id: &str,
    ) -> Result<StudentProfile, RegistrarError> {
        let step = format!("StudentProfile lookup for student {}", student_id);
        let digests =
            Self::resolve_digests(reader, owner, Some(student_id), Relation::StudentProfile)
                .map_err(|e| e.during(&step))?;
        let last = digests
            .last()
            .ok_or_else(|| RegistrarError::NotFound(step.clone()))?;
        RecordStore::get(reader, last).map_err(|e| e.during(&step))
    }

    /// Join taken courses with catalog entries by course code.
    ///
    /// Every (taken, catalog) pair with equal codes yields one line; line order
    /// follows `taken`. Taken courses without a match are omitted and reported
    /// under [`JoinMode::Lenient`], or fail with `JoinIncomplete` under
    /// [`JoinMode::Strict`].
    pub fn join_courses(
        taken: &[TakenCourseResult],
        catalog: &[CourseCatalogEntry],
        mode: JoinMode,
    ) -> Result<(Vec<CombinedCourseRecord>, Vec<String>), RegistrarError> {
        let mut lines = Vec::new();
        let mut omitted = Vec::new();

        for course in taken {
            let before = lines.len();
            lines.extend(
                catalog
                    .iter()
                    .filter(|entry| entry.course_code == course.course_code)
                    .map(|entry| CombinedCourseRecord::join(course, entry)),
            );
            if lines.len() == before {
                if mode == JoinMode::Strict {
                    return Err(RegistrarError::JoinIncomplete(course.course_code.clone()));
                }
                omitted.push(course.course_code.clone());
            }
        }

        Ok((lines, omitted))
    }

    /// Assemble a student's transcript.
    pub fn build_transcript<R: StateReader + ?Sized>(
        reader: &R,
        owner: &str,
        student_id: &str,
        mode: JoinMode,
    ) -> Result<TranscriptReport, RegistrarError> {
        let profile = Self::student_profile(reader, owner, student_id)?;
        let taken: Vec<TakenCourseResult> = Self::student_records(reader, owner, student_id)?;
        let catalog: Vec<CourseCatalogEntry> = Self::student_records(reader, owner, student_id)?;

        let (courses, omitted) = Self::join_courses(&taken, &catalog, mode)?;
        Ok(TranscriptReport {
            transcript: StudentTranscript { profile, courses },
            omitted,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
