//! # Registrar
//!
//! The operation surface of the CORE. Each method is one externally invoked
//! operation and runs inside its own [`Transaction`]: writes are committed
//! as a unit at the end, or not at all.
//!
//! ## Storage Backends
//!
//! `Registrar` is generic over any [`WorldState`]; the default parameter is
//! the runtime-selected [`StateBackend`] (in-memory or redb).

use crate::canonical::{CanonicalRecord, DigestAlgorithm};
use crate::config::RegistrarConfig;
use crate::meta::{MetaIndex, MetaIndexEntry, Selector};
use crate::pipeline::{
    InsertOutcome, InsertionPipeline, NewCatalogEntry, NewStudentProfile, NewTakenCourse,
    Submission,
};
use crate::primitives::{DIGEST_ALGORITHM_KEY, meta_key_prefix};
use crate::query::{Projection, TranscriptReport};
use crate::record_store::RecordStore;
use crate::records::{CourseCatalogEntry, StudentProfile, StudentTranscript, TakenCourseResult};
use crate::seed::{self, SeedReport};
use crate::storage::{StateBackend, Transaction, WorldState};
use crate::{Digest, RegistrarError, Relation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Store-wide counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Content-addressed data records.
    pub records: usize,
    /// Meta-index entries.
    pub meta_entries: usize,
    pub digest_algorithm: DigestAlgorithm,
}

/// Academic record registrar over a world state.
#[derive(Debug)]
pub struct Registrar<S: WorldState = StateBackend> {
    state: S,
    config: RegistrarConfig,
}

impl Registrar<StateBackend> {
    /// A registrar over a fresh in-memory store.
    pub fn in_memory(config: RegistrarConfig) -> Result<Self, RegistrarError> {
        Self::open(StateBackend::default(), config)
    }

    /// Compact the backing database. Returns `false` for in-memory stores.
    pub fn compact(&mut self) -> Result<bool, RegistrarError> {
        self.state.compact()
    }
}

impl<S: WorldState> Registrar<S> {
    /// Attach to a world state.
    ///
    /// A store remembers the digest algorithm it was first opened with.
    /// Opening it with a different algorithm fails with `Configuration`.
    pub fn open(mut state: S, config: RegistrarConfig) -> Result<Self, RegistrarError> {
        let wanted = config.digest_algorithm;
        match state.get_state(DIGEST_ALGORITHM_KEY)? {
            Some(bytes) => {
                let stamped = std::str::from_utf8(&bytes)
                    .ok()
                    .and_then(DigestAlgorithm::parse)
                    .ok_or_else(|| {
                        RegistrarError::Configuration(
                            "store carries an unreadable digest algorithm stamp".into(),
                        )
                    })?;
                if stamped != wanted {
                    return Err(RegistrarError::Configuration(format!(
                        "store was created with digest algorithm {}, configured {}",
                        stamped, wanted
                    )));
                }
            }
            None => {
                let mut tx = Transaction::begin(&mut state);
                tx.put_state(DIGEST_ALGORITHM_KEY, wanted.as_str().as_bytes().to_vec());
                tx.commit()?;
            }
        }
        Ok(Self { state, config })
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &RegistrarConfig {
        &self.config
    }

    /// The underlying world state.
    #[must_use]
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Load the demonstration dataset. Already-indexed entries are skipped.
    pub fn bootstrap(&mut self) -> Result<SeedReport, RegistrarError> {
        let algorithm = self.config.digest_algorithm;
        let mut tx = Transaction::begin(&mut self.state);
        let report = seed::seed(&mut tx, algorithm)?;
        tx.commit()?;
        Ok(report)
    }

    /// Whether `(institution, student_id, digest)` is indexed.
    pub fn record_exists(
        &self,
        institution: &str,
        student_id: &str,
        digest: &Digest,
    ) -> Result<bool, RegistrarError> {
        MetaIndex::contains(&self.state, institution, student_id, digest)
    }

    /// Run one insert as its own transaction.
    pub fn insert<N: Submission>(
        &mut self,
        submission: &N,
    ) -> Result<InsertOutcome, RegistrarError> {
        let RegistrarConfig {
            digest_algorithm,
            duplicate_policy,
            ..
        } = self.config;
        let mut tx = Transaction::begin(&mut self.state);
        let outcome =
            InsertionPipeline::insert(&mut tx, submission, digest_algorithm, duplicate_policy)?;
        tx.commit()?;
        Ok(outcome)
    }

    /// Insert a student profile. Returns `true` when a record was written.
    pub fn insert_student_profile(
        &mut self,
        profile: &NewStudentProfile,
    ) -> Result<bool, RegistrarError> {
        Ok(self.insert(profile)?.was_written())
    }

    /// Insert a taken-course result. Returns `true` when a record was written.
    pub fn insert_taken_course(&mut self, course: &NewTakenCourse) -> Result<bool, RegistrarError> {
        Ok(self.insert(course)?.was_written())
    }

    /// Insert a catalog entry. Returns `true` when a record was written.
    pub fn insert_catalog_entry(
        &mut self,
        entry: &NewCatalogEntry,
    ) -> Result<bool, RegistrarError> {
        Ok(self.insert(entry)?.was_written())
    }

    /// Digest a submission under the configured algorithm without storing it.
    pub fn digest_of<N: Submission>(&self, submission: &N) -> Result<Digest, RegistrarError> {
        InsertionPipeline::preview(submission, self.config.digest_algorithm)
    }

    pub fn student_profile(
        &self,
        institution: &str,
        student_id: &str,
    ) -> Result<StudentProfile, RegistrarError> {
        Projection::student_profile(&self.state, institution, student_id)
    }

    pub fn student_catalog(
        &self,
        institution: &str,
        student_id: &str,
    ) -> Result<Vec<CourseCatalogEntry>, RegistrarError> {
        Projection::student_records(&self.state, institution, student_id)
    }

    pub fn student_taken_courses(
        &self,
        institution: &str,
        student_id: &str,
    ) -> Result<Vec<TakenCourseResult>, RegistrarError> {
        Projection::student_records(&self.state, institution, student_id)
    }

    pub fn institution_profiles(
        &self,
        institution: &str,
    ) -> Result<Vec<StudentProfile>, RegistrarError> {
        Projection::institution_records(&self.state, institution)
    }

    pub fn institution_catalog(
        &self,
        institution: &str,
    ) -> Result<Vec<CourseCatalogEntry>, RegistrarError> {
        Projection::institution_records(&self.state, institution)
    }

    pub fn institution_taken_courses(
        &self,
        institution: &str,
    ) -> Result<Vec<TakenCourseResult>, RegistrarError> {
        Projection::institution_records(&self.state, institution)
    }

    /// Digests of one relation indexed for a student, in composite-key order.
    pub fn student_digests(
        &self,
        institution: &str,
        student_id: &str,
        relation: Relation,
    ) -> Result<Vec<Digest>, RegistrarError> {
        Projection::resolve_digests(&self.state, institution, Some(student_id), relation)
    }

    /// Fetch one record of kind `T` by its digest.
    ///
    /// A digest naming a record of another kind is `NotFound`, like an
    /// unknown digest.
    pub fn record_by_digest<T>(&self, digest: &Digest) -> Result<T, RegistrarError>
    where
        T: CanonicalRecord + DeserializeOwned,
    {
        RecordStore::get(&self.state, digest).map_err(|e| match e {
            RegistrarError::SerializationError(_) => RegistrarError::NotFound(format!(
                "digest {} does not identify a {} record",
                digest,
                T::RELATION
            )),
            other => other,
        })
    }

    /// Meta entries of one relation at an institution, any student.
    pub fn institution_meta(
        &self,
        institution: &str,
        relation: Relation,
    ) -> Result<Vec<MetaIndexEntry>, RegistrarError> {
        let selector = Selector::new().owner(institution).relation(relation);
        MetaIndex::query(&self.state, &selector)
    }

    /// Transcript plus the course codes a lenient join left out.
    pub fn transcript_report(
        &self,
        institution: &str,
        student_id: &str,
    ) -> Result<TranscriptReport, RegistrarError> {
        Projection::build_transcript(&self.state, institution, student_id, self.config.join_mode)
    }

    pub fn student_transcript(
        &self,
        institution: &str,
        student_id: &str,
    ) -> Result<StudentTranscript, RegistrarError> {
        Ok(self.transcript_report(institution, student_id)?.transcript)
    }

    /// Count data records and meta entries.
    pub fn stats(&self) -> Result<StoreStats, RegistrarError> {
        let total = self.state.entry_count()?;
        let meta_entries = self.state.scan_prefix(&meta_key_prefix())?.len();
        // the algorithm stamp is neither
        let records = total.saturating_sub(meta_entries).saturating_sub(1);
        Ok(StoreStats {
            records,
            meta_entries,
            digest_algorithm: self.config.digest_algorithm,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::config::DuplicatePolicy;
    use crate::storage::{MemoryState, StateReader};

    fn registrar() -> Registrar<MemoryState> {
        Registrar::open(MemoryState::new(), RegistrarConfig::default()).expect("open")
    }

    #[test]
    fn open_stamps_algorithm() {
        let registrar = registrar();
        let stamp = registrar
            .state()
            .get_state(DIGEST_ALGORITHM_KEY)
            .expect("get")
            .expect("stamp");
        assert_eq!(stamp, b"blake3".to_vec());
    }

    #[test]
    fn reopen_with_other_algorithm_fails() {
        let registrar = registrar();
        let state = registrar.state().clone();
        let config = RegistrarConfig {
            digest_algorithm: DigestAlgorithm::Sha256,
            ..RegistrarConfig::default()
        };
        let err = Registrar::open(state, config).expect_err("mismatch");
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn stats_after_bootstrap() {
        let mut registrar = registrar();
        registrar.bootstrap().expect("bootstrap");
        let stats = registrar.stats().expect("stats");
        assert_eq!(stats.records, 17);
        assert_eq!(stats.meta_entries, 17);
    }

    #[test]
    fn insert_returns_false_for_idempotent_duplicate() {
        let config = RegistrarConfig {
            duplicate_policy: DuplicatePolicy::Idempotent,
            ..RegistrarConfig::default()
        };
        let mut registrar = Registrar::open(MemoryState::new(), config).expect("open");
        let profile = seed::seed_profile();
        assert!(registrar.insert_student_profile(&profile).expect("first"));
        assert!(!registrar.insert_student_profile(&profile).expect("second"));
    }

    #[test]
    fn record_exists_after_insert() {
        let mut registrar = registrar();
        let entry = seed::seed_catalog().remove(0);
        let digest = registrar.digest_of(&entry).expect("digest");
        assert!(!registrar
            .record_exists(&entry.institution, "190908809", &digest)
            .expect("exists"));
        registrar.insert_catalog_entry(&entry).expect("insert");
        assert!(registrar
            .record_exists(&entry.institution, "190908809", &digest)
            .expect("exists"));
    }

    #[test]
    fn student_digests_follow_key_order() {
        let mut registrar = registrar();
        registrar.bootstrap().expect("bootstrap");
        let digests = registrar
            .student_digests(seed::SEED_INSTITUTION, "190908809", Relation::TakenCourseResult)
            .expect("digests");
        assert_eq!(digests.len(), 8);
        let mut sorted = digests.clone();
        sorted.sort();
        assert_eq!(digests, sorted);
    }

    #[test]
    fn record_by_digest_checks_kind() {
        let mut registrar = registrar();
        let entry = seed::seed_catalog().remove(0);
        let digest = registrar.insert(&entry).expect("insert").digest().clone();

        let fetched: CourseCatalogEntry = registrar.record_by_digest(&digest).expect("fetch");
        assert_eq!(fetched.course_code, entry.course_code);
        assert_eq!(fetched.hash_value, digest);

        let err = registrar
            .record_by_digest::<StudentProfile>(&digest)
            .expect_err("wrong kind");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn institution_meta_lists_one_relation() {
        let mut registrar = registrar();
        registrar.bootstrap().expect("bootstrap");
        let entries = registrar
            .institution_meta(seed::SEED_INSTITUTION, Relation::CourseCatalogEntry)
            .expect("meta");
        assert_eq!(entries.len(), 8);
        assert!(entries
            .iter()
            .all(|e| e.relation == Relation::CourseCatalogEntry && e.student_id == "190908809"));

        let err = registrar
            .institution_meta("Nowhere", Relation::StudentProfile)
            .expect_err("empty");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
