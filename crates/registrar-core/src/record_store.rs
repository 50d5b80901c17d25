//! # Record Store
//!
//! Content-addressed get/put of JSON-encoded records.
//!
//! A record's storage key is its digest. Two records with identical field
//! values therefore collapse onto the same key, and a repeated put is a
//! harmless overwrite with identical bytes.

use crate::canonical::CanonicalRecord;
use crate::storage::{StateReader, Transaction, WorldState};
use crate::types::serde_err;
use crate::{Digest, RegistrarError};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Stateless access to the `digest -> JSON(record)` key family.
pub struct RecordStore;

impl RecordStore {
    /// Stage an upsert of `record` under its own digest.
    ///
    /// The record must already be sealed.
    pub fn put<S, R>(tx: &mut Transaction<'_, S>, record: &R) -> Result<(), RegistrarError>
    where
        S: WorldState + ?Sized,
        R: CanonicalRecord + Serialize,
    {
        let digest = record.digest();
        if digest.is_empty() {
            return Err(RegistrarError::InvalidInput(format!(
                "{} record has no digest",
                R::RELATION
            )));
        }
        let value = serde_json::to_vec(record).map_err(serde_err)?;
        tx.put_state(digest.as_str(), value);
        Ok(())
    }

    /// Exact lookup by digest; a missing key is `NotFound`.
    pub fn get<R, T>(reader: &R, digest: &Digest) -> Result<T, RegistrarError>
    where
        R: StateReader + ?Sized,
        T: DeserializeOwned,
    {
        let bytes = reader
            .get_state(digest.as_str())?
            .ok_or_else(|| RegistrarError::NotFound(format!("no record with digest {}", digest)))?;
        serde_json::from_slice(&bytes).map_err(serde_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::canonical::{DigestAlgorithm, seal};
    use crate::records::CourseCatalogEntry;
    use crate::storage::MemoryState;

    fn entry() -> CourseCatalogEntry {
        CourseCatalogEntry {
            course_code: "MATH1001".into(),
            course_name: "Calculus I".into(),
            course_type: "C".into(),
            ects: 7,
            credit: 4,
            hash_value: Digest::default(),
        }
    }

    #[test]
    fn put_then_get() {
        let mut state = MemoryState::new();
        let mut record = entry();
        let digest = seal(&mut record, DigestAlgorithm::Blake3);

        let mut tx = Transaction::begin(&mut state);
        RecordStore::put(&mut tx, &record).expect("put");
        tx.commit().expect("commit");

        let loaded: CourseCatalogEntry = RecordStore::get(&state, &digest).expect("get");
        assert_eq!(loaded, record);
    }

    #[test]
    fn unsealed_record_is_rejected() {
        let mut state = MemoryState::new();
        let mut tx = Transaction::begin(&mut state);
        let err = RecordStore::put(&mut tx, &entry()).expect_err("unsealed");
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn missing_digest_is_not_found() {
        let state = MemoryState::new();
        let digest = Digest::parse("00000000000000000000000000000000").expect("digest");
        let err = RecordStore::get::<_, CourseCatalogEntry>(&state, &digest).expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn malformed_payload_is_serialization_error() {
        let mut state = MemoryState::new();
        let digest = Digest::parse("11111111111111111111111111111111").expect("digest");
        let mut tx = Transaction::begin(&mut state);
        tx.put_state(digest.as_str(), b"not json".to_vec());
        tx.commit().expect("commit");

        let err = RecordStore::get::<_, CourseCatalogEntry>(&state, &digest).expect_err("bad");
        assert_eq!(err.kind(), ErrorKind::SerializationError);
    }
}
