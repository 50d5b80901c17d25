//! # Meta Index
//!
//! Secondary records `(owner, student_id, relation, hash_value)` that make
//! content-addressed records discoverable.
//!
//! ## Keys
//!
//! Every meta entry is stored under a composite key that is a pure function
//! of `(owner, student_id, digest)`:
//!
//! ```text
//! \0heiID\0<owner>\0<student_id>\0<digest>\0
//! ```
//!
//! Inserting identical content twice therefore maps to the identical key,
//! and the second write overwrites instead of duplicating.
//!
//! ## Selectors
//!
//! Queries are equality selectors over `owner`, `relation`, `student_id` and
//! `hash_value`. The leading selector fields narrow the composite-key range
//! that is scanned; every scanned row is then matched against the full
//! selector. Results come back in composite-key order.

use crate::primitives::{KEY_SEPARATOR, meta_key_prefix};
use crate::storage::{StateReader, Transaction, WorldState};
use crate::types::serde_err;
use crate::{Digest, RegistrarError, Relation};
use serde::{Deserialize, Serialize};

// =============================================================================
// META ENTRY
// =============================================================================

/// One secondary-index row; exactly one exists per indexed data record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaIndexEntry {
    /// Owning institution name.
    pub owner: String,
    /// Subject identifier, as a string.
    pub student_id: String,
    /// Which record kind `hash_value` points at.
    pub relation: Relation,
    /// Digest of the data record.
    pub hash_value: Digest,
}

impl MetaIndexEntry {
    #[must_use]
    pub fn new(
        owner: impl Into<String>,
        student_id: impl Into<String>,
        relation: Relation,
        hash_value: Digest,
    ) -> Self {
        Self {
            owner: owner.into(),
            student_id: student_id.into(),
            relation,
            hash_value,
        }
    }

    /// The composite key this entry is stored under.
    pub fn key(&self) -> Result<String, RegistrarError> {
        composite_key(&self.owner, &self.student_id, &self.hash_value)
    }
}

/// Build the composite key for `(owner, student_id, digest)`.
///
/// Fails with `InvalidInput` if any component contains U+0000.
pub fn composite_key(
    owner: &str,
    student_id: &str,
    digest: &Digest,
) -> Result<String, RegistrarError> {
    let mut key = meta_key_prefix();
    for component in [owner, student_id, digest.as_str()] {
        if component.contains(KEY_SEPARATOR) {
            return Err(RegistrarError::InvalidInput(format!(
                "key component {:?} contains U+0000",
                component
            )));
        }
        key.push_str(component);
        key.push(KEY_SEPARATOR);
    }
    Ok(key)
}

// =============================================================================
// SELECTOR
// =============================================================================

/// Equality selector over meta entries. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selector {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation: Option<Relation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_value: Option<Digest>,
}

impl Selector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    #[must_use]
    pub fn relation(mut self, relation: Relation) -> Self {
        self.relation = Some(relation);
        self
    }

    #[must_use]
    pub fn student_id(mut self, student_id: impl Into<String>) -> Self {
        self.student_id = Some(student_id.into());
        self
    }

    #[must_use]
    pub fn hash_value(mut self, digest: Digest) -> Self {
        self.hash_value = Some(digest);
        self
    }

    /// Check an entry against every set field.
    #[must_use]
    pub fn matches(&self, entry: &MetaIndexEntry) -> bool {
        self.owner.as_ref().is_none_or(|o| *o == entry.owner)
            && self.relation.is_none_or(|r| r == entry.relation)
            && self
                .student_id
                .as_ref()
                .is_none_or(|s| *s == entry.student_id)
            && self
                .hash_value
                .as_ref()
                .is_none_or(|h| *h == entry.hash_value)
    }

    /// Narrowest composite-key prefix covering every entry this selector can match.
    ///
    /// Key components are only appended while the preceding ones are fixed.
    #[must_use]
    pub fn key_prefix(&self) -> String {
        let mut prefix = meta_key_prefix();
        let components = [
            self.owner.as_deref(),
            self.student_id.as_deref(),
            self.hash_value.as_ref().map(Digest::as_str),
        ];
        for component in components {
            match component {
                Some(value) => {
                    prefix.push_str(value);
                    prefix.push(KEY_SEPARATOR);
                }
                None => break,
            }
        }
        prefix
    }

    /// Render as a CouchDB-style `{"selector":{...}}` query string.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        serde_json::json!({ "selector": self }).to_string()
    }
}

// =============================================================================
// META INDEX
// =============================================================================

/// Stateless access to the meta-index key family.
pub struct MetaIndex;

impl MetaIndex {
    /// Stage a meta entry under its composite key.
    pub fn put<S: WorldState + ?Sized>(
        tx: &mut Transaction<'_, S>,
        entry: &MetaIndexEntry,
    ) -> Result<(), RegistrarError> {
        let key = entry.key()?;
        let value = serde_json::to_vec(entry).map_err(serde_err)?;
        tx.put_state(key, value);
        Ok(())
    }

    /// Every entry matching `selector`, possibly none.
    pub fn scan<R: StateReader + ?Sized>(
        reader: &R,
        selector: &Selector,
    ) -> Result<Vec<MetaIndexEntry>, RegistrarError> {
        let rows = reader.scan_prefix(&selector.key_prefix())?;
        let mut entries = Vec::new();
        for (_, value) in rows {
            let entry: MetaIndexEntry = serde_json::from_slice(&value).map_err(serde_err)?;
            if selector.matches(&entry) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// Every entry matching `selector`; an empty result is `NotFound`.
    pub fn query<R: StateReader + ?Sized>(
        reader: &R,
        selector: &Selector,
    ) -> Result<Vec<MetaIndexEntry>, RegistrarError> {
        let entries = Self::scan(reader, selector)?;
        if entries.is_empty() {
            return Err(RegistrarError::NotFound(format!(
                "no meta entries match {}",
                selector.to_query_string()
            )));
        }
        Ok(entries)
    }

    /// Whether the exact `(owner, student_id, digest)` triple is indexed.
    pub fn contains<R: StateReader + ?Sized>(
        reader: &R,
        owner: &str,
        student_id: &str,
        digest: &Digest,
    ) -> Result<bool, RegistrarError> {
        let selector = Selector::new()
            .owner(owner)
            .student_id(student_id)
            .hash_value(digest.clone());
        Ok(!Self::scan(reader, &selector)?.is_empty())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::storage::MemoryState;

    fn digest(c: char) -> Digest {
        Digest::parse(&c.to_string().repeat(32)).expect("digest")
    }

    fn indexed(entries: &[MetaIndexEntry]) -> MemoryState {
        let mut state = MemoryState::new();
        let mut tx = Transaction::begin(&mut state);
        for entry in entries {
            MetaIndex::put(&mut tx, entry).expect("put");
        }
        tx.commit().expect("commit");
        state
    }

    #[test]
    fn composite_key_layout() {
        let key = composite_key("Uni", "42", &digest('a')).expect("key");
        assert_eq!(key, format!("\u{0}heiID\u{0}Uni\u{0}42\u{0}{}\u{0}", "a".repeat(32)));
    }

    #[test]
    fn composite_key_rejects_nul() {
        let err = composite_key("Uni\u{0}x", "42", &digest('a')).expect_err("nul");
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn composite_key_is_deterministic() {
        let a = composite_key("Uni", "42", &digest('b')).expect("key");
        let b = composite_key("Uni", "42", &digest('b')).expect("key");
        assert_eq!(a, b);
    }

    #[test]
    fn owner_prefix_does_not_leak_into_longer_owner() {
        let state = indexed(&[
            MetaIndexEntry::new("Uni", "1", Relation::StudentProfile, digest('a')),
            MetaIndexEntry::new("Uni Two", "1", Relation::StudentProfile, digest('b')),
        ]);
        let entries = MetaIndex::query(&state, &Selector::new().owner("Uni")).expect("query");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].hash_value, digest('a'));
    }

    #[test]
    fn selector_filters_on_relation() {
        let state = indexed(&[
            MetaIndexEntry::new("Uni", "1", Relation::StudentProfile, digest('a')),
            MetaIndexEntry::new("Uni", "1", Relation::TakenCourseResult, digest('b')),
            MetaIndexEntry::new("Uni", "2", Relation::TakenCourseResult, digest('c')),
        ]);

        let taken = MetaIndex::query(
            &state,
            &Selector::new()
                .owner("Uni")
                .relation(Relation::TakenCourseResult),
        )
        .expect("query");
        assert_eq!(taken.len(), 2);

        let one = MetaIndex::query(
            &state,
            &Selector::new()
                .owner("Uni")
                .relation(Relation::TakenCourseResult)
                .student_id("1"),
        )
        .expect("query");
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].hash_value, digest('b'));
    }

    #[test]
    fn empty_query_is_not_found() {
        let state = MemoryState::new();
        let err = MetaIndex::query(&state, &Selector::new().owner("Nobody")).expect_err("empty");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn contains_checks_exact_triple() {
        let state = indexed(&[MetaIndexEntry::new(
            "Uni",
            "1",
            Relation::CourseCatalogEntry,
            digest('a'),
        )]);
        assert!(MetaIndex::contains(&state, "Uni", "1", &digest('a')).expect("contains"));
        assert!(!MetaIndex::contains(&state, "Uni", "2", &digest('a')).expect("contains"));
        assert!(!MetaIndex::contains(&state, "Other", "1", &digest('a')).expect("contains"));
    }

    #[test]
    fn key_prefix_stops_at_first_gap() {
        let selector = Selector::new().owner("Uni").hash_value(digest('a'));
        assert_eq!(selector.key_prefix(), "\u{0}heiID\u{0}Uni\u{0}");
    }

    #[test]
    fn query_string_uses_stored_field_names() {
        let selector = Selector::new()
            .owner("Uni")
            .relation(Relation::StudentProfile)
            .student_id("7");
        assert_eq!(
            selector.to_query_string(),
            r#"{"selector":{"owner":"Uni","relation":"StudentProfile","student_id":"7"}}"#
        );
    }
}
