//! # World State
//!
//! The key-value boundary between the Registrar CORE and its host store.
//!
//! - `StateReader`: exact lookup plus ordered prefix scans.
//! - `WorldState`: a reader that commits a `WriteSet` atomically.
//! - `Transaction`: buffers one operation's writes and reads through them.
//!
//! ## Storage Backends
//!
//! - `MemoryState`: `BTreeMap` in memory (fast, volatile)
//! - `RedbState`: disk-backed via redb (ACID, persistent)
//! - `StateBackend`: runtime choice between the two
//!
//! Both key families live in one key space: data records under their hex
//! digest, meta entries under composite keys starting with U+0000.

mod memory;
mod redb_state;

pub use memory::MemoryState;
pub use redb_state::RedbState;

use crate::RegistrarError;
use std::path::Path;

/// Ordered key/value rows returned by a prefix scan.
pub type StateRows = Vec<(String, Vec<u8>)>;

// =============================================================================
// TRAITS
// =============================================================================

/// Read access to the world state.
pub trait StateReader {
    /// Exact lookup. `Ok(None)` when the key is absent.
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, RegistrarError>;

    /// All rows whose key starts with `prefix`, in ascending key order.
    fn scan_prefix(&self, prefix: &str) -> Result<StateRows, RegistrarError>;
}

/// A store that accepts atomic commits.
pub trait WorldState: StateReader {
    /// Apply every write of the set, in order, as one unit.
    ///
    /// On error nothing of the set may be visible to later readers.
    fn commit(&mut self, writes: WriteSet) -> Result<(), RegistrarError>;

    /// Total number of keys held.
    fn entry_count(&self) -> Result<usize, RegistrarError>;
}

// =============================================================================
// WRITE SET
// =============================================================================

/// Writes of one operation, in program order.
#[derive(Debug, Clone, Default)]
pub struct WriteSet {
    writes: Vec<(String, Vec<u8>)>,
}

impl WriteSet {
    /// Create an empty write set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an upsert. A later write to the same key supersedes earlier ones.
    pub fn put(&mut self, key: impl Into<String>, value: Vec<u8>) {
        self.writes.push((key.into(), value));
    }

    /// Latest pending value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.writes
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    /// Iterate writes in program order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.writes.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

// =============================================================================
// TRANSACTION
// =============================================================================

/// One operation's view of the world state.
///
/// Reads see the committed state overlaid with this transaction's own
/// pending writes. Nothing reaches the store until [`Transaction::commit`].
/// Dropping a transaction discards its writes.
pub struct Transaction<'a, S: WorldState + ?Sized> {
    state: &'a mut S,
    writes: WriteSet,
}

impl<'a, S: WorldState + ?Sized> Transaction<'a, S> {
    /// Begin a transaction against `state`.
    pub fn begin(state: &'a mut S) -> Self {
        Self {
            state,
            writes: WriteSet::new(),
        }
    }

    /// Stage an upsert.
    pub fn put_state(&mut self, key: impl Into<String>, value: Vec<u8>) {
        self.writes.put(key, value);
    }

    /// Number of staged writes.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.writes.len()
    }

    /// Commit every staged write as one unit.
    pub fn commit(self) -> Result<(), RegistrarError> {
        if self.writes.is_empty() {
            return Ok(());
        }
        self.state.commit(self.writes)
    }
}

impl<S: WorldState + ?Sized> StateReader for Transaction<'_, S> {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, RegistrarError> {
        if let Some(pending) = self.writes.get(key) {
            return Ok(Some(pending.to_vec()));
        }
        self.state.get_state(key)
    }

    fn scan_prefix(&self, prefix: &str) -> Result<StateRows, RegistrarError> {
        let committed = self.state.scan_prefix(prefix)?;
        if self.writes.is_empty() {
            return Ok(committed);
        }
        let mut merged: std::collections::BTreeMap<String, Vec<u8>> =
            committed.into_iter().collect();
        for (key, value) in self.writes.iter() {
            if key.starts_with(prefix) {
                merged.insert(key.to_string(), value.to_vec());
            }
        }
        Ok(merged.into_iter().collect())
    }
}

// =============================================================================
// STATE BACKEND
// =============================================================================

/// Storage backend selected at runtime.
#[derive(Debug)]
pub enum StateBackend {
    /// In-memory state (fast, volatile).
    InMemory(MemoryState),
    /// Disk-backed state using redb (ACID, persistent).
    Persistent(RedbState),
}

impl Default for StateBackend {
    fn default() -> Self {
        Self::InMemory(MemoryState::new())
    }
}

impl StateBackend {
    /// Open or create a redb-backed state at `path`.
    pub fn open_redb(path: impl AsRef<Path>) -> Result<Self, RegistrarError> {
        Ok(Self::Persistent(RedbState::open(path)?))
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, StateBackend::Persistent(_))
    }

    /// Compact the redb file. In-memory state has nothing to compact.
    pub fn compact(&mut self) -> Result<bool, RegistrarError> {
        match self {
            StateBackend::InMemory(_) => Ok(false),
            StateBackend::Persistent(s) => {
                s.compact()?;
                Ok(true)
            }
        }
    }
}

impl StateReader for StateBackend {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, RegistrarError> {
        match self {
            StateBackend::InMemory(s) => s.get_state(key),
            StateBackend::Persistent(s) => s.get_state(key),
        }
    }

    fn scan_prefix(&self, prefix: &str) -> Result<StateRows, RegistrarError> {
        match self {
            StateBackend::InMemory(s) => s.scan_prefix(prefix),
            StateBackend::Persistent(s) => s.scan_prefix(prefix),
        }
    }
}

impl WorldState for StateBackend {
    fn commit(&mut self, writes: WriteSet) -> Result<(), RegistrarError> {
        match self {
            StateBackend::InMemory(s) => s.commit(writes),
            StateBackend::Persistent(s) => s.commit(writes),
        }
    }

    fn entry_count(&self) -> Result<usize, RegistrarError> {
        match self {
            StateBackend::InMemory(s) => s.entry_count(),
            StateBackend::Persistent(s) => s.entry_count(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_set_latest_value_wins() {
        let mut writes = WriteSet::new();
        writes.put("k", b"one".to_vec());
        writes.put("k", b"two".to_vec());
        assert_eq!(writes.get("k"), Some(&b"two"[..]));
        assert_eq!(writes.len(), 2);
    }

    #[test]
    fn transaction_reads_its_own_writes() {
        let mut state = MemoryState::new();
        let mut tx = Transaction::begin(&mut state);
        tx.put_state("a", b"1".to_vec());
        assert_eq!(tx.get_state("a").expect("get"), Some(b"1".to_vec()));
        assert_eq!(tx.get_state("b").expect("get"), None);
    }

    #[test]
    fn dropped_transaction_leaves_no_trace() {
        let mut state = MemoryState::new();
        {
            let mut tx = Transaction::begin(&mut state);
            tx.put_state("a", b"1".to_vec());
        }
        assert_eq!(state.get_state("a").expect("get"), None);
        assert_eq!(state.entry_count().expect("count"), 0);
    }

    #[test]
    fn transaction_scan_merges_pending_in_key_order() {
        let mut state = MemoryState::new();
        let mut seed = WriteSet::new();
        seed.put("p/b", b"committed".to_vec());
        seed.put("q/x", b"other".to_vec());
        state.commit(seed).expect("commit");

        let mut tx = Transaction::begin(&mut state);
        tx.put_state("p/a", b"pending".to_vec());
        tx.put_state("p/b", b"overwritten".to_vec());

        let rows = tx.scan_prefix("p/").expect("scan");
        let keys: Vec<&str> = rows.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["p/a", "p/b"]);
        assert_eq!(rows[1].1, b"overwritten".to_vec());
    }

    #[test]
    fn backend_defaults_to_memory() {
        let mut backend = StateBackend::default();
        assert!(!backend.is_persistent());
        assert!(!backend.compact().expect("compact"));
    }
}
