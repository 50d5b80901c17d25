//! # redb-backed World State
//!
//! A disk-backed world state using the redb embedded database, providing:
//! - ACID transactions (one redb write transaction per commit)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Both key families share the single `world_state` table. Keys are ordered
//! byte-wise, which keeps every composite meta key of one owner contiguous.

use super::{StateReader, StateRows, WorldState, WriteSet};
use crate::RegistrarError;
use crate::types::backend_err;
use redb::{Database, ReadableDatabase, ReadableTableMetadata, TableDefinition};
use std::path::Path;

/// Table for the whole key space: key string -> JSON payload bytes
const WORLD_STATE: TableDefinition<&str, &[u8]> = TableDefinition::new("world_state");

/// A disk-backed world state using redb.
pub struct RedbState {
    /// The redb database handle.
    db: Database,
}

impl std::fmt::Debug for RedbState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbState").finish_non_exhaustive()
    }
}

impl RedbState {
    /// Open or create a world state database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RegistrarError> {
        let db = Database::create(path.as_ref()).map_err(backend_err)?;

        // Initialize the table so read transactions can always open it
        {
            let write_txn = db.begin_write().map_err(backend_err)?;
            let _ = write_txn.open_table(WORLD_STATE).map_err(backend_err)?;
            write_txn.commit().map_err(backend_err)?;
        }

        Ok(Self { db })
    }

    /// Compact the database file, reclaiming space freed by overwrites.
    pub fn compact(&mut self) -> Result<(), RegistrarError> {
        self.db.compact().map_err(backend_err)?;
        Ok(())
    }
}

impl StateReader for RedbState {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, RegistrarError> {
        let read_txn = self.db.begin_read().map_err(backend_err)?;
        let table = read_txn.open_table(WORLD_STATE).map_err(backend_err)?;
        Ok(table
            .get(key)
            .map_err(backend_err)?
            .map(|v| v.value().to_vec()))
    }

    fn scan_prefix(&self, prefix: &str) -> Result<StateRows, RegistrarError> {
        let read_txn = self.db.begin_read().map_err(backend_err)?;
        let table = read_txn.open_table(WORLD_STATE).map_err(backend_err)?;

        let mut rows = Vec::new();
        for entry in table.range(prefix..).map_err(backend_err)? {
            let (key, value) = entry.map_err(backend_err)?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            rows.push((key.to_string(), value.value().to_vec()));
        }
        Ok(rows)
    }
}

impl WorldState for RedbState {
    fn commit(&mut self, writes: WriteSet) -> Result<(), RegistrarError> {
        let write_txn = self.db.begin_write().map_err(backend_err)?;
        {
            let mut table = write_txn.open_table(WORLD_STATE).map_err(backend_err)?;
            for (key, value) in writes.iter() {
                table.insert(key, value).map_err(backend_err)?;
            }
        }
        // An error before this point aborts the redb transaction on drop
        write_txn.commit().map_err(backend_err)
    }

    fn entry_count(&self) -> Result<usize, RegistrarError> {
        let read_txn = self.db.begin_read().map_err(backend_err)?;
        let table = read_txn.open_table(WORLD_STATE).map_err(backend_err)?;
        let len = table.len().map_err(backend_err)?;
        Ok(len as usize)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn writes(pairs: &[(&str, &str)]) -> WriteSet {
        let mut set = WriteSet::new();
        for (k, v) in pairs {
            set.put(*k, v.as_bytes().to_vec());
        }
        set
    }

    #[test]
    fn basic_get_put() {
        let temp = tempdir().expect("temp dir");
        let mut state = RedbState::open(temp.path().join("test.redb")).expect("open db");

        state.commit(writes(&[("k", "v")])).expect("commit");
        assert_eq!(state.get_state("k").expect("get"), Some(b"v".to_vec()));
        assert_eq!(state.get_state("missing").expect("get"), None);
    }

    #[test]
    fn scan_prefix_is_ordered_and_bounded() {
        let temp = tempdir().expect("temp dir");
        let mut state = RedbState::open(temp.path().join("test.redb")).expect("open db");

        state
            .commit(writes(&[
                ("\u{0}heiID\u{0}B\u{0}2", "b2"),
                ("\u{0}heiID\u{0}B\u{0}1", "b1"),
                ("\u{0}heiID\u{0}C\u{0}1", "c1"),
                ("ffff", "data"),
            ]))
            .expect("commit");

        let rows = state.scan_prefix("\u{0}heiID\u{0}B\u{0}").expect("scan");
        let values: Vec<&[u8]> = rows.iter().map(|(_, v)| v.as_slice()).collect();
        assert_eq!(values, vec![&b"b1"[..], &b"b2"[..]]);
    }

    #[test]
    fn persistence_after_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        {
            let mut state = RedbState::open(&db_path).expect("open db");
            state
                .commit(writes(&[("a", "1"), ("b", "2")]))
                .expect("commit");
        }

        let state = RedbState::open(&db_path).expect("reopen db");
        assert_eq!(state.entry_count().expect("count"), 2);
        assert_eq!(state.get_state("b").expect("get"), Some(b"2".to_vec()));
    }

    #[test]
    fn compact_and_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        {
            let mut state = RedbState::open(&db_path).expect("open db");
            state.commit(writes(&[("a", "1")])).expect("commit");
            state.compact().expect("compact");
        }

        let state = RedbState::open(&db_path).expect("reopen db");
        assert_eq!(state.get_state("a").expect("get"), Some(b"1".to_vec()));
    }
}
