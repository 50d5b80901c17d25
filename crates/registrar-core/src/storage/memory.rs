//! In-memory world state.

use super::{StateReader, StateRows, WorldState, WriteSet};
use crate::RegistrarError;
use std::collections::BTreeMap;

/// Volatile world state backed by a `BTreeMap`.
///
/// Commits apply the whole write set at once, so a commit is never
/// observed half-applied.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateReader for MemoryState {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, RegistrarError> {
        Ok(self.entries.get(key).cloned())
    }

    fn scan_prefix(&self, prefix: &str) -> Result<StateRows, RegistrarError> {
        Ok(self
            .entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

impl WorldState for MemoryState {
    fn commit(&mut self, writes: WriteSet) -> Result<(), RegistrarError> {
        for (key, value) in writes.iter() {
            self.entries.insert(key.to_string(), value.to_vec());
        }
        Ok(())
    }

    fn entry_count(&self) -> Result<usize, RegistrarError> {
        Ok(self.entries.len())
    }
}
