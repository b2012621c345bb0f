//! In-memory document store.

use super::RecordStore;
use crate::{CareError, EntityKind};
use std::collections::BTreeMap;

/// Volatile store keyed by kind, then id.
///
/// Uses `BTreeMap` so scans are reproducible across runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: BTreeMap<EntityKind, BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn get_raw(&self, kind: EntityKind, id: &str) -> Result<Option<Vec<u8>>, CareError> {
        Ok(self
            .documents
            .get(&kind)
            .and_then(|table| table.get(id))
            .cloned())
    }

    fn scan_raw(&self, kind: EntityKind) -> Result<Vec<Vec<u8>>, CareError> {
        Ok(self
            .documents
            .get(&kind)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default())
    }

    fn put_raw(&mut self, kind: EntityKind, id: &str, document: &[u8]) -> Result<(), CareError> {
        self.documents
            .entry(kind)
            .or_default()
            .insert(id.to_string(), document.to_vec());
        Ok(())
    }

    fn count(&self, kind: EntityKind) -> Result<usize, CareError> {
        Ok(self.documents.get(&kind).map_or(0, BTreeMap::len))
    }
}
