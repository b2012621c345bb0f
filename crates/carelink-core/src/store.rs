//! # Entity Store
//!
//! Typed access to the record backends: identifier-keyed `get`, ordered
//! `find`, `insert` with generated identity, and single-record `update`.
//!
//! There is no business logic here. Validation happens in the mutation
//! engine before anything reaches this layer.

use crate::records::Entity;
use crate::storage::{MemoryStore, RecordStore, RedbStore, StorageBackend};
use crate::{CareError, EntityKind, RecordId};
use chrono::{DateTime, TimeDelta, Utc};
use std::path::Path;

/// Typed facade over a [`StorageBackend`].
///
/// Creation timestamps issued by one store are strictly increasing, so
/// newest-first ordering never depends on ties.
#[derive(Debug, Default)]
pub struct EntityStore {
    backend: StorageBackend,
    last_stamp: Option<DateTime<Utc>>,
}

impl EntityStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_backend(StorageBackend::InMemory(MemoryStore::new()))
    }

    /// Open or create a persistent redb store at the given path.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, CareError> {
        Ok(Self::with_backend(StorageBackend::Persistent(
            RedbStore::open(path)?,
        )))
    }

    /// Wrap an existing backend.
    #[must_use]
    pub fn with_backend(backend: StorageBackend) -> Self {
        Self {
            backend,
            last_stamp: None,
        }
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    /// Fetch a record by id. Blank ids and misses are `Ok(None)`.
    pub fn get<E: Entity>(&self, id: &RecordId) -> Result<Option<E>, CareError> {
        if id.is_blank() {
            return Ok(None);
        }
        self.backend
            .get_raw(E::KIND, id.as_str())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// Every record of a kind matching `predicate`, newest first.
    pub fn find<E: Entity>(&self, predicate: impl Fn(&E) -> bool) -> Result<Vec<E>, CareError> {
        let mut records = Vec::new();
        for bytes in self.backend.scan_raw(E::KIND)? {
            let record: E = decode(&bytes)?;
            if predicate(&record) {
                records.push(record);
            }
        }
        records.sort_by(|a, b| {
            b.timestamp()
                .cmp(&a.timestamp())
                .then_with(|| b.id().cmp(a.id()))
        });
        Ok(records)
    }

    /// Persist a new record, assigning a fresh id and the creation timestamp.
    ///
    /// Whatever id and timestamp the caller left on the record are replaced.
    pub fn insert<E: Entity>(&mut self, mut record: E) -> Result<E, CareError> {
        let id = RecordId::generate();
        let now = self.next_stamp();
        record.stamp(id, now);
        self.write(&record)?;
        Ok(record)
    }

    /// Apply `patch` to the record with the given id and persist the result.
    ///
    /// Returns `Ok(None)` when the record does not exist. If `patch` fails,
    /// nothing is written.
    pub fn update<E: Entity>(
        &mut self,
        id: &RecordId,
        patch: impl FnOnce(&mut E) -> Result<(), CareError>,
    ) -> Result<Option<E>, CareError> {
        let Some(mut record) = self.get::<E>(id)? else {
            return Ok(None);
        };
        patch(&mut record)?;
        self.write(&record)?;
        Ok(Some(record))
    }

    /// Number of stored records of a kind.
    pub fn count(&self, kind: EntityKind) -> Result<usize, CareError> {
        self.backend.count(kind)
    }

    fn write<E: Entity>(&mut self, record: &E) -> Result<(), CareError> {
        let bytes = postcard::to_allocvec(record)
            .map_err(|e| CareError::Serialization(e.to_string()))?;
        self.backend.put_raw(E::KIND, record.id().as_str(), &bytes)
    }

    /// Current time, bumped by one microsecond when the clock has not advanced
    /// past the previous stamp.
    fn next_stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }
}

fn decode<E: Entity>(bytes: &[u8]) -> Result<E, CareError> {
    postcard::from_bytes(bytes).map_err(|e| CareError::Serialization(e.to_string()))
}

// =============================================================================
// TESTS
// =============================================================================
