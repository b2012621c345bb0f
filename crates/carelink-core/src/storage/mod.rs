//! # Storage Backends
//!
//! Identifier-keyed document storage for the six record kinds.
//!
//! Backends only move opaque postcard documents. Typing, id assignment and
//! ordering live in [`EntityStore`](crate::EntityStore).
//!
//! - `MemoryStore`: ordered in-memory maps (fast, volatile)
//! - `RedbStore`: redb embedded database (ACID, persistent)

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::{CareError, EntityKind};

// =============================================================================
// RECORDSTORE TRAIT
// =============================================================================

/// Raw document access shared by every backend.
///
/// Each call is atomic for the single document it touches. There are no
/// transactions spanning kinds or records.
pub trait RecordStore {
    /// Fetch one document. A miss is `Ok(None)`.
    fn get_raw(&self, kind: EntityKind, id: &str) -> Result<Option<Vec<u8>>, CareError>;

    /// Every document of a kind, in backend order.
    fn scan_raw(&self, kind: EntityKind) -> Result<Vec<Vec<u8>>, CareError>;

    /// Insert or overwrite one document.
    fn put_raw(&mut self, kind: EntityKind, id: &str, document: &[u8]) -> Result<(), CareError>;

    /// Number of documents of a kind.
    fn count(&self, kind: EntityKind) -> Result<usize, CareError>;
}

// =============================================================================
// BACKEND DISPATCH
// =============================================================================

/// Storage backend selected at startup.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory maps (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

// NOTE: StorageBackend does NOT implement Clone.
// RedbStore holds a database handle that cannot be safely duplicated.

impl RecordStore for StorageBackend {
    fn get_raw(&self, kind: EntityKind, id: &str) -> Result<Option<Vec<u8>>, CareError> {
        match self {
            Self::InMemory(s) => s.get_raw(kind, id),
            Self::Persistent(s) => s.get_raw(kind, id),
        }
    }

    fn scan_raw(&self, kind: EntityKind) -> Result<Vec<Vec<u8>>, CareError> {
        match self {
            Self::InMemory(s) => s.scan_raw(kind),
            Self::Persistent(s) => s.scan_raw(kind),
        }
    }

    fn put_raw(&mut self, kind: EntityKind, id: &str, document: &[u8]) -> Result<(), CareError> {
        match self {
            Self::InMemory(s) => s.put_raw(kind, id, document),
            Self::Persistent(s) => s.put_raw(kind, id, document),
        }
    }

    fn count(&self, kind: EntityKind) -> Result<usize, CareError> {
        match self {
            Self::InMemory(s) => s.count(kind),
            Self::Persistent(s) => s.count(kind),
        }
    }
}
