//! # redb-backed Record Storage
//!
//! A disk-backed document store using the redb embedded database, providing:
//! - ACID transactions (one per call)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Each entity kind has its own table mapping the record id to its postcard
//! document.

use super::RecordStore;
use crate::{CareError, EntityKind};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

/// Table for users: id -> serialized User
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Table for vital signs: id -> serialized VitalSigns
const VITAL_SIGNS: TableDefinition<&str, &[u8]> = TableDefinition::new("vital_signs");

/// Table for daily tips: id -> serialized DailyTip
const DAILY_TIPS: TableDefinition<&str, &[u8]> = TableDefinition::new("daily_tips");

/// Table for emergency alerts: id -> serialized EmergencyAlert
const EMERGENCY_ALERTS: TableDefinition<&str, &[u8]> = TableDefinition::new("emergency_alerts");

/// Table for symptom checklists: id -> serialized Symptom
const SYMPTOMS: TableDefinition<&str, &[u8]> = TableDefinition::new("symptoms");

/// Table for medical conditions: id -> serialized MedicalCondition
const MEDICAL_CONDITIONS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("medical_conditions");

/// Map a kind to its table.
const fn table_for(kind: EntityKind) -> TableDefinition<'static, &'static str, &'static [u8]> {
    match kind {
        EntityKind::User => USERS,
        EntityKind::VitalSigns => VITAL_SIGNS,
        EntityKind::DailyTip => DAILY_TIPS,
        EntityKind::EmergencyAlert => EMERGENCY_ALERTS,
        EntityKind::Symptom => SYMPTOMS,
        EntityKind::MedicalCondition => MEDICAL_CONDITIONS,
    }
}

fn io_err(e: impl std::fmt::Display) -> CareError {
    CareError::Storage(e.to_string())
}

/// A disk-backed record store using redb.
pub struct RedbStore {
    /// The redb database handle.
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a record database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CareError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            for kind in EntityKind::ALL {
                let _ = write_txn.open_table(table_for(kind)).map_err(io_err)?;
            }
            write_txn.commit().map_err(io_err)?;
        }

        Ok(Self { db })
    }
}

// =============================================================================
// RECORDSTORE TRAIT IMPLEMENTATION
// =============================================================================

impl RecordStore for RedbStore {
    fn get_raw(&self, kind: EntityKind, id: &str) -> Result<Option<Vec<u8>>, CareError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(table_for(kind)).map_err(io_err)?;
        Ok(table
            .get(id)
            .map_err(io_err)?
            .map(|guard| guard.value().to_vec()))
    }

    fn scan_raw(&self, kind: EntityKind) -> Result<Vec<Vec<u8>>, CareError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(table_for(kind)).map_err(io_err)?;

        let mut documents = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_, value) = entry.map_err(io_err)?;
            documents.push(value.value().to_vec());
        }
        Ok(documents)
    }

    fn put_raw(&mut self, kind: EntityKind, id: &str, document: &[u8]) -> Result<(), CareError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(table_for(kind)).map_err(io_err)?;
            table.insert(id, document).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn count(&self, kind: EntityKind) -> Result<usize, CareError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(table_for(kind)).map_err(io_err)?;
        let len = table.len().map_err(io_err)?;
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

    #[test]
    fn open_creates_empty_tables() {
        let dir = tempdir().expect("tempdir");
        let store = RedbStore::open(dir.path().join("care.redb")).expect("open");

        for kind in EntityKind::ALL {
            assert_eq!(store.count(kind).expect("count"), 0);
        }
    }

    #[test]
    fn documents_persist_across_reopen() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("care.redb");

        {
            let mut store = RedbStore::open(&path).expect("open");
            store
                .put_raw(EntityKind::EmergencyAlert, "a1", b"help")
                .expect("put");
        }

        let store = RedbStore::open(&path).expect("reopen");
        assert_eq!(
            store
                .get_raw(EntityKind::EmergencyAlert, "a1")
                .expect("get"),
            Some(b"help".to_vec())
        );
        assert_eq!(store.count(EntityKind::EmergencyAlert).expect("count"), 1);
    }

    #[test]
    fn missing_id_is_none() {
        let dir = tempdir().expect("tempdir");
        let store = RedbStore::open(dir.path().join("care.redb")).expect("open");
        assert!(
            store
                .get_raw(EntityKind::User, "nobody")
                .expect("get")
                .is_none()
        );
    }

    #[test]
    fn scan_returns_every_document_of_kind() {
        let dir = tempdir().expect("tempdir");
        let mut store = RedbStore::open(dir.path().join("care.redb")).expect("open");
        store.put_raw(EntityKind::Symptom, "s1", b"one").expect("put");
        store.put_raw(EntityKind::Symptom, "s2", b"two").expect("put");
        store.put_raw(EntityKind::User, "u1", b"user").expect("put");

        let docs = store.scan_raw(EntityKind::Symptom).expect("scan");
        assert_eq!(docs.len(), 2);
    }
}
