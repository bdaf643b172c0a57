//! # redb-backed Status Storage
//!
//! Persists the status registry in an embedded redb database: one table
//! mapping a subject id to its status code. Every write is its own ACID
//! transaction, so a crash never leaves a half-written status.

use super::StatusStore;
use crate::{ExplorerError, Status, SubjectId};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

/// Table for statuses: SubjectId(u64) -> Status code (u8)
const STATUSES: TableDefinition<u64, u8> = TableDefinition::new("statuses");

fn io_err(e: impl std::fmt::Display) -> ExplorerError {
    ExplorerError::IoError(e.to_string())
}

/// A disk-backed status store.
pub struct RedbStatusStore {
    db: Database,
}

impl std::fmt::Debug for RedbStatusStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStatusStore").finish_non_exhaustive()
    }
}

impl RedbStatusStore {
    /// Open or create a status database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ExplorerError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Create the table so that a fresh database reads as empty.
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(STATUSES).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        Ok(Self { db })
    }

    /// Number of persisted statuses.
    pub fn len(&self) -> Result<usize, ExplorerError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(STATUSES).map_err(io_err)?;
        Ok(table.len().map_err(io_err)? as usize)
    }

    /// Check if nothing is persisted.
    pub fn is_empty(&self) -> Result<bool, ExplorerError> {
        Ok(self.len()? == 0)
    }
}

impl StatusStore for RedbStatusStore {
    fn load(&self) -> Result<Vec<(SubjectId, Status)>, ExplorerError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(STATUSES).map_err(io_err)?;

        let mut entries = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (key, value) = entry.map_err(io_err)?;
            match Status::from_code(value.value()) {
                Some(status) => entries.push((SubjectId(key.value()), status)),
                None => tracing::warn!(
                    id = key.value(),
                    code = value.value(),
                    "Skipping unknown status code"
                ),
            }
        }
        Ok(entries)
    }

    fn store(&self, id: SubjectId, status: Option<Status>) -> Result<(), ExplorerError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(STATUSES).map_err(io_err)?;
            match status {
                Some(status) => {
                    table.insert(id.0, status.code()).map_err(io_err)?;
                }
                None => {
                    table.remove(id.0).map_err(io_err)?;
                }
            }
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    /// Replace every entry in a single transaction.
    fn replace_all(&self, entries: &[(SubjectId, Status)]) -> Result<(), ExplorerError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(STATUSES).map_err(io_err)?;
            let existing = table
                .iter()
                .map_err(io_err)?
                .map(|entry| entry.map(|(key, _)| key.value()))
                .collect::<Result<Vec<u64>, _>>()
                .map_err(io_err)?;
            for key in existing {
                table.remove(key).map_err(io_err)?;
            }
            for (id, status) in entries {
                table.insert(id.0, status.code()).map_err(io_err)?;
            }
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }
}
