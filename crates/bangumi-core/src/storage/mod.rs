//! # Status Persistence
//!
//! The registry never talks to a database directly. It loads and writes
//! statuses through the [`StatusStore`] trait, so the engine can run against
//! the embedded redb store, the in-memory store, or any remote service.

pub mod redb_status;

pub use redb_status::RedbStatusStore;

use crate::{ExplorerError, Status, SubjectId};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Durable key-value persistence for subject statuses.
///
/// Writes are last-write-wins; storing the same value twice is harmless.
pub trait StatusStore: Send + Sync {
    /// Read every persisted status.
    fn load(&self) -> Result<Vec<(SubjectId, Status)>, ExplorerError>;

    /// Persist one status. `None` removes the entry.
    fn store(&self, id: SubjectId, status: Option<Status>) -> Result<(), ExplorerError>;

    /// Replace the whole persisted set.
    fn replace_all(&self, entries: &[(SubjectId, Status)]) -> Result<(), ExplorerError> {
        for (id, _) in self.load()? {
            if !entries.iter().any(|(keep, _)| *keep == id) {
                self.store(id, None)?;
            }
        }
        for (id, status) in entries {
            self.store(*id, Some(*status))?;
        }
        Ok(())
    }
}

/// In-memory store for tests and ephemeral sessions.
///
/// Writes can be switched to fail to exercise rollback paths.
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    entries: Mutex<BTreeMap<SubjectId, Status>>,
    failing: AtomicBool,
}

impl MemoryStatusStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-filled with entries.
    pub fn with_entries(entries: impl IntoIterator<Item = (SubjectId, Status)>) -> Self {
        Self {
            entries: Mutex::new(entries.into_iter().collect()),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `load` and `store` fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), ExplorerError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ExplorerError::IoError(
                "status store unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<SubjectId, Status>>, ExplorerError> {
        self.entries
            .lock()
            .map_err(|_| ExplorerError::IoError("status store lock poisoned".to_string()))
    }
}

impl StatusStore for MemoryStatusStore {
    fn load(&self) -> Result<Vec<(SubjectId, Status)>, ExplorerError> {
        self.check()?;
        Ok(self.lock()?.iter().map(|(id, s)| (*id, *s)).collect())
    }

    fn store(&self, id: SubjectId, status: Option<Status>) -> Result<(), ExplorerError> {
        self.check()?;
        let mut entries = self.lock()?;
        match status {
            Some(status) => {
                entries.insert(id, status);
            }
            None => {
                entries.remove(&id);
            }
        }
        Ok(())
    }
}
