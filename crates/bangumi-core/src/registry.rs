//! # Status Registry
//!
//! The single source of truth for user classifications.
//!
//! Reads go through the narrow [`StatusLookup`] capability. Writes are
//! optimistic and tracked per subject:
//!
//! ```text
//! begin(id, status)  ->  Pending  --complete(Ok)-->   Confirmed
//!                           |     --complete(Err)-->  RolledBack
//!                           +-- newer begin(id) -->   Superseded
//! ```
//!
//! `begin` applies the new value immediately and returns a [`WriteTicket`].
//! When the persistence write finishes, `complete` settles the ticket. A
//! failed write restores the last confirmed value, unless a newer write for
//! the same subject was started in between (last write wins). Every failure
//! is logged and queued as a [`Notice`].

use crate::storage::StatusStore;
use crate::{ExplorerError, Status, SubjectId};
use std::collections::BTreeMap;

// =============================================================================
// LOOKUP CAPABILITY
// =============================================================================

/// Synchronous status read used by the predicate pipeline.
pub trait StatusLookup {
    /// Current status of a subject, `None` when unclassified.
    fn status(&self, id: SubjectId) -> Option<Status>;
}

impl StatusLookup for BTreeMap<SubjectId, Status> {
    fn status(&self, id: SubjectId) -> Option<Status> {
        self.get(&id).copied()
    }
}

// =============================================================================
// WRITE TRACKING
// =============================================================================

/// Handle for one optimistic write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteTicket {
    id: SubjectId,
    seq: u64,
    status: Option<Status>,
}

impl WriteTicket {
    #[must_use]
    pub fn id(&self) -> SubjectId {
        self.id
    }

    /// The value this write applies.
    #[must_use]
    pub fn status(&self) -> Option<Status> {
        self.status
    }
}

/// How a write ticket was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    /// Persisted; the optimistic value stands.
    Confirmed,
    /// Persisting failed; the previous value was restored.
    RolledBack,
    /// A newer write for the subject owns the visible value.
    Superseded,
}

/// A user-visible, non-fatal problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Subject concerned, if any.
    pub id: Option<SubjectId>,
    pub message: String,
}

impl Notice {
    pub fn new(id: Option<SubjectId>, message: impl Into<String>) -> Self {
        Self {
            id,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingWrite {
    /// Sequence number of the newest write for the subject.
    seq: u64,
    /// Value to restore if that write fails.
    rollback_to: Option<Status>,
    /// Sequence number of the write `rollback_to` came from (0 = loaded).
    rollback_seq: u64,
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Subject statuses with optimistic write tracking.
#[derive(Debug, Clone, Default)]
pub struct StatusRegistry {
    entries: BTreeMap<SubjectId, Status>,
    pending: BTreeMap<SubjectId, PendingWrite>,
    next_seq: u64,
    revision: u64,
    notices: Vec<Notice>,
}

impl StatusLookup for StatusRegistry {
    fn status(&self, id: SubjectId) -> Option<Status> {
        self.entries.get(&id).copied()
    }
}

impl StatusRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from already-confirmed entries.
    pub fn from_entries(entries: impl IntoIterator<Item = (SubjectId, Status)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Load the registry from a store.
    ///
    /// A store that cannot be read yields an empty registry and a notice.
    pub fn hydrate(store: &dyn StatusStore) -> Self {
        match store.load() {
            Ok(entries) => {
                let registry = Self::from_entries(entries);
                tracing::debug!("Loaded {} statuses", registry.len());
                registry
            }
            Err(e) => {
                tracing::warn!("Failed to load statuses, starting empty: {}", e);
                let mut registry = Self::new();
                registry.notices.push(Notice::new(
                    None,
                    format!("Saved statuses could not be loaded: {e}"),
                ));
                registry
            }
        }
    }

    /// Current status of a subject.
    #[must_use]
    pub fn get(&self, id: SubjectId) -> Option<Status> {
        self.status(id)
    }

    /// Number of classified subjects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All classified subjects in id order.
    pub fn entries(&self) -> impl Iterator<Item = (SubjectId, Status)> + '_ {
        self.entries.iter().map(|(id, status)| (*id, *status))
    }

    /// Number of subjects per status.
    #[must_use]
    pub fn counts(&self) -> BTreeMap<Status, usize> {
        let mut counts = BTreeMap::new();
        for status in self.entries.values() {
            *counts.entry(*status).or_insert(0) += 1;
        }
        counts
    }

    /// Counter bumped on every visible change.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Check if a write for the subject is still unsettled.
    #[must_use]
    pub fn is_pending(&self, id: SubjectId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Number of unsettled writes.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Take queued notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Queue a notice for the user.
    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    fn apply(&mut self, id: SubjectId, status: Option<Status>) {
        let previous = match status {
            Some(status) => self.entries.insert(id, status),
            None => self.entries.remove(&id),
        };
        if previous != status {
            self.revision += 1;
        }
    }

    // =========================================================================
    // OPTIMISTIC WRITES
    // =========================================================================

    /// Start a write: the new value is visible immediately.
    pub fn begin(&mut self, id: SubjectId, status: Option<Status>) -> WriteTicket {
        self.next_seq += 1;
        let seq = self.next_seq;

        // A write started on top of a pending one keeps the older rollback
        // target: the pending value was never confirmed.
        let (rollback_to, rollback_seq) = match self.pending.get(&id) {
            Some(pending) => (pending.rollback_to, pending.rollback_seq),
            None => (self.status(id), 0),
        };
        self.pending.insert(
            id,
            PendingWrite {
                seq,
                rollback_to,
                rollback_seq,
            },
        );
        self.apply(id, status);

        WriteTicket { id, seq, status }
    }

    /// Settle a write with the persistence outcome.
    pub fn complete(
        &mut self,
        ticket: &WriteTicket,
        outcome: Result<(), ExplorerError>,
    ) -> WriteState {
        let current = self.pending.get(&ticket.id).copied();

        match (current, outcome) {
            (Some(pending), Ok(())) if pending.seq == ticket.seq => {
                self.pending.remove(&ticket.id);
                tracing::debug!(id = %ticket.id, "Status write confirmed");
                WriteState::Confirmed
            }
            (Some(pending), Err(e)) if pending.seq == ticket.seq => {
                self.pending.remove(&ticket.id);
                self.apply(ticket.id, pending.rollback_to);
                tracing::warn!(id = %ticket.id, error = %e, "Status write failed, rolled back");
                self.notices.push(Notice::new(
                    Some(ticket.id),
                    format!("Could not save status of {}: {e}", ticket.id),
                ));
                WriteState::RolledBack
            }
            (Some(pending), Ok(())) => {
                // The newer write should fall back to this value if it fails.
                if ticket.seq > pending.rollback_seq {
                    self.pending.insert(
                        ticket.id,
                        PendingWrite {
                            rollback_to: ticket.status,
                            rollback_seq: ticket.seq,
                            ..pending
                        },
                    );
                }
                WriteState::Superseded
            }
            (_, Err(e)) => {
                tracing::warn!(id = %ticket.id, error = %e, "Superseded status write failed");
                self.notices.push(Notice::new(
                    Some(ticket.id),
                    format!("An earlier status change of {} was not saved: {e}", ticket.id),
                ));
                WriteState::Superseded
            }
            (None, Ok(())) => WriteState::Superseded,
        }
    }

    /// Write a status synchronously through a store.
    ///
    /// On failure the previous value is restored and the error returned.
    pub fn set(
        &mut self,
        id: SubjectId,
        status: Option<Status>,
        store: &dyn StatusStore,
    ) -> Result<WriteState, ExplorerError> {
        let ticket = self.begin(id, status);
        let outcome = store.store(id, status);
        let failure = outcome.as_ref().err().map(ToString::to_string);

        match (self.complete(&ticket, outcome), failure) {
            (WriteState::RolledBack, Some(reason)) => {
                Err(ExplorerError::StatusWriteFailed { id, reason })
            }
            (state, _) => Ok(state),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStatusStore;

    fn failure() -> Result<(), ExplorerError> {
        Err(ExplorerError::IoError("disk full".to_string()))
    }

    #[test]
    fn begin_is_visible_immediately() {
        let mut registry = StatusRegistry::new();
        let before = registry.revision();

        let ticket = registry.begin(SubjectId(1), Some(Status::Wishlist));

        assert_eq!(registry.get(SubjectId(1)), Some(Status::Wishlist));
        assert!(registry.is_pending(SubjectId(1)));
        assert!(registry.revision() > before);

        assert_eq!(registry.complete(&ticket, Ok(())), WriteState::Confirmed);
        assert!(!registry.is_pending(SubjectId(1)));
    }

    #[test]
    fn failed_write_restores_previous_value() {
        let mut registry = StatusRegistry::from_entries([(SubjectId(1), Status::Collected)]);

        let ticket = registry.begin(SubjectId(1), Some(Status::Ignored));
        assert_eq!(registry.complete(&ticket, failure()), WriteState::RolledBack);

        assert_eq!(registry.get(SubjectId(1)), Some(Status::Collected));
        let notices = registry.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].id, Some(SubjectId(1)));
        assert!(registry.take_notices().is_empty());
    }

    #[test]
    fn superseded_failure_does_not_roll_back() {
        let mut registry = StatusRegistry::new();

        let first = registry.begin(SubjectId(1), Some(Status::Wishlist));
        let second = registry.begin(SubjectId(1), Some(Status::Collected));

        assert_eq!(registry.complete(&first, failure()), WriteState::Superseded);
        assert_eq!(registry.get(SubjectId(1)), Some(Status::Collected));
        assert_eq!(registry.take_notices().len(), 1);

        assert_eq!(registry.complete(&second, Ok(())), WriteState::Confirmed);
        assert_eq!(registry.get(SubjectId(1)), Some(Status::Collected));
    }

    #[test]
    fn newest_failure_falls_back_to_confirmed_older_write() {
        let mut registry = StatusRegistry::new();

        let first = registry.begin(SubjectId(1), Some(Status::Wishlist));
        let second = registry.begin(SubjectId(1), Some(Status::Ignored));

        assert_eq!(registry.complete(&first, Ok(())), WriteState::Superseded);
        assert_eq!(registry.complete(&second, failure()), WriteState::RolledBack);

        assert_eq!(registry.get(SubjectId(1)), Some(Status::Wishlist));
    }

    #[test]
    fn out_of_order_confirmations_keep_newest_fallback() {
        let mut registry = StatusRegistry::new();

        let a = registry.begin(SubjectId(1), Some(Status::Wishlist));
        let b = registry.begin(SubjectId(1), Some(Status::Collected));
        let c = registry.begin(SubjectId(1), Some(Status::Ignored));

        registry.complete(&b, Ok(()));
        registry.complete(&a, Ok(()));
        registry.complete(&c, failure());

        assert_eq!(registry.get(SubjectId(1)), Some(Status::Collected));
    }

    #[test]
    fn all_failures_restore_original() {
        let mut registry = StatusRegistry::new();

        let first = registry.begin(SubjectId(7), Some(Status::Wishlist));
        let second = registry.begin(SubjectId(7), Some(Status::Collected));
        registry.complete(&first, failure());
        registry.complete(&second, failure());

        assert_eq!(registry.get(SubjectId(7)), None);
    }

    #[test]
    fn status_is_exclusive() {
        let mut registry = StatusRegistry::new();
        let store = MemoryStatusStore::new();

        for status in Status::ALL {
            registry.set(SubjectId(3), Some(status), &store).expect("set");
            assert_eq!(registry.get(SubjectId(3)), Some(status));
            assert_eq!(registry.len(), 1);
        }

        registry.set(SubjectId(3), None, &store).expect("clear");
        assert!(registry.is_empty());
        assert!(store.load().expect("load").is_empty());
    }

    #[test]
    fn sync_set_reports_failure() {
        let mut registry = StatusRegistry::new();
        let store = MemoryStatusStore::new();
        store.set_failing(true);

        let result = registry.set(SubjectId(9), Some(Status::Collected), &store);

        assert!(matches!(
            result,
            Err(ExplorerError::StatusWriteFailed { id: SubjectId(9), .. })
        ));
        assert_eq!(registry.get(SubjectId(9)), None);
    }

    #[test]
    fn hydrate_degrades_to_empty() {
        let store = MemoryStatusStore::with_entries([(SubjectId(1), Status::Collected)]);
        assert_eq!(StatusRegistry::hydrate(&store).len(), 1);

        store.set_failing(true);
        let mut registry = StatusRegistry::hydrate(&store);
        assert!(registry.is_empty());
        assert_eq!(registry.take_notices().len(), 1);
    }

    #[test]
    fn counts_per_status() {
        let registry = StatusRegistry::from_entries([
            (SubjectId(1), Status::Collected),
            (SubjectId(2), Status::Collected),
            (SubjectId(3), Status::Ignored),
        ]);
        let counts = registry.counts();
        assert_eq!(counts.get(&Status::Collected), Some(&2));
        assert_eq!(counts.get(&Status::Wishlist), None);
    }
}
