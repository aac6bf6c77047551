//! In-memory change collections
//!
//! One [`ChangeCollection`] per document field, in creation order. Reads hand
//! out cloned snapshots; appends and transitions go through the crate-private
//! writer gate so that a transition and its persistence call happen as one
//! unit.
//!
//! A commit unit runs on its own task (see [`run_commit`]), so a caller that
//! stops waiting cannot leave the store ahead of the collection.

use crate::error::{StoreError, TrackingError};
use parking_lot::RwLock;
use redline_model::{ChangeId, ChangeRecord, DocumentKey, Resolution};
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    records: Vec<ChangeRecord>,
    positions: HashMap<ChangeId, usize>,
}

/// Ordered, append-only set of changes for one document field
#[derive(Debug)]
pub struct ChangeCollection {
    key: DocumentKey,
    inner: RwLock<Inner>,
    /// Held across a whole append or transition, including the store call
    writer: Mutex<()>,
}

impl ChangeCollection {
    /// Create empty collection
    #[inline]
    #[must_use]
    pub fn new(key: DocumentKey) -> Self {
        Self::from_records(key, Vec::new())
    }

    /// Rebuild a collection from persisted records, keeping their order
    #[must_use]
    pub fn from_records(key: DocumentKey, records: Vec<ChangeRecord>) -> Self {
        let positions = records
            .iter()
            .enumerate()
            .map(|(pos, record)| (record.id, pos))
            .collect();
        Self {
            key,
            inner: RwLock::new(Inner { records, positions }),
            writer: Mutex::new(()),
        }
    }

    /// Document field this collection tracks
    #[inline]
    #[must_use]
    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    /// Whether no change was recorded yet
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every record, in creation order
    #[must_use]
    pub fn snapshot(&self) -> Vec<ChangeRecord> {
        self.inner.read().records.clone()
    }

    /// Copy of one record
    #[must_use]
    pub fn get(&self, id: ChangeId) -> Option<ChangeRecord> {
        let inner = self.inner.read();
        inner.positions.get(&id).map(|&pos| inner.records[pos].clone())
    }

    /// Whether the collection holds `id`
    #[inline]
    #[must_use]
    pub fn contains(&self, id: ChangeId) -> bool {
        self.inner.read().positions.contains_key(&id)
    }

    /// Ids of every record, in creation order
    #[must_use]
    pub fn ids(&self) -> Vec<ChangeId> {
        self.inner.read().records.iter().map(|r| r.id).collect()
    }

    /// Wait for exclusive write access
    pub(crate) async fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().await
    }

    /// Append a record; caller holds the writer gate
    pub(crate) fn push(&self, record: ChangeRecord) {
        debug_assert_eq!(record.key, self.key, "record appended to wrong collection");
        let mut inner = self.inner.write();
        let pos = inner.records.len();
        inner.positions.insert(record.id, pos);
        inner.records.push(record);
    }

    /// Resolve a pending record; caller holds the writer gate
    ///
    /// # Errors
    /// - `TrackingError::NotFound` if `id` is not in this collection
    /// - `TrackingError::AlreadyResolved` if the record is terminal
    pub(crate) fn resolve(
        &self,
        id: ChangeId,
        resolution: Resolution,
    ) -> Result<ChangeRecord, TrackingError> {
        let mut inner = self.inner.write();
        let pos = *inner.positions.get(&id).ok_or(TrackingError::NotFound(id))?;
        let record = &mut inner.records[pos];
        record
            .resolve(resolution)
            .map_err(|status| TrackingError::AlreadyResolved { id, status })?;
        Ok(record.clone())
    }
}

/// Run a commit unit to completion on its own task
///
/// The unit finishes even if the returned future is dropped. A panic inside
/// the unit is resumed on the caller.
///
/// # Errors
/// The unit's own error, or `TrackingError::Persistence` if the runtime
/// cancelled the task
pub(crate) async fn run_commit<T, U>(unit: U) -> Result<T, TrackingError>
where
    T: Send + 'static,
    U: Future<Output = Result<T, TrackingError>> + Send + 'static,
{
    match tokio::spawn(unit).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => {
            tracing::error!("Commit task did not finish: {}", e);
            Err(TrackingError::Persistence(StoreError::Unavailable(
                "commit task cancelled".into(),
            )))
        }
    }
}
