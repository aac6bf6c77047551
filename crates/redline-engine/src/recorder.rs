//! Change recorder
//!
//! Turns edit deltas from the editor integration into pending, manual change
//! records. Deltas arrive pre-computed; the recorder only validates and
//! persists them.

use crate::collection::{run_commit, ChangeCollection};
use crate::error::TrackingError;
use crate::store::ChangeStore;
use redline_model::{Actor, ChangeContext, ChangeRecord, EditDelta, Origin};
use std::sync::Arc;

/// Records manual edits
#[derive(Clone)]
pub struct ChangeRecorder {
    store: Arc<dyn ChangeStore>,
    max_snapshot_len: usize,
}

impl ChangeRecorder {
    /// Create new recorder
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn ChangeStore>, max_snapshot_len: usize) -> Self {
        Self {
            store,
            max_snapshot_len,
        }
    }

    /// Snapshot size limit
    #[inline]
    #[must_use]
    pub fn max_snapshot_len(&self) -> usize {
        self.max_snapshot_len
    }

    /// Record one edit
    ///
    /// # Returns
    /// The created record (pending, manual), already appended to `collection`
    ///
    /// # Errors
    /// - `TrackingError::Validation` if the delta is malformed or targets
    ///   another collection
    /// - `TrackingError::Persistence` if the store rejects the append
    pub async fn record_change(
        &self,
        collection: &Arc<ChangeCollection>,
        delta: EditDelta,
        actor: Actor,
        context: &ChangeContext,
    ) -> Result<ChangeRecord, TrackingError> {
        ensure_target(collection, context)?;

        let change_type = delta.change_type;
        let (range, content, metadata) = delta.validate(self.max_snapshot_len).map_err(|e| {
            tracing::warn!("Rejected {} delta on {}: {}", change_type, context.key, e);
            TrackingError::from(e)
        })?;

        let record = ChangeRecord::pending(context, actor, content, range, Origin::Manual, metadata);
        self.append(collection, record).await
    }

    /// Persist a new record, then add it to the collection
    ///
    /// Nothing reaches the collection if the store fails. Once the store call
    /// starts, the push happens even if the caller is cancelled.
    pub(crate) async fn append(
        &self,
        collection: &Arc<ChangeCollection>,
        record: ChangeRecord,
    ) -> Result<ChangeRecord, TrackingError> {
        let store = self.store.clone();
        let collection = collection.clone();

        run_commit(async move {
            let _guard = collection.write_guard().await;

            store.append(&record).await.map_err(|e| {
                tracing::warn!("Store refused change {}: {}", record.id, e);
                TrackingError::from(e)
            })?;
            collection.push(record.clone());

            tracing::info!(
                "Recorded {} change {} on {} by {} ({:?})",
                record.change_type(),
                record.id,
                record.key,
                record.actor.id,
                record.origin.kind()
            );
            Ok(record)
        })
        .await
    }
}

impl std::fmt::Debug for ChangeRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeRecorder")
            .field("max_snapshot_len", &self.max_snapshot_len)
            .finish_non_exhaustive()
    }
}

/// Reject contexts addressed to a different document field
pub(crate) fn ensure_target(
    collection: &ChangeCollection,
    context: &ChangeContext,
) -> Result<(), TrackingError> {
    if &context.key != collection.key() {
        return Err(TrackingError::validation(format!(
            "change targets {} but collection tracks {}",
            context.key,
            collection.key()
        )));
    }
    Ok(())
}
