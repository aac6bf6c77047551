//! Change lifecycle manager
//!
//! The single authority for `pending -> accepted | rejected`. Origin-agnostic:
//! manual changes come here directly, AI suggestions come through the
//! reconciler, which adds the document mutation.
//!
//! A transition is committed in this order, under the collection's writer
//! gate:
//!
//! 1. permission and state gates
//! 2. store `update_status`
//! 3. caller's commit hook (document mutation)
//! 4. in-memory status
//!
//! A failure in 1 or 2 leaves both content and status untouched. Steps 2 to 4
//! run as one spawned unit, so they complete together once started even if
//! the caller is cancelled.

use crate::collection::{run_commit, ChangeCollection};
use crate::error::{ConfigError, TrackingError};
use crate::store::ChangeStore;
use chrono::Utc;
use redline_model::{ChangeId, ChangeRecord, Resolution, Reviewer, Role, Verdict};
use std::sync::Arc;

/// Owns review transitions and the reviewer gate
#[derive(Clone)]
pub struct LifecycleManager {
    store: Arc<dyn ChangeStore>,
    min_review_role: Role,
}

impl LifecycleManager {
    /// Create new manager
    ///
    /// # Errors
    /// Returns `ConfigError::ReviewRoleTooLow` if `min_review_role` may not
    /// review changes
    pub fn new(store: Arc<dyn ChangeStore>, min_review_role: Role) -> Result<Self, ConfigError> {
        if !min_review_role.can_review() {
            return Err(ConfigError::ReviewRoleTooLow(min_review_role));
        }
        Ok(Self {
            store,
            min_review_role,
        })
    }

    /// Lowest role allowed to resolve changes
    #[inline]
    #[must_use]
    pub fn min_review_role(&self) -> Role {
        self.min_review_role
    }

    /// Check the reviewer gate
    ///
    /// # Errors
    /// Returns `TrackingError::PermissionDenied` naming the required role
    pub fn check_permission(&self, reviewer: &Reviewer) -> Result<(), TrackingError> {
        if reviewer.role >= self.min_review_role {
            return Ok(());
        }
        tracing::warn!(
            "Reviewer {} with role {} denied; requires {}",
            reviewer.id,
            reviewer.role,
            self.min_review_role
        );
        Err(TrackingError::PermissionDenied {
            role: reviewer.role,
            required: self.min_review_role,
        })
    }

    /// Accept a pending change
    ///
    /// # Errors
    /// - `TrackingError::PermissionDenied` if the reviewer's role is too low
    /// - `TrackingError::NotFound` if `id` is not in `collection`
    /// - `TrackingError::AlreadyResolved` if the change is terminal
    /// - `TrackingError::Persistence` if the store rejects the update
    pub async fn accept_change(
        &self,
        collection: &Arc<ChangeCollection>,
        id: ChangeId,
        reviewer: &Reviewer,
    ) -> Result<ChangeRecord, TrackingError> {
        self.resolve_with(collection, id, Verdict::Accepted, reviewer, |_| {})
            .await
    }

    /// Reject a pending change
    ///
    /// # Errors
    /// Same as [`LifecycleManager::accept_change`]
    pub async fn reject_change(
        &self,
        collection: &Arc<ChangeCollection>,
        id: ChangeId,
        reviewer: &Reviewer,
    ) -> Result<ChangeRecord, TrackingError> {
        self.resolve_with(collection, id, Verdict::Rejected, reviewer, |_| {})
            .await
    }

    /// Resolve a change, running `on_commit` once the transition is durable
    ///
    /// Concurrent resolutions of one change are serialized by the collection's
    /// writer gate: the first wins, later ones fail `AlreadyResolved`.
    pub(crate) async fn resolve_with<F>(
        &self,
        collection: &Arc<ChangeCollection>,
        id: ChangeId,
        verdict: Verdict,
        reviewer: &Reviewer,
        on_commit: F,
    ) -> Result<ChangeRecord, TrackingError>
    where
        F: FnOnce(&ChangeRecord) + Send + 'static,
    {
        self.check_permission(reviewer)?;

        let store = self.store.clone();
        let collection = collection.clone();
        let by = reviewer.id.clone();

        run_commit(async move {
            let _guard = collection.write_guard().await;

            let record = collection.get(id).ok_or(TrackingError::NotFound(id))?;
            if !record.is_pending() {
                tracing::warn!("Refused to resolve {} again (already {})", id, record.status());
                return Err(TrackingError::AlreadyResolved {
                    id,
                    status: record.status(),
                });
            }

            let resolution = Resolution {
                verdict,
                by: by.clone(),
                at: Utc::now(),
            };

            store
                .update_status(collection.key(), id, &resolution)
                .await
                .map_err(|e| {
                    tracing::warn!("Store refused resolution of {}: {}", id, e);
                    TrackingError::from(e)
                })?;

            on_commit(&record);
            let resolved = collection.resolve(id, resolution)?;

            tracing::info!(
                "Change {} on {} {} by {}",
                id,
                collection.key(),
                resolved.status(),
                by
            );
            Ok(resolved)
        })
        .await
    }
}

impl std::fmt::Debug for LifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleManager")
            .field("min_review_role", &self.min_review_role)
            .finish_non_exhaustive()
    }
}
