//! Change tracker
//!
//! Entry point for an editing host. Owns the per-field collections (a cache
//! over the [`ChangeStore`]), the collaborators and the components that act on
//! them:
//! - [`ChangeRecorder`] for manual edits
//! - [`SuggestionReconciler`] for AI rewrites
//! - [`LifecycleManager`] for review transitions
//!
//! Operations addressed by change id alone resolve the owning collection
//! through an id index filled as collections are opened or grow.

use crate::collection::ChangeCollection;
use crate::config::EngineConfig;
use crate::document::DocumentEditor;
use crate::error::{ConfigError, TrackingError};
use crate::lifecycle::LifecycleManager;
use crate::query::{self, ChangeFilter, ChangeSummary};
use crate::reconciler::{SuggestionDraft, SuggestionReconciler};
use crate::recorder::ChangeRecorder;
use crate::rewrite::{RewriteRequest, RewriteService};
use crate::store::ChangeStore;
use dashmap::DashMap;
use redline_model::{
    Actor, ChangeContext, ChangeId, ChangeRecord, DocumentKey, EditDelta, Reviewer, TextRange,
};
use std::sync::Arc;
use std::time::Duration;

/// Change tracking engine for any number of document fields
pub struct ChangeTracker {
    /// Configuration
    config: EngineConfig,
    /// Persistence collaborator
    store: Arc<dyn ChangeStore>,
    /// Open collections
    collections: DashMap<DocumentKey, Arc<ChangeCollection>>,
    /// Change id to owning collection
    owners: DashMap<ChangeId, DocumentKey>,
    recorder: ChangeRecorder,
    lifecycle: LifecycleManager,
    reconciler: SuggestionReconciler,
}

impl ChangeTracker {
    /// Create new tracker
    ///
    /// # Errors
    /// Returns `ConfigError` if `config` does not validate
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn ChangeStore>,
        document: Arc<dyn DocumentEditor>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let recorder = ChangeRecorder::new(store.clone(), config.max_snapshot_len);
        let lifecycle = LifecycleManager::new(store.clone(), config.min_review_role)?;
        let reconciler = SuggestionReconciler::new(
            recorder.clone(),
            lifecycle.clone(),
            document,
            config.rewrite_timeout(),
        );

        Ok(Self {
            config,
            store,
            collections: DashMap::new(),
            owners: DashMap::new(),
            recorder,
            lifecycle,
            reconciler,
        })
    }

    /// With rewrite service for [`ChangeTracker::request_suggestion`]
    #[must_use]
    pub fn with_rewriter(mut self, rewriter: Arc<dyn RewriteService>) -> Self {
        self.reconciler = self.reconciler.with_rewriter(rewriter);
        self
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Open the collection for `key`, loading it from the store on first use
    ///
    /// # Errors
    /// Returns `TrackingError::Persistence` if the store cannot load the key
    pub async fn open(&self, key: &DocumentKey) -> Result<Arc<ChangeCollection>, TrackingError> {
        if let Some(collection) = self.collections.get(key) {
            return Ok(collection.clone());
        }

        let records = self.store.load(key).await.map_err(|e| {
            tracing::warn!("Failed to load changes for {}: {}", key, e);
            TrackingError::from(e)
        })?;
        let loaded = records.len();

        // A concurrent open may have won; keep the first collection
        let collection = self
            .collections
            .entry(key.clone())
            .or_insert_with(|| {
                for record in &records {
                    self.owners.insert(record.id, key.clone());
                }
                Arc::new(ChangeCollection::from_records(key.clone(), records))
            })
            .clone();

        tracing::debug!("Opened {} with {} persisted changes", key, loaded);
        Ok(collection)
    }

    /// Collection for `key`, if already open
    #[must_use]
    pub fn collection(&self, key: &DocumentKey) -> Option<Arc<ChangeCollection>> {
        self.collections.get(key).map(|c| c.clone())
    }

    /// Look up a change in the open collections
    #[must_use]
    pub fn get(&self, id: ChangeId) -> Option<ChangeRecord> {
        self.owning(id).ok()?.get(id)
    }

    /// Record a manual edit
    ///
    /// # Errors
    /// See [`ChangeRecorder::record_change`]
    pub async fn record_change(
        &self,
        delta: EditDelta,
        actor: Actor,
        context: &ChangeContext,
    ) -> Result<ChangeRecord, TrackingError> {
        let collection = self.open(&context.key).await?;
        let record = self
            .recorder
            .record_change(&collection, delta, actor, context)
            .await?;
        self.owners.insert(record.id, record.key.clone());
        Ok(record)
    }

    /// Propose a finished AI rewrite
    ///
    /// # Errors
    /// See [`SuggestionReconciler::propose_suggestion`]
    pub async fn propose_suggestion(
        &self,
        draft: SuggestionDraft,
        actor: Actor,
        context: &ChangeContext,
    ) -> Result<ChangeRecord, TrackingError> {
        let collection = self.open(&context.key).await?;
        let record = self
            .reconciler
            .propose_suggestion(&collection, draft, actor, context)
            .await?;
        self.owners.insert(record.id, record.key.clone());
        Ok(record)
    }

    /// Request a rewrite from the configured service and propose it
    ///
    /// `timeout` overrides the configured rewrite timeout for this call.
    ///
    /// # Errors
    /// See [`SuggestionReconciler::request_suggestion`]
    pub async fn request_suggestion(
        &self,
        request: RewriteRequest,
        selection: Option<TextRange>,
        actor: Actor,
        context: &ChangeContext,
        timeout: Option<Duration>,
    ) -> Result<ChangeRecord, TrackingError> {
        let collection = self.open(&context.key).await?;
        let record = self
            .reconciler
            .request_suggestion(&collection, request, selection, actor, context, timeout)
            .await?;
        self.owners.insert(record.id, record.key.clone());
        Ok(record)
    }

    /// Accept any pending change
    ///
    /// AI suggestions are routed through the reconciler so that the document
    /// receives the replacement as well.
    ///
    /// # Errors
    /// See [`LifecycleManager::accept_change`]
    pub async fn accept_change(
        &self,
        id: ChangeId,
        reviewer: &Reviewer,
    ) -> Result<ChangeRecord, TrackingError> {
        let collection = self.owning(id)?;
        if collection.get(id).is_some_and(|r| r.is_ai()) {
            return self.reconciler.accept_suggestion(&collection, id, reviewer).await;
        }
        self.lifecycle.accept_change(&collection, id, reviewer).await
    }

    /// Reject any pending change
    ///
    /// # Errors
    /// See [`LifecycleManager::reject_change`]
    pub async fn reject_change(
        &self,
        id: ChangeId,
        reviewer: &Reviewer,
    ) -> Result<ChangeRecord, TrackingError> {
        let collection = self.owning(id)?;
        if collection.get(id).is_some_and(|r| r.is_ai()) {
            return self.reconciler.reject_suggestion(&collection, id, reviewer).await;
        }
        self.lifecycle.reject_change(&collection, id, reviewer).await
    }

    /// Accept an AI suggestion
    ///
    /// # Errors
    /// See [`SuggestionReconciler::accept_suggestion`]
    pub async fn accept_suggestion(
        &self,
        id: ChangeId,
        reviewer: &Reviewer,
    ) -> Result<ChangeRecord, TrackingError> {
        let collection = self.owning(id)?;
        self.reconciler.accept_suggestion(&collection, id, reviewer).await
    }

    /// Reject an AI suggestion
    ///
    /// # Errors
    /// See [`SuggestionReconciler::reject_suggestion`]
    pub async fn reject_suggestion(
        &self,
        id: ChangeId,
        reviewer: &Reviewer,
    ) -> Result<ChangeRecord, TrackingError> {
        let collection = self.owning(id)?;
        self.reconciler.reject_suggestion(&collection, id, reviewer).await
    }

    /// Accept every pending AI suggestion on `key`
    ///
    /// # Errors
    /// See [`SuggestionReconciler::bulk_accept_ai`]
    pub async fn bulk_accept_ai(
        &self,
        key: &DocumentKey,
        reviewer: &Reviewer,
    ) -> Result<usize, TrackingError> {
        let collection = self.open(key).await?;
        self.reconciler.bulk_accept_ai(&collection, reviewer).await
    }

    /// Reject every pending AI suggestion on `key`
    ///
    /// # Errors
    /// See [`SuggestionReconciler::bulk_reject_ai`]
    pub async fn bulk_reject_ai(
        &self,
        key: &DocumentKey,
        reviewer: &Reviewer,
    ) -> Result<usize, TrackingError> {
        let collection = self.open(key).await?;
        self.reconciler.bulk_reject_ai(&collection, reviewer).await
    }

    /// Changes on `key` matching `filter`, in creation order
    ///
    /// # Errors
    /// Returns `TrackingError::Persistence` if the collection cannot be loaded
    pub async fn changes(
        &self,
        key: &DocumentKey,
        filter: &ChangeFilter,
    ) -> Result<Vec<ChangeRecord>, TrackingError> {
        let collection = self.open(key).await?;
        Ok(query::filter(&collection.snapshot(), filter))
    }

    /// Review overview for `key`
    ///
    /// # Errors
    /// Returns `TrackingError::Persistence` if the collection cannot be loaded
    pub async fn summary(&self, key: &DocumentKey) -> Result<ChangeSummary, TrackingError> {
        let collection = self.open(key).await?;
        Ok(ChangeSummary::of(&collection.snapshot()))
    }

    fn owning(&self, id: ChangeId) -> Result<Arc<ChangeCollection>, TrackingError> {
        if let Some(collection) = self
            .owners
            .get(&id)
            .and_then(|key| self.collections.get(key.value()).map(|c| c.clone()))
        {
            return Ok(collection);
        }

        // Appended by a commit whose caller went away before indexing it
        let collection = self
            .collections
            .iter()
            .find(|entry| entry.value().contains(id))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                tracing::debug!("Change {} is not in any open collection", id);
                TrackingError::NotFound(id)
            })?;
        self.owners.insert(id, collection.key().clone());
        Ok(collection)
    }
}

impl std::fmt::Debug for ChangeTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeTracker")
            .field("config", &self.config)
            .field("collections", &self.collections.len())
            .field("changes", &self.owners.len())
            .finish_non_exhaustive()
    }
}
