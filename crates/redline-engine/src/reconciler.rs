//! Suggestion reconciler
//!
//! Wraps AI rewrites as pending, AI-tagged change records and resolves them.
//! Accepting commits the rewrite into the document; rejecting discards the
//! overlay and leaves the original text alone. Status transitions go through
//! the [`LifecycleManager`]; the document command runs only after the
//! transition is durable.

use crate::collection::ChangeCollection;
use crate::document::DocumentEditor;
use crate::error::{RewriteError, TrackingError};
use crate::lifecycle::LifecycleManager;
use crate::recorder::{ensure_target, ChangeRecorder};
use crate::rewrite::{RewriteRequest, RewriteService};
use redline_model::{
    Actor, ChangeContent, ChangeContext, ChangeId, ChangeRecord, Metadata, Origin, Reviewer,
    TextRange, Verdict, SIZE_DELTA_KEY,
};
use std::sync::Arc;
use std::time::Duration;

/// A rewrite ready to be proposed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionDraft {
    /// Selected text the rewrite replaces
    pub original_text: String,
    /// Proposed replacement
    pub suggested_text: String,
    /// AI operation label, e.g. "Improve Writing"
    pub ai_operation: String,
    /// Selection range; defaults to the whole original text from offset 0
    pub selection: Option<TextRange>,
}

impl SuggestionDraft {
    /// Create new draft
    #[inline]
    #[must_use]
    pub fn new(
        original_text: impl Into<String>,
        suggested_text: impl Into<String>,
        ai_operation: impl Into<String>,
    ) -> Self {
        Self {
            original_text: original_text.into(),
            suggested_text: suggested_text.into(),
            ai_operation: ai_operation.into(),
            selection: None,
        }
    }

    /// With explicit selection range
    #[inline]
    #[must_use]
    pub fn with_selection(mut self, selection: TextRange) -> Self {
        self.selection = Some(selection);
        self
    }
}

/// Proposes and resolves AI suggestions
#[derive(Clone)]
pub struct SuggestionReconciler {
    recorder: ChangeRecorder,
    lifecycle: LifecycleManager,
    document: Arc<dyn DocumentEditor>,
    rewriter: Option<Arc<dyn RewriteService>>,
    rewrite_timeout: Duration,
}

impl SuggestionReconciler {
    /// Create new reconciler
    #[must_use]
    pub fn new(
        recorder: ChangeRecorder,
        lifecycle: LifecycleManager,
        document: Arc<dyn DocumentEditor>,
        rewrite_timeout: Duration,
    ) -> Self {
        Self {
            recorder,
            lifecycle,
            document,
            rewriter: None,
            rewrite_timeout,
        }
    }

    /// With rewrite service
    #[inline]
    #[must_use]
    pub fn with_rewriter(mut self, rewriter: Arc<dyn RewriteService>) -> Self {
        self.rewriter = Some(rewriter);
        self
    }

    /// Wrap a finished rewrite as a pending AI change
    ///
    /// An empty suggestion proposes deleting the selection; any other
    /// suggestion proposes a modification.
    ///
    /// # Errors
    /// - `TrackingError::EmptySelection` if `original_text` is empty
    /// - `TrackingError::Validation` if the suggestion equals the original,
    ///   exceeds the size limit or targets another collection
    /// - `TrackingError::Persistence` if the store rejects the append
    pub async fn propose_suggestion(
        &self,
        collection: &Arc<ChangeCollection>,
        draft: SuggestionDraft,
        actor: Actor,
        context: &ChangeContext,
    ) -> Result<ChangeRecord, TrackingError> {
        ensure_target(collection, context)?;

        let SuggestionDraft {
            original_text,
            suggested_text,
            ai_operation,
            selection,
        } = draft;

        if original_text.is_empty() {
            return Err(TrackingError::EmptySelection);
        }
        if original_text == suggested_text {
            return Err(TrackingError::validation(
                "suggestion is identical to the selected text",
            ));
        }

        let original_len = original_text.chars().count();
        let suggested_len = suggested_text.chars().count();
        let range = match selection {
            Some(selection) => TextRange::new(selection.start(), selection.end())?,
            None => TextRange::new(0, original_len)?,
        };

        let content = if suggested_text.is_empty() {
            ChangeContent::Delete {
                before: original_text,
            }
        } else {
            ChangeContent::Modify {
                before: original_text,
                after: suggested_text,
            }
        };

        let limit = self.recorder.max_snapshot_len();
        if content.max_len() > limit {
            return Err(TrackingError::validation(format!(
                "suggestion of {} bytes exceeds limit of {} bytes",
                content.max_len(),
                limit
            )));
        }

        let mut metadata = Metadata::new();
        metadata.insert(
            SIZE_DELTA_KEY.to_string(),
            (suggested_len as i64 - original_len as i64).into(),
        );

        let record = ChangeRecord::pending(
            context,
            actor,
            content,
            range,
            Origin::Ai {
                operation: ai_operation,
            },
            metadata,
        );
        self.recorder.append(collection, record).await
    }

    /// Ask the rewrite service for a suggestion and propose it
    ///
    /// The call is bounded by `timeout`, or the configured default. On timeout
    /// or service failure nothing is recorded.
    ///
    /// # Errors
    /// - `TrackingError::EmptySelection` if the request has no selected text
    /// - `TrackingError::Timeout` if the service does not answer in time
    /// - `TrackingError::Rewrite` if no service is configured or it fails
    /// - any error of [`SuggestionReconciler::propose_suggestion`]
    pub async fn request_suggestion(
        &self,
        collection: &Arc<ChangeCollection>,
        request: RewriteRequest,
        selection: Option<TextRange>,
        actor: Actor,
        context: &ChangeContext,
        timeout: Option<Duration>,
    ) -> Result<ChangeRecord, TrackingError> {
        if request.selected_text.is_empty() {
            return Err(TrackingError::EmptySelection);
        }
        let rewriter = self.rewriter.as_ref().ok_or(RewriteError::Unavailable)?;
        let timeout = timeout.unwrap_or(self.rewrite_timeout);

        tracing::debug!("Requesting '{}' rewrite for {}", request.kind, context.key);
        let suggested = match tokio::time::timeout(timeout, rewriter.rewrite(&request)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::warn!("Rewrite '{}' failed: {}", request.kind, e);
                return Err(e.into());
            }
            Err(_) => {
                tracing::warn!("Rewrite '{}' timed out after {:?}", request.kind, timeout);
                return Err(TrackingError::Timeout {
                    duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
        };

        if suggested.trim().is_empty() {
            return Err(RewriteError::EmptyResult.into());
        }

        let mut draft =
            SuggestionDraft::new(request.selected_text, suggested, request.kind.label());
        draft.selection = selection;
        self.propose_suggestion(collection, draft, actor, context).await
    }

    /// Accept a suggestion and commit its text into the document
    ///
    /// # Errors
    /// - `TrackingError::NotFound` if `id` is unknown or not an AI suggestion
    /// - any error of [`LifecycleManager::accept_change`]; the document is
    ///   not touched in that case
    pub async fn accept_suggestion(
        &self,
        collection: &Arc<ChangeCollection>,
        id: ChangeId,
        reviewer: &Reviewer,
    ) -> Result<ChangeRecord, TrackingError> {
        self.ensure_suggestion(collection, id)?;
        let document = self.document.clone();
        self.lifecycle
            .resolve_with(collection, id, Verdict::Accepted, reviewer, move |record| {
                document.apply_replacement(&record.key, record.id, record.range, record.content_after());
            })
            .await
    }

    /// Reject a suggestion and discard its overlay
    ///
    /// # Errors
    /// Same as [`SuggestionReconciler::accept_suggestion`]
    pub async fn reject_suggestion(
        &self,
        collection: &Arc<ChangeCollection>,
        id: ChangeId,
        reviewer: &Reviewer,
    ) -> Result<ChangeRecord, TrackingError> {
        self.ensure_suggestion(collection, id)?;
        let document = self.document.clone();
        self.lifecycle
            .resolve_with(collection, id, Verdict::Rejected, reviewer, move |record| {
                document.discard_overlay(&record.key, record.id);
            })
            .await
    }

    /// Accept every pending AI suggestion, in creation order
    ///
    /// Manual changes are left alone. A second call finds nothing pending and
    /// returns 0.
    ///
    /// # Returns
    /// Number of suggestions accepted
    ///
    /// # Errors
    /// `TrackingError::PermissionDenied` before anything is processed; a store
    /// failure stops the batch, keeping the suggestions accepted so far
    pub async fn bulk_accept_ai(
        &self,
        collection: &Arc<ChangeCollection>,
        reviewer: &Reviewer,
    ) -> Result<usize, TrackingError> {
        self.bulk_resolve(collection, reviewer, Verdict::Accepted).await
    }

    /// Reject every pending AI suggestion, in creation order
    ///
    /// # Errors
    /// Same as [`SuggestionReconciler::bulk_accept_ai`]
    pub async fn bulk_reject_ai(
        &self,
        collection: &Arc<ChangeCollection>,
        reviewer: &Reviewer,
    ) -> Result<usize, TrackingError> {
        self.bulk_resolve(collection, reviewer, Verdict::Rejected).await
    }

    async fn bulk_resolve(
        &self,
        collection: &Arc<ChangeCollection>,
        reviewer: &Reviewer,
        verdict: Verdict,
    ) -> Result<usize, TrackingError> {
        self.lifecycle.check_permission(reviewer)?;

        let pending = crate::query::pending_ai_ids(&collection.snapshot());
        let mut processed = 0;

        for id in pending {
            let outcome = match verdict {
                Verdict::Accepted => self.accept_suggestion(collection, id, reviewer).await,
                Verdict::Rejected => self.reject_suggestion(collection, id, reviewer).await,
            };
            match outcome {
                Ok(_) => processed += 1,
                // Resolved by another writer since the snapshot
                Err(TrackingError::AlreadyResolved { .. }) => {
                    tracing::debug!("Skipping {} in bulk {:?}: already resolved", id, verdict);
                }
                Err(e) => {
                    tracing::warn!(
                        "Bulk {:?} on {} stopped after {} suggestions: {}",
                        verdict,
                        collection.key(),
                        processed,
                        e
                    );
                    return Err(e);
                }
            }
        }

        tracing::info!(
            "Bulk {:?} resolved {} AI suggestions on {}",
            verdict,
            processed,
            collection.key()
        );
        Ok(processed)
    }

    fn ensure_suggestion(
        &self,
        collection: &Arc<ChangeCollection>,
        id: ChangeId,
    ) -> Result<(), TrackingError> {
        match collection.get(id) {
            Some(record) if record.is_ai() => Ok(()),
            _ => Err(TrackingError::NotFound(id)),
        }
    }
}

impl std::fmt::Debug for SuggestionReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuggestionReconciler")
            .field("lifecycle", &self.lifecycle)
            .field("has_rewriter", &self.rewriter.is_some())
            .field("rewrite_timeout", &self.rewrite_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentCommand;
    use crate::store::InMemoryChangeStore;
    use async_trait::async_trait;
    use redline_model::{ChangeStatus, ChangeType, DocumentKey, EditDelta, OriginKind, Role, SessionId};
    use tokio::sync::mpsc;

    struct Harness {
        reconciler: SuggestionReconciler,
        collection: Arc<ChangeCollection>,
        context: ChangeContext,
        commands: mpsc::UnboundedReceiver<DocumentCommand>,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryChangeStore::new());
        let (tx, commands) = mpsc::unbounded_channel();
        let reconciler = SuggestionReconciler::new(
            ChangeRecorder::new(store.clone(), 1024),
            LifecycleManager::new(store, Role::Publish).unwrap(),
            Arc::new(tx),
            Duration::from_secs(5),
        );
        let context = ChangeContext::new(DocumentKey::new("policy", "body"), SessionId::new());
        Harness {
            reconciler,
            collection: Arc::new(ChangeCollection::new(context.key.clone())),
            context,
            commands,
        }
    }

    fn bot() -> Actor {
        Actor::named("ai-assistant", "Writing Assistant")
    }

    fn publisher() -> Reviewer {
        Reviewer::new("pub", Role::Publish)
    }

    #[tokio::test]
    async fn proposes_pending_ai_modify() {
        let h = harness();
        let record = h
            .reconciler
            .propose_suggestion(
                &h.collection,
                SuggestionDraft::new("The cat sat.", "The cat sat quietly.", "Improve Writing"),
                bot(),
                &h.context,
            )
            .await
            .unwrap();

        assert_eq!(record.origin.kind(), OriginKind::Ai);
        assert_eq!(record.ai_operation(), Some("Improve Writing"));
        assert_eq!(record.change_type(), ChangeType::Modify);
        assert_eq!(record.status(), ChangeStatus::Pending);
        assert_eq!(record.range, TextRange::new(0, 12).unwrap());
        assert_eq!(record.metadata[SIZE_DELTA_KEY], serde_json::json!(8));
    }

    #[tokio::test]
    async fn empty_suggestion_proposes_delete() {
        let h = harness();
        let record = h
            .reconciler
            .propose_suggestion(
                &h.collection,
                SuggestionDraft::new("redundant clause", "", "Make Shorter")
                    .with_selection(TextRange::new(10, 26).unwrap()),
                bot(),
                &h.context,
            )
            .await
            .unwrap();
        assert_eq!(record.change_type(), ChangeType::Delete);
        assert_eq!(record.range.start(), 10);
    }

    #[tokio::test]
    async fn empty_selection_fails() {
        let h = harness();
        let err = h
            .reconciler
            .propose_suggestion(
                &h.collection,
                SuggestionDraft::new("", "something", "Improve Writing"),
                bot(),
                &h.context,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TrackingError::EmptySelection));
        assert!(h.collection.is_empty());
    }

    #[tokio::test]
    async fn identical_suggestion_fails() {
        let h = harness();
        let err = h
            .reconciler
            .propose_suggestion(
                &h.collection,
                SuggestionDraft::new("same", "same", "Improve Writing"),
                bot(),
                &h.context,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TrackingError::Validation(_)));
    }

    #[tokio::test]
    async fn reject_discards_overlay_only() {
        let mut h = harness();
        let record = h
            .reconciler
            .propose_suggestion(
                &h.collection,
                SuggestionDraft::new("The cat sat.", "The cat sat quietly.", "Improve Writing"),
                bot(),
                &h.context,
            )
            .await
            .unwrap();

        let rejected = h
            .reconciler
            .reject_suggestion(&h.collection, record.id, &publisher())
            .await
            .unwrap();
        assert_eq!(rejected.status(), ChangeStatus::Rejected);

        assert_eq!(
            h.commands.try_recv().unwrap(),
            DocumentCommand::DiscardOverlay {
                key: h.context.key.clone(),
                change: record.id
            }
        );
        assert!(h.commands.try_recv().is_err());
    }

    #[tokio::test]
    async fn accept_applies_replacement() {
        let mut h = harness();
        let record = h
            .reconciler
            .propose_suggestion(
                &h.collection,
                SuggestionDraft::new("teh", "the", "Fix Spelling & Grammar")
                    .with_selection(TextRange::new(4, 7).unwrap()),
                bot(),
                &h.context,
            )
            .await
            .unwrap();

        h.reconciler
            .accept_suggestion(&h.collection, record.id, &publisher())
            .await
            .unwrap();

        assert_eq!(
            h.commands.try_recv().unwrap(),
            DocumentCommand::ApplyReplacement {
                key: h.context.key.clone(),
                change: record.id,
                range: TextRange::new(4, 7).unwrap(),
                replacement: Some("the".into()),
            }
        );

        let err = h
            .reconciler
            .accept_suggestion(&h.collection, record.id, &publisher())
            .await
            .unwrap_err();
        assert!(matches!(err, TrackingError::AlreadyResolved { .. }));
        assert!(h.commands.try_recv().is_err());
    }

    #[tokio::test]
    async fn denied_accept_sends_no_command() {
        let mut h = harness();
        let record = h
            .reconciler
            .propose_suggestion(
                &h.collection,
                SuggestionDraft::new("a", "b", "Simplify"),
                bot(),
                &h.context,
            )
            .await
            .unwrap();

        let err = h
            .reconciler
            .accept_suggestion(&h.collection, record.id, &Reviewer::new("ed", Role::Edit))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackingError::PermissionDenied { .. }));
        assert!(h.commands.try_recv().is_err());
        assert!(h.collection.get(record.id).unwrap().is_pending());
    }

    #[tokio::test]
    async fn manual_change_is_not_a_suggestion() {
        let h = harness();
        let manual = h
            .reconciler
            .recorder
            .record_change(&h.collection, EditDelta::insert(0, "x"), Actor::named("u1", "Jane"), &h.context)
            .await
            .unwrap();

        assert!(matches!(
            h.reconciler.accept_suggestion(&h.collection, manual.id, &publisher()).await,
            Err(TrackingError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn bulk_accept_touches_only_pending_ai() {
        let h = harness();
        for (original, suggested) in [("one", "uno"), ("two", "dos")] {
            h.reconciler
                .propose_suggestion(
                    &h.collection,
                    SuggestionDraft::new(original, suggested, "Translate"),
                    bot(),
                    &h.context,
                )
                .await
                .unwrap();
        }
        let manual = h
            .reconciler
            .recorder
            .record_change(&h.collection, EditDelta::insert(0, "x"), Actor::named("u1", "Jane"), &h.context)
            .await
            .unwrap();

        assert_eq!(h.reconciler.bulk_accept_ai(&h.collection, &publisher()).await.unwrap(), 2);
        assert_eq!(h.reconciler.bulk_accept_ai(&h.collection, &publisher()).await.unwrap(), 0);
        assert!(h.collection.get(manual.id).unwrap().is_pending());
    }

    #[tokio::test]
    async fn bulk_requires_permission_upfront() {
        let h = harness();
        h.reconciler
            .propose_suggestion(&h.collection, SuggestionDraft::new("a", "b", "Simplify"), bot(), &h.context)
            .await
            .unwrap();

        let err = h
            .reconciler
            .bulk_reject_ai(&h.collection, &Reviewer::new("viewer", Role::ReadOnly))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackingError::PermissionDenied { .. }));
    }

    struct SlowRewriter;

    #[async_trait]
    impl RewriteService for SlowRewriter {
        async fn rewrite(&self, _request: &RewriteRequest) -> Result<String, RewriteError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".into())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rewrite_timeout_creates_nothing() {
        let h = harness();
        let reconciler = h.reconciler.clone().with_rewriter(Arc::new(SlowRewriter));

        let err = reconciler
            .request_suggestion(
                &h.collection,
                RewriteRequest::new("The cat sat.", crate::rewrite::RewriteKind::ImproveWriting),
                None,
                bot(),
                &h.context,
                Some(Duration::from_millis(200)),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TrackingError::Timeout { duration_ms: 200 }));
        assert!(h.collection.is_empty());
    }

    #[tokio::test]
    async fn request_without_rewriter_fails() {
        let h = harness();
        let err = h
            .reconciler
            .request_suggestion(
                &h.collection,
                RewriteRequest::new("text", crate::rewrite::RewriteKind::Simplify),
                None,
                bot(),
                &h.context,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TrackingError::Rewrite(RewriteError::Unavailable)));
    }
}
