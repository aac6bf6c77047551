//! Change records
//!
//! Provides [`ChangeRecord`], one tracked, attributable, reviewable edit to a
//! document field, together with its provenance and review state.

use crate::actor::Actor;
use crate::delta::{ChangeContent, ChangeType, Metadata, TextRange};
use crate::ids::{ActorId, ChangeId, DocumentId, FieldName, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies the field a collection of changes belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentKey {
    /// Document
    pub document_id: DocumentId,
    /// Field within the document
    pub field_name: FieldName,
}

impl DocumentKey {
    /// Create new key
    #[inline]
    #[must_use]
    pub fn new(document_id: impl Into<DocumentId>, field_name: impl Into<FieldName>) -> Self {
        Self {
            document_id: document_id.into(),
            field_name: field_name.into(),
        }
    }
}

impl std::fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.document_id, self.field_name)
    }
}

/// Where a change is being recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeContext {
    /// Target document field
    pub key: DocumentKey,
    /// Editing pass producing the change
    pub session_id: SessionId,
}

impl ChangeContext {
    /// Create new context
    #[inline]
    #[must_use]
    pub fn new(key: DocumentKey, session_id: SessionId) -> Self {
        Self { key, session_id }
    }
}

/// Provenance of a change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum Origin {
    /// Typed by a human editor
    Manual,
    /// Produced by an AI rewrite
    Ai {
        /// Rewrite label, e.g. "Improve Writing"
        operation: String,
    },
}

impl Origin {
    /// Discriminant without payload
    #[inline]
    #[must_use]
    pub fn kind(&self) -> OriginKind {
        match self {
            Origin::Manual => OriginKind::Manual,
            Origin::Ai { .. } => OriginKind::Ai,
        }
    }

    /// AI operation label, if any
    #[inline]
    #[must_use]
    pub fn ai_operation(&self) -> Option<&str> {
        match self {
            Origin::Manual => None,
            Origin::Ai { operation } => Some(operation),
        }
    }
}

/// Provenance without payload, for filtering and counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginKind {
    Manual,
    Ai,
}

/// Flat review status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ChangeStatus {
    /// Whether no further transition is possible
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChangeStatus::Pending)
    }
}

impl std::fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ChangeStatus::Pending => "pending",
            ChangeStatus::Accepted => "accepted",
            ChangeStatus::Rejected => "rejected",
        })
    }
}

/// Reviewer decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Accepted,
    Rejected,
}

impl Verdict {
    /// Status this verdict leads to
    #[inline]
    #[must_use]
    pub fn status(&self) -> ChangeStatus {
        match self {
            Verdict::Accepted => ChangeStatus::Accepted,
            Verdict::Rejected => ChangeStatus::Rejected,
        }
    }
}

/// Who resolved a change, how and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Decision
    pub verdict: Verdict,
    /// Resolving reviewer
    pub by: ActorId,
    /// Resolution time
    pub at: DateTime<Utc>,
}

/// Review state
///
/// Terminal once resolved: there is no way back to `Pending`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReviewState {
    /// Awaiting review
    #[default]
    Pending,
    /// Accepted or rejected
    Resolved(Resolution),
}

/// One tracked edit
///
/// Created pending by the recorder or the suggestion reconciler; resolved at
/// most once by the lifecycle manager; never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Unique id
    pub id: ChangeId,
    /// Target document field
    pub key: DocumentKey,
    /// Author
    pub actor: Actor,
    /// Before/after snapshots, tagged by change type
    pub content: ChangeContent,
    /// Affected range at creation time
    pub range: TextRange,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Producing session
    pub session_id: SessionId,
    /// Provenance
    pub origin: Origin,
    /// Review state
    review: ReviewState,
    /// Auxiliary data, never interpreted
    #[serde(default)]
    pub metadata: Metadata,
}

impl ChangeRecord {
    /// Create a pending record timestamped now
    #[must_use]
    pub fn pending(
        context: &ChangeContext,
        actor: Actor,
        content: ChangeContent,
        range: TextRange,
        origin: Origin,
        metadata: Metadata,
    ) -> Self {
        Self {
            id: ChangeId::new(),
            key: context.key.clone(),
            actor,
            content,
            range,
            timestamp: Utc::now(),
            session_id: context.session_id,
            origin,
            review: ReviewState::Pending,
            metadata,
        }
    }

    /// Change type
    #[inline]
    #[must_use]
    pub fn change_type(&self) -> ChangeType {
        self.content.change_type()
    }

    /// Snapshot before the change
    #[inline]
    #[must_use]
    pub fn content_before(&self) -> Option<&str> {
        self.content.before()
    }

    /// Snapshot after the change
    #[inline]
    #[must_use]
    pub fn content_after(&self) -> Option<&str> {
        self.content.after()
    }

    /// Review state
    #[inline]
    #[must_use]
    pub fn review(&self) -> &ReviewState {
        &self.review
    }

    /// Flat status
    #[inline]
    #[must_use]
    pub fn status(&self) -> ChangeStatus {
        match &self.review {
            ReviewState::Pending => ChangeStatus::Pending,
            ReviewState::Resolved(resolution) => resolution.verdict.status(),
        }
    }

    /// Whether the record still awaits review
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self.review, ReviewState::Pending)
    }

    /// Reviewer who resolved the change (accepted or rejected)
    #[inline]
    #[must_use]
    pub fn accepted_by(&self) -> Option<&ActorId> {
        match &self.review {
            ReviewState::Pending => None,
            ReviewState::Resolved(resolution) => Some(&resolution.by),
        }
    }

    /// When the change was resolved (accepted or rejected)
    #[inline]
    #[must_use]
    pub fn accepted_at(&self) -> Option<DateTime<Utc>> {
        match &self.review {
            ReviewState::Pending => None,
            ReviewState::Resolved(resolution) => Some(resolution.at),
        }
    }

    /// Whether the record came from an AI rewrite
    #[inline]
    #[must_use]
    pub fn is_ai(&self) -> bool {
        self.origin.kind() == OriginKind::Ai
    }

    /// AI operation label, if any
    #[inline]
    #[must_use]
    pub fn ai_operation(&self) -> Option<&str> {
        self.origin.ai_operation()
    }

    /// Resolve a pending record
    ///
    /// # Errors
    /// Returns the current status if the record is already resolved; the
    /// record is left untouched in that case.
    pub fn resolve(&mut self, resolution: Resolution) -> Result<(), ChangeStatus> {
        if !self.is_pending() {
            return Err(self.status());
        }
        self.review = ReviewState::Resolved(resolution);
        Ok(())
    }
}
