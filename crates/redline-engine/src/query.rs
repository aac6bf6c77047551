//! Change queries
//!
//! Pure functions over record snapshots: filtering, per-status and per-origin
//! counts, grouping by author or editing session.

use indexmap::IndexMap;
use redline_model::{ActorId, ChangeId, ChangeRecord, ChangeStatus, OriginKind, SessionId};
use serde::{Deserialize, Serialize};

/// Record filter; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeFilter {
    pub status: Option<ChangeStatus>,
    pub origin: Option<OriginKind>,
    pub actor_id: Option<ActorId>,
    pub session_id: Option<SessionId>,
}

impl ChangeFilter {
    /// Filter matching every record
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Only records in `status`
    #[inline]
    #[must_use]
    pub fn status(mut self, status: ChangeStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Only records of `origin`
    #[inline]
    #[must_use]
    pub fn origin(mut self, origin: OriginKind) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Only records by `actor_id`
    #[inline]
    #[must_use]
    pub fn actor(mut self, actor_id: impl Into<ActorId>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    /// Only records from `session_id`
    #[inline]
    #[must_use]
    pub fn session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Whether `record` passes every set criterion
    #[must_use]
    pub fn matches(&self, record: &ChangeRecord) -> bool {
        self.status.map_or(true, |s| record.status() == s)
            && self.origin.map_or(true, |o| record.origin.kind() == o)
            && self.actor_id.as_ref().map_or(true, |a| &record.actor.id == a)
            && self.session_id.map_or(true, |s| record.session_id == s)
    }
}

/// Records matching `filter`, in their original order
#[must_use]
pub fn filter(records: &[ChangeRecord], filter: &ChangeFilter) -> Vec<ChangeRecord> {
    records.iter().filter(|r| filter.matches(r)).cloned().collect()
}

/// Record counts per origin
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginCounts {
    pub manual: usize,
    pub ai: usize,
}

impl OriginCounts {
    /// Sum of all counts
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.manual + self.ai
    }
}

/// Record counts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub accepted: usize,
    pub rejected: usize,
}

impl StatusCounts {
    /// Sum of all counts
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.pending + self.accepted + self.rejected
    }
}

/// Count records by origin
#[must_use]
pub fn counts_by_origin(records: &[ChangeRecord]) -> OriginCounts {
    records.iter().fold(OriginCounts::default(), |mut acc, r| {
        match r.origin.kind() {
            OriginKind::Manual => acc.manual += 1,
            OriginKind::Ai => acc.ai += 1,
        }
        acc
    })
}

/// Count records by status
#[must_use]
pub fn counts_by_status(records: &[ChangeRecord]) -> StatusCounts {
    records.iter().fold(StatusCounts::default(), |mut acc, r| {
        match r.status() {
            ChangeStatus::Pending => acc.pending += 1,
            ChangeStatus::Accepted => acc.accepted += 1,
            ChangeStatus::Rejected => acc.rejected += 1,
        }
        acc
    })
}

/// Count records per author, ordered by first appearance
#[must_use]
pub fn counts_by_author(records: &[ChangeRecord]) -> IndexMap<ActorId, usize> {
    let mut counts = IndexMap::new();
    for record in records {
        *counts.entry(record.actor.id.clone()).or_insert(0) += 1;
    }
    counts
}

/// Group records by editing session, ordered by first appearance
#[must_use]
pub fn group_by_session(records: &[ChangeRecord]) -> IndexMap<SessionId, Vec<ChangeRecord>> {
    let mut groups: IndexMap<SessionId, Vec<ChangeRecord>> = IndexMap::new();
    for record in records {
        groups.entry(record.session_id).or_default().push(record.clone());
    }
    groups
}

/// Ids of pending AI suggestions, in creation order
#[must_use]
pub fn pending_ai_ids(records: &[ChangeRecord]) -> Vec<ChangeId> {
    records
        .iter()
        .filter(|r| r.is_ai() && r.is_pending())
        .map(|r| r.id)
        .collect()
}

/// Review overview for one document field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub by_status: StatusCounts,
    pub by_origin: OriginCounts,
    /// Pending AI suggestions awaiting review
    pub pending_ai: usize,
    pub authors: usize,
}

impl ChangeSummary {
    /// Summarize a snapshot
    #[must_use]
    pub fn of(records: &[ChangeRecord]) -> Self {
        Self {
            by_status: counts_by_status(records),
            by_origin: counts_by_origin(records),
            pending_ai: pending_ai_ids(records).len(),
            authors: counts_by_author(records).len(),
        }
    }
}
