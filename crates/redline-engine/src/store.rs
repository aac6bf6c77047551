//! Persistence collaborator
//!
//! The engine keeps an in-memory cache of every opened collection and writes
//! through to a [`ChangeStore`]. `load` must reproduce exactly the ordered set
//! that was appended, with every resolution applied.

use crate::error::StoreError;
use async_trait::async_trait;
use parking_lot::RwLock;
use redline_model::{ChangeId, ChangeRecord, DocumentKey, Resolution};
use std::collections::HashMap;

/// Durable home of change records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChangeStore: Send + Sync {
    /// All records for a document field, in append order
    async fn load(&self, key: &DocumentKey) -> Result<Vec<ChangeRecord>, StoreError>;

    /// Persist a newly created record
    async fn append(&self, record: &ChangeRecord) -> Result<(), StoreError>;

    /// Persist the resolution of a pending record
    async fn update_status(
        &self,
        key: &DocumentKey,
        id: ChangeId,
        resolution: &Resolution,
    ) -> Result<(), StoreError>;
}

/// Process-local store
///
/// Keeps records per document field in append order. Useful for tests and
/// for sessions that do not need durability.
#[derive(Debug, Default)]
pub struct InMemoryChangeStore {
    records: RwLock<HashMap<DocumentKey, Vec<ChangeRecord>>>,
}

impl InMemoryChangeStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored records across all fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().values().map(Vec::len).sum()
    }

    /// Whether the store holds nothing
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ChangeStore for InMemoryChangeStore {
    async fn load(&self, key: &DocumentKey) -> Result<Vec<ChangeRecord>, StoreError> {
        Ok(self.records.read().get(key).cloned().unwrap_or_default())
    }

    async fn append(&self, record: &ChangeRecord) -> Result<(), StoreError> {
        let mut records = self.records.write();
        let field = records.entry(record.key.clone()).or_default();
        if field.iter().any(|r| r.id == record.id) {
            return Err(StoreError::DuplicateChange(record.id));
        }
        field.push(record.clone());
        Ok(())
    }

    async fn update_status(
        &self,
        key: &DocumentKey,
        id: ChangeId,
        resolution: &Resolution,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write();
        let record = records
            .get_mut(key)
            .and_then(|field| field.iter_mut().find(|r| r.id == id))
            .ok_or(StoreError::UnknownChange(id))?;

        record
            .resolve(resolution.clone())
            .map_err(|status| StoreError::AlreadyResolved { id, status })
    }
}
