//! Append-only JSON-lines change store
//!
//! Every append and every resolution becomes one line in `changes.jsonl`.
//! Loading replays the journal, so the persisted order is the append order and
//! the first resolution written for a change wins.

use crate::error::StoreError;
use crate::store::ChangeStore;
use async_trait::async_trait;
use redline_model::{ChangeId, ChangeRecord, DocumentKey, Resolution};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Journal file name inside the store directory
pub const JOURNAL_FILE: &str = "changes.jsonl";

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
enum JournalEntry {
    Record {
        record: ChangeRecord,
    },
    Status {
        key: DocumentKey,
        id: ChangeId,
        resolution: Resolution,
    },
}

/// File-backed store using a JSON-lines journal
#[derive(Debug)]
pub struct JsonlChangeStore {
    path: PathBuf,
    /// Serializes writers so lines never interleave
    write_lock: Mutex<()>,
}

impl JsonlChangeStore {
    /// Open (or create) a journal inside `dir`
    ///
    /// # Errors
    /// Returns `StoreError::Io` if the directory cannot be created
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| StoreError::io_error(dir, e))?;

        Ok(Self {
            path: dir.join(JOURNAL_FILE),
            write_lock: Mutex::new(()),
        })
    }

    /// Journal file path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_entry(&self, entry: &JournalEntry) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(entry).map_err(StoreError::Encode)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| StoreError::io_error(&self.path, e))?;
        file.write_all(&line)
            .await
            .map_err(|e| StoreError::io_error(&self.path, e))?;
        file.sync_data()
            .await
            .map_err(|e| StoreError::io_error(&self.path, e))
    }

    async fn read_entries(&self) -> Result<Vec<JournalEntry>, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io_error(&self.path, e)),
        };

        raw.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str(line).map_err(|source| StoreError::Corrupt {
                    path: self.path.clone(),
                    line: idx + 1,
                    source,
                })
            })
            .collect()
    }

    /// Replay entries for one key
    fn replay(key: &DocumentKey, entries: Vec<JournalEntry>) -> Vec<ChangeRecord> {
        let mut records: Vec<ChangeRecord> = Vec::new();
        let mut positions: HashMap<ChangeId, usize> = HashMap::new();

        for entry in entries {
            match entry {
                JournalEntry::Record { record } if &record.key == key => {
                    if positions.contains_key(&record.id) {
                        tracing::warn!("Skipping duplicate journal record {}", record.id);
                        continue;
                    }
                    positions.insert(record.id, records.len());
                    records.push(record);
                }
                JournalEntry::Status {
                    key: entry_key,
                    id,
                    resolution,
                } if &entry_key == key => match positions.get(&id) {
                    Some(&pos) => {
                        if let Err(status) = records[pos].resolve(resolution) {
                            tracing::warn!("Ignoring late resolution of {} (already {})", id, status);
                        }
                    }
                    None => tracing::warn!("Ignoring resolution of unknown change {}", id),
                },
                _ => {}
            }
        }

        records
    }
}

#[async_trait]
impl ChangeStore for JsonlChangeStore {
    async fn load(&self, key: &DocumentKey) -> Result<Vec<ChangeRecord>, StoreError> {
        let entries = self.read_entries().await?;
        let records = Self::replay(key, entries);
        tracing::debug!("Loaded {} changes for {} from journal", records.len(), key);
        Ok(records)
    }

    async fn append(&self, record: &ChangeRecord) -> Result<(), StoreError> {
        self.write_entry(&JournalEntry::Record {
            record: record.clone(),
        })
        .await
    }

    async fn update_status(
        &self,
        key: &DocumentKey,
        id: ChangeId,
        resolution: &Resolution,
    ) -> Result<(), StoreError> {
        self.write_entry(&JournalEntry::Status {
            key: key.clone(),
            id,
            resolution: resolution.clone(),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use redline_model::{
        Actor, ActorId, ChangeContext, ChangeStatus, EditDelta, Origin, SessionId, Verdict,
    };

    fn record(key: &DocumentKey, text: &str, origin: Origin) -> ChangeRecord {
        let ctx = ChangeContext::new(key.clone(), SessionId::new());
        let (range, content, metadata) = EditDelta::insert(0, text)
            .with_metadata("size_delta", 1)
            .validate(1024)
            .unwrap();
        ChangeRecord::pending(&ctx, Actor::named("u1", "Jane"), content, range, origin, metadata)
    }

    fn resolution(verdict: Verdict, by: &str) -> Resolution {
        Resolution {
            verdict,
            by: ActorId::from(by),
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn reopened_store_reproduces_state() {
        let dir = tempfile::tempdir().unwrap();
        let key = DocumentKey::new("policy", "body");
        let other = DocumentKey::new("policy", "title");

        let a = record(&key, "a", Origin::Manual);
        let b = record(
            &key,
            "b",
            Origin::Ai {
                operation: "Improve Writing".into(),
            },
        );
        let noise = record(&other, "x", Origin::Manual);

        {
            let store = JsonlChangeStore::open(dir.path()).await.unwrap();
            store.append(&a).await.unwrap();
            store.append(&noise).await.unwrap();
            store.append(&b).await.unwrap();
            store
                .update_status(&key, b.id, &resolution(Verdict::Accepted, "rev"))
                .await
                .unwrap();
        }

        let store = JsonlChangeStore::open(dir.path()).await.unwrap();
        let loaded = store.load(&key).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], a);
        assert_eq!(loaded[1].id, b.id);
        assert_eq!(loaded[1].status(), ChangeStatus::Accepted);
        assert_eq!(loaded[1].ai_operation(), Some("Improve Writing"));
        assert_eq!(loaded[1].metadata, b.metadata);
    }

    #[tokio::test]
    async fn first_resolution_wins_on_replay() {
        let dir = tempfile::tempdir().unwrap();
        let key = DocumentKey::new("policy", "body");
        let r = record(&key, "a", Origin::Manual);

        let store = JsonlChangeStore::open(dir.path()).await.unwrap();
        store.append(&r).await.unwrap();
        store
            .update_status(&key, r.id, &resolution(Verdict::Rejected, "first"))
            .await
            .unwrap();
        store
            .update_status(&key, r.id, &resolution(Verdict::Accepted, "second"))
            .await
            .unwrap();

        let loaded = store.load(&key).await.unwrap();
        assert_eq!(loaded[0].status(), ChangeStatus::Rejected);
        assert_eq!(loaded[0].accepted_by(), Some(&ActorId::from("first")));
    }

    #[tokio::test]
    async fn missing_journal_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlChangeStore::open(dir.path().join("nested")).await.unwrap();
        let loaded = store.load(&DocumentKey::new("d", "f")).await.unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn corrupt_line_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlChangeStore::open(dir.path()).await.unwrap();
        tokio::fs::write(store.path(), "{not json}\n").await.unwrap();

        let err = store.load(&DocumentKey::new("d", "f")).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { line: 1, .. }));
    }

    #[tokio::test]
    async fn inverted_range_is_reported_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let key = DocumentKey::new("policy", "body");
        let r = record(&key, "a", Origin::Manual);

        let store = JsonlChangeStore::open(dir.path()).await.unwrap();
        store.append(&r).await.unwrap();

        let range = serde_json::to_string(&r.range).unwrap();
        let raw = tokio::fs::read_to_string(store.path()).await.unwrap();
        assert!(raw.contains(&range));
        let tampered = raw.replace(&range, r#"{"start":9,"end":1}"#);
        tokio::fs::write(store.path(), tampered).await.unwrap();

        let err = store.load(&key).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { line: 1, .. }));
    }
}
