//! Testing utilities for the Redline workspace
//!
//! Shared fixtures and scripted collaborators for integration tests.

#![allow(missing_docs)]

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use redline_engine::{
    ChangeStore, ChangeTracker, DocumentCommand, DocumentEditor, EngineConfig,
    InMemoryChangeStore, RewriteError, RewriteRequest, RewriteService, StoreError,
};
use redline_model::{
    Actor, ChangeContext, ChangeId, ChangeRecord, DocumentKey, Resolution, Reviewer, Role,
    SessionId, TextRange,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

static TRACING: OnceCell<()> = OnceCell::new();

/// Install a fmt subscriber once per test binary; honours `RUST_LOG`
pub fn init_tracing() {
    TRACING.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn policy_key() -> DocumentKey {
    DocumentKey::new("policy-42", "body")
}

pub fn context() -> ChangeContext {
    ChangeContext::new(policy_key(), SessionId::new())
}

pub fn context_for(key: DocumentKey) -> ChangeContext {
    ChangeContext::new(key, SessionId::new())
}

pub fn editor() -> Actor {
    Actor::named("u-jane", "Jane Doe")
}

pub fn assistant() -> Actor {
    Actor::named("ai-assistant", "Writing Assistant")
}

pub fn read_only_reviewer() -> Reviewer {
    Reviewer::new("u-viewer", Role::ReadOnly)
}

pub fn publisher() -> Reviewer {
    Reviewer::new("u-lead", Role::Publish)
}

/// Document collaborator that keeps every command it receives
#[derive(Debug, Default)]
pub struct RecordingDocument {
    commands: Mutex<Vec<DocumentCommand>>,
}

impl RecordingDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<DocumentCommand> {
        self.commands.lock().clone()
    }

    pub fn replacements(&self) -> usize {
        self.commands
            .lock()
            .iter()
            .filter(|c| matches!(c, DocumentCommand::ApplyReplacement { .. }))
            .count()
    }

    pub fn discards(&self) -> usize {
        self.commands
            .lock()
            .iter()
            .filter(|c| matches!(c, DocumentCommand::DiscardOverlay { .. }))
            .count()
    }
}

impl DocumentEditor for RecordingDocument {
    fn apply_replacement(
        &self,
        key: &DocumentKey,
        change: ChangeId,
        range: TextRange,
        replacement: Option<&str>,
    ) {
        self.commands.lock().push(DocumentCommand::ApplyReplacement {
            key: key.clone(),
            change,
            range,
            replacement: replacement.map(str::to_string),
        });
    }

    fn discard_overlay(&self, key: &DocumentKey, change: ChangeId) {
        self.commands.lock().push(DocumentCommand::DiscardOverlay {
            key: key.clone(),
            change,
        });
    }
}

/// Rewrite service with a canned outcome and optional latency
#[derive(Debug, Clone)]
pub struct ScriptedRewriter {
    reply: Result<String, String>,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<RewriteRequest>>>,
}

impl ScriptedRewriter {
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: Ok(text.into()),
            delay: None,
            calls: Arc::default(),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            delay: None,
            calls: Arc::default(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RewriteRequest> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl RewriteService for ScriptedRewriter {
    async fn rewrite(&self, request: &RewriteRequest) -> Result<String, RewriteError> {
        self.calls.lock().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone().map_err(RewriteError::Service)
    }
}

/// Store that persists resolutions, then keeps the caller waiting
///
/// Appends and loads pass straight through to the inner store.
#[derive(Debug, Clone)]
pub struct StallingStore {
    inner: Arc<InMemoryChangeStore>,
    stall: Duration,
}

impl StallingStore {
    pub fn new(inner: Arc<InMemoryChangeStore>, stall: Duration) -> Self {
        Self { inner, stall }
    }
}

#[async_trait]
impl ChangeStore for StallingStore {
    async fn load(&self, key: &DocumentKey) -> Result<Vec<ChangeRecord>, StoreError> {
        self.inner.load(key).await
    }

    async fn append(&self, record: &ChangeRecord) -> Result<(), StoreError> {
        self.inner.append(record).await
    }

    async fn update_status(
        &self,
        key: &DocumentKey,
        id: ChangeId,
        resolution: &Resolution,
    ) -> Result<(), StoreError> {
        self.inner.update_status(key, id, resolution).await?;
        tokio::time::sleep(self.stall).await;
        Ok(())
    }
}

/// Tracker over a fresh in-memory store, plus handles on its collaborators
pub struct TestTracker {
    pub tracker: ChangeTracker,
    pub store: Arc<InMemoryChangeStore>,
    pub document: Arc<RecordingDocument>,
}

pub fn tracker_with_memory_store() -> TestTracker {
    tracker_with_config(EngineConfig::default())
}

pub fn tracker_with_config(config: EngineConfig) -> TestTracker {
    init_tracing();
    let store = Arc::new(InMemoryChangeStore::new());
    let document = Arc::new(RecordingDocument::new());
    let tracker = ChangeTracker::new(config, store.clone(), document.clone())
        .expect("test config is valid");
    TestTracker {
        tracker,
        store,
        document,
    }
}

/// Tracker whose store stalls for `stall` after persisting each resolution
pub fn tracker_with_stalling_store(stall: Duration) -> TestTracker {
    init_tracing();
    let store = Arc::new(InMemoryChangeStore::new());
    let document = Arc::new(RecordingDocument::new());
    let stalling = Arc::new(StallingStore::new(store.clone(), stall));
    let tracker = ChangeTracker::new(EngineConfig::default(), stalling, document.clone())
        .expect("test config is valid");
    TestTracker {
        tracker,
        store,
        document,
    }
}
