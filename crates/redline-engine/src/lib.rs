//! Redline Engine - change tracking and suggestion reconciliation
//!
//! Records edits to shared rich-text document fields, attributes them to
//! people or AI rewrite operations, and lets privileged reviewers accept or
//! reject them individually or in bulk.
//!
//! # Example
//!
//! ```rust
//! use redline_engine::{ChangeTracker, DocumentCommand, EngineConfig, InMemoryChangeStore, SuggestionDraft};
//! use redline_model::{Actor, ChangeContext, DocumentKey, Reviewer, Role, SessionId};
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (editor, mut commands) = mpsc::unbounded_channel::<DocumentCommand>();
//! let tracker = ChangeTracker::new(
//!     EngineConfig::default(),
//!     Arc::new(InMemoryChangeStore::new()),
//!     Arc::new(editor),
//! )?;
//!
//! let ctx = ChangeContext::new(DocumentKey::new("policy-7", "body"), SessionId::new());
//! let draft = SuggestionDraft::new("The cat sat.", "The cat sat quietly.", "Improve Writing");
//! let suggestion = tracker
//!     .propose_suggestion(draft, Actor::named("ai", "Writing Assistant"), &ctx)
//!     .await?;
//!
//! tracker
//!     .accept_suggestion(suggestion.id, &Reviewer::new("lead", Role::Publish))
//!     .await?;
//! assert!(commands.try_recv().is_ok());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod collection;
pub mod config;
pub mod document;
pub mod error;
pub mod journal;
pub mod lifecycle;
pub mod query;
pub mod reconciler;
pub mod recorder;
pub mod rewrite;
pub mod store;
pub mod tracker;

// Re-exports for convenience
pub use collection::ChangeCollection;
pub use config::EngineConfig;
pub use document::{DocumentCommand, DocumentEditor};
pub use error::{ConfigError, RewriteError, StoreError, TrackingError};
pub use journal::{JsonlChangeStore, JOURNAL_FILE};
pub use lifecycle::LifecycleManager;
pub use query::{
    counts_by_author, counts_by_origin, counts_by_status, filter, group_by_session,
    pending_ai_ids, ChangeFilter, ChangeSummary, OriginCounts, StatusCounts,
};
pub use reconciler::{SuggestionDraft, SuggestionReconciler};
pub use recorder::ChangeRecorder;
pub use rewrite::{RewriteKind, RewriteRequest, RewriteService};
pub use store::{ChangeStore, InMemoryChangeStore};
pub use tracker::ChangeTracker;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a [`ChangeTracker`](crate::ChangeTracker)
    pub use crate::{
        ChangeFilter, ChangeStore, ChangeTracker, DocumentEditor, EngineConfig, RewriteKind,
        RewriteRequest, RewriteService, SuggestionDraft, TrackingError,
    };
    pub use redline_model::{
        Actor, ChangeContext, ChangeId, ChangeRecord, ChangeStatus, DocumentKey, EditDelta,
        OriginKind, Reviewer, Role, SessionId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
