//! Redline Model
//!
//! Data model for tracked changes to shared rich-text documents.
//!
//! # Core Concepts
//!
//! - [`Actor`]: Attributed author with deterministic initials and color
//! - [`EditDelta`]: Raw edit from the editor integration, validated into [`ChangeContent`]
//! - [`ChangeRecord`]: One reviewable edit with provenance ([`Origin`]) and [`ReviewState`]
//! - [`Role`] / [`Reviewer`]: Who may resolve changes
//! - [`detect_edit`]: Snapshot diff helper for editor integrations
//!
//! # Example
//!
//! ```rust
//! use redline_model::{Actor, ChangeContext, ChangeRecord, DocumentKey, EditDelta, Origin, SessionId};
//!
//! let ctx = ChangeContext::new(DocumentKey::new("policy-7", "body"), SessionId::new());
//! let (range, content, metadata) = EditDelta::modify(0, 3, "foo", "bar").validate(1024)?;
//! let record = ChangeRecord::pending(&ctx, Actor::named("u1", "Jane Doe"), content, range, Origin::Manual, metadata);
//!
//! assert_eq!(record.actor.initials, "JD");
//! assert!(record.is_pending());
//! # Ok::<(), redline_model::DeltaError>(())
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod actor;
mod delta;
mod diff;
mod ids;
mod record;

pub use actor::{
    resolve_color, resolve_initials, Actor, Color, Reviewer, Role, UnknownRole, FALLBACK_INITIALS,
};
pub use delta::{ChangeContent, ChangeType, DeltaError, EditDelta, Metadata, TextRange};
pub use diff::{detect_edit, SIZE_DELTA_KEY};
pub use ids::{ActorId, ChangeId, DocumentId, FieldName, SessionId};
pub use record::{
    ChangeContext, ChangeRecord, ChangeStatus, DocumentKey, Origin, OriginKind, Resolution,
    ReviewState, Verdict,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
