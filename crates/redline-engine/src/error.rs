//! Error types for the change tracking engine
//!
//! Every engine operation fails with a [`TrackingError`]. Collaborator
//! failures ([`StoreError`], [`RewriteError`]) are folded into it so callers
//! only branch on one taxonomy.

use redline_model::{ChangeId, ChangeStatus, DeltaError, Role};
use std::path::PathBuf;

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    /// Malformed delta or suggestion
    #[error("invalid change: {0}")]
    Validation(String),

    /// Suggestion requested with nothing selected
    #[error("nothing selected: a suggestion needs text to replace")]
    EmptySelection,

    /// Unknown change id
    #[error("change {0} not found")]
    NotFound(ChangeId),

    /// Change was already accepted or rejected
    #[error("change {id} is already {status}; create a new change to revise it")]
    AlreadyResolved { id: ChangeId, status: ChangeStatus },

    /// Reviewer role too low
    #[error("role '{role}' may not review changes; requires '{required}' or higher")]
    PermissionDenied { role: Role, required: Role },

    /// External call exceeded its bound
    #[error("operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Persistence collaborator failed
    #[error("change store failure: {0}")]
    Persistence(#[source] StoreError),

    /// Rewrite collaborator failed
    #[error("rewrite failed: {0}")]
    Rewrite(#[from] RewriteError),
}

impl TrackingError {
    /// Check if the user can simply try again
    ///
    /// Retrying never touches resolved history: a resolved change stays
    /// resolved whatever the outcome of the retry.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Timeout { .. } | Self::Persistence(_) | Self::Rewrite(_)
        )
    }

    /// Create validation error
    #[inline]
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }
}

impl From<DeltaError> for TrackingError {
    fn from(err: DeltaError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<StoreError> for TrackingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UnknownChange(id) => Self::NotFound(id),
            StoreError::AlreadyResolved { id, status } => Self::AlreadyResolved { id, status },
            other => Self::Persistence(other),
        }
    }
}

/// Persistence collaborator errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error on the backing file
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unreadable journal entry
    #[error("corrupt entry at {path}:{line}: {source}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Entry could not be encoded
    #[error("failed to encode entry: {0}")]
    Encode(#[source] serde_json::Error),

    /// Status update for a change the store never saw
    #[error("unknown change: {0}")]
    UnknownChange(ChangeId),

    /// Change appended twice
    #[error("duplicate change: {0}")]
    DuplicateChange(ChangeId),

    /// Status update for a change the store already holds as resolved
    #[error("change {id} already {status} in store")]
    AlreadyResolved { id: ChangeId, status: ChangeStatus },

    /// Backend not reachable
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Rewrite collaborator errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RewriteError {
    /// No rewrite service configured
    #[error("no rewrite service configured")]
    Unavailable,

    /// Service answered with an error
    #[error("service error: {0}")]
    Service(String),

    /// Service answered with nothing
    #[error("service returned an empty rewrite")]
    EmptyResult,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML could not be parsed
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Review role below the reviewing set
    #[error("min_review_role '{0}' cannot review; use 'publish' or 'super-admin'")]
    ReviewRoleTooLow(Role),

    /// Zero timeout or size limit
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_message_names_required_role() {
        let err = TrackingError::PermissionDenied {
            role: Role::ReadOnly,
            required: Role::Publish,
        };
        assert_eq!(
            err.to_string(),
            "role 'read-only' may not review changes; requires 'publish' or higher"
        );
    }

    #[test]
    fn store_errors_map_onto_taxonomy() {
        let id = ChangeId::new();
        assert!(matches!(
            TrackingError::from(StoreError::UnknownChange(id)),
            TrackingError::NotFound(found) if found == id
        ));
        assert!(matches!(
            TrackingError::from(StoreError::AlreadyResolved {
                id,
                status: ChangeStatus::Accepted
            }),
            TrackingError::AlreadyResolved { .. }
        ));
        assert!(matches!(
            TrackingError::from(StoreError::Unavailable("down".into())),
            TrackingError::Persistence(_)
        ));
    }

    #[test]
    fn retryable_errors() {
        assert!(TrackingError::Timeout { duration_ms: 10 }.is_retryable());
        assert!(TrackingError::NotFound(ChangeId::new()).is_retryable());
        assert!(!TrackingError::EmptySelection.is_retryable());
        assert!(!TrackingError::AlreadyResolved {
            id: ChangeId::new(),
            status: ChangeStatus::Rejected
        }
        .is_retryable());
    }

    #[test]
    fn delta_errors_become_validation() {
        let err: TrackingError = DeltaError::RangeInverted { start: 4, end: 1 }.into();
        assert!(matches!(err, TrackingError::Validation(_)));
        assert!(err.to_string().contains("start 4 is after end 1"));
    }
}
