//! Identifier newtypes
//!
//! Change and session ids are ULIDs (sortable, generated locally).
//! Actor, document and field ids come from collaborators and stay opaque strings.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use ulid::{Generator, Ulid};

/// Process-wide generator; keeps change ids increasing within one millisecond
static CHANGE_IDS: Mutex<Generator> = Mutex::new(Generator::new());

/// Unique change identifier (ULID, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeId(pub Ulid);

impl ChangeId {
    /// Generate new change ID
    ///
    /// Ids are strictly increasing in creation order within this process.
    #[must_use]
    pub fn new() -> Self {
        // Overflow needs 2^80 ids in one millisecond; fall back to a random ULID
        let id = CHANGE_IDS.lock().generate().unwrap_or_else(|_| Ulid::new());
        Self(id)
    }
}

impl Default for ChangeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Editing session identifier
///
/// One session is one continuous editing pass; changes recorded within it are
/// grouped together for attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Ulid);

impl SessionId {
    /// Start a new session
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Wrap a raw identifier
            #[inline]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Raw identifier
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Actor identifier, as issued by the identity provider
    ActorId
);

string_id!(
    /// Document identifier
    DocumentId
);

string_id!(
    /// Field within a document (e.g. `body`, `summary`)
    FieldName
);
