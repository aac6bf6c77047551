//! Edit deltas and their validation
//!
//! Provides [`EditDelta`], the raw edit description handed over by the editor
//! integration, and [`ChangeContent`], the validated form stored on a record.

use serde::{Deserialize, Serialize};

/// Open key/value bag carried alongside a change, never interpreted
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Kind of tracked edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// New content where there was none
    Insert,
    /// Content removed, nothing in its place
    Delete,
    /// Non-empty content replaced by different non-empty content
    Modify,
    /// Presentation-only change, content unchanged
    Format,
}

impl ChangeType {
    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Insert => "insert",
            ChangeType::Delete => "delete",
            ChangeType::Modify => "modify",
            ChangeType::Format => "format",
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Affected range, in document-relative offsets at creation time
///
/// Always `start <= end`; [`TextRange::new`] and [`TextRange::at`] are the
/// only constructors, and deserialization goes through the same check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTextRange")]
pub struct TextRange {
    start: usize,
    end: usize,
}

#[derive(Deserialize)]
struct RawTextRange {
    start: usize,
    end: usize,
}

impl TryFrom<RawTextRange> for TextRange {
    type Error = DeltaError;

    fn try_from(raw: RawTextRange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl TextRange {
    /// Create range, rejecting `start > end`
    ///
    /// # Errors
    /// Returns [`DeltaError::RangeInverted`] if `start > end`
    pub fn new(start: usize, end: usize) -> Result<Self, DeltaError> {
        if start > end {
            return Err(DeltaError::RangeInverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Empty range at a single position
    #[inline]
    #[must_use]
    pub fn at(position: usize) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    /// Inclusive start
    #[inline]
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Exclusive end
    #[inline]
    #[must_use]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Range length
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the range is a caret position
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether two ranges share at least one position
    #[inline]
    #[must_use]
    pub fn overlaps(&self, other: &TextRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl std::fmt::Display for TextRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Delta validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeltaError {
    /// Range start lies after its end
    #[error("invalid range: start {start} is after end {end}")]
    RangeInverted { start: usize, end: usize },

    /// Snapshots do not fit the declared change type
    #[error("{change_type} change {reason}")]
    ContentMismatch {
        change_type: ChangeType,
        reason: &'static str,
    },

    /// A snapshot exceeds the configured size limit
    #[error("content snapshot of {len} bytes exceeds limit of {limit} bytes")]
    ContentTooLarge { len: usize, limit: usize },
}

impl DeltaError {
    fn mismatch(change_type: ChangeType, reason: &'static str) -> Self {
        Self::ContentMismatch {
            change_type,
            reason,
        }
    }
}

/// Validated content of a change
///
/// Each variant carries exactly the snapshots its change type allows, so an
/// insert can never hold prior content and a format change always keeps its
/// text intact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change_type", rename_all = "snake_case")]
pub enum ChangeContent {
    /// Added text
    Insert { after: String },
    /// Removed text
    Delete { before: String },
    /// Replaced text
    Modify { before: String, after: String },
    /// Restyled text
    Format { content: String },
}

impl ChangeContent {
    /// Change type discriminant
    #[inline]
    #[must_use]
    pub fn change_type(&self) -> ChangeType {
        match self {
            ChangeContent::Insert { .. } => ChangeType::Insert,
            ChangeContent::Delete { .. } => ChangeType::Delete,
            ChangeContent::Modify { .. } => ChangeType::Modify,
            ChangeContent::Format { .. } => ChangeType::Format,
        }
    }

    /// Snapshot before the change
    #[inline]
    #[must_use]
    pub fn before(&self) -> Option<&str> {
        match self {
            ChangeContent::Insert { .. } => None,
            ChangeContent::Delete { before } | ChangeContent::Modify { before, .. } => {
                Some(before)
            }
            ChangeContent::Format { content } => Some(content),
        }
    }

    /// Snapshot after the change
    #[inline]
    #[must_use]
    pub fn after(&self) -> Option<&str> {
        match self {
            ChangeContent::Delete { .. } => None,
            ChangeContent::Insert { after } | ChangeContent::Modify { after, .. } => Some(after),
            ChangeContent::Format { content } => Some(content),
        }
    }

    /// Classify a before/after pair
    ///
    /// Empty strings count as absent snapshots.
    ///
    /// # Errors
    /// Returns [`DeltaError::ContentMismatch`] if the pair fits `change_type`
    /// badly.
    pub fn from_snapshots(
        change_type: ChangeType,
        before: Option<String>,
        after: Option<String>,
    ) -> Result<Self, DeltaError> {
        let before = before.filter(|s| !s.is_empty());
        let after = after.filter(|s| !s.is_empty());

        match (change_type, before, after) {
            (_, None, None) => Err(DeltaError::mismatch(
                change_type,
                "must carry content before or after",
            )),
            (ChangeType::Insert, None, Some(after)) => Ok(ChangeContent::Insert { after }),
            (ChangeType::Insert, Some(_), _) => Err(DeltaError::mismatch(
                change_type,
                "must not have prior content",
            )),
            (ChangeType::Delete, Some(before), None) => Ok(ChangeContent::Delete { before }),
            (ChangeType::Delete, _, Some(_)) => Err(DeltaError::mismatch(
                change_type,
                "must not have resulting content",
            )),
            (ChangeType::Modify, Some(before), Some(after)) => {
                if before == after {
                    Err(DeltaError::mismatch(
                        change_type,
                        "must change the content; use format for presentation-only edits",
                    ))
                } else {
                    Ok(ChangeContent::Modify { before, after })
                }
            }
            (ChangeType::Modify, _, _) => Err(DeltaError::mismatch(
                change_type,
                "needs both prior and resulting content",
            )),
            (ChangeType::Format, Some(before), Some(after)) => {
                if before == after {
                    Ok(ChangeContent::Format { content: after })
                } else {
                    Err(DeltaError::mismatch(
                        change_type,
                        "must leave the content unchanged",
                    ))
                }
            }
            (ChangeType::Format, _, _) => Err(DeltaError::mismatch(
                change_type,
                "needs identical prior and resulting content",
            )),
        }
    }

    /// Largest snapshot length in bytes
    #[inline]
    #[must_use]
    pub fn max_len(&self) -> usize {
        self.before()
            .map_or(0, str::len)
            .max(self.after().map_or(0, str::len))
    }
}

/// Raw edit handed over by the editor integration
///
/// Not yet validated; see [`EditDelta::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditDelta {
    /// Declared change type
    pub change_type: ChangeType,
    /// Text before the edit, if any
    pub content_before: Option<String>,
    /// Text after the edit, if any
    pub content_after: Option<String>,
    /// Start offset
    pub position_start: usize,
    /// End offset
    pub position_end: usize,
    /// Auxiliary data, round-tripped untouched
    #[serde(default)]
    pub metadata: Metadata,
}

impl EditDelta {
    /// Create delta
    #[inline]
    #[must_use]
    pub fn new(change_type: ChangeType, position_start: usize, position_end: usize) -> Self {
        Self {
            change_type,
            content_before: None,
            content_after: None,
            position_start,
            position_end,
            metadata: Metadata::new(),
        }
    }

    /// Insert of `text` at `position`
    #[must_use]
    pub fn insert(position: usize, text: impl Into<String>) -> Self {
        Self::new(ChangeType::Insert, position, position).with_after(text)
    }

    /// Delete of `text` spanning `start..end`
    #[must_use]
    pub fn delete(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self::new(ChangeType::Delete, start, end).with_before(text)
    }

    /// Replacement of `before` by `after` over `start..end`
    #[must_use]
    pub fn modify(
        start: usize,
        end: usize,
        before: impl Into<String>,
        after: impl Into<String>,
    ) -> Self {
        Self::new(ChangeType::Modify, start, end)
            .with_before(before)
            .with_after(after)
    }

    /// Formatting change of `text` over `start..end`
    #[must_use]
    pub fn format(start: usize, end: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(ChangeType::Format, start, end)
            .with_before(text.clone())
            .with_after(text)
    }

    /// With prior content
    #[inline]
    #[must_use]
    pub fn with_before(mut self, text: impl Into<String>) -> Self {
        self.content_before = Some(text.into());
        self
    }

    /// With resulting content
    #[inline]
    #[must_use]
    pub fn with_after(mut self, text: impl Into<String>) -> Self {
        self.content_after = Some(text.into());
        self
    }

    /// With metadata entry
    #[inline]
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Check the delta and split it into range, content and metadata
    ///
    /// # Errors
    /// - `DeltaError::RangeInverted` if `position_start > position_end`
    /// - `DeltaError::ContentMismatch` if the snapshots contradict `change_type`
    /// - `DeltaError::ContentTooLarge` if a snapshot exceeds `max_snapshot_len`
    pub fn validate(
        self,
        max_snapshot_len: usize,
    ) -> Result<(TextRange, ChangeContent, Metadata), DeltaError> {
        let range = TextRange::new(self.position_start, self.position_end)?;
        let content =
            ChangeContent::from_snapshots(self.change_type, self.content_before, self.content_after)?;

        let len = content.max_len();
        if len > max_snapshot_len {
            return Err(DeltaError::ContentTooLarge {
                len,
                limit: max_snapshot_len,
            });
        }

        Ok((range, content, self.metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LIMIT: usize = 1024;

    #[test]
    fn valid_patterns() {
        let (_, content, _) = EditDelta::insert(3, "abc").validate(LIMIT).unwrap();
        assert_eq!(content.change_type(), ChangeType::Insert);
        assert_eq!(content.before(), None);
        assert_eq!(content.after(), Some("abc"));

        let (_, content, _) = EditDelta::delete(0, 3, "abc").validate(LIMIT).unwrap();
        assert_eq!(content, ChangeContent::Delete { before: "abc".into() });

        let (range, content, _) = EditDelta::modify(0, 3, "foo", "bar").validate(LIMIT).unwrap();
        assert_eq!((range.start(), range.end()), (0, 3));
        assert_eq!(content.before(), Some("foo"));
        assert_eq!(content.after(), Some("bar"));

        let (_, content, _) = EditDelta::format(0, 3, "abc").validate(LIMIT).unwrap();
        assert_eq!(content.before(), content.after());
    }

    #[test]
    fn mismatched_patterns_rejected() {
        let cases = [
            EditDelta::new(ChangeType::Insert, 0, 0),
            EditDelta::new(ChangeType::Insert, 0, 0).with_before("x").with_after("y"),
            EditDelta::new(ChangeType::Delete, 0, 1).with_after("y"),
            EditDelta::new(ChangeType::Modify, 0, 1).with_before("x"),
            EditDelta::modify(0, 3, "same", "same"),
            EditDelta::new(ChangeType::Format, 0, 1).with_before("a").with_after("b"),
            EditDelta::new(ChangeType::Format, 0, 1).with_after("a"),
        ];

        for delta in cases {
            let err = delta.clone().validate(LIMIT).unwrap_err();
            assert!(
                matches!(err, DeltaError::ContentMismatch { .. }),
                "expected mismatch for {delta:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn empty_snapshot_counts_as_absent() {
        let delta = EditDelta::insert(0, "x").with_before("");
        assert!(delta.validate(LIMIT).is_ok());
    }

    #[test]
    fn inverted_range_rejected() {
        let err = EditDelta::modify(5, 2, "a", "b").validate(LIMIT).unwrap_err();
        assert_eq!(err, DeltaError::RangeInverted { start: 5, end: 2 });
    }

    #[test]
    fn inverted_range_does_not_deserialize() {
        let ok: TextRange = serde_json::from_str(r#"{"start":2,"end":10}"#).unwrap();
        assert_eq!(ok, TextRange::new(2, 10).unwrap());
        assert_eq!(serde_json::to_string(&ok).unwrap(), r#"{"start":2,"end":10}"#);

        let err = serde_json::from_str::<TextRange>(r#"{"start":10,"end":2}"#).unwrap_err();
        assert!(err.to_string().contains("start 10 is after end 2"));
    }

    #[test]
    fn oversized_snapshot_rejected() {
        let err = EditDelta::insert(0, "x".repeat(11)).validate(10).unwrap_err();
        assert_eq!(err, DeltaError::ContentTooLarge { len: 11, limit: 10 });
    }

    #[test]
    fn metadata_round_trips() {
        let delta = EditDelta::insert(0, "hi").with_metadata("size_delta", 2);
        let (_, _, metadata) = delta.validate(LIMIT).unwrap();
        assert_eq!(metadata.get("size_delta"), Some(&serde_json::json!(2)));
    }

    #[test]
    fn range_overlap() {
        let a = TextRange::new(0, 5).unwrap();
        let b = TextRange::new(4, 8).unwrap();
        let c = TextRange::new(5, 8).unwrap();
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert_eq!(b.len(), 4);
        assert!(TextRange::at(3).is_empty());
    }

    #[test]
    fn error_message_names_change_type() {
        let err = EditDelta::new(ChangeType::Delete, 0, 1)
            .with_after("y")
            .validate(LIMIT)
            .unwrap_err();
        assert_eq!(err.to_string(), "delete change must not have resulting content");
    }
}
