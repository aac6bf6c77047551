//! Edit detection for editor integrations
//!
//! Turns two full snapshots of a field into a single [`EditDelta`] covering
//! the smallest contiguous span that differs. Offsets count `char`s.
//!
//! Several disjoint edits between the snapshots collapse into one `modify`
//! spanning all of them; callers that need finer records should diff more
//! often.

use crate::delta::{ChangeType, EditDelta};

/// Metadata key holding the signed length change in chars
pub const SIZE_DELTA_KEY: &str = "size_delta";

/// Describe how `old` became `new`
///
/// Returns `None` when the snapshots are equal.
#[must_use]
pub fn detect_edit(old: &str, new: &str) -> Option<EditDelta> {
    if old == new {
        return None;
    }

    let old_chars: Vec<char> = old.chars().collect();
    let new_chars: Vec<char> = new.chars().collect();

    let prefix = old_chars
        .iter()
        .zip(&new_chars)
        .take_while(|(a, b)| a == b)
        .count();

    let max_suffix = old_chars.len().min(new_chars.len()) - prefix;
    let suffix = old_chars
        .iter()
        .rev()
        .zip(new_chars.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let removed: String = old_chars[prefix..old_chars.len() - suffix].iter().collect();
    let added: String = new_chars[prefix..new_chars.len() - suffix].iter().collect();
    let end = prefix + (old_chars.len() - suffix - prefix);

    let change_type = match (removed.is_empty(), added.is_empty()) {
        (true, false) => ChangeType::Insert,
        (false, true) => ChangeType::Delete,
        _ => ChangeType::Modify,
    };

    let mut delta = EditDelta::new(change_type, prefix, end);
    if !removed.is_empty() {
        delta = delta.with_before(removed);
    }
    if !added.is_empty() {
        delta = delta.with_after(added);
    }

    let size_delta = new_chars.len() as i64 - old_chars.len() as i64;
    Some(delta.with_metadata(SIZE_DELTA_KEY, size_delta))
}
