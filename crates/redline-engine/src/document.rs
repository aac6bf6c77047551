//! Document collaborator
//!
//! The engine never edits document content itself. When a suggestion is
//! resolved it instructs the editor through [`DocumentEditor`].

use redline_model::{ChangeId, DocumentKey, TextRange};
use tokio::sync::mpsc;

/// Receiver of content commands from the reconciler
///
/// Called only after the matching status transition has been persisted.
pub trait DocumentEditor: Send + Sync {
    /// Replace `range` with `replacement` (`None` removes the range)
    fn apply_replacement(
        &self,
        key: &DocumentKey,
        change: ChangeId,
        range: TextRange,
        replacement: Option<&str>,
    );

    /// Drop the suggestion overlay, keeping the original content
    fn discard_overlay(&self, key: &DocumentKey, change: ChangeId);
}

/// Content command, as forwarded to an editor task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentCommand {
    /// Commit a suggestion into the document
    ApplyReplacement {
        key: DocumentKey,
        change: ChangeId,
        range: TextRange,
        replacement: Option<String>,
    },
    /// Remove a suggestion overlay
    DiscardOverlay { key: DocumentKey, change: ChangeId },
}

impl DocumentCommand {
    /// Change the command refers to
    #[inline]
    #[must_use]
    pub fn change(&self) -> ChangeId {
        match self {
            Self::ApplyReplacement { change, .. } | Self::DiscardOverlay { change, .. } => *change,
        }
    }
}

/// Forward commands to an editor task over a channel
///
/// A closed channel means the editor is gone; the command is dropped and
/// logged, since the status transition it follows is already durable.
impl DocumentEditor for mpsc::UnboundedSender<DocumentCommand> {
    fn apply_replacement(
        &self,
        key: &DocumentKey,
        change: ChangeId,
        range: TextRange,
        replacement: Option<&str>,
    ) {
        let command = DocumentCommand::ApplyReplacement {
            key: key.clone(),
            change,
            range,
            replacement: replacement.map(str::to_string),
        };
        if self.send(command).is_err() {
            tracing::warn!("Editor channel closed; dropped replacement for {}", change);
        }
    }

    fn discard_overlay(&self, key: &DocumentKey, change: ChangeId) {
        let command = DocumentCommand::DiscardOverlay {
            key: key.clone(),
            change,
        };
        if self.send(command).is_err() {
            tracing::warn!("Editor channel closed; dropped discard for {}", change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_forwards_commands() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let key = DocumentKey::new("doc", "body");
        let id = ChangeId::new();

        tx.apply_replacement(&key, id, TextRange::at(0), Some("new"));
        tx.discard_overlay(&key, id);

        assert_eq!(
            rx.try_recv().unwrap(),
            DocumentCommand::ApplyReplacement {
                key: key.clone(),
                change: id,
                range: TextRange::at(0),
                replacement: Some("new".into()),
            }
        );
        let discard = rx.try_recv().unwrap();
        assert_eq!(discard.change(), id);
        assert!(matches!(discard, DocumentCommand::DiscardOverlay { .. }));
    }

    #[test]
    fn closed_channel_is_tolerated() {
        let (tx, rx) = mpsc::unbounded_channel::<DocumentCommand>();
        drop(rx);
        tx.discard_overlay(&DocumentKey::new("doc", "body"), ChangeId::new());
    }
}
