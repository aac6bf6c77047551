//! Rewrite-generation collaborator
//!
//! A remote text-improvement service turns a selection into a proposed
//! replacement. The engine treats it as an opaque call, bounded by a timeout.

use crate::error::RewriteError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What the rewrite should do to the selection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteKind {
    ImproveWriting,
    FixSpellingAndGrammar,
    MakeShorter,
    MakeLonger,
    Simplify,
    /// Free-form instruction with its own label
    Custom(String),
}

impl RewriteKind {
    /// Label recorded as the change's AI operation
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            RewriteKind::ImproveWriting => "Improve Writing",
            RewriteKind::FixSpellingAndGrammar => "Fix Spelling & Grammar",
            RewriteKind::MakeShorter => "Make Shorter",
            RewriteKind::MakeLonger => "Make Longer",
            RewriteKind::Simplify => "Simplify",
            RewriteKind::Custom(label) => label,
        }
    }
}

impl std::fmt::Display for RewriteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One rewrite call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRequest {
    /// Text to rewrite
    pub selected_text: String,
    /// Requested operation
    pub kind: RewriteKind,
    /// Where the text lives (e.g. "Policy summary"), passed to the service as a hint
    pub context_label: Option<String>,
}

impl RewriteRequest {
    /// Create new request
    #[inline]
    #[must_use]
    pub fn new(selected_text: impl Into<String>, kind: RewriteKind) -> Self {
        Self {
            selected_text: selected_text.into(),
            kind,
            context_label: None,
        }
    }

    /// With context label
    #[inline]
    #[must_use]
    pub fn with_context(mut self, label: impl Into<String>) -> Self {
        self.context_label = Some(label.into());
        self
    }
}

/// Remote text-improvement service
#[async_trait]
pub trait RewriteService: Send + Sync {
    /// Produce improved text for the request
    async fn rewrite(&self, request: &RewriteRequest) -> Result<String, RewriteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels() {
        assert_eq!(RewriteKind::ImproveWriting.label(), "Improve Writing");
        assert_eq!(RewriteKind::Custom("Make Formal".into()).to_string(), "Make Formal");
    }

    #[test]
    fn request_builder() {
        let request = RewriteRequest::new("text", RewriteKind::Simplify).with_context("Summary");
        assert_eq!(request.context_label.as_deref(), Some("Summary"));
    }
}
