use anyhow::Result;
use pretty_assertions::assert_eq;
use redline_engine::{ChangeFilter, ChangeTracker, EngineConfig, JsonlChangeStore, SuggestionDraft};
use redline_model::{ChangeStatus, EditDelta};
use redline_test_utils::*;
use std::sync::Arc;

async fn journal_tracker(dir: &std::path::Path) -> Result<(ChangeTracker, Arc<RecordingDocument>)> {
    let store = JsonlChangeStore::open(dir).await?;
    let document = Arc::new(RecordingDocument::new());
    let tracker = ChangeTracker::new(EngineConfig::default(), Arc::new(store), document.clone())?;
    Ok((tracker, document))
}

#[tokio::test]
async fn restart_reproduces_collection() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let ctx = context();
    let other = context_for(redline_model::DocumentKey::new("policy-42", "title"));

    let (tracker, _) = journal_tracker(dir.path()).await?;
    let first = tracker
        .record_change(EditDelta::insert(0, "Hello"), editor(), &ctx)
        .await?;
    let title = tracker
        .record_change(EditDelta::insert(0, "Title"), editor(), &other)
        .await?;
    let suggestion = tracker
        .propose_suggestion(SuggestionDraft::new("Hello", "Hi", "Make Shorter"), assistant(), &ctx)
        .await?;
    let last = tracker
        .record_change(EditDelta::delete(5, 10, "world"), editor(), &ctx)
        .await?;
    tracker.accept_change(first.id, &publisher()).await?;
    tracker.reject_suggestion(suggestion.id, &publisher()).await?;
    let before = tracker.changes(&ctx.key, &ChangeFilter::all()).await?;
    drop(tracker);

    let (restarted, document) = journal_tracker(dir.path()).await?;
    let after = restarted.changes(&ctx.key, &ChangeFilter::all()).await?;
    assert_eq!(after, before);
    assert_eq!(
        after.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![first.id, suggestion.id, last.id]
    );
    assert_eq!(after[0].status(), ChangeStatus::Accepted);
    assert_eq!(after[1].status(), ChangeStatus::Rejected);
    assert!(after[2].is_pending());

    assert_eq!(restarted.changes(&other.key, &ChangeFilter::all()).await?, vec![title]);

    // Resolved history survives; the pending change is still reviewable
    assert!(restarted.accept_change(first.id, &publisher()).await.is_err());
    restarted.accept_change(last.id, &publisher()).await?;
    assert!(document.commands().is_empty());
    Ok(())
}

#[tokio::test]
async fn reopened_suggestion_can_be_accepted() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let ctx = context();

    let (tracker, _) = journal_tracker(dir.path()).await?;
    let suggestion = tracker
        .propose_suggestion(SuggestionDraft::new("teh", "the", "Fix Spelling & Grammar"), assistant(), &ctx)
        .await?;
    drop(tracker);

    let (restarted, document) = journal_tracker(dir.path()).await?;
    restarted.open(&ctx.key).await?;
    assert_eq!(restarted.bulk_accept_ai(&ctx.key, &publisher()).await?, 1);
    assert_eq!(document.replacements(), 1);
    assert_eq!(
        restarted.get(suggestion.id).map(|r| r.status()),
        Some(ChangeStatus::Accepted)
    );
    Ok(())
}
