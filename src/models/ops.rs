//! REST operations on a summary and its chapters.
//!
//! Local state changes only after the server acknowledges the write.

use super::{BookSummary, Chapter, DocumentKey};
use crate::api::{ApiError, ApiResult, SummaryStore};
use crate::util::Shared;

fn require_uid<C: Shared<BookSummary>>(summary: &C) -> ApiResult<String> {
    let uid = summary.with_state(|s| s.uid().to_string());
    if uid.trim().is_empty() {
        return Err(ApiError::invalid("Summary has not been created yet"));
    }
    Ok(uid)
}

/// `PUT /summaries/{uid}` with the whole document.
pub(crate) async fn save_summary<C, S>(summary: &C, store: &S) -> ApiResult<()>
where
    C: Shared<BookSummary>,
    S: SummaryStore,
{
    require_uid(summary)?;
    let snapshot = summary.with_state(BookSummary::clone);
    store.put_summary(&snapshot).await
}

/// `POST /summaries`; returns the uid the server assigned.
pub(crate) async fn create_summary<C, S>(
    summary: &C,
    store: &S,
    chapter_headings: &[String],
) -> ApiResult<String>
where
    C: Shared<BookSummary>,
    S: SummaryStore,
{
    let (created, details, req) = summary.with_state(|s| {
        (
            s.is_created(),
            s.details(),
            s.create_request(chapter_headings),
        )
    });
    if created {
        return Err(ApiError::invalid("Summary already exists"));
    }
    if req.title.trim().is_empty() {
        return Err(ApiError::invalid("Book title cannot be empty"));
    }

    let mut server = store.create_summary(&req).await?;
    if server.title().is_empty() {
        server.apply_details(&details);
    }
    let uid = server.uid().to_string();
    summary.update_state(|s| s.hydrate(server));
    Ok(uid)
}

/// `DELETE /summaries/{uid}`; chapters go with it on the server.
pub(crate) async fn delete_summary<C, S>(summary: &C, store: &S) -> ApiResult<()>
where
    C: Shared<BookSummary>,
    S: SummaryStore,
{
    let uid = require_uid(summary)?;
    store.delete_summary(&uid).await
}

pub(crate) async fn save_chapter<C, S>(summary: &C, store: &S, chapter_id: &str) -> ApiResult<()>
where
    C: Shared<BookSummary>,
    S: SummaryStore,
{
    let uid = require_uid(summary)?;
    let Some(chapter) = summary.with_state(|s| s.chapter(chapter_id).cloned()) else {
        return Err(ApiError::invalid(format!("No chapter with id {chapter_id}")));
    };
    store.put_chapter(&uid, &chapter).await
}

/// Save whichever document `key` names.
pub(crate) async fn save_document<C, S>(summary: &C, store: &S, key: &DocumentKey) -> ApiResult<()>
where
    C: Shared<BookSummary>,
    S: SummaryStore,
{
    match key {
        DocumentKey::Summary => save_summary(summary, store).await,
        DocumentKey::Chapter(id) => save_chapter(summary, store, id).await,
    }
}

/// `POST /summaries/{uid}/chapters/`; the new chapter goes first.
pub(crate) async fn create_chapter<C, S>(summary: &C, store: &S, heading: &str) -> ApiResult<Chapter>
where
    C: Shared<BookSummary>,
    S: SummaryStore,
{
    let heading = heading.trim();
    if heading.is_empty() {
        return Err(ApiError::invalid("Chapter heading cannot be empty"));
    }
    let uid = require_uid(summary)?;

    let chapter = store.create_chapter(&uid, heading).await?;
    summary.update_state(|s| s.prepend_chapter(chapter.clone()));
    Ok(chapter)
}

pub(crate) async fn delete_chapter<C, S>(summary: &C, store: &S, chapter_id: &str) -> ApiResult<()>
where
    C: Shared<BookSummary>,
    S: SummaryStore,
{
    let uid = require_uid(summary)?;
    if summary.with_state(|s| s.chapter_index(chapter_id)).is_none() {
        return Err(ApiError::invalid(format!("No chapter with id {chapter_id}")));
    }

    store.delete_chapter(&uid, chapter_id).await?;
    summary.update_state(|s| s.remove_chapter(chapter_id));
    Ok(())
}

/// Move the chapter at `from` to `to` once the server confirms.
///
/// Returns `Ok(false)` for a no-op move, which never reaches the server.
pub(crate) async fn reorder_chapter<C, S>(
    summary: &C,
    store: &S,
    from: usize,
    to: usize,
) -> ApiResult<bool>
where
    C: Shared<BookSummary>,
    S: SummaryStore,
{
    if from == to {
        return Ok(false);
    }
    let len = summary.with_state(|s| s.chapters().len());
    if from >= len || to >= len {
        return Err(ApiError::invalid(format!(
            "Chapter index out of range ({from} -> {to}, {len} chapters)"
        )));
    }
    let uid = require_uid(summary)?;

    store.reorder_chapters(&uid, from, to).await?;
    summary.update_state(|s| s.move_chapter(from, to));
    Ok(true)
}
