//! In-memory `SummaryStore` that records every request.

use super::{
    chapter_path, chapters_path, summaries_path, summary_path, ApiError, ApiErrorKind,
    ApiResult, CreateSummaryRequest, SummaryStore,
};
use crate::models::{BookSummary, Chapter};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RecordedCall {
    pub method: &'static str,
    pub path: String,
    pub body: Value,
}

#[derive(Default)]
pub(crate) struct RecordingStore {
    calls: RefCell<Vec<RecordedCall>>,
    fail: Cell<bool>,
    next_id: Cell<u32>,
}

impl RecordingStore {
    pub(crate) fn failing() -> Self {
        let store = Self::default();
        store.set_failing(true);
        store
    }

    pub(crate) fn set_failing(&self, fail: bool) {
        self.fail.set(fail);
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    fn record(&self, method: &'static str, path: String, body: Value) -> ApiResult<()> {
        self.calls
            .borrow_mut()
            .push(RecordedCall { method, path, body });
        if self.fail.get() {
            return Err(ApiError {
                kind: ApiErrorKind::Network,
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.next_id.get() + 1;
        self.next_id.set(n);
        format!("{prefix}-{n}")
    }
}

impl SummaryStore for RecordingStore {
    async fn put_summary(&self, summary: &BookSummary) -> ApiResult<()> {
        self.record("PUT", summary_path(summary.uid()), summary.to_json())
    }

    async fn create_summary(&self, req: &CreateSummaryRequest) -> ApiResult<BookSummary> {
        let body = serde_json::to_value(req).unwrap_or_default();
        self.record("POST", summaries_path(), body)?;
        let uid = self.next_id("s");
        BookSummary::from_value(json!({ "uid": uid, "title": req.title }))
            .map_err(ApiError::parse)
    }

    async fn delete_summary(&self, uid: &str) -> ApiResult<()> {
        self.record("DELETE", summary_path(uid), Value::Null)
    }

    async fn create_chapter(&self, uid: &str, heading: &str) -> ApiResult<Chapter> {
        self.record("POST", chapters_path(uid), json!({ "heading": heading }))?;
        let id = self.next_id("c");
        Chapter::from_value(json!({ "id": id, "heading": heading })).map_err(ApiError::parse)
    }

    async fn put_chapter(&self, uid: &str, chapter: &Chapter) -> ApiResult<()> {
        let body = serde_json::to_value(chapter.update_request()).unwrap_or_default();
        self.record("PUT", chapter_path(uid, chapter.id()), body)
    }

    async fn delete_chapter(&self, uid: &str, chapter_id: &str) -> ApiResult<()> {
        self.record("DELETE", chapter_path(uid, chapter_id), Value::Null)
    }

    async fn reorder_chapters(
        &self,
        uid: &str,
        old_index: usize,
        new_index: usize,
    ) -> ApiResult<()> {
        self.record(
            "PUT",
            chapters_path(uid),
            json!({ "old_index": old_index, "new_index": new_index }),
        )
    }
}
