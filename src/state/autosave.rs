use crate::api::{ApiResult, SummaryStore};
use crate::delta::Delta;
use crate::models::{save_document, BookSummary, DocumentKey};
use crate::util::Shared;
use std::collections::{BTreeMap, BTreeSet};

pub(crate) const AUTOSAVE_INTERVAL_MS: i64 = 5_000;

pub(crate) const UNSAVED_WARNING: &str =
    "There are unsaved changes. Are you sure you want to leave?";

/// Edits composed since the last flush of one document.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct PendingChanges {
    change: Delta,
    edits: usize,
}

impl PendingChanges {
    pub(crate) fn compose(&mut self, delta: &Delta) {
        self.change = self.change.compose(delta);
        self.edits += 1;
    }

    /// Empty iff nothing was composed since the last take.
    ///
    /// An insert followed by its own delete composes to an empty delta but
    /// still counts as an edit.
    pub(crate) fn is_empty(&self) -> bool {
        self.edits == 0
    }

    fn take(&mut self) -> PendingChanges {
        std::mem::take(self)
    }

    /// Put a failed flush back in front of whatever was recorded since.
    fn restore_before(&mut self, earlier: PendingChanges) {
        self.change = earlier.change.compose(&self.change);
        self.edits += earlier.edits;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub(crate) enum SaveStatus {
    #[strum(to_string = "All changes saved")]
    Saved,
    #[strum(to_string = "Unsaved changes")]
    Unsaved,
    #[strum(to_string = "Saving...")]
    Saving,
    #[strum(to_string = "Save failed")]
    Failed,
}

/// Proof that a flush started; hand it back to [`AutosaveCoordinator::finish`].
#[derive(Debug)]
pub(crate) struct FlushTicket {
    key: DocumentKey,
    change: PendingChanges,
}

/// Tracks unsaved edits per document and decides when to write them.
///
/// At most one write per document is in flight; edits made meanwhile wait
/// for the next tick. A failed write is not lost: its change goes back into
/// the accumulator.
#[derive(Clone, Debug)]
pub(crate) struct AutosaveCoordinator {
    interval_ms: i64,
    pending: BTreeMap<DocumentKey, PendingChanges>,
    in_flight: BTreeSet<DocumentKey>,
    last_error: Option<String>,
}

impl AutosaveCoordinator {
    pub(crate) fn new(interval_ms: i64) -> Self {
        Self {
            interval_ms,
            pending: BTreeMap::new(),
            in_flight: BTreeSet::new(),
            last_error: None,
        }
    }

    pub(crate) fn interval_ms(&self) -> i64 {
        self.interval_ms
    }

    /// Compose a change notification from an editor into its accumulator.
    pub(crate) fn record(&mut self, key: DocumentKey, delta: &Delta) {
        self.pending.entry(key).or_default().compose(delta);
    }

    pub(crate) fn pending(&self, key: &DocumentKey) -> Option<&PendingChanges> {
        self.pending.get(key).filter(|p| !p.is_empty())
    }

    pub(crate) fn is_dirty(&self, key: &DocumentKey) -> bool {
        self.pending(key).is_some()
    }

    pub(crate) fn has_unsaved(&self) -> bool {
        !self.in_flight.is_empty() || self.pending.values().any(|p| !p.is_empty())
    }

    /// Documents that need a write and have none running.
    pub(crate) fn dirty_documents(&self) -> Vec<DocumentKey> {
        self.pending
            .iter()
            .filter(|(k, p)| !p.is_empty() && !self.in_flight.contains(*k))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Interval callback. Every dirty document with no write running is due,
    /// however late or early the timer fired.
    pub(crate) fn tick(&self) -> Vec<DocumentKey> {
        self.dirty_documents()
    }

    pub(crate) fn is_in_flight(&self, key: &DocumentKey) -> bool {
        self.in_flight.contains(key)
    }

    pub(crate) fn begin_flush(&mut self, key: &DocumentKey) -> Option<FlushTicket> {
        if self.in_flight.contains(key) {
            return None;
        }
        let pending = self.pending.get_mut(key)?;
        if pending.is_empty() {
            return None;
        }
        let change = pending.take();
        self.in_flight.insert(key.clone());
        Some(FlushTicket {
            key: key.clone(),
            change,
        })
    }

    pub(crate) fn finish(&mut self, ticket: FlushTicket, result: &ApiResult<()>) {
        self.in_flight.remove(&ticket.key);
        match result {
            Ok(()) => {
                self.last_error = None;
            }
            Err(e) => {
                self.pending
                    .entry(ticket.key)
                    .or_default()
                    .restore_before(ticket.change);
                self.last_error = Some(e.to_string());
            }
        }
    }

    /// Drop a document entirely, e.g. after its chapter was deleted.
    pub(crate) fn forget(&mut self, key: &DocumentKey) {
        self.pending.remove(key);
    }

    /// Drop every pending edit; used once the summary itself is deleted.
    pub(crate) fn discard_all(&mut self) {
        self.pending.clear();
        self.last_error = None;
    }

    pub(crate) fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn status(&self) -> SaveStatus {
        if !self.in_flight.is_empty() {
            SaveStatus::Saving
        } else if self.last_error.is_some() {
            SaveStatus::Failed
        } else if self.has_unsaved() {
            SaveStatus::Unsaved
        } else {
            SaveStatus::Saved
        }
    }

    /// Text for the browser's `beforeunload` prompt, if leaving would lose edits.
    pub(crate) fn unload_warning(&self) -> Option<&'static str> {
        self.has_unsaved().then_some(UNSAVED_WARNING)
    }
}

/// Rendered HTML and full contents of a live editor.
pub(crate) trait EditorContent {
    fn content(&self, key: &DocumentKey) -> Option<(String, Delta)>;
}

/// Write one document if it has pending edits.
///
/// The editor's current HTML and contents go into the model, the model is
/// saved, and the outcome is reported back to the coordinator. Returns
/// `None` when there was nothing to do.
pub(crate) async fn flush_document<A, C, E, S>(
    key: DocumentKey,
    coordinator: &A,
    summary: &C,
    editors: &E,
    store: &S,
) -> Option<ApiResult<()>>
where
    A: Shared<AutosaveCoordinator>,
    C: Shared<BookSummary>,
    E: EditorContent + ?Sized,
    S: SummaryStore,
{
    let ticket = coordinator.update_state(|c| c.begin_flush(&key))??;

    if let Some((html, delta)) = editors.content(&key) {
        summary.update_state(|s| s.set_document_content(&key, html, delta));
    }

    let result = save_document(summary, store, &key).await;
    coordinator.update_state(|c| c.finish(ticket, &result));
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::RecordingStore;
    use futures::executor::block_on;
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct FakeEditors(HashMap<DocumentKey, (String, Delta)>);

    impl EditorContent for FakeEditors {
        fn content(&self, key: &DocumentKey) -> Option<(String, Delta)> {
            self.0.get(key).cloned()
        }
    }

    fn typed(text: &str) -> Delta {
        Delta::new().insert(text)
    }

    #[test]
    fn accumulator_tracks_edits_since_flush() {
        let mut c = AutosaveCoordinator::new(AUTOSAVE_INTERVAL_MS);
        let key = DocumentKey::Summary;
        assert!(!c.is_dirty(&key));

        c.record(key.clone(), &typed("a"));
        c.record(key.clone(), &Delta::new().delete(1));
        // Composes to nothing, but two edits happened.
        assert!(c.is_dirty(&key));
        assert!(c.pending(&key).map(|p| p.change.is_empty()).unwrap_or(false));
        assert_eq!(c.pending(&key).map(|p| p.edits), Some(2));

        let ticket = c.begin_flush(&key).expect("dirty document flushes");
        assert!(!c.is_dirty(&key));
        c.finish(ticket, &Ok(()));
        assert!(!c.is_dirty(&key));
        assert_eq!(c.status(), SaveStatus::Saved);
    }

    #[test]
    fn record_composes_instead_of_replacing() {
        let mut c = AutosaveCoordinator::new(AUTOSAVE_INTERVAL_MS);
        c.record(DocumentKey::Summary, &typed("Hello\n"));
        c.record(DocumentKey::Summary, &Delta::new().retain(5).insert("!"));
        assert_eq!(
            c.pending(&DocumentKey::Summary).map(|p| p.change.clone()),
            Some(typed("Hello!\n"))
        );
    }

    #[test]
    fn every_tick_flushes_dirty_documents() {
        let mut c = AutosaveCoordinator::new(5_000);
        assert!(c.tick().is_empty());
        c.record(DocumentKey::Summary, &typed("x"));
        assert_eq!(c.tick(), vec![DocumentKey::Summary]);
    }

    #[test]
    fn tick_after_late_timer_still_flushes() {
        // A late callback followed by an on-time one must not drop the edit
        // typed in between.
        let mut c = AutosaveCoordinator::new(5_000);
        assert!(c.tick().is_empty());
        c.record(DocumentKey::Summary, &typed("x"));
        assert_eq!(c.tick(), vec![DocumentKey::Summary]);
        let t = c.begin_flush(&DocumentKey::Summary).expect("flush");
        c.finish(t, &Ok(()));
        c.record(DocumentKey::Summary, &typed("y"));
        assert_eq!(c.tick(), vec![DocumentKey::Summary]);
    }

    #[test]
    fn tick_skips_document_with_write_running() {
        let mut c = AutosaveCoordinator::new(5_000);
        c.record(DocumentKey::Summary, &typed("x"));
        let t = c.begin_flush(&DocumentKey::Summary).expect("flush");
        c.record(DocumentKey::Summary, &typed("y"));
        assert!(c.tick().is_empty());
        c.finish(t, &Ok(()));
        assert_eq!(c.tick(), vec![DocumentKey::Summary]);
    }

    #[test]
    fn second_flush_waits_for_first() {
        let mut c = AutosaveCoordinator::new(AUTOSAVE_INTERVAL_MS);
        let key = DocumentKey::Chapter("c1".to_string());
        c.record(key.clone(), &typed("a"));
        let first = c.begin_flush(&key).expect("first flush");

        c.record(key.clone(), &Delta::new().retain(1).insert("b"));
        assert!(c.begin_flush(&key).is_none());
        assert!(c.dirty_documents().is_empty());
        assert_eq!(c.status(), SaveStatus::Saving);

        c.finish(first, &Ok(()));
        assert_eq!(c.dirty_documents(), vec![key.clone()]);
        assert!(c.begin_flush(&key).is_some());
    }

    #[test]
    fn forced_save_runs_after_running_write() {
        let mut c = AutosaveCoordinator::new(AUTOSAVE_INTERVAL_MS);
        let key = DocumentKey::Summary;
        c.record(key.clone(), &typed("a"));
        let running = c.begin_flush(&key).expect("timer flush");
        assert!(c.is_in_flight(&key));

        // Details changed outside the editor: an empty edit forces a write.
        c.record(key.clone(), &Delta::new());
        assert!(c.begin_flush(&key).is_none());

        c.finish(running, &Ok(()));
        assert!(!c.is_in_flight(&key));
        let forced = c.begin_flush(&key).expect("forced write goes out");
        assert!(forced.change.change.is_empty());
        assert_eq!(forced.change.edits, 1);
        c.finish(forced, &Ok(()));
        assert_eq!(c.status(), SaveStatus::Saved);
    }

    #[test]
    fn failed_flush_restores_changes_in_order() {
        let mut c = AutosaveCoordinator::new(AUTOSAVE_INTERVAL_MS);
        let key = DocumentKey::Summary;
        c.record(key.clone(), &typed("ab"));
        let ticket = c.begin_flush(&key).expect("flush");
        c.record(key.clone(), &Delta::new().retain(2).insert("c"));

        c.finish(
            ticket,
            &Err(crate::api::ApiError::invalid("server went away")),
        );
        let pending = c.pending(&key).expect("still dirty");
        assert_eq!(pending.change, typed("abc"));
        assert_eq!(pending.edits, 2);
        assert_eq!(c.status(), SaveStatus::Failed);
        assert_eq!(c.last_error(), Some("server went away"));
        assert_eq!(c.unload_warning(), Some(UNSAVED_WARNING));
    }

    #[test]
    fn unload_warning_only_with_unsaved_work() {
        let mut c = AutosaveCoordinator::new(AUTOSAVE_INTERVAL_MS);
        assert_eq!(c.unload_warning(), None);
        c.record(DocumentKey::Summary, &typed("x"));
        assert_eq!(c.unload_warning(), Some(UNSAVED_WARNING));
        let t = c.begin_flush(&DocumentKey::Summary).expect("flush");
        // In flight still counts.
        assert!(c.unload_warning().is_some());
        c.finish(t, &Ok(()));
        assert_eq!(c.unload_warning(), None);
    }

    #[test]
    fn forget_drops_deleted_chapter() {
        let mut c = AutosaveCoordinator::new(AUTOSAVE_INTERVAL_MS);
        let key = DocumentKey::Chapter("c9".to_string());
        c.record(key.clone(), &typed("x"));
        c.forget(&key);
        assert!(!c.has_unsaved());
    }

    #[test]
    fn discard_all_clears_warning() {
        let mut c = AutosaveCoordinator::new(AUTOSAVE_INTERVAL_MS);
        c.record(DocumentKey::Summary, &typed("x"));
        c.record(DocumentKey::Chapter("c1".to_string()), &typed("y"));
        c.discard_all();
        assert_eq!(c.unload_warning(), None);
        assert_eq!(c.status(), SaveStatus::Saved);
    }

    #[test]
    fn timer_flush_puts_summary_once() {
        let summary = RefCell::new(
            BookSummary::from_json(
                r#"{"uid":"s1","title":"T","chapters":[{"id":"c1","heading":"Ch1"}]}"#,
            )
            .expect("fixture should parse"),
        );
        let coordinator = RefCell::new(AutosaveCoordinator::new(AUTOSAVE_INTERVAL_MS));
        let store = RecordingStore::default();
        let contents = typed("Hello\n");
        let editors = FakeEditors(HashMap::from([(
            DocumentKey::Summary,
            ("<p>Hello</p>".to_string(), contents.clone()),
        )]));

        coordinator
            .borrow_mut()
            .record(DocumentKey::Summary, &typed("Hello"));

        let due = coordinator.borrow_mut().tick();
        assert_eq!(due, vec![DocumentKey::Summary]);
        for key in due {
            let result = block_on(flush_document(key, &coordinator, &summary, &editors, &store));
            assert!(matches!(result, Some(Ok(()))));
        }

        let calls = store.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, "PUT");
        assert_eq!(calls[0].path, "/summaries/s1");
        assert_eq!(calls[0].body["html"], "<p>Hello</p>");
        assert_eq!(calls[0].body["delta"], contents.to_wire());
        assert!(!coordinator.borrow().is_dirty(&DocumentKey::Summary));
        assert_eq!(coordinator.borrow().status(), SaveStatus::Saved);

        // Nothing new typed: the next tick writes nothing.
        let due = coordinator.borrow_mut().tick();
        assert!(due.is_empty());
        assert_eq!(store.calls().len(), 1);
    }

    #[test]
    fn chapter_flush_puts_chapter() {
        let summary = RefCell::new(
            BookSummary::from_json(r#"{"uid":"s1","chapters":[{"id":"c1","heading":"Ch1"}]}"#)
                .expect("fixture should parse"),
        );
        let key = DocumentKey::Chapter("c1".to_string());
        let coordinator = RefCell::new(AutosaveCoordinator::new(AUTOSAVE_INTERVAL_MS));
        coordinator.borrow_mut().record(key.clone(), &typed("x"));
        let editors = FakeEditors(HashMap::from([(
            key.clone(),
            ("<p>x</p>".to_string(), typed("x\n")),
        )]));
        let store = RecordingStore::default();

        let result = block_on(flush_document(key, &coordinator, &summary, &editors, &store));
        assert!(matches!(result, Some(Ok(()))));
        let calls = store.calls();
        assert_eq!(calls[0].path, "/summaries/s1/chapters/c1");
        assert_eq!(calls[0].body["html"], "<p>x</p>");
        assert_eq!(summary.borrow().chapters()[0].html(), "<p>x</p>");
    }

    #[test]
    fn failed_write_keeps_document_dirty() {
        let summary = RefCell::new(
            BookSummary::from_json(r#"{"uid":"s1"}"#).expect("fixture should parse"),
        );
        let coordinator = RefCell::new(AutosaveCoordinator::new(AUTOSAVE_INTERVAL_MS));
        coordinator
            .borrow_mut()
            .record(DocumentKey::Summary, &typed("x"));
        let editors = FakeEditors(HashMap::new());
        let store = RecordingStore::failing();

        let result = block_on(flush_document(
            DocumentKey::Summary,
            &coordinator,
            &summary,
            &editors,
            &store,
        ));
        assert!(matches!(result, Some(Err(_))));
        assert!(coordinator.borrow().is_dirty(&DocumentKey::Summary));

        store.set_failing(false);
        let result = block_on(flush_document(
            DocumentKey::Summary,
            &coordinator,
            &summary,
            &editors,
            &store,
        ));
        assert!(matches!(result, Some(Ok(()))));
        assert_eq!(store.calls().len(), 2);
        assert_eq!(coordinator.borrow().status(), SaveStatus::Saved);
    }

    #[test]
    fn clean_document_is_not_written() {
        let summary = RefCell::new(BookSummary::from_json(r#"{"uid":"s1"}"#).expect("parse"));
        let coordinator = RefCell::new(AutosaveCoordinator::new(AUTOSAVE_INTERVAL_MS));
        let store = RecordingStore::default();
        let result = block_on(flush_document(
            DocumentKey::Summary,
            &coordinator,
            &summary,
            &FakeEditors(HashMap::new()),
            &store,
        ));
        assert!(result.is_none());
        assert!(store.calls().is_empty());
    }
}
