mod autosave;
mod chapter_form;
mod popup;

pub(crate) use autosave::{
    flush_document, AutosaveCoordinator, EditorContent, SaveStatus, AUTOSAVE_INTERVAL_MS,
};
pub(crate) use chapter_form::{ChapterForm, EMPTY_HEADING_WARNING, WARNING_DISPLAY_MS};
pub(crate) use popup::{PopupState, POPUP_CLOSE_DELAY_MS};

use crate::api::{ApiClient, ApiResult};
use crate::delta::Delta;
use crate::editor::EditorRegistry;
use crate::models::{BookSummary, DocumentKey};
use crate::util::read_data_attribute;
use leptos::logging::{error, warn};
use leptos::prelude::*;
use leptos::task::spawn_local;
use wasm_bindgen::JsCast;

/// Element the server renders the current summary into.
pub(crate) const SUMMARY_DATA_ELEMENT: &str = "data-bookreview";
pub(crate) const SUMMARY_DATA_ATTRIBUTE: &str = "data-bookreviewjson";

pub(crate) fn parse_embedded_summary(raw: Option<&str>) -> Option<BookSummary> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match BookSummary::from_json(raw) {
        Ok(summary) => Some(summary),
        Err(e) => {
            error!("Malformed embedded summary JSON: {e}");
            None
        }
    }
}

pub(crate) fn load_embedded_summary() -> Option<BookSummary> {
    let raw = read_data_attribute(SUMMARY_DATA_ELEMENT, SUMMARY_DATA_ATTRIBUTE);
    parse_embedded_summary(raw.as_deref())
}

#[derive(Clone, Copy)]
pub(crate) struct AppState {
    pub api_client: RwSignal<ApiClient>,

    /// The summary being edited; loaded from the page, then kept in sync
    /// with server acknowledgements.
    pub summary: RwSignal<BookSummary>,
    pub autosave: RwSignal<AutosaveCoordinator>,
    pub editors: StoredValue<EditorRegistry, LocalStorage>,

    pub popup: RwSignal<PopupState>,

    /// Last failed reorder/create/delete, shown inline.
    pub action_error: RwSignal<Option<String>>,
}

impl AppState {
    pub fn new() -> Self {
        let summary = load_embedded_summary().unwrap_or_default();

        Self {
            api_client: RwSignal::new(ApiClient::from_env()),
            summary: RwSignal::new(summary),
            autosave: RwSignal::new(AutosaveCoordinator::new(AUTOSAVE_INTERVAL_MS)),
            editors: StoredValue::new_local(EditorRegistry::default()),
            popup: RwSignal::new(PopupState::default()),
            action_error: RwSignal::new(None),
        }
    }

    pub(crate) fn record_edit(&self, key: DocumentKey, delta: &Delta) {
        self.autosave.update(|c| c.record(key, delta));
    }

    /// Force a write of `key` even when no edit was recorded (e.g. after a
    /// field outside the editor changed).
    pub(crate) fn save_soon(&self, key: DocumentKey) {
        self.record_edit(key.clone(), &Delta::new());
        self.flush(key);
    }

    /// Write one document in the background.
    pub(crate) fn flush(&self, key: DocumentKey) {
        let state = *self;
        spawn_local(async move {
            let _ = state.flush_now(key).await;
        });
    }

    pub(crate) async fn flush_now(&self, key: DocumentKey) -> Option<ApiResult<()>> {
        let api_client = self.api_client.get_untracked();
        let editors = self.editors.get_value();
        let result = flush_document(
            key.clone(),
            &self.autosave,
            &self.summary,
            &editors,
            &api_client,
        )
        .await;
        if let Some(Err(e)) = &result {
            error!("Failed to save {key:?}: {e}");
        }
        result
    }

    /// Start writing every document with pending edits.
    pub(crate) fn flush_all(&self) {
        let dirty = self.autosave.with_untracked(|c| c.dirty_documents());
        for key in dirty {
            self.flush(key);
        }
    }

    fn autosave_tick(&self) {
        let due = self.autosave.with_untracked(|c| c.tick());
        for key in due {
            self.flush(key);
        }
    }

    /// Run the autosave timer; returns its id for `clear_interval`.
    pub(crate) fn start_autosave(&self) -> Option<i32> {
        let win = web_sys::window()?;
        let state = *self;
        let interval = self.autosave.with_untracked(|c| c.interval_ms());
        let cb = wasm_bindgen::closure::Closure::wrap(Box::new(move || {
            state.autosave_tick();
        }) as Box<dyn FnMut()>);

        let id = win
            .set_interval_with_callback_and_timeout_and_arguments_0(
                cb.as_ref().unchecked_ref(),
                i32::try_from(interval).unwrap_or(i32::MAX),
            )
            .map_err(|e| warn!("Failed to start autosave timer: {e:?}"))
            .ok();
        cb.forget();
        id
    }

    pub(crate) fn unload_warning(&self) -> Option<&'static str> {
        self.autosave.with_untracked(|c| c.unload_warning())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
pub(crate) struct AppContext(pub AppState);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_embedded_summary() {
        let s = parse_embedded_summary(Some(
            r#"{"uid":"s1","title":"T","chapters":[{"id":"c1","heading":"Ch1"}]}"#,
        ))
        .expect("valid JSON");
        assert_eq!(s.uid(), "s1");
        assert_eq!(s.chapters()[0].heading(), "Ch1");
    }

    #[test]
    fn test_parse_embedded_summary_missing_or_blank() {
        assert!(parse_embedded_summary(None).is_none());
        assert!(parse_embedded_summary(Some("  ")).is_none());
    }

    #[test]
    fn test_parse_embedded_summary_malformed() {
        assert!(parse_embedded_summary(Some("{not json")).is_none());
    }
}
