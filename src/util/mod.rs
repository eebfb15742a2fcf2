use leptos::prelude::*;
use std::cell::RefCell;

/// Shared mutable state that async operations read before and write after an `.await`.
///
/// Pages hold state in signals; tests hold it in a `RefCell`. Neither borrow
/// is ever kept across a suspension point.
pub(crate) trait Shared<T> {
    fn with_state<R>(&self, f: impl FnOnce(&T) -> R) -> R;

    /// `None` once the underlying state is gone (e.g. a disposed signal).
    fn update_state<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R>;
}

impl<T: Send + Sync + 'static> Shared<T> for RwSignal<T> {
    fn with_state<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.with_untracked(f)
    }

    fn update_state<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.try_update(f)
    }
}

impl<T> Shared<T> for RefCell<T> {
    fn with_state<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.borrow())
    }

    fn update_state<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        Some(f(&mut self.borrow_mut()))
    }
}

/// Read a `data-*` attribute the server rendered into the page.
pub(crate) fn read_data_attribute(element_id: &str, attribute: &str) -> Option<String> {
    let doc = web_sys::window()?.document()?;
    doc.get_element_by_id(element_id)?.get_attribute(attribute)
}

pub(crate) fn navigate_to(path: &str) {
    if let Some(w) = web_sys::window() {
        let _ = w.location().set_href(path);
    }
}

pub(crate) fn reload_page() {
    if let Some(w) = web_sys::window() {
        let _ = w.location().reload();
    }
}

/// Blocking browser confirm; false when no window is available.
pub(crate) fn confirm(message: &str) -> bool {
    web_sys::window()
        .and_then(|w| w.confirm_with_message(message).ok())
        .unwrap_or(false)
}
