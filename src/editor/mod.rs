mod quill;

use quill::{Quill, TextChangeListener};

use crate::delta::Delta;
use crate::models::{Chapter, DocumentKey};
use crate::state::{AppContext, EditorContent};
use leptos::html;
use leptos::logging::error;
use leptos::prelude::*;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

struct MountedEditor {
    quill: Quill,
    _on_change: TextChangeListener,
}

/// Live Quill instances, keyed by the document they edit.
#[derive(Clone, Default)]
pub(crate) struct EditorRegistry {
    editors: Rc<RefCell<HashMap<DocumentKey, MountedEditor>>>,
}

impl EditorRegistry {
    /// Track `quill` until [`EditorRegistry::unregister`]; `on_change` stays
    /// attached exactly as long.
    pub(crate) fn register(&self, key: DocumentKey, quill: Quill, on_change: TextChangeListener) {
        self.editors.borrow_mut().insert(
            key,
            MountedEditor {
                quill,
                _on_change: on_change,
            },
        );
    }

    pub(crate) fn unregister(&self, key: &DocumentKey) {
        self.editors.borrow_mut().remove(key);
    }

    #[cfg(test)]
    pub(crate) fn is_registered(&self, key: &DocumentKey) -> bool {
        self.editors.borrow().contains_key(key)
    }
}

impl EditorContent for EditorRegistry {
    fn content(&self, key: &DocumentKey) -> Option<(String, Delta)> {
        let editors = self.editors.borrow();
        let quill = &editors.get(key)?.quill;
        Some((quill.html(), quill.contents()))
    }
}

/// Rich-text editor for one document. Every change is recorded with the
/// autosave coordinator; the timer does the writing.
#[component]
pub(crate) fn RichTextEditor(doc: DocumentKey, #[prop(into)] placeholder: String) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let container: NodeRef<html::Div> = NodeRef::new();
    let doc_sv = StoredValue::new(doc);
    let placeholder_sv = StoredValue::new(placeholder);
    let mounted = StoredValue::new(false);

    Effect::new(move |_| {
        let Some(el) = container.get() else {
            return;
        };
        if mounted.get_value() {
            return;
        }
        mounted.set_value(true);

        let key = doc_sv.get_value();
        let initial = app_state
            .0
            .summary
            .with_untracked(|s| s.document_html(&key).map(str::to_string))
            .unwrap_or_default();
        el.set_inner_html(&initial);

        let quill = match Quill::mount(&el, &placeholder_sv.get_value()) {
            Ok(q) => q,
            Err(e) => {
                error!("Failed to start editor for {key:?}: {e:?}");
                return;
            }
        };

        let key_for_change = key.clone();
        let on_change = quill.on_text_change(move |delta| {
            app_state.0.record_edit(key_for_change.clone(), &delta);
        });
        app_state
            .0
            .editors
            .with_value(|r| r.register(key, quill, on_change));
    });

    // Collapsing a chapter unmounts its editor; keep what was typed so the
    // next autosave still writes it.
    on_cleanup(move || {
        let key = doc_sv.get_value();
        let content = app_state.0.editors.with_value(|r| {
            let content = r.content(&key);
            r.unregister(&key);
            content
        });
        if let Some((html, delta)) = content {
            app_state
                .0
                .summary
                .try_update_untracked(|s| s.set_document_content(&key, html, delta));
        }
    });

    view! { <div node_ref=container class="min-h-[160px] bg-background"></div> }
}

/// Turn a drop of `dragged_id` onto `target_id` into a `(from, to)` index move.
///
/// `insert_after` is true when the cursor was in the lower half of the target
/// row. `None` for unknown ids or when the chapter would not move.
pub(crate) fn resolve_drop(
    chapters: &[Chapter],
    dragged_id: &str,
    target_id: &str,
    insert_after: bool,
) -> Option<(usize, usize)> {
    if dragged_id == target_id {
        return None;
    }
    let from = chapters.iter().position(|c| c.id() == dragged_id)?;
    let target = chapters.iter().position(|c| c.id() == target_id)?;

    // Index among the remaining rows once the dragged one is lifted out.
    let target_after_removal = if target > from { target - 1 } else { target };
    let to = if insert_after {
        target_after_removal + 1
    } else {
        target_after_removal
    };

    (to != from).then_some((from, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{chapter_for_test, BookSummary};

    fn rows() -> Vec<Chapter> {
        ["a", "b", "c", "d"]
            .iter()
            .map(|id| chapter_for_test(id, &id.to_uppercase()))
            .collect()
    }

    fn apply(chapters: &[Chapter], from: usize, to: usize) -> Vec<String> {
        let mut s = BookSummary::default();
        for c in chapters.iter().rev() {
            s.prepend_chapter(c.clone());
        }
        assert!(s.move_chapter(from, to));
        s.chapters().iter().map(|c| c.id().to_string()).collect()
    }

    #[test]
    fn test_drop_on_self_is_ignored() {
        assert_eq!(resolve_drop(&rows(), "b", "b", true), None);
    }

    #[test]
    fn test_drop_unknown_ids() {
        assert_eq!(resolve_drop(&rows(), "x", "b", true), None);
        assert_eq!(resolve_drop(&rows(), "a", "x", false), None);
    }

    #[test]
    fn test_drop_down_before_and_after() {
        let chapters = rows();
        let (from, to) = resolve_drop(&chapters, "a", "c", false).expect("moves");
        assert_eq!(apply(&chapters, from, to), ["b", "a", "c", "d"]);

        let (from, to) = resolve_drop(&chapters, "a", "c", true).expect("moves");
        assert_eq!(apply(&chapters, from, to), ["b", "c", "a", "d"]);

        let (from, to) = resolve_drop(&chapters, "a", "d", true).expect("moves");
        assert_eq!((from, to), (0, 3));
    }

    #[test]
    fn test_drop_up_before_and_after() {
        let chapters = rows();
        let (from, to) = resolve_drop(&chapters, "d", "a", false).expect("moves");
        assert_eq!(apply(&chapters, from, to), ["d", "a", "b", "c"]);

        let (from, to) = resolve_drop(&chapters, "d", "b", true).expect("moves");
        assert_eq!(apply(&chapters, from, to), ["a", "b", "d", "c"]);
    }

    #[test]
    fn test_drop_next_to_neighbour_without_moving() {
        let chapters = rows();
        // Lower half of the row above, or upper half of the row below.
        assert_eq!(resolve_drop(&chapters, "b", "a", true), None);
        assert_eq!(resolve_drop(&chapters, "b", "c", false), None);
    }
}
