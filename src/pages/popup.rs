use crate::api::summary_edit_path;
use crate::components::ui::{
    Alert, AlertDescription, Button, ButtonSize, ButtonVariant, Input, Label, Spinner,
};
use crate::delta::Delta;
use crate::models::{create_summary, DocumentKey, SummaryDetails};
use crate::state::{AppContext, PopupState, POPUP_CLOSE_DELAY_MS};
use crate::util::{navigate_to, reload_page};
use leptos::ev;
use leptos::logging::error;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dom::helpers::window_event_listener;
use std::cell::RefCell;
use wasm_bindgen::JsCast;

/// Hide the popup after a short delay, then optionally reload the page.
///
/// The popup stays mounted, with its controls disabled, until the delay ends.
fn close_popup(popup: RwSignal<PopupState>, then_reload: bool) {
    if !popup.try_update(|p| p.begin_close()).unwrap_or(false) {
        // Already on its way out; the save still asks for its reload.
        if then_reload {
            reload_page();
        }
        return;
    }
    let cb = wasm_bindgen::closure::Closure::once_into_js(move || {
        popup.set(PopupState::hidden());
        if then_reload {
            reload_page();
        }
    });
    let _ = window().set_timeout_with_callback_and_timeout_and_arguments_0(
        cb.as_ref().unchecked_ref(),
        POPUP_CLOSE_DELAY_MS,
    );
}

/// Title, author and link form used both to create a summary and to edit
/// the open one.
#[component]
pub fn SummaryDetailsPopup() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let popup = app_state.0.popup;

    let title = RwSignal::new(String::new());
    let book_author = RwSignal::new(String::new());
    let book_url = RwSignal::new(String::new());
    let chapters = RwSignal::new(String::new());

    // Refill the inputs whenever the popup opens.
    Effect::new(move |was_visible: Option<bool>| {
        let visible = popup.with(|p| p.is_visible());
        if visible && was_visible != Some(true) {
            popup.with_untracked(|p| {
                title.set(p.fields.title.clone());
                book_author.set(p.fields.book_author.clone());
                book_url.set(p.fields.book_url.clone());
                chapters.set(p.chapters.clone());
            });
        }
        visible
    });

    // Set while the edited details wait for a running summary write.
    let awaiting_save = RwSignal::new(false);
    let autosave = app_state.0.autosave;

    let save_details = move || {
        spawn_local(async move {
            match app_state.0.flush_now(DocumentKey::Summary).await {
                Some(Ok(())) => close_popup(popup, true),
                Some(Err(e)) => popup.update(|p| p.fail(e.to_string())),
                None if autosave.with_untracked(|c| c.is_in_flight(&DocumentKey::Summary)) => {
                    awaiting_save.set(true);
                }
                // Another write already carried the details.
                None => close_popup(popup, true),
            }
        });
    };

    Effect::new(move |_| {
        if !awaiting_save.get() {
            return;
        }
        if autosave.with(|c| c.is_in_flight(&DocumentKey::Summary)) {
            return;
        }
        awaiting_save.set(false);
        save_details();
    });

    let key_handle = window_event_listener(ev::keydown, move |ev: web_sys::KeyboardEvent| {
        if ev.key() == "Escape" && popup.with_untracked(|p| p.is_visible()) {
            close_popup(popup, false);
        }
    });
    on_cleanup(move || key_handle.remove());

    let submit = move || {
        if popup.with_untracked(|p| p.submitting || p.is_closing()) {
            return;
        }
        popup.update(|p| {
            p.fields = SummaryDetails {
                title: title.get_untracked(),
                book_author: book_author.get_untracked(),
                book_url: book_url.get_untracked(),
            };
            p.chapters = chapters.get_untracked();
        });
        let Some(doc) = popup.try_update(|p| p.prepare_submit()).flatten() else {
            return;
        };
        let (creating, headings) = popup.with_untracked(|p| (p.is_create(), p.chapter_headings()));
        let api_client = app_state.0.api_client.get_untracked();

        if creating {
            spawn_local(async move {
                let draft = RefCell::new(doc);
                match create_summary(&draft, &api_client, &headings).await {
                    Ok(uid) => navigate_to(&summary_edit_path(&uid)),
                    Err(e) => {
                        error!("Failed to create summary: {e}");
                        popup.update(|p| p.fail(e.to_string()));
                    }
                }
            });
            return;
        }

        app_state
            .0
            .summary
            .update(|s| s.apply_details(&doc.details()));
        app_state.0.record_edit(DocumentKey::Summary, &Delta::new());
        save_details();
    };

    view! {
        <Show when=move || popup.with(|p| p.is_visible()) fallback=|| ().into_view()>
            <div class="fixed inset-0 z-50 flex items-center justify-center bg-black/30 px-4">
                <div class="w-full max-w-sm rounded-md border border-border bg-background p-4 shadow-lg">
                    <div class="mb-3 space-y-1">
                        <div class="text-sm font-medium">
                            {move || if popup.with(|p| p.is_create()) { "New book summary" } else { "Edit book details" }}
                        </div>
                    </div>

                    <div
                        class="space-y-2"
                        on:keydown=move |ev: web_sys::KeyboardEvent| {
                            if ev.key() == "Enter" {
                                ev.prevent_default();
                                submit();
                            }
                        }
                    >
                        <div class="space-y-1">
                            <Label html_for="summary-title" class="text-xs">"Title"</Label>
                            <Input
                                id="summary-title"
                                attr:disabled=move || popup.with(|p| p.is_closing())
                                bind_value=title
                                required=true
                                class="h-8 text-sm border-border bg-background"
                            />
                        </div>
                        <div class="space-y-1">
                            <Label html_for="summary-author" class="text-xs">"Author"</Label>
                            <Input
                                id="summary-author"
                                attr:disabled=move || popup.with(|p| p.is_closing())
                                bind_value=book_author
                                class="h-8 text-sm border-border bg-background"
                            />
                        </div>
                        <div class="space-y-1">
                            <Label html_for="summary-url" class="text-xs">"Book URL"</Label>
                            <Input
                                id="summary-url"
                                attr:disabled=move || popup.with(|p| p.is_closing())
                                r#type="url"
                                bind_value=book_url
                                placeholder="https://"
                                class="h-8 text-sm border-border bg-background"
                            />
                        </div>

                        <Show when=move || popup.with(|p| p.is_create()) fallback=|| ().into_view()>
                            <div class="space-y-1">
                                <Label html_for="summary-chapters" class="text-xs">"Chapters (comma separated)"</Label>
                                <Input
                                    id="summary-chapters"
                                    attr:disabled=move || popup.with(|p| p.is_closing())
                                    bind_value=chapters
                                    placeholder="Prologue, Part One, Part Two"
                                    class="h-8 text-sm border-border bg-background"
                                />
                            </div>
                        </Show>

                        <Show when=move || popup.with(|p| p.error.is_some()) fallback=|| ().into_view()>
                            {move || popup.with(|p| p.error.clone()).map(|e| view! {
                                <Alert class="border-destructive/30">
                                    <AlertDescription class="text-destructive text-xs">{e}</AlertDescription>
                                </Alert>
                            })}
                        </Show>

                        <div class="flex items-center justify-end gap-2 pt-2">
                            <Button
                                variant=ButtonVariant::Outline
                                size=ButtonSize::Sm
                                attr:disabled=move || popup.with(|p| p.submitting || p.is_closing())
                                on:click=move |_| close_popup(popup, false)
                            >
                                "Cancel"
                            </Button>
                            <Button
                                size=ButtonSize::Sm
                                attr:disabled=move || popup.with(|p| p.submitting || p.is_closing())
                                on:click=move |_| submit()
                            >
                                <span class="inline-flex items-center gap-2">
                                    <Show when=move || popup.with(|p| p.submitting) fallback=|| ().into_view()>
                                        <Spinner />
                                    </Show>
                                    {move || if popup.with(|p| p.is_create()) { "Create" } else { "Save" }}
                                </span>
                            </Button>
                        </div>
                    </div>
                </div>
            </div>
        </Show>
    }
}
