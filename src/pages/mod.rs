mod chapters;
mod popup;

pub use chapters::ChapterList;
pub use popup::SummaryDetailsPopup;

use crate::components::ui::{
    Alert, AlertDescription, Button, ButtonSize, ButtonVariant, Card, CardContent,
    CardDescription, CardHeader, CardTitle,
};
use crate::editor::RichTextEditor;
use crate::models::{delete_summary, DocumentKey};
use crate::state::{AppContext, PopupState, SaveStatus};
use crate::util::{confirm, navigate_to};
use leptos::ev;
use leptos::logging::{error, log};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dom::helpers::window_event_listener;
use leptos_router::params::Params;

pub(crate) const DELETE_CONFIRMATION: &str = "Are you sure you want to delete this review?";

#[derive(Params, PartialEq, Clone, Debug)]
pub struct SummaryRouteParams {
    pub uid: Option<String>,
}

#[component]
pub fn IndexPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();

    view! {
        <div class="min-h-screen bg-background">
            <div class="mx-auto flex w-full max-w-2xl flex-col gap-4 px-4 py-10">
                <Card>
                    <CardHeader>
                        <CardTitle class="text-lg">"Book summaries"</CardTitle>
                        <CardDescription class="text-xs">
                            "Write a summary of a book, chapter by chapter."
                        </CardDescription>
                    </CardHeader>
                    <CardContent>
                        <Button
                            size=ButtonSize::Sm
                            on:click=move |_| app_state.0.popup.set(PopupState::open_create())
                        >
                            "New summary"
                        </Button>
                    </CardContent>
                </Card>
            </div>
            <SummaryDetailsPopup />
        </div>
    }
}

#[component]
pub fn SummaryEditorPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let summary = app_state.0.summary;
    let autosave = app_state.0.autosave;
    let action_error = app_state.0.action_error;

    let params = leptos_router::hooks::use_params::<SummaryRouteParams>();
    let route_uid = move || params.get().ok().and_then(|p| p.uid).unwrap_or_default();
    let loaded = move || {
        let uid = route_uid();
        summary.with(|s| s.is_created() && s.uid() == uid)
    };

    // Set once Save was pressed while another write was still running.
    let leaving = RwSignal::new(false);
    let deleting = RwSignal::new(false);

    let timer_id = app_state.0.start_autosave();
    let unload_handle = window_event_listener(ev::beforeunload, move |ev: web_sys::BeforeUnloadEvent| {
        if let Some(message) = app_state.0.unload_warning() {
            // Best effort; the browser may tear the page down first.
            app_state.0.flush_all();
            ev.prevent_default();
            ev.set_return_value(message);
        }
    });
    on_cleanup(move || {
        unload_handle.remove();
        if let (Some(id), Some(win)) = (timer_id, web_sys::window()) {
            win.clear_interval_with_handle(id);
        }
    });

    Effect::new(move |_| {
        if !leaving.get() {
            return;
        }
        match autosave.with(|c| c.status()) {
            SaveStatus::Saved => navigate_to("/"),
            SaveStatus::Failed => leaving.set(false),
            SaveStatus::Saving | SaveStatus::Unsaved => {}
        }
    });

    let on_save = move |_| {
        action_error.set(None);
        spawn_local(async move {
            let dirty = autosave.with_untracked(|c| c.dirty_documents());
            for key in dirty {
                if let Some(Err(e)) = app_state.0.flush_now(key).await {
                    action_error.set(Some(format!("Could not save: {e}")));
                    return;
                }
            }
            if autosave.with_untracked(|c| c.has_unsaved()) {
                log!("Waiting for a running save before leaving");
                leaving.set(true);
            } else {
                navigate_to("/");
            }
        });
    };

    let on_delete = move |_| {
        if deleting.get_untracked() || !confirm(DELETE_CONFIRMATION) {
            return;
        }
        deleting.set(true);
        let api_client = app_state.0.api_client.get_untracked();
        spawn_local(async move {
            match delete_summary(&summary, &api_client).await {
                Ok(()) => {
                    autosave.update(|c| c.discard_all());
                    navigate_to("/");
                }
                Err(e) => {
                    error!("Failed to delete summary: {e}");
                    action_error.set(Some(format!("Could not delete summary: {e}")));
                    deleting.set(false);
                }
            }
        });
    };

    let on_ongoing = move |ev: web_sys::Event| {
        let checked = event_target_checked(&ev);
        summary.update(|s| s.set_ongoing(checked));
        app_state.0.save_soon(DocumentKey::Summary);
    };

    let on_edit_details = move |_| {
        let popup = summary.with_untracked(PopupState::open_edit);
        app_state.0.popup.set(popup);
    };

    view! {
        <div class="min-h-screen bg-background">
            <Show
                when=loaded
                fallback=|| view! {
                    <div class="mx-auto max-w-3xl px-4 py-10">
                        <Alert class="border-destructive/30">
                            <AlertDescription class="text-destructive text-xs">
                                "This summary could not be loaded."
                            </AlertDescription>
                        </Alert>
                    </div>
                }
            >
                <div class="mx-auto flex w-full max-w-3xl flex-col gap-6 px-4 py-8">
                    <div class="flex items-start justify-between gap-4">
                        <div class="min-w-0 space-y-1">
                            <h1 class="truncate text-xl font-semibold">
                                {move || summary.with(|s| s.title().to_string())}
                            </h1>
                            <div class="text-xs text-muted-foreground">
                                {move || summary.with(|s| s.book_author().to_string())}
                            </div>
                        </div>
                        <div class="flex shrink-0 items-center gap-3">
                            <span class="text-xs text-muted-foreground">
                                {move || autosave.with(|c| match (c.status(), c.last_error()) {
                                    (SaveStatus::Failed, Some(e)) => format!("{}: {e}", SaveStatus::Failed),
                                    (status, _) => status.to_string(),
                                })}
                            </span>
                            <Button
                                variant=ButtonVariant::Outline
                                size=ButtonSize::Sm
                                on:click=on_edit_details
                            >
                                "Edit details"
                            </Button>
                        </div>
                    </div>

                    <Show when=move || action_error.get().is_some() fallback=|| ().into_view()>
                        {move || action_error.get().map(|e| view! {
                            <Alert class="border-destructive/30">
                                <AlertDescription class="text-destructive text-xs">{e}</AlertDescription>
                            </Alert>
                        })}
                    </Show>

                    <section class="space-y-2">
                        <h2 class="text-lg font-semibold">"Overall Book Summary"</h2>
                        <RichTextEditor doc=DocumentKey::Summary placeholder="Start your summary ..." />
                    </section>

                    <section class="space-y-2">
                        <h2 class="text-lg font-semibold">"Chapters"</h2>
                        <ChapterList />
                    </section>

                    <hr class="border-border" />

                    <div class="flex items-center justify-between gap-4">
                        <div class="flex items-center gap-2">
                            <Button
                                variant=ButtonVariant::Success
                                size=ButtonSize::Sm
                                attr:disabled=move || leaving.get()
                                on:click=on_save
                            >
                                "Save"
                            </Button>
                            <Button
                                variant=ButtonVariant::Destructive
                                size=ButtonSize::Sm
                                attr:disabled=move || deleting.get()
                                on:click=on_delete
                            >
                                "Delete"
                            </Button>
                        </div>
                        <label class="flex items-center gap-2 text-xs">
                            <input
                                type="checkbox"
                                class="size-4"
                                prop:checked=move || summary.with(|s| s.is_ongoing())
                                on:change=on_ongoing
                            />
                            <em>"Ongoing?"</em>
                            <Show when=move || summary.with(|s| s.is_ongoing()) fallback=|| ().into_view()>
                                <span class="rounded bg-accent px-1.5 py-0.5">"Ongoing"</span>
                            </Show>
                        </label>
                    </div>
                </div>
            </Show>
            <SummaryDetailsPopup />
        </div>
    }
}
