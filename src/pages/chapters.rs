use crate::components::ui::{Alert, AlertDescription, Button, ButtonSize, ButtonVariant, Input, Spinner};
use crate::editor::{resolve_drop, RichTextEditor};
use crate::models::{create_chapter, delete_chapter, reorder_chapter, DocumentKey};
use crate::state::{AppContext, ChapterForm, EMPTY_HEADING_WARNING, WARNING_DISPLAY_MS};
use leptos::logging::error;
use leptos::prelude::*;
use leptos::task::spawn_local;
use wasm_bindgen::JsCast;

const DRAG_MIME: &str = "text/plain";

#[component]
pub fn ChapterList() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let summary = app_state.0.summary;

    let chapter_ids = move || {
        summary.with(|s| {
            s.chapters()
                .iter()
                .map(|c| c.id().to_string())
                .collect::<Vec<_>>()
        })
    };

    view! {
        <div class="flex flex-col gap-2">
            <CreateChapterWidget />
            <Show
                when=move || summary.with(|s| !s.chapters().is_empty())
                fallback=|| view! {
                    <div class="text-xs text-muted-foreground">"No chapters yet."</div>
                }
            >
                <For
                    each=chapter_ids
                    key=|id| id.clone()
                    children=move |id| view! { <ChapterRow chapter_id=id /> }
                />
            </Show>
        </div>
    }
}

/// One chapter: a draggable heading that toggles its editor.
#[component]
fn ChapterRow(chapter_id: String) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let summary = app_state.0.summary;
    let id_sv = StoredValue::new(chapter_id);
    let open = RwSignal::new(false);
    let deleting = RwSignal::new(false);

    let heading = move || {
        let id = id_sv.get_value();
        summary.with(|s| s.chapter(&id).map(|c| c.heading().to_string()))
            .unwrap_or_default()
    };

    let on_drop = move |ev: web_sys::DragEvent| {
        ev.prevent_default();

        let dragged_id = ev
            .data_transfer()
            .and_then(|dt| dt.get_data(DRAG_MIME).ok())
            .unwrap_or_default();
        if dragged_id.trim().is_empty() {
            return;
        }
        let target_id = id_sv.get_value();

        // Upper half drops before the target, lower half after.
        let insert_after = ev
            .current_target()
            .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
            .map(|el| el.get_bounding_client_rect())
            .map(|rect| {
                let mid = rect.top() + rect.height() / 2.0;
                (ev.client_y() as f64) >= mid
            })
            .unwrap_or(true);

        let Some((from, to)) = summary.with_untracked(|s| {
            resolve_drop(s.chapters(), &dragged_id, &target_id, insert_after)
        }) else {
            return;
        };

        let api_client = app_state.0.api_client.get_untracked();
        spawn_local(async move {
            if let Err(e) = reorder_chapter(&summary, &api_client, from, to).await {
                error!("Failed to move chapter {from} -> {to}: {e}");
                app_state.0.action_error.set(Some(format!("Could not reorder chapters: {e}")));
            }
        });
    };

    let on_save = move |_| {
        app_state
            .0
            .save_soon(DocumentKey::Chapter(id_sv.get_value()));
        open.set(false);
    };

    let on_delete = move |_| {
        if deleting.get_untracked() {
            return;
        }
        deleting.set(true);
        let id = id_sv.get_value();
        let api_client = app_state.0.api_client.get_untracked();
        spawn_local(async move {
            match delete_chapter(&summary, &api_client, &id).await {
                Ok(()) => {
                    app_state
                        .0
                        .autosave
                        .update(|c| c.forget(&DocumentKey::Chapter(id)));
                }
                Err(e) => {
                    error!("Failed to delete chapter {id}: {e}");
                    app_state.0.action_error.set(Some(format!("Could not delete chapter: {e}")));
                    deleting.set(false);
                }
            }
        });
    };

    view! {
        <div class="rounded-md border border-border bg-card">
            <div
                class="flex cursor-grab items-center gap-2 px-3 py-2 select-none"
                draggable="true"
                on:dragstart=move |ev: web_sys::DragEvent| {
                    if let Some(dt) = ev.data_transfer() {
                        let _ = dt.set_data(DRAG_MIME, &id_sv.get_value());
                        dt.set_effect_allowed("move");
                    }
                }
                on:dragover=move |ev: web_sys::DragEvent| {
                    ev.prevent_default();
                    if let Some(dt) = ev.data_transfer() {
                        dt.set_drop_effect("move");
                    }
                }
                on:drop=on_drop
            >
                <span class="text-muted-foreground">"⋮⋮"</span>
                <button
                    class="min-w-0 flex-1 truncate text-left text-sm font-medium hover:underline"
                    on:click=move |_| open.update(|v| *v = !*v)
                >
                    {heading}
                </button>
                <Show when=move || app_state.0.autosave.with(|c| c.is_dirty(&DocumentKey::Chapter(id_sv.get_value()))) fallback=|| ().into_view()>
                    <span class="text-xs text-muted-foreground">"•"</span>
                </Show>
            </div>

            <Show when=move || open.get() fallback=|| ().into_view()>
                <div class="space-y-2 border-t border-border px-3 py-3">
                    <RichTextEditor
                        doc=DocumentKey::Chapter(id_sv.get_value())
                        placeholder="Write your chapter summary ..."
                    />
                    <div class="flex items-center gap-2">
                        <Button size=ButtonSize::Sm on:click=on_save>"Save"</Button>
                        <Button
                            variant=ButtonVariant::Destructive
                            size=ButtonSize::Sm
                            attr:disabled=move || deleting.get()
                            on:click=on_delete
                        >
                            "Delete"
                        </Button>
                    </div>
                </div>
            </Show>
        </div>
    }
}

#[component]
fn CreateChapterWidget() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let summary = app_state.0.summary;
    let form = RwSignal::new(ChapterForm::default());
    let heading = RwSignal::new(String::new());

    let warning_timer = StoredValue::new(None::<i32>);

    let hide_warning_later = move |token: u32| {
        if let Some(id) = warning_timer.get_value() {
            window().clear_timeout_with_handle(id);
        }
        let cb = wasm_bindgen::closure::Closure::once_into_js(move || {
            warning_timer.set_value(None);
            form.update(|f| f.clear_warning(token));
        });
        let id = window()
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                cb.as_ref().unchecked_ref(),
                WARNING_DISPLAY_MS,
            )
            .ok();
        warning_timer.set_value(id);
    };
    on_cleanup(move || {
        if let Some(id) = warning_timer.try_get_value().flatten() {
            window().clear_timeout_with_handle(id);
        }
    });

    let submit = move || {
        form.update(|f| f.set_heading(heading.get_untracked()));
        let Some(title) = form.try_update(|f| f.submit()).flatten() else {
            if let Some(token) = form.with_untracked(|f| f.warning_token()) {
                hide_warning_later(token);
            }
            return;
        };

        let api_client = app_state.0.api_client.get_untracked();
        spawn_local(async move {
            match create_chapter(&summary, &api_client, &title).await {
                Ok(_) => {
                    heading.set(String::new());
                    form.update(|f| f.created());
                }
                Err(e) => {
                    error!("Failed to create chapter {title:?}: {e}");
                    app_state.0.action_error.set(Some(format!("Could not add chapter: {e}")));
                    form.update(|f| f.failed());
                }
            }
        });
    };

    view! {
        <Show
            when=move || form.with(|f| f.is_expanded())
            fallback=move || view! {
                <Button
                    variant=ButtonVariant::Outline
                    size=ButtonSize::Sm
                    on:click=move |_| form.update(|f| f.expand())
                >
                    "Add chapter"
                </Button>
            }
        >
            <div class="space-y-2">
                <div class="flex items-center gap-2">
                    <Input
                        bind_value=heading
                        placeholder="Chapter heading"
                        class="h-8 text-sm border-border bg-background"
                        on:keydown=move |ev: web_sys::KeyboardEvent| {
                            if ev.key() == "Enter" {
                                ev.prevent_default();
                                submit();
                            } else if ev.key() == "Escape" {
                                form.update(|f| f.cancel());
                            }
                        }
                    />
                    <Button
                        size=ButtonSize::Sm
                        attr:disabled=move || form.with(|f| f.is_submitting())
                        on:click=move |_| submit()
                    >
                        <span class="inline-flex items-center gap-2">
                            <Show when=move || form.with(|f| f.is_submitting()) fallback=|| ().into_view()>
                                <Spinner />
                            </Show>
                            "Add"
                        </span>
                    </Button>
                    <Button
                        variant=ButtonVariant::Ghost
                        size=ButtonSize::Sm
                        on:click=move |_| form.update(|f| f.cancel())
                    >
                        "Cancel"
                    </Button>
                </div>
                <Show when=move || form.with(|f| f.show_warning()) fallback=|| ().into_view()>
                    <Alert class="border-destructive/30">
                        <AlertDescription class="text-destructive text-xs">
                            {EMPTY_HEADING_WARNING}
                        </AlertDescription>
                    </Alert>
                </Show>
            </div>
        </Show>
    }
}
