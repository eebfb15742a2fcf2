use crate::pages::{IndexPage, SummaryEditorPage};
use crate::state::{AppContext, AppState};
use leptos::prelude::*;
use leptos_router::components::{Route, Router, Routes};
use leptos_router::path;

#[component]
pub fn App() -> impl IntoView {
    provide_context(AppContext(AppState::new()));

    // Leptos CSR requires the `csr` feature on `leptos`; router hooks need <Router>.
    view! {
        <Router>
            <Routes fallback=|| view! { <div class="px-4 py-8 text-xs text-muted-foreground">"Not found"</div> }>
                <Route path=path!("summaries/:uid/edit") view=SummaryEditorPage />
                <Route path=path!("") view=IndexPage />
            </Routes>
        </Router>
    }
}
