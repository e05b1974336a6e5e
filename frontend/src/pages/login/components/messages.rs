use leptos::*;

#[component]
pub fn InlineErrorMessage(error: RwSignal<Option<String>>) -> impl IntoView {
    view! {
        <Show when=move || error.get().is_some() fallback=|| ()>
            <div class="bg-red-50 border border-red-200 text-red-700 px-4 py-3 rounded text-sm">
                {move || error.get().unwrap_or_default()}
            </div>
        </Show>
    }
}

#[component]
pub fn InlineNotice(notice: RwSignal<Option<String>>) -> impl IntoView {
    view! {
        <Show when=move || notice.get().is_some() fallback=|| ()>
            <div class="bg-emerald-50 border border-emerald-200 text-emerald-700 px-4 py-3 rounded text-sm">
                {move || notice.get().unwrap_or_default()}
            </div>
        </Show>
    }
}
