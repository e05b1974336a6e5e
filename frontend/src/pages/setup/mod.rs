use leptos::*;

pub mod view_model;

mod panel;

pub use panel::SetupPanel;

#[component]
pub fn SetupPage() -> impl IntoView {
    view! { <SetupPanel /> }
}
