pub mod activity;
pub mod reminders;

pub use activity::ActivitySection;
pub use reminders::RemindersSection;

use crate::pages::dashboard::repository::AggregationSourceError;
use leptos::*;

#[component]
pub fn PartialDataNotice(failures: Vec<AggregationSourceError>) -> impl IntoView {
    if failures.is_empty() {
        return ().into_view();
    }
    let sources = failures
        .iter()
        .map(|f| f.collection)
        .collect::<Vec<_>>()
        .join(", ");
    view! {
        <p class="text-xs text-amber-700">
            {format!("Alguns dados não puderam ser carregados ({}).", sources)}
        </p>
    }
    .into_view()
}
