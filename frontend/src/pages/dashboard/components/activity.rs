use crate::{
    components::layout::LoadingSpinner,
    pages::dashboard::{
        activity::ActivityEntry,
        components::PartialDataNotice,
        repository::{Aggregated, Subject},
    },
};
use leptos::*;

#[component]
pub fn ActivityList(entries: Vec<ActivityEntry>) -> impl IntoView {
    if entries.is_empty() {
        return view! { <p class="text-sm text-gray-500">"Nenhuma atividade recente."</p> }
            .into_view();
    }
    view! {
        <ul class="divide-y divide-gray-100">
            {entries
                .into_iter()
                .map(|entry| {
                    let owner = match entry.tutor_name {
                        Some(tutor) => format!("{} ({})", entry.pet_name, tutor),
                        None => entry.pet_name,
                    };
                    view! {
                        <li class="py-2 flex items-center justify-between text-sm">
                            <div>
                                <p class="text-gray-900">{entry.description}</p>
                                <p class="text-gray-500">{owner}</p>
                            </div>
                            <span class="text-gray-500">{entry.date.format("%d/%m/%Y").to_string()}</span>
                        </li>
                    }
                })
                .collect_view()}
        </ul>
    }
    .into_view()
}

#[component]
pub fn ActivitySection(
    activity: Resource<Option<Subject>, Option<Aggregated<ActivityEntry>>>,
) -> impl IntoView {
    view! {
        <div class="bg-white shadow rounded-lg p-6 space-y-4">
            <h3 class="text-base font-semibold text-gray-900">"Atividade recente"</h3>
            {move || match activity.get().flatten() {
                None => view! { <LoadingSpinner /> }.into_view(),
                Some(result) => view! {
                    <div>
                        <ActivityList entries=result.items />
                        <PartialDataNotice failures=result.failures />
                    </div>
                }
                .into_view(),
            }}
        </div>
    }
}
