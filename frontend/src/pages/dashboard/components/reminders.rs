use crate::{
    components::layout::LoadingSpinner,
    pages::dashboard::{
        components::PartialDataNotice,
        reminders::{Reminder, ReminderStatus},
        repository::{Aggregated, Subject},
    },
};
use leptos::*;

fn status_badge(status: ReminderStatus) -> View {
    let color = match status {
        ReminderStatus::Overdue => "bg-red-100 text-red-800",
        ReminderStatus::DueToday => "bg-amber-100 text-amber-800",
        ReminderStatus::Upcoming => "bg-emerald-100 text-emerald-800",
    };
    view! {
        <span class=format!("px-2 py-0.5 rounded-full text-xs font-semibold {}", color)>
            {status.label()}
        </span>
    }
    .into_view()
}

#[component]
pub fn ReminderList(reminders: Vec<Reminder>) -> impl IntoView {
    if reminders.is_empty() {
        return view! { <p class="text-sm text-gray-500">"Nenhum lembrete pendente."</p> }
            .into_view();
    }
    view! {
        <ul class="divide-y divide-gray-100">
            {reminders
                .into_iter()
                .map(|r| {
                    view! {
                        <li class="py-2 flex items-center justify-between text-sm">
                            <div>
                                <p class="font-medium text-gray-900">{r.title}</p>
                                <p class="text-gray-500">
                                    {format!("{} · {}", r.pet_name, r.date.format("%d/%m/%Y"))}
                                </p>
                            </div>
                            {status_badge(r.status)}
                        </li>
                    }
                })
                .collect_view()}
        </ul>
    }
    .into_view()
}

#[component]
pub fn RemindersSection(
    reminders: Resource<Option<Subject>, Option<Aggregated<Reminder>>>,
) -> impl IntoView {
    view! {
        <div class="bg-white shadow rounded-lg p-6 space-y-4">
            <h3 class="text-base font-semibold text-gray-900">"Lembretes"</h3>
            {move || match reminders.get().flatten() {
                None => view! { <LoadingSpinner /> }.into_view(),
                Some(result) => view! {
                    <div>
                        <ReminderList reminders=result.items />
                        <PartialDataNotice failures=result.failures />
                    </div>
                }
                .into_view(),
            }}
        </div>
    }
}
