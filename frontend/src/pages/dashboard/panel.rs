use crate::components::layout::Layout;
use crate::pages::dashboard::{
    components::{ActivitySection, RemindersSection},
    view_model::use_dashboard_view_model,
};
use leptos::*;

#[component]
pub fn DashboardPage() -> impl IntoView {
    let vm = use_dashboard_view_model();
    let subtitle = move || {
        if vm.is_vet_view() {
            "Pacientes acompanhados e próximos atendimentos"
        } else {
            "Vacinas, consultas e registros dos seus pets"
        }
    };

    view! {
        <Layout>
            <div class="space-y-6">
                <div>
                    <h1 class="text-2xl font-bold text-gray-900">"Painel"</h1>
                    <p class="mt-1 text-sm text-gray-600">{subtitle}</p>
                </div>
                <div class="grid grid-cols-1 gap-6 lg:grid-cols-2">
                    <RemindersSection reminders=vm.reminders />
                    <ActivitySection activity=vm.activity />
                </div>
            </div>
        </Layout>
    }
}
