use crate::pages::{
    login::components::messages::InlineErrorMessage, setup::view_model::use_setup_view_model,
};
use leptos::{ev::SubmitEvent, *};
use web_sys::HtmlInputElement;

#[component]
pub fn SetupPanel() -> impl IntoView {
    let vm = use_setup_view_model();
    let pending = vm.action.pending();
    let on_submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        vm.submit();
    };

    view! {
        <div class="min-h-screen flex items-center justify-center bg-gray-50 py-12 px-4">
            <div class="max-w-md w-full space-y-6">
                <div>
                    <h2 class="text-center text-2xl font-bold text-gray-900">"Defina sua senha"</h2>
                    <p class="mt-2 text-center text-sm text-gray-600">
                        "Para concluir seu cadastro, escolha uma senha de acesso."
                    </p>
                </div>
                <form class="space-y-4" on:submit=on_submit>
                    <input
                        id="new_password"
                        type="password"
                        placeholder="Nova senha"
                        class="block w-full px-3 py-2 border border-gray-300 rounded-md sm:text-sm"
                        prop:value=move || vm.password.get()
                        on:input=move |ev| {
                            vm.password.set(event_target::<HtmlInputElement>(&ev).value());
                        }
                    />
                    <input
                        id="confirm_password"
                        type="password"
                        placeholder="Confirme a senha"
                        class="block w-full px-3 py-2 border border-gray-300 rounded-md sm:text-sm"
                        prop:value=move || vm.confirmation.get()
                        on:input=move |ev| {
                            vm.confirmation.set(event_target::<HtmlInputElement>(&ev).value());
                        }
                    />
                    <InlineErrorMessage error=vm.error />
                    <button
                        type="submit"
                        disabled=move || pending.get()
                        class="w-full py-2 px-4 text-sm font-medium rounded-md text-white bg-emerald-600 hover:bg-emerald-700 disabled:opacity-50"
                    >
                        {move || if pending.get() { "Salvando..." } else { "Salvar senha" }}
                    </button>
                </form>
            </div>
        </div>
    }
}
