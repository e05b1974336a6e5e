use crate::components::{
    guard::{navigate_replace, LOGIN_PATH},
    layout::Layout,
};
use crate::state::auth;
use leptos::*;

/// Shown to signed-in users whose role has no home in the app.
#[component]
pub fn UnauthorizedPage() -> impl IntoView {
    let sign_out_action = auth::use_sign_out_action();
    create_effect(move |_| {
        if sign_out_action.value().get().is_some() {
            navigate_replace(LOGIN_PATH);
        }
    });
    view! {
        <Layout>
            <div class="max-w-lg mx-auto text-center space-y-4 py-16">
                <h1 class="text-2xl font-bold text-gray-900">"Acesso não autorizado"</h1>
                <p class="text-sm text-gray-600">
                    "Seu perfil não tem permissão para acessar esta área. Fale com o suporte ou entre com outra conta."
                </p>
                <button
                    class="px-4 py-2 rounded-md text-sm font-medium text-white bg-emerald-600 hover:bg-emerald-700"
                    on:click=move |_| sign_out_action.dispatch(())
                >
                    "Entrar com outra conta"
                </button>
            </div>
        </Layout>
    }
}
