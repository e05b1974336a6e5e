use crate::{
    api::Role,
    components::guard::{navigate_replace, LOGIN_PATH, TUTOR_HOME_PATH, VET_HOME_PATH},
    state::auth::{self, use_auth},
};
use leptos::*;

#[component]
pub fn Header() -> impl IntoView {
    let (auth, _set_auth) = use_auth();
    let home = move || match auth.get().profile.map(|p| p.role) {
        Some(Role::Veterinario) => VET_HOME_PATH,
        _ => TUTOR_HOME_PATH,
    };
    let display_name = move || {
        auth.get()
            .profile
            .map(|p| p.display_name().to_string())
            .unwrap_or_default()
    };
    let sign_out_action = auth::use_sign_out_action();
    let sign_out_pending = sign_out_action.pending();
    create_effect(move |_| {
        if sign_out_action.value().get().is_some() {
            navigate_replace(LOGIN_PATH);
        }
    });
    let on_sign_out = move |_| {
        if sign_out_pending.get_untracked() {
            return;
        }
        sign_out_action.dispatch(());
    };
    view! {
        <header class="bg-white shadow-sm border-b border-gray-200">
            <div class="max-w-7xl mx-auto px-4 sm:px-6 lg:px-8">
                <div class="flex justify-between items-center h-16">
                    <a href=home class="text-xl font-semibold text-gray-900">"PetCare"</a>
                    <div class="flex items-center gap-4">
                        <span class="text-sm text-gray-600">{display_name}</span>
                        <button
                            on:click=on_sign_out
                            class="text-gray-600 hover:text-gray-900 px-3 py-2 rounded-md text-sm font-medium disabled:opacity-50"
                            disabled=move || sign_out_pending.get()
                        >
                            "Sair"
                        </button>
                    </div>
                </div>
            </div>
        </header>
    }
}

#[component]
pub fn Layout(children: Children) -> impl IntoView {
    view! {
        <div class="min-h-screen bg-gray-50">
            <Header/>
            <main class="max-w-7xl mx-auto py-6 sm:px-6 lg:px-8">
                {children()}
            </main>
        </div>
    }
}

#[component]
pub fn LoadingSpinner() -> impl IntoView {
    view! {
        <div class="flex justify-center items-center p-8">
            <div class="animate-spin rounded-full h-8 w-8 border-b-2 border-emerald-600"></div>
        </div>
    }
}

#[component]
fn LoadingMessage(message: &'static str) -> impl IntoView {
    view! {
        <div class="min-h-screen flex flex-col items-center justify-center gap-2">
            <LoadingSpinner />
            <p class="text-sm text-gray-600">{message}</p>
        </div>
    }
}

#[component]
pub fn CheckingAuthPlaceholder() -> impl IntoView {
    view! { <LoadingMessage message="Verificando autenticação..." /> }
}

#[component]
pub fn LoadingProfilePlaceholder() -> impl IntoView {
    view! { <LoadingMessage message="Carregando perfil..." /> }
}

#[component]
pub fn ErrorMessage(message: String) -> impl IntoView {
    view! {
        <div class="bg-red-50 border border-red-200 text-red-700 px-4 py-3 rounded mb-4">
            <p class="text-sm">{message}</p>
        </div>
    }
}
