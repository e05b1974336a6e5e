use crate::{
    api::Role,
    pages::login::{
        components::messages::{InlineErrorMessage, InlineNotice},
        utils::LoginMode,
        view_model::LoginViewModel,
    },
};
use leptos::{ev::SubmitEvent, *};
use web_sys::HtmlInputElement;

const INPUT_CLASS: &str = "appearance-none relative block w-full px-3 py-2 border border-gray-300 placeholder-gray-500 text-gray-900 rounded-md focus:outline-none focus:ring-emerald-500 focus:border-emerald-500 sm:text-sm";

#[component]
fn TextInput(
    id: &'static str,
    input_type: &'static str,
    placeholder: &'static str,
    value: RwSignal<String>,
) -> impl IntoView {
    view! {
        <div>
            <label for=id class="sr-only">{placeholder}</label>
            <input
                id=id
                name=id
                type=input_type
                class=INPUT_CLASS
                placeholder=placeholder
                prop:value=move || value.get()
                on:input=move |ev| {
                    let target = event_target::<HtmlInputElement>(&ev);
                    value.set(target.value());
                }
            />
        </div>
    }
}

#[component]
fn RolePicker(role: RwSignal<Role>) -> impl IntoView {
    view! {
        <div>
            <label for="role" class="block text-sm text-gray-700">"Eu sou"</label>
            <select
                id="role"
                class=INPUT_CLASS
                on:change=move |ev| role.set(Role::from(event_target_value(&ev)))
            >
                <option value="tutor" selected=move || role.get() == Role::Tutor>"Tutor"</option>
                <option value="veterinario" selected=move || role.get() == Role::Veterinario>
                    "Veterinário"
                </option>
            </select>
        </div>
    }
}

#[component]
pub fn LoginForm(vm: LoginViewModel) -> impl IntoView {
    let signing_up = move || vm.mode.get() == LoginMode::SignUp;
    let on_submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        vm.submit();
    };

    view! {
        <div class="min-h-screen flex items-center justify-center bg-gray-50 py-12 px-4 sm:px-6 lg:px-8">
            <div class="max-w-md w-full space-y-8">
                <div>
                    <h2 class="mt-6 text-center text-3xl font-extrabold text-gray-900">
                        {move || if signing_up() { "Criar conta no PetCare" } else { "Entrar no PetCare" }}
                    </h2>
                    <p class="mt-2 text-center text-sm text-gray-600">
                        "Saúde dos seus pets em um só lugar"
                    </p>
                </div>
                <form class="mt-8 space-y-4" on:submit=on_submit>
                    <Show when=signing_up fallback=|| ()>
                        <TextInput id="full_name" input_type="text" placeholder="Nome completo" value=vm.form.full_name />
                        <RolePicker role=vm.form.role />
                    </Show>
                    <TextInput id="email" input_type="email" placeholder="E-mail" value=vm.form.email />
                    <TextInput id="password" input_type="password" placeholder="Senha" value=vm.form.password />

                    <InlineErrorMessage error=vm.error />
                    <InlineNotice notice=vm.notice />

                    <button
                        type="submit"
                        disabled=move || vm.pending()
                        class="w-full flex justify-center py-2 px-4 border border-transparent text-sm font-medium rounded-md text-white bg-emerald-600 hover:bg-emerald-700 disabled:opacity-50"
                    >
                        {move || match (signing_up(), vm.pending()) {
                            (false, false) => "Entrar",
                            (false, true) => "Entrando...",
                            (true, false) => "Criar conta",
                            (true, true) => "Criando conta...",
                        }}
                    </button>
                </form>
                <button
                    type="button"
                    class="w-full text-center text-sm text-emerald-700 hover:underline"
                    on:click=move |_| vm.toggle_mode()
                >
                    {move || if signing_up() { "Já tenho conta" } else { "Criar uma conta" }}
                </button>
            </div>
        </div>
    }
}
