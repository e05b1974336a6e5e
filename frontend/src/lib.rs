use leptos::*;
use leptos_router::*;

mod api;
mod components;
pub mod config;
mod pages;
mod state;
pub mod utils;

#[cfg(test)]
mod test_support;

use api::Role;
use components::guard::{
    RequireRole, LOGIN_PATH, SETUP_PATH, TUTOR_HOME_PATH, UNAUTHORIZED_PATH, VET_HOME_PATH,
};
use pages::{DashboardPage, LoginPage, SetupPage, UnauthorizedPage};
use state::auth::AuthProvider;

#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if let Err(err) = console_log::init_with_level(log::Level::Info) {
        web_sys::console::error_1(&format!("Logger setup failed: {}", err).into());
    }
    log::info!("Starting PetCare frontend (wasm)");

    // Runtime config comes from ./config.json or window.__PETCARE_ENV; defaults apply until then.
    spawn_local(async move {
        config::init().await;
        log::info!("Runtime config initialized");
    });

    mount_to_body(App);
}

#[component]
pub fn App() -> impl IntoView {
    view! {
        <AuthProvider>
            <Router>
                <Routes>
                    <Route path="/" view=|| view! { <Redirect path=LOGIN_PATH /> } />
                    <Route path=LOGIN_PATH view=LoginPage />
                    <Route path=SETUP_PATH view=ProtectedSetup />
                    <Route path=TUTOR_HOME_PATH view=TutorDashboard />
                    <Route path=VET_HOME_PATH view=VetDashboard />
                    <Route path=UNAUTHORIZED_PATH view=UnauthorizedPage />
                </Routes>
            </Router>
        </AuthProvider>
    }
}

#[component]
fn ProtectedSetup() -> impl IntoView {
    view! { <RequireRole setup_route=true><SetupPage /></RequireRole> }
}

#[component]
fn TutorDashboard() -> impl IntoView {
    view! { <RequireRole role=Role::Tutor><DashboardPage /></RequireRole> }
}

#[component]
fn VetDashboard() -> impl IntoView {
    view! { <RequireRole role=Role::Veterinario><DashboardPage /></RequireRole> }
}
