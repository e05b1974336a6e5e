use crate::{
    api::Profile,
    components::guard::{navigate_replace, role_home},
    pages::login::utils::{auth_error_message, validate_new_password},
    state::auth::{use_auth_manager, AuthStateManager},
};
use leptos::*;

const SETUP_FAILED: &str = "Não foi possível concluir o cadastro. Tente novamente.";

/// Sets the chosen password, then provisions and completes the profile.
pub async fn finish_setup(manager: &AuthStateManager, password: &str) -> Result<Profile, String> {
    manager
        .update_password(password)
        .await
        .map_err(|err| auth_error_message(&err))?;
    manager.complete_setup().await.map_err(|err| {
        log::warn!("Setup completion failed: {}", err);
        SETUP_FAILED.to_string()
    })
}

#[derive(Clone, Copy)]
pub struct SetupViewModel {
    pub password: RwSignal<String>,
    pub confirmation: RwSignal<String>,
    pub error: RwSignal<Option<String>>,
    pub action: Action<String, Result<Profile, String>>,
}

impl SetupViewModel {
    pub fn submit(&self) {
        if self.action.pending().get_untracked() {
            return;
        }
        let password = self.password.get_untracked();
        if let Err(msg) = validate_new_password(&password, &self.confirmation.get_untracked()) {
            self.error.set(Some(msg));
            return;
        }
        self.error.set(None);
        self.action.dispatch(password);
    }
}

pub fn use_setup_view_model() -> SetupViewModel {
    let manager = use_auth_manager();
    let action = create_action(move |password: &String| {
        let manager = manager.clone();
        let password = password.clone();
        async move {
            let manager = manager.ok_or_else(|| SETUP_FAILED.to_string())?;
            finish_setup(&manager, &password).await
        }
    });
    let vm = SetupViewModel {
        password: create_rw_signal(String::new()),
        confirmation: create_rw_signal(String::new()),
        error: create_rw_signal(None),
        action,
    };

    create_effect(move |_| match action.value().get() {
        Some(Ok(profile)) => navigate_replace(role_home(&profile.role)),
        Some(Err(msg)) => vm.error.set(Some(msg)),
        None => {}
    });

    vm
}
