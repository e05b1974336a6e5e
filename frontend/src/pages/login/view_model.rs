use super::utils::{self, LoginMode};
use crate::{
    api::{AuthError, Role, SignUpData, SignUpOutcome},
    components::guard::{landing_path, navigate_replace, ready_landing_path},
    state::auth::{self, use_auth, SignUpRequest},
};
use leptos::*;

#[derive(Clone, Copy)]
pub struct LoginFormState {
    pub full_name: RwSignal<String>,
    pub email: RwSignal<String>,
    pub password: RwSignal<String>,
    pub role: RwSignal<Role>,
}

impl Default for LoginFormState {
    fn default() -> Self {
        Self {
            full_name: create_rw_signal(String::new()),
            email: create_rw_signal(String::new()),
            password: create_rw_signal(String::new()),
            role: create_rw_signal(Role::Tutor),
        }
    }
}

#[derive(Clone, Copy)]
pub struct LoginViewModel {
    pub mode: RwSignal<LoginMode>,
    pub form: LoginFormState,
    pub error: RwSignal<Option<String>>,
    pub notice: RwSignal<Option<String>>,
    pub sign_in_action: Action<(String, String), Result<(), AuthError>>,
    pub sign_up_action: Action<SignUpRequest, Result<SignUpOutcome, AuthError>>,
}

impl LoginViewModel {
    pub fn pending(&self) -> bool {
        self.sign_in_action.pending().get() || self.sign_up_action.pending().get()
    }

    pub fn toggle_mode(&self) {
        self.mode.update(|mode| {
            *mode = match mode {
                LoginMode::SignIn => LoginMode::SignUp,
                LoginMode::SignUp => LoginMode::SignIn,
            }
        });
        self.error.set(None);
        self.notice.set(None);
    }

    pub fn submit(&self) {
        if self.sign_in_action.pending().get_untracked()
            || self.sign_up_action.pending().get_untracked()
        {
            return;
        }
        let email = self.form.email.get_untracked().trim().to_string();
        let password = self.form.password.get_untracked();
        match self.mode.get_untracked() {
            LoginMode::SignIn => {
                if let Err(msg) = utils::validate_credentials(&email, &password) {
                    self.error.set(Some(msg));
                    return;
                }
                self.error.set(None);
                self.sign_in_action.dispatch((email, password));
            }
            LoginMode::SignUp => {
                let full_name = self.form.full_name.get_untracked().trim().to_string();
                if let Err(msg) = utils::validate_sign_up(&full_name, &email, &password) {
                    self.error.set(Some(msg));
                    return;
                }
                self.error.set(None);
                self.sign_up_action.dispatch(SignUpRequest {
                    email,
                    password,
                    data: SignUpData::new(full_name, self.form.role.get_untracked()),
                });
            }
        }
    }
}

pub fn use_login_view_model() -> LoginViewModel {
    let (auth_state, _) = use_auth();
    let vm = LoginViewModel {
        mode: create_rw_signal(LoginMode::SignIn),
        form: LoginFormState::default(),
        error: create_rw_signal(None),
        notice: create_rw_signal(None),
        sign_in_action: auth::use_sign_in_action(),
        sign_up_action: auth::use_sign_up_action(),
    };

    create_effect(move |_| {
        let state = auth_state.get();
        if state.loading {
            return;
        }
        if let Some(path) = ready_landing_path(&state) {
            navigate_replace(path);
        }
    });

    // Sign-in resolves after the profile lookup has finished.
    create_effect(move |_| match vm.sign_in_action.value().get() {
        Some(Ok(())) => navigate_replace(landing_path(&auth_state.get_untracked())),
        Some(Err(err)) => vm.error.set(Some(utils::auth_error_message(&err))),
        None => {}
    });

    create_effect(move |_| match vm.sign_up_action.value().get() {
        Some(Ok(outcome)) if outcome.session.is_none() => {
            vm.mode.set(LoginMode::SignIn);
            vm.form.password.set(String::new());
            vm.notice
                .set(Some("Conta criada. Confirme seu e-mail para entrar.".into()));
        }
        Some(Err(err)) => vm.error.set(Some(utils::auth_error_message(&err))),
        _ => {}
    });

    vm
}
