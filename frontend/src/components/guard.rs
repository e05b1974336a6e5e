use crate::{
    api::{Profile, Role, User},
    components::layout::{CheckingAuthPlaceholder, LoadingProfilePlaceholder},
    state::auth::{use_auth, AuthState},
};
use leptos::*;
use leptos_router::{use_navigate, NavigateOptions, RouterContext};

pub const LOGIN_PATH: &str = "/login";
pub const SETUP_PATH: &str = "/setup-password";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";
pub const TUTOR_HOME_PATH: &str = "/dashboard";
pub const VET_HOME_PATH: &str = "/vet/dashboard";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    CheckingAuth,
    RedirectToLogin,
    LoadingProfile,
    RedirectToSetup,
    Redirect { path: &'static str },
    Render,
}

impl GuardDecision {
    /// Target of a navigating decision.
    pub fn redirect_path(&self) -> Option<&'static str> {
        match self {
            GuardDecision::RedirectToLogin => Some(LOGIN_PATH),
            GuardDecision::RedirectToSetup => Some(SETUP_PATH),
            GuardDecision::Redirect { path } => Some(*path),
            _ => None,
        }
    }
}

pub fn role_home(role: &Role) -> &'static str {
    match role {
        Role::Tutor => TUTOR_HOME_PATH,
        Role::Veterinario => VET_HOME_PATH,
        Role::Unknown(_) => UNAUTHORIZED_PATH,
    }
}

/// Where a freshly signed-in user should land. Invited users without a profile row yet go to
/// setup, which provisions it.
pub fn landing_path(state: &AuthState) -> &'static str {
    match state.profile.as_ref() {
        Some(profile) if !profile.setup_complete => SETUP_PATH,
        Some(profile) => role_home(&profile.role),
        None if state.user.as_ref().and_then(User::invited_by).is_some() => SETUP_PATH,
        None => TUTOR_HOME_PATH,
    }
}

/// Landing path once enough is known to pick it: a profile, or an invitation to set one up.
pub fn ready_landing_path(state: &AuthState) -> Option<&'static str> {
    let user = state.user.as_ref()?;
    if state.profile.is_none() && user.invited_by().is_none() {
        return None;
    }
    Some(landing_path(state))
}

/// What a protected route shows for the given auth snapshot. First matching rule wins.
///
/// `on_setup_route` lets the setup page itself render while setup is still pending.
pub fn decide_route(
    loading: bool,
    user: Option<&User>,
    profile: Option<&Profile>,
    required_role: Option<&Role>,
    on_setup_route: bool,
) -> GuardDecision {
    if loading && user.is_none() {
        return GuardDecision::CheckingAuth;
    }
    if user.is_none() {
        return GuardDecision::RedirectToLogin;
    }
    if required_role.is_some() && profile.is_none() {
        return GuardDecision::LoadingProfile;
    }
    if let Some(profile) = profile {
        if !profile.setup_complete && !on_setup_route {
            return GuardDecision::RedirectToSetup;
        }
        if profile.setup_complete && on_setup_route {
            return GuardDecision::Redirect {
                path: role_home(&profile.role),
            };
        }
        if let Some(required) = required_role {
            if &profile.role != required {
                return GuardDecision::Redirect {
                    path: role_home(&profile.role),
                };
            }
        }
    }
    GuardDecision::Render
}

pub fn decide_for_state(
    state: &AuthState,
    required_role: Option<&Role>,
    on_setup_route: bool,
) -> GuardDecision {
    decide_route(
        state.loading,
        state.user.as_ref(),
        state.profile.as_ref(),
        required_role,
        on_setup_route,
    )
}

/// Replaces the current history entry, through the router when one is mounted.
pub fn navigate_replace(path: &str) {
    if use_context::<RouterContext>().is_some() {
        let navigate = use_navigate();
        navigate(
            path,
            NavigateOptions {
                replace: true,
                ..NavigateOptions::default()
            },
        );
        return;
    }
    if let Some(win) = web_sys::window() {
        if let Err(err) = win.location().replace(path) {
            log::warn!("Navigation to {} failed: {:?}", path, err);
        }
    }
}

/// Renders `children` only when the signed-in user holds `role` (any role when `None`).
#[component]
pub fn RequireRole(
    #[prop(optional, into)] role: Option<Role>,
    #[prop(optional)] setup_route: bool,
    children: ChildrenFn,
) -> impl IntoView {
    let (auth, _) = use_auth();
    let decision =
        create_memo(move |_| decide_for_state(&auth.get(), role.as_ref(), setup_route));
    create_effect(move |_| {
        if let Some(path) = decision.get().redirect_path() {
            navigate_replace(path);
        }
    });
    view! {
        <Show
            when=move || decision.get() == GuardDecision::Render
            fallback=move || match decision.get() {
                GuardDecision::CheckingAuth => view! { <CheckingAuthPlaceholder /> }.into_view(),
                GuardDecision::LoadingProfile => view! { <LoadingProfilePlaceholder /> }.into_view(),
                _ => ().into_view(),
            }
        >
            {children()}
        </Show>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{profile, user, user_with_metadata};
    use serde_json::json;

    const ROLES: [Option<Role>; 3] = [None, Some(Role::Tutor), Some(Role::Veterinario)];

    #[test]
    fn loading_without_user_checks_auth() {
        assert_eq!(
            decide_route(true, None, None, Some(&Role::Tutor), false),
            GuardDecision::CheckingAuth
        );
    }

    #[test]
    fn missing_user_redirects_to_login() {
        let decision = decide_route(false, None, None, None, false);
        assert_eq!(decision, GuardDecision::RedirectToLogin);
        assert_eq!(decision.redirect_path(), Some(LOGIN_PATH));
    }

    #[test]
    fn user_without_profile_waits_instead_of_redirecting() {
        let u = user("u1");
        assert_eq!(
            decide_route(false, Some(&u), None, Some(&Role::Veterinario), false),
            GuardDecision::LoadingProfile
        );
        assert_eq!(decide_route(false, Some(&u), None, None, false), GuardDecision::Render);
    }

    #[test]
    fn tutor_on_vet_route_goes_to_tutor_dashboard() {
        let u = user("u1");
        let p = profile("u1", Role::Tutor, true);
        let decision = decide_route(false, Some(&u), Some(&p), Some(&Role::Veterinario), false);
        assert_eq!(decision, GuardDecision::Redirect { path: "/dashboard" });
    }

    #[test]
    fn vet_on_tutor_route_goes_to_vet_dashboard() {
        let u = user("u1");
        let p = profile("u1", Role::Veterinario, true);
        assert_eq!(
            decide_route(false, Some(&u), Some(&p), Some(&Role::Tutor), false),
            GuardDecision::Redirect { path: "/vet/dashboard" }
        );
    }

    #[test]
    fn landing_follows_setup_then_role() {
        let mut state = AuthState {
            user: Some(user("u1")),
            ..AuthState::default()
        };
        assert_eq!(landing_path(&state), TUTOR_HOME_PATH);
        state.profile = Some(profile("u1", Role::Veterinario, false));
        assert_eq!(landing_path(&state), SETUP_PATH);
        state.profile = Some(profile("u1", Role::Veterinario, true));
        assert_eq!(landing_path(&state), VET_HOME_PATH);
    }

    #[test]
    fn invited_user_without_profile_lands_on_setup() {
        let state = AuthState {
            user: Some(user_with_metadata(
                "vet-1",
                json!({ "role": "veterinario", "invited_by": "tutor-1" }),
            )),
            ..AuthState::default()
        };
        assert_eq!(landing_path(&state), SETUP_PATH);
        assert_eq!(ready_landing_path(&state), Some(SETUP_PATH));
        assert_eq!(
            decide_for_state(&state, None, true),
            GuardDecision::Render
        );
    }

    #[test]
    fn landing_waits_for_the_profile_of_regular_users() {
        let mut state = AuthState {
            user: Some(user("u1")),
            ..AuthState::default()
        };
        assert_eq!(ready_landing_path(&AuthState::default()), None);
        assert_eq!(ready_landing_path(&state), None);
        state.profile = Some(profile("u1", Role::Veterinario, true));
        assert_eq!(ready_landing_path(&state), Some(VET_HOME_PATH));
    }

    #[test]
    fn completed_setup_leaves_the_setup_route() {
        let u = user("u1");
        let p = profile("u1", Role::Veterinario, true);
        assert_eq!(
            decide_route(false, Some(&u), Some(&p), None, true),
            GuardDecision::Redirect { path: VET_HOME_PATH }
        );
    }

    #[test]
    fn unknown_role_is_sent_to_unauthorized() {
        let u = user("u1");
        let p = profile("u1", Role::from("admin"), true);
        assert_eq!(
            decide_route(false, Some(&u), Some(&p), Some(&Role::Tutor), false),
            GuardDecision::Redirect { path: UNAUTHORIZED_PATH }
        );
    }

    #[test]
    fn pending_setup_wins_over_role_match() {
        let u = user("u1");
        let p = profile("u1", Role::Veterinario, false);
        for required in [Some(Role::Veterinario), Some(Role::Tutor), None] {
            assert_eq!(
                decide_route(false, Some(&u), Some(&p), required.as_ref(), false),
                GuardDecision::RedirectToSetup
            );
        }
        assert_eq!(
            decide_route(false, Some(&u), Some(&p), Some(&Role::Veterinario), true),
            GuardDecision::Render
        );
    }

    #[test]
    fn matching_role_renders_even_while_a_refresh_is_loading() {
        let u = user("u1");
        let p = profile("u1", Role::Tutor, true);
        assert_eq!(
            decide_route(true, Some(&u), Some(&p), Some(&Role::Tutor), false),
            GuardDecision::Render
        );
    }

    #[test]
    fn decision_is_stable_across_the_input_grid() {
        let u = user("u1");
        let profiles = [
            None,
            Some(profile("u1", Role::Tutor, true)),
            Some(profile("u1", Role::Veterinario, true)),
            Some(profile("u1", Role::Tutor, false)),
            Some(profile("u1", Role::from("other"), true)),
        ];
        for loading in [false, true] {
            for has_user in [false, true] {
                for p in &profiles {
                    for required in &ROLES {
                        for setup_route in [false, true] {
                            let user_ref = has_user.then_some(&u);
                            let first = decide_route(
                                loading,
                                user_ref,
                                p.as_ref(),
                                required.as_ref(),
                                setup_route,
                            );
                            let second = decide_route(
                                loading,
                                user_ref,
                                p.as_ref(),
                                required.as_ref(),
                                setup_route,
                            );
                            assert_eq!(first, second);
                            if !has_user {
                                assert!(matches!(
                                    first,
                                    GuardDecision::CheckingAuth | GuardDecision::RedirectToLogin
                                ));
                            }
                            if first == GuardDecision::Render {
                                assert!(has_user);
                                if let (Some(required), Some(p)) = (required, p) {
                                    assert_eq!(&p.role, required);
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
