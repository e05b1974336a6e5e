use crate::{
    api::{ApiClient, Role},
    config,
    pages::dashboard::{
        activity::ActivityEntry,
        reminders::Reminder,
        repository::{self, Aggregated, Subject},
    },
    state::auth::{use_auth, AuthState},
    utils::time::today_in_app_tz,
};
use leptos::*;
use std::{cell::Cell, future::Future, rc::Rc};

/// Dashboard scope for the signed-in profile; `None` until a profile with a known role loads.
pub fn subject_for(state: &AuthState) -> Option<Subject> {
    let profile = state.profile.as_ref()?;
    match profile.role {
        Role::Tutor => Some(Subject::Tutor {
            tutor_id: profile.id.clone(),
        }),
        Role::Veterinario => Some(Subject::Vet),
        Role::Unknown(_) => None,
    }
}

/// Cleared when the dashboard unmounts. Aggregations that finish afterwards are dropped.
#[derive(Clone)]
pub struct MountGuard(Rc<Cell<bool>>);

impl Default for MountGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl MountGuard {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    pub fn unmount(&self) {
        self.0.set(false);
    }

    pub fn is_mounted(&self) -> bool {
        self.0.get()
    }

    pub async fn run<T>(&self, work: impl Future<Output = T>) -> Option<T> {
        let result = work.await;
        if !self.is_mounted() {
            log::debug!("Dashboard unmounted, dropping aggregation result");
            return None;
        }
        Some(result)
    }
}

#[derive(Clone, Copy)]
pub struct DashboardViewModel {
    pub subject: Memo<Option<Subject>>,
    pub reminders: Resource<Option<Subject>, Option<Aggregated<Reminder>>>,
    pub activity: Resource<Option<Subject>, Option<Aggregated<ActivityEntry>>>,
}

impl DashboardViewModel {
    pub fn new() -> Self {
        let api = use_context::<ApiClient>().unwrap_or_else(ApiClient::new);
        let (auth, _) = use_auth();
        let subject = create_memo(move |_| subject_for(&auth.get()));
        let mounted = MountGuard::new();
        on_cleanup({
            let mounted = mounted.clone();
            move || mounted.unmount()
        });

        let reminders = create_local_resource(move || subject.get(), {
            let api = api.clone();
            let mounted = mounted.clone();
            move |subject| {
                let api = api.clone();
                let mounted = mounted.clone();
                async move {
                    let subject = subject?;
                    let cfg = config::current();
                    mounted
                        .run(repository::fetch_reminders(
                            &api,
                            &subject,
                            today_in_app_tz(),
                            cfg.time_zone(),
                            cfg.request_timeout(),
                        ))
                        .await
                }
            }
        });

        let activity = create_local_resource(
            move || subject.get(),
            move |subject| {
                let api = api.clone();
                let mounted = mounted.clone();
                async move {
                    let subject = subject?;
                    let cfg = config::current();
                    mounted
                        .run(repository::fetch_recent_activity(
                            &api,
                            &subject,
                            today_in_app_tz(),
                            cfg.time_zone(),
                            cfg.request_timeout(),
                        ))
                        .await
                }
            },
        );

        Self {
            subject,
            reminders,
            activity,
        }
    }

    pub fn is_vet_view(&self) -> bool {
        matches!(self.subject.get(), Some(Subject::Vet))
    }
}

pub fn use_dashboard_view_model() -> DashboardViewModel {
    match use_context::<DashboardViewModel>() {
        Some(vm) => vm,
        None => {
            let vm = DashboardViewModel::new();
            provide_context(vm);
            vm
        }
    }
}
