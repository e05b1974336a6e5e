use crate::{
    api::{
        ApiClient, ApiError, AuthError, Profile, RecordStore, Session, SessionChange,
        SessionStore, SignUpData, SignUpOutcome, Subscription, SubscriptionHandle, User,
    },
    config,
    state::profile::{self, ProfileError, ProfileFetchPolicy, ProfileLookup},
};
use futures::{channel::mpsc::UnboundedReceiver, stream::FuturesUnordered, StreamExt};
use leptos::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub type AuthContext = (ReadSignal<AuthState>, WriteSignal<AuthState>);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub session: Option<Session>,
    pub profile: Option<Profile>,
    pub loading: bool,
}

impl AuthState {
    pub fn initializing() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }
}

type Observer = Rc<dyn Fn(&AuthState)>;

/// Owns `{user, session, profile, loading}` for the running app.
///
/// Everything runs on one task. Session writes apply in arrival order; a profile response is
/// committed only if the user it was requested for is still the current user and no newer
/// profile response has been committed already.
pub struct AuthStateManager {
    sessions: Rc<dyn SessionStore>,
    records: Rc<dyn RecordStore>,
    policy: ProfileFetchPolicy,
    state: RefCell<AuthState>,
    session_writes: Cell<u64>,
    profile_requests: Cell<u64>,
    committed_profile_request: Cell<u64>,
    disposed: Cell<bool>,
    subscription: RefCell<Option<SubscriptionHandle>>,
    observers: RefCell<Vec<Observer>>,
}

impl AuthStateManager {
    pub fn new(
        sessions: Rc<dyn SessionStore>,
        records: Rc<dyn RecordStore>,
        policy: ProfileFetchPolicy,
    ) -> Self {
        Self {
            sessions,
            records,
            policy,
            state: RefCell::new(AuthState::initializing()),
            session_writes: Cell::new(0),
            profile_requests: Cell::new(0),
            committed_profile_request: Cell::new(0),
            disposed: Cell::new(false),
            subscription: RefCell::new(None),
            observers: RefCell::new(Vec::new()),
        }
    }

    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Registers an observer called with every committed state.
    pub fn watch(&self, observer: impl Fn(&AuthState) + 'static) {
        self.observers.borrow_mut().push(Rc::new(observer));
    }

    fn commit(&self, update: impl FnOnce(&mut AuthState)) {
        if self.disposed.get() {
            return;
        }
        let snapshot = {
            let mut state = self.state.borrow_mut();
            update(&mut state);
            state.clone()
        };
        let observers = self.observers.borrow().clone();
        for observer in observers {
            observer(&snapshot);
        }
    }

    fn clear_session(&self) {
        self.commit(|state| {
            state.session = None;
            state.user = None;
            state.profile = None;
            state.loading = false;
        });
    }

    /// Subscribes to the session store, then runs [`Self::initialize`] and the change loop
    /// side by side until [`Self::dispose`].
    pub async fn run(&self) {
        if self.disposed.get() {
            return;
        }
        let Subscription { events, handle } = self.sessions.subscribe();
        *self.subscription.borrow_mut() = Some(handle);
        futures::join!(self.initialize(), self.listen(events));
    }

    /// One-shot session fetch. Its result is dropped if a change event landed meanwhile.
    pub async fn initialize(&self) {
        let writes_at_start = self.session_writes.get();
        let result = self.sessions.get_session().await;
        if self.disposed.get() {
            return;
        }
        if self.session_writes.get() != writes_at_start {
            log::debug!("Initial session fetch superseded by a newer auth event");
            return;
        }
        let session = match result {
            Ok(session) => session,
            Err(err) => {
                log::warn!("Failed to fetch current session [{}]: {}", err.code, err);
                None
            }
        };
        match self.apply_session(session) {
            Some(user_id) => {
                self.load_profile(user_id).await;
                self.commit(|state| state.loading = false);
            }
            None => self.commit(|state| state.loading = false),
        }
    }

    async fn listen(&self, mut events: UnboundedReceiver<SessionChange>) {
        let mut pending = FuturesUnordered::new();
        loop {
            let next = futures::select! {
                change = events.next() => Some(change),
                () = pending.select_next_some() => None,
            };
            match next {
                Some(Some(change)) => {
                    if let Some(user_id) = self.apply_change(change) {
                        pending.push(self.load_profile(user_id));
                    }
                }
                Some(None) => break,
                None => {}
            }
            if self.disposed.get() {
                break;
            }
        }
    }

    /// Applies a store notification and resolves the profile if the subject changed.
    pub async fn on_session_change(&self, change: SessionChange) {
        if let Some(user_id) = self.apply_change(change) {
            self.load_profile(user_id).await;
        }
    }

    fn apply_change(&self, change: SessionChange) -> Option<String> {
        if self.disposed.get() {
            return None;
        }
        log::debug!("Auth event {:?}", change.event);
        self.apply_session(change.session)
    }

    /// Replaces session and user in one commit. Returns the user id whose profile must be
    /// (re)loaded, which is the case whenever the held profile belongs to someone else.
    fn apply_session(&self, session: Option<Session>) -> Option<String> {
        self.session_writes.set(self.session_writes.get() + 1);
        let Some(session) = session else {
            self.clear_session();
            return None;
        };
        let user_id = session.user.id.clone();
        let mut reload = false;
        self.commit(|state| {
            reload = state
                .profile
                .as_ref()
                .map(|p| p.owner_id() != user_id)
                .unwrap_or(true);
            if reload {
                state.profile = None;
            }
            state.user = Some(session.user.clone());
            state.session = Some(session);
        });
        reload.then_some(user_id)
    }

    async fn load_profile(&self, user_id: String) {
        let request = self.profile_requests.get() + 1;
        self.profile_requests.set(request);
        let profile =
            profile::resolve_profile(self.records.as_ref(), &user_id, &self.policy).await;
        self.commit_profile(request, &user_id, profile);
    }

    fn commit_profile(&self, request: u64, user_id: &str, profile: Option<Profile>) {
        if self.disposed.get() {
            log::debug!("Dropping profile for {} after dispose", user_id);
            return;
        }
        if self.state.borrow().user_id() != Some(user_id) {
            log::debug!("Dropping profile fetched for superseded user {}", user_id);
            return;
        }
        if request < self.committed_profile_request.get() {
            log::debug!("Dropping out-of-order profile response for {}", user_id);
            return;
        }
        self.committed_profile_request.set(request);
        self.commit(|state| {
            state.profile = profile;
            state.loading = false;
        });
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self.sessions.sign_in_with_password(email, password).await?;
        log::info!("Signed in as {}", session.user.id);
        self.on_session_change(SessionChange::signed_in(session.clone()))
            .await;
        Ok(session)
    }

    /// Registers the account and provisions its profile row. A failed profile insert is
    /// logged only; the setup flow can provision it later.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        data: SignUpData,
    ) -> Result<SignUpOutcome, AuthError> {
        let outcome = self.sessions.sign_up(email, password, &data).await?;
        if let Some(user) = &outcome.user {
            let payload = profile::profile_payload(&user.id, &data.full_name, &data.role, true);
            if let Err(err) = profile::insert_profile(self.records.as_ref(), payload).await {
                log::warn!("Profile provisioning failed for {}: {}", user.id, err);
            }
        }
        if let Some(session) = outcome.session.clone() {
            self.on_session_change(SessionChange::signed_in(session))
                .await;
        }
        Ok(outcome)
    }

    /// Local state is cleared before the store round trip.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.apply_session(None);
        let result = self.sessions.sign_out().await;
        match &result {
            Ok(()) => log::info!("Signed out"),
            Err(err) => log::warn!("Sign-out request failed: {}", err),
        }
        result
    }

    pub async fn update_password(&self, password: &str) -> Result<(), AuthError> {
        let user = self.sessions.update_password(password).await?;
        log::info!("Password updated for {}", user.id);
        Ok(())
    }

    pub async fn refresh_profile(&self) {
        let user_id = self.state.borrow().user_id().map(str::to_string);
        if let Some(user_id) = user_id {
            self.load_profile(user_id).await;
        }
    }

    /// Finishes first-login setup: provisions the profile from invitation metadata when
    /// there is none yet, then marks setup complete.
    pub async fn complete_setup(&self) -> Result<Profile, ProfileError> {
        let (user, held) = {
            let state = self.state.borrow();
            (state.user.clone(), state.profile.clone())
        };
        let user = user.ok_or_else(|| {
            ProfileError::Fetch(ApiError::unauthorized("Not signed in"))
        })?;
        let records = self.records.as_ref();
        let current = match held {
            Some(profile) => profile,
            None => match profile::fetch_profile(records, &user.id, &self.policy).await {
                ProfileLookup::Found(profile) => profile,
                ProfileLookup::NotFound => profile::provision_profile(records, &user).await?,
                ProfileLookup::Failed(err) => return Err(err),
            },
        };
        let updated = profile::mark_setup_complete(records, &current).await?;
        if self.state.borrow().user_id() == Some(user.id.as_str()) {
            let committed = updated.clone();
            self.commit(|state| state.profile = Some(committed));
        }
        Ok(updated)
    }

    /// Stops listening; results still in flight are discarded.
    pub fn dispose(&self) {
        self.disposed.set(true);
        let handle = self.subscription.borrow_mut().take();
        drop(handle);
        self.observers.borrow_mut().clear();
    }
}

fn create_auth_context() -> (AuthContext, Rc<AuthStateManager>) {
    let (auth_state, set_auth_state) = create_signal(AuthState::initializing());

    let client = use_context::<ApiClient>().unwrap_or_else(|| {
        let client = ApiClient::new();
        provide_context(client.clone());
        client
    });
    let api = Rc::new(client);
    let manager = Rc::new(AuthStateManager::new(
        api.clone(),
        api,
        config::current().profile_fetch_policy(),
    ));
    manager.watch(move |state| set_auth_state.set(state.clone()));

    let runner = manager.clone();
    spawn_local(async move { runner.run().await });

    let disposer = manager.clone();
    on_cleanup(move || disposer.dispose());

    ((auth_state, set_auth_state), manager)
}

#[component]
pub fn AuthProvider(children: Children) -> impl IntoView {
    let (ctx, manager) = create_auth_context();
    provide_context::<AuthContext>(ctx);
    provide_context::<Rc<AuthStateManager>>(manager);
    view! { <>{children()}</> }
}

pub fn use_auth() -> AuthContext {
    use_context::<AuthContext>().unwrap_or_else(|| create_signal(AuthState::default()))
}

pub fn use_auth_manager() -> Option<Rc<AuthStateManager>> {
    use_context::<Rc<AuthStateManager>>()
}

fn missing_manager() -> AuthError {
    AuthError::Request(ApiError::unknown("Auth provider is not mounted"))
}

pub fn use_sign_in_action() -> Action<(String, String), Result<(), AuthError>> {
    let manager = use_auth_manager();
    create_action(move |(email, password): &(String, String)| {
        let manager = manager.clone();
        let email = email.clone();
        let password = password.clone();
        async move {
            let manager = manager.ok_or_else(missing_manager)?;
            manager.sign_in(&email, &password).await.map(|_| ())
        }
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub data: SignUpData,
}

pub fn use_sign_up_action() -> Action<SignUpRequest, Result<SignUpOutcome, AuthError>> {
    let manager = use_auth_manager();
    create_action(move |request: &SignUpRequest| {
        let manager = manager.clone();
        let request = request.clone();
        async move {
            let manager = manager.ok_or_else(missing_manager)?;
            manager
                .sign_up(&request.email, &request.password, request.data)
                .await
        }
    })
}

pub fn use_sign_out_action() -> Action<(), Result<(), AuthError>> {
    let manager = use_auth_manager();
    create_action(move |_: &()| {
        let manager = manager.clone();
        async move {
            let manager = manager.ok_or_else(missing_manager)?;
            manager.sign_out().await
        }
    })
}
