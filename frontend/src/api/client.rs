use futures::{
    channel::mpsc,
    future::{LocalBoxFuture, Shared},
};
use reqwest::{header::HeaderMap, Client, RequestBuilder};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use super::{
    store::{Subscription, SubscriptionHandle},
    types::{ApiError, AuthError, AuthEvent, Session, SessionChange},
};
use crate::{
    config,
    utils::{storage, timer},
};

const SESSION_STORAGE_KEY: &str = "petcare.auth.session";

pub(crate) type PendingRefresh = Shared<LocalBoxFuture<'static, Result<Session, AuthError>>>;

/// HTTP client for the hosted backend: auth endpoints under `/auth/v1`, collections under
/// `/rest/v1`. Implements [`super::SessionStore`] and [`super::RecordStore`].
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Option<String>,
    anon_key: Option<String>,
    timeout: Option<Duration>,
    auth: Rc<AuthSlot>,
}

/// Session shared by every clone of one client, plus the change subscribers.
#[derive(Default)]
struct AuthSlot {
    session: RefCell<Option<Session>>,
    subscribers: RefCell<Vec<(u64, mpsc::UnboundedSender<SessionChange>)>>,
    next_subscriber: Cell<u64>,
    refreshing: RefCell<Option<PendingRefresh>>,
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiClient {
    /// Starts from the session persisted by an earlier page load, if any.
    pub fn new() -> Self {
        let auth = AuthSlot {
            session: RefCell::new(storage::load_json(SESSION_STORAGE_KEY)),
            ..AuthSlot::default()
        };
        Self {
            client: Client::new(),
            base_url: None,
            anon_key: None,
            timeout: None,
            auth: Rc::new(auth),
        }
    }

    pub fn new_with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Self::new()
        }
    }

    pub fn with_anon_key(mut self, anon_key: impl Into<String>) -> Self {
        self.anon_key = Some(anon_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Refresh round trip already in flight, shared by every caller that finds the token expired.
    pub(crate) fn refresh_slot(&self) -> &RefCell<Option<PendingRefresh>> {
        &self.auth.refreshing
    }

    pub(crate) fn http_client(&self) -> &Client {
        &self.client
    }

    pub(crate) fn resolved_base_url(&self) -> String {
        match &self.base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => config::current().api_base_url().to_string(),
        }
    }

    fn resolved_anon_key(&self) -> String {
        match &self.anon_key {
            Some(key) => key.clone(),
            None => config::current().anon_key,
        }
    }

    fn resolved_timeout(&self) -> Duration {
        self.timeout
            .unwrap_or_else(|| config::current().request_timeout())
    }

    pub(crate) fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.resolved_base_url(), path)
    }

    pub(crate) fn rest_url(&self, collection: &str) -> String {
        format!("{}/rest/v1/{}", self.resolved_base_url(), collection)
    }

    /// `apikey` plus a bearer token: the session's access token, else the anon key.
    pub(crate) fn get_auth_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        let anon_key = self.resolved_anon_key();
        let bearer = self
            .current_session()
            .map(|s| s.access_token)
            .unwrap_or_else(|| anon_key.clone());

        if !anon_key.is_empty() {
            headers.insert(
                "apikey",
                anon_key
                    .parse()
                    .map_err(|_| ApiError::validation("Invalid anon key format"))?,
            );
        }
        if !bearer.is_empty() {
            headers.insert(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", bearer)
                    .parse()
                    .map_err(|_| ApiError::validation("Invalid token format"))?,
            );
        }
        Ok(headers)
    }

    /// Sends the request and returns the status with the decoded JSON body (`Null` when empty).
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<(u16, Value), ApiError> {
        let response = timer::with_timeout(self.resolved_timeout(), request.send())
            .await
            .map_err(|_| ApiError::timeout("Request timed out"))?
            .map_err(|e| ApiError::request_failed(format!("Request failed: {}", e)))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::request_failed(format!("Failed to read response: {}", e)))?;
        if text.trim().is_empty() {
            return Ok((status, Value::Null));
        }
        let body = serde_json::from_str(&text)
            .map_err(|e| ApiError::unknown(format!("Failed to parse response: {}", e)))?;
        Ok((status, body))
    }

    /// Like [`Self::send`] but maps non-2xx statuses to the backend's error body.
    pub(crate) async fn send_expecting_success(
        &self,
        request: RequestBuilder,
    ) -> Result<Value, ApiError> {
        let (status, body) = self.send(request).await?;
        if (200..300).contains(&status) {
            Ok(body)
        } else {
            Err(ApiError::from_body(status, &body))
        }
    }

    pub fn current_session(&self) -> Option<Session> {
        self.auth.session.borrow().clone()
    }

    /// Replaces the stored session and notifies subscribers.
    pub(crate) fn set_session(&self, session: Option<Session>, event: AuthEvent) {
        *self.auth.session.borrow_mut() = session.clone();
        storage::store_json(SESSION_STORAGE_KEY, session.as_ref());
        self.notify(SessionChange::new(event, session));
    }

    fn notify(&self, change: SessionChange) {
        self.auth
            .subscribers
            .borrow_mut()
            .retain(|(_, tx)| tx.unbounded_send(change.clone()).is_ok());
    }

    pub(crate) fn subscribe_changes(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded();
        let id = self.auth.next_subscriber.get();
        self.auth.next_subscriber.set(id + 1);
        self.auth.subscribers.borrow_mut().push((id, tx));

        let slot = Rc::downgrade(&self.auth);
        Subscription {
            events: rx,
            handle: SubscriptionHandle::new(move || {
                if let Some(slot) = slot.upgrade() {
                    slot.subscribers.borrow_mut().retain(|(sid, _)| *sid != id);
                }
            }),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.auth.subscribers.borrow().len()
    }
}

pub(crate) fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
