//! In-memory stand-in for the hosted backend.
//!
//! Responses can be held in flight with gates, so tests decide exactly when a session or
//! query result arrives relative to auth events.

use async_trait::async_trait;
use futures::channel::{mpsc, oneshot};
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use super::{
    store::{FilterOp, Query, RecordStore, SessionStore, Subscription, SubscriptionHandle},
    types::{
        ApiError, AuthError, AuthEvent, Session, SessionChange, SignUpData, SignUpOutcome, User,
    },
};
use crate::test_support::helpers::session_for;

struct QueryGate {
    collection: String,
    column: String,
    value: String,
    release: oneshot::Receiver<()>,
}

struct Failure {
    error: ApiError,
    remaining: Option<u32>,
}

#[derive(Default)]
struct Inner {
    session: RefCell<Option<Session>>,
    session_error: RefCell<Option<ApiError>>,
    session_gate: RefCell<Option<oneshot::Receiver<()>>>,
    subscribers: RefCell<Vec<(u64, mpsc::UnboundedSender<SessionChange>)>>,
    next_id: Cell<u64>,
    accounts: RefCell<HashMap<String, (String, User)>>,
    tables: RefCell<HashMap<String, Vec<Value>>>,
    failures: RefCell<HashMap<String, Failure>>,
    query_gates: RefCell<Vec<QueryGate>>,
    queries: RefCell<Vec<(String, Query)>>,
    inserts: RefCell<Vec<(String, Value)>>,
    sign_out_calls: Cell<u32>,
}

#[derive(Clone, Default)]
pub struct FakeBackend {
    inner: Rc<Inner>,
}

fn next_id(inner: &Inner) -> u64 {
    let id = inner.next_id.get();
    inner.next_id.set(id + 1);
    id
}

fn matches_filters(row: &Value, query: &Query) -> bool {
    query.filters.iter().all(|filter| {
        // Embedded-resource filters are the backend's business.
        if filter.column.contains('.') {
            return true;
        }
        let field = row.get(&filter.column);
        let as_text = field.and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        });
        match &filter.op {
            FilterOp::Eq(expected) => as_text.as_deref() == Some(expected.as_str()),
            FilterOp::Neq(expected) => as_text.as_deref() != Some(expected.as_str()),
            FilterOp::In(values) => as_text.map(|t| values.contains(&t)).unwrap_or(false),
            FilterOp::IsNull => as_text.is_none(),
            FilterOp::NotNull => as_text.is_some(),
            FilterOp::Gte(bound) => as_text.map(|t| t >= *bound).unwrap_or(false),
            FilterOp::Lte(bound) => as_text.map(|t| t <= *bound).unwrap_or(false),
        }
    })
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, email: &str, password: &str, user: User) -> Self {
        self.inner
            .accounts
            .borrow_mut()
            .insert(email.to_string(), (password.to_string(), user));
        self
    }

    /// Stores a session without notifying anyone (state restored before the app started).
    pub fn set_session(&self, session: Option<Session>) {
        *self.inner.session.borrow_mut() = session;
    }

    pub fn fail_get_session(&self, error: ApiError) {
        *self.inner.session_error.borrow_mut() = Some(error);
    }

    /// Updates the stored session and pushes the change to every subscriber.
    pub fn emit(&self, event: AuthEvent, session: Option<Session>) {
        *self.inner.session.borrow_mut() = session.clone();
        let change = SessionChange::new(event, session);
        self.inner
            .subscribers
            .borrow_mut()
            .retain(|(_, tx)| tx.unbounded_send(change.clone()).is_ok());
    }

    /// The next `get_session` call waits until the returned sender fires or is dropped.
    pub fn hold_get_session(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.inner.session_gate.borrow_mut() = Some(rx);
        tx
    }

    /// The next query on `collection` filtered by `column = value` waits for the sender.
    pub fn hold_query(&self, collection: &str, column: &str, value: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.inner.query_gates.borrow_mut().push(QueryGate {
            collection: collection.to_string(),
            column: column.to_string(),
            value: value.to_string(),
            release: rx,
        });
        tx
    }

    pub fn put_rows(&self, collection: &str, rows: Vec<Value>) {
        self.inner
            .tables
            .borrow_mut()
            .entry(collection.to_string())
            .or_default()
            .extend(rows);
    }

    pub fn fail_next(&self, collection: &str, times: u32, error: ApiError) {
        self.inner.failures.borrow_mut().insert(
            collection.to_string(),
            Failure {
                error,
                remaining: Some(times),
            },
        );
    }

    pub fn fail_always(&self, collection: &str, error: ApiError) {
        self.inner.failures.borrow_mut().insert(
            collection.to_string(),
            Failure {
                error,
                remaining: None,
            },
        );
    }

    pub fn queries(&self, collection: &str) -> Vec<Query> {
        self.inner
            .queries
            .borrow()
            .iter()
            .filter(|(c, _)| c == collection)
            .map(|(_, q)| q.clone())
            .collect()
    }

    pub fn query_count(&self, collection: &str) -> usize {
        self.queries(collection).len()
    }

    pub fn inserted(&self, collection: &str) -> Vec<Value> {
        self.inner
            .inserts
            .borrow()
            .iter()
            .filter(|(c, _)| c == collection)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    pub fn sign_out_calls(&self) -> u32 {
        self.inner.sign_out_calls.get()
    }

    fn take_failure(&self, collection: &str) -> Option<ApiError> {
        let mut failures = self.inner.failures.borrow_mut();
        let (error, exhausted) = {
            let failure = failures.get_mut(collection)?;
            match failure.remaining {
                None => (Some(failure.error.clone()), false),
                Some(0) => (None, true),
                Some(n) => {
                    failure.remaining = Some(n - 1);
                    (Some(failure.error.clone()), n == 1)
                }
            }
        };
        if exhausted {
            failures.remove(collection);
        }
        error
    }

    fn take_gate(&self, collection: &str, query: &Query) -> Option<oneshot::Receiver<()>> {
        let mut gates = self.inner.query_gates.borrow_mut();
        let index = gates.iter().position(|gate| {
            gate.collection == collection && query.eq_value(&gate.column) == Some(gate.value.as_str())
        })?;
        Some(gates.remove(index).release)
    }
}

#[async_trait(?Send)]
impl SessionStore for FakeBackend {
    async fn get_session(&self) -> Result<Option<Session>, ApiError> {
        // The answer reflects the session at request time, even if released later.
        let snapshot = self.inner.session.borrow().clone();
        let gate = self.inner.session_gate.borrow_mut().take();
        if let Some(release) = gate {
            let _ = release.await;
        }
        if let Some(err) = self.inner.session_error.borrow().clone() {
            return Err(err);
        }
        Ok(snapshot)
    }

    fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded();
        let id = next_id(&self.inner);
        self.inner.subscribers.borrow_mut().push((id, tx));
        let inner = Rc::downgrade(&self.inner);
        Subscription {
            events: rx,
            handle: SubscriptionHandle::new(move || {
                if let Some(inner) = inner.upgrade() {
                    inner.subscribers.borrow_mut().retain(|(sid, _)| *sid != id);
                }
            }),
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let account = self.inner.accounts.borrow().get(email).cloned();
        match account {
            Some((expected, user)) if expected == password => {
                let session = Session {
                    user,
                    ..session_for("unused")
                };
                self.emit(AuthEvent::SignedIn, Some(session.clone()));
                Ok(session)
            }
            _ => Err(AuthError::InvalidCredentials(
                "Invalid login credentials".into(),
            )),
        }
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        data: &SignUpData,
    ) -> Result<SignUpOutcome, AuthError> {
        if self.inner.accounts.borrow().contains_key(email) {
            return Err(AuthError::Rejected(ApiError::validation(
                "User already registered",
            )));
        }
        let metadata = match serde_json::to_value(data) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        let user = User {
            id: format!("user-{}", next_id(&self.inner)),
            email: Some(email.to_string()),
            user_metadata: metadata,
        };
        self.inner
            .accounts
            .borrow_mut()
            .insert(email.to_string(), (password.to_string(), user.clone()));
        Ok(SignUpOutcome {
            user: Some(user),
            session: None,
        })
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.inner.sign_out_calls.set(self.inner.sign_out_calls.get() + 1);
        self.emit(AuthEvent::SignedOut, None);
        Ok(())
    }

    async fn update_password(&self, password: &str) -> Result<User, AuthError> {
        let Some(session) = self.inner.session.borrow().clone() else {
            return Err(AuthError::Request(ApiError::unauthorized("Not signed in")));
        };
        for (stored, user) in self.inner.accounts.borrow_mut().values_mut() {
            if user.id == session.user.id {
                *stored = password.to_string();
            }
        }
        self.emit(AuthEvent::UserUpdated, Some(session.clone()));
        Ok(session.user)
    }
}

#[async_trait(?Send)]
impl RecordStore for FakeBackend {
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Value>, ApiError> {
        self.inner
            .queries
            .borrow_mut()
            .push((collection.to_string(), query.clone()));
        if let Some(release) = self.take_gate(collection, query) {
            let _ = release.await;
        }
        if let Some(err) = self.take_failure(collection) {
            return Err(err);
        }
        let tables = self.inner.tables.borrow();
        let rows = tables
            .get(collection)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_filters(row, query))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        Ok(match query.limit {
            Some(limit) => rows.into_iter().take(limit).collect(),
            None => rows,
        })
    }

    async fn insert(&self, collection: &str, payload: Value) -> Result<Vec<Value>, ApiError> {
        if let Some(err) = self.take_failure(collection) {
            return Err(err);
        }
        let mut row = payload;
        if let Value::Object(map) = &mut row {
            if !map.contains_key("id") {
                map.insert(
                    "id".into(),
                    Value::String(format!("{}-{}", collection, next_id(&self.inner))),
                );
            }
        }
        self.inner
            .inserts
            .borrow_mut()
            .push((collection.to_string(), row.clone()));
        self.put_rows(collection, vec![row.clone()]);
        Ok(vec![row])
    }

    async fn update(
        &self,
        collection: &str,
        query: &Query,
        payload: Value,
    ) -> Result<Vec<Value>, ApiError> {
        if let Some(err) = self.take_failure(collection) {
            return Err(err);
        }
        let mut tables = self.inner.tables.borrow_mut();
        let rows = tables.entry(collection.to_string()).or_default();
        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|row| matches_filters(row, query)) {
            if let (Value::Object(target), Value::Object(changes)) = (&mut *row, &payload) {
                for (key, value) in changes {
                    target.insert(key.clone(), value.clone());
                }
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }
}
