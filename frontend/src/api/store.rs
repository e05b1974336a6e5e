//! Seams to the hosted backend: the auth session store and the generic record store.
//!
//! Both traits are `?Send`; everything in the client runs on one cooperative task.

use async_trait::async_trait;
use futures::channel::mpsc::UnboundedReceiver;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::types::{
    ApiError, AuthError, Session, SessionChange, SignUpData, SignUpOutcome, User,
};

#[async_trait(?Send)]
pub trait SessionStore {
    async fn get_session(&self) -> Result<Option<Session>, ApiError>;

    fn subscribe(&self) -> Subscription;

    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<Session, AuthError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        data: &SignUpData,
    ) -> Result<SignUpOutcome, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Sets the signed-in user's password, as invited accounts do on first login.
    async fn update_password(&self, password: &str) -> Result<User, AuthError>;
}

#[async_trait(?Send)]
pub trait RecordStore {
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Value>, ApiError>;

    async fn insert(&self, collection: &str, payload: Value) -> Result<Vec<Value>, ApiError>;

    async fn update(
        &self,
        collection: &str,
        query: &Query,
        payload: Value,
    ) -> Result<Vec<Value>, ApiError>;
}

/// Runs `query` and decodes every row as `T`.
pub async fn query_as<T: DeserializeOwned>(
    store: &dyn RecordStore,
    collection: &str,
    query: &Query,
) -> Result<Vec<T>, ApiError> {
    let rows = store.query(collection, query).await?;
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row).map_err(|e| {
                ApiError::unknown(format!("Failed to parse {} row: {}", collection, e))
            })
        })
        .collect()
}

/// Change feed handed out by [`SessionStore::subscribe`].
pub struct Subscription {
    pub events: UnboundedReceiver<SessionChange>,
    pub handle: SubscriptionHandle,
}

/// Unsubscribes when dropped.
pub struct SubscriptionHandle {
    unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl SubscriptionHandle {
    pub fn new(unsubscribe: impl FnOnce() + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(f) = self.unsubscribe.take() {
            f();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(f) = self.unsubscribe.take() {
            f();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOp {
    Eq(String),
    Neq(String),
    Gte(String),
    Lte(String),
    In(Vec<String>),
    IsNull,
    NotNull,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
}

impl Filter {
    fn param_value(&self) -> String {
        match &self.op {
            FilterOp::Eq(v) => format!("eq.{}", v),
            FilterOp::Neq(v) => format!("neq.{}", v),
            FilterOp::Gte(v) => format!("gte.{}", v),
            FilterOp::Lte(v) => format!("lte.{}", v),
            FilterOp::In(values) => format!("in.({})", values.join(",")),
            FilterOp::IsNull => "is.null".to_string(),
            FilterOp::NotNull => "not.is.null".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub select: Option<String>,
    pub filters: Vec<Filter>,
    pub order: Option<(String, bool)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = Some(columns.into());
        self
    }

    fn filter(mut self, column: impl Into<String>, op: FilterOp) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            op,
        });
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter(column, FilterOp::Eq(value.to_string()))
    }

    pub fn neq(self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter(column, FilterOp::Neq(value.to_string()))
    }

    pub fn gte(self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter(column, FilterOp::Gte(value.to_string()))
    }

    pub fn lte(self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filter(column, FilterOp::Lte(value.to_string()))
    }

    pub fn in_list<I, S>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        let values = values.into_iter().map(|v| v.to_string()).collect();
        self.filter(column, FilterOp::In(values))
    }

    pub fn is_null(self, column: impl Into<String>) -> Self {
        self.filter(column, FilterOp::IsNull)
    }

    pub fn not_null(self, column: impl Into<String>) -> Self {
        self.filter(column, FilterOp::NotNull)
    }

    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some((column.into(), ascending));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Value of the first `eq` filter on `column`, if any.
    pub fn eq_value(&self, column: &str) -> Option<&str> {
        self.filters.iter().find_map(|f| match &f.op {
            FilterOp::Eq(v) if f.column == column => Some(v.as_str()),
            _ => None,
        })
    }

    /// Query-string pairs in the REST dialect (`column=op.value`).
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(select) = &self.select {
            params.push(("select".to_string(), select.clone()));
        }
        for filter in &self.filters {
            params.push((filter.column.clone(), filter.param_value()));
        }
        if let Some((column, ascending)) = &self.order {
            let direction = if *ascending { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{}.{}", column, direction)));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}
