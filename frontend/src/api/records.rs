use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::Value;

use super::{
    client::ApiClient,
    store::{Query, RecordStore, SessionStore},
    types::ApiError,
};

fn into_rows(body: Value) -> Result<Vec<Value>, ApiError> {
    match body {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => Ok(vec![Value::Object(map)]),
        other => Err(ApiError::unknown(format!(
            "Unexpected response shape: {}",
            other
        ))),
    }
}

impl ApiClient {
    /// Record requests carry the session token, so an expired one is refreshed first.
    /// A rejected refresh signs out and the request falls back to the anon key.
    async fn record_headers(&self) -> Result<HeaderMap, ApiError> {
        self.get_session().await?;
        self.get_auth_headers()
    }
}

#[async_trait(?Send)]
impl RecordStore for ApiClient {
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Value>, ApiError> {
        let headers = self.record_headers().await?;
        let request = self
            .http_client()
            .get(self.rest_url(collection))
            .headers(headers)
            .query(&query.to_params());
        let body = self.send_expecting_success(request).await?;
        into_rows(body)
    }

    async fn insert(&self, collection: &str, payload: Value) -> Result<Vec<Value>, ApiError> {
        let headers = self.record_headers().await?;
        let request = self
            .http_client()
            .post(self.rest_url(collection))
            .headers(headers)
            .header("Prefer", "return=representation")
            .json(&payload);
        let body = self.send_expecting_success(request).await?;
        into_rows(body)
    }

    async fn update(
        &self,
        collection: &str,
        query: &Query,
        payload: Value,
    ) -> Result<Vec<Value>, ApiError> {
        if query.filters.is_empty() {
            return Err(ApiError::validation(format!(
                "Refusing to update every row of {}",
                collection
            )));
        }
        let headers = self.record_headers().await?;
        let request = self
            .http_client()
            .patch(self.rest_url(collection))
            .headers(headers)
            .header("Prefer", "return=representation")
            .query(&query.to_params())
            .json(&payload);
        let body = self.send_expecting_success(request).await?;
        into_rows(body)
    }
}
