use async_trait::async_trait;
use futures::FutureExt;
use reqwest::Method;
use serde_json::{json, Value};

use super::{
    client::{unix_now, ApiClient},
    store::{SessionStore, Subscription},
    types::{ApiError, AuthError, AuthEvent, Session, SignUpData, SignUpOutcome, User},
};

fn parse_session(body: Value) -> Result<Session, ApiError> {
    serde_json::from_value::<Session>(body)
        .map(|s| s.anchored_at(unix_now()))
        .map_err(|e| ApiError::unknown(format!("Failed to parse session: {}", e)))
}

/// Sign-up answers with a session when e-mail confirmation is off, otherwise with the bare user.
fn parse_sign_up(body: Value) -> Result<SignUpOutcome, ApiError> {
    if body.get("access_token").is_some() {
        let session = parse_session(body)?;
        return Ok(SignUpOutcome {
            user: Some(session.user.clone()),
            session: Some(session),
        });
    }
    let user_value = body.get("user").cloned().unwrap_or(body);
    let user: User = serde_json::from_value(user_value)
        .map_err(|e| ApiError::unknown(format!("Failed to parse user: {}", e)))?;
    Ok(SignUpOutcome {
        user: Some(user),
        session: None,
    })
}

impl ApiClient {
    async fn auth_request_with(
        &self,
        method: Method,
        path: &str,
        payload: &Value,
    ) -> Result<Value, AuthError> {
        let headers = self.get_auth_headers()?;
        let request = self
            .http_client()
            .request(method, self.auth_url(path))
            .headers(headers)
            .json(payload);
        let (status, body) = self.send(request).await?;
        if (200..300).contains(&status) {
            Ok(body)
        } else {
            Err(AuthError::from_status(status, ApiError::from_body(status, &body)))
        }
    }

    async fn auth_request(&self, path: &str, payload: &Value) -> Result<Value, AuthError> {
        self.auth_request_with(Method::POST, path, payload).await
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let body = self
            .auth_request(
                "token?grant_type=refresh_token",
                &json!({ "refresh_token": refresh_token }),
            )
            .await?;
        let session = parse_session(body)?;
        self.set_session(Some(session.clone()), AuthEvent::TokenRefreshed);
        Ok(session)
    }

    /// Joins the refresh already in flight, or starts one. The backend accepts each refresh
    /// token once.
    async fn refresh_once(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let pending = self.refresh_slot().borrow().clone();
        let refresh = match pending {
            Some(refresh) => refresh,
            None => {
                let client = self.clone();
                let refresh_token = refresh_token.to_string();
                let refresh = async move {
                    let result = client.refresh_session(&refresh_token).await;
                    client.refresh_slot().borrow_mut().take();
                    result
                }
                .boxed_local()
                .shared();
                *self.refresh_slot().borrow_mut() = Some(refresh.clone());
                refresh
            }
        };
        refresh.await
    }

    /// Seeds a session obtained elsewhere (e.g. an invitation link) without a round trip.
    pub fn restore_session(&self, session: Session) {
        self.set_session(Some(session), AuthEvent::InitialSession);
    }
}

#[async_trait(?Send)]
impl SessionStore for ApiClient {
    async fn get_session(&self) -> Result<Option<Session>, ApiError> {
        let Some(session) = self.current_session() else {
            return Ok(None);
        };
        if !session.is_expired_at(unix_now()) {
            return Ok(Some(session));
        }
        if !session.can_refresh() {
            self.set_session(None, AuthEvent::SignedOut);
            return Ok(None);
        }
        match self.refresh_once(&session.refresh_token).await {
            Ok(fresh) => Ok(Some(fresh)),
            Err(AuthError::Request(err)) => Err(err),
            Err(err) => {
                log::info!("Session refresh rejected, signing out: {}", err);
                self.set_session(None, AuthEvent::SignedOut);
                Ok(None)
            }
        }
    }

    fn subscribe(&self) -> Subscription {
        self.subscribe_changes()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let body = self
            .auth_request(
                "token?grant_type=password",
                &json!({ "email": email, "password": password }),
            )
            .await?;
        let session = parse_session(body)?;
        self.set_session(Some(session.clone()), AuthEvent::SignedIn);
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        data: &SignUpData,
    ) -> Result<SignUpOutcome, AuthError> {
        let body = self
            .auth_request(
                "signup",
                &json!({ "email": email, "password": password, "data": data }),
            )
            .await?;
        let outcome = parse_sign_up(body)?;
        if let Some(session) = &outcome.session {
            self.set_session(Some(session.clone()), AuthEvent::SignedIn);
        }
        Ok(outcome)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let result = if self.current_session().is_some() {
            self.auth_request("logout", &json!({})).await.map(|_| ())
        } else {
            Ok(())
        };
        // The local session goes away even when the server call fails.
        self.set_session(None, AuthEvent::SignedOut);
        result
    }

    async fn update_password(&self, password: &str) -> Result<User, AuthError> {
        let Some(session) = self.current_session() else {
            return Err(AuthError::Request(ApiError::unauthorized("Not signed in")));
        };
        let body = self
            .auth_request_with(Method::PUT, "user", &json!({ "password": password }))
            .await?;
        let user: User = serde_json::from_value(body)
            .map_err(|e| ApiError::unknown(format!("Failed to parse user: {}", e)))?;
        self.set_session(
            Some(Session {
                user: user.clone(),
                ..session
            }),
            AuthEvent::UserUpdated,
        );
        Ok(user)
    }
}
