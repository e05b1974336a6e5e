//! Profile lookups for the signed-in user.
//!
//! "No row yet" is an expected state (the profile is provisioned lazily) and is kept apart
//! from backend failures, which are logged and otherwise treated as an absent profile.

use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::{
    api::{ApiError, Profile, Query, RecordStore, Role, User},
    utils::timer::{self, with_timeout},
};

pub const PROFILES: &str = "profiles";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileFetchPolicy {
    pub attempts: u32,
    pub timeout: Duration,
    pub backoff: Duration,
}

impl Default for ProfileFetchPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            timeout: Duration::from_secs(10),
            backoff: Duration::from_millis(250),
        }
    }
}

impl ProfileFetchPolicy {
    fn delay_before_retry(&self, failed_attempt: u32) -> Duration {
        self.backoff
            .saturating_mul(2u32.saturating_pow(failed_attempt.saturating_sub(1)))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfileError {
    #[error("profile fetch failed: {0}")]
    Fetch(ApiError),
    #[error("profile fetch timed out")]
    Timeout,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProfileLookup {
    Found(Profile),
    NotFound,
    Failed(ProfileError),
}

async fn fetch_once(store: &dyn RecordStore, user_id: &str) -> ProfileLookup {
    let query = Query::new().select("*").eq("user_id", user_id).limit(1);
    match store.query(PROFILES, &query).await {
        Ok(rows) => match rows.into_iter().next() {
            None => ProfileLookup::NotFound,
            Some(row) => match serde_json::from_value::<Profile>(row) {
                Ok(profile) => ProfileLookup::Found(profile),
                Err(e) => ProfileLookup::Failed(ProfileError::Fetch(ApiError::unknown(format!(
                    "Failed to parse profile: {}",
                    e
                )))),
            },
        },
        Err(err) if err.is_no_rows() => ProfileLookup::NotFound,
        Err(err) => ProfileLookup::Failed(ProfileError::Fetch(err)),
    }
}

/// Looks up the profile of `user_id`, retrying failures and timeouts with exponential backoff.
/// `NotFound` is returned as soon as it is seen.
pub async fn fetch_profile(
    store: &dyn RecordStore,
    user_id: &str,
    policy: &ProfileFetchPolicy,
) -> ProfileLookup {
    let mut attempt = 1;
    loop {
        let outcome = with_timeout(policy.timeout, fetch_once(store, user_id))
            .await
            .unwrap_or(ProfileLookup::Failed(ProfileError::Timeout));
        match outcome {
            ProfileLookup::Failed(err) if attempt < policy.attempts => {
                log::warn!(
                    "Profile fetch for {} failed (attempt {}/{}): {}",
                    user_id,
                    attempt,
                    policy.attempts,
                    err
                );
                timer::sleep(policy.delay_before_retry(attempt)).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Collapses a lookup into the optional profile the auth state holds.
pub async fn resolve_profile(
    store: &dyn RecordStore,
    user_id: &str,
    policy: &ProfileFetchPolicy,
) -> Option<Profile> {
    match fetch_profile(store, user_id, policy).await {
        ProfileLookup::Found(profile) => Some(profile),
        ProfileLookup::NotFound => {
            log::debug!("No profile row yet for user {}", user_id);
            None
        }
        ProfileLookup::Failed(err) => {
            let code = match &err {
                ProfileError::Fetch(api) => api.code.as_str(),
                ProfileError::Timeout => "TIMEOUT",
            };
            log::warn!("Profile unavailable for user {} [{}]: {}", user_id, code, err);
            None
        }
    }
}

pub fn profile_payload(user_id: &str, full_name: &str, role: &Role, setup_complete: bool) -> Value {
    json!({
        "user_id": user_id,
        "full_name": full_name,
        "role": role.as_str(),
        "setup_complete": setup_complete,
    })
}

/// Insert payload built from sign-up or invitation metadata. Invited users start with setup
/// pending. `None` when the metadata carries no role.
pub fn provision_payload(user: &User) -> Option<Value> {
    let role = user.provisional_role()?;
    let full_name = user
        .metadata_str("full_name")
        .or(user.email.as_deref())
        .unwrap_or_default();
    Some(profile_payload(
        &user.id,
        full_name,
        &role,
        user.invited_by().is_none(),
    ))
}

fn first_profile(rows: Vec<Value>) -> Result<Profile, ProfileError> {
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| ProfileError::Fetch(ApiError::unknown("Backend returned no profile row")))?;
    serde_json::from_value(row).map_err(|e| {
        ProfileError::Fetch(ApiError::unknown(format!("Failed to parse profile: {}", e)))
    })
}

pub async fn insert_profile(store: &dyn RecordStore, payload: Value) -> Result<Profile, ProfileError> {
    let rows = store
        .insert(PROFILES, payload)
        .await
        .map_err(ProfileError::Fetch)?;
    first_profile(rows)
}

pub async fn provision_profile(store: &dyn RecordStore, user: &User) -> Result<Profile, ProfileError> {
    let payload = provision_payload(user).ok_or_else(|| {
        ProfileError::Fetch(ApiError::validation("User metadata does not carry a role"))
    })?;
    insert_profile(store, payload).await
}

pub async fn mark_setup_complete(
    store: &dyn RecordStore,
    profile: &Profile,
) -> Result<Profile, ProfileError> {
    let query = Query::new().eq("id", &profile.id);
    let rows = store
        .update(PROFILES, &query, json!({ "setup_complete": true }))
        .await
        .map_err(ProfileError::Fetch)?;
    if rows.is_empty() {
        // Some row-level policies hide the updated row from the response.
        return Ok(Profile {
            setup_complete: true,
            ..profile.clone()
        });
    }
    first_profile(rows)
}
