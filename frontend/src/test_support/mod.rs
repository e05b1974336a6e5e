#[cfg(all(test, not(target_arch = "wasm32")))]
pub mod ssr;

#[cfg(test)]
pub mod helpers {
    use crate::api::{Profile, Role, Session, User};
    use crate::state::profile::ProfileFetchPolicy;
    use futures::future::{self, Either};
    use serde_json::{json, Map, Value};
    use std::future::Future;
    use std::task::Poll;
    use std::time::Duration;

    pub fn user(id: &str) -> User {
        User {
            id: id.into(),
            email: Some(format!("{}@example.com", id)),
            user_metadata: Map::new(),
        }
    }

    pub fn user_with_metadata(id: &str, metadata: Value) -> User {
        User {
            user_metadata: metadata.as_object().cloned().unwrap_or_default(),
            ..user(id)
        }
    }

    pub fn session_for(user_id: &str) -> Session {
        Session {
            access_token: format!("token-{}", user_id),
            token_type: Some("bearer".into()),
            expires_in: Some(3600),
            expires_at: None,
            refresh_token: format!("refresh-{}", user_id),
            user: user(user_id),
        }
    }

    pub fn profile_row(id: &str, user_id: &str, role: &str, setup_complete: bool) -> Value {
        json!({
            "id": id,
            "user_id": user_id,
            "full_name": format!("Name of {}", user_id),
            "role": role,
            "setup_complete": setup_complete,
        })
    }

    pub fn profile(user_id: &str, role: Role, setup_complete: bool) -> Profile {
        Profile {
            id: format!("profile-{}", user_id),
            user_id: Some(user_id.into()),
            full_name: Some(format!("Name of {}", user_id)),
            role,
            setup_complete,
        }
    }

    pub fn fast_policy() -> ProfileFetchPolicy {
        ProfileFetchPolicy {
            attempts: 3,
            timeout: Duration::from_secs(5),
            backoff: Duration::ZERO,
        }
    }

    async fn yield_once() {
        let mut yielded = false;
        future::poll_fn(|cx| {
            if yielded {
                Poll::Ready(())
            } else {
                yielded = true;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        })
        .await
    }

    /// Gives futures sharing the current task a chance to make progress.
    pub async fn settle() {
        for _ in 0..32 {
            yield_once().await;
        }
    }

    /// Polls `background` alongside `script` on this task and returns once `script` is done.
    pub async fn drive<B, S>(background: B, script: S) -> S::Output
    where
        B: Future<Output = ()>,
        S: Future,
    {
        let background = std::pin::pin!(background);
        let script = std::pin::pin!(script);
        match future::select(script, background).await {
            Either::Left((output, _)) => output,
            Either::Right((_, script)) => script.await,
        }
    }
}
