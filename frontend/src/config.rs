use anyhow::{anyhow, Context};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

use crate::state::profile::ProfileFetchPolicy;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:54321";
pub const DEFAULT_TIME_ZONE: &str = "America/Sao_Paulo";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub api_base_url: String,
    pub anon_key: String,
    pub time_zone: String,
    pub request_timeout_ms: u64,
    pub profile_fetch_attempts: u32,
    pub profile_retry_backoff_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            anon_key: String::new(),
            time_zone: DEFAULT_TIME_ZONE.to_string(),
            request_timeout_ms: 10_000,
            profile_fetch_attempts: 3,
            profile_retry_backoff_ms: 250,
        }
    }
}

impl RuntimeConfig {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let cfg: RuntimeConfig =
            serde_json::from_str(raw).context("Failed to parse runtime config")?;
        cfg.validate()
    }

    /// Reads `PETCARE_*` variables; anything unset keeps its default.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut cfg = RuntimeConfig::default();
        if let Some(url) = lookup("PETCARE_API_BASE_URL") {
            cfg.api_base_url = url;
        }
        if let Some(key) = lookup("PETCARE_ANON_KEY") {
            cfg.anon_key = key;
        }
        if let Some(tz) = lookup("PETCARE_TIME_ZONE") {
            cfg.time_zone = tz;
        }
        if let Some(raw) = lookup("PETCARE_REQUEST_TIMEOUT_MS") {
            cfg.request_timeout_ms = raw
                .parse()
                .map_err(|_| anyhow!("Invalid PETCARE_REQUEST_TIMEOUT_MS value: {}", raw))?;
        }
        if let Some(raw) = lookup("PETCARE_PROFILE_FETCH_ATTEMPTS") {
            cfg.profile_fetch_attempts = raw
                .parse()
                .map_err(|_| anyhow!("Invalid PETCARE_PROFILE_FETCH_ATTEMPTS value: {}", raw))?;
        }
        if let Some(raw) = lookup("PETCARE_PROFILE_RETRY_BACKOFF_MS") {
            cfg.profile_retry_backoff_ms = raw
                .parse()
                .map_err(|_| anyhow!("Invalid PETCARE_PROFILE_RETRY_BACKOFF_MS value: {}", raw))?;
        }
        cfg.validate()
    }

    fn validate(self) -> anyhow::Result<Self> {
        self.time_zone
            .parse::<Tz>()
            .map_err(|_| anyhow!("Invalid time zone value: {}", self.time_zone))?;
        if self.profile_fetch_attempts == 0 {
            return Err(anyhow!("profile_fetch_attempts must be at least 1"));
        }
        Ok(self)
    }

    pub fn api_base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone.parse().unwrap_or(Tz::UTC)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn profile_fetch_policy(&self) -> ProfileFetchPolicy {
        ProfileFetchPolicy {
            attempts: self.profile_fetch_attempts.max(1),
            timeout: self.request_timeout(),
            backoff: Duration::from_millis(self.profile_retry_backoff_ms),
        }
    }
}

static RUNTIME_CONFIG: OnceLock<RuntimeConfig> = OnceLock::new();

/// Resolved configuration, or the defaults if [`init`] has not finished yet.
pub fn current() -> RuntimeConfig {
    RUNTIME_CONFIG.get().cloned().unwrap_or_default()
}

pub fn time_zone() -> Tz {
    current().time_zone()
}

fn cache(cfg: RuntimeConfig) -> RuntimeConfig {
    let _ = RUNTIME_CONFIG.set(cfg);
    current()
}

#[cfg(target_arch = "wasm32")]
fn snapshot_from_globals() -> Option<RuntimeConfig> {
    // Optional global object: window.__PETCARE_ENV = { api_base_url: "...", anon_key: "..." }
    let w = web_sys::window()?;
    let any = js_sys::Reflect::get(&w, &"__PETCARE_ENV".into()).ok()?;
    if any.is_undefined() || any.is_null() {
        return None;
    }
    let raw = js_sys::JSON::stringify(&any).ok()?.as_string()?;
    match RuntimeConfig::from_json(&raw) {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            log::warn!("Ignoring window.__PETCARE_ENV: {:#}", err);
            None
        }
    }
}

#[cfg(target_arch = "wasm32")]
async fn fetch_runtime_config() -> Option<RuntimeConfig> {
    let origin = web_sys::window()?.location().origin().ok()?;
    let resp = reqwest::get(format!("{}/config.json", origin)).await.ok()?;
    if !resp.status().is_success() {
        return None;
    }
    let raw = resp.text().await.ok()?;
    RuntimeConfig::from_json(&raw).ok()
}

#[cfg(target_arch = "wasm32")]
pub async fn init() -> RuntimeConfig {
    if let Some(cached) = RUNTIME_CONFIG.get() {
        return cached.clone();
    }
    if let Some(cfg) = snapshot_from_globals() {
        return cache(cfg);
    }
    if let Some(cfg) = fetch_runtime_config().await {
        return cache(cfg);
    }
    cache(RuntimeConfig::default())
}

#[cfg(not(target_arch = "wasm32"))]
pub async fn init() -> RuntimeConfig {
    if let Some(cached) = RUNTIME_CONFIG.get() {
        return cached.clone();
    }
    match RuntimeConfig::from_env() {
        Ok(cfg) => cache(cfg),
        Err(err) => {
            log::warn!("Falling back to default runtime config: {:#}", err);
            cache(RuntimeConfig::default())
        }
    }
}
